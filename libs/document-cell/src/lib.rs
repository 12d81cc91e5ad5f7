pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::{document_routes, file_routes};
pub use services::{DocumentService, FileStorageService};
