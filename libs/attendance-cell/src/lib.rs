pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use error::*;
pub use models::*;
pub use router::attendance_routes;
pub use services::{AttendanceService, ReconciliationScheduler, Reconciler};
pub use store::{AttendanceStore, SupabaseAttendanceStore};
