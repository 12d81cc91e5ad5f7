pub mod document;
pub mod storage;

pub use document::DocumentService;
pub use storage::FileStorageService;
