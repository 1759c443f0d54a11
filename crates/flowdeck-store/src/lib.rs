pub mod downloads;
pub mod store;

pub use downloads::FileDownloads;
pub use store::{SqliteStore, StoredEntry};
