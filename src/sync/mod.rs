//! Config folder synchronization from a remote bucket

pub mod engine;
pub mod naming;
pub mod report;

pub use engine::SyncEngine;
pub use naming::local_file_name;
pub use report::{DownloadError, ObjectFailure, SyncError, SyncReport};
