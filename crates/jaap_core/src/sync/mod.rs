//! Remote backup transport.
//!
//! # Responsibility
//! - Define the remote file-store SPI consumed by backup upload/download.
//! - Serialize remote operations: one in flight at a time.
//!
//! # Invariants
//! - Remote operations work on exported bytes and never touch local state.
//! - A failed remote call is reported once; nothing is retried.

pub mod backup_sync;
pub mod remote;

pub use backup_sync::{backup_file_name, BackupSync, SyncError, UploadReport};
pub use remote::{RemoteError, RemoteFile, RemoteResult, RemoteStore};
