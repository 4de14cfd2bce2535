//! Backup export/import documents.
//!
//! # Responsibility
//! - Encode profile state into self-describing JSON backups.
//! - Parse untrusted backup bytes into an explicit tagged union before any
//!   state is touched.
//!
//! # Invariants
//! - `validate` never returns partially decoded state: every recognized
//!   document in the input parses structurally or the whole input is rejected.

pub mod codec;

pub use codec::{
    export_all, export_profile, validate, BackupDocument, BackupError, ProfileSnapshot,
    BACKUP_FORMAT, BACKUP_VERSION,
};
