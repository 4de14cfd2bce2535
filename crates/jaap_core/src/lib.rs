//! Core domain logic for the jaap bead counter.
//! This crate is the single source of truth for counting, rollover, streak
//! and backup invariants.

pub mod backup;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod sync;

pub use backup::{BackupDocument, BackupError, ProfileSnapshot};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use engine::goal::GoalProgress;
pub use logging::{default_log_level, init_logging, logging_status, LogConfig, LoggingError};
pub use model::counts::DayCounts;
pub use model::date::{CalendarDate, Clock, FixedClock, SystemClock};
pub use model::history::{HistoryArchive, HistoryEditError, HistoryEntry};
pub use model::profile::{Profile, ProfileCatalog, ProfileError, ProfileId};
pub use model::settings::{DailyGoal, DailyGoalOverride, GoalKind, GoalSettings, SettingsOverride};
pub use model::streak::Streak;
pub use repo::blob_repo::{BlobStore, SqliteBlobStore, StoreError, StoreResult};
pub use repo::profile_repo::{LoadGate, LoadPhase, ProfileStore, WriteStatus};
pub use service::progress_service::{
    IncrementReport, ProgressService, RestoreReport, ServiceError, ServiceResult, Session,
    UserConfirmation,
};
pub use service::report::{ProgressReport, ReportRow};
pub use sync::{BackupSync, RemoteError, RemoteFile, RemoteStore, SyncError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
