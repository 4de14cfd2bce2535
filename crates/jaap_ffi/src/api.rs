//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose counter, history, settings, backup and report use cases to Dart
//!   via FRB.
//! - Map core errors into flat response envelopes.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Destructive calls without `confirmed = true` mutate nothing and answer
//!   `needs_confirmation = true`.
//! - Every call opens the profile through the normal load path, so day
//!   rollover is applied before the requested operation.

use jaap_core::db::open_db;
use jaap_core::{
    backup, core_version as core_version_inner, init_logging as init_logging_inner,
    ping as ping_inner, CalendarDate, DailyGoal, DailyGoalOverride, GoalKind, HistoryEntry,
    ProfileCatalog, ProgressReport, ProgressService, ServiceError, Session, SettingsOverride,
    SqliteBlobStore, SystemClock, UserConfirmation,
};
use log::warn;
use std::path::PathBuf;
use std::sync::OnceLock;

const DB_FILE_NAME: &str = "jaap_progress.sqlite3";
const CONFIRMATION_MESSAGE: &str = "Confirmation required.";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

type FfiService<'conn> = ProgressService<SqliteBlobStore<'conn>, SystemClock>;

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Counter view of the active profile.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterState {
    pub profile_id: String,
    pub profile_name: String,
    /// Calendar day the counts belong to (`YYYY-MM-DD`).
    pub date: String,
    pub bead_count: u32,
    pub round_count: u32,
    pub beads_per_round: u32,
    pub goal_kind: String,
    pub goal_value: u32,
    /// `"{current}/{target}"`.
    pub progress_label: String,
    /// Goal completion in `0.0..=1.0`.
    pub progress_fraction: f64,
    pub goal_reached: bool,
    pub streak_days: u32,
    pub lifetime_beads: u64,
}

/// Response envelope for counter-mutating calls.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterResponse {
    pub ok: bool,
    pub message: String,
    pub needs_confirmation: bool,
    pub state: Option<CounterState>,
    /// This call completed a round.
    pub round_completed: bool,
    /// This call crossed the daily goal; the UI celebrates once.
    pub celebrate: bool,
}

impl CounterResponse {
    fn success(message: impl Into<String>, state: CounterState) -> Self {
        Self {
            ok: true,
            message: message.into(),
            needs_confirmation: false,
            state: Some(state),
            round_completed: false,
            celebrate: false,
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            needs_confirmation: false,
            state: None,
            round_completed: false,
            celebrate: false,
        }
    }

    fn confirmation_required() -> Self {
        Self {
            needs_confirmation: true,
            ..Self::failure(CONFIRMATION_MESSAGE)
        }
    }
}

/// Generic action envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    pub message: String,
    pub needs_confirmation: bool,
}

impl ActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            needs_confirmation: false,
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            needs_confirmation: false,
        }
    }

    fn confirmation_required() -> Self {
        Self {
            needs_confirmation: true,
            ..Self::failure(CONFIRMATION_MESSAGE)
        }
    }
}

/// Exported backup text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupExportResponse {
    pub ok: bool,
    pub message: String,
    /// Suggested file name for sharing/saving.
    pub file_name: Option<String>,
    pub json: Option<String>,
}

/// One archived day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryItem {
    pub date: String,
    pub rounds: u32,
    pub beads: u64,
}

/// Report data for one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportItem {
    pub profile_id: String,
    pub profile_name: String,
    pub total_beads: u64,
    pub total_rounds: u64,
    pub streak_days: u32,
    pub beads_per_round: u32,
    pub goal_label: String,
    /// Newest day first.
    pub history: Vec<HistoryItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportResponse {
    pub ok: bool,
    pub message: String,
    pub reports: Vec<ReportItem>,
}

/// Loads a profile, applying day rollover.
///
/// `profile_id = None` resumes the last active profile.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn counter_load(profile_id: Option<String>) -> CounterResponse {
    let result = with_service(|service| {
        let session = match profile_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => service.activate(id)?,
            _ => service.activate_last()?,
        };
        Ok(counter_state(service, &session))
    });
    match result {
        Ok(state) => CounterResponse::success("Loaded.", state),
        Err(err) => CounterResponse::failure(format!("counter_load failed: {err}")),
    }
}

/// Counts one bead.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - `celebrate` is true only on the increment that crosses the goal.
#[flutter_rust_bridge::frb(sync)]
pub fn counter_increment(profile_id: String) -> CounterResponse {
    let result = with_session(&profile_id, |service, session| {
        let report = service.increment(session)?;
        Ok((report.round_completed, report.celebrate))
    });
    match result {
        Ok((state, (round_completed, celebrate))) => CounterResponse {
            round_completed,
            celebrate,
            ..CounterResponse::success("Counted.", state)
        },
        Err(err) => CounterResponse::failure(format!("counter_increment failed: {err}")),
    }
}

/// Zeroes today's counts after user confirmation.
#[flutter_rust_bridge::frb(sync)]
pub fn counter_reset_today(profile_id: String, confirmed: bool) -> CounterResponse {
    let Some(confirmation) = UserConfirmation::from_flag(confirmed) else {
        return CounterResponse::confirmation_required();
    };
    let result = with_session(&profile_id, |service, session| {
        service.reset_today(session, confirmation)?;
        Ok(())
    });
    match result {
        Ok((state, ())) => CounterResponse::success("Today's progress reset.", state),
        Err(err) => CounterResponse::failure(format!("counter_reset_today failed: {err}")),
    }
}

/// Replaces the history entry dated `original_date`.
///
/// Dates are `YYYY-MM-DD`; the new date must be before today.
#[flutter_rust_bridge::frb(sync)]
pub fn history_edit(
    profile_id: String,
    original_date: String,
    date: String,
    rounds: u32,
) -> ActionResponse {
    let original = match CalendarDate::parse(original_date.trim()) {
        Ok(date) => date,
        Err(err) => return ActionResponse::failure(format!("history_edit failed: {err}")),
    };
    let updated = match CalendarDate::parse(date.trim()) {
        Ok(date) => HistoryEntry::new(date, rounds),
        Err(err) => return ActionResponse::failure(format!("history_edit failed: {err}")),
    };
    match with_session(&profile_id, |service, session| {
        service.edit_history(session, original, updated)?;
        Ok(())
    }) {
        Ok(_) => ActionResponse::success("History updated."),
        Err(err) => ActionResponse::failure(format!("history_edit failed: {err}")),
    }
}

/// Removes the history entry dated `date`.
#[flutter_rust_bridge::frb(sync)]
pub fn history_remove(profile_id: String, date: String) -> ActionResponse {
    let date = match CalendarDate::parse(date.trim()) {
        Ok(date) => date,
        Err(err) => return ActionResponse::failure(format!("history_remove failed: {err}")),
    };
    match with_session(&profile_id, |service, session| {
        service.remove_history(session, date)?;
        Ok(())
    }) {
        Ok(_) => ActionResponse::success("History entry removed."),
        Err(err) => ActionResponse::failure(format!("history_remove failed: {err}")),
    }
}

/// Stores a settings override; `None` fields fall back to profile defaults.
///
/// `goal_kind` is `rounds` or `beads`.
#[flutter_rust_bridge::frb(sync)]
pub fn settings_update(
    profile_id: String,
    beads_per_round: Option<u32>,
    goal_kind: Option<String>,
    goal_value: Option<u32>,
) -> CounterResponse {
    if beads_per_round == Some(0) {
        return CounterResponse::failure(
            "settings_update failed: beads_per_round must be positive",
        );
    }
    if goal_value == Some(0) {
        return CounterResponse::failure("settings_update failed: goal_value must be positive");
    }
    let kind = match goal_kind.as_deref().map(str::trim) {
        None | Some("") => None,
        Some("rounds") => Some(GoalKind::Rounds),
        Some("beads") => Some(GoalKind::Beads),
        Some(other) => {
            return CounterResponse::failure(format!(
                "settings_update failed: unsupported goal kind `{other}`"
            ))
        }
    };
    let update = SettingsOverride {
        beads_per_round,
        daily_goal: (kind.is_some() || goal_value.is_some()).then_some(
            DailyGoalOverride {
                kind,
                value: goal_value,
            },
        ),
    };
    match with_session(&profile_id, |service, session| {
        service.update_settings(session, update)?;
        Ok(())
    }) {
        Ok((state, ())) => CounterResponse::success("Settings saved.", state),
        Err(err) => CounterResponse::failure(format!("settings_update failed: {err}")),
    }
}

/// Exports one profile, or every profile as a namespaced blob.
#[flutter_rust_bridge::frb(sync)]
pub fn backup_export(profile_id: String, all_profiles: bool) -> BackupExportResponse {
    let result = with_session(&profile_id, |service, session| {
        let bytes = if all_profiles {
            service.export_all(session)?
        } else {
            service.export_profile(session)?
        };
        Ok(bytes)
    });
    let file_name = if all_profiles {
        "jaap-backup-all.json".to_string()
    } else {
        format!("jaap-backup-{}.json", profile_id.trim())
    };
    match result.and_then(|(_, bytes)| {
        String::from_utf8(bytes).map_err(|err| format!("backup is not UTF-8: {err}"))
    }) {
        Ok(json) => BackupExportResponse {
            ok: true,
            message: "Backup exported.".to_string(),
            file_name: Some(file_name),
            json: Some(json),
        },
        Err(err) => BackupExportResponse {
            ok: false,
            message: format!("backup_export failed: {err}"),
            file_name: None,
            json: None,
        },
    }
}

/// Validates and restores a backup after user confirmation.
///
/// Invalid input is rejected before the confirmation check, so the user is
/// never asked to confirm a file that cannot be restored.
#[flutter_rust_bridge::frb(sync)]
pub fn backup_import(profile_id: String, json: String, confirmed: bool) -> ActionResponse {
    let document = match backup::validate(json.as_bytes()) {
        Ok(document) => document,
        Err(err) => {
            warn!("event=backup_import module=ffi status=rejected error={err}");
            return ActionResponse::failure(format!("backup_import failed: {err}"));
        }
    };
    let Some(confirmation) = UserConfirmation::from_flag(confirmed) else {
        return ActionResponse::confirmation_required();
    };
    match with_session(&profile_id, |service, session| {
        Ok(service.restore(session, document, confirmation)?)
    }) {
        Ok((_, report)) if report.skipped_prefixes.is_empty() => ActionResponse::success(
            format!("Restored {} profile(s).", report.restored.len()),
        ),
        Ok((_, report)) => ActionResponse::success(format!(
            "Restored {} profile(s); skipped unknown: {}.",
            report.restored.len(),
            report.skipped_prefixes.join(", ")
        )),
        Err(err) => ActionResponse::failure(format!("backup_import failed: {err}")),
    }
}

/// Report data for one profile, or all profiles when `profile_id` is `None`.
#[flutter_rust_bridge::frb(sync)]
pub fn progress_report(profile_id: Option<String>) -> ReportResponse {
    let result = with_service(|service| match profile_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => {
            let session = service.activate(id)?;
            Ok(vec![service.report(&session)])
        }
        _ => service.report_all(),
    });
    match result {
        Ok(reports) => ReportResponse {
            ok: true,
            message: format!("{} report(s).", reports.len()),
            reports: reports.into_iter().map(to_report_item).collect(),
        },
        Err(err) => ReportResponse {
            ok: false,
            message: format!("progress_report failed: {err}"),
            reports: Vec::new(),
        },
    }
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("JAAP_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn with_service<T>(
    f: impl FnOnce(&FfiService<'_>) -> Result<T, ServiceError>,
) -> Result<T, String> {
    let db_path = resolve_db_path();
    let conn = open_db(&db_path).map_err(|err| format!("progress DB open failed: {err}"))?;
    let blobs = SqliteBlobStore::try_new(&conn)
        .map_err(|err| format!("progress store init failed: {err}"))?;
    let service = ProgressService::new(ProfileCatalog::builtin(), blobs, SystemClock);
    f(&service).map_err(|err| err.to_string())
}

/// Runs `f` on a freshly activated session and returns the resulting state.
fn with_session<T>(
    profile_id: &str,
    f: impl FnOnce(&FfiService<'_>, &mut Session) -> Result<T, ServiceError>,
) -> Result<(CounterState, T), String> {
    with_service(|service| {
        let mut session = service.activate(profile_id.trim())?;
        let value = f(service, &mut session)?;
        Ok((counter_state(service, &session), value))
    })
}

fn counter_state(service: &FfiService<'_>, session: &Session) -> CounterState {
    let counts = session.counts();
    let settings = session.settings();
    let progress = session.progress();
    let DailyGoal { kind, value } = settings.daily_goal;
    CounterState {
        profile_id: session.profile().id().to_string(),
        profile_name: session.profile().display_name().to_string(),
        date: counts.last_visit_date.to_string(),
        bead_count: counts.bead_count,
        round_count: counts.round_count,
        beads_per_round: settings.beads_per_round,
        goal_kind: kind.as_str().to_string(),
        goal_value: value,
        progress_label: progress.label,
        progress_fraction: progress.fraction,
        goal_reached: progress.reached,
        streak_days: session.streak().count(),
        lifetime_beads: service.lifetime_beads(session),
    }
}

fn to_report_item(report: ProgressReport) -> ReportItem {
    ReportItem {
        profile_id: report.profile_id,
        profile_name: report.profile_name,
        total_beads: report.total_beads,
        total_rounds: report.total_rounds,
        streak_days: report.streak_days,
        beads_per_round: report.beads_per_round,
        goal_label: report.goal_label,
        history: report
            .history
            .into_iter()
            .map(|row| HistoryItem {
                date: row.date.to_string(),
                rounds: row.rounds,
                beads: row.beads,
            })
            .collect(),
    }
}
