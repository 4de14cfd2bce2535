//! Counting session use-case service.
//!
//! # Responsibility
//! - Own the load/rollover/ready lifecycle of the active profile.
//! - Run every user transition in memory first, then persist it through the
//!   gated profile store.
//! - Provide backup export/restore and report entry points over a session.
//!
//! # Invariants
//! - A `Session` is only handed out after its gate is `Ready`.
//! - Load-time repairs (rollover, stale streak, synthesized counts) are
//!   persisted right after the gate opens, in one batch.
//! - Destructive operations require a `UserConfirmation`.

use crate::backup::{self, BackupDocument, BackupError, ProfileSnapshot};
use crate::engine;
use crate::engine::day_cycle::{roll_over, CountsSource, DayCycleOutcome};
use crate::engine::goal::{evaluate, GoalProgress};
use crate::engine::streak::{next_streak, validate_on_load};
use crate::model::counts::DayCounts;
use crate::model::date::{CalendarDate, Clock};
use crate::model::history::{HistoryArchive, HistoryEditError, HistoryEntry};
use crate::model::profile::{Profile, ProfileCatalog, ProfileError, ProfileId, StateKind};
use crate::model::settings::{GoalSettings, SettingsOverride};
use crate::model::streak::Streak;
use crate::repo::blob_repo::{BlobStore, StoreError};
use crate::repo::profile_repo::{LoadGate, ProfileBatch, ProfileStore, WriteStatus};
use crate::service::report::{build_report, lifetime_beads, ProgressReport};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from session operations.
#[derive(Debug)]
pub enum ServiceError {
    Profile(ProfileError),
    Store(StoreError),
    History(HistoryEditError),
    Backup(BackupError),
    /// History may only hold days before today.
    HistoryDateNotPast(CalendarDate),
    /// The catalog has no profile to fall back to.
    NoProfiles,
    /// A namespaced backup names no known profile prefix.
    NoMatchingProfiles(Vec<String>),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Profile(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::History(err) => write!(f, "{err}"),
            Self::Backup(err) => write!(f, "{err}"),
            Self::HistoryDateNotPast(date) => {
                write!(f, "history date must be before today: {date}")
            }
            Self::NoProfiles => write!(f, "no profiles are configured"),
            Self::NoMatchingProfiles(prefixes) => write!(
                f,
                "backup matches no known profile (prefixes: {})",
                prefixes.join(", ")
            ),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Profile(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::History(err) => Some(err),
            Self::Backup(err) => Some(err),
            Self::HistoryDateNotPast(_) | Self::NoProfiles | Self::NoMatchingProfiles(_) => {
                None
            }
        }
    }
}

impl From<ProfileError> for ServiceError {
    fn from(value: ProfileError) -> Self {
        Self::Profile(value)
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<HistoryEditError> for ServiceError {
    fn from(value: HistoryEditError) -> Self {
        Self::History(value)
    }
}

impl From<BackupError> for ServiceError {
    fn from(value: BackupError) -> Self {
        Self::Backup(value)
    }
}

/// Proof that the user accepted a destructive prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserConfirmation {
    _accepted: (),
}

impl UserConfirmation {
    /// Issued by the surface after the user confirmed.
    pub fn granted() -> Self {
        Self { _accepted: () }
    }

    /// `Some` only when `confirmed` is set.
    pub fn from_flag(confirmed: bool) -> Option<Self> {
        confirmed.then(Self::granted)
    }
}

/// Live state of the active profile.
#[derive(Debug, Clone)]
pub struct Session {
    profile: Profile,
    gate: LoadGate,
    counts: DayCounts,
    history: HistoryArchive,
    streak: Streak,
    settings_override: SettingsOverride,
    settings: GoalSettings,
}

impl Session {
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn gate(&self) -> &LoadGate {
        &self.gate
    }

    pub fn counts(&self) -> &DayCounts {
        &self.counts
    }

    pub fn history(&self) -> &HistoryArchive {
        &self.history
    }

    pub fn streak(&self) -> Streak {
        self.streak
    }

    pub fn settings_override(&self) -> SettingsOverride {
        self.settings_override
    }

    /// Effective settings: profile defaults merged with the override.
    pub fn settings(&self) -> GoalSettings {
        self.settings
    }

    pub fn progress(&self) -> GoalProgress {
        evaluate(&self.counts, &self.settings)
    }

    /// Restorable copy of the live state.
    pub fn snapshot(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            counts: Some(self.counts.clone()),
            history: Some(self.history.clone()),
            streak: Some(self.streak),
            settings: (!self.settings_override.is_empty()).then_some(self.settings_override),
        }
    }

    fn from_loaded(profile: Profile, loaded: LoadedProfile) -> Self {
        Self {
            gate: LoadGate::loading(profile.id().clone()),
            settings: loaded.settings_override.resolve(profile.defaults()),
            settings_override: loaded.settings_override,
            counts: loaded.cycle.counts,
            history: loaded.cycle.history,
            streak: loaded.streak,
            profile,
        }
    }

    /// Replaces the live state, keeping the current gate.
    fn install(&mut self, profile: Profile, loaded: LoadedProfile) {
        let gate = self.gate.clone();
        *self = Self::from_loaded(profile, loaded);
        self.gate = gate;
    }
}

/// Result of one increment.
#[derive(Debug, Clone, PartialEq)]
pub struct IncrementReport {
    pub counts: DayCounts,
    pub streak: Streak,
    pub progress: GoalProgress,
    pub round_completed: bool,
    /// The daily goal was crossed by this increment.
    pub celebrate: bool,
    pub write: WriteStatus,
}

/// Result of a restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub write: WriteStatus,
    pub restored: Vec<ProfileId>,
    /// Namespaced prefixes with no matching profile.
    pub skipped_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
struct LoadRepairs {
    counts: bool,
    history: bool,
    streak: bool,
}

struct LoadedProfile {
    cycle: DayCycleOutcome,
    streak: Streak,
    settings_override: SettingsOverride,
    repairs: LoadRepairs,
}

/// Orchestrates sessions over a blob store and a clock.
pub struct ProgressService<S: BlobStore, C: Clock> {
    catalog: ProfileCatalog,
    store: ProfileStore<S>,
    clock: C,
}

impl<S: BlobStore, C: Clock> ProgressService<S, C> {
    pub fn new(catalog: ProfileCatalog, blobs: S, clock: C) -> Self {
        Self {
            catalog,
            store: ProfileStore::new(blobs),
            clock,
        }
    }

    pub fn catalog(&self) -> &ProfileCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &ProfileStore<S> {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Opens a session for `profile_id`.
    pub fn activate(&self, profile_id: &str) -> ServiceResult<Session> {
        let profile = self.catalog.require(profile_id)?.clone();
        let loaded = self.load_profile(&profile)?;
        let repairs = loaded.repairs;
        let mut session = Session::from_loaded(profile, loaded);
        self.finish_load(&mut session, repairs)?;
        Ok(session)
    }

    /// Opens a session for the remembered profile, else the catalog fallback.
    pub fn activate_last(&self) -> ServiceResult<Session> {
        let remembered = self.store.active_profile_id()?;
        let profile_id = match remembered.as_deref() {
            Some(id) if self.catalog.get(id).is_some() => id.to_string(),
            _ => self
                .catalog
                .fallback()
                .ok_or(ServiceError::NoProfiles)?
                .id()
                .to_string(),
        };
        self.activate(&profile_id)
    }

    /// Re-targets `session` at another profile.
    ///
    /// On failure the session keeps its previous profile and state.
    pub fn switch_profile(&self, session: &mut Session, profile_id: &str) -> ServiceResult<()> {
        let profile = self.catalog.require(profile_id)?.clone();
        let previous = session.gate.profile().clone();
        session.gate.begin_load(profile.id().clone());

        let loaded = match self.load_profile(&profile) {
            Ok(loaded) => loaded,
            Err(err) => {
                session.gate.begin_load(previous);
                session.gate.mark_ready();
                return Err(err);
            }
        };
        let repairs = loaded.repairs;
        session.install(profile, loaded);
        self.finish_load(session, repairs)?;
        info!(
            "event=profile_switch module=service status=ok from={} to={}",
            previous,
            session.profile.id()
        );
        Ok(())
    }

    /// Counts one bead.
    pub fn increment(&self, session: &mut Session) -> ServiceResult<IncrementReport> {
        self.sync_day(session)?;
        let today = self.clock.today();

        let outcome = engine::increment::increment(&session.counts, &session.settings);
        let streak = next_streak(session.streak, today, outcome.goal_crossed);
        let streak_changed = streak != session.streak;
        session.counts = outcome.counts;
        session.streak = streak;

        let mut batch = ProfileBatch::new();
        batch.put(&session.counts)?;
        if streak_changed {
            batch.put(&session.streak)?;
        }
        let write = self.store.commit(&session.gate, &session.profile, batch)?;

        if outcome.goal_crossed {
            info!(
                "event=goal_reached module=service status=ok profile={} rounds={} streak={}",
                session.profile.id(),
                session.counts.round_count,
                session.streak.count()
            );
        }

        Ok(IncrementReport {
            counts: session.counts.clone(),
            streak: session.streak,
            progress: session.progress(),
            round_completed: outcome.round_completed,
            celebrate: outcome.goal_crossed,
            write,
        })
    }

    /// Zeroes today's counts; the streak is kept.
    pub fn reset_today(
        &self,
        session: &mut Session,
        _confirmation: UserConfirmation,
    ) -> ServiceResult<WriteStatus> {
        self.sync_day(session)?;
        session.counts = DayCounts::fresh(self.clock.today());
        let write = self
            .store
            .write(&session.gate, &session.profile, &session.counts)?;
        info!(
            "event=counts_reset module=service status=ok profile={}",
            session.profile.id()
        );
        Ok(write)
    }

    /// Replaces the history entry dated `original`.
    pub fn edit_history(
        &self,
        session: &mut Session,
        original: CalendarDate,
        updated: HistoryEntry,
    ) -> ServiceResult<WriteStatus> {
        self.sync_day(session)?;
        if updated.date >= self.clock.today() {
            return Err(ServiceError::HistoryDateNotPast(updated.date));
        }
        let mut history = session.history.clone();
        history.edit(original, updated)?;
        session.history = history;
        Ok(self
            .store
            .write(&session.gate, &session.profile, &session.history)?)
    }

    pub fn remove_history(
        &self,
        session: &mut Session,
        date: CalendarDate,
    ) -> ServiceResult<HistoryEntry> {
        self.sync_day(session)?;
        let mut history = session.history.clone();
        let removed = history.remove(date)?;
        session.history = history;
        self.store
            .write(&session.gate, &session.profile, &session.history)?;
        Ok(removed)
    }

    /// Stores a new override and returns the resulting effective settings.
    ///
    /// Beads beyond a shrunken round size are carried into whole rounds.
    pub fn update_settings(
        &self,
        session: &mut Session,
        update: SettingsOverride,
    ) -> ServiceResult<GoalSettings> {
        let settings = update.resolve(session.profile.defaults());
        let mut counts = session.counts.clone();
        if counts.bead_count >= settings.beads_per_round {
            counts.round_count = counts
                .round_count
                .saturating_add(counts.bead_count / settings.beads_per_round);
            counts.bead_count %= settings.beads_per_round;
        }

        let mut batch = ProfileBatch::new();
        if update.is_empty() {
            batch.remove(StateKind::Settings);
        } else {
            batch.put(&update)?;
        }
        if counts != session.counts {
            batch.put(&counts)?;
        }

        session.settings_override = update;
        session.settings = settings;
        session.counts = counts;
        self.store.commit(&session.gate, &session.profile, batch)?;
        info!(
            "event=settings_update module=service status=ok profile={} beads_per_round={} goal={}",
            session.profile.id(),
            settings.beads_per_round,
            settings.daily_goal.kind.as_str()
        );
        Ok(settings)
    }

    pub fn lifetime_beads(&self, session: &Session) -> u64 {
        lifetime_beads(&session.counts, &session.history, &session.settings)
    }

    /// Single-profile backup of the live session.
    pub fn export_profile(&self, session: &Session) -> ServiceResult<Vec<u8>> {
        Ok(backup::export_profile(&session.profile, &session.snapshot())?)
    }

    /// Namespaced backup of every catalog profile.
    ///
    /// The session's profile is exported from live state, others as stored.
    pub fn export_all(&self, session: &Session) -> ServiceResult<Vec<u8>> {
        let mut snapshots = Vec::with_capacity(self.catalog.len());
        for profile in self.catalog.iter() {
            let snapshot = if profile.id() == session.profile.id() {
                session.snapshot()
            } else {
                self.stored_snapshot(profile)?
            };
            snapshots.push((profile, snapshot));
        }
        Ok(backup::export_all(
            snapshots.iter().map(|(profile, snapshot)| (*profile, snapshot)),
        )?)
    }

    /// Validates `bytes` and restores them.
    pub fn import_backup(
        &self,
        session: &mut Session,
        bytes: &[u8],
        confirmation: UserConfirmation,
    ) -> ServiceResult<RestoreReport> {
        let document = backup::validate(bytes)?;
        self.restore(session, document, confirmation)
    }

    /// Overwrites stored state with `document` and reloads the session.
    ///
    /// Single-profile documents target the session's profile. Absent
    /// counts/history/streak reset to defaults; absent settings are kept.
    pub fn restore(
        &self,
        session: &mut Session,
        document: BackupDocument,
        _confirmation: UserConfirmation,
    ) -> ServiceResult<RestoreReport> {
        let mut restored = Vec::new();
        let mut skipped_prefixes = Vec::new();

        let write = match document {
            BackupDocument::SingleProfile(snapshot) => {
                let batch = restore_batch(&snapshot)?;
                restored.push(session.profile.id().clone());
                self.store.commit(&session.gate, &session.profile, batch)?
            }
            BackupDocument::MultiProfileBlob(blob) => {
                let mut batches = Vec::new();
                for (prefix, snapshot) in &blob {
                    match self.catalog.by_prefix(prefix) {
                        Some(profile) => {
                            batches.push((profile, restore_batch(snapshot)?));
                            restored.push(profile.id().clone());
                        }
                        None => {
                            warn!(
                                "event=backup_restore module=service status=skipped prefix={prefix}"
                            );
                            skipped_prefixes.push(prefix.clone());
                        }
                    }
                }
                if batches.is_empty() {
                    return Err(ServiceError::NoMatchingProfiles(skipped_prefixes));
                }
                self.store.commit_restore(&session.gate, batches)?
            }
        };

        info!(
            "event=backup_restore module=service status=ok write={:?} profiles={} skipped={}",
            write,
            restored.len(),
            skipped_prefixes.len()
        );

        let current = session.profile.id().to_string();
        self.switch_profile(session, &current)?;

        Ok(RestoreReport {
            write,
            restored,
            skipped_prefixes,
        })
    }

    pub fn report(&self, session: &Session) -> ProgressReport {
        build_report(
            &session.profile,
            &session.settings,
            &session.counts,
            &session.history,
            session.streak,
        )
    }

    /// Reports for every catalog profile, read from storage with rollover
    /// applied in memory only.
    pub fn report_all(&self) -> ServiceResult<Vec<ProgressReport>> {
        let mut reports = Vec::with_capacity(self.catalog.len());
        for profile in self.catalog.iter() {
            let loaded = self.load_profile(profile)?;
            let settings = loaded.settings_override.resolve(profile.defaults());
            reports.push(build_report(
                profile,
                &settings,
                &loaded.cycle.counts,
                &loaded.cycle.history,
                loaded.streak,
            ));
        }
        Ok(reports)
    }

    fn load_profile(&self, profile: &Profile) -> ServiceResult<LoadedProfile> {
        let today = self.clock.today();
        let stored_counts = self.store.read::<DayCounts>(profile)?;
        let history = self
            .store
            .read::<HistoryArchive>(profile)?
            .unwrap_or_default();
        let stored_streak = self.store.read::<Streak>(profile)?.unwrap_or_default();
        let settings_override = self
            .store
            .read::<SettingsOverride>(profile)?
            .unwrap_or_default();

        let cycle = roll_over(stored_counts, history, today);
        let streak = validate_on_load(stored_streak, today);
        let repairs = LoadRepairs {
            counts: cycle.counts_changed(),
            history: cycle.history_changed(),
            streak: streak != stored_streak,
        };

        Ok(LoadedProfile {
            cycle,
            streak,
            settings_override,
            repairs,
        })
    }

    /// Opens the gate, persists load repairs and remembers the profile.
    fn finish_load(&self, session: &mut Session, repairs: LoadRepairs) -> ServiceResult<()> {
        session.gate.mark_ready();
        self.persist_repairs(session, repairs)?;
        self.store.remember_active(session.profile.id())?;
        info!(
            "event=profile_load module=service status=ok profile={} counts_repaired={} archived={} streak_repaired={}",
            session.profile.id(),
            repairs.counts,
            repairs.history,
            repairs.streak
        );
        Ok(())
    }

    fn persist_repairs(&self, session: &Session, repairs: LoadRepairs) -> ServiceResult<WriteStatus> {
        let mut batch = ProfileBatch::new();
        if repairs.history {
            batch.put(&session.history)?;
        }
        if repairs.counts {
            batch.put(&session.counts)?;
        }
        if repairs.streak {
            batch.put(&session.streak)?;
        }
        Ok(self.store.commit(&session.gate, &session.profile, batch)?)
    }

    /// Rolls the session over if the calendar day moved since it loaded.
    fn sync_day(&self, session: &mut Session) -> ServiceResult<()> {
        let today = self.clock.today();
        if session.counts.is_dated(today) {
            return Ok(());
        }

        let cycle = roll_over(
            Some(session.counts.clone()),
            session.history.clone(),
            today,
        );
        let streak = validate_on_load(session.streak, today);
        let repairs = LoadRepairs {
            counts: cycle.counts_changed(),
            history: cycle.history_changed(),
            streak: streak != session.streak,
        };
        if let CountsSource::RolledOver { from } = cycle.source {
            info!(
                "event=day_rollover module=service status=ok profile={} from={} to={} archived={}",
                session.profile.id(),
                from,
                today,
                repairs.history
            );
        }

        session.counts = cycle.counts;
        session.history = cycle.history;
        session.streak = streak;
        self.persist_repairs(session, repairs)?;
        Ok(())
    }

    fn stored_snapshot(&self, profile: &Profile) -> ServiceResult<ProfileSnapshot> {
        Ok(ProfileSnapshot {
            counts: self.store.read::<DayCounts>(profile)?,
            history: self.store.read::<HistoryArchive>(profile)?,
            streak: self.store.read::<Streak>(profile)?,
            settings: self
                .store
                .read::<SettingsOverride>(profile)?
                .filter(|settings| !settings.is_empty()),
        })
    }
}

fn restore_batch(snapshot: &ProfileSnapshot) -> ServiceResult<ProfileBatch> {
    let mut batch = ProfileBatch::new();
    match &snapshot.counts {
        Some(counts) => batch.put(counts)?,
        None => batch.remove(StateKind::Counts),
    };
    match &snapshot.history {
        Some(history) => batch.put(history)?,
        None => batch.remove(StateKind::History),
    };
    match &snapshot.streak {
        Some(streak) => batch.put(streak)?,
        None => batch.remove(StateKind::Streak),
    };
    match &snapshot.settings {
        Some(settings) if settings.is_empty() => batch.remove(StateKind::Settings),
        Some(settings) => batch.put(settings)?,
        None => &mut batch,
    };
    Ok(batch)
}
