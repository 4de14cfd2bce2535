//! Profile-namespaced document store with a load gate.
//!
//! # Responsibility
//! - Map `(profile, kind)` to `{prefix}_{kind}` keys over a `BlobStore`.
//! - Decode documents tolerantly: unparsable JSON reads as absent.
//! - Suppress writes unless the gate is `Ready` for the target profile, so a
//!   write captured for one profile can never land after a switch to another.
//!
//! # Invariants
//! - Profiles never share keys.
//! - A suppressed write leaves the store untouched.

use crate::model::counts::DayCounts;
use crate::model::history::HistoryArchive;
use crate::model::profile::{Profile, ProfileId, StateKind, ACTIVE_PROFILE_KEY};
use crate::model::settings::SettingsOverride;
use crate::model::streak::Streak;
use crate::repo::blob_repo::{BlobChange, BlobStore, StoreError, StoreResult};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A document persisted under one profile key.
pub trait StateDocument: Serialize + DeserializeOwned {
    const KIND: StateKind;
}

impl StateDocument for DayCounts {
    const KIND: StateKind = StateKind::Counts;
}

impl StateDocument for HistoryArchive {
    const KIND: StateKind = StateKind::History;
}

impl StateDocument for Streak {
    const KIND: StateKind = StateKind::Streak;
}

impl StateDocument for SettingsOverride {
    const KIND: StateKind = StateKind::Settings;
}

/// Load state of the active profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Loading,
    Ready,
}

/// Write permission keyed to the active profile id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadGate {
    profile: ProfileId,
    phase: LoadPhase,
}

impl LoadGate {
    /// Gate for a profile whose initial load has not completed.
    pub fn loading(profile: ProfileId) -> Self {
        Self {
            profile,
            phase: LoadPhase::Loading,
        }
    }

    /// Re-targets the gate at another profile and closes it.
    pub fn begin_load(&mut self, profile: ProfileId) {
        self.profile = profile;
        self.phase = LoadPhase::Loading;
    }

    pub fn mark_ready(&mut self) {
        self.phase = LoadPhase::Ready;
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn profile(&self) -> &ProfileId {
        &self.profile
    }

    /// Whether a write targeting `profile` may be issued now.
    pub fn allows(&self, profile: &ProfileId) -> bool {
        self.phase == LoadPhase::Ready && &self.profile == profile
    }
}

/// Outcome of a gated write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Written,
    Suppressed,
}

/// Set of document changes for one profile, committed atomically.
#[derive(Debug, Default)]
pub struct ProfileBatch {
    changes: Vec<(StateKind, Option<String>)>,
}

impl ProfileBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put<T: StateDocument>(&mut self, value: &T) -> StoreResult<&mut Self> {
        let encoded = encode(value)?;
        self.changes.push((T::KIND, Some(encoded)));
        Ok(self)
    }

    /// Stores an already-encoded document verbatim.
    pub fn put_raw(&mut self, kind: StateKind, value: String) -> &mut Self {
        self.changes.push((kind, Some(value)));
        self
    }

    pub fn remove(&mut self, kind: StateKind) -> &mut Self {
        self.changes.push((kind, None));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    fn into_changes(self, profile: &Profile) -> Vec<BlobChange> {
        self.changes
            .into_iter()
            .map(|(kind, value)| match value {
                Some(value) => BlobChange::Put {
                    key: profile.key(kind),
                    value,
                },
                None => BlobChange::Remove {
                    key: profile.key(kind),
                },
            })
            .collect()
    }
}

/// Namespaced, gated persistence for profile documents.
pub struct ProfileStore<S: BlobStore> {
    blobs: S,
}

impl<S: BlobStore> ProfileStore<S> {
    pub fn new(blobs: S) -> Self {
        Self { blobs }
    }

    pub fn blobs(&self) -> &S {
        &self.blobs
    }

    /// Reads one document; absent and corrupt values both yield `None`.
    pub fn read<T: StateDocument>(&self, profile: &Profile) -> StoreResult<Option<T>> {
        let Some(raw) = self.read_raw(profile, T::KIND)? else {
            return Ok(None);
        };
        match serde_json::from_str::<T>(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(
                    "event=state_read module=repo status=corrupt error_code=storage_corrupt profile={} kind={} line={} column={}",
                    profile.id(),
                    T::KIND.suffix(),
                    err.line(),
                    err.column()
                );
                Ok(None)
            }
        }
    }

    /// Reads the stored text of one document without decoding it.
    pub fn read_raw(&self, profile: &Profile, kind: StateKind) -> StoreResult<Option<String>> {
        self.blobs.get(&profile.key(kind))
    }

    /// Writes one document if `gate` allows writes for `profile`.
    pub fn write<T: StateDocument>(
        &self,
        gate: &LoadGate,
        profile: &Profile,
        value: &T,
    ) -> StoreResult<WriteStatus> {
        let mut batch = ProfileBatch::new();
        batch.put(value)?;
        self.commit(gate, profile, batch)
    }

    /// Removes one document if `gate` allows writes for `profile`.
    pub fn remove(
        &self,
        gate: &LoadGate,
        profile: &Profile,
        kind: StateKind,
    ) -> StoreResult<WriteStatus> {
        let mut batch = ProfileBatch::new();
        batch.remove(kind);
        self.commit(gate, profile, batch)
    }

    /// Commits `batch` atomically if `gate` allows writes for `profile`.
    pub fn commit(
        &self,
        gate: &LoadGate,
        profile: &Profile,
        batch: ProfileBatch,
    ) -> StoreResult<WriteStatus> {
        if !gate.allows(profile.id()) {
            debug!(
                "event=state_write module=repo status=suppressed profile={} gate_profile={} phase={:?}",
                profile.id(),
                gate.profile(),
                gate.phase()
            );
            return Ok(WriteStatus::Suppressed);
        }
        if batch.is_empty() {
            return Ok(WriteStatus::Written);
        }
        let changes = batch.into_changes(profile);
        self.blobs.apply(&changes)?;
        debug!(
            "event=state_write module=repo status=ok profile={} changes={}",
            profile.id(),
            changes.len()
        );
        Ok(WriteStatus::Written)
    }

    /// Commits batches for several profiles in one transaction.
    ///
    /// Only a `Ready` gate may authorize this; it is the restore path for
    /// namespaced backups and bypasses the active-profile check.
    pub fn commit_restore(
        &self,
        gate: &LoadGate,
        batches: Vec<(&Profile, ProfileBatch)>,
    ) -> StoreResult<WriteStatus> {
        if gate.phase() != LoadPhase::Ready {
            debug!(
                "event=state_restore module=repo status=suppressed gate_profile={}",
                gate.profile()
            );
            return Ok(WriteStatus::Suppressed);
        }
        let changes: Vec<BlobChange> = batches
            .into_iter()
            .flat_map(|(profile, batch)| batch.into_changes(profile))
            .collect();
        if !changes.is_empty() {
            self.blobs.apply(&changes)?;
        }
        debug!(
            "event=state_restore module=repo status=ok changes={}",
            changes.len()
        );
        Ok(WriteStatus::Written)
    }

    /// Last active profile id, if one was remembered.
    pub fn active_profile_id(&self) -> StoreResult<Option<String>> {
        self.blobs.get(ACTIVE_PROFILE_KEY)
    }

    pub fn remember_active(&self, profile: &ProfileId) -> StoreResult<()> {
        self.blobs.put(ACTIVE_PROFILE_KEY, profile.as_str())
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> StoreResult<String> {
    serde_json::to_string(value).map_err(|err| StoreError::Encode(err.to_string()))
}
