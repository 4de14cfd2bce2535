//! JSON backup codec.
//!
//! Two shapes are accepted on import:
//! - single profile: `{ "counts": .., "history": .., "streak": .., "settings"?: .. }`
//! - namespaced blob: `{ "<prefix>_<kind>": value | "json text", .. }`
//!
//! Metadata keys (`format`, `version`, `profile`, `backupId`) are written on
//! export and ignored on import.

use crate::model::counts::DayCounts;
use crate::model::history::HistoryArchive;
use crate::model::profile::{parse_namespaced_key, Profile, StateKind};
use crate::model::settings::SettingsOverride;
use crate::model::streak::Streak;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Value of the `format` metadata key.
pub const BACKUP_FORMAT: &str = "jaap-progress-backup";
/// Value of the `version` metadata key.
pub const BACKUP_VERSION: u32 = 1;

const SINGLE_PROFILE_FIELDS: [&str; 3] = ["counts", "history", "streak"];

/// Backup payload rejected before any state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupError {
    /// Not a JSON object with a recognizable state shape.
    UnrecognizedFormat,
    /// A recognized field is present but structurally invalid.
    InvalidField { field: String, message: String },
    /// Local state could not be encoded.
    Encode(String),
}

impl Display for BackupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnrecognizedFormat => write!(f, "backup file format is not recognized"),
            Self::InvalidField { field, message } => {
                write!(f, "backup field `{field}` is invalid: {message}")
            }
            Self::Encode(message) => write!(f, "failed to encode backup: {message}"),
        }
    }
}

impl Error for BackupError {}

/// Restorable state of one profile.
///
/// `None` fields are absent from the backup; restoring overwrites them with
/// defaults, except `settings`, which is only replaced when present.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileSnapshot {
    pub counts: Option<DayCounts>,
    pub history: Option<HistoryArchive>,
    pub streak: Option<Streak>,
    pub settings: Option<SettingsOverride>,
}

impl ProfileSnapshot {
    /// At least one of counts, history or streak decoded to a value.
    fn has_progress_state(&self) -> bool {
        self.counts.is_some() || self.history.is_some() || self.streak.is_some()
    }

    fn set_from_value(&mut self, kind: StateKind, field: &str, value: Value) -> Result<(), BackupError> {
        match kind {
            StateKind::Counts => self.counts = decode_field(field, value)?,
            StateKind::History => self.history = decode_field(field, value)?,
            StateKind::Streak => self.streak = decode_field(field, value)?,
            StateKind::Settings => self.settings = decode_field(field, value)?,
        }
        Ok(())
    }
}

/// Validated backup contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupDocument {
    SingleProfile(ProfileSnapshot),
    /// Storage prefix -> documents found for that prefix.
    MultiProfileBlob(BTreeMap<String, ProfileSnapshot>),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SingleProfileExport<'a> {
    format: &'static str,
    version: u32,
    backup_id: Uuid,
    profile: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    counts: Option<&'a DayCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    history: Option<&'a HistoryArchive>,
    #[serde(skip_serializing_if = "Option::is_none")]
    streak: Option<&'a Streak>,
    #[serde(skip_serializing_if = "Option::is_none")]
    settings: Option<&'a SettingsOverride>,
}

/// Serializes one profile's state as a single-profile backup.
pub fn export_profile(profile: &Profile, snapshot: &ProfileSnapshot) -> Result<Vec<u8>, BackupError> {
    let document = SingleProfileExport {
        format: BACKUP_FORMAT,
        version: BACKUP_VERSION,
        backup_id: Uuid::new_v4(),
        profile: profile.id().as_str(),
        counts: snapshot.counts.as_ref(),
        history: snapshot.history.as_ref(),
        streak: snapshot.streak.as_ref(),
        settings: snapshot.settings.as_ref(),
    };
    serde_json::to_vec_pretty(&document).map_err(|err| BackupError::Encode(err.to_string()))
}

/// Serializes several profiles as a namespaced blob keyed `{prefix}_{kind}`.
pub fn export_all<'a>(
    profiles: impl IntoIterator<Item = (&'a Profile, &'a ProfileSnapshot)>,
) -> Result<Vec<u8>, BackupError> {
    let mut root = Map::new();
    root.insert("format".to_string(), Value::from(BACKUP_FORMAT));
    root.insert("version".to_string(), Value::from(BACKUP_VERSION));
    root.insert("backupId".to_string(), Value::from(Uuid::new_v4().to_string()));

    for (profile, snapshot) in profiles {
        insert_doc(&mut root, profile, StateKind::Counts, snapshot.counts.as_ref())?;
        insert_doc(&mut root, profile, StateKind::History, snapshot.history.as_ref())?;
        insert_doc(&mut root, profile, StateKind::Streak, snapshot.streak.as_ref())?;
        insert_doc(&mut root, profile, StateKind::Settings, snapshot.settings.as_ref())?;
    }

    serde_json::to_vec_pretty(&Value::Object(root)).map_err(|err| BackupError::Encode(err.to_string()))
}

/// Parses untrusted backup bytes.
pub fn validate(bytes: &[u8]) -> Result<BackupDocument, BackupError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|_| BackupError::UnrecognizedFormat)?;
    let Value::Object(root) = value else {
        return Err(BackupError::UnrecognizedFormat);
    };

    if SINGLE_PROFILE_FIELDS
        .iter()
        .any(|field| root.contains_key(*field))
    {
        let snapshot = parse_single_profile(root)?;
        // Present-but-null fields carry no state to restore.
        if !snapshot.has_progress_state() {
            return Err(BackupError::UnrecognizedFormat);
        }
        return Ok(BackupDocument::SingleProfile(snapshot));
    }

    let blob = parse_namespaced_blob(root)?;
    if blob.is_empty() {
        return Err(BackupError::UnrecognizedFormat);
    }
    Ok(BackupDocument::MultiProfileBlob(blob))
}

fn parse_single_profile(mut root: Map<String, Value>) -> Result<ProfileSnapshot, BackupError> {
    let mut snapshot = ProfileSnapshot::default();
    for kind in StateKind::ALL {
        if let Some(value) = root.remove(kind.suffix()) {
            snapshot.set_from_value(kind, kind.suffix(), value)?;
        }
    }
    Ok(snapshot)
}

fn parse_namespaced_blob(
    root: Map<String, Value>,
) -> Result<BTreeMap<String, ProfileSnapshot>, BackupError> {
    let mut blob: BTreeMap<String, ProfileSnapshot> = BTreeMap::new();
    for (key, value) in root {
        let Some((prefix, kind)) = parse_namespaced_key(&key) else {
            continue;
        };
        // Whole-storage dumps carry each document as its raw JSON text.
        let value = match value {
            Value::String(text) => serde_json::from_str(&text).map_err(|err| BackupError::InvalidField {
                field: key.clone(),
                message: err.to_string(),
            })?,
            other => other,
        };
        let prefix = prefix.to_string();
        blob.entry(prefix)
            .or_default()
            .set_from_value(kind, &key, value)?;
    }
    blob.retain(|_, snapshot| snapshot.has_progress_state());
    Ok(blob)
}

fn decode_field<T: DeserializeOwned>(field: &str, value: Value) -> Result<Option<T>, BackupError> {
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|err| BackupError::InvalidField {
            field: field.to_string(),
            message: err.to_string(),
        })
}

fn insert_doc<T: Serialize>(
    root: &mut Map<String, Value>,
    profile: &Profile,
    kind: StateKind,
    value: Option<&T>,
) -> Result<(), BackupError> {
    if let Some(value) = value {
        let encoded = serde_json::to_value(value).map_err(|err| BackupError::Encode(err.to_string()))?;
        root.insert(profile.key(kind), encoded);
    }
    Ok(())
}
