//! Profiles and the storage-key namespace convention.
//!
//! # Responsibility
//! - Identify each isolated practice namespace (`Profile`).
//! - Own the `{prefix}_{kind}` key convention shared by storage and backups.
//!
//! # Invariants
//! - Profile ids and storage prefixes are unique within a catalog.
//! - A storage prefix never contains `_`, so every namespaced key splits
//!   unambiguously into `(prefix, kind)`.

use crate::model::settings::{DailyGoal, GoalSettings, SettingsValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static STORAGE_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]{0,31}$").expect("valid prefix regex"));
static NAMESPACED_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<prefix>[A-Za-z][A-Za-z0-9-]{0,31})_(?P<kind>counts|history|streak|settings)$")
        .expect("valid namespaced key regex")
});

/// Key remembering the last active profile id.
pub const ACTIVE_PROFILE_KEY: &str = "active_profile";

/// Kind of document stored per profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StateKind {
    Counts,
    History,
    Streak,
    Settings,
}

impl StateKind {
    pub const ALL: [StateKind; 4] = [Self::Counts, Self::History, Self::Streak, Self::Settings];

    /// Key suffix used after the profile prefix.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Counts => "counts",
            Self::History => "history",
            Self::Streak => "streak",
            Self::Settings => "settings",
        }
    }

    fn from_suffix(value: &str) -> Option<Self> {
        match value {
            "counts" => Some(Self::Counts),
            "history" => Some(Self::History),
            "streak" => Some(Self::Streak),
            "settings" => Some(Self::Settings),
            _ => None,
        }
    }
}

/// Splits `{prefix}_{kind}` into its parts; `None` for foreign keys.
pub fn parse_namespaced_key(key: &str) -> Option<(&str, StateKind)> {
    let captures = NAMESPACED_KEY_RE.captures(key)?;
    let prefix = captures.name("prefix")?.as_str();
    let kind = StateKind::from_suffix(captures.name("kind")?.as_str())?;
    Some((prefix, kind))
}

/// Stable profile identifier (`[a-z0-9_-]+`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn parse(value: &str) -> Result<Self, ProfileError> {
        let normalized = value.trim();
        let valid = !normalized.is_empty()
            && normalized
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
        if !valid {
            return Err(ProfileError::InvalidId(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProfileId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named, isolated namespace of progress state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    id: ProfileId,
    display_name: String,
    storage_prefix: String,
    defaults: GoalSettings,
}

impl Profile {
    pub fn new(
        id: &str,
        display_name: impl Into<String>,
        storage_prefix: &str,
        defaults: GoalSettings,
    ) -> Result<Self, ProfileError> {
        let id = ProfileId::parse(id)?;
        if !STORAGE_PREFIX_RE.is_match(storage_prefix) {
            return Err(ProfileError::InvalidPrefix(storage_prefix.to_string()));
        }
        defaults.validate().map_err(ProfileError::InvalidDefaults)?;
        let display_name = display_name.into();
        let display_name = match display_name.trim() {
            "" => id.to_string(),
            trimmed => trimmed.to_string(),
        };
        Ok(Self {
            id,
            display_name,
            storage_prefix: storage_prefix.to_string(),
            defaults,
        })
    }

    pub fn id(&self) -> &ProfileId {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn storage_prefix(&self) -> &str {
        &self.storage_prefix
    }

    /// Built-in goal settings before any stored override.
    pub fn defaults(&self) -> GoalSettings {
        self.defaults
    }

    /// Storage key for one document kind of this profile.
    pub fn key(&self, kind: StateKind) -> String {
        format!("{}_{}", self.storage_prefix, kind.suffix())
    }
}

/// Profile definition and lookup errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    InvalidId(String),
    InvalidPrefix(String),
    InvalidDefaults(SettingsValidationError),
    DuplicateId(String),
    DuplicatePrefix(String),
    UnknownProfile(String),
}

impl Display for ProfileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidId(value) => write!(f, "profile id is invalid: `{value}`"),
            Self::InvalidPrefix(value) => write!(f, "storage prefix is invalid: `{value}`"),
            Self::InvalidDefaults(err) => write!(f, "profile defaults are invalid: {err}"),
            Self::DuplicateId(value) => write!(f, "profile id already registered: {value}"),
            Self::DuplicatePrefix(value) => {
                write!(f, "storage prefix already registered: {value}")
            }
            Self::UnknownProfile(value) => write!(f, "profile not found: {value}"),
        }
    }
}

impl Error for ProfileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidDefaults(err) => Some(err),
            _ => None,
        }
    }
}

/// Known profiles; the first registered one is the fallback.
#[derive(Debug, Clone, Default)]
pub struct ProfileCatalog {
    profiles: Vec<Profile>,
}

impl ProfileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The two practices shipped with the app.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for (id, name, prefix, goal) in [
            ("om", "OM", "om", DailyGoal::rounds(1)),
            ("sat", "Sat", "sat", DailyGoal::beads(1080)),
        ] {
            let defaults = GoalSettings {
                beads_per_round: 108,
                daily_goal: goal,
            };
            if let Ok(profile) = Profile::new(id, name, prefix, defaults) {
                catalog.profiles.push(profile);
            }
        }
        catalog
    }

    pub fn register(&mut self, profile: Profile) -> Result<(), ProfileError> {
        if self.get(profile.id().as_str()).is_some() {
            return Err(ProfileError::DuplicateId(profile.id().to_string()));
        }
        if self.by_prefix(profile.storage_prefix()).is_some() {
            return Err(ProfileError::DuplicatePrefix(
                profile.storage_prefix().to_string(),
            ));
        }
        self.profiles.push(profile);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Profile> {
        let id = id.trim();
        self.profiles.iter().find(|profile| profile.id().as_str() == id)
    }

    pub fn require(&self, id: &str) -> Result<&Profile, ProfileError> {
        self.get(id)
            .ok_or_else(|| ProfileError::UnknownProfile(id.trim().to_string()))
    }

    pub fn by_prefix(&self, prefix: &str) -> Option<&Profile> {
        self.profiles
            .iter()
            .find(|profile| profile.storage_prefix() == prefix)
    }

    pub fn fallback(&self) -> Option<&Profile> {
        self.profiles.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
