//! Goal settings and per-profile overrides.
//!
//! # Responsibility
//! - Define the effective `GoalSettings` consumed by the engine.
//! - Merge a stored partial override over a profile's built-in defaults.
//!
//! # Invariants
//! - Effective settings always have `beads_per_round > 0` and a goal value
//!   `> 0`; invalid override fields fall back to the default field.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Unit the daily goal is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalKind {
    Rounds,
    Beads,
}

impl GoalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rounds => "rounds",
            Self::Beads => "beads",
        }
    }
}

/// Daily target, e.g. `{ "type": "rounds", "value": 1 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyGoal {
    #[serde(rename = "type")]
    pub kind: GoalKind,
    pub value: u32,
}

impl DailyGoal {
    pub fn rounds(value: u32) -> Self {
        Self {
            kind: GoalKind::Rounds,
            value,
        }
    }

    pub fn beads(value: u32) -> Self {
        Self {
            kind: GoalKind::Beads,
            value,
        }
    }

    /// Short human label, e.g. `1 round(s)` or `1080 beads`.
    pub fn label(&self) -> String {
        match self.kind {
            GoalKind::Rounds => format!("{} round(s)", self.value),
            GoalKind::Beads => format!("{} beads", self.value),
        }
    }
}

/// Effective settings for one profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSettings {
    pub beads_per_round: u32,
    pub daily_goal: DailyGoal,
}

impl GoalSettings {
    pub fn validate(&self) -> Result<(), SettingsValidationError> {
        if self.beads_per_round == 0 {
            return Err(SettingsValidationError::ZeroBeadsPerRound);
        }
        if self.daily_goal.value == 0 {
            return Err(SettingsValidationError::ZeroGoalValue);
        }
        Ok(())
    }
}

/// Settings validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsValidationError {
    ZeroBeadsPerRound,
    ZeroGoalValue,
}

impl Display for SettingsValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroBeadsPerRound => write!(f, "beadsPerRound must be greater than zero"),
            Self::ZeroGoalValue => write!(f, "dailyGoal.value must be greater than zero"),
        }
    }
}

impl Error for SettingsValidationError {}

/// Stored partial override of a profile's defaults (`{prefix}_settings`).
///
/// Every field is optional; absent fields inherit the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beads_per_round: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_goal: Option<DailyGoalOverride>,
}

/// Partial daily goal override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DailyGoalOverride {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<GoalKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u32>,
}

impl SettingsOverride {
    /// Full override from effective settings.
    pub fn from_settings(settings: GoalSettings) -> Self {
        Self {
            beads_per_round: Some(settings.beads_per_round),
            daily_goal: Some(DailyGoalOverride {
                kind: Some(settings.daily_goal.kind),
                value: Some(settings.daily_goal.value),
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.beads_per_round.is_none() && self.daily_goal.is_none()
    }

    /// Field-by-field merge over `defaults`.
    pub fn resolve(&self, defaults: GoalSettings) -> GoalSettings {
        let goal = self.daily_goal.unwrap_or_default();
        GoalSettings {
            beads_per_round: positive_or(self.beads_per_round, defaults.beads_per_round),
            daily_goal: DailyGoal {
                kind: goal.kind.unwrap_or(defaults.daily_goal.kind),
                value: positive_or(goal.value, defaults.daily_goal.value),
            },
        }
    }
}

fn positive_or(value: Option<u32>, fallback: u32) -> u32 {
    match value {
        Some(value) if value > 0 => value,
        _ => fallback,
    }
}
