//! Day-continuity streak value.
//!
//! # Invariants
//! - `count > 0` if and only if a last date is present; encoded by the enum
//!   shape so no other combination is representable.
//! - Wire shape stays `{ "count": n, "lastDate": "YYYY-MM-DD" | null }`;
//!   inconsistent wire values normalize to `Zero`.

use crate::model::date::CalendarDate;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

/// Streak of consecutive days on which the daily goal was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "StreakRecord", into = "StreakRecord")]
pub enum Streak {
    #[default]
    Zero,
    Active {
        count: NonZeroU32,
        last_date: CalendarDate,
    },
}

impl Streak {
    /// Starts a fresh one-day streak on `day`.
    pub fn first_day(day: CalendarDate) -> Self {
        Self::Active {
            count: NonZeroU32::MIN,
            last_date: day,
        }
    }

    pub fn count(&self) -> u32 {
        match self {
            Self::Zero => 0,
            Self::Active { count, .. } => count.get(),
        }
    }

    pub fn last_date(&self) -> Option<CalendarDate> {
        match self {
            Self::Zero => None,
            Self::Active { last_date, .. } => Some(*last_date),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreakRecord {
    count: u32,
    last_date: Option<CalendarDate>,
}

impl From<StreakRecord> for Streak {
    fn from(record: StreakRecord) -> Self {
        match (NonZeroU32::new(record.count), record.last_date) {
            (Some(count), Some(last_date)) => Self::Active { count, last_date },
            _ => Self::Zero,
        }
    }
}

impl From<Streak> for StreakRecord {
    fn from(streak: Streak) -> Self {
        Self {
            count: streak.count(),
            last_date: streak.last_date(),
        }
    }
}
