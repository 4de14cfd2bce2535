//! Live per-day counters.

use crate::model::date::CalendarDate;
use serde::{Deserialize, Serialize};

/// Progress of the current calendar day for one profile.
///
/// Persisted as `{prefix}_counts` with camelCase field names; the shape is
/// shared with exported backups.
///
/// # Invariants
/// - `bead_count < beads_per_round` at rest; it only reaches the limit
///   transiently inside the increment transition before wrapping.
/// - `target_reached_today` never flips back to `false` within the same day
///   except through an explicit reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCounts {
    pub bead_count: u32,
    pub round_count: u32,
    pub last_visit_date: CalendarDate,
    pub target_reached_today: bool,
}

impl DayCounts {
    /// Zero-valued counters dated `today`.
    pub fn fresh(today: CalendarDate) -> Self {
        Self {
            bead_count: 0,
            round_count: 0,
            last_visit_date: today,
            target_reached_today: false,
        }
    }

    /// Whether this day recorded any bead at all.
    pub fn has_progress(&self) -> bool {
        self.bead_count > 0 || self.round_count > 0
    }

    /// Beads counted today, whole rounds included.
    pub fn total_beads(&self, beads_per_round: u32) -> u64 {
        u64::from(self.round_count) * u64::from(beads_per_round) + u64::from(self.bead_count)
    }

    pub fn is_dated(&self, day: CalendarDate) -> bool {
        self.last_visit_date == day
    }
}

#[cfg(test)]
mod tests {
    use super::DayCounts;
    use crate::model::date::CalendarDate;

    #[test]
    fn wire_shape_uses_fixed_field_names() {
        let counts = DayCounts {
            bead_count: 5,
            round_count: 2,
            last_visit_date: CalendarDate::from_ymd(2024, 1, 3).unwrap(),
            target_reached_today: true,
        };
        let value = serde_json::to_value(&counts).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "beadCount": 5,
                "roundCount": 2,
                "lastVisitDate": "2024-01-03",
                "targetReachedToday": true
            })
        );
    }

    #[test]
    fn negative_counts_are_rejected_by_parser() {
        let raw = r#"{"beadCount":-1,"roundCount":0,"lastVisitDate":"2024-01-03","targetReachedToday":false}"#;
        assert!(serde_json::from_str::<DayCounts>(raw).is_err());
    }

    #[test]
    fn total_beads_includes_whole_rounds() {
        let mut counts = DayCounts::fresh(CalendarDate::from_ymd(2024, 1, 3).unwrap());
        assert!(!counts.has_progress());
        counts.round_count = 3;
        counts.bead_count = 7;
        assert_eq!(counts.total_beads(108), 331);
    }
}
