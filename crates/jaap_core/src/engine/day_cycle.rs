//! Day-boundary rollover.
//!
//! # Invariants
//! - Stored counts dated anything other than `today` (past or future) roll
//!   over; counts dated `today` are kept as-is.
//! - A day with progress is archived at most once; re-running rollover on the
//!   same stale input never duplicates history.

use crate::model::counts::DayCounts;
use crate::model::date::CalendarDate;
use crate::model::history::{HistoryArchive, HistoryEntry};

/// Why the live counts differ from what was stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountsSource {
    /// Stored counts belong to today.
    Current,
    /// Nothing usable was stored; fresh counts were synthesized.
    Synthesized,
    /// Stored counts belonged to another day and were reset.
    RolledOver { from: CalendarDate },
}

/// Result of the load-time day check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCycleOutcome {
    pub counts: DayCounts,
    pub history: HistoryArchive,
    pub source: CountsSource,
    /// Entry added to `history` by this rollover, if any.
    pub archived: Option<HistoryEntry>,
}

impl DayCycleOutcome {
    /// Whether the counts must be written back.
    pub fn counts_changed(&self) -> bool {
        !matches!(self.source, CountsSource::Current)
    }

    pub fn history_changed(&self) -> bool {
        self.archived.is_some()
    }
}

/// Applies the day check to stored state.
pub fn roll_over(
    stored: Option<DayCounts>,
    mut history: HistoryArchive,
    today: CalendarDate,
) -> DayCycleOutcome {
    let Some(stored) = stored else {
        return DayCycleOutcome {
            counts: DayCounts::fresh(today),
            history,
            source: CountsSource::Synthesized,
            archived: None,
        };
    };

    if stored.is_dated(today) {
        return DayCycleOutcome {
            counts: stored,
            history,
            source: CountsSource::Current,
            archived: None,
        };
    }

    let mut archived = None;
    if stored.has_progress() {
        let entry = HistoryEntry::new(stored.last_visit_date, stored.round_count);
        if history.archive_day(entry) {
            archived = Some(entry);
        }
    }

    DayCycleOutcome {
        counts: DayCounts::fresh(today),
        history,
        source: CountsSource::RolledOver {
            from: stored.last_visit_date,
        },
        archived,
    }
}

#[cfg(test)]
mod tests {
    use super::{roll_over, CountsSource};
    use crate::model::counts::DayCounts;
    use crate::model::date::CalendarDate;
    use crate::model::history::HistoryArchive;

    #[test]
    fn beads_without_rounds_archive_a_zero_round_day() {
        let today = CalendarDate::from_ymd(2024, 1, 3).unwrap();
        let mut stored = DayCounts::fresh(CalendarDate::from_ymd(2024, 1, 2).unwrap());
        stored.bead_count = 40;

        let outcome = roll_over(Some(stored), HistoryArchive::new(), today);
        let entry = outcome.archived.expect("day with beads is archived");
        assert_eq!(entry.rounds, 0);
        assert_eq!(outcome.counts, DayCounts::fresh(today));
    }

    #[test]
    fn idle_day_resets_without_history() {
        let today = CalendarDate::from_ymd(2024, 1, 3).unwrap();
        let stored = DayCounts::fresh(CalendarDate::from_ymd(2023, 12, 20).unwrap());
        let outcome = roll_over(Some(stored), HistoryArchive::new(), today);
        assert!(outcome.history.is_empty());
        assert!(outcome.counts_changed());
        assert!(!outcome.history_changed());
        assert!(matches!(outcome.source, CountsSource::RolledOver { .. }));
    }
}
