//! Printable progress summary for one profile.

use crate::model::counts::DayCounts;
use crate::model::date::CalendarDate;
use crate::model::history::HistoryArchive;
use crate::model::profile::Profile;
use crate::model::settings::GoalSettings;
use crate::model::streak::Streak;

/// One archived day with bead totals derived from current settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub date: CalendarDate,
    pub rounds: u32,
    pub beads: u64,
}

/// Lifetime summary rendered by report/export surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReport {
    pub profile_id: String,
    pub profile_name: String,
    pub today: DayCounts,
    /// Archived beads plus today's beads.
    pub total_beads: u64,
    /// Archived rounds plus today's completed rounds.
    pub total_rounds: u64,
    pub streak_days: u32,
    pub beads_per_round: u32,
    pub goal_label: String,
    /// Newest day first.
    pub history: Vec<ReportRow>,
}

/// Archived history and today's counts, in beads.
///
/// Archived days are priced at the current `beads_per_round`; history does
/// not record the setting in force on that day.
pub fn lifetime_beads(counts: &DayCounts, history: &HistoryArchive, settings: &GoalSettings) -> u64 {
    history
        .total_rounds()
        .saturating_mul(u64::from(settings.beads_per_round))
        .saturating_add(counts.total_beads(settings.beads_per_round))
}

pub fn build_report(
    profile: &Profile,
    settings: &GoalSettings,
    counts: &DayCounts,
    history: &HistoryArchive,
    streak: Streak,
) -> ProgressReport {
    let per_round = u64::from(settings.beads_per_round);
    let rows = history
        .entries()
        .iter()
        .map(|entry| ReportRow {
            date: entry.date,
            rounds: entry.rounds,
            beads: u64::from(entry.rounds) * per_round,
        })
        .collect();

    ProgressReport {
        profile_id: profile.id().to_string(),
        profile_name: profile.display_name().to_string(),
        today: counts.clone(),
        total_beads: lifetime_beads(counts, history, settings),
        total_rounds: history.total_rounds() + u64::from(counts.round_count),
        streak_days: streak.count(),
        beads_per_round: settings.beads_per_round,
        goal_label: settings.daily_goal.label(),
        history: rows,
    }
}

#[cfg(test)]
mod tests {
    use super::{build_report, lifetime_beads};
    use crate::model::counts::DayCounts;
    use crate::model::date::CalendarDate;
    use crate::model::history::{HistoryArchive, HistoryEntry};
    use crate::model::profile::ProfileCatalog;
    use crate::model::streak::Streak;

    fn day(d: u32) -> CalendarDate {
        CalendarDate::from_ymd(2024, 3, d).unwrap()
    }

    #[test]
    fn lifetime_beads_prices_history_at_current_round_size() {
        let catalog = ProfileCatalog::builtin();
        let settings = catalog.get("om").unwrap().defaults();
        let history =
            HistoryArchive::from_entries([HistoryEntry::new(day(1), 2), HistoryEntry::new(day(2), 1)]);
        let mut counts = DayCounts::fresh(day(3));
        counts.round_count = 1;
        counts.bead_count = 10;

        assert_eq!(lifetime_beads(&counts, &history, &settings), 4 * 108 + 10);
    }

    #[test]
    fn report_lists_history_newest_first_with_bead_totals() {
        let catalog = ProfileCatalog::builtin();
        let profile = catalog.get("sat").unwrap();
        let settings = profile.defaults();
        let history =
            HistoryArchive::from_entries([HistoryEntry::new(day(1), 3), HistoryEntry::new(day(2), 5)]);
        let counts = DayCounts::fresh(day(3));

        let report = build_report(profile, &settings, &counts, &history, Streak::first_day(day(2)));

        assert_eq!(report.profile_name, "Sat");
        assert_eq!(report.total_rounds, 8);
        assert_eq!(report.streak_days, 1);
        assert_eq!(report.history[0].date, day(2));
        assert_eq!(report.history[0].beads, 5 * 108);
        assert_eq!(report.goal_label, "1080 beads");
    }
}
