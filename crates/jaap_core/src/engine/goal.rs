//! Daily goal evaluation.

use crate::model::counts::DayCounts;
use crate::model::settings::{GoalKind, GoalSettings};

/// Progress toward the daily goal.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalProgress {
    /// Fraction in `[0, 1]`.
    pub fraction: f64,
    /// `current/target` in the goal's unit, e.g. `54/108`.
    pub label: String,
    pub reached: bool,
}

/// Evaluates `counts` against the daily goal in `settings`.
pub fn evaluate(counts: &DayCounts, settings: &GoalSettings) -> GoalProgress {
    let target = u64::from(settings.daily_goal.value);
    let current = match settings.daily_goal.kind {
        GoalKind::Rounds => u64::from(counts.round_count),
        GoalKind::Beads => counts.total_beads(settings.beads_per_round),
    };

    let fraction = if target == 0 {
        1.0
    } else {
        (current as f64 / target as f64).min(1.0)
    };

    GoalProgress {
        fraction,
        label: format!("{current}/{target}"),
        reached: current >= target,
    }
}

/// Whether the goal is reached now but was not yet recorded as reached today.
pub fn just_reached(counts: &DayCounts, settings: &GoalSettings) -> bool {
    evaluate(counts, settings).reached && !counts.target_reached_today
}

#[cfg(test)]
mod tests {
    use super::{evaluate, just_reached};
    use crate::model::counts::DayCounts;
    use crate::model::date::CalendarDate;
    use crate::model::settings::{DailyGoal, GoalSettings};

    fn counts(beads: u32, rounds: u32) -> DayCounts {
        DayCounts {
            bead_count: beads,
            round_count: rounds,
            last_visit_date: CalendarDate::from_ymd(2024, 1, 1).unwrap(),
            target_reached_today: false,
        }
    }

    #[test]
    fn rounds_goal_caps_fraction_at_one() {
        let settings = GoalSettings {
            beads_per_round: 108,
            daily_goal: DailyGoal::rounds(2),
        };
        let half = evaluate(&counts(50, 1), &settings);
        assert_eq!(half.fraction, 0.5);
        assert_eq!(half.label, "1/2");
        assert!(!half.reached);

        let over = evaluate(&counts(0, 5), &settings);
        assert_eq!(over.fraction, 1.0);
        assert!(over.reached);
    }

    #[test]
    fn beads_goal_counts_whole_rounds() {
        let settings = GoalSettings {
            beads_per_round: 10,
            daily_goal: DailyGoal::beads(25),
        };
        let progress = evaluate(&counts(5, 2), &settings);
        assert_eq!(progress.label, "25/25");
        assert!(progress.reached);
        assert!(just_reached(&counts(5, 2), &settings));

        let mut already = counts(5, 2);
        already.target_reached_today = true;
        assert!(!just_reached(&already, &settings));
    }
}
