//! One-bead increment transition.

use crate::engine::goal::evaluate;
use crate::model::counts::DayCounts;
use crate::model::settings::GoalSettings;

/// Result of counting one bead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementOutcome {
    pub counts: DayCounts,
    /// The bead closed a round (external round-complete sound).
    pub round_completed: bool,
    /// The daily goal was crossed by this bead, at most once per day.
    pub goal_crossed: bool,
}

/// Advances `counts` by one bead.
///
/// `bead_count` wraps to zero at `beads_per_round` and bumps `round_count`;
/// rounds have no upper bound. The goal is evaluated on the tentative counts
/// against the pre-increment `target_reached_today` flag.
pub fn increment(counts: &DayCounts, settings: &GoalSettings) -> IncrementOutcome {
    let mut next = counts.clone();
    next.bead_count = next.bead_count.saturating_add(1);

    let round_completed = next.bead_count >= settings.beads_per_round;
    if round_completed {
        next.round_count = next.round_count.saturating_add(1);
        next.bead_count = 0;
    }

    let goal_crossed = evaluate(&next, settings).reached && !counts.target_reached_today;
    next.target_reached_today = counts.target_reached_today || goal_crossed;

    IncrementOutcome {
        counts: next,
        round_completed,
        goal_crossed,
    }
}
