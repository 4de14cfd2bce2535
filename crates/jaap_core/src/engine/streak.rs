//! Streak state machine keyed by calendar date.
//!
//! Transitions:
//! - load: last date neither today nor yesterday -> `Zero`.
//! - goal crossed today: last date today -> unchanged; yesterday -> `n + 1`;
//!   anything else -> `1`.

use crate::model::date::CalendarDate;
use crate::model::streak::Streak;
use std::num::NonZeroU32;

/// Next streak for `today` given whether the goal was just reached.
pub fn next_streak(streak: Streak, today: CalendarDate, goal_just_reached: bool) -> Streak {
    if !goal_just_reached {
        return streak;
    }
    match streak {
        Streak::Active { last_date, .. } if last_date == today => streak,
        Streak::Active { count, last_date } if last_date == today.previous_day() => {
            Streak::Active {
                count: count.checked_add(1).unwrap_or(NonZeroU32::MAX),
                last_date: today,
            }
        }
        _ => Streak::first_day(today),
    }
}

/// Lazily invalidates a streak whose last day is neither today nor yesterday.
pub fn validate_on_load(streak: Streak, today: CalendarDate) -> Streak {
    match streak.last_date() {
        Some(last) if last == today || last == today.previous_day() => streak,
        _ => Streak::Zero,
    }
}

#[cfg(test)]
mod tests {
    use super::{next_streak, validate_on_load};
    use crate::model::date::CalendarDate;
    use crate::model::streak::Streak;
    use std::num::NonZeroU32;

    #[test]
    fn no_goal_event_means_no_transition() {
        let today = CalendarDate::from_ymd(2024, 1, 3).unwrap();
        assert_eq!(next_streak(Streak::Zero, today, false), Streak::Zero);
    }

    #[test]
    fn future_dated_streak_is_invalidated_on_load() {
        let today = CalendarDate::from_ymd(2024, 1, 3).unwrap();
        let skewed = Streak::Active {
            count: NonZeroU32::new(4).unwrap(),
            last_date: today.next_day(),
        };
        assert_eq!(validate_on_load(skewed, today), Streak::Zero);
    }
}
