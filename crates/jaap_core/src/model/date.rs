//! Calendar-day value type and clock seam.
//!
//! # Responsibility
//! - Represent persisted dates (`lastVisitDate`, `lastDate`, history `date`)
//!   as a typed calendar day instead of ad hoc strings.
//! - Provide `today()` / `yesterday()` through an injectable `Clock`.
//!
//! # Invariants
//! - Canonical text form is `YYYY-MM-DD`; ordering equals calendar order.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One calendar day, serialized as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarDate(NaiveDate);

impl CalendarDate {
    /// Builds a date from year/month/day, `None` when out of range.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Parses the canonical `YYYY-MM-DD` form.
    pub fn parse(value: &str) -> Result<Self, DateParseError> {
        NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
            .map(Self)
            .map_err(|_| DateParseError(value.to_string()))
    }

    /// The day before this one. Saturates at the earliest representable day.
    pub fn previous_day(self) -> Self {
        self.0.pred_opt().map_or(self, Self)
    }

    /// The day after this one. Saturates at the latest representable day.
    pub fn next_day(self) -> Self {
        self.0.succ_opt().map_or(self, Self)
    }

    pub fn as_naive(self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(value: NaiveDate) -> Self {
        Self(value)
    }
}

impl Display for CalendarDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for CalendarDate {
    type Err = DateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Text was not a `YYYY-MM-DD` calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParseError(String);

impl Display for DateParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid calendar date `{}`; expected YYYY-MM-DD", self.0)
    }
}

impl Error for DateParseError {}

/// Source of the current calendar day.
///
/// Every engine call that depends on "today" goes through this seam so day
/// boundaries can be tested deterministically.
pub trait Clock {
    fn today(&self) -> CalendarDate;

    fn yesterday(&self) -> CalendarDate {
        self.today().previous_day()
    }
}

/// Wall clock using the device's local calendar day.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> CalendarDate {
        CalendarDate(Local::now().date_naive())
    }
}

/// Clock pinned to one day; can be advanced manually.
#[derive(Debug, Clone)]
pub struct FixedClock {
    today: std::cell::Cell<CalendarDate>,
}

impl FixedClock {
    pub fn new(today: CalendarDate) -> Self {
        Self {
            today: std::cell::Cell::new(today),
        }
    }

    pub fn set(&self, today: CalendarDate) {
        self.today.set(today);
    }

    pub fn advance_days(&self, days: u32) {
        let mut day = self.today.get();
        for _ in 0..days {
            day = day.next_day();
        }
        self.today.set(day);
    }
}

impl Clock for FixedClock {
    fn today(&self) -> CalendarDate {
        self.today.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn today(&self) -> CalendarDate {
        (**self).today()
    }
}

#[cfg(test)]
mod tests {
    use super::{CalendarDate, Clock, FixedClock};

    #[test]
    fn parses_and_displays_canonical_form() {
        let date = CalendarDate::parse("2024-01-03").expect("valid date");
        assert_eq!(date.to_string(), "2024-01-03");
        assert!(CalendarDate::parse("2024-1-3x").is_err());
        assert!(CalendarDate::parse("03/01/2024").is_err());
    }

    #[test]
    fn previous_day_crosses_month_and_year() {
        let date = CalendarDate::from_ymd(2024, 3, 1).unwrap();
        assert_eq!(date.previous_day().to_string(), "2024-02-29");
        let new_year = CalendarDate::from_ymd(2025, 1, 1).unwrap();
        assert_eq!(new_year.previous_day().to_string(), "2024-12-31");
    }

    #[test]
    fn serde_uses_iso_string() {
        let date = CalendarDate::from_ymd(2024, 1, 1).unwrap();
        let json = serde_json::to_string(&date).unwrap();
        assert_eq!(json, "\"2024-01-01\"");
        let back: CalendarDate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, date);
    }

    #[test]
    fn fixed_clock_reports_yesterday_and_advances() {
        let clock = FixedClock::new(CalendarDate::from_ymd(2024, 1, 31).unwrap());
        assert_eq!(clock.yesterday().to_string(), "2024-01-30");
        clock.advance_days(2);
        assert_eq!(clock.today().to_string(), "2024-02-02");
    }
}
