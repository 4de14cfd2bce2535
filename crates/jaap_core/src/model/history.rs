//! Date-keyed log of completed days.
//!
//! # Responsibility
//! - Hold one `HistoryEntry` per archived calendar day.
//! - Keep the collection ordered most-recent-first after every edit.
//!
//! # Invariants
//! - At most one entry per `date`.
//! - Entries are sorted by `date` descending.
//! - Rollover never creates a second entry for an already archived date.

use crate::model::date::CalendarDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rounds completed on one archived day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: CalendarDate,
    pub rounds: u32,
}

impl HistoryEntry {
    pub fn new(date: CalendarDate, rounds: u32) -> Self {
        Self { date, rounds }
    }
}

/// Errors from user-driven history edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEditError {
    /// No entry exists for the date being edited or removed.
    EntryNotFound(CalendarDate),
    /// Edit would move an entry onto a date that already has one.
    DateTaken(CalendarDate),
}

impl Display for HistoryEditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EntryNotFound(date) => write!(f, "no history entry for {date}"),
            Self::DateTaken(date) => write!(f, "a history entry for {date} already exists"),
        }
    }
}

impl Error for HistoryEditError {}

/// Ordered, de-duplicated history for one profile.
///
/// Serialized as a bare JSON array of entries. Loading an array that breaks
/// the ordering or uniqueness invariant repairs it: entries are re-sorted and
/// the first occurrence of each date wins.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<HistoryEntry>", into = "Vec<HistoryEntry>")]
pub struct HistoryArchive {
    entries: Vec<HistoryEntry>,
}

impl HistoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an archive from arbitrary entries, restoring the invariants.
    pub fn from_entries(entries: impl IntoIterator<Item = HistoryEntry>) -> Self {
        let mut archive = Self::new();
        for entry in entries {
            archive.archive_day(entry);
        }
        archive
    }

    /// Inserts `entry` unless its date is already archived.
    ///
    /// Returns `true` when the archive changed.
    pub fn archive_day(&mut self, entry: HistoryEntry) -> bool {
        match self.position(entry.date) {
            Ok(_) => false,
            Err(index) => {
                self.entries.insert(index, entry);
                true
            }
        }
    }

    /// Replaces the entry dated `original` with `updated`.
    ///
    /// The date may change as long as it does not collide with another entry.
    pub fn edit(
        &mut self,
        original: CalendarDate,
        updated: HistoryEntry,
    ) -> Result<(), HistoryEditError> {
        let index = self
            .position(original)
            .map_err(|_| HistoryEditError::EntryNotFound(original))?;
        if updated.date != original && self.position(updated.date).is_ok() {
            return Err(HistoryEditError::DateTaken(updated.date));
        }
        self.entries.remove(index);
        self.archive_day(updated);
        Ok(())
    }

    /// Removes the entry dated `date`.
    pub fn remove(&mut self, date: CalendarDate) -> Result<HistoryEntry, HistoryEditError> {
        let index = self
            .position(date)
            .map_err(|_| HistoryEditError::EntryNotFound(date))?;
        Ok(self.entries.remove(index))
    }

    pub fn get(&self, date: CalendarDate) -> Option<&HistoryEntry> {
        self.position(date).ok().map(|index| &self.entries[index])
    }

    pub fn contains(&self, date: CalendarDate) -> bool {
        self.position(date).is_ok()
    }

    /// Entries, most recent first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_rounds(&self) -> u64 {
        self.entries.iter().map(|entry| u64::from(entry.rounds)).sum()
    }

    // Descending order, so compare reversed.
    fn position(&self, date: CalendarDate) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|entry| date.cmp(&entry.date))
    }
}

impl From<Vec<HistoryEntry>> for HistoryArchive {
    fn from(entries: Vec<HistoryEntry>) -> Self {
        Self::from_entries(entries)
    }
}

impl From<HistoryArchive> for Vec<HistoryEntry> {
    fn from(archive: HistoryArchive) -> Self {
        archive.entries
    }
}

#[cfg(test)]
mod tests {
    use super::{HistoryArchive, HistoryEditError, HistoryEntry};
    use crate::model::date::CalendarDate;

    fn day(d: u32) -> CalendarDate {
        CalendarDate::from_ymd(2024, 1, d).unwrap()
    }

    #[test]
    fn archive_day_keeps_descending_order_and_rejects_duplicates() {
        let mut archive = HistoryArchive::new();
        assert!(archive.archive_day(HistoryEntry::new(day(2), 1)));
        assert!(archive.archive_day(HistoryEntry::new(day(5), 2)));
        assert!(archive.archive_day(HistoryEntry::new(day(3), 3)));
        assert!(!archive.archive_day(HistoryEntry::new(day(3), 9)));

        let dates: Vec<_> = archive.entries().iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![day(5), day(3), day(2)]);
        assert_eq!(archive.get(day(3)).unwrap().rounds, 3);
    }

    #[test]
    fn deserializing_repairs_order_and_duplicates() {
        let raw = r#"[
            {"date":"2024-01-01","rounds":1},
            {"date":"2024-01-04","rounds":4},
            {"date":"2024-01-01","rounds":7}
        ]"#;
        let archive: HistoryArchive = serde_json::from_str(raw).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.entries()[0], HistoryEntry::new(day(4), 4));
        assert_eq!(archive.entries()[1], HistoryEntry::new(day(1), 1));
    }

    #[test]
    fn edit_moves_entry_and_refuses_collisions() {
        let mut archive = HistoryArchive::from_entries([
            HistoryEntry::new(day(1), 1),
            HistoryEntry::new(day(2), 2),
        ]);

        archive
            .edit(day(1), HistoryEntry::new(day(9), 5))
            .expect("move to free date");
        assert_eq!(archive.entries()[0], HistoryEntry::new(day(9), 5));

        let err = archive
            .edit(day(9), HistoryEntry::new(day(2), 1))
            .unwrap_err();
        assert_eq!(err, HistoryEditError::DateTaken(day(2)));

        archive
            .edit(day(2), HistoryEntry::new(day(2), 8))
            .expect("same-date edit");
        assert_eq!(archive.get(day(2)).unwrap().rounds, 8);
        assert_eq!(archive.total_rounds(), 13);
    }

    #[test]
    fn remove_missing_entry_is_an_error() {
        let mut archive = HistoryArchive::new();
        assert_eq!(
            archive.remove(day(1)).unwrap_err(),
            HistoryEditError::EntryNotFound(day(1))
        );
    }
}
