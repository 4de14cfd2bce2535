//! Domain values for daily counting progress.
//!
//! # Responsibility
//! - Define the persisted shapes (counts, streak, history, settings) and the
//!   profile namespace they live in.
//!
//! # Invariants
//! - Wire field names are fixed for compatibility with existing stores and
//!   exported backups.

pub mod counts;
pub mod date;
pub mod history;
pub mod profile;
pub mod settings;
pub mod streak;
