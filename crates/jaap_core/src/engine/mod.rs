//! Pure state transitions of the progress engine.
//!
//! # Responsibility
//! - Compute next states from current states; no I/O, no clock reads.
//!
//! # Invariants
//! - Every function here is deterministic for its inputs.
//! - Persistence and side effects (audio, celebration) belong to callers.

pub mod day_cycle;
pub mod goal;
pub mod increment;
pub mod streak;
