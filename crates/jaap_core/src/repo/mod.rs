//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the key/value blob contract the engine persists through.
//! - Namespace documents per profile and gate writes on load state.
//!
//! # Invariants
//! - Corrupt or absent documents read as absent, never as errors.
//! - Transport failures (`StoreError`) are reported, not swallowed.

pub mod blob_repo;
pub mod profile_repo;
