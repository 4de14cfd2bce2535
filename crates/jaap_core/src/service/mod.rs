//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate engine transitions and profile persistence into session
//!   level APIs.
//! - Keep FFI layers decoupled from storage details.

pub mod progress_service;
pub mod report;
