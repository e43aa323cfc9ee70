//! Core business logic for the placement logbook.
//!
//! Services are plain structs over the repositories in `logbook-db`. They are
//! cheap to clone and hold no per-request state.

pub mod services;

pub use services::*;
