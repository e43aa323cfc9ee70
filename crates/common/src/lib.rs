//! Common utilities and shared types for the logbook.
//!
//! This crate provides foundational components used across all logbook crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Geodesy**: Haversine distance and geofence classification in [`geo`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//!
//! # Example
//!
//! ```no_run
//! use logbook_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {}", id);
//!     println!("Geofence radius: {}m", config.attendance.geofence_radius_meters);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod geo;
pub mod id;

pub use config::{AttendanceConfig, Config, DatabaseConfig, ServerConfig};
pub use error::{AppError, AppResult};
pub use geo::{Coordinates, SiteClassification};
pub use id::IdGenerator;
