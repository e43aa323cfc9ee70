//! HTTP API layer for the placement logbook.
//!
//! - **Endpoints**: JSON, `POST` style, grouped by resource
//! - **Extractors**: the acting user
//! - **Middleware**: actor resolution from the session header
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::{health, router};
pub use middleware::{AppState, actor_middleware};
