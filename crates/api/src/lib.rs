//! Guidepost API server library.
//!
//! Exposes the core building blocks (config, state, error handling, routes,
//! playback engine) so integration tests and the binary entrypoint can both
//! access them.

pub mod background;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
