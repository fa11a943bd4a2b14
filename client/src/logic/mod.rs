//! Logic Module - Client Engines
//!
//! - `backend/` - HTTP client and wire types of the prediction API
//! - `prediction/` - single-prediction flows, batch orchestrator, statistics
//! - `resources/` - cached dashboard data with loading state
//! - `history` / `session` - recent predictions and the session state store

pub mod backend;
pub mod config;
pub mod error;
pub mod history;
pub mod prediction;
pub mod ranking;
pub mod resources;
pub mod session;
