//! NeuroFeel Demo Client
//!
//! Typed client for the NeuroFeel emotion recognition API plus the
//! client-side logic of the interactive demo: single-prediction flows,
//! paced batch runs with accuracy statistics, a bounded prediction history,
//! cached dashboard resources and feature-importance ranking.
//!
//! ## Layout
//! - `logic/` - engines: backend client, prediction flows, history, session store
//! - `api/` - command surface used by the `neurofeel` binary

pub mod api;
pub mod constants;
pub mod logic;

pub use logic::backend::{ApiClient, PredictionApi};
pub use logic::config::ClientConfig;
pub use logic::error::{ApiError, ApiResult};
