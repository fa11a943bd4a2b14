//! API Module
//!
//! Command surface of the `neurofeel` binary.
//!
//! Structure:
//! - context.rs: shared client, session store, flows and resources
//! - commands.rs: one async function per CLI subcommand
//! - render.rs: text/JSON output of command results

pub mod commands;
pub mod context;
pub mod render;

pub use context::AppContext;
