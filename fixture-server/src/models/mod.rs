//! Data models

pub mod fixture;
pub mod wire;

pub use fixture::*;
pub use wire::*;
