//! HTTP handlers

pub mod health;
pub mod cross_model;
pub mod dataserving;
pub mod wesad;
