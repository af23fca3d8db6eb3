//! Library for the container stats exporter
//!
//! This crate provides the core functionality for:
//! - Reading per-container stats from the container runtime
//! - Deriving normalized, unit-tagged metric samples
//! - Publishing samples to a metrics sink with per-sample isolation
//! - Structured logging

pub mod collector;
pub mod emitter;
pub mod error;
pub mod models;
pub mod observability;

pub use error::{SinkError, StatsError};
pub use models::*;
pub use observability::StructuredLogger;
