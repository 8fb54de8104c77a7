//! Readiness probing for provisioned instances.
//!
//! A [`probe::ReadinessProbe`] reconciles the instance's own database,
//! its environment endpoint, and its administrative-user bootstrap into
//! one verdict, and can write that verdict back to the instance record.

pub mod probe;
pub mod telemetry;

pub use probe::{ProbeResult, ReadinessProbe};
