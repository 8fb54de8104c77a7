//! Instance registry types shared by the console gateway and the
//! readiness prober.
//!
//! The registry itself (how instance rows are stored and queried) is an
//! external concern; this crate defines the record shape, the readiness
//! state enums, and the [`InstanceRecord`] contract the rest of the
//! workspace programs against.

pub mod db;
pub mod instance;
pub mod state;

pub use db::InstanceDb;
pub use instance::{Instance, InstanceRecord};
pub use state::{DeactivationReason, PlatformState, ReadinessUpdate, ReadyState};

/// Errors surfaced by registry records and instance databases.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("instance database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("instance record update failed: {0}")]
    Update(String),
}
