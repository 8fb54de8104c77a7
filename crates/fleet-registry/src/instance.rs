use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::RegistryError;
use crate::db::InstanceDb;
use crate::state::{DeactivationReason, PlatformState, ReadinessUpdate, ReadyState};

/// The operations the gateway and prober require from an instance
/// registry record.
///
/// This is the whole collaborator contract: identity, network location,
/// current readiness fields, a scoped database handle, and the one
/// write-back. Registry implementations expose exactly these operations,
/// nothing is forwarded dynamically.
pub trait InstanceRecord: Send + Sync {
    fn cluster_id(&self) -> String;
    fn instance_id(&self) -> String;
    /// Root URL the instance was provisioned at, e.g. `https://acme.example.com`.
    fn provisioned_endpoint(&self) -> String;
    /// Resource prefix under the endpoint, e.g. `api/v2`.
    fn resource_uri(&self) -> String;
    fn activated(&self) -> bool;
    fn ready_state(&self) -> ReadyState;
    fn platform_state(&self) -> PlatformState;
    /// Open a fresh, scoped handle to the instance's own database.
    fn open_database(&self) -> Result<InstanceDb, RegistryError>;
    /// Persist a readiness verdict on the record.
    fn update_readiness_state(&self, update: ReadinessUpdate) -> Result<(), RegistryError>;
}

/// A registry row describing one provisioned instance.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub cluster_id: String,
    pub instance_id: String,
    pub provisioned_endpoint: String,
    pub resource_uri: String,
    #[serde(default)]
    pub activated: bool,
    #[serde(default)]
    pub ready_state: ReadyState,
    #[serde(default)]
    pub platform_state: PlatformState,
    #[serde(default)]
    pub deactivation_reason: DeactivationReason,
    #[serde(default)]
    pub noted_at: Option<DateTime<Utc>>,
    /// Path of the instance's own database file.
    pub database_path: PathBuf,
}

impl Instance {
    /// Apply a readiness verdict to the record's state fields.
    pub fn apply(&mut self, update: ReadinessUpdate) {
        self.activated = update.activated;
        self.noted_at = update.noted_at;
        self.deactivation_reason = update.deactivation_reason;
        self.ready_state = update.ready_state;
    }
}

fn read(lock: &RwLock<Instance>) -> RwLockReadGuard<'_, Instance> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write(lock: &RwLock<Instance>) -> RwLockWriteGuard<'_, Instance> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-process registry record. A `RwLock<Instance>` behind an `Arc` is
/// enough for the CLI and for tests; a database-backed registry
/// implements [`InstanceRecord`] against its own rows instead.
impl InstanceRecord for RwLock<Instance> {
    fn cluster_id(&self) -> String {
        read(self).cluster_id.clone()
    }

    fn instance_id(&self) -> String {
        read(self).instance_id.clone()
    }

    fn provisioned_endpoint(&self) -> String {
        read(self).provisioned_endpoint.clone()
    }

    fn resource_uri(&self) -> String {
        read(self).resource_uri.clone()
    }

    fn activated(&self) -> bool {
        read(self).activated
    }

    fn ready_state(&self) -> ReadyState {
        read(self).ready_state
    }

    fn platform_state(&self) -> PlatformState {
        read(self).platform_state
    }

    fn open_database(&self) -> Result<InstanceDb, RegistryError> {
        let path = read(self).database_path.clone();
        InstanceDb::open(&path)
    }

    fn update_readiness_state(&self, update: ReadinessUpdate) -> Result<(), RegistryError> {
        write(self).apply(update);
        Ok(())
    }
}
