use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use fleet_api::gateway::{ADMIN_RESOURCE, InstanceGateway};
use fleet_api::{ApiError, ApiOutcome, GatewayConfig};
use fleet_registry::{
    DeactivationReason, InstanceRecord, PlatformState, ReadinessUpdate, ReadyState,
};

/// Verdict of one readiness pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeResult {
    /// The instance can serve traffic; carries the fresh environment
    /// document.
    Ready(Value),
    /// The instance responded but has not finished bootstrapping.
    NotReady(ReadyState),
    /// Readiness could not be determined this pass.
    Unknown,
}

impl ProbeResult {
    pub fn is_ready(&self) -> bool {
        matches!(self, ProbeResult::Ready(_))
    }
}

/// Sequential readiness pipeline for one instance: table-count check,
/// environment fetch, admin check, optional write-back. Each step awaits
/// the previous one; nothing runs in parallel and nothing is retried.
pub struct ReadinessProbe {
    instance: Arc<dyn InstanceRecord>,
    gateway: InstanceGateway,
}

impl ReadinessProbe {
    pub fn new(instance: Arc<dyn InstanceRecord>, config: &GatewayConfig) -> Result<Self, ApiError> {
        let gateway = InstanceGateway::connect(instance.clone(), config)?;
        Ok(Self { instance, gateway })
    }

    pub fn gateway(&self) -> &InstanceGateway {
        &self.gateway
    }

    /// Reconcile the instance's database, environment endpoint, and
    /// admin bootstrap state into one verdict.
    ///
    /// With `sync`, the verdict is written back to the instance record;
    /// the write may fail (logged), never aborting the probe. A record
    /// already marked activated and `READY` is trusted: one environment
    /// call returns fresh data and the admin list is not re-verified.
    pub async fn determine_instance_state(&self, sync: bool) -> ProbeResult {
        let cluster = self.instance.cluster_id();
        let instance = self.instance.instance_id();

        if self.instance.activated() && self.instance.ready_state() == ReadyState::Ready {
            debug!(%cluster, %instance, "record already READY, fetching fresh environment only");
            return match self.valid_environment().await {
                Some(environment) => ProbeResult::Ready(environment),
                None => ProbeResult::Unknown,
            };
        }

        // resolved: None means this pass could not determine readiness.
        // An empty schema counts as unavailable; provisioning has not
        // created any tables yet.
        let (resolved, environment) = match self.table_count() {
            Some(tables) if tables > 0 => {
                debug!(%cluster, %instance, tables, "instance database is reachable");
                self.classify_environment().await
            }
            _ => {
                if self.instance.platform_state() == PlatformState::Deactivated
                    && !self.instance.activated()
                {
                    debug!(
                        %cluster,
                        %instance,
                        "deactivated instance with no usable database, skipping probe"
                    );
                    return ProbeResult::Unknown;
                }
                (None, None)
            }
        };

        let verdict = match (resolved, environment) {
            (Some(ReadyState::Ready), Some(environment)) => ProbeResult::Ready(environment),
            (Some(state), _) => ProbeResult::NotReady(state),
            (None, _) => ProbeResult::Unknown,
        };

        info!(
            %cluster,
            %instance,
            verdict = ?resolved.map(|s| s.as_str()),
            "readiness pass complete"
        );

        if sync {
            self.sync_record(resolved);
        }

        verdict
    }

    /// Environment fetch plus ready-state classification.
    ///
    /// An instance whose platform descriptor carries no
    /// `version_current` still needs initialization, and an
    /// uninitialized instance never has a usable environment, whatever
    /// the endpoint returned.
    async fn classify_environment(&self) -> (Option<ReadyState>, Option<Value>) {
        let environment = self.valid_environment().await;
        let initialized = environment
            .as_ref()
            .and_then(|env| env.pointer("/platform/version_current"))
            .is_some();

        if !initialized {
            return (Some(ReadyState::InitRequired), None);
        }
        if self.admin_present().await {
            (Some(ReadyState::Ready), environment)
        } else {
            (Some(ReadyState::AdminRequired), environment)
        }
    }

    /// Count tables in the instance's own database; any error means the
    /// instance is unavailable this pass. The handle lives only as long
    /// as this call.
    fn table_count(&self) -> Option<u64> {
        let db = match self.instance.open_database() {
            Ok(db) => db,
            Err(e) => {
                warn!(
                    cluster = %self.instance.cluster_id(),
                    instance = %self.instance.instance_id(),
                    error = %e,
                    "instance database unavailable"
                );
                return None;
            }
        };
        match db.table_count() {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(
                    cluster = %self.instance.cluster_id(),
                    instance = %self.instance.instance_id(),
                    error = %e,
                    "table count query failed"
                );
                None
            }
        }
    }

    /// An environment response is valid only when it is a 200 JSON body
    /// carrying a `platform` descriptor.
    async fn valid_environment(&self) -> Option<Value> {
        match self.gateway.environment().await {
            ApiOutcome::Success(body) if body.get("platform").is_some() => Some(body),
            ApiOutcome::Success(_) => {
                debug!(
                    cluster = %self.instance.cluster_id(),
                    instance = %self.instance.instance_id(),
                    "environment response missing platform descriptor"
                );
                None
            }
            ApiOutcome::Empty => None,
            ApiOutcome::Failure(kind) => {
                debug!(
                    cluster = %self.instance.cluster_id(),
                    instance = %self.instance.instance_id(),
                    kind = ?kind,
                    "environment fetch failed"
                );
                None
            }
        }
    }

    /// A transient admin-list failure downgrades the verdict; it never
    /// aborts the probe. Only a non-empty admin list counts.
    async fn admin_present(&self) -> bool {
        match self.gateway.resource(ADMIN_RESOURCE, None).await {
            ApiOutcome::Success(Value::Array(admins)) => !admins.is_empty(),
            _ => false,
        }
    }

    /// Write the verdict back to the record. The activation flag tracks
    /// whether this pass observed a usable environment.
    fn sync_record(&self, resolved: Option<ReadyState>) {
        let activated = matches!(
            resolved,
            Some(ReadyState::Ready) | Some(ReadyState::AdminRequired)
        );
        let update = ReadinessUpdate {
            activated,
            noted_at: Some(Utc::now()),
            deactivation_reason: deactivation_reason_for(resolved),
            ready_state: resolved.unwrap_or_else(|| self.instance.ready_state()),
        };
        if let Err(e) = self.instance.update_readiness_state(update) {
            warn!(
                cluster = %self.instance.cluster_id(),
                instance = %self.instance.instance_id(),
                error = %e,
                "readiness write-back failed"
            );
        }
    }
}

fn deactivation_reason_for(resolved: Option<ReadyState>) -> DeactivationReason {
    match resolved {
        Some(ReadyState::Ready) => DeactivationReason::None,
        Some(ReadyState::InitRequired) => DeactivationReason::InitIncomplete,
        Some(ReadyState::AdminRequired) => DeactivationReason::MissingAdmin,
        None => DeactivationReason::Unreachable,
    }
}

#[cfg(test)]
mod tests {
    use super::deactivation_reason_for;
    use fleet_registry::{DeactivationReason, ReadyState};

    #[test]
    fn reason_tracks_the_resolved_state() {
        assert_eq!(
            deactivation_reason_for(Some(ReadyState::Ready)),
            DeactivationReason::None
        );
        assert_eq!(
            deactivation_reason_for(Some(ReadyState::InitRequired)),
            DeactivationReason::InitIncomplete
        );
        assert_eq!(
            deactivation_reason_for(Some(ReadyState::AdminRequired)),
            DeactivationReason::MissingAdmin
        );
        assert_eq!(deactivation_reason_for(None), DeactivationReason::Unreachable);
    }
}
