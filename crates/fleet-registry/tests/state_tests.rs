use std::sync::RwLock;

use chrono::Utc;
use fleet_registry::{
    DeactivationReason, Instance, InstanceRecord, PlatformState, ReadinessUpdate, ReadyState,
};
use serde_json::json;

fn sample_instance() -> Instance {
    serde_json::from_value(json!({
        "clusterId": "cluster-east-1",
        "instanceId": "acme-prod",
        "provisionedEndpoint": "https://acme.example.com",
        "resourceUri": "api/v2",
        "databasePath": "/var/lib/instances/acme-prod.db"
    }))
    .expect("descriptor should parse")
}

#[test]
fn ready_state_wire_format() {
    assert_eq!(
        serde_json::to_value(ReadyState::InitRequired).unwrap(),
        json!("INIT_REQUIRED")
    );
    assert_eq!(
        serde_json::to_value(ReadyState::AdminRequired).unwrap(),
        json!("ADMIN_REQUIRED")
    );
    assert_eq!(serde_json::to_value(ReadyState::Ready).unwrap(), json!("READY"));

    let parsed: ReadyState = serde_json::from_value(json!("ADMIN_REQUIRED")).unwrap();
    assert_eq!(parsed, ReadyState::AdminRequired);
}

#[test]
fn ready_state_defaults_to_init_required() {
    assert_eq!(ReadyState::default(), ReadyState::InitRequired);
}

#[test]
fn descriptor_parses_with_state_defaults() {
    let instance = sample_instance();
    assert!(!instance.activated);
    assert_eq!(instance.ready_state, ReadyState::InitRequired);
    assert_eq!(instance.platform_state, PlatformState::Provisioning);
    assert_eq!(instance.deactivation_reason, DeactivationReason::None);
    assert!(instance.noted_at.is_none());
}

#[test]
fn apply_overwrites_state_fields() {
    let mut instance = sample_instance();
    let noted = Utc::now();
    instance.apply(ReadinessUpdate {
        activated: true,
        noted_at: Some(noted),
        deactivation_reason: DeactivationReason::None,
        ready_state: ReadyState::Ready,
    });
    assert!(instance.activated);
    assert_eq!(instance.noted_at, Some(noted));
    assert_eq!(instance.ready_state, ReadyState::Ready);
}

#[test]
fn locked_record_exposes_the_contract() {
    let record = RwLock::new(sample_instance());
    assert_eq!(record.cluster_id(), "cluster-east-1");
    assert_eq!(record.instance_id(), "acme-prod");
    assert_eq!(record.provisioned_endpoint(), "https://acme.example.com");
    assert_eq!(record.resource_uri(), "api/v2");
    assert!(!record.activated());

    record
        .update_readiness_state(ReadinessUpdate {
            activated: true,
            noted_at: Some(Utc::now()),
            deactivation_reason: DeactivationReason::None,
            ready_state: ReadyState::Ready,
        })
        .expect("in-process update cannot fail");

    assert!(record.activated());
    assert_eq!(record.ready_state(), ReadyState::Ready);
}

#[test]
fn display_matches_wire_names() {
    assert_eq!(ReadyState::Ready.to_string(), "READY");
    assert_eq!(ReadyState::InitRequired.to_string(), "INIT_REQUIRED");
}
