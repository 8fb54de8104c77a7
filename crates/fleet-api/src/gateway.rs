use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use fleet_registry::InstanceRecord;

use crate::config::GatewayConfig;
use crate::token::generate_token;
use crate::transport::{ApiError, ApiOutcome, CallOptions, FailureKind, TransportClient};

/// Resource returning the instance's platform/version descriptor.
pub const ENVIRONMENT_RESOURCE: &str = "environment";
/// Resource listing administrative users.
pub const ADMIN_RESOURCE: &str = "admin";
/// Historical pseudo-resource handled locally, never sent to the instance.
pub const LEGACY_SETTING_RESOURCE: &str = "setting";

/// Gateway to one provisioned instance.
///
/// [`InstanceGateway::connect`] is a factory: every call derives the
/// console token, fixes the base URL, and returns a fresh gateway whose
/// connection context is immutable for its whole lifetime. Reconnecting
/// means building a new gateway, never rebinding fields on a shared one,
/// so a gateway can be handed to a probe task without synchronization.
pub struct InstanceGateway {
    instance: Arc<dyn InstanceRecord>,
    transport: TransportClient,
    base_url: Url,
}

impl InstanceGateway {
    /// Build a gateway for `instance`.
    ///
    /// The token is computed once here and cached for the lifetime of
    /// this gateway; the base URL is the provisioned endpoint joined
    /// with the instance's resource prefix, normalized to exactly one
    /// trailing `/`.
    pub fn connect(
        instance: Arc<dyn InstanceRecord>,
        config: &GatewayConfig,
    ) -> Result<Self, ApiError> {
        let cluster_id = instance.cluster_id();
        let instance_id = instance.instance_id();
        let token = generate_token(config.signature_method, &[&cluster_id, &instance_id]);
        let transport = TransportClient::new(&config.console_header, &token, cluster_id, instance_id)?;
        let base_url = base_url(&instance.provisioned_endpoint(), &instance.resource_uri())?;

        Ok(Self {
            instance,
            transport,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get(&self, uri: &str, payload: Option<&Value>, options: &CallOptions) -> ApiOutcome {
        self.any(Method::GET, uri, payload, options).await
    }

    pub async fn post(&self, uri: &str, payload: Option<&Value>, options: &CallOptions) -> ApiOutcome {
        self.any(Method::POST, uri, payload, options).await
    }

    pub async fn put(&self, uri: &str, payload: Option<&Value>, options: &CallOptions) -> ApiOutcome {
        self.any(Method::PUT, uri, payload, options).await
    }

    pub async fn patch(&self, uri: &str, payload: Option<&Value>, options: &CallOptions) -> ApiOutcome {
        self.any(Method::PATCH, uri, payload, options).await
    }

    pub async fn delete(&self, uri: &str, payload: Option<&Value>, options: &CallOptions) -> ApiOutcome {
        self.any(Method::DELETE, uri, payload, options).await
    }

    /// Issue one call with an arbitrary method against an
    /// instance-relative URI.
    pub async fn any(
        &self,
        method: Method,
        uri: &str,
        payload: Option<&Value>,
        options: &CallOptions,
    ) -> ApiOutcome {
        let url = match self.base_url.join(uri.trim_start_matches('/')) {
            Ok(url) => url,
            Err(e) => {
                warn!(
                    %method,
                    uri,
                    cluster = %self.instance.cluster_id(),
                    instance = %self.instance.instance_id(),
                    error = %e,
                    "instance-relative uri did not resolve"
                );
                return ApiOutcome::Failure(FailureKind::Transport(e.to_string()));
            }
        };
        self.transport.call(method, url, payload, options).await
    }

    /// Fetch one resource, or a collection when `id` is absent, and
    /// unwrap the remote API's `resource` envelope.
    ///
    /// A 200 body without the envelope is reported as [`ApiOutcome::Empty`],
    /// the resource-not-present sentinel. The historical `setting`
    /// pseudo-resource never reaches the instance; it routes to
    /// [`InstanceGateway::purge_legacy_setting`].
    pub async fn resource(&self, name: &str, id: Option<&str>) -> ApiOutcome {
        if name.trim_matches('/') == LEGACY_SETTING_RESOURCE {
            return self.purge_legacy_setting();
        }
        let outcome = self
            .get(&resource_path(name, id), None, &CallOptions::default())
            .await;
        unwrap_resource_envelope(outcome)
    }

    /// List every resource the instance exposes.
    pub async fn resources(&self) -> ApiOutcome {
        let outcome = self.get("?as_list=true", None, &CallOptions::default()).await;
        unwrap_resource_envelope(outcome)
    }

    /// Fetch the instance's platform/environment descriptor.
    pub async fn environment(&self) -> ApiOutcome {
        self.get(ENVIRONMENT_RESOURCE, None, &CallOptions::default())
            .await
    }

    /// Remove the obsolete `setting` row from the instance's own
    /// database.
    ///
    /// This is the cleanup historically folded into fetching the
    /// `setting` pseudo-resource: no HTTP call is made, and the database
    /// handle is released on every path out of this method.
    pub fn purge_legacy_setting(&self) -> ApiOutcome {
        let db = match self.instance.open_database() {
            Ok(db) => db,
            Err(e) => {
                warn!(
                    cluster = %self.instance.cluster_id(),
                    instance = %self.instance.instance_id(),
                    error = %e,
                    "could not open instance database for legacy cleanup"
                );
                return ApiOutcome::Failure(FailureKind::DataUnavailable);
            }
        };

        match db.clear_legacy_setting() {
            Ok(removed) => {
                debug!(
                    cluster = %self.instance.cluster_id(),
                    instance = %self.instance.instance_id(),
                    removed,
                    "legacy setting cleanup complete"
                );
                ApiOutcome::Empty
            }
            Err(e) => {
                warn!(
                    cluster = %self.instance.cluster_id(),
                    instance = %self.instance.instance_id(),
                    error = %e,
                    "legacy setting cleanup failed"
                );
                ApiOutcome::Failure(FailureKind::DataUnavailable)
            }
        }
    }

    /// Ask the instance how many tables its schema currently has.
    pub async fn table_count(&self) -> ApiOutcome {
        self.get("instance/table-count", None, &CallOptions::default())
            .await
    }

    /// Flush the instance's rate-limit cache.
    pub async fn clear_limits_cache(&self) -> ApiOutcome {
        self.delete("instance/clear-limits-cache", None, &CallOptions::default())
            .await
    }

    /// Clear one rate-limit counter by cache key.
    pub async fn clear_limits_counter(&self, cache_key: &str) -> ApiOutcome {
        let query: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("cacheKey", cache_key)
            .finish();
        self.delete(
            &format!("instance/clear-limits-counter?{query}"),
            None,
            &CallOptions::default(),
        )
        .await
    }

    /// Flush the instance's managed-data cache.
    pub async fn clear_managed_data_cache(&self) -> ApiOutcome {
        self.delete("instance/managed-data-cache", None, &CallOptions::default())
            .await
    }
}

impl std::fmt::Debug for InstanceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceGateway")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Join the provisioned endpoint and resource prefix into a base URL
/// ending with exactly one `/`.
fn base_url(endpoint: &str, resource_uri: &str) -> Result<Url, ApiError> {
    let endpoint = endpoint.trim_end_matches('/');
    let prefix = resource_uri.trim_matches('/');
    let raw = if prefix.is_empty() {
        format!("{endpoint}/")
    } else {
        format!("{endpoint}/{prefix}/")
    };
    Ok(Url::parse(&raw)?)
}

/// Join resource-path segments with exactly one `/` between them and no
/// trailing separator.
fn resource_path(name: &str, id: Option<&str>) -> String {
    let mut path = name.trim_matches('/').to_string();
    if let Some(id) = id {
        let id = id.trim_matches('/');
        if !id.is_empty() {
            path.push('/');
            path.push_str(id);
        }
    }
    path
}

/// The remote API wraps list and detail payloads under a `resource` key;
/// a 200 without it means the resource is not present.
fn unwrap_resource_envelope(outcome: ApiOutcome) -> ApiOutcome {
    match outcome {
        ApiOutcome::Success(mut value) => match value.get_mut("resource").map(Value::take) {
            Some(resource) => ApiOutcome::Success(resource),
            None => ApiOutcome::Empty,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::{base_url, resource_path, unwrap_resource_envelope};
    use crate::transport::ApiOutcome;
    use serde_json::json;

    #[test]
    fn resource_path_single_segment() {
        assert_eq!(resource_path("admin", None), "admin");
    }

    #[test]
    fn resource_path_with_id() {
        assert_eq!(resource_path("admin", Some("5")), "admin/5");
    }

    #[test]
    fn resource_path_strips_stray_separators() {
        assert_eq!(resource_path("/admin/", Some("5")), "admin/5");
        assert_eq!(resource_path("admin", Some("/5/")), "admin/5");
    }

    #[test]
    fn resource_path_ignores_empty_id() {
        assert_eq!(resource_path("admin", Some("")), "admin");
        assert_eq!(resource_path("admin", Some("/")), "admin");
    }

    #[test]
    fn base_url_has_exactly_one_trailing_separator() {
        let url = base_url("https://acme.example.com", "api/v2").unwrap();
        assert_eq!(url.as_str(), "https://acme.example.com/api/v2/");

        let url = base_url("https://acme.example.com/", "/api/v2/").unwrap();
        assert_eq!(url.as_str(), "https://acme.example.com/api/v2/");
    }

    #[test]
    fn base_url_without_resource_prefix() {
        let url = base_url("https://acme.example.com", "").unwrap();
        assert_eq!(url.as_str(), "https://acme.example.com/");
    }

    #[test]
    fn envelope_unwraps_to_inner_value() {
        let outcome = unwrap_resource_envelope(ApiOutcome::Success(json!({
            "resource": [{"id": 1}]
        })));
        assert_eq!(outcome, ApiOutcome::Success(json!([{"id": 1}])));
    }

    #[test]
    fn missing_envelope_is_not_found() {
        let outcome = unwrap_resource_envelope(ApiOutcome::Success(json!({"id": 1})));
        assert_eq!(outcome, ApiOutcome::Empty);
    }
}
