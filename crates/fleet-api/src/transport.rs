use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{error, warn};
use url::Url;

/// Construction-time and configuration errors. Remote-call outcomes are
/// never reported this way; see [`ApiOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP client construction failed: {0}")]
    Client(#[from] reqwest::Error),
    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("{0:?} is not a valid HTTP header name")]
    InvalidHeaderName(String),
    #[error("derived token is not a valid header value")]
    InvalidToken,
    #[error("unknown signature method {0:?}")]
    UnknownSignatureMethod(String),
}

/// Why a remote call produced no usable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The request never completed: refused connection, DNS, timeout.
    Transport(String),
    /// The instance answered, but not with a usable 200 JSON response.
    Application {
        status: u16,
        code: Option<i64>,
        message: Option<String>,
    },
    /// The instance's own database could not be used.
    DataUnavailable,
}

/// Outcome of one remote call.
///
/// A legitimately empty response is distinct from a failed call, and a
/// failed call is distinct from "resource not present" (`Empty` after
/// envelope unwrapping). Callers never see a thrown fault from the
/// transport layer; they always receive one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome {
    Success(Value),
    Empty,
    Failure(FailureKind),
}

impl ApiOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiOutcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ApiOutcome::Failure(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            ApiOutcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            ApiOutcome::Success(value) => Some(value),
            _ => None,
        }
    }
}

/// Per-call knobs passed through to the HTTP layer.
///
/// The transport adds no policy of its own: no retries, no default
/// deadline. A missing `timeout` means the call waits as long as the OS
/// lets it.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub headers: Vec<(String, String)>,
}

impl CallOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }
}

/// Single-shot HTTP caller for one instance.
///
/// The auth header is fixed at construction and injected into every
/// request. Each call issues exactly one request and classifies the
/// response; every failure path logs method, URL, and instance identity.
pub struct TransportClient {
    http: reqwest::Client,
    cluster_id: String,
    instance_id: String,
}

impl TransportClient {
    pub fn new(
        header_name: &str,
        token: &str,
        cluster_id: String,
        instance_id: String,
    ) -> Result<Self, ApiError> {
        let name = HeaderName::from_bytes(header_name.as_bytes())
            .map_err(|_| ApiError::InvalidHeaderName(header_name.to_string()))?;
        let value = HeaderValue::from_str(token).map_err(|_| ApiError::InvalidToken)?;

        let mut headers = HeaderMap::new();
        headers.insert(name, value);

        let http = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            cluster_id,
            instance_id,
        })
    }

    /// Issue one request and classify the response.
    ///
    /// Object and array payloads go out as JSON bodies; scalar payloads
    /// are sent as plain text. Caller headers are merged on top of the
    /// fixed auth header.
    pub async fn call(
        &self,
        method: Method,
        url: Url,
        payload: Option<&Value>,
        options: &CallOptions,
    ) -> ApiOutcome {
        let mut request = self.http.request(method.clone(), url.clone());
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }
        if let Some(body) = payload {
            request = match body {
                Value::Object(_) | Value::Array(_) => request.json(body),
                Value::String(text) => request.body(text.clone()),
                scalar => request.body(scalar.to_string()),
            };
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    %method,
                    %url,
                    cluster = %self.cluster_id,
                    instance = %self.instance_id,
                    error = %e,
                    "instance call failed to complete"
                );
                return ApiOutcome::Failure(FailureKind::Transport(e.to_string()));
            }
        };

        self.classify(&method, &url, response).await
    }

    /// A response is successful only when the status is 200 and the
    /// content type is not `text/html` (a provisioning proxy answering
    /// 200 with an HTML splash page is not a working instance).
    async fn classify(&self, method: &Method, url: &Url, response: reqwest::Response) -> ApiOutcome {
        let status = response.status();
        let html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("text/html"))
            .unwrap_or(false);

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                error!(
                    %method,
                    %url,
                    cluster = %self.cluster_id,
                    instance = %self.instance_id,
                    error = %e,
                    "failed to read instance response body"
                );
                return ApiOutcome::Failure(FailureKind::Transport(e.to_string()));
            }
        };

        if status == StatusCode::OK && !html {
            if body.trim().is_empty() {
                return ApiOutcome::Empty;
            }
            return match serde_json::from_str::<Value>(&body) {
                Ok(Value::Null) => ApiOutcome::Empty,
                Ok(value) => ApiOutcome::Success(value),
                Err(e) => {
                    warn!(
                        %method,
                        %url,
                        cluster = %self.cluster_id,
                        instance = %self.instance_id,
                        error = %e,
                        "instance returned an unparsable 200 body"
                    );
                    ApiOutcome::Failure(FailureKind::Application {
                        status: status.as_u16(),
                        code: None,
                        message: None,
                    })
                }
            };
        }

        let envelope = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|value| value.get("error").cloned());

        match envelope {
            Some(error) => {
                let code = error.get("code").and_then(Value::as_i64);
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                warn!(
                    %method,
                    %url,
                    cluster = %self.cluster_id,
                    instance = %self.instance_id,
                    status = status.as_u16(),
                    code,
                    error_message = message.as_deref().unwrap_or(""),
                    "instance returned an error envelope"
                );
                ApiOutcome::Failure(FailureKind::Application {
                    status: status.as_u16(),
                    code,
                    message,
                })
            }
            None => {
                warn!(
                    %method,
                    %url,
                    cluster = %self.cluster_id,
                    instance = %self.instance_id,
                    status = status.as_u16(),
                    body = %body,
                    "instance returned an unexpected response"
                );
                ApiOutcome::Failure(FailureKind::Application {
                    status: status.as_u16(),
                    code: None,
                    message: None,
                })
            }
        }
    }
}

impl std::fmt::Debug for TransportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportClient")
            .field("cluster_id", &self.cluster_id)
            .field("instance_id", &self.instance_id)
            .finish_non_exhaustive()
    }
}
