use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How far an instance has progressed toward serving traffic.
///
/// `Ready` is terminal for a probe pass; the other two name the
/// bootstrap step the instance is still waiting on.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadyState {
    /// Schema exists but the platform has not been initialized.
    #[default]
    InitRequired,
    /// Platform initialized, no administrative user created yet.
    AdminRequired,
    /// Fully bootstrapped and able to serve traffic.
    Ready,
}

impl ReadyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadyState::InitRequired => "INIT_REQUIRED",
            ReadyState::AdminRequired => "ADMIN_REQUIRED",
            ReadyState::Ready => "READY",
        }
    }
}

impl std::fmt::Display for ReadyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provisioning lifecycle state owned by the platform layer.
///
/// Read by the prober, never written by it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlatformState {
    #[default]
    Provisioning,
    Active,
    Deactivated,
}

/// Why an instance was last marked not-activated.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeactivationReason {
    #[default]
    None,
    /// The instance database or endpoint could not be reached at all.
    Unreachable,
    /// The platform responded but has not been initialized.
    InitIncomplete,
    /// The platform is initialized but has no administrative user.
    MissingAdmin,
}

/// The single write the readiness prober performs on an instance record.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessUpdate {
    /// Whether the last pass observed a usable environment.
    pub activated: bool,
    /// When the verdict was recorded.
    pub noted_at: Option<DateTime<Utc>>,
    pub deactivation_reason: DeactivationReason,
    pub ready_state: ReadyState,
}
