use tracing::info;

use crate::token::{DEFAULT_SIGNATURE_METHOD, SignatureMethod};
use crate::transport::ApiError;

/// Header carrying the console token on every instance call.
pub const DEFAULT_CONSOLE_HEADER: &str = "X-Fleet-Console-Key";

/// Env var overriding the token hash, e.g. `sha512`.
pub const SIGNATURE_METHOD_ENV: &str = "FLEET_SIGNATURE_METHOD";
/// Env var overriding the auth header name.
pub const CONSOLE_HEADER_ENV: &str = "FLEET_CONSOLE_HEADER";

/// Gateway-wide settings: which hash derives tokens and which header
/// carries them.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub signature_method: SignatureMethod,
    pub console_header: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            signature_method: DEFAULT_SIGNATURE_METHOD,
            console_header: DEFAULT_CONSOLE_HEADER.to_string(),
        }
    }
}

impl GatewayConfig {
    /// Load settings from the environment, falling back to the defaults.
    ///
    /// A signature method that is set but unparsable is an error rather
    /// than a silent fallback: probing a fleet with the wrong hash would
    /// lock the console out of every instance at once.
    pub fn from_env() -> Result<Self, ApiError> {
        let signature_method = match std::env::var(SIGNATURE_METHOD_ENV) {
            Ok(name) => {
                let method = name.parse::<SignatureMethod>()?;
                info!(%method, "using signature method from env");
                method
            }
            Err(_) => DEFAULT_SIGNATURE_METHOD,
        };

        let console_header = match std::env::var(CONSOLE_HEADER_ENV) {
            Ok(name) => {
                info!(header = %name, "using console header from env");
                name
            }
            Err(_) => DEFAULT_CONSOLE_HEADER.to_string(),
        };

        Ok(Self {
            signature_method,
            console_header,
        })
    }
}
