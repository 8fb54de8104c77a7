//! Console-side HTTP gateway for provisioned instances.
//!
//! The console authenticates to each instance with a token derived from
//! the instance's identity (no stored secrets), issues single-shot HTTP
//! calls through [`TransportClient`], and layers instance-relative
//! resource helpers on top in [`InstanceGateway`].

pub mod config;
pub mod gateway;
pub mod token;
pub mod transport;

pub use config::{DEFAULT_CONSOLE_HEADER, GatewayConfig};
pub use gateway::InstanceGateway;
pub use token::{DEFAULT_SIGNATURE_METHOD, SignatureMethod, generate_token};
pub use transport::{ApiError, ApiOutcome, CallOptions, FailureKind, TransportClient};
