use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub fn init() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("fleet_console=info,fleet_api=info,fleet_registry=info")
        }))
        .with(fmt::layer().json())
        .init();
}
