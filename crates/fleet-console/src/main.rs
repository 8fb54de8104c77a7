use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use fleet_api::{GatewayConfig, generate_token};
use fleet_console::probe::{ProbeResult, ReadinessProbe};
use fleet_console::telemetry;
use fleet_registry::Instance;
use serde_json::json;

#[derive(Parser)]
#[command(
    name = "fleet-console",
    about = "Console-side gateway and readiness prober for provisioned instances"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe one instance and print the readiness verdict as JSON.
    Probe {
        /// Path to an instance descriptor (JSON).
        #[arg(long)]
        instance: PathBuf,
        /// Write the verdict back to the descriptor.
        #[arg(long)]
        sync: bool,
    },
    /// Print the console token derived for an instance.
    Token {
        #[arg(long)]
        cluster: String,
        #[arg(long)]
        instance: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Probe { instance, sync } => probe(instance, sync).await,
        Commands::Token { cluster, instance } => {
            let config = GatewayConfig::from_env()?;
            println!(
                "{}",
                generate_token(config.signature_method, &[cluster, instance])
            );
            Ok(())
        }
    }
}

async fn probe(path: PathBuf, sync: bool) -> Result<()> {
    let config = GatewayConfig::from_env()?;

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading instance descriptor {}", path.display()))?;
    let descriptor: Instance = serde_json::from_str(&raw)
        .with_context(|| format!("parsing instance descriptor {}", path.display()))?;
    let record = Arc::new(RwLock::new(descriptor));

    let probe = ReadinessProbe::new(record.clone(), &config)?;
    let result = probe.determine_instance_state(sync).await;

    if sync {
        let updated = record
            .read()
            .map_err(|_| anyhow::anyhow!("instance record lock poisoned"))?
            .clone();
        let serialized = serde_json::to_string_pretty(&updated)?;
        std::fs::write(&path, serialized)
            .with_context(|| format!("writing instance descriptor {}", path.display()))?;
    }

    let (verdict, ready) = match result {
        ProbeResult::Ready(environment) => (
            json!({"state": "READY", "environment": environment}),
            true,
        ),
        ProbeResult::NotReady(state) => (json!({"state": state}), false),
        ProbeResult::Unknown => (json!({"state": "UNKNOWN"}), false),
    };
    println!("{}", serde_json::to_string_pretty(&verdict)?);

    if !ready {
        std::process::exit(1);
    }
    Ok(())
}
