use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::prelude::*;

mod config;
mod simulation;

use crate::config::{DEFAULT_CONFIG_FILE, FileConfig, SimConfig, load_config};

#[derive(Parser)]
#[command(name = "kdc-sim")]
#[command(about = "Simulate a client / ticket issuer / service credential exchange")]
struct Cli {
    /// Config file (defaults to ./kdc-sim.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Client principal id (overrides [simulation].client)
    #[arg(long)]
    client: Option<String>,

    /// Service principal id; repeat for several (overrides [simulation].services)
    #[arg(long = "service")]
    services: Vec<String>,

    /// First-stage credential lifetime in seconds (overrides [issuer].lifetime_secs)
    #[arg(long)]
    lifetime: Option<u64>,

    /// Also present tampered, misdirected and unauthorized credentials
    #[arg(long)]
    negative_checks: bool,

    /// Print the simulation report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_directive = if cli.debug { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();

    let config_path = match &cli.config {
        Some(path) if !path.exists() => bail!("config file not found: {}", path.display()),
        Some(path) => path.clone(),
        None => PathBuf::from(DEFAULT_CONFIG_FILE),
    };

    let mut fc: FileConfig = load_config(&config_path)
        .extract()
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    if let Some(client) = cli.client {
        fc.simulation.client = client;
    }
    if !cli.services.is_empty() {
        fc.simulation.services = cli.services;
    }
    if let Some(lifetime) = cli.lifetime {
        fc.issuer.lifetime_secs = lifetime;
    }
    let config = SimConfig::from_file(&fc).context("Invalid simulation configuration")?;

    info!(
        client = %config.client,
        services = config.services.len(),
        lifetime_secs = config.lifetime_secs,
        "Starting ticket exchange simulation"
    );

    let report = simulation::run(&config, cli.negative_checks, &mut rand::rng());

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if !report.passed() {
        let failed = report.failures().count();
        bail!(
            "{failed} of {} steps did not behave as expected",
            report.steps.len()
        );
    }

    info!(steps = report.steps.len(), "Simulation complete: all steps behaved as expected");
    Ok(())
}
