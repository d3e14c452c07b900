//! Telos demo - runs one evolution session end to end
//!
//! Wires the session manager to an in-memory store, a simulated execution
//! harness and an optional scripted critique panel, drives the session on
//! a background task, and prints the final report and the best genome's
//! lineage. Ctrl-C requests a graceful stop.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use telos_guard::PatternBook;
use telos_session::{SessionManager, StopMode};
use telos_store::{GenomeStore, InMemoryGenomeStore};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::DemoConfig;

/// Telos demo CLI
#[derive(Parser)]
#[command(name = "telos")]
#[command(about = "Evolve an agent's goal genomes against a simulated harness", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TELOS_CONFIG")]
    config: Option<String>,

    /// Agent name (overrides the config file)
    #[arg(short, long, env = "TELOS_AGENT")]
    agent: Option<String>,

    /// Outer-loop iterations (overrides the config file)
    #[arg(short, long)]
    iterations: Option<u32>,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Enable the critique step
    #[arg(long)]
    critique: bool,

    /// Log level
    #[arg(long, env = "TELOS_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "TELOS_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load configuration
    let mut config = DemoConfig::load(cli.config.as_deref()).context("loading configuration")?;

    // Override with CLI args
    if let Some(agent) = cli.agent {
        config.agent.name = agent;
    }
    if let Some(iterations) = cli.iterations {
        config.session.max_iterations = iterations;
    }
    if let Some(seed) = cli.seed {
        config.session.rng_seed = Some(seed);
    }
    if cli.critique {
        config.session.enable_critique = true;
    }

    let store = Arc::new(InMemoryGenomeStore::new());
    let patterns = PatternBook::from_patterns(config.patterns.clone())
        .context("loading alignment patterns")?;
    let manager = SessionManager::new(store.clone(), Arc::new(config.harness.build()))
        .with_critique(config.critique.build())
        .with_patterns(patterns);

    let seeds = config
        .agent
        .seed_genomes()
        .context("building seed genomes")?;
    let session_id = manager
        .start_session(&config.agent.name, seeds, config.session.clone())
        .await?;
    info!(session_id = %session_id, agent = %config.agent.name, "Running evolution session");

    let mut driver = manager.spawn(session_id.clone());
    let report = tokio::select! {
        joined = &mut driver => joined.context("session task panicked")??,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupt received, stopping after the current iteration");
            let report = manager.stop(&session_id, StopMode::Graceful).await?;
            // the driver exits at the next boundary
            let _ = driver.await;
            report
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(best) = report.best_genome_id {
        let lineage = match store.get_genome_lineage(&best).await {
            Ok(lineage) => lineage,
            Err(e) => {
                warn!(error = %e, "Best genome lineage unavailable");
                return Ok(());
            }
        };
        println!("\nBest genome lineage ({} generations):", lineage.len());
        for genome in &lineage {
            let objectives: Vec<&str> = genome.objectives.iter().map(|o| o.id.as_str()).collect();
            println!(
                "  gen {:>3}  {}  [{}]",
                genome.generation,
                genome.id.short(),
                objectives.join(", ")
            );
        }
    }

    Ok(())
}
