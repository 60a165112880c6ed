//! Wayline - agentic journey orchestration platform.
//!
//! Main entry point for the Wayline CLI.

mod cli;
mod register;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wayline_engine::{EngineConfig, ExecutionEngine, GraphOrchestratorFactory};
use wayline_ledger::{
    FileLedgerStore, LedgerConfig, LedgerStore, MemoryLedgerStore, StateSurface,
};
use wayline_protocols::contract::Solution;
use wayline_telemetry::{ControlTower, Reporter, TelemetryConfig, TowerEndpoint};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            contract,
            journey,
            input,
            deadline,
        } => cmd_run(contract, journey, input, deadline, cli.storage).await,
        Commands::Validate { contract } => cmd_validate(contract),
        Commands::Sample => {
            println!(
                "{}",
                serde_json::to_string_pretty(&register::sample_solution())?
            );
            Ok(())
        }
    }
}

fn load_solution(path: &PathBuf) -> anyhow::Result<Solution> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read contract file {:?}", path))?;
    let solution: Solution =
        serde_json::from_str(&text).with_context(|| format!("invalid contract in {:?}", path))?;
    Ok(solution)
}

fn cmd_validate(contract: PathBuf) -> anyhow::Result<()> {
    let solution = load_solution(&contract)?;
    for journey in &solution.journeys {
        journey
            .intents
            .validate()
            .with_context(|| format!("journey {} is invalid", journey.id))?;
        println!(
            "journey {}: {} intents ok",
            journey.id,
            journey.intents.len()
        );
    }
    println!("contract {} valid", solution.id);
    Ok(())
}

async fn cmd_run(
    contract: PathBuf,
    journey: Option<String>,
    input: String,
    deadline: u64,
    storage: Option<PathBuf>,
) -> anyhow::Result<()> {
    let solution = load_solution(&contract)?;
    let solution = if solution.published {
        solution
    } else {
        solution.publish()?
    };
    let input: serde_json::Value =
        serde_json::from_str(&input).context("input payload is not valid JSON")?;

    let store: Arc<dyn LedgerStore> = match storage {
        Some(path) => Arc::new(FileLedgerStore::new(path).await?),
        None => Arc::new(MemoryLedgerStore::new()),
    };

    let tower = ControlTower::spawn(TelemetryConfig::default());
    let reporter = Arc::new(Reporter::spawn(
        TelemetryConfig::default(),
        Arc::new(tower.channel_transport()),
    ));

    let surface = Arc::new(
        StateSurface::new(store, LedgerConfig::default()).with_telemetry(reporter.clone()),
    );
    let config = EngineConfig {
        deadline_secs: deadline,
        ..Default::default()
    };
    let engine = ExecutionEngine::new(surface.clone(), config).with_telemetry(reporter.clone());

    let journey_types: HashSet<String> = solution
        .journeys
        .iter()
        .map(|j| j.journey_type.clone())
        .collect();
    for journey_type in journey_types {
        engine.register_orchestrator(Arc::new(GraphOrchestratorFactory::new(journey_type)))?;
    }
    register::register_builtins(&engine);

    let journey_id = match journey {
        Some(id) => id,
        None => solution
            .journeys
            .first()
            .map(|j| j.id.clone())
            .context("contract declares no journeys")?,
    };
    let solution_id = solution.id.clone();
    engine.register_solution(solution)?;

    let execution_id = engine.submit(&solution_id, &journey_id, input).await?;
    info!("Execution {} submitted", execution_id);

    let view = loop {
        let view = engine.status(&execution_id).await?;
        if view.status.is_terminal() {
            break view;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    };

    println!();
    println!("execution {}", execution_id);
    match view.reason {
        Some(reason) => println!("status: {:?} ({})", view.status, reason),
        None => println!("status: {:?}", view.status),
    }
    println!();

    for record in surface.read(&execution_id).await? {
        println!(
            "{:>4}  {:<24} {:<14} {}",
            record.sequence_no,
            format!("{:?}", record.new_state),
            record.actor,
            record.recorded_at.to_rfc3339()
        );
    }

    reporter.shutdown().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    println!();
    let endpoint = TowerEndpoint::new(tower.clone());
    print!("{}", endpoint.export(Duration::from_secs(300)));
    tower.shutdown().await;

    Ok(())
}
