//! CropSense service entry point: configuration, wiring, HTTP serve loop.

use anyhow::Context;
use clap::Parser;
use cropsense::advisor::AdviceSynthesizer;
use cropsense::api::{create_app, ApiState};
use cropsense::classifier::ThresholdClassifier;
use cropsense::config::AppConfig;
use cropsense::knowledge::KnowledgeBase;
use cropsense::llm::ChatGateway;
use cropsense::pipeline::Orchestrator;
use cropsense::simulator::SensorSimulator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cropsense", version, about = "Agricultural assistant service")]
struct CliArgs {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the configured one.
    #[arg(long)]
    addr: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    let mut config = AppConfig::load(args.config.as_deref());
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting CropSense");

    // Wire the pipeline.
    let gateway = Arc::new(ChatGateway::new(config.provider.clone()));
    let knowledge = Arc::new(KnowledgeBase::load(config.knowledge.path.as_deref()));
    let synthesizer = AdviceSynthesizer::new(gateway.clone(), knowledge);

    let mut classifier = ThresholdClassifier::new();
    if let Some(path) = &config.model.snapshot_path {
        match classifier.load_snapshot(path) {
            Ok(()) => info!(path = %path.display(), "Classifier restored from snapshot"),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot restore snapshot, training fresh");
            }
        }
    }

    let orchestrator = Arc::new(Orchestrator::new(
        SensorSimulator::default_fleet(),
        classifier,
        synthesizer,
    ));
    orchestrator.auto_train().await;

    // Serve.
    let app = create_app(ApiState::new(orchestrator, gateway));
    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("cannot bind {}", config.server.addr))?;
    info!(addr = %config.server.addr, "HTTP server listening");

    axum::serve(listener, app)
        .await
        .context("HTTP server terminated")?;
    Ok(())
}
