// src/main.rs

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use traffic_light_detection::detection::{HsvLightClassifier, ManualClock};
use traffic_light_detection::pipeline::{DecisionLog, DetectionPipeline};
use traffic_light_detection::replay::{self, DriveLog};
use traffic_light_detection::types::Config;

/// Usage: traffic-light-detection [config.yaml] <drive_log.yaml>
struct Args {
    config_path: String,
    log_path: PathBuf,
}

impl Args {
    fn parse() -> Result<Self> {
        let mut args: Vec<String> = std::env::args().skip(1).collect();
        match args.len() {
            1 => Ok(Self {
                config_path: "config.yaml".to_string(),
                log_path: PathBuf::from(args.remove(0)),
            }),
            2 => {
                let log_path = PathBuf::from(args.remove(1));
                Ok(Self {
                    config_path: args.remove(0),
                    log_path,
                })
            }
            _ => anyhow::bail!("usage: traffic-light-detection [config.yaml] <drive_log.yaml>"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse()?;

    let config = Config::load(&args.config_path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("traffic_light_detection={}", config.logging.level))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🚦 Traffic Light Detection Starting");
    info!("✓ Configuration loaded from {}", args.config_path);

    let drive_log = DriveLog::load(&args.log_path)?;
    info!(
        "✓ Drive log loaded: {} events from {}",
        drive_log.events.len(),
        args.log_path.display()
    );
    let base_dir = args
        .log_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let clock = ManualClock::new();
    let decisions = DecisionLog::new(config.publisher.history_capacity);
    let pipeline = DetectionPipeline::new(
        &config,
        HsvLightClassifier::new(),
        clock.clone(),
        decisions.clone(),
    );
    let metrics = pipeline.metrics();

    // The replay is one synchronous flow of control; keep it off the async workers
    let summary = tokio::task::spawn_blocking(move || {
        let mut pipeline = pipeline;
        replay::replay(&drive_log, &base_dir, &mut pipeline, &clock)
    })
    .await
    .context("Replay task panicked")??;

    info!("\n========================================");
    info!("  Images received: {}", summary.images);
    info!("  Decisions published: {}", summary.published);
    info!(
        "  Final stop waypoint: {}",
        summary.final_decision.wire_value()
    );
    if decisions.dropped() > 0 {
        warn!(
            "  Decision history truncated: {} oldest entries dropped",
            decisions.dropped()
        );
    }
    info!("  Recent decisions: {:?}", decisions.wire_values());
    info!("========================================");

    let metrics_json = serde_json::to_string_pretty(&metrics.summary())?;
    info!("📊 Metrics:\n{}", metrics_json);

    Ok(())
}
