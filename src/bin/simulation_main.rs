// simulation_main.rs
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use rts_signal_rl::config::AppConfig;
use rts_signal_rl::render::StopSignalRenderer;
use rts_signal_rl::training::run_training;

#[derive(Debug, Parser)]
#[command(
    name = "simulation_main",
    about = "Trains or presents the signal controller on a simulated intersection",
    version
)]
struct Args {
    /// JSON config file; every omitted value keeps its default.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Delete any saved model and train from scratch.
    #[arg(long)]
    fresh: bool,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match AppConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("{e}");
                std::process::exit(1);
            }
        },
        None => AppConfig::default(),
    };

    let stop = Arc::new(AtomicBool::new(false));
    let renderer = StopSignalRenderer::new(Arc::clone(&stop));
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Stop requested; finishing current tick");
            stop.store(true, Ordering::Relaxed);
        }
    });

    let fresh = args.fresh;
    let result = tokio::task::spawn_blocking(move || run_training(&config, renderer, fresh)).await;

    match result {
        Ok(Ok(summary)) => {
            info!(
                "Finished {} of {} episodes started (stopped by user: {}, presenting: {})",
                summary.episodes_completed(),
                summary.episodes_run(),
                summary.stopped_by_user,
                summary.presenting
            );
            if let Some(c) = summary.comparison {
                println!("\n===== Baseline Comparison =====");
                println!("Fixed-Time Controller Avg Reward: {:.2}", c.baseline_avg);
                println!("Q-Learning Agent Avg Reward: {:.2}", c.agent_avg);
                println!("Improvement: {:.2}", c.improvement);
            }
        }
        Ok(Err(e)) => {
            error!("Training failed: {e}");
            std::process::exit(1);
        }
        Err(e) => {
            error!("Training task panicked: {e}");
            std::process::exit(1);
        }
    }
}
