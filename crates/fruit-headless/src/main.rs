//! Fruit-Merge headless runner
//!
//! Plays a session without a display: drops are generated automatically at
//! random positions, progress is logged, and a JSON summary is printed to
//! stdout when the session ends.

use anyhow::Context;
use clap::Parser;
use fruit_core::runner::{RunOptions, run_session, tick_period};
use fruit_core::{CommandQueue, Collaborators, GameConfig, GameLoop, Platform};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Args;
use crate::renderer::LogRenderer;

mod cli;
mod renderer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GameConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let platform = Platform::detect();
    info!(?platform, seed = config.seed, "starting headless session");

    let collaborators = Collaborators::for_platform(platform).with_renderer(LogRenderer::new(60));
    let mut game = GameLoop::new(config.clone(), collaborators).context("building game loop")?;
    game.start();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let dropper = tokio::spawn(auto_drop(
        game.command_queue(),
        config.clone(),
        args.drop_every,
        shutdown_rx.clone(),
    ));

    let ctrl_c_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl-C");
            let _ = ctrl_c_tx.send(true);
        }
    });

    let options = RunOptions {
        stop_on_game_over: !args.keep_running,
        max_ticks: args.ticks,
    };
    let summary = run_session(&mut game, options, shutdown_rx).await;

    let _ = shutdown_tx.send(true);
    if let Err(err) = dropper.await {
        warn!(error = %err, "drop task failed");
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Pushes a drop at a random x every `every` ticks until shutdown.
async fn auto_drop(
    queue: CommandQueue,
    config: GameConfig,
    every: u32,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed ^ 0x5eed);
    let width = config.playfield.width;
    let mut interval = tokio::time::interval(tick_period(config.tick_rate_hz).saturating_mul(every));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                queue.push_drop(rng.random_range(0.0..width));
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
