//! Async tick scheduler.
//!
//! Drives a [`GameLoop`] at the configured tick rate on a tokio interval,
//! feeding it the real elapsed time between ticks.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::game::{GameLoop, GamePhase, SessionSummary};

/// Shortest interval the scheduler will tick at.
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Interval between ticks at `tick_rate_hz`, never shorter than `MIN_TICK_PERIOD`.
pub fn tick_period(tick_rate_hz: f32) -> Duration {
    Duration::try_from_secs_f32(1.0 / tick_rate_hz)
        .unwrap_or(Duration::MAX)
        .max(MIN_TICK_PERIOD)
}

/// Controls when `run_session` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Return as soon as the session reaches `GameOver`.
    pub stop_on_game_over: bool,
    /// Upper bound on ticks to run.
    pub max_ticks: Option<u64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            stop_on_game_over: true,
            max_ticks: None,
        }
    }
}

/// Runs ticks until game over, `max_ticks`, or a shutdown signal.
///
/// Starts the loop if it is idle. On return the loop has been terminated
/// and every physics body released; the returned summary is taken just
/// before that teardown.
pub async fn run_session(
    game: &mut GameLoop,
    options: RunOptions,
    mut shutdown: watch::Receiver<bool>,
) -> SessionSummary {
    game.start();

    let mut interval = tokio::time::interval(tick_period(game.config().tick_rate_hz));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last = Instant::now();
    let mut ticks = 0_u64;

    loop {
        if options.max_ticks.is_some_and(|max| ticks >= max) {
            debug!(ticks, "tick budget exhausted");
            break;
        }

        tokio::select! {
            _ = interval.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("shutdown requested");
                    break;
                }
                continue;
            }
        }

        let now = Instant::now();
        let elapsed = now.duration_since(last).as_secs_f32();
        last = now;

        let report = game.tick(elapsed);
        ticks += 1;

        if options.stop_on_game_over && game.phase() == GamePhase::GameOver {
            debug!(frame = report.frame, "stopping on game over");
            break;
        }

        tokio::task::yield_now().await;
    }

    let summary = game.summary();
    game.terminate();
    summary
}
