//! Helpers shared by the unit tests.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::collaborator::{Collaborators, FeedbackSink, Renderer};
use crate::config::GameConfig;
use crate::error::CollaboratorFailure;
use crate::fruit::TierId;
use crate::game::GameLoop;
use crate::merge::MergeOutcome;
use crate::snapshot::Snapshot;

/// A headless game loop that has already been started.
pub(crate) fn running_game(config: GameConfig) -> GameLoop {
    let mut game = GameLoop::new(config, Collaborators::headless()).unwrap();
    assert!(game.start());
    game
}

/// Events seen by a [`RecordingFeedback`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FeedbackEvent {
    Drop(TierId),
    Merge(TierId),
    GameOver(u64),
}

/// Shared log a test can inspect after handing the sink to a game loop.
#[derive(Debug, Clone, Default)]
pub(crate) struct FeedbackLog(Arc<Mutex<Vec<FeedbackEvent>>>);

impl FeedbackLog {
    pub fn events(&self) -> Vec<FeedbackEvent> {
        self.0.lock().clone()
    }

    pub fn merges(&self) -> usize {
        self.0
            .lock()
            .iter()
            .filter(|e| matches!(e, FeedbackEvent::Merge(_)))
            .count()
    }
}

pub(crate) struct RecordingFeedback {
    log: FeedbackLog,
}

impl RecordingFeedback {
    pub fn new(log: FeedbackLog) -> Self {
        Self { log }
    }
}

impl FeedbackSink for RecordingFeedback {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn on_drop(&mut self, tier: TierId) -> Result<(), CollaboratorFailure> {
        self.log.0.lock().push(FeedbackEvent::Drop(tier));
        Ok(())
    }

    fn on_merge(&mut self, outcome: &MergeOutcome) -> Result<(), CollaboratorFailure> {
        self.log
            .0
            .lock()
            .push(FeedbackEvent::Merge(outcome.consumed_a.tier_id));
        Ok(())
    }

    fn on_game_over(&mut self, score: u64) -> Result<(), CollaboratorFailure> {
        self.log.0.lock().push(FeedbackEvent::GameOver(score));
        Ok(())
    }
}

/// Renderer whose every call fails.
pub(crate) struct FailingRenderer;

impl Renderer for FailingRenderer {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn present(&mut self, _snapshot: &Snapshot) -> Result<(), CollaboratorFailure> {
        Err(CollaboratorFailure::Failed("device lost".to_string()))
    }
}
