//! Input commands queued for the game loop.
//!
//! Commands may be pushed from any thread. The game loop drains the queue at
//! the start of each tick, so a drop never lands in the middle of a physics
//! step.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Commands accepted from the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameCommand {
    /// Drop the upcoming fruit at horizontal position `x`.
    Drop { x: f32 },
    /// Tear down the current session and start a new one.
    Reset,
}

/// Thread-safe command queue shared between input producers and the game loop.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    inner: Arc<Mutex<VecDeque<GameCommand>>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a command to be processed on the next tick.
    pub fn push(&self, command: GameCommand) {
        self.inner.lock().push_back(command);
    }

    /// Shorthand for pushing a drop command.
    pub fn push_drop(&self, x: f32) {
        self.push(GameCommand::Drop { x });
    }

    /// Drain all pending commands in arrival order.
    pub fn drain(&self) -> Vec<GameCommand> {
        self.inner.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Clear all pending commands.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}
