//! Log-only renderer.

use fruit_core::{CollaboratorFailure, Renderer, Snapshot};
use tracing::info;

/// Logs a one-line summary every `every` frames.
#[derive(Debug, Clone, Copy)]
pub struct LogRenderer {
    every: u64,
}

impl LogRenderer {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
        }
    }

    fn should_log(&self, frame: u64) -> bool {
        frame > 0 && frame % self.every == 0
    }
}

impl Renderer for LogRenderer {
    fn name(&self) -> &'static str {
        "log"
    }

    fn present(&mut self, snapshot: &Snapshot) -> Result<(), CollaboratorFailure> {
        if self.should_log(snapshot.frame) {
            let top = snapshot
                .entities
                .iter()
                .map(|e| e.position[1] - e.radius)
                .fold(f32::INFINITY, f32::min);
            info!(
                frame = snapshot.frame,
                score = snapshot.score,
                fruits = snapshot.entities.len(),
                next_tier = snapshot.next_tier,
                pile_top = top,
                "tick"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_cadence() {
        let renderer = LogRenderer::new(60);
        assert!(!renderer.should_log(0));
        assert!(!renderer.should_log(59));
        assert!(renderer.should_log(60));
        assert!(renderer.should_log(120));
        assert!(LogRenderer::new(0).should_log(1));
    }
}
