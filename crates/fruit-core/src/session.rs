//! Per-session score and terminal state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fruit::TierId;

/// State of one play session. Mutated only by the game loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    pub id: Uuid,
    pub score: u64,
    /// Highest tier of any fruit placed, dropped or merged this session.
    pub highest_tier_reached: TierId,
    pub is_over: bool,
    /// Tier the next drop will use.
    pub pending_spawn_tier: TierId,
    pub merges: u64,
    pub drops: u64,
    pub ticks: u64,
}

impl GameSession {
    pub fn new(pending_spawn_tier: TierId) -> Self {
        Self {
            id: Uuid::new_v4(),
            score: 0,
            highest_tier_reached: 0,
            is_over: false,
            pending_spawn_tier,
            merges: 0,
            drops: 0,
            ticks: 0,
        }
    }

    /// Adds to the score. Ignored once the session is over.
    pub fn add_score(&mut self, delta: u32) {
        if self.is_over {
            return;
        }
        self.score = self.score.saturating_add(u64::from(delta));
    }

    pub fn record_tier(&mut self, tier: TierId) {
        self.highest_tier_reached = self.highest_tier_reached.max(tier);
    }

    /// Marks the session as over. Returns true only on the first call.
    pub fn end(&mut self) -> bool {
        if self.is_over {
            return false;
        }
        self.is_over = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_transitions_once() {
        let mut session = GameSession::new(0);
        assert!(session.end());
        assert!(!session.end());
        assert!(session.is_over);
    }

    #[test]
    fn test_score_frozen_after_end() {
        let mut session = GameSession::new(0);
        session.add_score(10);
        session.end();
        session.add_score(5);
        assert_eq!(session.score, 10);
    }

    #[test]
    fn test_score_saturates() {
        let mut session = GameSession::new(0);
        session.score = u64::MAX - 1;
        session.add_score(u32::MAX);
        assert_eq!(session.score, u64::MAX);
    }

    #[test]
    fn test_fresh_session_has_reached_no_tier() {
        let session = GameSession::new(4);
        assert_eq!(session.highest_tier_reached, 0);
        assert_eq!(session.pending_spawn_tier, 4);
    }

    #[test]
    fn test_highest_tier_only_grows() {
        let mut session = GameSession::new(0);
        session.record_tier(2);
        session.record_tier(1);
        assert_eq!(session.highest_tier_reached, 2);
        session.record_tier(5);
        assert_eq!(session.highest_tier_reached, 5);
    }

    #[test]
    fn test_sessions_have_distinct_ids() {
        assert_ne!(GameSession::new(0).id, GameSession::new(0).id);
    }
}
