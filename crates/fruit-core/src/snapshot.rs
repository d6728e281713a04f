//! Renderer snapshots.
//!
//! A snapshot is an immutable copy of everything a renderer needs for one
//! frame. The game loop publishes one per tick into a `SnapshotStore`;
//! renderers poll the store at their own cadence.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntityView;
use crate::error::{GameError, Result};
use crate::fruit::TierId;
use crate::game::GamePhase;

/// Point-in-time copy of renderable game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub session_id: Uuid,
    pub frame: u64,
    pub phase: GamePhase,
    pub score: u64,
    pub best_score: u64,
    pub highest_tier_reached: TierId,
    pub next_tier: TierId,
    pub death_line_y: f32,
    /// Live fruits, ascending by entity id.
    pub entities: Vec<EntityView>,
}

impl Snapshot {
    /// Serialize the snapshot to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|e| GameError::Snapshot(e.to_string()))
    }

    /// Deserialize a snapshot from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        postcard::from_bytes(data).map_err(|e| GameError::Snapshot(e.to_string()))
    }

    /// An empty snapshot for a controller that has not ticked yet.
    pub fn empty(session_id: Uuid, next_tier: TierId, death_line_y: f32) -> Self {
        Self {
            session_id,
            frame: 0,
            phase: GamePhase::Idle,
            score: 0,
            best_score: 0,
            highest_tier_reached: 0,
            next_tier,
            death_line_y,
            entities: Vec::new(),
        }
    }
}

/// Shared latest-snapshot slot. Single writer (the game loop), many readers.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    latest: Arc<RwLock<Arc<Snapshot>>>,
}

impl SnapshotStore {
    pub fn new(initial: Snapshot) -> Self {
        Self {
            latest: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    /// Replaces the latest snapshot.
    pub(crate) fn publish(&self, snapshot: Snapshot) {
        *self.latest.write() = Arc::new(snapshot);
    }

    /// Returns the most recently published snapshot.
    ///
    /// The returned value never changes; later publishes swap in a new one.
    pub fn latest(&self) -> Arc<Snapshot> {
        Arc::clone(&self.latest.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;

    fn sample() -> Snapshot {
        let mut snapshot = Snapshot::empty(Uuid::new_v4(), 2, 100.0);
        snapshot.frame = 42;
        snapshot.phase = GamePhase::Running;
        snapshot.score = 17;
        snapshot.entities.push(EntityView {
            entity_id: EntityId(3),
            tier_id: 1,
            position: [120.0, 480.5],
            rotation: 0.25,
            radius: 24.0,
        });
        snapshot
    }

    #[test]
    fn test_bytes_roundtrip() {
        let snapshot = sample();
        let bytes = snapshot.to_bytes().unwrap();
        assert_eq!(Snapshot::from_bytes(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn test_from_garbage_fails() {
        assert!(matches!(
            Snapshot::from_bytes(&[0xff, 0xff, 0xff]),
            Err(GameError::Snapshot(_))
        ));
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let store = SnapshotStore::new(sample());
        let held = store.latest();

        let mut next = sample();
        next.frame = 43;
        next.entities.clear();
        store.publish(next);

        assert_eq!(held.frame, 42);
        assert_eq!(held.entities.len(), 1);
        assert_eq!(store.latest().frame, 43);
    }

    #[test]
    fn test_store_shared_across_threads() {
        let store = SnapshotStore::new(sample());
        let reader = store.clone();
        let handle = std::thread::spawn(move || reader.latest().score);
        assert_eq!(handle.join().unwrap(), 17);
    }
}
