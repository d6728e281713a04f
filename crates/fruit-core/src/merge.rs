//! Merge resolution.
//!
//! Turns the contact pairs of one step into merges. Within a batch the first
//! event to touch an entity wins; later events referencing a consumed entity
//! are skipped, so three same-tier fruits touching at once produce one merge.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entity::{EntityId, EntityStore};
use crate::error::Result;
use crate::fruit::{FruitRegistry, TierId};
use crate::physics::{CollisionEvent, PhysicsWorld};

/// Score credited when two max-tier fruits merge.
pub const DEFAULT_MAX_MERGE_BONUS: u32 = 100;

/// One side of a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedFruit {
    pub entity_id: EntityId,
    pub tier_id: TierId,
}

/// Result of merging one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub consumed_a: MergedFruit,
    pub consumed_b: MergedFruit,
    /// Replacement fruit. `None` for a max-tier merge.
    pub created: Option<MergedFruit>,
    /// Midpoint of the consumed pair.
    pub position: [f32; 2],
    pub score_delta: u32,
}

impl MergeOutcome {
    pub fn is_max_merge(&self) -> bool {
        self.created.is_none()
    }
}

/// Tunables for merge resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergePolicy {
    /// Score awarded for merging two max-tier fruits (both vanish).
    pub max_merge_bonus: u32,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            max_merge_bonus: DEFAULT_MAX_MERGE_BONUS,
        }
    }
}

/// Applies merges for one batch of collision events.
#[derive(Debug, Clone, Default)]
pub struct MergeResolver {
    policy: MergePolicy,
}

impl MergeResolver {
    pub fn new(policy: MergePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &MergePolicy {
        &self.policy
    }

    /// Resolves `events` in order, mutating the store and physics world.
    ///
    /// Returns one outcome per applied merge. Events whose entities are absent
    /// or already consumed in this batch are skipped.
    pub fn resolve(
        &self,
        events: &[CollisionEvent],
        store: &mut EntityStore,
        world: &mut PhysicsWorld,
        registry: &FruitRegistry,
        frame: u64,
    ) -> Result<Vec<MergeOutcome>> {
        let mut consumed: HashSet<EntityId> = HashSet::new();
        let mut outcomes = Vec::new();

        for event in events {
            if event.entity_a == event.entity_b
                || consumed.contains(&event.entity_a)
                || consumed.contains(&event.entity_b)
            {
                continue;
            }

            let (Some(a), Some(b)) = (store.get(event.entity_a), store.get(event.entity_b)) else {
                continue;
            };
            if a.tier_id != b.tier_id {
                continue;
            }

            let tier = registry.tier_of(a.tier_id)?;
            let position = midpoint(a.position, b.position);
            let velocity = midpoint(a.velocity, b.velocity);
            let consumed_a = MergedFruit {
                entity_id: a.id,
                tier_id: a.tier_id,
            };
            let consumed_b = MergedFruit {
                entity_id: b.id,
                tier_id: b.tier_id,
            };
            let score_value = tier.score_value;
            let next_tier = registry.next_tier(a.tier_id).map(|t| t.id);

            store.remove(world, consumed_a.entity_id);
            store.remove(world, consumed_b.entity_id);
            consumed.insert(consumed_a.entity_id);
            consumed.insert(consumed_b.entity_id);

            let (created, score_delta) = match next_tier {
                Some(next_tier_id) => {
                    let entity_id = store.spawn_with_velocity(
                        world,
                        registry,
                        next_tier_id,
                        position,
                        velocity,
                        frame,
                    )?;
                    // The new fruit must not merge again within this batch.
                    consumed.insert(entity_id);
                    let created = MergedFruit {
                        entity_id,
                        tier_id: next_tier_id,
                    };
                    (Some(created), score_value)
                }
                None => (None, self.policy.max_merge_bonus),
            };

            debug!(
                a = %consumed_a.entity_id,
                b = %consumed_b.entity_id,
                tier = consumed_a.tier_id,
                created = ?created.map(|c| c.entity_id),
                score_delta,
                "merged fruit pair"
            );

            outcomes.push(MergeOutcome {
                consumed_a,
                consumed_b,
                created,
                position,
                score_delta,
            });
        }

        Ok(outcomes)
    }
}

fn midpoint(a: [f32; 2], b: [f32; 2]) -> [f32; 2] {
    [f32::midpoint(a[0], b[0]), f32::midpoint(a[1], b[1])]
}
