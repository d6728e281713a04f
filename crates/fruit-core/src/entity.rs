//! Fruit entity store.
//!
//! Owns the only mapping from fruit entities to physics body handles. Every
//! live entity has exactly one body and every fruit body belongs to exactly
//! one live entity.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::fruit::{FruitRegistry, TierId};
use crate::physics::{BodyHandle, PhysicsWorld};

/// Unique, monotonically increasing identifier for a fruit entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A live fruit in the playfield.
#[derive(Debug, Clone)]
pub struct FruitEntity {
    pub id: EntityId,
    pub tier_id: TierId,
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    pub rotation: f32,
    pub radius: f32,
    pub body_handle: BodyHandle,
    /// Game tick on which the entity was created.
    pub spawned_at: u64,
}

/// Renderable copy of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub entity_id: EntityId,
    pub tier_id: TierId,
    pub position: [f32; 2],
    pub rotation: f32,
    pub radius: f32,
}

impl From<&FruitEntity> for EntityView {
    fn from(entity: &FruitEntity) -> Self {
        Self {
            entity_id: entity.id,
            tier_id: entity.tier_id,
            position: entity.position,
            rotation: entity.rotation,
            radius: entity.radius,
        }
    }
}

/// Manages fruit entities in the physics world.
#[derive(Debug, Default)]
pub struct EntityStore {
    entities: BTreeMap<EntityId, FruitEntity>,
    next_id: u64,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a resting fruit of `tier_id` at `position` and returns its id.
    pub fn spawn(
        &mut self,
        world: &mut PhysicsWorld,
        registry: &FruitRegistry,
        tier_id: TierId,
        position: [f32; 2],
        frame: u64,
    ) -> Result<EntityId> {
        self.spawn_with_velocity(world, registry, tier_id, position, [0.0, 0.0], frame)
    }

    /// Spawns a fruit with an initial velocity.
    pub fn spawn_with_velocity(
        &mut self,
        world: &mut PhysicsWorld,
        registry: &FruitRegistry,
        tier_id: TierId,
        position: [f32; 2],
        velocity: [f32; 2],
        frame: u64,
    ) -> Result<EntityId> {
        let tier = registry.tier_of(tier_id)?;
        if !(position.iter().all(|v| v.is_finite()) && velocity.iter().all(|v| v.is_finite())) {
            return Err(GameError::PhysicsDesync {
                entity_id: EntityId(self.next_id),
                detail: format!("non-finite spawn state {position:?} / {velocity:?}"),
            });
        }

        let id = EntityId(self.next_id);
        self.next_id += 1;

        let body_handle = world.add_body(id, tier, position, velocity);
        self.entities.insert(
            id,
            FruitEntity {
                id,
                tier_id,
                position,
                velocity,
                rotation: 0.0,
                radius: tier.radius,
                body_handle,
                spawned_at: frame,
            },
        );

        Ok(id)
    }

    /// Removes an entity and its physics body.
    ///
    /// Idempotent: removing an absent id is a no-op that returns `None`.
    pub fn remove(&mut self, world: &mut PhysicsWorld, entity_id: EntityId) -> Option<FruitEntity> {
        let entity = self.entities.remove(&entity_id)?;
        world.remove_body(entity.body_handle);
        Some(entity)
    }

    pub fn get(&self, entity_id: EntityId) -> Option<&FruitEntity> {
        self.entities.get(&entity_id)
    }

    pub fn contains(&self, entity_id: EntityId) -> bool {
        self.entities.contains_key(&entity_id)
    }

    /// Entities in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &FruitEntity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Copies body state from the physics world into every entity.
    ///
    /// Fails with `PhysicsDesync` on the first entity whose body is missing or
    /// whose state is not finite.
    pub fn sync_from_physics(&mut self, world: &PhysicsWorld) -> Result<()> {
        for entity in self.entities.values_mut() {
            let Some(state) = world.body_state(entity.body_handle) else {
                return Err(GameError::PhysicsDesync {
                    entity_id: entity.id,
                    detail: "physics body is missing".to_string(),
                });
            };
            if !state.is_finite() {
                return Err(GameError::PhysicsDesync {
                    entity_id: entity.id,
                    detail: format!("non-finite body state {state:?}"),
                });
            }
            entity.position = state.position;
            entity.velocity = state.velocity;
            entity.rotation = state.rotation;
        }
        Ok(())
    }

    /// Point-in-time copy of all entities, ascending by id.
    pub fn snapshot(&self) -> Vec<EntityView> {
        self.entities.values().map(EntityView::from).collect()
    }

    /// Removes every entity and body, and restarts id allocation.
    pub fn clear(&mut self, world: &mut PhysicsWorld) {
        for (_, entity) in std::mem::take(&mut self.entities) {
            world.remove_body(entity.body_handle);
        }
        self.next_id = 0;
    }
}
