//! Physics simulation using `Rapier2D` with deterministic behavior.
//!
//! The world is an opaque arena: callers get `RigidBodyHandle`s back and the
//! entity store keeps the only mapping from fruit entities to those handles.
//! Each fruit body carries its entity id in `user_data` so contact pairs can
//! be reported in entity terms without reading the store.

use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use parking_lot::Mutex;
use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::fruit::FruitTier;

/// Fixed timestep for physics simulation (60Hz).
pub const PHYSICS_DT: f32 = 1.0 / 60.0;

/// Upper bound for a single `step` call. Longer frames are clamped.
pub const MAX_STEP_DT: f32 = 0.1;

/// Slack on the radius-sum contact threshold, in pixels.
pub const CONTACT_EPSILON: f32 = 0.5;

/// Half thickness of the playfield walls.
pub const WALL_HALF_THICKNESS: f32 = 16.0;

/// Type tags for user_data encoding.
pub const USER_DATA_FRUIT: u64 = 1;
pub const USER_DATA_WALL: u64 = 2;

/// Handle to a body in the physics arena.
pub type BodyHandle = RigidBodyHandle;

/// Clamps a frame delta to `[0, MAX_STEP_DT]`. Non-finite deltas become zero.
pub fn clamp_dt(dt: f32) -> f32 {
    if dt.is_finite() {
        dt.clamp(0.0, MAX_STEP_DT)
    } else {
        0.0
    }
}

/// Default gravity vector (downward, in pixels/s²).
pub fn default_gravity() -> Vector {
    Vector::new(0.0, 981.0)
}

/// Encodes a type tag and ID into u128 user_data.
pub fn encode_user_data(type_tag: u64, id: u64) -> u128 {
    (u128::from(type_tag) << 64) | u128::from(id)
}

/// Decodes u128 user_data into (type_tag, id).
pub fn decode_user_data(user_data: u128) -> (u64, u64) {
    #[allow(clippy::cast_possible_truncation)]
    let type_tag = (user_data >> 64) as u64;
    #[allow(clippy::cast_possible_truncation)]
    let id = user_data as u64;
    (type_tag, id)
}

/// Two fruits in contact after a simulation step.
///
/// Transient: produced by one `step` and discarded before the next.
/// `entity_a < entity_b` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    pub entity_a: EntityId,
    pub entity_b: EntityId,
    /// Contact point on the segment between the two centres.
    pub point: [f32; 2],
}

/// Kinematic state of a body, copied out of the arena.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    pub rotation: f32,
}

impl BodyState {
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.velocity.iter().all(|v| v.is_finite())
            && self.rotation.is_finite()
    }

    pub fn speed(&self) -> f32 {
        self.velocity[0].hypot(self.velocity[1])
    }
}

/// Collects rapier collision events raised during `PhysicsPipeline::step`.
#[derive(Default)]
struct ContactCollector {
    events: Mutex<Vec<rapier2d::geometry::CollisionEvent>>,
}

impl ContactCollector {
    fn drain(&self) -> Vec<rapier2d::geometry::CollisionEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventHandler for ContactCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: rapier2d::geometry::CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        self.events.lock().push(event);
    }

    fn handle_contact_force_event(
        &self,
        _dt: f32,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: f32,
    ) {
    }
}

/// Unordered collider pair, normalized so that equal contacts hash equally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ContactKey(ColliderHandle, ColliderHandle);

impl ContactKey {
    fn new(h1: ColliderHandle, h2: ColliderHandle) -> Self {
        if h1.into_raw_parts() <= h2.into_raw_parts() {
            Self(h1, h2)
        } else {
            Self(h2, h1)
        }
    }

    fn involves(&self, handle: ColliderHandle) -> bool {
        self.0 == handle || self.1 == handle
    }
}

/// Physics world containing all `Rapier2D` components for deterministic simulation.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    collector: ContactCollector,
    touching: HashSet<ContactKey>,
    wall_handles: Vec<ColliderHandle>,
    pub gravity: Vector,
    pub frame: u64,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("frame", &self.frame)
            .field("rigid_body_count", &self.rigid_body_set.len())
            .field("collider_count", &self.collider_set.len())
            .field("touching_pairs", &self.touching.len())
            .field("gravity", &self.gravity)
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld {
    /// Creates a new physics world with default settings.
    pub fn new() -> Self {
        Self::with_gravity(default_gravity())
    }

    /// Creates a new physics world with custom gravity.
    pub fn with_gravity(gravity: Vector) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: PHYSICS_DT,
            ..Default::default()
        };

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            collector: ContactCollector::default(),
            touching: HashSet::new(),
            wall_handles: Vec::new(),
            gravity,
            frame: 0,
        }
    }

    /// Advances the simulation by `dt` seconds and returns the fruit pairs in contact.
    ///
    /// `dt` is clamped to `[0, MAX_STEP_DT]` and split into sub-steps no longer
    /// than `PHYSICS_DT`. A non-finite `dt` advances nothing. Pairs are
    /// reported once each, ordered by `(entity_a, entity_b)`.
    pub fn step(&mut self, dt: f32) -> Vec<CollisionEvent> {
        let dt = clamp_dt(dt);

        // Tolerance keeps an exact 1/60 from rounding up to two sub-steps.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let substeps = ((dt / PHYSICS_DT) - 1e-3).ceil().max(0.0) as u32;
        if substeps > 0 {
            #[allow(clippy::cast_precision_loss)]
            let sub_dt = dt / substeps as f32;
            self.integration_parameters.dt = sub_dt;
            for _ in 0..substeps {
                self.step_once();
            }
        }

        self.contacts()
    }

    /// Runs one rapier step at the current `integration_parameters.dt`.
    fn step_once(&mut self) {
        self.physics_pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            &(),
            &self.collector,
        );
        self.frame += 1;

        for event in self.collector.drain() {
            match event {
                rapier2d::geometry::CollisionEvent::Started(h1, h2, _) => {
                    self.touching.insert(ContactKey::new(h1, h2));
                }
                rapier2d::geometry::CollisionEvent::Stopped(h1, h2, _) => {
                    self.touching.remove(&ContactKey::new(h1, h2));
                }
            }
        }
    }

    /// Fruit pairs currently touching, verified against the radius-sum threshold.
    fn contacts(&self) -> Vec<CollisionEvent> {
        let mut events: Vec<CollisionEvent> = self
            .touching
            .iter()
            .filter_map(|key| {
                let (id_a, pos_a, r_a) = self.fruit_contact_info(key.0)?;
                let (id_b, pos_b, r_b) = self.fruit_contact_info(key.1)?;

                let dx = pos_b[0] - pos_a[0];
                let dy = pos_b[1] - pos_a[1];
                let reach = r_a + r_b + CONTACT_EPSILON;
                if dx * dx + dy * dy > reach * reach {
                    return None;
                }

                let t = r_a / (r_a + r_b);
                let point = [pos_a[0] + dx * t, pos_a[1] + dy * t];
                let (entity_a, entity_b) = if id_a <= id_b { (id_a, id_b) } else { (id_b, id_a) };
                Some(CollisionEvent {
                    entity_a,
                    entity_b,
                    point,
                })
            })
            .collect();

        events.sort_by_key(|e| (e.entity_a, e.entity_b));
        events.dedup_by_key(|e| (e.entity_a, e.entity_b));
        events
    }

    /// Resolves a collider to `(entity id, centre, radius)` if it belongs to a fruit.
    fn fruit_contact_info(&self, handle: ColliderHandle) -> Option<(EntityId, [f32; 2], f32)> {
        let collider = self.collider_set.get(handle)?;
        let body = self.rigid_body_set.get(collider.parent()?)?;
        let (tag, id) = decode_user_data(body.user_data);
        if tag != USER_DATA_FRUIT {
            return None;
        }
        let radius = collider.shape().as_ball()?.radius;
        let pos = body.translation();
        Some((EntityId(id), [pos.x, pos.y], radius))
    }

    /// Creates a dynamic ball body for a fruit and returns its handle.
    pub fn add_body(
        &mut self,
        entity_id: EntityId,
        tier: &FruitTier,
        position: [f32; 2],
        velocity: [f32; 2],
    ) -> BodyHandle {
        let rigid_body = RigidBodyBuilder::dynamic()
            .translation(Vector::new(position[0], position[1]))
            .linvel(Vector::new(velocity[0], velocity[1]))
            .linear_damping(0.1)
            .angular_damping(0.5)
            .ccd_enabled(true)
            .user_data(encode_user_data(USER_DATA_FRUIT, entity_id.0))
            .build();
        let body_handle = self.rigid_body_set.insert(rigid_body);

        let collider = ColliderBuilder::ball(tier.radius)
            .restitution(0.2)
            .friction(0.5)
            .mass(tier.mass)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        self.collider_set
            .insert_with_parent(collider, body_handle, &mut self.rigid_body_set);

        body_handle
    }

    /// Removes a rigid body and its attached colliders. Unknown handles are ignored.
    pub fn remove_body(&mut self, handle: BodyHandle) {
        let Some(body) = self.rigid_body_set.get(handle) else {
            return;
        };
        for collider in body.colliders() {
            self.touching.retain(|key| !key.involves(*collider));
        }

        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    /// Replaces the static floor and side walls for a `width` x `height` playfield.
    ///
    /// Walls sit outside the playfield so the interior spans `[0, width]` x `(-inf, height]`.
    pub fn set_boundaries(&mut self, width: f32, height: f32) {
        for handle in self.wall_handles.drain(..) {
            self.touching.retain(|key| !key.involves(handle));
            self.collider_set.remove(
                handle,
                &mut self.island_manager,
                &mut self.rigid_body_set,
                false,
            );
        }

        let t = WALL_HALF_THICKNESS;
        // Side walls extend well above the playfield so fruits cannot bounce out.
        let wall_half_height = height;
        let walls = [
            // floor
            ColliderBuilder::cuboid(width / 2.0 + 2.0 * t, t)
                .translation(Vector::new(width / 2.0, height + t)),
            // left
            ColliderBuilder::cuboid(t, wall_half_height).translation(Vector::new(-t, 0.0)),
            // right
            ColliderBuilder::cuboid(t, wall_half_height).translation(Vector::new(width + t, 0.0)),
        ];

        for (index, builder) in walls.into_iter().enumerate() {
            let collider = builder
                .friction(0.5)
                .restitution(0.1)
                .user_data(encode_user_data(USER_DATA_WALL, index as u64))
                .build();
            self.wall_handles.push(self.collider_set.insert(collider));
        }
    }

    /// Copies the kinematic state of a body out of the arena.
    pub fn body_state(&self, handle: BodyHandle) -> Option<BodyState> {
        self.rigid_body_set.get(handle).map(|body| {
            let pos = body.translation();
            let vel = body.linvel();
            BodyState {
                position: [pos.x, pos.y],
                velocity: [vel.x, vel.y],
                rotation: body.rotation().angle(),
            }
        })
    }

    /// Returns true if the handle refers to a live body.
    pub fn contains_body(&self, handle: BodyHandle) -> bool {
        self.rigid_body_set.contains(handle)
    }

    /// Number of dynamic bodies in the arena (walls are colliders only).
    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    /// Computes a deterministic hash of the current physics state.
    pub fn compute_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.frame.hash(&mut hasher);

        for (handle, body) in self.rigid_body_set.iter() {
            let (index, generation) = handle.into_raw_parts();
            index.hash(&mut hasher);
            generation.hash(&mut hasher);

            let pos = body.translation();
            hash_f32(pos.x, &mut hasher);
            hash_f32(pos.y, &mut hasher);

            let rot = body.rotation().angle();
            hash_f32(rot, &mut hasher);

            let linvel = body.linvel();
            hash_f32(linvel.x, &mut hasher);
            hash_f32(linvel.y, &mut hasher);

            let angvel = body.angvel();
            hash_f32(angvel, &mut hasher);
        }

        hasher.finish()
    }

    /// Returns the current simulation frame number (rapier sub-steps taken).
    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    /// Resets the physics world to its initial state. Walls are dropped as well.
    pub fn reset(&mut self) {
        *self = Self::with_gravity(self.gravity);
    }
}

/// Hashes a f32 value by converting to bits.
fn hash_f32(value: f32, hasher: &mut impl Hasher) {
    value.to_bits().hash(hasher);
}
