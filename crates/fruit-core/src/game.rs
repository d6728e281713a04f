//! Game loop controller.
//!
//! `GameLoop` owns every piece of session state and advances it one tick at a
//! time. A tick applies queued commands, steps physics, resolves merges,
//! sweeps escaped fruits, checks the death-line and publishes a snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::collaborator::Collaborators;
use crate::config::GameConfig;
use crate::entity::{EntityId, EntityStore};
use crate::error::{GameError, Result, SpawnRejection};
use crate::fruit::{FruitRegistry, TierId};
use crate::input::{CommandQueue, GameCommand};
use crate::merge::{MergeOutcome, MergeResolver};
use crate::physics::{PhysicsWorld, clamp_dt};
use crate::session::GameSession;
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::spawner::Spawner;

/// Lifecycle phase of a game loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Created or terminated; no session is being played.
    #[default]
    Idle,
    Running,
    /// The session ended. Only `reset` or `terminate` leave this phase.
    GameOver,
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// Tick number within the current session.
    pub frame: u64,
    pub merges: Vec<MergeOutcome>,
    /// Entities created by drop commands.
    pub spawned: Vec<EntityId>,
    pub rejected_drops: Vec<SpawnRejection>,
    pub removed_out_of_bounds: Vec<EntityId>,
    /// True only on the tick that ended the session.
    pub game_over: bool,
}

/// End-of-session statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub phase: GamePhase,
    pub score: u64,
    pub best_score: u64,
    pub highest_tier_reached: TierId,
    pub merges: u64,
    pub drops: u64,
    pub ticks: u64,
    pub live_fruits: usize,
}

/// Drives one play session at a time.
pub struct GameLoop {
    config: GameConfig,
    registry: Arc<FruitRegistry>,
    world: PhysicsWorld,
    store: EntityStore,
    resolver: MergeResolver,
    spawner: Spawner,
    session: GameSession,
    phase: GamePhase,
    commands: CommandQueue,
    snapshots: SnapshotStore,
    collaborators: Collaborators,
    /// Seconds each entity has spent with its top edge above the death-line.
    danger: BTreeMap<EntityId, f32>,
    best_score: u64,
    sessions_started: u64,
}

impl std::fmt::Debug for GameLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameLoop")
            .field("session", &self.session.id)
            .field("phase", &self.phase)
            .field("score", &self.session.score)
            .field("fruits", &self.store.len())
            .field("collaborators", &self.collaborators)
            .finish_non_exhaustive()
    }
}

impl GameLoop {
    /// Builds an idle game loop. Fails if the configuration is invalid.
    pub fn new(config: GameConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(config.registry()?);

        let mut world = PhysicsWorld::new();
        world.set_boundaries(config.playfield.width, config.playfield.height);

        let spawner = Spawner::new(config.spawner.clone(), &registry, config.seed)?;
        let session = GameSession::new(spawner.peek());
        let snapshots = SnapshotStore::new(Snapshot::empty(
            session.id,
            spawner.peek(),
            config.death_line_y,
        ));

        Ok(Self {
            resolver: MergeResolver::new(config.merge_policy()),
            config,
            registry,
            world,
            store: EntityStore::new(),
            spawner,
            session,
            phase: GamePhase::Idle,
            commands: CommandQueue::new(),
            snapshots,
            collaborators,
            danger: BTreeMap::new(),
            best_score: 0,
            sessions_started: 0,
        })
    }

    /// Starts a fresh session. Returns false unless the loop is idle.
    pub fn start(&mut self) -> bool {
        if self.phase != GamePhase::Idle {
            return false;
        }
        self.begin_session();
        true
    }

    /// Tears down the current session, whatever its phase, and starts a new one.
    pub fn reset(&mut self) {
        if self.phase != GamePhase::Idle {
            info!(
                session = %self.session.id,
                score = self.session.score,
                "session reset"
            );
        }
        self.begin_session();
    }

    /// Releases every body and entity and returns to `Idle`.
    ///
    /// The last session's score remains readable through `session()` until
    /// the next `start`.
    pub fn terminate(&mut self) {
        if self.phase == GamePhase::Idle && self.store.is_empty() {
            return;
        }
        if self.phase != GamePhase::Idle {
            self.collaborators.exit_game_mode();
        }

        self.store.clear(&mut self.world);
        self.danger.clear();
        self.commands.clear();
        self.phase = GamePhase::Idle;
        self.publish_snapshot();

        info!(
            session = %self.session.id,
            score = self.session.score,
            ticks = self.session.ticks,
            "session terminated"
        );
    }

    /// Queues a drop at horizontal position `x`, applied at the start of the next tick.
    pub fn queue_drop(&self, x: f32) -> Result<()> {
        if self.phase != GamePhase::Running {
            return Err(GameError::NotRunning);
        }
        self.commands.push_drop(x);
        Ok(())
    }

    /// Handle for pushing commands from other threads.
    pub fn command_queue(&self) -> CommandQueue {
        self.commands.clone()
    }

    /// Handle for reading published snapshots from other threads.
    pub fn snapshot_store(&self) -> SnapshotStore {
        self.snapshots.clone()
    }

    /// Places a resting fruit directly, bypassing the spawner.
    pub fn place_fruit(&mut self, tier_id: TierId, position: [f32; 2]) -> Result<EntityId> {
        if self.phase != GamePhase::Running {
            return Err(GameError::NotRunning);
        }
        let id = self
            .store
            .spawn(&mut self.world, &self.registry, tier_id, position, self.session.ticks)?;
        self.session.record_tier(tier_id);
        Ok(id)
    }

    /// Advances the session by `dt` seconds.
    ///
    /// Queued commands are applied first; a `Reset` command is honoured in
    /// any phase. Outside `Running` nothing else happens.
    pub fn tick(&mut self, dt: f32) -> TickReport {
        let mut report = TickReport {
            frame: self.session.ticks,
            ..TickReport::default()
        };

        for command in self.commands.drain() {
            match command {
                GameCommand::Reset => {
                    self.reset();
                    report = TickReport::default();
                }
                GameCommand::Drop { x } => self.apply_drop(x, &mut report),
            }
        }

        if self.phase != GamePhase::Running {
            return report;
        }

        let dt = clamp_dt(dt);
        let events = self.world.step(dt);
        self.session.ticks += 1;
        report.frame = self.session.ticks;

        if let Err(err) = self.store.sync_from_physics(&self.world) {
            error!(session = %self.session.id, error = %err, "physics desync, ending session");
            report.game_over = self.end_session();
            self.publish_snapshot();
            return report;
        }

        match self.resolver.resolve(
            &events,
            &mut self.store,
            &mut self.world,
            &self.registry,
            report.frame,
        ) {
            Ok(outcomes) => {
                for outcome in &outcomes {
                    self.session.add_score(outcome.score_delta);
                    self.session.merges += 1;
                    if let Some(created) = outcome.created {
                        self.session.record_tier(created.tier_id);
                    }
                    self.danger.remove(&outcome.consumed_a.entity_id);
                    self.danger.remove(&outcome.consumed_b.entity_id);
                    self.collaborators.merge_feedback(outcome);
                }
                report.merges = outcomes;
            }
            Err(err) => {
                error!(session = %self.session.id, error = %err, "merge resolution failed, ending session");
                report.game_over = self.end_session();
                self.publish_snapshot();
                return report;
            }
        }

        self.spawner.update(&self.store);
        report.removed_out_of_bounds = self.sweep_out_of_bounds();

        if self.death_line_exceeded(dt) {
            report.game_over = self.end_session();
        }

        self.publish_snapshot();
        report
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn score(&self) -> u64 {
        self.session.score
    }

    /// Highest score of any session played by this loop.
    pub fn best_score(&self) -> u64 {
        self.best_score.max(self.session.score)
    }

    /// The tier the next drop will use.
    pub fn next_tier(&self) -> TierId {
        self.spawner.peek()
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn registry(&self) -> &Arc<FruitRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Deterministic hash of the simulation state.
    pub fn compute_hash(&self) -> u64 {
        self.world.compute_hash()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session.id,
            phase: self.phase,
            score: self.session.score,
            best_score: self.best_score(),
            highest_tier_reached: self.session.highest_tier_reached,
            merges: self.session.merges,
            drops: self.session.drops,
            ticks: self.session.ticks,
            live_fruits: self.store.len(),
        }
    }

    /// Full teardown followed by a fresh session in `Running`.
    ///
    /// Session `n` (counting from zero) seeds its spawner with `seed + n`.
    fn begin_session(&mut self) {
        self.best_score = self.best_score();

        self.store.clear(&mut self.world);
        self.world.reset();
        self.world
            .set_boundaries(self.config.playfield.width, self.config.playfield.height);
        self.danger.clear();
        self.commands.clear();

        let seed = self.config.seed.wrapping_add(self.sessions_started);
        self.sessions_started += 1;
        self.spawner.reset(seed);
        self.session = GameSession::new(self.spawner.peek());
        self.phase = GamePhase::Running;

        info!(session = %self.session.id, seed, "session started");
        self.collaborators.enter_game_mode();
        self.publish_snapshot();
    }

    fn apply_drop(&mut self, x: f32, report: &mut TickReport) {
        if self.phase != GamePhase::Running {
            debug!(x, phase = ?self.phase, "ignoring drop outside a running session");
            return;
        }

        let spawned = self.spawner.spawn_at(
            x,
            &mut self.store,
            &mut self.world,
            &self.registry,
            &self.config.playfield,
            self.session.ticks,
        );
        match spawned {
            Ok(entity_id) => {
                let tier = self.store.get(entity_id).map_or(0, |e| e.tier_id);
                self.session.drops += 1;
                self.session.record_tier(tier);
                self.session.pending_spawn_tier = self.spawner.peek();
                report.spawned.push(entity_id);
                self.collaborators.drop_feedback(tier);
            }
            Err(GameError::SpawnRejected(reason)) => {
                warn!(x, %reason, "drop rejected");
                report.rejected_drops.push(reason);
            }
            Err(err) => {
                error!(x, error = %err, "drop failed");
            }
        }
    }

    /// Removes fruits that left the playfield past the configured margin.
    fn sweep_out_of_bounds(&mut self) -> Vec<EntityId> {
        let margin = self.config.out_of_bounds_margin;
        let width = self.config.playfield.width;
        let height = self.config.playfield.height;

        let escaped: Vec<EntityId> = self
            .store
            .iter()
            .filter(|e| {
                let [x, y] = e.position;
                x < -margin || x > width + margin || y > height + margin
            })
            .map(|e| e.id)
            .collect();

        for id in &escaped {
            self.store.remove(&mut self.world, *id);
            self.danger.remove(id);
            debug!(entity = %id, "removed out-of-bounds fruit");
        }
        escaped
    }

    /// Accumulates time above the death-line. Returns true once any settled
    /// fruit has stayed above it for the grace period.
    fn death_line_exceeded(&mut self, dt: f32) -> bool {
        let in_flight = self.spawner.in_flight();
        let line = self.config.death_line_y;
        let grace = self.config.grace_period_secs;

        let mut danger = BTreeMap::new();
        let mut exceeded = false;
        for entity in self.store.iter() {
            if Some(entity.id) == in_flight || entity.position[1] - entity.radius >= line {
                continue;
            }
            let elapsed = self.danger.get(&entity.id).copied().unwrap_or(0.0) + dt;
            if elapsed >= grace {
                debug!(entity = %entity.id, elapsed, "fruit stayed above the death-line");
                exceeded = true;
            }
            danger.insert(entity.id, elapsed);
        }
        self.danger = danger;
        exceeded
    }

    /// Moves to `GameOver`. Returns true if this call ended the session.
    fn end_session(&mut self) -> bool {
        if !self.session.end() {
            return false;
        }
        self.phase = GamePhase::GameOver;
        self.best_score = self.best_score.max(self.session.score);
        self.commands.clear();

        info!(
            session = %self.session.id,
            score = self.session.score,
            best_score = self.best_score,
            ticks = self.session.ticks,
            "game over"
        );
        self.collaborators.game_over_feedback(self.session.score);
        true
    }

    fn publish_snapshot(&mut self) {
        self.snapshots.publish(Snapshot {
            session_id: self.session.id,
            frame: self.session.ticks,
            phase: self.phase,
            score: self.session.score,
            best_score: self.best_score(),
            highest_tier_reached: self.session.highest_tier_reached,
            next_tier: self.spawner.peek(),
            death_line_y: self.config.death_line_y,
            entities: self.store.snapshot(),
        });
        let latest = self.snapshots.latest();
        self.collaborators.present(&latest);
    }
}
