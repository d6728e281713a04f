//! Drop selection and placement.
//!
//! One fruit may be in flight at a time: a drop is rejected until the previous
//! drop has settled, been merged away, or exceeded `max_in_flight_ticks`.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::config::{PlayfieldConfig, SpawnerConfig};
use crate::entity::{EntityId, EntityStore};
use crate::error::{GameError, Result, SpawnRejection};
use crate::fruit::{FruitRegistry, TierId};
use crate::physics::PhysicsWorld;

#[derive(Debug, Clone, Copy)]
struct InFlight {
    entity_id: EntityId,
    ticks: u32,
}

/// Chooses the next fruit and places drops in the playfield.
#[derive(Debug, Clone)]
pub struct Spawner {
    config: SpawnerConfig,
    rng: ChaCha8Rng,
    seed: u64,
    upcoming: TierId,
    in_flight: Option<InFlight>,
    cooldown: u32,
}

impl Spawner {
    /// Creates a spawner with the given RNG seed.
    ///
    /// Weights beyond the registry are a configuration error.
    pub fn new(config: SpawnerConfig, registry: &FruitRegistry, seed: u64) -> Result<Self> {
        if config.weights.is_empty() || config.weights.iter().all(|w| *w == 0) {
            return Err(GameError::Config("spawner weights must not all be zero".to_string()));
        }
        if config.weights.len() > registry.len() {
            return Err(GameError::Config(format!(
                "spawner has {} weights but only {} tiers exist",
                config.weights.len(),
                registry.len()
            )));
        }

        let mut spawner = Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            upcoming: 0,
            in_flight: None,
            cooldown: 0,
        };
        spawner.upcoming = spawner.draw();
        Ok(spawner)
    }

    /// Weighted draw over the configured tiers.
    fn draw(&mut self) -> TierId {
        let total: u32 = self.config.weights.iter().sum();
        let mut roll = self.rng.random_range(0..total);
        for (tier, weight) in self.config.weights.iter().enumerate() {
            if roll < *weight {
                #[allow(clippy::cast_possible_truncation)]
                return tier as TierId;
            }
            roll -= weight;
        }
        0
    }

    /// Consumes the upcoming tier and draws the one after it.
    pub fn next_tier(&mut self) -> TierId {
        let tier = self.upcoming;
        self.upcoming = self.draw();
        tier
    }

    /// The tier the next drop will use.
    pub fn peek(&self) -> TierId {
        self.upcoming
    }

    /// The entity dropped most recently, while it has not settled.
    pub fn in_flight(&self) -> Option<EntityId> {
        self.in_flight.map(|f| f.entity_id)
    }

    /// Returns why a drop would be rejected right now, if it would be.
    pub fn readiness(&self) -> std::result::Result<(), SpawnRejection> {
        if self.in_flight.is_some() {
            return Err(SpawnRejection::InFlight);
        }
        if self.cooldown > 0 {
            return Err(SpawnRejection::Cooldown);
        }
        Ok(())
    }

    /// Clamps a drop x so a fruit of `radius` fits between the walls.
    pub fn clamp_x(x: f32, radius: f32, playfield: &PlayfieldConfig) -> f32 {
        let min = radius;
        let max = (playfield.width - radius).max(min);
        x.clamp(min, max)
    }

    /// Drops the upcoming fruit at `x` (clamped into the playfield).
    pub fn spawn_at(
        &mut self,
        x: f32,
        store: &mut EntityStore,
        world: &mut PhysicsWorld,
        registry: &FruitRegistry,
        playfield: &PlayfieldConfig,
        frame: u64,
    ) -> Result<EntityId> {
        if !x.is_finite() {
            return Err(GameError::SpawnRejected(SpawnRejection::InvalidPosition));
        }
        self.readiness().map_err(GameError::SpawnRejected)?;

        let tier = registry.tier_of(self.upcoming)?;
        let clamped = Self::clamp_x(x, tier.radius, playfield);
        let entity_id = store.spawn(world, registry, tier.id, [clamped, self.config.drop_y], frame)?;

        debug!(entity = %entity_id, tier = tier.id, x, clamped, "dropped fruit");

        self.next_tier();
        self.in_flight = Some(InFlight {
            entity_id,
            ticks: 0,
        });
        self.cooldown = self.config.drop_cooldown_ticks;
        Ok(entity_id)
    }

    /// Advances in-flight and cooldown bookkeeping by one tick.
    pub fn update(&mut self, store: &EntityStore) {
        self.cooldown = self.cooldown.saturating_sub(1);

        let Some(mut flight) = self.in_flight else {
            return;
        };
        flight.ticks += 1;

        let settled = match store.get(flight.entity_id) {
            // Merged away or swept out
            None => true,
            Some(entity) => {
                let speed = entity.velocity[0].hypot(entity.velocity[1]);
                (flight.ticks >= self.config.min_settle_ticks && speed < self.config.settle_speed)
                    || flight.ticks >= self.config.max_in_flight_ticks
            }
        };

        self.in_flight = if settled { None } else { Some(flight) };
    }

    /// Restarts the spawner with a new seed, forgetting any in-flight drop.
    pub fn reset(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.in_flight = None;
        self.cooldown = 0;
        self.upcoming = self.draw();
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(config: SpawnerConfig) -> (Spawner, EntityStore, PhysicsWorld, FruitRegistry) {
        let registry = FruitRegistry::classic();
        let spawner = Spawner::new(config, &registry, 42).unwrap();
        (spawner, EntityStore::new(), PhysicsWorld::new(), registry)
    }

    #[test]
    fn test_draws_only_weighted_tiers() {
        let (mut spawner, ..) = setup(SpawnerConfig::default());
        let mut counts = [0u32; 5];
        for _ in 0..2000 {
            let tier = spawner.next_tier();
            assert!(tier < 5, "tier {tier} outside weighted range");
            counts[usize::from(tier)] += 1;
        }
        // Biased toward small tiers
        assert!(counts[0] > counts[4]);
        assert!(counts.iter().all(|c| *c > 0));
    }

    #[test]
    fn test_zero_weight_tier_never_drawn() {
        let config = SpawnerConfig {
            weights: vec![0, 1],
            ..SpawnerConfig::default()
        };
        let (mut spawner, ..) = setup(config);
        for _ in 0..200 {
            assert_eq!(spawner.next_tier(), 1);
        }
    }

    #[test]
    fn test_deterministic_sequence() {
        let registry = FruitRegistry::classic();
        let mut a = Spawner::new(SpawnerConfig::default(), &registry, 7).unwrap();
        let mut b = Spawner::new(SpawnerConfig::default(), &registry, 7).unwrap();
        let seq_a: Vec<TierId> = (0..50).map(|_| a.next_tier()).collect();
        let seq_b: Vec<TierId> = (0..50).map(|_| b.next_tier()).collect();
        assert_eq!(seq_a, seq_b);

        a.reset(7);
        let replay: Vec<TierId> = (0..50).map(|_| a.next_tier()).collect();
        assert_eq!(seq_a, replay);
    }

    #[test]
    fn test_peek_matches_next() {
        let (mut spawner, ..) = setup(SpawnerConfig::default());
        for _ in 0..20 {
            let peeked = spawner.peek();
            assert_eq!(spawner.next_tier(), peeked);
        }
    }

    #[test]
    fn test_rejects_invalid_weights() {
        let registry = FruitRegistry::classic();
        let too_many = SpawnerConfig {
            weights: vec![1; 12],
            ..SpawnerConfig::default()
        };
        assert!(Spawner::new(too_many, &registry, 0).is_err());
        let all_zero = SpawnerConfig {
            weights: vec![0, 0],
            ..SpawnerConfig::default()
        };
        assert!(Spawner::new(all_zero, &registry, 0).is_err());
    }

    #[test]
    fn test_spawn_clamps_x() {
        let (mut spawner, mut store, mut world, registry) = setup(SpawnerConfig::default());
        let playfield = PlayfieldConfig::default();
        let tier = spawner.peek();
        let radius = registry.tier_of(tier).unwrap().radius;

        let id = spawner
            .spawn_at(-500.0, &mut store, &mut world, &registry, &playfield, 0)
            .unwrap();
        let entity = store.get(id).unwrap();
        assert_eq!(entity.tier_id, tier);
        assert_eq!(entity.position, [radius, SpawnerConfig::default().drop_y]);

        assert_eq!(Spawner::clamp_x(1000.0, 20.0, &playfield), 380.0);
        assert_eq!(Spawner::clamp_x(200.0, 20.0, &playfield), 200.0);
    }

    #[test]
    fn test_one_in_flight() {
        let (mut spawner, mut store, mut world, registry) = setup(SpawnerConfig::default());
        let playfield = PlayfieldConfig::default();

        let first = spawner
            .spawn_at(200.0, &mut store, &mut world, &registry, &playfield, 0)
            .unwrap();
        assert_eq!(spawner.in_flight(), Some(first));

        let err = spawner
            .spawn_at(100.0, &mut store, &mut world, &registry, &playfield, 0)
            .unwrap_err();
        assert!(matches!(err, GameError::SpawnRejected(SpawnRejection::InFlight)));
        assert_eq!(store.len(), 1);

        // Merged away: released on the next update
        store.remove(&mut world, first);
        spawner.update(&store);
        assert!(spawner.in_flight().is_none());
        assert!(
            spawner
                .spawn_at(100.0, &mut store, &mut world, &registry, &playfield, 1)
                .is_ok()
        );
    }

    #[test]
    fn test_in_flight_released_after_timeout() {
        let config = SpawnerConfig {
            max_in_flight_ticks: 3,
            settle_speed: 0.0,
            ..SpawnerConfig::default()
        };
        let (mut spawner, mut store, mut world, registry) = setup(config);
        spawner
            .spawn_at(200.0, &mut store, &mut world, &registry, &PlayfieldConfig::default(), 0)
            .unwrap();

        spawner.update(&store);
        spawner.update(&store);
        assert!(spawner.in_flight().is_some());
        spawner.update(&store);
        assert!(spawner.in_flight().is_none());
    }

    #[test]
    fn test_resting_fruit_settles() {
        let config = SpawnerConfig {
            min_settle_ticks: 2,
            ..SpawnerConfig::default()
        };
        let (mut spawner, mut store, mut world, registry) = setup(config);
        spawner
            .spawn_at(200.0, &mut store, &mut world, &registry, &PlayfieldConfig::default(), 0)
            .unwrap();

        // Velocity is zero until the world steps
        spawner.update(&store);
        assert!(spawner.in_flight().is_some());
        spawner.update(&store);
        assert!(spawner.in_flight().is_none());
    }

    #[test]
    fn test_cooldown() {
        let config = SpawnerConfig {
            drop_cooldown_ticks: 2,
            max_in_flight_ticks: 1,
            ..SpawnerConfig::default()
        };
        let (mut spawner, mut store, mut world, registry) = setup(config);
        let playfield = PlayfieldConfig::default();
        spawner
            .spawn_at(200.0, &mut store, &mut world, &registry, &playfield, 0)
            .unwrap();

        spawner.update(&store);
        assert_eq!(spawner.readiness(), Err(SpawnRejection::Cooldown));
        spawner.update(&store);
        assert_eq!(spawner.readiness(), Ok(()));
    }

    #[test]
    fn test_non_finite_x_rejected() {
        let (mut spawner, mut store, mut world, registry) = setup(SpawnerConfig::default());
        let err = spawner
            .spawn_at(f32::NAN, &mut store, &mut world, &registry, &PlayfieldConfig::default(), 0)
            .unwrap_err();
        assert!(matches!(
            err,
            GameError::SpawnRejected(SpawnRejection::InvalidPosition)
        ));
        assert!(store.is_empty());
    }
}
