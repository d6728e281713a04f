//! Fruit-Merge Core Library
//!
//! Deterministic physics-merge puzzle simulation on `Rapier2D`: fruits are
//! dropped into a walled playfield, same-tier fruits that touch merge into
//! the next tier, and a session ends when the pile stays above the
//! death-line for too long.
//!
//! The core is headless. Rendering, haptics, audio and screen control are
//! reached through the traits in [`collaborator`]; the `runtime` feature adds
//! a tokio tick scheduler in [`runner`].

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod collaborator;
pub mod config;
pub mod entity;
pub mod error;
pub mod fruit;
pub mod game;
pub mod input;
pub mod merge;
pub mod physics;
#[cfg(feature = "runtime")]
pub mod runner;
pub mod session;
pub mod snapshot;
pub mod spawner;

#[cfg(test)]
pub(crate) mod test_utils;

pub use collaborator::{Collaborators, FeedbackSink, Platform, Renderer, ScreenService};
pub use config::{GameConfig, PlayfieldConfig, SpawnerConfig};
pub use entity::{EntityId, EntityStore, EntityView, FruitEntity};
pub use error::{CollaboratorFailure, GameError, Result, SpawnRejection};
pub use fruit::{FruitRegistry, FruitTier, TierId};
pub use game::{GameLoop, GamePhase, SessionSummary, TickReport};
pub use input::{CommandQueue, GameCommand};
pub use merge::{MergeOutcome, MergePolicy, MergeResolver, MergedFruit};
pub use physics::{CollisionEvent, PHYSICS_DT, PhysicsWorld, default_gravity};
pub use session::GameSession;
pub use snapshot::{Snapshot, SnapshotStore};
pub use spawner::Spawner;
