//! Error taxonomy for the simulation core.

use crate::entity::EntityId;
use crate::fruit::TierId;

/// Errors raised by the simulation core.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// Tier index outside the registry. Indicates a defect in the caller.
    #[error("invalid fruit tier {id} (registry has {len} tiers)")]
    InvalidTier { id: TierId, len: usize },
    /// A drop was refused; the input is ignored.
    #[error("spawn rejected: {0}")]
    SpawnRejected(SpawnRejection),
    /// The simulation produced a non-finite or out-of-domain value.
    #[error("physics desync on entity {entity_id}: {detail}")]
    PhysicsDesync { entity_id: EntityId, detail: String },
    /// The operation requires a running session.
    #[error("session is not running")]
    NotRunning,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("snapshot encoding failed: {0}")]
    Snapshot(String),
}

impl GameError {
    /// Returns true if the session must end because of this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PhysicsDesync { .. })
    }
}

/// Reason a drop command was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnRejection {
    /// The previous drop has not settled yet.
    InFlight,
    /// The post-drop cooldown has not elapsed.
    Cooldown,
    /// The requested x coordinate is not a finite number.
    InvalidPosition,
}

impl std::fmt::Display for SpawnRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InFlight => f.write_str("previous fruit is still in flight"),
            Self::Cooldown => f.write_str("drop cooldown active"),
            Self::InvalidPosition => f.write_str("drop position is not finite"),
        }
    }
}

/// Failure reported by an external collaborator (renderer, haptics, audio, screen).
///
/// Always caught at the boundary and logged; never aborts a tick.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CollaboratorFailure {
    #[error("capability not supported on this platform")]
    Unsupported,
    #[error("collaborator failed: {0}")]
    Failed(String),
}

pub type Result<T, E = GameError> = std::result::Result<T, E>;
