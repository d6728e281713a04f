//! Fruit tier table.
//!
//! Tiers are loaded once at startup and never mutated. The registry is shared
//! behind an `Arc` and read from any thread.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Index of a fruit tier in the registry.
pub type TierId = u8;

/// Immutable descriptor of one fruit tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FruitTier {
    pub id: TierId,
    pub name: String,
    /// Collider radius in pixels.
    pub radius: f32,
    pub mass: f32,
    /// Score credited when two fruits of this tier merge.
    pub score_value: u32,
    /// Tier produced by merging two fruits of this tier. `None` for the max tier.
    pub next_tier_id: Option<TierId>,
}

/// Radius, mass and name of the classic eleven-tier table.
const CLASSIC_TIERS: [(&str, f32, f32); 11] = [
    ("cherry", 17.0, 1.0),
    ("strawberry", 24.0, 2.0),
    ("grape", 33.0, 4.0),
    ("dekopon", 38.0, 5.5),
    ("persimmon", 49.0, 9.0),
    ("apple", 61.0, 14.0),
    ("pear", 69.0, 18.0),
    ("peach", 84.0, 26.0),
    ("pineapple", 98.0, 36.0),
    ("melon", 128.0, 60.0),
    ("watermelon", 162.0, 96.0),
];

/// Read-only table of fruit tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FruitTier>", into = "Vec<FruitTier>")]
pub struct FruitRegistry {
    tiers: Vec<FruitTier>,
}

impl FruitRegistry {
    /// Builds a registry, validating the tier chain.
    pub fn new(tiers: Vec<FruitTier>) -> Result<Self> {
        if tiers.is_empty() {
            return Err(GameError::Config("fruit table is empty".to_string()));
        }
        if tiers.len() > usize::from(TierId::MAX) + 1 {
            return Err(GameError::Config(format!(
                "fruit table has {} tiers, at most {} supported",
                tiers.len(),
                usize::from(TierId::MAX) + 1
            )));
        }

        let last = tiers.len() - 1;
        for (index, tier) in tiers.iter().enumerate() {
            if usize::from(tier.id) != index {
                return Err(GameError::Config(format!(
                    "tier '{}' has id {} but sits at index {index}",
                    tier.name, tier.id
                )));
            }
            if !(tier.radius.is_finite() && tier.radius > 0.0) {
                return Err(GameError::Config(format!(
                    "tier '{}' has invalid radius {}",
                    tier.name, tier.radius
                )));
            }
            if !(tier.mass.is_finite() && tier.mass > 0.0) {
                return Err(GameError::Config(format!(
                    "tier '{}' has invalid mass {}",
                    tier.name, tier.mass
                )));
            }
            let expected = (index < last).then(|| tier.id + 1);
            if tier.next_tier_id != expected {
                return Err(GameError::Config(format!(
                    "tier '{}' must merge into {expected:?}, found {:?}",
                    tier.name, tier.next_tier_id
                )));
            }
        }

        Ok(Self { tiers })
    }

    /// The classic eleven-tier table (cherry to watermelon).
    ///
    /// Score values are triangular numbers: 1, 3, 6, ... 66.
    pub fn classic() -> Self {
        let last = CLASSIC_TIERS.len() - 1;
        let tiers = CLASSIC_TIERS
            .iter()
            .enumerate()
            .map(|(index, &(name, radius, mass))| {
                #[allow(clippy::cast_possible_truncation)]
                let id = index as TierId;
                #[allow(clippy::cast_possible_truncation)]
                let n = (index + 1) as u32;
                FruitTier {
                    id,
                    name: name.to_string(),
                    radius,
                    mass,
                    score_value: n * (n + 1) / 2,
                    next_tier_id: (index < last).then_some(id + 1),
                }
            })
            .collect();
        Self { tiers }
    }

    /// Returns the tier descriptor, or `InvalidTier` if out of range.
    pub fn tier_of(&self, id: TierId) -> Result<&FruitTier> {
        self.tiers
            .get(usize::from(id))
            .ok_or(GameError::InvalidTier {
                id,
                len: self.tiers.len(),
            })
    }

    /// Returns the tier produced by merging two fruits of `id`, or `None` at the max tier.
    pub fn next_tier(&self, id: TierId) -> Option<&FruitTier> {
        let next = self.tier_of(id).ok()?.next_tier_id?;
        self.tiers.get(usize::from(next))
    }

    pub fn max_tier_id(&self) -> TierId {
        #[allow(clippy::cast_possible_truncation)]
        let id = (self.tiers.len() - 1) as TierId;
        id
    }

    pub fn contains(&self, id: TierId) -> bool {
        usize::from(id) < self.tiers.len()
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FruitTier> {
        self.tiers.iter()
    }
}

impl Default for FruitRegistry {
    fn default() -> Self {
        Self::classic()
    }
}

impl TryFrom<Vec<FruitTier>> for FruitRegistry {
    type Error = GameError;

    fn try_from(tiers: Vec<FruitTier>) -> Result<Self> {
        Self::new(tiers)
    }
}

impl From<FruitRegistry> for Vec<FruitTier> {
    fn from(registry: FruitRegistry) -> Self {
        registry.tiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classic_table() {
        let registry = FruitRegistry::classic();
        assert_eq!(registry.len(), 11);
        assert_eq!(registry.max_tier_id(), 10);
        assert_eq!(registry.tier_of(0).unwrap().score_value, 1);
        assert_eq!(registry.tier_of(1).unwrap().score_value, 3);
        assert_eq!(registry.tier_of(10).unwrap().score_value, 66);

        // Radii grow monotonically
        let radii: Vec<f32> = registry.iter().map(|t| t.radius).collect();
        assert!(radii.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_tier_of_out_of_range() {
        let registry = FruitRegistry::classic();
        let err = registry.tier_of(11).unwrap_err();
        assert!(matches!(err, GameError::InvalidTier { id: 11, len: 11 }));
    }

    #[test]
    fn test_next_tier() {
        let registry = FruitRegistry::classic();
        assert_eq!(registry.next_tier(0).map(|t| t.id), Some(1));
        assert_eq!(registry.next_tier(9).map(|t| t.id), Some(10));
        assert!(registry.next_tier(registry.max_tier_id()).is_none());
        assert!(registry.next_tier(200).is_none());
    }

    #[test]
    fn test_rejects_broken_chain() {
        let mut tiers: Vec<FruitTier> = FruitRegistry::classic().into();
        tiers[3].next_tier_id = Some(5);
        assert!(matches!(FruitRegistry::new(tiers), Err(GameError::Config(_))));

        assert!(matches!(FruitRegistry::new(Vec::new()), Err(GameError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_radius() {
        let mut tiers: Vec<FruitTier> = FruitRegistry::classic().into();
        tiers[0].radius = f32::NAN;
        assert!(FruitRegistry::new(tiers).is_err());
    }

    #[test]
    fn test_json_roundtrip_validates() {
        let json = serde_json::to_string(&FruitRegistry::classic()).unwrap();
        let parsed: FruitRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, FruitRegistry::classic());

        let broken = r#"[{"id":1,"name":"x","radius":1.0,"mass":1.0,"score_value":1,"next_tier_id":null}]"#;
        assert!(serde_json::from_str::<FruitRegistry>(broken).is_err());
    }

    #[test]
    fn test_registry_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FruitRegistry>();
    }
}
