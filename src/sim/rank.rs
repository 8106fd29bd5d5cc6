//! Rank chain: the ordered sequence of fruit tiers
//!
//! Each rank names its successor (or none for the terminal rank), the score
//! awarded when a fruit of that rank is created by a merge, and the physical
//! template (radius, mass) used when a fresh instance is built.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Stable archetype identifier (0 = smallest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RankId(pub u8);

impl RankId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One tier of the chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rank {
    pub id: RankId,
    pub name: String,
    /// None = terminal, never merges further
    pub next: Option<RankId>,
    /// Points awarded when a fruit of this rank is created by a merge
    pub score_value: u32,
    /// Collision radius in world units
    pub radius: f32,
    pub mass: f32,
}

/// Immutable rank table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankChain {
    ranks: Vec<Rank>,
}

/// Classic chain: (name, radius). Score values are triangular numbers.
const CLASSIC: [(&str, f32); 11] = [
    ("cherry", 0.25),
    ("strawberry", 0.33),
    ("grape", 0.42),
    ("dekopon", 0.48),
    ("persimmon", 0.58),
    ("apple", 0.70),
    ("pear", 0.80),
    ("peach", 0.92),
    ("pineapple", 1.05),
    ("melon", 1.20),
    ("watermelon", 1.40),
];

/// Mass per unit area for the classic chain
pub const FRUIT_DENSITY: f32 = 1.0;

impl RankChain {
    /// Build and validate a chain.
    ///
    /// Invariants: ids contiguous from 0 in table order, every `next` points
    /// strictly forward, exactly one terminal rank and it is the last one,
    /// positive score values and radii.
    pub fn new(ranks: Vec<Rank>) -> Result<Self, CoreError> {
        if ranks.is_empty() {
            return Err(CoreError::InvalidChain("chain is empty".into()));
        }
        if ranks.len() > u8::MAX as usize + 1 {
            return Err(CoreError::InvalidChain("too many ranks".into()));
        }

        let last = ranks.len() - 1;
        for (i, rank) in ranks.iter().enumerate() {
            if rank.id.index() != i {
                return Err(CoreError::InvalidChain(format!(
                    "rank at position {i} has id {}",
                    rank.id.0
                )));
            }
            if rank.score_value == 0 {
                return Err(CoreError::InvalidChain(format!(
                    "rank {i} has zero score value"
                )));
            }
            if !(rank.radius > 0.0) || !(rank.mass > 0.0) {
                return Err(CoreError::InvalidChain(format!(
                    "rank {i} has non-positive radius or mass"
                )));
            }
            match rank.next {
                Some(next) if next.index() <= i => {
                    return Err(CoreError::InvalidChain(format!(
                        "rank {i} points backward to {}",
                        next.0
                    )));
                }
                Some(next) if next.index() > last => {
                    return Err(CoreError::InvalidChain(format!(
                        "rank {i} points past the end to {}",
                        next.0
                    )));
                }
                None if i != last => {
                    return Err(CoreError::InvalidChain(format!(
                        "rank {i} is terminal but is not the last rank"
                    )));
                }
                Some(_) if i == last => {
                    return Err(CoreError::InvalidChain(
                        "last rank must be terminal".into(),
                    ));
                }
                _ => {}
            }
        }

        Ok(Self { ranks })
    }

    /// The classic 11-fruit chain
    pub fn classic() -> Self {
        let last = CLASSIC.len() - 1;
        let ranks = CLASSIC
            .iter()
            .enumerate()
            .map(|(i, &(name, radius))| {
                let n = i as u32 + 1;
                Rank {
                    id: RankId(i as u8),
                    name: name.to_string(),
                    next: (i < last).then(|| RankId(i as u8 + 1)),
                    score_value: n * (n + 1) / 2,
                    radius,
                    mass: std::f32::consts::PI * radius * radius * FRUIT_DENSITY,
                }
            })
            .collect();
        Self { ranks }
    }

    #[inline]
    pub fn get(&self, id: RankId) -> Option<&Rank> {
        self.ranks.get(id.index())
    }

    /// Successor rank, or None if `id` is terminal or unknown
    pub fn next_of(&self, id: RankId) -> Option<&Rank> {
        self.get(id)?.next.and_then(|next| self.get(next))
    }

    pub fn is_terminal(&self, id: RankId) -> bool {
        self.get(id).is_some_and(|r| r.next.is_none())
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rank> {
        self.ranks.iter()
    }

    /// Largest rank (the single terminal one)
    pub fn terminal(&self) -> RankId {
        RankId((self.ranks.len() - 1) as u8)
    }
}
