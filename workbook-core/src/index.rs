//! Bounded 1-based indices and the flat-key scheme
//!
//! The persisted layout stores 2-D tables as flat numbered keys:
//! - possibilities and selections: `(idea - 1) * 3 + n` for n in 1..=3 (keys 1..=15)
//! - formed-concept ratings: `(column - 1) * 5 + criterion` (keys 1..=15)
//!
//! Everything inside the crate uses the typed indices below; flat keys only
//! appear in the layout codec.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_IDEAS: usize = 5;
pub const SLOTS_PER_IDEA: usize = 3;
pub const FORMED_CONCEPTS: usize = 3;
pub const MAX_CRITERIA: usize = 5;
pub const MAX_RISKS: usize = 3;
pub const MAX_TASKS: usize = 30;

/// Largest possibility/selection flat key (5 ideas x 3 slots)
pub const MAX_FLAT_KEY: usize = MAX_IDEAS * SLOTS_PER_IDEA;

macro_rules! bounded_index {
    ($(#[$meta:meta])* $name:ident, $max:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "usize", into = "usize")]
        pub struct $name(u8);

        impl $name {
            pub const MAX: usize = $max;

            /// Build from a 1-based number, `None` when out of range
            pub fn new(n: usize) -> Option<Self> {
                (1..=Self::MAX).contains(&n).then(|| $name(n as u8))
            }

            /// The 1-based number
            pub fn get(self) -> usize {
                self.0 as usize
            }

            /// 0-based offset for array access
            pub fn offset(self) -> usize {
                self.0 as usize - 1
            }

            /// Every index in ascending order
            pub fn all() -> impl Iterator<Item = Self> {
                (1..=Self::MAX).map(|n| $name(n as u8))
            }
        }

        impl TryFrom<usize> for $name {
            type Error = String;

            fn try_from(n: usize) -> Result<Self, Self::Error> {
                $name::new(n).ok_or_else(|| {
                    format!("{} must be between 1 and {} (got {})", stringify!($name), Self::MAX, n)
                })
            }
        }

        impl From<$name> for usize {
            fn from(index: $name) -> usize {
                index.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

bounded_index!(
    /// One of the brainstormed ideas (1..=5)
    IdeaIndex,
    MAX_IDEAS
);
bounded_index!(
    /// Possibility option number within an idea (1..=3)
    Slot,
    SLOTS_PER_IDEA
);
bounded_index!(
    /// Formation column, i.e. formed concept number (1..=3)
    Column,
    FORMED_CONCEPTS
);
bounded_index!(
    /// Evaluation criterion (1..=5)
    CriterionIndex,
    MAX_CRITERIA
);
bounded_index!(
    /// Prevention matrix entry (1..=3)
    RiskIndex,
    MAX_RISKS
);
bounded_index!(
    /// Task plan row (1..=30)
    TaskIndex,
    MAX_TASKS
);

/// Map (idea, n) to its flat key; `n` is a slot or a column number (1..=3)
pub fn flat_key(idea: IdeaIndex, n: usize) -> Option<usize> {
    (1..=SLOTS_PER_IDEA)
        .contains(&n)
        .then(|| idea.offset() * SLOTS_PER_IDEA + n)
}

/// Inverse of [`flat_key`]
pub fn split_flat_key(key: usize) -> Option<(IdeaIndex, usize)> {
    if !(1..=MAX_FLAT_KEY).contains(&key) {
        return None;
    }
    let idea = IdeaIndex::new((key - 1) / SLOTS_PER_IDEA + 1)?;
    Some((idea, (key - 1) % SLOTS_PER_IDEA + 1))
}

/// Flat key of a possibility (`pos{key}`)
pub fn possibility_key(idea: IdeaIndex, slot: Slot) -> usize {
    idea.offset() * SLOTS_PER_IDEA + slot.get()
}

/// Flat key of a column selection (`pastel_grupo{key}`)
pub fn selection_key(idea: IdeaIndex, column: Column) -> usize {
    idea.offset() * SLOTS_PER_IDEA + column.get()
}

/// Flat key of a formed-concept rating (`ca{key}`)
pub fn rating_key(column: Column, criterion: CriterionIndex) -> usize {
    column.offset() * MAX_CRITERIA + criterion.get()
}

/// Inverse of [`rating_key`]
pub fn split_rating_key(key: usize) -> Option<(Column, CriterionIndex)> {
    if key == 0 {
        return None;
    }
    let column = Column::new((key - 1) / MAX_CRITERIA + 1)?;
    let criterion = CriterionIndex::new((key - 1) % MAX_CRITERIA + 1)?;
    Some((column, criterion))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_flat_key_round_trip() {
        let mut seen = HashSet::new();
        for idea in IdeaIndex::all() {
            for n in 1..=SLOTS_PER_IDEA {
                let key = flat_key(idea, n).unwrap();
                assert!(seen.insert(key), "flat key {} produced twice", key);
                assert_eq!(split_flat_key(key), Some((idea, n)));
            }
        }
        assert_eq!(seen.len(), MAX_FLAT_KEY);
        assert_eq!(seen.iter().max(), Some(&15));
    }

    #[test]
    fn test_flat_key_rejects_out_of_range() {
        let idea = IdeaIndex::new(2).unwrap();
        assert_eq!(flat_key(idea, 0), None);
        assert_eq!(flat_key(idea, 4), None);
        assert_eq!(split_flat_key(0), None);
        assert_eq!(split_flat_key(16), None);
    }

    #[test]
    fn test_typed_keys_match_flat_key() {
        let idea = IdeaIndex::new(4).unwrap();
        let slot = Slot::new(2).unwrap();
        let column = Column::new(3).unwrap();
        assert_eq!(possibility_key(idea, slot), 11);
        assert_eq!(selection_key(idea, column), 12);
        assert_eq!(flat_key(idea, 2), Some(11));
    }

    #[test]
    fn test_rating_key_round_trip() {
        for column in Column::all() {
            for criterion in CriterionIndex::all() {
                let key = rating_key(column, criterion);
                assert!((1..=15).contains(&key));
                assert_eq!(split_rating_key(key), Some((column, criterion)));
            }
        }
        assert_eq!(split_rating_key(16), None);
    }

    #[test]
    fn test_bounded_index_limits() {
        assert!(IdeaIndex::new(0).is_none());
        assert!(IdeaIndex::new(6).is_none());
        assert_eq!(TaskIndex::all().count(), 30);
        assert_eq!(Column::new(3).map(Column::offset), Some(2));
    }
}
