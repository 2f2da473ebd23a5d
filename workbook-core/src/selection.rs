//! Best formed concept: the column with the highest score

use crate::index::{Column, FORMED_CONCEPTS};
use crate::matrix::FormedConcept;
use crate::record::ProjectRecord;
use serde::Serialize;

/// Column of the maximum score.
///
/// All three exactly 0 means nothing was scored, so there is no winner.
/// Ties go to the lowest column.
pub fn pick_best(results: [f64; FORMED_CONCEPTS]) -> Option<Column> {
    if results.iter().all(|&r| r == 0.0) {
        return None;
    }
    let mut best = 0;
    for (i, &value) in results.iter().enumerate().skip(1) {
        if value > results[best] {
            best = i;
        }
    }
    Column::new(best + 1)
}

/// The winning formed concept with its score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestConcept {
    pub score: f64,
    pub concept: FormedConcept,
}

impl ProjectRecord {
    /// Formed scores for selection; anything not computed counts as 0
    pub fn formed_scores(&self) -> [f64; FORMED_CONCEPTS] {
        std::array::from_fn(|i| self.formed_results[i].value().unwrap_or(0.0))
    }

    pub fn best_concept(&self) -> Option<BestConcept> {
        let scores = self.formed_scores();
        let column = pick_best(scores)?;
        Some(BestConcept {
            score: scores[column.offset()],
            concept: self.formed_concept(column),
        })
    }
}
