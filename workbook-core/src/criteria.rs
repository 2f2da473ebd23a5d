//! Criteria step: weight sum and the gate that guards leaving it
//!
//! Global invariants enforced:
//! - Weights must sum to exactly 10 before the first step can advance
//! - Project name, description, every criterion and at least one idea are present

use crate::error::ValidationError;
use crate::index::{CriterionIndex, MAX_CRITERIA};
use crate::record::ProjectRecord;

/// Required total of all criterion weights
pub const WEIGHT_TOTAL: f64 = 10.0;

/// Absorbs binary rounding in decimal weights such as 3.3 + 3.3 + 3.4
const WEIGHT_EPSILON: f64 = 1e-9;

impl ProjectRecord {
    /// Sum of entered weights; blank weights count as 0
    pub fn weight_sum(&self) -> f64 {
        self.weights().iter().flatten().sum()
    }

    fn weights_complete(&self) -> bool {
        self.weights()
            .iter()
            .all(|w| matches!(w, Some(v) if v.is_finite() && *v > 0.0))
    }

    fn criteria_complete(&self) -> bool {
        CriterionIndex::all().all(|i| matches!(self.criterion(i), Some(c) if !c.is_blank()))
    }
}

/// Whether the weights add up to [`WEIGHT_TOTAL`]
pub fn weights_balanced(sum: f64) -> bool {
    (sum - WEIGHT_TOTAL).abs() < WEIGHT_EPSILON
}

/// Gate for leaving the criteria step.
///
/// Reports one problem at a time. A wrong weight sum is reported first, but
/// only once at least one weight has been entered.
pub fn check_criteria_step(record: &ProjectRecord) -> Result<(), ValidationError> {
    let sum = record.weight_sum();
    let any_weight = record.weights().iter().flatten().any(|&w| w > 0.0);

    if any_weight && !weights_balanced(sum) {
        return Err(ValidationError::WeightSum {
            expected: WEIGHT_TOTAL,
            actual: sum,
        });
    }
    if record.existing_ideas().is_empty() {
        return Err(ValidationError::NoIdeas);
    }
    if record.project_name().is_none() {
        return Err(ValidationError::MissingProjectName);
    }
    if record.project_description().is_none() {
        return Err(ValidationError::MissingProjectDescription);
    }
    if !record.criteria_complete() {
        return Err(ValidationError::MissingCriteria {
            count: MAX_CRITERIA,
        });
    }
    if !record.weights_complete() {
        return Err(ValidationError::MissingWeights {
            count: MAX_CRITERIA,
        });
    }
    Ok(())
}
