//! Weighted scoring of ideas and formed concepts
//!
//! score = sum over criteria of rating * weight
//!
//! Global invariants enforced:
//! - Ratings must lie in [0, 10]; an out-of-range rating aborts the whole score
//! - Missing ratings and missing weights count as 0
//! - A failed score leaves the record untouched

use crate::error::{RangeError, RangeField};
use crate::evaluation::Evaluation;
use crate::index::{Column, CriterionIndex, IdeaIndex, MAX_CRITERIA};
use crate::record::ProjectRecord;

pub const RATING_MIN: f64 = 0.0;
pub const RATING_MAX: f64 = 10.0;

/// Ratings of one scorable entity, by criterion
pub type Ratings = [Option<f64>; MAX_CRITERIA];

/// Check a single rating against [0, 10]
pub fn check_rating(rating: f64) -> Result<f64, RangeError> {
    RangeError::check(RangeField::Rating, Some(rating), RATING_MIN, RATING_MAX)
}

/// Compute the weighted score at full precision.
///
/// Fails on the first rating outside [0, 10] without computing a total.
pub fn score(ratings: &Ratings, weights: &Ratings) -> Result<f64, RangeError> {
    for rating in ratings.iter().flatten() {
        check_rating(*rating)?;
    }
    Ok(ratings
        .iter()
        .zip(weights.iter())
        .map(|(rating, weight)| rating.unwrap_or(0.0) * weight.unwrap_or(0.0))
        .sum())
}

/// First criterion whose entered rating is out of range
pub fn first_out_of_range(ratings: &Ratings) -> Option<(CriterionIndex, RangeError)> {
    CriterionIndex::all().find_map(|criterion| {
        let rating = ratings[criterion.offset()]?;
        check_rating(rating).err().map(|e| (criterion, e))
    })
}

/// Fill blanks with 0, score, and record the result
fn score_into(
    ratings: &mut Ratings,
    weights: &Ratings,
    result: &mut Evaluation,
) -> Result<f64, RangeError> {
    let total = score(ratings, weights)?;
    for rating in ratings.iter_mut().filter(|r| r.is_none()) {
        *rating = Some(0.0);
    }
    *result = Evaluation::Computed(total);
    Ok(total)
}

impl ProjectRecord {
    pub fn idea_rating(&self, idea: IdeaIndex, criterion: CriterionIndex) -> Option<f64> {
        self.idea_ratings[idea.offset()][criterion.offset()]
    }

    pub fn idea_ratings(&self, idea: IdeaIndex) -> &Ratings {
        &self.idea_ratings[idea.offset()]
    }

    /// Set or clear a rating; a computed idea score becomes stale
    pub fn set_idea_rating(
        &mut self,
        idea: IdeaIndex,
        criterion: CriterionIndex,
        rating: Option<f64>,
    ) {
        let slot = &mut self.idea_ratings[idea.offset()][criterion.offset()];
        if *slot != rating {
            *slot = rating;
            self.idea_results[idea.offset()].invalidate();
        }
    }

    pub fn idea_result(&self, idea: IdeaIndex) -> Evaluation {
        self.idea_results[idea.offset()]
    }

    /// Score one idea against the current weights
    pub fn score_idea(&mut self, idea: IdeaIndex) -> Result<f64, RangeError> {
        let weights = self.weights();
        let offset = idea.offset();
        let total = score_into(
            &mut self.idea_ratings[offset],
            &weights,
            &mut self.idea_results[offset],
        )?;
        tracing::debug!(idea = idea.get(), score = total, "idea scored");
        Ok(total)
    }

    pub fn formed_rating(&self, column: Column, criterion: CriterionIndex) -> Option<f64> {
        self.formed_ratings[column.offset()][criterion.offset()]
    }

    pub fn formed_ratings(&self, column: Column) -> &Ratings {
        &self.formed_ratings[column.offset()]
    }

    /// Set or clear a formed-concept rating; a computed score becomes stale
    pub fn set_formed_rating(
        &mut self,
        column: Column,
        criterion: CriterionIndex,
        rating: Option<f64>,
    ) {
        let slot = &mut self.formed_ratings[column.offset()][criterion.offset()];
        if *slot != rating {
            *slot = rating;
            self.formed_results[column.offset()].invalidate();
        }
    }

    pub fn formed_result(&self, column: Column) -> Evaluation {
        self.formed_results[column.offset()]
    }

    /// Score one formed concept against the current weights
    pub fn score_formed(&mut self, column: Column) -> Result<f64, RangeError> {
        let weights = self.weights();
        let offset = column.offset();
        let total = score_into(
            &mut self.formed_ratings[offset],
            &weights,
            &mut self.formed_results[offset],
        )?;
        tracing::debug!(column = column.get(), score = total, "formed concept scored");
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::round2;
    use crate::record::Criterion;

    fn even_weights() -> Ratings {
        [Some(2.0); MAX_CRITERIA]
    }

    fn record_with_even_weights() -> ProjectRecord {
        let mut record = ProjectRecord::new();
        for criterion in CriterionIndex::all() {
            record.set_criterion(
                criterion,
                Criterion::new(&format!("C{}", criterion), Some(2.0)),
            );
        }
        record
    }

    fn crit(n: usize) -> CriterionIndex {
        CriterionIndex::new(n).unwrap()
    }

    #[test]
    fn test_score_weighted_sum() {
        let ratings = [Some(8.0), Some(5.0), Some(0.0), Some(10.0), Some(6.0)];
        let total = score(&ratings, &even_weights()).unwrap();
        assert_eq!(round2(total), 58.00);
    }

    #[test]
    fn test_missing_rating_counts_as_zero() {
        let ratings = [Some(8.0), None, None, Some(10.0), None];
        assert_eq!(score(&ratings, &even_weights()).unwrap(), 36.0);
    }

    #[test]
    fn test_out_of_range_rating_fails() {
        for bad in [11.0, -1.0, f64::NAN] {
            let ratings = [Some(8.0), Some(bad), None, None, None];
            let err = score(&ratings, &even_weights()).unwrap_err();
            assert_eq!(err.field, RangeField::Rating);
        }
    }

    #[test]
    fn test_score_idea_defaults_blanks_and_marks_computed() {
        let mut record = record_with_even_weights();
        let idea = IdeaIndex::new(1).unwrap();
        record.set_idea(idea, "Standard work");
        record.set_idea_rating(idea, crit(1), Some(8.0));
        record.set_idea_rating(idea, crit(4), Some(10.0));

        let total = record.score_idea(idea).unwrap();
        assert_eq!(total, 36.0);
        assert_eq!(record.idea_result(idea), Evaluation::Computed(36.0));
        assert_eq!(record.idea_rating(idea, crit(2)), Some(0.0));
    }

    #[test]
    fn test_failed_score_stores_nothing() {
        let mut record = record_with_even_weights();
        let idea = IdeaIndex::new(2).unwrap();
        record.set_idea_rating(idea, crit(1), Some(11.0));
        let before = record.clone();

        assert!(record.score_idea(idea).is_err());
        assert_eq!(record, before);
        assert_eq!(record.idea_result(idea), Evaluation::Pending);
    }

    #[test]
    fn test_editing_rating_makes_score_stale() {
        let mut record = record_with_even_weights();
        let column = Column::new(2).unwrap();
        record.set_formed_rating(column, crit(1), Some(5.0));
        record.score_formed(column).unwrap();
        assert!(record.formed_result(column).is_computed());

        // Writing the same value is not an edit
        record.set_formed_rating(column, crit(1), Some(5.0));
        assert!(record.formed_result(column).is_computed());

        record.set_formed_rating(column, crit(1), Some(6.0));
        assert_eq!(record.formed_result(column), Evaluation::Stale(10.0));

        record.score_formed(column).unwrap();
        assert_eq!(record.formed_result(column), Evaluation::Computed(12.0));
    }

    #[test]
    fn test_first_out_of_range() {
        let ratings = [Some(1.0), None, Some(12.0), Some(-3.0), None];
        let (criterion, err) = first_out_of_range(&ratings).unwrap();
        assert_eq!(criterion.get(), 3);
        assert_eq!(err.value, Some(12.0));
        assert!(first_out_of_range(&[None; MAX_CRITERIA]).is_none());
    }
}
