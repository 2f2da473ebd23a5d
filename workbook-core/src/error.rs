//! Error taxonomy for the workbook core
//!
//! - `ValidationError`: a step cannot advance (missing field, failed sum, pending score)
//! - `RangeError`: a computation was refused because an input is out of range
//! - `StorageError`: the persistence backend is missing or holds an unusable document
//!
//! None of these are fatal. Validation and range errors are user-correctable;
//! storage errors leave the in-memory record editable.

use std::path::PathBuf;

use crate::index::{Column, IdeaIndex};

/// Which numeric input a [`RangeError`] refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeField {
    Rating,
    Severity,
    Occurrence,
}

impl RangeField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeField::Rating => "rating",
            RangeField::Severity => "severity",
            RangeField::Occurrence => "occurrence",
        }
    }
}

/// A computation input outside its accepted interval.
///
/// `value` is `None` when the input was missing where a number is required.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{} must be between {min} and {max} (got {})", .field.as_str(), display_value(.value))]
pub struct RangeError {
    pub field: RangeField,
    pub value: Option<f64>,
    pub min: f64,
    pub max: f64,
}

fn display_value(value: &Option<f64>) -> String {
    match value {
        Some(v) => format!("{}", v),
        None => "nothing".to_string(),
    }
}

impl RangeError {
    /// Check `value` against `[min, max]`, rejecting non-finite numbers
    pub fn check(field: RangeField, value: Option<f64>, min: f64, max: f64) -> Result<f64, Self> {
        match value {
            Some(v) if v.is_finite() && v >= min && v <= max => Ok(v),
            _ => Err(RangeError {
                field,
                value,
                min,
                max,
            }),
        }
    }
}

/// Reasons a wizard step may not advance
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("weights must sum to {expected} (actual: {actual:.1})")]
    WeightSum { expected: f64, actual: f64 },

    #[error("enter at least one idea")]
    NoIdeas,

    #[error("enter a name for the project")]
    MissingProjectName,

    #[error("enter a description for the project")]
    MissingProjectDescription,

    #[error("complete all {count} criteria")]
    MissingCriteria { count: usize },

    #[error("enter a weight for each of the {count} criteria")]
    MissingWeights { count: usize },

    #[error("rating for criterion {criterion} of {owner} is out of range: {source}")]
    RatingOutOfRange {
        owner: String,
        criterion: usize,
        source: RangeError,
    },

    #[error("score every idea before continuing (pending: {})", join_ideas(.pending))]
    IdeasNotScored { pending: Vec<IdeaIndex> },

    #[error("score every formed concept before continuing (pending: {})", join_columns(.pending))]
    FormedConceptsNotScored { pending: Vec<Column> },
}

fn join_ideas(pending: &[IdeaIndex]) -> String {
    pending
        .iter()
        .map(|i| i.get().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_columns(pending: &[Column]) -> String {
    pending
        .iter()
        .map(|c| c.get().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Persistence failures
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend cannot be read or written
    #[error("storage unavailable at {}: {source}", .path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stored document is not a JSON object
    #[error("stored document at {} is unreadable: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },
}

/// Why a wizard step did not advance
#[derive(Debug, thiserror::Error)]
pub enum AdvanceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
