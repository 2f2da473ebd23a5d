//! Prevention matrix risk calculation
//!
//! risk = severity * occurrence
//!
//! Global invariants enforced:
//! - Severity and occurrence must lie in [1, 10] for a risk to exist
//! - Risk is undefined (not zero) until computed
//! - Editing severity or occurrence invalidates a computed risk

use crate::error::{RangeError, RangeField};
use crate::evaluation::{round2, Evaluation};
use crate::index::RiskIndex;
use crate::record::{ProjectRecord, RiskEntry};

pub const RISK_INPUT_MIN: f64 = 1.0;
pub const RISK_INPUT_MAX: f64 = 10.0;

/// Compute a risk value rounded to 2 decimals
pub fn compute_risk(severity: f64, occurrence: f64) -> Result<f64, RangeError> {
    let severity = RangeError::check(
        RangeField::Severity,
        Some(severity),
        RISK_INPUT_MIN,
        RISK_INPUT_MAX,
    )?;
    let occurrence = RangeError::check(
        RangeField::Occurrence,
        Some(occurrence),
        RISK_INPUT_MIN,
        RISK_INPUT_MAX,
    )?;
    Ok(round2(severity * occurrence))
}

impl RiskEntry {
    pub fn severity(&self) -> Option<f64> {
        self.severity
    }

    pub fn set_severity(&mut self, severity: Option<f64>) {
        if self.severity != severity {
            self.severity = severity;
            self.risk.invalidate();
        }
    }

    pub fn occurrence(&self) -> Option<f64> {
        self.occurrence
    }

    pub fn set_occurrence(&mut self, occurrence: Option<f64>) {
        if self.occurrence != occurrence {
            self.occurrence = occurrence;
            self.risk.invalidate();
        }
    }

    pub fn risk(&self) -> Evaluation {
        self.risk
    }

    /// Compute and store the risk; a missing input is reported as out of range
    pub fn compute(&mut self) -> Result<f64, RangeError> {
        let severity = RangeError::check(
            RangeField::Severity,
            self.severity,
            RISK_INPUT_MIN,
            RISK_INPUT_MAX,
        )?;
        let occurrence = RangeError::check(
            RangeField::Occurrence,
            self.occurrence,
            RISK_INPUT_MIN,
            RISK_INPUT_MAX,
        )?;
        let value = compute_risk(severity, occurrence)?;
        self.risk = Evaluation::Computed(value);
        Ok(value)
    }

    /// True when no field of the entry holds data
    pub fn is_empty(&self) -> bool {
        self.failure.is_none()
            && self.effect.is_none()
            && self.severity.is_none()
            && self.occurrence.is_none()
            && self.action_planned.is_none()
            && self.responsible.is_none()
            && self.recorded_date.is_none()
            && self.action_taken.is_none()
            && self.completion_date.is_none()
    }
}

impl ProjectRecord {
    /// Compute the risk of one prevention entry
    pub fn compute_risk(&mut self, index: RiskIndex) -> Result<f64, RangeError> {
        let value = self.risk_entry_mut(index).compute()?;
        tracing::debug!(entry = index.get(), risk = value, "risk computed");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(severity: f64, occurrence: f64) -> RiskEntry {
        let mut entry = RiskEntry::default();
        entry.set_severity(Some(severity));
        entry.set_occurrence(Some(occurrence));
        entry
    }

    #[test]
    fn test_compute_risk() {
        assert_eq!(compute_risk(8.0, 9.0), Ok(72.0));
        assert_eq!(compute_risk(1.0, 1.0), Ok(1.0));
        assert_eq!(compute_risk(2.5, 3.3), Ok(8.25));
    }

    #[test]
    fn test_compute_risk_rejects_out_of_range() {
        let err = compute_risk(0.0, 5.0).unwrap_err();
        assert_eq!(err.field, RangeField::Severity);
        let err = compute_risk(11.0, 5.0).unwrap_err();
        assert_eq!(err.field, RangeField::Severity);
        let err = compute_risk(5.0, f64::INFINITY).unwrap_err();
        assert_eq!(err.field, RangeField::Occurrence);
    }

    #[test]
    fn test_risk_undefined_until_computed() {
        let mut entry = entry(8.0, 9.0);
        assert_eq!(entry.risk(), Evaluation::Pending);
        assert_eq!(entry.compute(), Ok(72.0));
        assert_eq!(entry.risk(), Evaluation::Computed(72.0));
    }

    #[test]
    fn test_missing_input_fails_without_storing() {
        let mut entry = RiskEntry::default();
        entry.set_severity(Some(4.0));
        let err = entry.compute().unwrap_err();
        assert_eq!(err.field, RangeField::Occurrence);
        assert_eq!(err.value, None);
        assert_eq!(entry.risk(), Evaluation::Pending);
    }

    #[test]
    fn test_editing_severity_invalidates_risk() {
        let mut entry = entry(8.0, 9.0);
        entry.compute().unwrap();

        entry.set_severity(Some(8.0));
        assert!(entry.risk().is_computed());

        entry.set_severity(Some(3.0));
        assert_eq!(entry.risk(), Evaluation::Stale(72.0));
        assert_eq!(entry.compute(), Ok(27.0));
    }

    #[test]
    fn test_record_compute_risk() {
        let mut record = ProjectRecord::new();
        let index = RiskIndex::new(2).unwrap();
        record.risk_entry_mut(index).set_severity(Some(6.0));
        record.risk_entry_mut(index).set_occurrence(Some(2.0));
        assert_eq!(record.compute_risk(index), Ok(12.0));
        assert_eq!(record.risk_entry(index).risk().value(), Some(12.0));
        assert!(!record.risk_entry(index).is_empty());
    }
}
