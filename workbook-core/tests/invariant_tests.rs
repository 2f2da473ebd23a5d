//! Invariant Tests
//!
//! These tests validate the properties the workbook must always hold,
//! exercised through the public API only.

use workbook_core::index::{flat_key, split_flat_key, MAX_FLAT_KEY};
use workbook_core::risk::compute_risk;
use workbook_core::scoring::score;
use workbook_core::selection::pick_best;
use workbook_core::store::{migrate, PROJECT_FILE};
use workbook_core::{
    render_text, Column, Criterion, CriterionIndex, Evaluation, IdeaIndex, ProjectRecord,
    ProjectStore, ProjectSummary, RiskIndex, Slot, Step, TaskIndex, TaskRow, ValidationError,
    Wizard,
};
use std::collections::HashSet;
use tempfile::TempDir;

fn crit(n: usize) -> CriterionIndex {
    CriterionIndex::new(n).unwrap()
}

fn with_weights(weights: [f64; 5]) -> ProjectRecord {
    let mut record = ProjectRecord::new();
    record.set_project_name("Press line scrap");
    record.set_project_description("Halve scrap on press 2 by Q3");
    for (c, w) in CriterionIndex::all().zip(weights) {
        record.set_criterion(c, Criterion::new(&format!("Criterion {}", c), Some(w)));
    }
    record.set_idea(IdeaIndex::new(1).unwrap(), "Die maintenance");
    record
}

/// A record touching every section, as a user finishing the wizard would leave it
fn full_record() -> ProjectRecord {
    let mut record = with_weights([2.0; 5]);
    let first = IdeaIndex::new(1).unwrap();
    let third = IdeaIndex::new(3).unwrap();
    record.set_idea(third, "Operator training");

    for (c, r) in CriterionIndex::all().zip([8.0, 5.0, 0.0, 10.0, 6.0]) {
        record.set_idea_rating(first, c, Some(r));
    }
    record.set_idea_rating(third, crit(2), Some(4.5));
    record.score_idea(first).unwrap();
    record.score_idea(third).unwrap();

    for idea in [first, third] {
        for slot in Slot::all() {
            record.set_possibility(idea, slot, &format!("Option {} for idea {}", slot, idea));
        }
    }
    for column in Column::all() {
        record.select_slot(first, column, Slot::new(column.get()).unwrap());
        record.set_formed_rating(column, crit(1), Some(column.get() as f64 * 2.5));
        record.score_formed(column).unwrap();
    }
    record.select_slot(third, Column::new(2).unwrap(), Slot::new(1).unwrap());

    let risk = record.risk_entry_mut(RiskIndex::new(1).unwrap());
    risk.failure = Some("Die crack".to_string());
    risk.set_severity(Some(8.0));
    risk.set_occurrence(Some(9.0));
    risk.recorded_date = Some("2026-03-02".to_string());
    record.compute_risk(RiskIndex::new(1).unwrap()).unwrap();

    record.set_task(TaskIndex::new(1).unwrap(), TaskRow::new("Ana", "Inspect dies", "Log"));
    record.set_task(TaskIndex::new(30).unwrap(), TaskRow::new("Luis", "Review", "Memo"));
    record
}

#[test]
fn test_flat_keys_are_injective_and_invertible() {
    let mut seen = HashSet::new();
    for idea in IdeaIndex::all() {
        for n in 1..=3 {
            let key = flat_key(idea, n).unwrap();
            assert!(seen.insert(key));
            assert_eq!(split_flat_key(key), Some((idea, n)));
        }
    }
    assert_eq!(seen.len(), MAX_FLAT_KEY);
}

#[test]
fn test_weight_gate() {
    let passing = with_weights([2.0; 5]);
    assert_eq!(Step::Criteria.check(&passing), Ok(()));

    let blocked = with_weights([3.0; 5]);
    let err = Step::Criteria.check(&blocked).unwrap_err();
    assert!(matches!(err, ValidationError::WeightSum { .. }));
    assert!(err.to_string().contains("actual: 15.0"));
}

#[test]
fn test_scoring_properties() {
    let weights = [Some(2.0); 5];
    let ratings = [Some(8.0), Some(5.0), Some(0.0), Some(10.0), Some(6.0)];
    assert_eq!(format!("{:.2}", score(&ratings, &weights).unwrap()), "58.00");

    for bad in [11.0, -1.0] {
        let mut record = with_weights([2.0; 5]);
        let idea = IdeaIndex::new(1).unwrap();
        record.set_idea_rating(idea, crit(3), Some(bad));
        assert!(record.score_idea(idea).is_err());
        assert_eq!(record.idea_result(idea), Evaluation::Pending);
    }
}

#[test]
fn test_best_selection_properties() {
    assert_eq!(pick_best([0.0, 0.0, 0.0]), None);
    assert_eq!(pick_best([7.5, 7.5, 3.0]), Column::new(1));
}

#[test]
fn test_risk_properties() {
    assert_eq!(compute_risk(8.0, 9.0), Ok(72.0));
    assert!(compute_risk(0.0, 5.0).is_err());
    assert!(compute_risk(11.0, 5.0).is_err());

    let mut record = full_record();
    let entry = record.risk_entry_mut(RiskIndex::new(1).unwrap());
    entry.set_severity(Some(2.0));
    assert_eq!(entry.risk(), Evaluation::Stale(72.0));
}

#[test]
fn test_edit_after_scoring_marks_stale() {
    let mut record = full_record();
    let first = IdeaIndex::new(1).unwrap();
    let before = record.idea_result(first).value().unwrap();
    record.set_idea_rating(first, crit(1), Some(1.0));
    assert_eq!(record.idea_result(first), Evaluation::Stale(before));
}

#[test]
fn test_migrate_is_idempotent() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join(PROJECT_FILE),
        r#"{"criterio1":"Cost","criterio2":"Time","criterio3":"Risk","criterio4":"Safety","peso1":"3","peso2":"3","peso3":"2","peso4":"2"}"#,
    )
    .unwrap();

    let mut store = ProjectStore::open(temp.path());
    let mut once = store.load();
    let mut twice = once.clone();
    assert!(!migrate(&mut twice));
    assert_eq!(once, twice);

    let fifth = once.criterion(crit(5)).unwrap();
    assert!(fifth.is_blank());

    // Saving and reloading does not add another criterion or change the record
    store.save(&once).unwrap();
    let reloaded = store.load();
    assert_eq!(reloaded, once);
    assert!(!migrate(&mut once));
}

#[test]
fn test_save_load_save_is_byte_identical() {
    let temp = TempDir::new().unwrap();
    let mut store = ProjectStore::open(temp.path());
    store.save(&full_record()).unwrap();
    let first = std::fs::read(temp.path().join(PROJECT_FILE)).unwrap();

    let loaded = store.load();
    store.save(&loaded).unwrap();
    let second = std::fs::read(temp.path().join(PROJECT_FILE)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_unknown_keys_survive_a_wizard_pass() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join(PROJECT_FILE),
        r#"{"projectName":"Legacy","resultado1":"40.00","uiState":{"tab":3}}"#,
    )
    .unwrap();

    let mut wizard = Wizard::new(ProjectStore::open(temp.path()));
    let mut record = wizard.enter(Step::Prevention);
    record.risk_entry_mut(RiskIndex::new(2).unwrap()).effect = Some("Downtime".to_string());
    wizard.advance(Step::Prevention, &record).unwrap();

    let stored: serde_json::Value =
        serde_json::from_slice(&std::fs::read(temp.path().join(PROJECT_FILE)).unwrap()).unwrap();
    assert_eq!(stored["resultado1"], "40.00");
    assert_eq!(stored["uiState"]["tab"], 3);
    assert_eq!(stored["efecto2"], "Downtime");
}

#[test]
fn test_report_is_deterministic() {
    let record = full_record();
    let first = render_text(&ProjectSummary::from_record(&record));
    let second = render_text(&ProjectSummary::from_record(&record));
    assert_eq!(first, second);
    assert!(first.contains("Concept Formed 3 - score obtained: 15.00"));
}
