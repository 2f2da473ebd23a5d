//! The project record: the single aggregate every wizard step reads and writes
//!
//! Global invariants enforced:
//! - Fixed-size tables, addressed only through bounded indices
//! - Blank text is `None`; trimming happens once, in the setters
//! - Any edit to a scoring input invalidates the derived result

use crate::evaluation::Evaluation;
use crate::index::{
    CriterionIndex, IdeaIndex, RiskIndex, TaskIndex, FORMED_CONCEPTS, MAX_CRITERIA,
    MAX_IDEAS, MAX_RISKS, MAX_TASKS, SLOTS_PER_IDEA,
};
use serde_json::{Map, Value};

/// Number of criteria a current record carries
pub const CRITERIA_COUNT: u32 = MAX_CRITERIA as u32;

/// A named, weighted evaluation dimension
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Criterion {
    pub label: String,
    pub weight: Option<f64>,
}

impl Criterion {
    pub fn new(label: &str, weight: Option<f64>) -> Self {
        Criterion {
            label: label.trim().to_string(),
            weight,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.label.trim().is_empty()
    }
}

/// One row of the prevention matrix
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RiskEntry {
    pub failure: Option<String>,
    pub effect: Option<String>,
    pub(crate) severity: Option<f64>,
    pub(crate) occurrence: Option<f64>,
    pub(crate) risk: Evaluation,
    pub action_planned: Option<String>,
    pub responsible: Option<String>,
    pub recorded_date: Option<String>,
    pub action_taken: Option<String>,
    pub completion_date: Option<String>,
}

/// One row of the task plan
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskRow {
    pub person: Option<String>,
    pub description: Option<String>,
    pub output: Option<String>,
}

impl TaskRow {
    pub fn new(person: &str, description: &str, output: &str) -> Self {
        TaskRow {
            person: normalize_text(person),
            description: normalize_text(description),
            output: normalize_text(output),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.person.is_none() && self.description.is_none() && self.output.is_none()
    }
}

/// The whole workbook state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectRecord {
    pub(crate) project_name: Option<String>,
    pub(crate) project_description: Option<String>,
    pub(crate) num_criteria: Option<u32>,
    /// `None` only for a slot absent from storage (pre-migration legacy record)
    pub(crate) criteria: [Option<Criterion>; MAX_CRITERIA],
    pub(crate) ideas: [Option<String>; MAX_IDEAS],
    pub(crate) idea_ratings: [[Option<f64>; MAX_CRITERIA]; MAX_IDEAS],
    pub(crate) idea_results: [Evaluation; MAX_IDEAS],
    pub(crate) possibilities: [[Option<String>; SLOTS_PER_IDEA]; MAX_IDEAS],
    pub(crate) selections: [[Option<String>; FORMED_CONCEPTS]; MAX_IDEAS],
    pub(crate) formed_ratings: [[Option<f64>; MAX_CRITERIA]; FORMED_CONCEPTS],
    pub(crate) formed_results: [Evaluation; FORMED_CONCEPTS],
    pub(crate) risks: [RiskEntry; MAX_RISKS],
    pub(crate) tasks: [TaskRow; MAX_TASKS],
    /// Keys this crate does not interpret, carried through on save
    pub(crate) extra: Map<String, Value>,
}

/// Trim and turn blank text into `None`
pub fn normalize_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl ProjectRecord {
    /// An empty record with every criterion slot present
    pub fn new() -> Self {
        ProjectRecord {
            num_criteria: Some(CRITERIA_COUNT),
            criteria: std::array::from_fn(|_| Some(Criterion::default())),
            ..Default::default()
        }
    }

    pub fn project_name(&self) -> Option<&str> {
        self.project_name.as_deref()
    }

    pub fn set_project_name(&mut self, name: &str) {
        self.project_name = normalize_text(name);
    }

    pub fn project_description(&self) -> Option<&str> {
        self.project_description.as_deref()
    }

    pub fn set_project_description(&mut self, description: &str) {
        self.project_description = normalize_text(description);
    }

    pub fn num_criteria(&self) -> Option<u32> {
        self.num_criteria
    }

    pub fn criterion(&self, index: CriterionIndex) -> Option<&Criterion> {
        self.criteria[index.offset()].as_ref()
    }

    /// Replace a criterion. A weight change invalidates every computed score.
    pub fn set_criterion(&mut self, index: CriterionIndex, criterion: Criterion) {
        let previous_weight = self.criteria[index.offset()]
            .as_ref()
            .and_then(|c| c.weight);
        if previous_weight != criterion.weight {
            self.invalidate_scores();
        }
        self.criteria[index.offset()] = Some(criterion);
        self.num_criteria = Some(CRITERIA_COUNT);
    }

    /// Display label for a criterion, falling back to "Criterion N"
    pub fn criterion_label(&self, index: CriterionIndex) -> String {
        match self.criterion(index) {
            Some(c) if !c.is_blank() => c.label.clone(),
            _ => format!("Criterion {}", index),
        }
    }

    /// Weights by criterion; an absent slot or blank weight is `None`
    pub fn weights(&self) -> [Option<f64>; MAX_CRITERIA] {
        std::array::from_fn(|i| self.criteria[i].as_ref().and_then(|c| c.weight))
    }

    pub fn idea(&self, index: IdeaIndex) -> Option<&str> {
        self.ideas[index.offset()].as_deref()
    }

    pub fn set_idea(&mut self, index: IdeaIndex, text: &str) {
        self.ideas[index.offset()] = normalize_text(text);
    }

    /// Indices of non-blank ideas, in order
    pub fn existing_ideas(&self) -> Vec<IdeaIndex> {
        IdeaIndex::all()
            .filter(|&i| self.idea(i).is_some())
            .collect()
    }

    pub fn risk_entry(&self, index: RiskIndex) -> &RiskEntry {
        &self.risks[index.offset()]
    }

    pub fn risk_entry_mut(&mut self, index: RiskIndex) -> &mut RiskEntry {
        &mut self.risks[index.offset()]
    }

    pub fn task(&self, index: TaskIndex) -> &TaskRow {
        &self.tasks[index.offset()]
    }

    pub fn set_task(&mut self, index: TaskIndex, row: TaskRow) {
        self.tasks[index.offset()] = row;
    }

    /// Keys carried through from storage without interpretation
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    pub(crate) fn invalidate_scores(&mut self) {
        for result in self.idea_results.iter_mut() {
            result.invalidate();
        }
        for result in self.formed_results.iter_mut() {
            result.invalidate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crit(n: usize) -> CriterionIndex {
        CriterionIndex::new(n).unwrap()
    }

    #[test]
    fn test_new_record_has_five_blank_criteria() {
        let record = ProjectRecord::new();
        assert_eq!(record.num_criteria(), Some(5));
        for index in CriterionIndex::all() {
            let criterion = record.criterion(index).expect("slot present");
            assert!(criterion.is_blank());
            assert_eq!(criterion.weight, None);
        }
    }

    #[test]
    fn test_text_setters_trim_and_clear_blank() {
        let mut record = ProjectRecord::new();
        record.set_project_name("  Line 4 changeover  ");
        assert_eq!(record.project_name(), Some("Line 4 changeover"));
        record.set_project_name("   ");
        assert_eq!(record.project_name(), None);
    }

    #[test]
    fn test_existing_ideas_preserve_order_and_skip_blanks() {
        let mut record = ProjectRecord::new();
        record.set_idea(IdeaIndex::new(4).unwrap(), "Kanban board");
        record.set_idea(IdeaIndex::new(2).unwrap(), "Quick die change");
        record.set_idea(IdeaIndex::new(3).unwrap(), "  ");
        let existing: Vec<usize> = record.existing_ideas().into_iter().map(|i| i.get()).collect();
        assert_eq!(existing, vec![2, 4]);
    }

    #[test]
    fn test_weight_change_invalidates_scores() {
        let mut record = ProjectRecord::new();
        record.set_criterion(crit(1), Criterion::new("Cost", Some(2.0)));
        record.idea_results[0] = Evaluation::Computed(40.0);

        // Same weight, new label: scores stay valid
        record.set_criterion(crit(1), Criterion::new("Cost (EUR)", Some(2.0)));
        assert!(record.idea_results[0].is_computed());

        record.set_criterion(crit(1), Criterion::new("Cost (EUR)", Some(3.0)));
        assert_eq!(record.idea_results[0], Evaluation::Stale(40.0));
    }

    #[test]
    fn test_criterion_label_fallback() {
        let mut record = ProjectRecord::new();
        record.set_criterion(crit(2), Criterion::new("Safety", Some(2.0)));
        assert_eq!(record.criterion_label(crit(2)), "Safety");
        assert_eq!(record.criterion_label(crit(3)), "Criterion 3");
    }
}
