//! Wizard navigation: ordered steps, their record sections and their gates
//!
//! Each step loads the record, edits only the sections it writes, and saves
//! the full record when it advances. A step advances only when its gate passes.

use crate::criteria::check_criteria_step;
use crate::error::{AdvanceError, ValidationError};
use crate::index::{Column, IdeaIndex, TaskIndex};
use crate::record::ProjectRecord;
use crate::scoring::first_out_of_range;
use crate::store::{Backend, ProjectStore};
use crate::tasks::TaskPage;

/// A part of the record a step reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Project,
    Criteria,
    Ideas,
    IdeaRatings,
    Possibilities,
    Selections,
    FormedRatings,
    Risks,
    Tasks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    Criteria,
    IdeaEvaluation,
    Morphology,
    ConceptFormation,
    ConceptEvaluation,
    Prevention,
    TaskPlan,
    TaskPlanContinued,
    Results,
}

const STEPS: [Step; 9] = [
    Step::Criteria,
    Step::IdeaEvaluation,
    Step::Morphology,
    Step::ConceptFormation,
    Step::ConceptEvaluation,
    Step::Prevention,
    Step::TaskPlan,
    Step::TaskPlanContinued,
    Step::Results,
];

impl Step {
    pub fn all() -> impl Iterator<Item = Step> {
        STEPS.into_iter()
    }

    fn position(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Step> {
        STEPS.get(self.position() + 1).copied()
    }

    pub fn previous(self) -> Option<Step> {
        self.position().checked_sub(1).map(|i| STEPS[i])
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Criteria => "criteria",
            Step::IdeaEvaluation => "idea-evaluation",
            Step::Morphology => "morphology",
            Step::ConceptFormation => "concept-formation",
            Step::ConceptEvaluation => "concept-evaluation",
            Step::Prevention => "prevention",
            Step::TaskPlan => "task-plan",
            Step::TaskPlanContinued => "task-plan-continued",
            Step::Results => "results",
        }
    }

    pub fn parse(name: &str) -> Option<Step> {
        Step::all().find(|s| s.as_str() == name)
    }

    /// Sections shown on this step
    pub fn reads(&self) -> &'static [Section] {
        use Section::*;
        match self {
            Step::Criteria => &[Project, Criteria, Ideas],
            Step::IdeaEvaluation => &[Project, Criteria, Ideas, IdeaRatings],
            Step::Morphology => &[Project, Ideas, Possibilities],
            Step::ConceptFormation => &[Project, Ideas, Possibilities, Selections],
            Step::ConceptEvaluation => &[Project, Criteria, Ideas, Selections, FormedRatings],
            Step::Prevention => &[Project, Risks],
            Step::TaskPlan | Step::TaskPlanContinued => &[Project, Tasks],
            Step::Results => &[
                Project,
                Criteria,
                Ideas,
                IdeaRatings,
                Possibilities,
                Selections,
                FormedRatings,
                Risks,
                Tasks,
            ],
        }
    }

    /// Sections this step may modify
    pub fn writes(&self) -> &'static [Section] {
        use Section::*;
        match self {
            Step::Criteria => &[Project, Criteria, Ideas],
            Step::IdeaEvaluation => &[IdeaRatings],
            Step::Morphology => &[Possibilities],
            Step::ConceptFormation => &[Selections],
            Step::ConceptEvaluation => &[FormedRatings],
            Step::Prevention => &[Risks],
            Step::TaskPlan | Step::TaskPlanContinued => &[Tasks],
            Step::Results => &[],
        }
    }

    /// Task rows edited on this step, if it is a task plan step
    pub fn task_page(&self) -> Option<TaskPage> {
        match self {
            Step::TaskPlan => Some(TaskPage::First),
            Step::TaskPlanContinued => Some(TaskPage::Second),
            _ => None,
        }
    }

    /// Check whether the record allows leaving this step
    pub fn check(&self, record: &ProjectRecord) -> Result<(), ValidationError> {
        match self {
            Step::Criteria => check_criteria_step(record),
            Step::IdeaEvaluation => check_idea_evaluation(record),
            Step::ConceptEvaluation => check_concept_evaluation(record),
            _ => Ok(()),
        }
    }
}

fn check_idea_evaluation(record: &ProjectRecord) -> Result<(), ValidationError> {
    let ideas = record.existing_ideas();
    for &idea in &ideas {
        if let Some((criterion, source)) = first_out_of_range(record.idea_ratings(idea)) {
            return Err(ValidationError::RatingOutOfRange {
                owner: format!("idea {}", idea),
                criterion: criterion.get(),
                source,
            });
        }
    }
    let pending: Vec<IdeaIndex> = ideas
        .into_iter()
        .filter(|&i| !record.idea_result(i).is_computed())
        .collect();
    if pending.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::IdeasNotScored { pending })
    }
}

fn check_concept_evaluation(record: &ProjectRecord) -> Result<(), ValidationError> {
    for column in Column::all() {
        if let Some((criterion, source)) = first_out_of_range(record.formed_ratings(column)) {
            return Err(ValidationError::RatingOutOfRange {
                owner: format!("formed concept {}", column),
                criterion: criterion.get(),
                source,
            });
        }
    }
    let pending: Vec<Column> = Column::all()
        .filter(|&c| !record.formed_result(c).is_computed())
        .collect();
    if pending.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::FormedConceptsNotScored { pending })
    }
}

/// Copy `sections` of `source` onto `target`; `page` limits the task rows
fn copy_sections(
    target: &mut ProjectRecord,
    source: &ProjectRecord,
    sections: &[Section],
    page: Option<TaskPage>,
) {
    for section in sections {
        match section {
            Section::Project => {
                target.project_name = source.project_name.clone();
                target.project_description = source.project_description.clone();
            }
            Section::Criteria => {
                if target.weights() != source.weights() {
                    target.invalidate_scores();
                }
                target.criteria = source.criteria.clone();
                target.num_criteria = source.num_criteria;
            }
            Section::Ideas => target.ideas = source.ideas.clone(),
            Section::IdeaRatings => {
                target.idea_ratings = source.idea_ratings;
                target.idea_results = source.idea_results;
            }
            Section::Possibilities => target.possibilities = source.possibilities.clone(),
            Section::Selections => target.selections = source.selections.clone(),
            Section::FormedRatings => {
                target.formed_ratings = source.formed_ratings;
                target.formed_results = source.formed_results;
            }
            Section::Risks => target.risks = source.risks.clone(),
            Section::Tasks => {
                let rows: Vec<TaskIndex> = match page {
                    Some(page) => page.indices().collect(),
                    None => TaskIndex::all().collect(),
                };
                for row in rows {
                    target.set_task(row, source.task(row).clone());
                }
            }
        }
    }
}

/// Drives the steps against one record store
pub struct Wizard<B: Backend> {
    store: ProjectStore<B>,
}

impl<B: Backend> Wizard<B> {
    pub fn new(store: ProjectStore<B>) -> Self {
        Wizard { store }
    }

    pub fn store(&self) -> &ProjectStore<B> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ProjectStore<B> {
        &mut self.store
    }

    /// Load the sections a step shows; everything else is left empty
    pub fn enter(&self, step: Step) -> ProjectRecord {
        tracing::debug!(step = step.as_str(), "entering step");
        let stored = self.store.load();
        let mut view = ProjectRecord::new();
        copy_sections(&mut view, &stored, step.reads(), step.task_page());
        view
    }

    /// Apply the step's sections of `record` to the stored record, check the
    /// gate, save the full record and return the next step.
    ///
    /// Edits outside the step's sections are dropped. Nothing is saved when
    /// the gate fails or the stored record cannot be read. `None` means the
    /// wizard is done.
    pub fn advance(
        &mut self,
        step: Step,
        record: &ProjectRecord,
    ) -> Result<Option<Step>, AdvanceError> {
        let mut merged = self.store.try_load()?;
        copy_sections(&mut merged, record, step.writes(), step.task_page());
        step.check(&merged)?;
        self.store.save(&merged)?;
        let next = step.next();
        tracing::info!(
            from = step.as_str(),
            to = next.map(|s| s.as_str()).unwrap_or("done"),
            "step advanced"
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{CriterionIndex, RiskIndex, Slot};
    use crate::record::{Criterion, TaskRow};
    use crate::store::MemoryBackend;

    fn crit(n: usize) -> CriterionIndex {
        CriterionIndex::new(n).unwrap()
    }

    fn criteria_ready() -> ProjectRecord {
        let mut record = ProjectRecord::new();
        record.set_project_name("Flow");
        record.set_project_description("Reduce WIP");
        for c in CriterionIndex::all() {
            record.set_criterion(c, Criterion::new(&format!("C{}", c), Some(2.0)));
        }
        record.set_idea(IdeaIndex::new(2).unwrap(), "Kanban");
        record
    }

    #[test]
    fn test_step_order() {
        assert_eq!(Step::Criteria.next(), Some(Step::IdeaEvaluation));
        assert_eq!(Step::TaskPlanContinued.next(), Some(Step::Results));
        assert_eq!(Step::Results.next(), None);
        assert_eq!(Step::Criteria.previous(), None);
        assert_eq!(Step::all().count(), 9);
        for step in Step::all() {
            assert_eq!(Step::parse(step.as_str()), Some(step));
        }
    }

    #[test]
    fn test_writes_are_subset_of_reads() {
        for step in Step::all() {
            for section in step.writes() {
                assert!(step.reads().contains(section), "{:?} writes {:?}", step, section);
            }
        }
    }

    #[test]
    fn test_blocked_advance_saves_nothing() {
        let mut wizard = Wizard::new(ProjectStore::in_memory());
        let mut record = wizard.enter(Step::Criteria);
        record.set_project_name("Draft");

        let err = wizard.advance(Step::Criteria, &record).unwrap_err();
        assert!(matches!(
            err,
            AdvanceError::Validation(ValidationError::NoIdeas)
        ));
        assert!(wizard.store().backend().contents().is_none());
    }

    #[test]
    fn test_advance_saves_and_returns_next() {
        let mut wizard = Wizard::new(ProjectStore::new(MemoryBackend::new()));
        let record = criteria_ready();
        let next = wizard.advance(Step::Criteria, &record).unwrap();
        assert_eq!(next, Some(Step::IdeaEvaluation));
        assert_eq!(wizard.enter(Step::IdeaEvaluation), record);
    }

    #[test]
    fn test_advance_keeps_only_the_steps_sections() {
        let mut wizard = Wizard::new(ProjectStore::in_memory());
        wizard.advance(Step::Criteria, &criteria_ready()).unwrap();

        let idea = IdeaIndex::new(2).unwrap();
        let slot = Slot::new(1).unwrap();
        let risk = RiskIndex::new(1).unwrap();
        let mut record = wizard.enter(Step::Morphology);
        assert_eq!(record.project_name(), Some("Flow"));
        record.set_possibility(idea, slot, "Cards");
        record.set_project_name("Renamed");
        record.risk_entry_mut(risk).failure = Some("Lost card".to_string());
        wizard.advance(Step::Morphology, &record).unwrap();

        let stored = wizard.store().load();
        assert_eq!(stored.possibility(idea, slot), Some("Cards"));
        assert_eq!(stored.project_name(), Some("Flow"));
        assert!(stored.risk_entry(risk).is_empty());
    }

    #[test]
    fn test_task_steps_save_only_their_page() {
        let task = |n| TaskIndex::new(n).unwrap();
        let mut wizard = Wizard::new(ProjectStore::in_memory());
        let mut record = wizard.enter(Step::TaskPlan);
        record.set_task(task(3), TaskRow::new("Ana", "Audit", "Log"));
        record.set_task(task(20), TaskRow::new("Luis", "Review", "Memo"));
        wizard.advance(Step::TaskPlan, &record).unwrap();

        let stored = wizard.store().load();
        assert!(!stored.task(task(3)).is_empty());
        assert!(stored.task(task(20)).is_empty());

        // The second page does not show the first page's rows
        assert!(wizard.enter(Step::TaskPlanContinued).task(task(3)).is_empty());
        assert!(!wizard.enter(Step::Results).task(task(3)).is_empty());
    }

    #[test]
    fn test_weight_edit_through_criteria_step_invalidates_scores() {
        let mut wizard = Wizard::new(ProjectStore::in_memory());
        let mut record = criteria_ready();
        let idea = IdeaIndex::new(2).unwrap();
        record.set_idea_rating(idea, crit(1), Some(5.0));
        record.score_idea(idea).unwrap();
        wizard.store_mut().save(&record).unwrap();

        let mut view = wizard.enter(Step::Criteria);
        view.set_criterion(crit(1), Criterion::new("C1", Some(4.0)));
        view.set_criterion(crit(2), Criterion::new("C2", Some(0.0)));
        wizard.advance(Step::Criteria, &view).unwrap_err();
        // Blocked by the gate: the stored score is untouched
        assert!(wizard.store().load().idea_result(idea).is_computed());

        view.set_criterion(crit(2), Criterion::new("C2", Some(0.5)));
        view.set_criterion(crit(3), Criterion::new("C3", Some(1.5)));
        wizard.advance(Step::Criteria, &view).unwrap();
        assert_eq!(
            wizard.store().load().idea_result(idea),
            crate::evaluation::Evaluation::Stale(10.0)
        );
    }

    #[test]
    fn test_advance_refuses_unreadable_store() {
        let backend = MemoryBackend::with_contents("{\"projectName\": \"Flow\",}");
        let mut wizard = Wizard::new(ProjectStore::new(backend));
        let err = wizard
            .advance(Step::Morphology, &ProjectRecord::new())
            .unwrap_err();
        assert!(matches!(err, AdvanceError::Storage(_)));
        assert_eq!(
            wizard.store().backend().contents(),
            Some("{\"projectName\": \"Flow\",}")
        );
    }

    #[test]
    fn test_idea_evaluation_requires_scores() {
        let mut record = criteria_ready();
        let idea = IdeaIndex::new(2).unwrap();
        assert_eq!(
            Step::IdeaEvaluation.check(&record),
            Err(ValidationError::IdeasNotScored {
                pending: vec![idea]
            })
        );

        record.set_idea_rating(idea, crit(1), Some(12.0));
        assert!(matches!(
            Step::IdeaEvaluation.check(&record),
            Err(ValidationError::RatingOutOfRange { criterion: 1, .. })
        ));

        record.set_idea_rating(idea, crit(1), Some(7.0));
        record.score_idea(idea).unwrap();
        assert_eq!(Step::IdeaEvaluation.check(&record), Ok(()));

        // An edit after scoring blocks again until rescored
        record.set_idea_rating(idea, crit(2), Some(3.0));
        assert!(Step::IdeaEvaluation.check(&record).is_err());
    }

    #[test]
    fn test_concept_evaluation_requires_all_three() {
        let mut record = criteria_ready();
        for column in Column::all().take(2) {
            record.set_formed_rating(column, crit(1), Some(5.0));
            record.score_formed(column).unwrap();
        }
        assert_eq!(
            Step::ConceptEvaluation.check(&record),
            Err(ValidationError::FormedConceptsNotScored {
                pending: vec![Column::new(3).unwrap()]
            })
        );
        record.score_formed(Column::new(3).unwrap()).unwrap();
        assert_eq!(Step::ConceptEvaluation.check(&record), Ok(()));
    }

    #[test]
    fn test_ungated_steps() {
        let record = ProjectRecord::new();
        for step in [Step::Morphology, Step::Prevention, Step::TaskPlan, Step::Results] {
            assert_eq!(step.check(&record), Ok(()));
        }
        assert_eq!(Step::TaskPlanContinued.task_page(), Some(TaskPage::Second));
    }
}
