//! Project report generation
//!
//! Global invariants enforced:
//! - Deterministic output ordering (sections in wizard order, rows by index)
//! - Byte-for-byte identical output for identical records
//! - No clock values in the output

use crate::evaluation::Evaluation;
use crate::index::{Column, CriterionIndex, IdeaIndex, RiskIndex, Slot, TaskIndex};
use crate::matrix::FormedConcept;
use crate::record::ProjectRecord;
use crate::selection::BestConcept;
use crate::tasks::TaskPage;
use serde::Serialize;

/// Output format of a rendered report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionLine {
    pub criterion: CriterionIndex,
    pub label: String,
    pub weight: f64,
}

/// One entered rating with its weighted contribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingLine {
    pub criterion: CriterionIndex,
    pub label: String,
    pub rating: f64,
    pub weight: f64,
    pub weighted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdeaSummary {
    pub idea: IdeaIndex,
    pub text: String,
    pub ratings: Vec<RatingLine>,
    pub score: Evaluation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PossibilityLine {
    pub slot: Slot,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdeaPossibilities {
    pub idea: IdeaIndex,
    pub idea_text: String,
    pub options: Vec<PossibilityLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormedScore {
    pub column: Column,
    pub has_ratings: bool,
    pub score: Evaluation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSummary {
    pub entry: RiskIndex,
    pub failure: Option<String>,
    pub effect: Option<String>,
    pub severity: Option<f64>,
    pub occurrence: Option<f64>,
    pub risk: Evaluation,
    pub action_planned: Option<String>,
    pub responsible: Option<String>,
    pub recorded_date: Option<String>,
    pub action_taken: Option<String>,
    pub completion_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskLine {
    pub row: TaskIndex,
    pub person: Option<String>,
    pub description: Option<String>,
    pub output: Option<String>,
}

/// Everything the report shows, derived values included
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub project_name: Option<String>,
    pub project_description: Option<String>,
    pub criteria: Vec<CriterionLine>,
    pub weight_sum: f64,
    pub ideas: Vec<IdeaSummary>,
    pub possibilities: Vec<IdeaPossibilities>,
    pub formed_concepts: Vec<FormedConcept>,
    pub formed_scores: Vec<FormedScore>,
    pub best_concept: Option<BestConcept>,
    pub risks: Vec<RiskSummary>,
    pub tasks: Vec<TaskLine>,
}

impl ProjectSummary {
    pub fn from_record(record: &ProjectRecord) -> Self {
        let weights = record.weights();

        let criteria = CriterionIndex::all()
            .filter(|&c| record.criterion(c).is_some())
            .map(|c| CriterionLine {
                criterion: c,
                label: record.criterion_label(c),
                weight: weights[c.offset()].unwrap_or(0.0),
            })
            .collect();

        let ideas = record
            .existing_ideas()
            .into_iter()
            .map(|idea| {
                let ratings = CriterionIndex::all()
                    .filter_map(|c| {
                        let rating = record.idea_rating(idea, c)?;
                        let weight = weights[c.offset()].unwrap_or(0.0);
                        Some(RatingLine {
                            criterion: c,
                            label: record.criterion_label(c),
                            rating,
                            weight,
                            weighted: rating * weight,
                        })
                    })
                    .collect();
                IdeaSummary {
                    idea,
                    text: record.idea(idea).unwrap_or_default().to_string(),
                    ratings,
                    score: record.idea_result(idea),
                }
            })
            .collect();

        let possibilities = record
            .existing_ideas()
            .into_iter()
            .map(|idea| IdeaPossibilities {
                idea,
                idea_text: record.idea(idea).unwrap_or_default().to_string(),
                options: Slot::all()
                    .filter_map(|slot| {
                        record.possibility(idea, slot).map(|text| PossibilityLine {
                            slot,
                            text: text.to_string(),
                        })
                    })
                    .collect(),
            })
            .collect();

        let formed_concepts = Column::all().map(|c| record.formed_concept(c)).collect();
        let formed_scores = Column::all()
            .map(|column| FormedScore {
                column,
                has_ratings: record.formed_ratings(column).iter().any(Option::is_some),
                score: record.formed_result(column),
            })
            .collect();

        let risks = RiskIndex::all()
            .map(|r| {
                let entry = record.risk_entry(r);
                RiskSummary {
                    entry: r,
                    failure: entry.failure.clone(),
                    effect: entry.effect.clone(),
                    severity: entry.severity(),
                    occurrence: entry.occurrence(),
                    risk: entry.risk(),
                    action_planned: entry.action_planned.clone(),
                    responsible: entry.responsible.clone(),
                    recorded_date: entry.recorded_date.clone(),
                    action_taken: entry.action_taken.clone(),
                    completion_date: entry.completion_date.clone(),
                }
            })
            .collect();

        let tasks = record
            .populated_tasks()
            .into_iter()
            .map(|(row, task)| TaskLine {
                row,
                person: task.person.clone(),
                description: task.description.clone(),
                output: task.output.clone(),
            })
            .collect();

        ProjectSummary {
            project_name: record.project_name().map(str::to_string),
            project_description: record.project_description().map(str::to_string),
            criteria,
            weight_sum: record.weight_sum(),
            ideas,
            possibilities,
            formed_concepts,
            formed_scores,
            best_concept: record.best_concept(),
            risks,
            tasks,
        }
    }
}

impl RiskSummary {
    fn is_empty(&self) -> bool {
        self.failure.is_none()
            && self.effect.is_none()
            && self.severity.is_none()
            && self.occurrence.is_none()
            && self.risk.last_value().is_none()
            && self.action_planned.is_none()
            && self.responsible.is_none()
            && self.recorded_date.is_none()
            && self.action_taken.is_none()
            && self.completion_date.is_none()
    }
}

fn evaluation_text(evaluation: Evaluation) -> String {
    match evaluation {
        Evaluation::Computed(v) => format!("{:.2}", v),
        Evaluation::Stale(v) => format!("{:.2} (outdated)", v),
        Evaluation::Pending => "not computed".to_string(),
    }
}

fn heading(output: &mut String, title: &str) {
    if !output.is_empty() {
        output.push('\n');
    }
    output.push_str(title);
    output.push('\n');
}

fn line(output: &mut String, text: &str) {
    output.push_str(text);
    output.push('\n');
}

fn push_concept(output: &mut String, concept: &FormedConcept, missing: &str) {
    for (n, component) in concept.components.iter().enumerate() {
        let selection = component.selection.as_deref().unwrap_or(missing);
        line(
            output,
            &format!("  {}. {}: {}", n + 1, component.idea_text, selection),
        );
    }
}

/// Render the summary as a plain-text report
pub fn render_text(summary: &ProjectSummary) -> String {
    let mut output = String::new();
    line(&mut output, "COMPLETE PROJECT REPORT");

    heading(&mut output, "1. PROJECT INFORMATION");
    line(
        &mut output,
        &format!(
            "Project name: {}",
            summary.project_name.as_deref().unwrap_or("(Unnamed)")
        ),
    );
    line(
        &mut output,
        &format!(
            "Description: {}",
            summary
                .project_description
                .as_deref()
                .unwrap_or("(No description)")
        ),
    );

    heading(&mut output, "2. CRITERIA AND WEIGHTS");
    for c in &summary.criteria {
        line(&mut output, &format!("  {}: {:.1}", c.label, c.weight));
    }
    line(
        &mut output,
        &format!("TOTAL SUM OF WEIGHTS: {:.1}", summary.weight_sum),
    );

    heading(&mut output, "3. INITIAL IDEAS / CONCEPTS");
    if summary.ideas.is_empty() {
        line(&mut output, "No ideas entered");
    }
    for idea in &summary.ideas {
        line(&mut output, &format!("  Idea {}: {}", idea.idea, idea.text));
    }

    heading(&mut output, "4. INITIAL EVALUATION OF IDEAS");
    let rated: Vec<&IdeaSummary> = summary
        .ideas
        .iter()
        .filter(|i| !i.ratings.is_empty())
        .collect();
    if rated.is_empty() {
        line(&mut output, "No initial evaluation data");
    }
    for idea in rated {
        line(&mut output, &format!("Idea {}: {}", idea.idea, idea.text));
        for r in &idea.ratings {
            line(
                &mut output,
                &format!(
                    "  {}: {:.1} x {:.1} = {:.2}",
                    r.label, r.rating, r.weight, r.weighted
                ),
            );
        }
        line(&mut output, &format!("  TOTAL: {}", evaluation_text(idea.score)));
    }

    heading(&mut output, "5. EXPLORATION OF OPTIONS");
    let explored: Vec<&IdeaPossibilities> = summary
        .possibilities
        .iter()
        .filter(|p| !p.options.is_empty())
        .collect();
    if explored.is_empty() {
        line(&mut output, "No exploration of options data");
    }
    for p in explored {
        line(&mut output, &format!("For {}", p.idea_text));
        for option in &p.options {
            line(
                &mut output,
                &format!("  Option {}: {}", option.slot, option.text),
            );
        }
    }

    heading(&mut output, "6. CONCEPT FORMATION");
    let selected: Vec<&FormedConcept> = summary
        .formed_concepts
        .iter()
        .filter(|c| c.has_selections())
        .collect();
    if selected.is_empty() {
        line(&mut output, "No selections made");
    } else {
        line(&mut output, "Selection summary by group:");
    }
    for concept in &selected {
        line(&mut output, &format!("  Concept Formed {}:", concept.column));
        for component in &concept.components {
            if let Some(selection) = component.selection.as_deref() {
                line(
                    &mut output,
                    &format!("    {}: {}", component.idea_text, selection),
                );
            }
        }
    }

    heading(&mut output, "7. FORMED CONCEPTS");
    if selected.is_empty() {
        line(&mut output, "No concepts have been formed");
    }
    for concept in &selected {
        line(&mut output, &format!("Concept Formed {}", concept.column));
        push_concept(&mut output, concept, "(No selection)");
    }

    heading(&mut output, "8. EVALUATION OF FORMED CONCEPTS");
    let evaluated: Vec<&FormedScore> = summary
        .formed_scores
        .iter()
        .filter(|s| s.has_ratings || s.score.last_value().is_some())
        .collect();
    if evaluated.is_empty() {
        line(&mut output, "No evaluation of formed concepts");
    }
    for s in evaluated {
        line(&mut output, &format!("Concept Formed {}", s.column));
        line(
            &mut output,
            &format!("  Final score: {}", evaluation_text(s.score)),
        );
    }

    heading(&mut output, "9. BEST CONCEPT SELECTED");
    match &summary.best_concept {
        Some(best) => {
            line(
                &mut output,
                &format!(
                    "Concept Formed {} - score obtained: {:.2}",
                    best.concept.column, best.score
                ),
            );
            line(&mut output, "COMPOSITION OF THE WINNING CONCEPT:");
            push_concept(&mut output, &best.concept, "(Idea not selected)");
        }
        None => line(&mut output, "No concept evaluated as best"),
    }

    heading(&mut output, "10. RISK PREVENTION");
    let risks: Vec<&RiskSummary> = summary.risks.iter().filter(|r| !r.is_empty()).collect();
    if risks.is_empty() {
        line(&mut output, "No risk prevention data");
    }
    for r in risks {
        line(&mut output, &format!("PREVENTION {}", r.entry));
        let fields = [
            ("Potential failure", r.failure.clone()),
            ("Effect", r.effect.clone()),
            ("Severity (1-10)", r.severity.map(|v| v.to_string())),
            ("Occurrence (1-10)", r.occurrence.map(|v| v.to_string())),
            (
                "Calculated risk",
                r.risk.last_value().map(|_| evaluation_text(r.risk)),
            ),
            ("Actions to take", r.action_planned.clone()),
            ("Responsible", r.responsible.clone()),
            ("Date recorded", r.recorded_date.clone()),
            ("Action taken", r.action_taken.clone()),
            ("Date of execution", r.completion_date.clone()),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                line(&mut output, &format!("  - {}: {}", label, value));
            }
        }
    }

    heading(&mut output, "11. ACTION PLAN");
    if summary.tasks.is_empty() {
        line(&mut output, "No tasks in the plan");
    }
    for (page, title) in [
        (TaskPage::First, "Tasks 1-15:"),
        (TaskPage::Second, "Tasks 16-30:"),
    ] {
        let rows: Vec<&TaskLine> = summary
            .tasks
            .iter()
            .filter(|t| page.rows().contains(&t.row.get()))
            .collect();
        if rows.is_empty() {
            continue;
        }
        line(&mut output, title);
        for t in rows {
            line(
                &mut output,
                &format!(
                    "  {}. {} - {} - {}",
                    t.row,
                    t.person.as_deref().unwrap_or_default(),
                    t.description.as_deref().unwrap_or_default(),
                    t.output.as_deref().unwrap_or_default()
                ),
            );
        }
    }

    output
}

/// Render the summary as JSON output
pub fn render_json(summary: &ProjectSummary) -> String {
    serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".to_string())
}

pub fn render(summary: &ProjectSummary, format: ReportFormat) -> String {
    match format {
        ReportFormat::Text => render_text(summary),
        ReportFormat::Json => {
            let mut json = render_json(summary);
            json.push('\n');
            json
        }
    }
}

/// `report_<project name>.<ext>`, whitespace and path separators as `_`
pub fn report_file_name(project_name: Option<&str>, format: ReportFormat) -> String {
    let name: String = project_name
        .unwrap_or("project")
        .chars()
        .map(|c| {
            if c.is_whitespace() || c == '/' || c == '\\' {
                '_'
            } else {
                c
            }
        })
        .collect();
    format!("report_{}.{}", name, format.extension())
}
