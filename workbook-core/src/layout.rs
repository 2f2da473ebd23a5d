//! Persisted document layout
//!
//! The record is stored as one flat JSON object with numbered keys
//! (`criterio3`, `calif2_4`, `pos11`, ...). This module is the only place
//! that knows those names.
//!
//! Global invariants enforced:
//! - Keys this module does not interpret are carried through unchanged
//! - Numbers are written as strings; reads accept strings or JSON numbers
//! - Results and risk are written with 2 decimals
//! - Blank text is not written
//! - `encode(decode(doc)) == doc` for any `doc` produced by `encode`

use crate::evaluation::Evaluation;
use crate::index::{
    possibility_key, rating_key, selection_key, Column, CriterionIndex, IdeaIndex, RiskIndex,
    Slot, TaskIndex,
};
use crate::record::{normalize_text, Criterion, ProjectRecord, RiskEntry, TaskRow};
use serde_json::{Map, Value};

pub const PROJECT_NAME: &str = "projectName";
pub const PROJECT_DESCRIPTION: &str = "projectDescription";
pub const NUM_CRITERIA: &str = "numCriterios";

fn criterion_label_key(c: CriterionIndex) -> String {
    format!("criterio{}", c)
}

fn criterion_weight_key(c: CriterionIndex) -> String {
    format!("peso{}", c)
}

fn idea_key(i: IdeaIndex) -> String {
    format!("concepto{}", i)
}

fn idea_rating_key(i: IdeaIndex, c: CriterionIndex) -> String {
    format!("calif{}_{}", i, c)
}

fn idea_flag_key(i: IdeaIndex) -> String {
    format!("calculado{}", i)
}

fn idea_result_key(i: IdeaIndex) -> String {
    format!("resultadoIdea{}", i)
}

fn possibility_name(i: IdeaIndex, s: Slot) -> String {
    format!("pos{}", possibility_key(i, s))
}

fn selection_name(i: IdeaIndex, c: Column) -> String {
    format!("pastel_grupo{}", selection_key(i, c))
}

fn formed_rating_key(col: Column, c: CriterionIndex) -> String {
    format!("ca{}", rating_key(col, c))
}

/// Formed concepts 1..=3 are stored as `resultado4..resultado6`
const SHARED_RESULT_OFFSET: usize = 3;

fn formed_result_key(col: Column) -> String {
    format!("resultado{}", col.get() + SHARED_RESULT_OFFSET)
}

/// Idea result key of documents written before `resultadoIdea{n}`
fn legacy_idea_result_key(i: IdeaIndex) -> String {
    format!("resultado{}", i)
}

fn formed_flag_key(col: Column) -> String {
    format!("calculadoFormado{}", col)
}

fn task_keys(t: TaskIndex) -> [String; 3] {
    [
        format!("persona{}", t),
        format!("tarea{}", t),
        format!("salida{}", t),
    ]
}

/// Key prefixes of the risk entry fields, in `RiskEntry` field order
const RISK_FAILURE: &str = "fallaPotencial";
const RISK_EFFECT: &str = "efecto";
const RISK_SEVERITY: &str = "sev";
const RISK_OCCURRENCE: &str = "ocu";
const RISK_VALUE: &str = "riesgo";
const RISK_ACTION_PLANNED: &str = "accionReal";
const RISK_RESPONSIBLE: &str = "responsable";
const RISK_RECORDED_DATE: &str = "fechaCell";
const RISK_ACTION_TAKEN: &str = "accionTom";
const RISK_COMPLETION_DATE: &str = "fecha";

fn risk_key(prefix: &str, r: RiskIndex) -> String {
    format!("{}{}", prefix, r)
}

/// Consumes recognized keys; whatever is left becomes `extra`.
///
/// A recognized key whose value has an unusable type is left in place so
/// it survives the next save.
struct Reader {
    remaining: Map<String, Value>,
}

impl Reader {
    /// Text value, `Some("")` when present but blank
    fn raw_text(&mut self, key: &str) -> Option<String> {
        let text = match self.remaining.get(key)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Null => None,
            other => {
                tracing::warn!(key, value = %other, "ignoring non-text value");
                return None;
            }
        };
        self.remaining.remove(key);
        text
    }

    fn text(&mut self, key: &str) -> Option<String> {
        self.raw_text(key).and_then(|s| normalize_text(&s))
    }

    fn number(&mut self, key: &str) -> Option<f64> {
        let number = match self.remaining.get(key)? {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Some(v),
                _ => {
                    tracing::warn!(key, value = %s, "ignoring unparseable number");
                    return None;
                }
            },
            Value::Number(n) => n.as_f64(),
            Value::Null => None,
            other => {
                tracing::warn!(key, value = %other, "ignoring non-numeric value");
                return None;
            }
        };
        self.remaining.remove(key);
        number
    }

    fn flag(&mut self, key: &str) -> Option<bool> {
        let flag = match self.remaining.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) if s == "true" => Some(true),
            Value::String(s) if s == "false" => Some(false),
            Value::Null => None,
            other => {
                tracing::warn!(key, value = %other, "ignoring non-boolean flag");
                return None;
            }
        };
        self.remaining.remove(key);
        flag
    }

    /// Flag value without consuming it
    fn peek_flag(&self, key: &str) -> Option<bool> {
        match self.remaining.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) if s == "true" => Some(true),
            Value::String(s) if s == "false" => Some(false),
            _ => None,
        }
    }

    /// A stored result and its computed flag.
    ///
    /// A result without a flag predates the flag and counts as computed.
    /// The flag is only consumed alongside a result.
    fn evaluation(&mut self, result_key: &str, flag_key: &str) -> Evaluation {
        let Some(result) = self.number(result_key) else {
            return Evaluation::Pending;
        };
        match self.flag(flag_key) {
            Some(false) => Evaluation::Stale(result),
            _ => Evaluation::Computed(result),
        }
    }

    /// Idea result, falling back to the shared `resultado{n}` key of older
    /// documents when the idea is flagged as computed.
    ///
    /// `resultado4`/`resultado5` also hold formed concepts 1 and 2; the idea
    /// claims them only when the formed concept has no flag of its own.
    fn idea_evaluation(&mut self, idea: IdeaIndex) -> Evaluation {
        let flag_key = idea_flag_key(idea);
        let current = self.evaluation(&idea_result_key(idea), &flag_key);
        if current != Evaluation::Pending || self.peek_flag(&flag_key) != Some(true) {
            return current;
        }
        let shared_column = idea.get().checked_sub(SHARED_RESULT_OFFSET).and_then(Column::new);
        if shared_column.is_some_and(|col| self.remaining.contains_key(&formed_flag_key(col))) {
            return Evaluation::Pending;
        }
        match self.number(&legacy_idea_result_key(idea)) {
            Some(value) => {
                self.remaining.remove(&flag_key);
                tracing::info!(idea = idea.get(), "read idea score from legacy key");
                Evaluation::Computed(value)
            }
            None => Evaluation::Pending,
        }
    }

    /// Formed result, skipping a `resultado{4,5}` that belongs to an idea
    fn formed_evaluation(&mut self, original: &Map<String, Value>, col: Column) -> Evaluation {
        let flag_key = formed_flag_key(col);
        let shared_idea = IdeaIndex::new(col.get() + SHARED_RESULT_OFFSET);
        if !original.contains_key(&flag_key)
            && shared_idea.is_some_and(|idea| original.contains_key(&idea_flag_key(idea)))
        {
            return Evaluation::Pending;
        }
        self.evaluation(&formed_result_key(col), &flag_key)
    }
}

/// Build a record from a stored document
pub fn decode(document: &Map<String, Value>) -> ProjectRecord {
    let mut reader = Reader {
        remaining: document.clone(),
    };
    let mut record = ProjectRecord {
        project_name: reader.text(PROJECT_NAME),
        project_description: reader.text(PROJECT_DESCRIPTION),
        ..Default::default()
    };

    record.num_criteria = reader.number(NUM_CRITERIA).and_then(|n| {
        (n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64).then_some(n as u32)
    });

    for c in CriterionIndex::all() {
        let label = reader.raw_text(&criterion_label_key(c));
        let weight = reader.number(&criterion_weight_key(c));
        if label.is_some() || weight.is_some() {
            record.criteria[c.offset()] = Some(Criterion::new(
                label.as_deref().unwrap_or_default(),
                weight,
            ));
        }
    }

    for i in IdeaIndex::all() {
        let offset = i.offset();
        record.ideas[offset] = reader.text(&idea_key(i));
        for c in CriterionIndex::all() {
            record.idea_ratings[offset][c.offset()] = reader.number(&idea_rating_key(i, c));
        }
        record.idea_results[offset] = reader.idea_evaluation(i);
        for s in Slot::all() {
            record.possibilities[offset][s.offset()] = reader.text(&possibility_name(i, s));
        }
        for col in Column::all() {
            record.selections[offset][col.offset()] = reader.text(&selection_name(i, col));
        }
    }

    for col in Column::all() {
        for c in CriterionIndex::all() {
            record.formed_ratings[col.offset()][c.offset()] =
                reader.number(&formed_rating_key(col, c));
        }
        record.formed_results[col.offset()] = reader.formed_evaluation(document, col);
    }

    for r in RiskIndex::all() {
        record.risks[r.offset()] = RiskEntry {
            failure: reader.text(&risk_key(RISK_FAILURE, r)),
            effect: reader.text(&risk_key(RISK_EFFECT, r)),
            severity: reader.number(&risk_key(RISK_SEVERITY, r)),
            occurrence: reader.number(&risk_key(RISK_OCCURRENCE, r)),
            risk: reader
                .number(&risk_key(RISK_VALUE, r))
                .map_or(Evaluation::Pending, Evaluation::Computed),
            action_planned: reader.text(&risk_key(RISK_ACTION_PLANNED, r)),
            responsible: reader.text(&risk_key(RISK_RESPONSIBLE, r)),
            recorded_date: reader.text(&risk_key(RISK_RECORDED_DATE, r)),
            action_taken: reader.text(&risk_key(RISK_ACTION_TAKEN, r)),
            completion_date: reader.text(&risk_key(RISK_COMPLETION_DATE, r)),
        };
    }

    for t in TaskIndex::all() {
        let [person, description, output] = task_keys(t);
        record.tasks[t.offset()] = TaskRow {
            person: reader.text(&person),
            description: reader.text(&description),
            output: reader.text(&output),
        };
    }

    record.extra = reader.remaining;
    record
}

struct Writer {
    document: Map<String, Value>,
}

impl Writer {
    fn text(&mut self, key: String, value: Option<&str>) {
        if let Some(text) = value {
            self.document.insert(key, Value::String(text.to_string()));
        }
    }

    fn number(&mut self, key: String, value: Option<f64>) {
        if let Some(v) = value {
            self.document.insert(key, Value::String(format!("{}", v)));
        }
    }

    fn fixed2(&mut self, key: String, value: f64) {
        self.document.insert(key, Value::String(format!("{:.2}", value)));
    }

    fn evaluation(&mut self, result_key: String, flag_key: String, evaluation: Evaluation) {
        match evaluation {
            Evaluation::Computed(v) => {
                self.fixed2(result_key, v);
                self.document.insert(flag_key, Value::Bool(true));
            }
            Evaluation::Stale(v) => {
                self.fixed2(result_key, v);
                self.document.insert(flag_key, Value::Bool(false));
            }
            Evaluation::Pending => {}
        }
    }
}

/// Serialize a record to its stored document
pub fn encode(record: &ProjectRecord) -> Map<String, Value> {
    let mut w = Writer {
        document: record.extra.clone(),
    };

    w.text(PROJECT_NAME.to_string(), record.project_name());
    w.text(PROJECT_DESCRIPTION.to_string(), record.project_description());
    if let Some(n) = record.num_criteria {
        w.document.insert(NUM_CRITERIA.to_string(), Value::from(n));
    }

    // A present slot is always written in full so its presence survives
    for c in CriterionIndex::all() {
        if let Some(criterion) = record.criterion(c) {
            w.document.insert(
                criterion_label_key(c),
                Value::String(criterion.label.clone()),
            );
            let weight = criterion.weight.map(|v| format!("{}", v)).unwrap_or_default();
            w.document.insert(criterion_weight_key(c), Value::String(weight));
        }
    }

    for i in IdeaIndex::all() {
        let offset = i.offset();
        w.text(idea_key(i), record.idea(i));
        for c in CriterionIndex::all() {
            w.number(idea_rating_key(i, c), record.idea_ratings[offset][c.offset()]);
        }
        w.evaluation(idea_result_key(i), idea_flag_key(i), record.idea_results[offset]);
        for s in Slot::all() {
            w.text(possibility_name(i, s), record.possibility(i, s));
        }
        for col in Column::all() {
            w.text(selection_name(i, col), record.get_selection(i, col));
        }
    }

    for col in Column::all() {
        for c in CriterionIndex::all() {
            w.number(formed_rating_key(col, c), record.formed_rating(col, c));
        }
        w.evaluation(
            formed_result_key(col),
            formed_flag_key(col),
            record.formed_result(col),
        );
    }

    for r in RiskIndex::all() {
        let entry = record.risk_entry(r);
        w.text(risk_key(RISK_FAILURE, r), entry.failure.as_deref());
        w.text(risk_key(RISK_EFFECT, r), entry.effect.as_deref());
        w.number(risk_key(RISK_SEVERITY, r), entry.severity());
        w.number(risk_key(RISK_OCCURRENCE, r), entry.occurrence());
        // Only an up-to-date risk is stored
        if let Some(value) = entry.risk().value() {
            w.fixed2(risk_key(RISK_VALUE, r), value);
        }
        w.text(risk_key(RISK_ACTION_PLANNED, r), entry.action_planned.as_deref());
        w.text(risk_key(RISK_RESPONSIBLE, r), entry.responsible.as_deref());
        w.text(risk_key(RISK_RECORDED_DATE, r), entry.recorded_date.as_deref());
        w.text(risk_key(RISK_ACTION_TAKEN, r), entry.action_taken.as_deref());
        w.text(risk_key(RISK_COMPLETION_DATE, r), entry.completion_date.as_deref());
    }

    for t in TaskIndex::all() {
        let row = record.task(t);
        let [person, description, output] = task_keys(t);
        w.text(person, row.person.as_deref());
        w.text(description, row.description.as_deref());
        w.text(output, row.output.as_deref());
    }

    w.document
}
