//! Workbook core library - data model and computations for improvement projects

// Global invariants enforced in this crate:
// - One record, read in full and written in full; single writer
// - No global mutable state
// - No randomness, clocks, threads, or async
// - Derived values (scores, risk) are never silently recomputed; edits mark them stale
// - Flat storage keys exist only in the layout codec
// - Identical records yield byte-for-byte identical documents and reports

pub mod config;
pub mod criteria;
pub mod error;
pub mod evaluation;
pub mod index;
pub mod layout;
pub mod matrix;
pub mod preferences;
pub mod record;
pub mod report;
pub mod risk;
pub mod scoring;
pub mod selection;
pub mod store;
pub mod tasks;
pub mod wizard;

pub use config::ResolvedConfig;
pub use error::{AdvanceError, RangeError, StorageError, ValidationError};
pub use evaluation::Evaluation;
pub use index::{Column, CriterionIndex, IdeaIndex, RiskIndex, Slot, TaskIndex};
pub use preferences::Preferences;
pub use record::{Criterion, ProjectRecord, RiskEntry, TaskRow};
pub use report::{render, render_json, render_text, ProjectSummary, ReportFormat};
pub use store::{FileBackend, MemoryBackend, ProjectStore};
pub use wizard::{Step, Wizard};
