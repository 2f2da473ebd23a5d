//! Option matrix: possibilities per idea and their assignment to formation columns
//!
//! Each idea has 3 possibility slots. Each formation column takes at most one
//! possibility per idea; reading a column across all existing ideas yields a
//! formed concept.

use crate::index::{Column, IdeaIndex, Slot, SLOTS_PER_IDEA};
use crate::record::{normalize_text, ProjectRecord};
use serde::Serialize;

/// One idea's contribution to a formed concept
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptComponent {
    pub idea: IdeaIndex,
    pub idea_text: String,
    /// The selected possibility text, if any
    pub selection: Option<String>,
    /// The possibility slot whose text matches the selection
    pub slot: Option<Slot>,
}

/// A composite concept assembled from one formation column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormedConcept {
    pub column: Column,
    pub components: Vec<ConceptComponent>,
}

impl FormedConcept {
    /// True when at least one idea has a selection in this column
    pub fn has_selections(&self) -> bool {
        self.components.iter().any(|c| c.selection.is_some())
    }
}

impl ProjectRecord {
    pub fn possibility(&self, idea: IdeaIndex, slot: Slot) -> Option<&str> {
        self.possibilities[idea.offset()][slot.offset()].as_deref()
    }

    /// The 3 possibility texts of an idea, in slot order
    pub fn list_possibilities(&self, idea: IdeaIndex) -> [Option<&str>; SLOTS_PER_IDEA] {
        std::array::from_fn(|i| self.possibilities[idea.offset()][i].as_deref())
    }

    pub fn set_possibility(&mut self, idea: IdeaIndex, slot: Slot, text: &str) {
        self.possibilities[idea.offset()][slot.offset()] = normalize_text(text);
    }

    pub fn get_selection(&self, idea: IdeaIndex, column: Column) -> Option<&str> {
        self.selections[idea.offset()][column.offset()].as_deref()
    }

    /// Choose the text for (idea, column), replacing any previous choice.
    /// `None` or blank text clears the selection.
    pub fn set_selection(&mut self, idea: IdeaIndex, column: Column, text: Option<&str>) {
        self.selections[idea.offset()][column.offset()] = text.and_then(normalize_text);
    }

    /// Choose the possibility in `slot` for (idea, column).
    ///
    /// Selecting an empty slot clears the column for that idea.
    pub fn select_slot(&mut self, idea: IdeaIndex, column: Column, slot: Slot) {
        let text = self.possibility(idea, slot).map(str::to_string);
        self.set_selection(idea, column, text.as_deref());
    }

    /// Selections of a column over the existing ideas, in idea order
    pub fn selections_for_column(&self, column: Column) -> Vec<(IdeaIndex, Option<&str>)> {
        self.existing_ideas()
            .into_iter()
            .map(|idea| (idea, self.get_selection(idea, column)))
            .collect()
    }

    /// Materialize the formed concept of a column
    pub fn formed_concept(&self, column: Column) -> FormedConcept {
        let components = self
            .selections_for_column(column)
            .into_iter()
            .map(|(idea, selection)| {
                let slot = selection.and_then(|text| {
                    Slot::all().find(|&slot| self.possibility(idea, slot) == Some(text))
                });
                ConceptComponent {
                    idea,
                    idea_text: self.idea(idea).unwrap_or_default().to_string(),
                    selection: selection.map(str::to_string),
                    slot,
                }
            })
            .collect();
        FormedConcept { column, components }
    }
}
