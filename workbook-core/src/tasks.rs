//! Task plan: 30 rows edited across two wizard steps

use crate::index::{TaskIndex, MAX_TASKS};
use crate::record::{ProjectRecord, TaskRow};
use std::ops::RangeInclusive;

/// Rows shown on each task plan step
pub const ROWS_PER_STEP: usize = MAX_TASKS / 2;

/// Which half of the task plan a step edits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPage {
    First,
    Second,
}

impl TaskPage {
    /// 1-based row numbers of the page
    pub fn rows(self) -> RangeInclusive<usize> {
        match self {
            TaskPage::First => 1..=ROWS_PER_STEP,
            TaskPage::Second => ROWS_PER_STEP + 1..=MAX_TASKS,
        }
    }

    pub fn indices(self) -> impl Iterator<Item = TaskIndex> {
        self.rows().filter_map(TaskIndex::new)
    }
}

impl ProjectRecord {
    /// Rows with any non-blank field, in row order
    pub fn populated_tasks(&self) -> Vec<(TaskIndex, &TaskRow)> {
        TaskIndex::all()
            .map(|i| (i, self.task(i)))
            .filter(|(_, row)| !row.is_empty())
            .collect()
    }

    /// The rows one step edits, populated or not
    pub fn rows_for_step(&self, page: TaskPage) -> Vec<(TaskIndex, &TaskRow)> {
        page.indices().map(|i| (i, self.task(i))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(n: usize) -> TaskIndex {
        TaskIndex::new(n).unwrap()
    }

    #[test]
    fn test_pages_split_thirty_rows() {
        assert_eq!(TaskPage::First.rows(), 1..=15);
        assert_eq!(TaskPage::Second.rows(), 16..=30);
        assert_eq!(TaskPage::Second.indices().count(), 15);
    }

    #[test]
    fn test_populated_tasks_skip_blank_rows() {
        let mut record = ProjectRecord::new();
        record.set_task(task(17), TaskRow::new("Ana", "Train operators", "Sign-off sheet"));
        record.set_task(task(3), TaskRow::new("", "", "Updated SOP"));
        record.set_task(task(9), TaskRow::new("  ", "", ""));

        let populated: Vec<usize> = record
            .populated_tasks()
            .into_iter()
            .map(|(i, _)| i.get())
            .collect();
        assert_eq!(populated, vec![3, 17]);
    }

    #[test]
    fn test_rows_for_step() {
        let mut record = ProjectRecord::new();
        record.set_task(task(16), TaskRow::new("Luis", "Audit", ""));
        let rows = record.rows_for_step(TaskPage::Second);
        assert_eq!(rows.len(), 15);
        assert_eq!(rows[0].0, task(16));
        assert_eq!(rows[0].1.person.as_deref(), Some("Luis"));
    }
}
