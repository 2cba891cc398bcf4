use crate::core::RowId;
use crate::core::category::Category;
use crate::core::task::{Task, TaskFields, parse_due_date};
use crate::error::ValidationError;

/// Edit buffer behind the create and edit task forms.
///
/// Text is held as typed; [`TaskForm::validate`] turns it into
/// [`TaskFields`] or says what is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    /// `YYYY-MM-DD` or empty.
    pub due_date: String,
    pub category_id: Option<RowId>,
}

impl TaskForm {
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            due_date: task
                .due_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            category_id: Some(task.category_id),
        }
    }

    /// Keep the chosen category if it still exists, else fall back to the first.
    pub fn ensure_category(&mut self, categories: &[Category]) {
        let still_there = self
            .category_id
            .is_some_and(|id| categories.iter().any(|c| c.id == id));
        if !still_there {
            self.category_id = categories.first().map(|c| c.id);
        }
    }

    /// Clear the text fields after a successful create. The category stays.
    pub fn reset(&mut self) {
        self.title.clear();
        self.description.clear();
        self.due_date.clear();
    }

    pub fn validate(&self) -> Result<TaskFields, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        let category_id = self.category_id.ok_or(ValidationError::MissingCategory)?;

        let due = self.due_date.trim();
        let due_date = if due.is_empty() {
            None
        } else {
            Some(parse_due_date(due).ok_or_else(|| ValidationError::InvalidDate(due.to_string()))?)
        };

        let description = Some(self.description.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(TaskFields {
            title: title.to_string(),
            description,
            due_date,
            category_id,
        })
    }
}
