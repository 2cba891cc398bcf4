//! Plain-text rendering of pages for the terminal.

use chrono::NaiveDate;

use tareas::core::category::{Category, name_of};
use tareas::core::task::Task;

pub const NO_TASKS: &str = "You have no tasks yet. Add one to get started!";
pub const NO_CATEGORIES: &str = "You have no categories yet.";

fn category_label<'a>(task: &'a Task, categories: &'a [Category]) -> &'a str {
    task.category_name
        .as_deref()
        .or_else(|| name_of(categories, task.category_id))
        .unwrap_or("No category")
}

/// One line per task: marker, id, title, category badge and due date.
pub fn task_line(task: &Task, categories: &[Category], today: NaiveDate) -> String {
    let marker = if task.completed { "[x]" } else { "[ ]" };
    let due = match task.due_date {
        Some(d) if task.is_overdue(today) => format!("due {} (overdue)", d),
        Some(d) => format!("due {}", d),
        None => "no date".to_string(),
    };
    format!(
        "{} #{:<4} {}  [{}]  {}",
        marker,
        task.id,
        task.title,
        category_label(task, categories),
        due
    )
}

pub fn task_list(tasks: &[&Task], categories: &[Category], today: NaiveDate) -> String {
    if tasks.is_empty() {
        return NO_TASKS.to_string();
    }
    tasks
        .iter()
        .map(|t| task_line(t, categories, today))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full card, including the description.
pub fn task_card(task: &Task, categories: &[Category]) -> String {
    let status = if task.completed { "Completed" } else { "Pending" };
    let due = task
        .due_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "No date".to_string());
    let description = task
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or("This task has no description.");
    format!(
        "#{} {}\n  Category: {}\n  Due:      {}\n  Status:   {}\n\n  {}",
        task.id,
        task.title,
        category_label(task, categories),
        due,
        status,
        description
    )
}

pub fn category_list(categories: &[Category]) -> String {
    if categories.is_empty() {
        return NO_CATEGORIES.to_string();
    }
    categories
        .iter()
        .map(|c| format!("#{:<4} {}", c.id, c.name))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Task {
        Task {
            id: 2,
            title: "Ship".into(),
            description: None,
            due_date: NaiveDate::from_ymd_opt(2025, 6, 13),
            category_id: 1,
            category_name: None,
            completed: false,
            owner_id: "u1".into(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
    }

    #[test]
    fn line_falls_back_to_held_categories() {
        let cats = vec![Category {
            id: 1,
            name: "Work".into(),
            owner_id: "u1".into(),
        }];
        let line = task_line(&task(), &cats, today());
        assert!(line.contains("[Work]"));
        assert!(line.contains("(overdue)"));
        assert!(task_line(&task(), &[], today()).contains("[No category]"));
    }

    #[test]
    fn card_placeholders() {
        let mut t = task();
        t.due_date = None;
        t.completed = true;
        let card = task_card(&t, &[]);
        assert!(card.contains("No date"));
        assert!(card.contains("Completed"));
        assert!(card.contains("This task has no description."));
    }

    #[test]
    fn empty_lists() {
        assert_eq!(task_list(&[], &[], today()), NO_TASKS);
        assert_eq!(category_list(&[]), NO_CATEGORIES);
    }
}
