use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::RowId;

/// Column names of the `tareas` table.
pub mod columns {
    pub const ID: &str = "id";
    pub const TITLE: &str = "titulo";
    pub const DESCRIPTION: &str = "descripcion";
    pub const DUE_DATE: &str = "fecha";
    pub const CATEGORY: &str = "categoria_id";
    pub const COMPLETED: &str = "estado";
    pub const OWNER: &str = "user_id";
    /// Every task column plus the owning category's name.
    pub const SELECT_WITH_CATEGORY: &str = "*, categorias ( nombre )";
}

/// Embedded category columns returned under the `categorias` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEmbed {
    pub nombre: String,
}

/// A task exactly as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: RowId,
    pub titulo: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub fecha: Option<NaiveDate>,
    pub categoria_id: RowId,
    #[serde(default, deserialize_with = "null_as_false")]
    pub estado: bool,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categorias: Option<CategoryEmbed>,
}

/// A task as the rest of the application sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: RowId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub category_id: RowId,
    /// Joined from the category; absent when the store did not embed it.
    pub category_name: Option<String>,
    pub completed: bool,
    pub owner_id: String,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            title: row.titulo,
            description: row.descripcion,
            due_date: row.fecha,
            category_id: row.categoria_id,
            category_name: row.categorias.map(|c| c.nombre),
            completed: row.estado,
            owner_id: row.user_id,
        }
    }
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            titulo: task.title.clone(),
            descripcion: task.description.clone(),
            fecha: task.due_date,
            categoria_id: task.category_id,
            estado: task.completed,
            user_id: task.owner_id.clone(),
            categorias: task
                .category_name
                .clone()
                .map(|nombre| CategoryEmbed { nombre }),
        }
    }
}

impl Task {
    /// Sort key matching the store's `fecha.asc.nullslast` ordering.
    pub fn due_key(&self) -> (bool, Option<NaiveDate>) {
        (self.due_date.is_none(), self.due_date)
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.due_date.is_some_and(|d| d < today)
    }
}

/// The user-editable fields of a task.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskFields {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub category_id: RowId,
}

/// Write payload for insert and update. `user_id` is only sent on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskPayload {
    pub titulo: String,
    pub descripcion: Option<String>,
    pub fecha: Option<NaiveDate>,
    pub categoria_id: RowId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl TaskFields {
    pub fn to_payload(&self, owner_id: Option<&str>) -> TaskPayload {
        TaskPayload {
            titulo: self.title.clone(),
            descripcion: self.description.clone(),
            fecha: self.due_date,
            categoria_id: self.category_id,
            user_id: owner_id.map(str::to_string),
        }
    }
}

impl From<&Task> for TaskFields {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date,
            category_id: task.category_id,
        }
    }
}

/// Parse exactly `YYYY-MM-DD`; anything else is rejected.
pub fn parse_due_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

// `fecha` may come back as a date or a timestamp depending on the column type.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        // Timestamp columns carry a time part after the date.
        Some(s) => parse_due_date(s.get(..10).unwrap_or(s))
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", s))),
    }
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}
