//! Task CRUD against the `tareas` table.
//!
//! Every read and every write returns tasks with their category name joined
//! in. Input is not validated here; forms do that before calling in.

use serde_json::{Value, json};

use crate::core::RowId;
use crate::core::task::{Task, TaskFields, TaskRow, columns};
use crate::error::StoreError;
use crate::remote::{Direction, Query, RemoteStore, TASKS_TABLE, decode_rows, decode_single};

fn tasks() -> Query {
    Query::table(TASKS_TABLE).select(columns::SELECT_WITH_CATEGORY)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::new(format!("Failed to encode row: {}", e)))
}

/// All of the owner's tasks, earliest due date first, undated last.
pub async fn list_tasks(store: &dyn RemoteStore, owner_id: &str) -> Result<Vec<Task>, StoreError> {
    let query = tasks()
        .eq(columns::OWNER, owner_id)
        .order(columns::DUE_DATE, Direction::Ascending);
    let rows: Vec<TaskRow> = decode_rows(store.select(&query).await?)?;
    log::debug!("Fetched {} tasks for {}", rows.len(), owner_id);
    Ok(rows.into_iter().map(Task::from).collect())
}

pub async fn get_task(store: &dyn RemoteStore, id: RowId) -> Result<Task, StoreError> {
    let query = tasks().eq(columns::ID, id);
    let row: TaskRow = decode_single(store.select(&query).await?)?;
    Ok(row.into())
}

pub async fn create_task(
    store: &dyn RemoteStore,
    fields: &TaskFields,
    owner_id: &str,
) -> Result<Task, StoreError> {
    let payload = to_json(&fields.to_payload(Some(owner_id)))?;
    let row: TaskRow = decode_single(store.insert(&tasks(), vec![payload]).await?)?;
    log::info!("Created task {} '{}'", row.id, row.titulo);
    Ok(row.into())
}

pub async fn update_task(
    store: &dyn RemoteStore,
    id: RowId,
    fields: &TaskFields,
) -> Result<Task, StoreError> {
    let payload = to_json(&fields.to_payload(None))?;
    let query = tasks().eq(columns::ID, id);
    let row: TaskRow = decode_single(store.update(&query, payload).await?)?;
    log::info!("Updated task {}", id);
    Ok(row.into())
}

/// Remove a task. An id that matches nothing is an error, not a no-op.
pub async fn delete_task(store: &dyn RemoteStore, id: RowId) -> Result<(), StoreError> {
    let query = Query::table(TASKS_TABLE)
        .select(columns::ID)
        .eq(columns::ID, id);
    let removed = store.delete(&query).await?;
    if removed.is_empty() {
        return Err(StoreError::no_rows(TASKS_TABLE, id));
    }
    log::info!("Deleted task {}", id);
    Ok(())
}

/// Set `completed` to exactly `completed`. The caller decides the flip.
pub async fn toggle_task_status(
    store: &dyn RemoteStore,
    id: RowId,
    completed: bool,
) -> Result<(), StoreError> {
    let query = Query::table(TASKS_TABLE)
        .select(columns::ID)
        .eq(columns::ID, id);
    let touched = store
        .update(&query, json!({ "estado": completed }))
        .await?;
    if touched.is_empty() {
        return Err(StoreError::no_rows(TASKS_TABLE, id));
    }
    log::info!("Task {} marked {}", id, if completed { "done" } else { "pending" });
    Ok(())
}
