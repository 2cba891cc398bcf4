//! In-process [`RemoteStore`] with the same observable contract as the
//! PostgREST client: storage-assigned ids, equality filters, nulls-last
//! ordering, `table(column)` embedding and the category → task cascade.
//!
//! Every request is recorded so callers can assert exact wire payloads, or
//! that nothing was sent at all.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::{CATEGORIES_TABLE, Direction, Operation, Query, RemoteStore, TASKS_TABLE};
use crate::core::collate;
use crate::error::StoreError;

/// One call as the store saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub operation: Operation,
    pub table: String,
    pub columns: String,
    pub filters: Vec<(String, Value)>,
    pub body: Option<Value>,
}

/// `child_table.fk_column` references `parent_table.id`.
#[derive(Debug, Clone)]
struct ForeignKey {
    child_table: String,
    fk_column: String,
    parent_table: String,
    cascade: bool,
}

#[derive(Default)]
struct State {
    tables: HashMap<String, Vec<Map<String, Value>>>,
    next_ids: HashMap<String, i64>,
    defaults: HashMap<String, Map<String, Value>>,
    foreign_keys: Vec<ForeignKey>,
    failures: Vec<(Operation, String, StoreError)>,
    requests: Vec<RecordedRequest>,
}

pub struct MemoryStore {
    state: Mutex<State>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// A store laid out like the hosted schema: `categorias` and `tareas`,
    /// with tasks cascading away when their category is deleted.
    pub fn new() -> Self {
        let mut state = State::default();
        state.tables.insert(CATEGORIES_TABLE.to_string(), Vec::new());
        state.tables.insert(TASKS_TABLE.to_string(), Vec::new());

        let task_defaults = json!({ "descripcion": null, "fecha": null, "estado": false });
        if let Value::Object(map) = task_defaults {
            state.defaults.insert(TASKS_TABLE.to_string(), map);
        }
        state.foreign_keys.push(ForeignKey {
            child_table: TASKS_TABLE.to_string(),
            fk_column: "categoria_id".to_string(),
            parent_table: CATEGORIES_TABLE.to_string(),
            cascade: true,
        });

        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock only happens inside a failing test.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every `operation` on `table` fail with `message` until cleared.
    pub fn fail_on(&self, operation: Operation, table: &str, message: &str) {
        self.lock()
            .failures
            .push((operation, table.to_string(), StoreError::new(message)));
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    /// Raw stored rows of a table, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock()
            .tables
            .get(table)
            .map(|rows| rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    fn begin(
        &self,
        operation: Operation,
        query: &Query,
        body: Option<Value>,
    ) -> Result<MutexGuard<'_, State>, StoreError> {
        let mut state = self.lock();
        state.requests.push(RecordedRequest {
            operation,
            table: query.table.clone(),
            columns: query.columns.clone(),
            filters: query.filters.clone(),
            body,
        });
        if let Some((_, _, err)) = state
            .failures
            .iter()
            .find(|(op, table, _)| *op == operation && *table == query.table)
        {
            return Err(err.clone());
        }
        if !state.tables.contains_key(&query.table) {
            return Err(StoreError::new(format!(
                "relation \"public.{}\" does not exist",
                query.table
            ))
            .with_code("42P01")
            .with_status(404));
        }
        Ok(state)
    }
}

impl State {
    fn matching(&self, query: &Query) -> Vec<usize> {
        self.tables[&query.table]
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                query
                    .filters
                    .iter()
                    .all(|(col, want)| row.get(col).is_some_and(|v| loosely_equal(v, want)))
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn check_references(&self, table: &str, row: &Map<String, Value>) -> Result<(), StoreError> {
        for fk in self.foreign_keys.iter().filter(|fk| fk.child_table == table) {
            let Some(value) = row.get(&fk.fk_column).filter(|v| !v.is_null()) else {
                continue;
            };
            let exists = self.tables[&fk.parent_table]
                .iter()
                .any(|parent| parent.get("id").is_some_and(|id| loosely_equal(id, value)));
            if !exists {
                return Err(StoreError::new(format!(
                    "insert or update on table \"{}\" violates foreign key constraint \"{}_{}_fkey\"",
                    fk.child_table, fk.child_table, fk.fk_column
                ))
                .with_code("23503")
                .with_status(409));
            }
        }
        Ok(())
    }

    fn cascade_delete(&mut self, table: &str, removed: &[Map<String, Value>]) {
        let children: Vec<ForeignKey> = self
            .foreign_keys
            .iter()
            .filter(|fk| fk.parent_table == table && fk.cascade)
            .cloned()
            .collect();
        for fk in children {
            let ids: Vec<&Value> = removed.iter().filter_map(|r| r.get("id")).collect();
            if let Some(rows) = self.tables.get_mut(&fk.child_table) {
                rows.retain(|row| {
                    !row.get(&fk.fk_column)
                        .is_some_and(|v| ids.iter().any(|id| loosely_equal(v, id)))
                });
            }
        }
    }

    /// Shape a stored row the way `columns` asks for it.
    fn project(&self, table: &str, row: &Map<String, Value>, columns: &str) -> Value {
        let mut out = Map::new();
        for item in split_columns(columns) {
            match item {
                ColumnSpec::All => {
                    for (k, v) in row {
                        out.insert(k.clone(), v.clone());
                    }
                }
                ColumnSpec::Column(name) => {
                    out.insert(name.clone(), row.get(&name).cloned().unwrap_or(Value::Null));
                }
                ColumnSpec::Embed { relation, columns } => {
                    let embedded = self.embed(table, row, &relation, &columns);
                    out.insert(relation, embedded);
                }
            }
        }
        Value::Object(out)
    }

    fn embed(&self, table: &str, row: &Map<String, Value>, relation: &str, columns: &str) -> Value {
        let Some(fk) = self
            .foreign_keys
            .iter()
            .find(|fk| fk.child_table == table && fk.parent_table == relation)
        else {
            return Value::Null;
        };
        let Some(key) = row.get(&fk.fk_column) else {
            return Value::Null;
        };
        self.tables[relation]
            .iter()
            .find(|parent| parent.get("id").is_some_and(|id| loosely_equal(id, key)))
            .map(|parent| self.project(relation, parent, columns))
            .unwrap_or(Value::Null)
    }

    fn respond(&self, query: &Query, rows: &[Map<String, Value>]) -> Vec<Value> {
        rows.iter()
            .map(|row| self.project(&query.table, row, &query.columns))
            .collect()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, StoreError> {
        let state = self.begin(Operation::Select, query, None)?;
        let table = &state.tables[&query.table];
        let mut rows: Vec<Map<String, Value>> = state
            .matching(query)
            .into_iter()
            .map(|i| table[i].clone())
            .collect();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let left = a.get(&order.column).unwrap_or(&Value::Null);
                let right = b.get(&order.column).unwrap_or(&Value::Null);
                compare_for_order(left, right, order.direction)
            });
        }
        Ok(state.respond(query, &rows))
    }

    async fn insert(&self, query: &Query, rows: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        let mut state = self.begin(Operation::Insert, query, Some(Value::Array(rows.clone())))?;
        let mut inserted = Vec::with_capacity(rows.len());

        for row in rows {
            let Value::Object(fields) = row else {
                return Err(StoreError::new("Insert rows must be JSON objects").with_status(400));
            };
            let mut stored = state.defaults.get(&query.table).cloned().unwrap_or_default();
            stored.extend(fields);
            state.check_references(&query.table, &stored)?;

            let next = state.next_ids.entry(query.table.clone()).or_insert(1);
            stored.insert("id".to_string(), json!(*next));
            *next += 1;
            inserted.push(stored);
        }

        if let Some(table) = state.tables.get_mut(&query.table) {
            table.extend(inserted.iter().cloned());
        }
        Ok(state.respond(query, &inserted))
    }

    async fn update(&self, query: &Query, patch: Value) -> Result<Vec<Value>, StoreError> {
        let mut state = self.begin(Operation::Update, query, Some(patch.clone()))?;
        let Value::Object(patch) = patch else {
            return Err(StoreError::new("Update body must be a JSON object").with_status(400));
        };

        let indices = state.matching(query);
        let mut updated = Vec::with_capacity(indices.len());
        for i in indices {
            let mut row = state.tables[&query.table][i].clone();
            for (k, v) in &patch {
                if k != "id" {
                    row.insert(k.clone(), v.clone());
                }
            }
            state.check_references(&query.table, &row)?;
            if let Some(table) = state.tables.get_mut(&query.table) {
                table[i] = row.clone();
            }
            updated.push(row);
        }
        Ok(state.respond(query, &updated))
    }

    async fn delete(&self, query: &Query) -> Result<Vec<Value>, StoreError> {
        let mut state = self.begin(Operation::Delete, query, None)?;
        let indices = state.matching(query);
        let mut removed = Vec::with_capacity(indices.len());
        if let Some(table) = state.tables.get_mut(&query.table) {
            for i in indices.into_iter().rev() {
                removed.push(table.remove(i));
            }
        }
        removed.reverse();
        // Representations are built before the cascade so embeds still resolve.
        let response = state.respond(query, &removed);
        state.cascade_delete(&query.table, &removed);
        Ok(response)
    }
}

enum ColumnSpec {
    All,
    Column(String),
    Embed { relation: String, columns: String },
}

/// Split `"*, categorias ( nombre )"` at top-level commas.
fn split_columns(columns: &str) -> Vec<ColumnSpec> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in columns.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => items.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    items.push(current);

    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .map(|item| {
            if item == "*" {
                return ColumnSpec::All;
            }
            match item.split_once('(') {
                Some((relation, rest)) => ColumnSpec::Embed {
                    relation: relation.trim().to_string(),
                    columns: rest.trim_end().trim_end_matches(')').trim().to_string(),
                },
                None => ColumnSpec::Column(item),
            }
        })
        .collect()
}

/// Filter values arrive as JSON; `1` and `"1"` name the same row.
fn loosely_equal(stored: &Value, wanted: &Value) -> bool {
    match (stored, wanted) {
        (Value::Number(a), Value::String(b)) | (Value::String(b), Value::Number(a)) => {
            a.to_string() == *b
        }
        (a, b) => a == b,
    }
}

fn compare_for_order(a: &Value, b: &Value, direction: Direction) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        // nulls last ascending, first descending
        (true, false) => {
            return match direction {
                Direction::Ascending => Ordering::Greater,
                Direction::Descending => Ordering::Less,
            };
        }
        (false, true) => {
            return match direction {
                Direction::Ascending => Ordering::Less,
                Direction::Descending => Ordering::Greater,
            };
        }
        (false, false) => {}
    }
    let ord = match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => collate(x, y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    };
    match direction {
        Direction::Ascending => ord,
        Direction::Descending => ord.reverse(),
    }
}
