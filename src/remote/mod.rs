//! Remote store boundary.
//!
//! Everything the application persists goes through [`RemoteStore`], a small
//! PostgREST-shaped interface: select/insert/update/delete against a named
//! table with equality filters, ordering and embedded relations. Rows cross
//! the boundary as JSON and are decoded into typed records by the callers.

pub mod auth;
pub mod keyring;
pub mod memory;
pub mod postgrest;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::StoreError;

pub const TASKS_TABLE: &str = "tareas";
pub const CATEGORIES_TABLE: &str = "categorias";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// A table-scoped request description shared by every operation.
///
/// For writes, `columns` is the representation returned after the write.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub columns: String,
    pub filters: Vec<(String, Value)>,
    pub order: Option<Order>,
}

impl Query {
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push((column.to_string(), value.into()));
        self
    }

    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            direction,
        });
        self
    }

    /// PostgREST query-string parameters for this query.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), compact_columns(&self.columns))];
        for (column, value) in &self.filters {
            params.push((column.clone(), format!("eq.{}", filter_literal(value))));
        }
        if let Some(order) = &self.order {
            let dir = match order.direction {
                Direction::Ascending => "asc.nullslast",
                Direction::Descending => "desc.nullsfirst",
            };
            params.push(("order".to_string(), format!("{}.{}", order.column, dir)));
        }
        params
    }
}

fn compact_columns(columns: &str) -> String {
    columns.chars().filter(|c| !c.is_whitespace()).collect()
}

fn filter_literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

/// A handle on the remote store. Every call either yields rows or a
/// [`StoreError`]; there is no retry and no caching behind it.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, StoreError>;

    /// Insert `rows` into `query.table`, returning them as `query.columns`.
    async fn insert(&self, query: &Query, rows: Vec<Value>) -> Result<Vec<Value>, StoreError>;

    /// Patch every row matching `query.filters`, returning the updated rows.
    async fn update(&self, query: &Query, patch: Value) -> Result<Vec<Value>, StoreError>;

    /// Remove every row matching `query.filters`, returning the removed rows.
    async fn delete(&self, query: &Query) -> Result<Vec<Value>, StoreError>;
}

pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, StoreError> {
    rows.into_iter().map(decode_row).collect()
}

pub fn decode_row<T: DeserializeOwned>(row: Value) -> Result<T, StoreError> {
    serde_json::from_value(row)
        .map_err(|e| StoreError::new(format!("Unexpected row shape from store: {}", e)))
}

/// Exactly one row, mirroring PostgREST's single-object responses.
pub fn decode_single<T: DeserializeOwned>(mut rows: Vec<Value>) -> Result<T, StoreError> {
    if rows.len() != 1 {
        return Err(
            StoreError::new("JSON object requested, multiple (or no) rows returned")
                .with_code("PGRST116")
                .with_status(406),
        );
    }
    decode_row(rows.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_follow_postgrest_syntax() {
        let q = Query::table(TASKS_TABLE)
            .select("*, categorias ( nombre )")
            .eq("user_id", "u1")
            .order("fecha", Direction::Ascending);
        assert_eq!(
            q.to_params(),
            vec![
                ("select".to_string(), "*,categorias(nombre)".to_string()),
                ("user_id".to_string(), "eq.u1".to_string()),
                ("order".to_string(), "fecha.asc.nullslast".to_string()),
            ]
        );
    }

    #[test]
    fn numeric_and_bool_filters_render_bare() {
        let q = Query::table(CATEGORIES_TABLE).eq("id", 12).eq("archived", false);
        let params = q.to_params();
        assert_eq!(params[1], ("id".to_string(), "eq.12".to_string()));
        assert_eq!(params[2], ("archived".to_string(), "eq.false".to_string()));
    }

    #[test]
    fn single_rejects_empty_result() {
        let err = decode_single::<serde_json::Value>(Vec::new()).unwrap_err();
        assert_eq!(err.code.as_deref(), Some("PGRST116"));
    }
}
