//! Category CRUD against the `categorias` table.
//!
//! Deleting a category also deletes its tasks; the store does that, and
//! callers are expected to have warned the user.

use crate::core::RowId;
use crate::core::category::{Category, CategoryPayload, CategoryRow, columns};
use crate::error::StoreError;
use crate::remote::{CATEGORIES_TABLE, Direction, Query, RemoteStore, decode_rows, decode_single};

fn payload(name: &str, owner_id: Option<&str>) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(CategoryPayload {
        nombre: name.to_string(),
        user_id: owner_id.map(str::to_string),
    })
    .map_err(|e| StoreError::new(format!("Failed to encode row: {}", e)))
}

/// The owner's categories sorted by name.
pub async fn list_categories(
    store: &dyn RemoteStore,
    owner_id: &str,
) -> Result<Vec<Category>, StoreError> {
    let query = Query::table(CATEGORIES_TABLE)
        .eq(columns::OWNER, owner_id)
        .order(columns::NAME, Direction::Ascending);
    let rows: Vec<CategoryRow> = decode_rows(store.select(&query).await?)?;
    Ok(rows.into_iter().map(Category::from).collect())
}

pub async fn create_category(
    store: &dyn RemoteStore,
    name: &str,
    owner_id: &str,
) -> Result<Category, StoreError> {
    let query = Query::table(CATEGORIES_TABLE);
    let row: CategoryRow =
        decode_single(store.insert(&query, vec![payload(name, Some(owner_id))?]).await?)?;
    log::info!("Created category {} '{}'", row.id, row.nombre);
    Ok(row.into())
}

pub async fn update_category(
    store: &dyn RemoteStore,
    id: RowId,
    name: &str,
) -> Result<Category, StoreError> {
    let query = Query::table(CATEGORIES_TABLE).eq(columns::ID, id);
    let row: CategoryRow = decode_single(store.update(&query, payload(name, None)?).await?)?;
    log::info!("Renamed category {} to '{}'", id, row.nombre);
    Ok(row.into())
}

pub async fn delete_category(store: &dyn RemoteStore, id: RowId) -> Result<(), StoreError> {
    let query = Query::table(CATEGORIES_TABLE)
        .select(columns::ID)
        .eq(columns::ID, id);
    if store.delete(&query).await?.is_empty() {
        return Err(StoreError::no_rows(CATEGORIES_TABLE, id));
    }
    log::info!("Deleted category {} and its tasks", id);
    Ok(())
}
