use serde::{Deserialize, Serialize};

use super::RowId;

/// Column names of the `categorias` table.
pub mod columns {
    pub const ID: &str = "id";
    pub const NAME: &str = "nombre";
    pub const OWNER: &str = "user_id";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRow {
    pub id: RowId,
    pub nombre: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: RowId,
    pub name: String,
    pub owner_id: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.nombre,
            owner_id: row.user_id,
        }
    }
}

impl From<&Category> for CategoryRow {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            nombre: category.name.clone(),
            user_id: category.owner_id.clone(),
        }
    }
}

/// Write payload. `user_id` is only sent on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryPayload {
    pub nombre: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Look up a category name in a held list.
pub fn name_of(categories: &[Category], id: RowId) -> Option<&str> {
    categories
        .iter()
        .find(|c| c.id == id)
        .map(|c| c.name.as_str())
}
