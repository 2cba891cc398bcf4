use crate::access::categories;
use crate::core::{RowId, collate};
use crate::core::category::Category;
use crate::error::{StoreError, ValidationError};
use crate::remote::RemoteStore;

use super::{Decision, PageStatus, PendingConfirmation};

/// The category being renamed and its name buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryEdit {
    pub id: RowId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct CategoriesPage {
    owner_id: String,
    pub status: PageStatus,
    pub error: Option<String>,
    pub invalid: Option<ValidationError>,
    pub categories: Vec<Category>,
    pub new_name: String,
    pub editing: Option<CategoryEdit>,
    pub pending_delete: Option<PendingConfirmation<RowId>>,
}

fn valid_name(name: &str) -> Result<&str, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        Err(ValidationError::EmptyCategoryName)
    } else {
        Ok(name)
    }
}

impl CategoriesPage {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            status: PageStatus::Loading,
            error: None,
            invalid: None,
            categories: Vec::new(),
            new_name: String::new(),
            editing: None,
            pending_delete: None,
        }
    }

    pub fn category(&self, id: RowId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    fn fail(&mut self, err: StoreError) {
        log::warn!("Categories: {}", err);
        self.error = Some(err.message);
    }

    fn insert_sorted(&mut self, category: Category) {
        let pos = self
            .categories
            .partition_point(|c| collate(&c.name, &category.name).is_le());
        self.categories.insert(pos, category);
    }

    pub async fn load(&mut self, store: &dyn RemoteStore) {
        self.status = PageStatus::Loading;
        self.error = None;
        match categories::list_categories(store, &self.owner_id).await {
            Ok(list) => self.categories = list,
            Err(e) => {
                self.categories.clear();
                self.editing = None;
                self.pending_delete = None;
                self.fail(e);
            }
        }
        self.status = PageStatus::Ready;
    }

    pub async fn create(&mut self, store: &dyn RemoteStore) -> Option<Category> {
        let name = match valid_name(&self.new_name) {
            Ok(n) => n.to_string(),
            Err(e) => {
                self.invalid = Some(e);
                return None;
            }
        };
        self.invalid = None;

        match categories::create_category(store, &name, &self.owner_id).await {
            Ok(category) => {
                self.insert_sorted(category.clone());
                self.new_name.clear();
                Some(category)
            }
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    /// Open `id` for renaming, closing any other edit.
    pub fn start_edit(&mut self, id: RowId) -> bool {
        let Some(name) = self.category(id).map(|c| c.name.clone()) else {
            return false;
        };
        self.editing = Some(CategoryEdit { id, name });
        self.invalid = None;
        true
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
        self.invalid = None;
    }

    pub async fn save_edit(&mut self, store: &dyn RemoteStore) -> Option<Category> {
        let edit = self.editing.as_ref()?;
        let id = edit.id;
        let name = match valid_name(&edit.name) {
            Ok(n) => n.to_string(),
            Err(e) => {
                self.invalid = Some(e);
                return None;
            }
        };
        self.invalid = None;

        match categories::update_category(store, id, &name).await {
            Ok(updated) => {
                self.categories.retain(|c| c.id != id);
                self.insert_sorted(updated.clone());
                self.editing = None;
                Some(updated)
            }
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    /// Ask before deleting; the prompt warns that the tasks go too.
    pub fn request_delete(&mut self, id: RowId) -> Option<&PendingConfirmation<RowId>> {
        let name = self.category(id)?.name.clone();
        self.pending_delete = Some(PendingConfirmation {
            target: id,
            prompt: format!(
                "Deleting the category '{}' will also delete all of its tasks. Continue?",
                name
            ),
        });
        self.pending_delete.as_ref()
    }

    pub async fn resolve_delete(&mut self, store: &dyn RemoteStore, decision: Decision) -> bool {
        let Some(pending) = self.pending_delete.take() else {
            return false;
        };
        if decision == Decision::Cancel {
            log::debug!("Delete of category {} cancelled", pending.target);
            return false;
        }

        match categories::delete_category(store, pending.target).await {
            Ok(()) => {
                self.categories.retain(|c| c.id != pending.target);
                if self.editing.as_ref().is_some_and(|e| e.id == pending.target) {
                    self.editing = None;
                }
                true
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::MemoryStore;
    use crate::remote::{CATEGORIES_TABLE, Operation};

    async fn page_with(store: &MemoryStore, names: &[&str]) -> CategoriesPage {
        let mut page = CategoriesPage::new("u1");
        for name in names {
            page.new_name = name.to_string();
            page.create(store).await.unwrap();
        }
        page
    }

    #[tokio::test]
    async fn created_categories_stay_sorted() {
        let store = MemoryStore::new();
        let page = page_with(&store, &["Work", "Errands", "Home"]).await;
        let names: Vec<&str> = page.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Errands", "Home", "Work"]);
        assert!(page.new_name.is_empty());
    }

    #[tokio::test]
    async fn blank_name_is_rejected_locally() {
        let store = MemoryStore::new();
        let mut page = CategoriesPage::new("u1");
        page.new_name = "   ".into();
        assert!(page.create(&store).await.is_none());
        assert_eq!(page.invalid, Some(ValidationError::EmptyCategoryName));
        assert_eq!(store.request_count(), 0);
    }

    #[tokio::test]
    async fn rename_through_single_edit_pointer() {
        let store = MemoryStore::new();
        let mut page = page_with(&store, &["Work", "Home"]).await;
        let work = page.categories.iter().find(|c| c.name == "Work").unwrap().id;
        let home = page.categories.iter().find(|c| c.name == "Home").unwrap().id;

        assert!(page.start_edit(work));
        assert!(page.start_edit(home));
        assert_eq!(page.editing.as_ref().map(|e| e.id), Some(home));

        page.editing.as_mut().unwrap().name = "Zoo".into();
        page.save_edit(&store).await.unwrap();
        let names: Vec<&str> = page.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Work", "Zoo"]);
        assert!(page.editing.is_none());
    }

    #[tokio::test]
    async fn delete_warns_before_any_request() {
        let store = MemoryStore::new();
        let mut page = page_with(&store, &["Work"]).await;
        let id = page.categories[0].id;
        let before = store.request_count();

        let pending = page.request_delete(id).unwrap();
        assert!(pending.prompt.contains("will also delete all of its tasks"));
        assert_eq!(store.request_count(), before);

        page.resolve_delete(&store, Decision::Cancel).await;
        assert_eq!(store.request_count(), before);
        assert_eq!(page.categories.len(), 1);

        page.request_delete(id);
        assert!(page.resolve_delete(&store, Decision::Confirm).await);
        assert!(page.categories.is_empty());
        assert_eq!(store.requests().last().unwrap().operation, Operation::Delete);
    }

    #[tokio::test]
    async fn failed_rename_keeps_edit_open() {
        let store = MemoryStore::new();
        let mut page = page_with(&store, &["Work"]).await;
        let id = page.categories[0].id;
        store.fail_on(Operation::Update, CATEGORIES_TABLE, "permission denied");

        page.start_edit(id);
        page.editing.as_mut().unwrap().name = "Job".into();
        assert!(page.save_edit(&store).await.is_none());
        assert_eq!(page.error.as_deref(), Some("permission denied"));
        assert!(page.editing.is_some());
        assert_eq!(page.categories[0].name, "Work");
    }

    #[tokio::test]
    async fn failed_delete_keeps_category() {
        let store = MemoryStore::new();
        let mut page = page_with(&store, &["Work"]).await;
        let id = page.categories[0].id;
        store.fail_on(Operation::Delete, CATEGORIES_TABLE, "permission denied");

        page.request_delete(id);
        assert!(!page.resolve_delete(&store, Decision::Confirm).await);
        assert_eq!(page.categories.len(), 1);
        assert_eq!(page.categories[0].id, id);
        assert_eq!(page.error.as_deref(), Some("permission denied"));
        assert!(page.pending_delete.is_none());
    }

    #[tokio::test]
    async fn local_order_matches_reload_for_mixed_case() {
        let store = MemoryStore::new();
        let mut page = page_with(&store, &["Banana", "apple", "Cherry"]).await;
        let local: Vec<String> = page.categories.iter().map(|c| c.name.clone()).collect();
        assert_eq!(local, vec!["apple", "Banana", "Cherry"]);

        page.load(&store).await;
        let reloaded: Vec<String> = page.categories.iter().map(|c| c.name.clone()).collect();
        assert_eq!(local, reloaded);
    }
}
