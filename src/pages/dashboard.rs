use crate::access::{categories, tasks};
use crate::core::RowId;
use crate::core::category::Category;
use crate::core::task::Task;
use crate::error::{StoreError, ValidationError};
use crate::remote::RemoteStore;

use super::task_form::TaskForm;
use super::{Decision, PageStatus, PendingConfirmation};

/// The task being edited and its form buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEdit {
    pub id: RowId,
    pub form: TaskForm,
}

/// State behind the task dashboard: the user's tasks and categories, the
/// create form, at most one task in edit, and at most one pending delete.
#[derive(Debug, Clone)]
pub struct DashboardPage {
    owner_id: String,
    pub status: PageStatus,
    pub error: Option<String>,
    /// Inline form problem; nothing was sent.
    pub invalid: Option<ValidationError>,
    pub tasks: Vec<Task>,
    pub categories: Vec<Category>,
    pub form: TaskForm,
    pub editing: Option<TaskEdit>,
    pub pending_delete: Option<PendingConfirmation<RowId>>,
}

impl DashboardPage {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            status: PageStatus::Loading,
            error: None,
            invalid: None,
            tasks: Vec::new(),
            categories: Vec::new(),
            form: TaskForm::default(),
            editing: None,
            pending_delete: None,
        }
    }

    pub fn task(&self, id: RowId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn fail(&mut self, err: StoreError) {
        log::warn!("Dashboard: {}", err);
        self.error = Some(err.message);
    }

    /// Fetch categories and tasks together. On failure both lists end up
    /// empty and the banner is set.
    pub async fn load(&mut self, store: &dyn RemoteStore) {
        self.status = PageStatus::Loading;
        self.error = None;

        let owner = self.owner_id.clone();
        let fetched = futures::try_join!(
            categories::list_categories(store, &owner),
            tasks::list_tasks(store, &owner),
        );
        match fetched {
            Ok((cats, list)) => {
                self.categories = cats;
                self.tasks = list;
                self.form.ensure_category(&self.categories);
            }
            Err(e) => {
                self.categories.clear();
                self.tasks.clear();
                self.editing = None;
                self.pending_delete = None;
                self.fail(e);
            }
        }
        self.status = PageStatus::Ready;
    }

    fn insert_sorted(&mut self, task: Task) {
        let key = task.due_key();
        let pos = self.tasks.partition_point(|t| t.due_key() <= key);
        self.tasks.insert(pos, task);
    }

    /// Submit the create form. Returns the stored task on success.
    pub async fn create_task(&mut self, store: &dyn RemoteStore) -> Option<Task> {
        let fields = match self.form.validate() {
            Ok(f) => f,
            Err(e) => {
                self.invalid = Some(e);
                return None;
            }
        };
        self.invalid = None;

        match tasks::create_task(store, &fields, &self.owner_id).await {
            Ok(task) => {
                self.insert_sorted(task.clone());
                self.form.reset();
                Some(task)
            }
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    /// Open `id` for editing, closing any other edit. False if `id` is not held.
    pub fn start_edit(&mut self, id: RowId) -> bool {
        let Some(form) = self.task(id).map(TaskForm::from_task) else {
            return false;
        };
        self.editing = Some(TaskEdit { id, form });
        self.invalid = None;
        true
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
        self.invalid = None;
    }

    pub fn edit_form_mut(&mut self) -> Option<&mut TaskForm> {
        self.editing.as_mut().map(|e| &mut e.form)
    }

    /// Send the edit. The returned record replaces the held one; the edit
    /// stays open if the store refuses it.
    pub async fn save_edit(&mut self, store: &dyn RemoteStore) -> Option<Task> {
        let edit = self.editing.as_ref()?;
        let id = edit.id;
        let fields = match edit.form.validate() {
            Ok(f) => f,
            Err(e) => {
                self.invalid = Some(e);
                return None;
            }
        };
        self.invalid = None;

        match tasks::update_task(store, id, &fields).await {
            Ok(updated) => {
                self.tasks.retain(|t| t.id != id);
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

    /// Flip a task's completion. The new value is applied locally only
    /// once the store has accepted it.
    pub async fn toggle(&mut self, store: &dyn RemoteStore, id: RowId) -> bool {
        let Some(current) = self.task(id).map(|t| t.completed) else {
            self.error = Some(format!("Task {} is not loaded", id));
            return false;
        };
        let target = !current;
        match tasks::toggle_task_status(store, id, target).await {
            Ok(()) => {
                if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
                    task.completed = target;
                }
                true
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    /// First step of a delete: ask. Nothing is sent yet.
    pub fn request_delete(&mut self, id: RowId) -> Option<&PendingConfirmation<RowId>> {
        let title = self.task(id)?.title.clone();
        self.pending_delete = Some(PendingConfirmation {
            target: id,
            prompt: format!("Are you sure you want to delete the task '{}'?", title),
        });
        self.pending_delete.as_ref()
    }

    /// Second step: send the delete on confirm, drop it on cancel.
    /// Returns true only when a task was deleted.
    pub async fn resolve_delete(&mut self, store: &dyn RemoteStore, decision: Decision) -> bool {
        let Some(pending) = self.pending_delete.take() else {
            return false;
        };
        if decision == Decision::Cancel {
            log::debug!("Delete of task {} cancelled", pending.target);
            return false;
        }

        match tasks::delete_task(store, pending.target).await {
            Ok(()) => {
                self.tasks.retain(|t| t.id != pending.target);
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
    use crate::remote::{Operation, TASKS_TABLE};

    async fn seeded() -> (MemoryStore, DashboardPage) {
        let store = MemoryStore::new();
        let work = categories::create_category(&store, "Work", "u1").await.unwrap();
        let mut page = DashboardPage::new("u1");
        page.load(&store).await;
        page.form.title = "Ship".into();
        page.form.due_date = "2025-06-13".into();
        assert_eq!(page.form.category_id, Some(work.id));
        page.create_task(&store).await.unwrap();
        (store, page)
    }

    #[tokio::test]
    async fn load_populates_and_becomes_ready() {
        let (store, _) = seeded().await;
        let mut page = DashboardPage::new("u1");
        assert_eq!(page.status, PageStatus::Loading);
        page.load(&store).await;
        assert_eq!(page.status, PageStatus::Ready);
        assert!(page.error.is_none());
        assert_eq!(page.categories.len(), 1);
        assert_eq!(page.tasks.len(), 1);
        assert_eq!(page.tasks[0].category_name.as_deref(), Some("Work"));
    }

    #[tokio::test]
    async fn failed_load_leaves_tasks_empty() {
        let (store, mut page) = seeded().await;
        store.fail_on(Operation::Select, TASKS_TABLE, "connection refused");
        page.load(&store).await;
        assert_eq!(page.status, PageStatus::Ready);
        assert_eq!(page.error.as_deref(), Some("connection refused"));
        assert!(page.tasks.is_empty());

        store.clear_failures();
        page.load(&store).await;
        assert!(page.error.is_none());
        assert_eq!(page.tasks.len(), 1);
    }

    #[tokio::test]
    async fn invalid_form_sends_nothing() {
        let (store, mut page) = seeded().await;
        let before = store.request_count();
        page.form.title = "  ".into();
        assert!(page.create_task(&store).await.is_none());
        assert_eq!(page.invalid, Some(ValidationError::MissingTitle));
        assert_eq!(store.request_count(), before);
    }

    #[tokio::test]
    async fn created_tasks_stay_in_due_order() {
        let (store, mut page) = seeded().await;
        page.form.title = "Earlier".into();
        page.form.due_date = "2025-01-01".into();
        page.create_task(&store).await.unwrap();
        page.form.title = "Someday".into();
        page.create_task(&store).await.unwrap();

        let titles: Vec<&str> = page.tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Earlier", "Ship", "Someday"]);
        assert!(page.form.title.is_empty());
    }

    #[tokio::test]
    async fn failed_create_leaves_list_unchanged() {
        let (store, mut page) = seeded().await;
        store.fail_on(Operation::Insert, TASKS_TABLE, "new row violates row-level security policy");
        page.form.title = "Nope".into();
        assert!(page.create_task(&store).await.is_none());
        assert_eq!(page.tasks.len(), 1);
        assert_eq!(
            page.error.as_deref(),
            Some("new row violates row-level security policy")
        );
        page.dismiss_error();
        assert!(page.error.is_none());
    }

    #[tokio::test]
    async fn one_edit_at_a_time_and_trusts_response() {
        let (store, mut page) = seeded().await;
        page.form.title = "Other".into();
        let other = page.create_task(&store).await.unwrap();
        let first = page.tasks.iter().find(|t| t.title == "Ship").unwrap().id;

        assert!(page.start_edit(first));
        assert!(page.start_edit(other.id));
        assert_eq!(page.editing.as_ref().map(|e| e.id), Some(other.id));

        page.edit_form_mut().unwrap().title = "Renamed".into();
        let selects_before = store
            .requests()
            .iter()
            .filter(|r| r.operation == Operation::Select)
            .count();
        let updated = page.save_edit(&store).await.unwrap();
        assert_eq!(updated.title, "Renamed");
        assert!(page.editing.is_none());
        assert!(page.tasks.iter().any(|t| t.title == "Renamed"));
        let selects_after = store
            .requests()
            .iter()
            .filter(|r| r.operation == Operation::Select)
            .count();
        assert_eq!(selects_before, selects_after);
    }

    #[tokio::test]
    async fn toggle_flips_after_success_only() {
        let (store, mut page) = seeded().await;
        let id = page.tasks[0].id;

        assert!(page.toggle(&store, id).await);
        assert!(page.tasks[0].completed);
        assert_eq!(store.rows(TASKS_TABLE)[0]["estado"], true);

        store.fail_on(Operation::Update, TASKS_TABLE, "timeout");
        assert!(!page.toggle(&store, id).await);
        assert!(page.tasks[0].completed);
        assert_eq!(page.error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn delete_needs_confirmation() {
        let (store, mut page) = seeded().await;
        let id = page.tasks[0].id;
        let before = store.request_count();

        let prompt = page.request_delete(id).unwrap().prompt.clone();
        assert!(prompt.contains("Ship"));
        assert_eq!(store.request_count(), before);

        assert!(!page.resolve_delete(&store, Decision::Cancel).await);
        assert_eq!(store.request_count(), before);
        assert_eq!(page.tasks.len(), 1);

        page.request_delete(id);
        assert!(page.resolve_delete(&store, Decision::Confirm).await);
        assert!(page.tasks.is_empty());
        assert!(store.rows(TASKS_TABLE).is_empty());
        assert!(page.pending_delete.is_none());
    }

    #[tokio::test]
    async fn failed_delete_keeps_task() {
        let (store, mut page) = seeded().await;
        let id = page.tasks[0].id;
        store.fail_on(Operation::Delete, TASKS_TABLE, "permission denied for table tareas");

        page.request_delete(id);
        assert!(!page.resolve_delete(&store, Decision::Confirm).await);
        assert_eq!(page.tasks.len(), 1);
        assert_eq!(page.tasks[0].id, id);
        assert_eq!(
            page.error.as_deref(),
            Some("permission denied for table tareas")
        );
        assert!(page.pending_delete.is_none());
        assert_eq!(store.rows(TASKS_TABLE).len(), 1);
    }

    #[tokio::test]
    async fn failed_save_keeps_edit_and_task() {
        let (store, mut page) = seeded().await;
        let id = page.tasks[0].id;
        let held = page.tasks[0].clone();
        store.fail_on(Operation::Update, TASKS_TABLE, "timeout");

        page.start_edit(id);
        page.edit_form_mut().unwrap().title = "Renamed".into();
        assert!(page.save_edit(&store).await.is_none());
        assert_eq!(page.error.as_deref(), Some("timeout"));
        assert_eq!(page.editing.as_ref().map(|e| e.id), Some(id));
        assert_eq!(page.editing.as_ref().unwrap().form.title, "Renamed");
        assert_eq!(page.tasks, vec![held]);
    }

    #[tokio::test]
    async fn failed_load_drops_edit_and_pending_delete() {
        let (store, mut page) = seeded().await;
        let id = page.tasks[0].id;
        page.start_edit(id);
        page.request_delete(id);

        store.fail_on(Operation::Select, TASKS_TABLE, "connection refused");
        page.load(&store).await;
        assert!(page.editing.is_none());
        assert!(page.pending_delete.is_none());
    }
}
