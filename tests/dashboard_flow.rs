use async_trait::async_trait;
use serde_json::json;

use tareas::Error;
use tareas::core::session::{Session, SessionProvider, User};
use tareas::error::AuthError;
use tareas::pages::auth::{AuthMode, AuthPage};
use tareas::pages::categories::CategoriesPage;
use tareas::pages::dashboard::DashboardPage;
use tareas::pages::{Decision, PageStatus, scoping_key};
use tareas::remote::auth::{Authenticator, SessionManager, SignUpOutcome};
use tareas::remote::keyring::EphemeralSessionStore;
use tareas::remote::memory::MemoryStore;
use tareas::remote::{CATEGORIES_TABLE, Operation, TASKS_TABLE};

struct OneUser;

fn session_for(id: &str) -> Session {
    Session {
        access_token: format!("token-{}", id),
        refresh_token: None,
        expires_at: None,
        user: User {
            id: id.to_string(),
            email: Some(format!("{}@example.com", id)),
        },
    }
}

#[async_trait]
impl Authenticator for OneUser {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if email == "u1@example.com" && password == "secret" {
            Ok(session_for("u1"))
        } else {
            Err(AuthError::Rejected("Invalid login credentials".into()))
        }
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<SignUpOutcome, AuthError> {
        Ok(SignUpOutcome::ConfirmationRequired {
            email: email.to_string(),
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<Session, AuthError> {
        Err(AuthError::Rejected("Invalid Refresh Token".into()))
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), AuthError> {
        Ok(())
    }
}

fn manager() -> SessionManager {
    SessionManager::new(Box::new(OneUser), Box::<EphemeralSessionStore>::default())
}

#[tokio::test]
async fn signed_in_user_creates_a_task() {
    let sessions = manager();
    assert!(matches!(scoping_key(&sessions), Err(Error::NotSignedIn)));

    let mut auth = AuthPage::new(AuthMode::Login);
    auth.email = "u1@example.com".into();
    auth.password = "secret".into();
    assert!(auth.submit(&sessions).await.is_some());
    let owner = scoping_key(&sessions).unwrap();
    assert_eq!(owner, "u1");

    let store = MemoryStore::new();
    let mut cats = CategoriesPage::new(owner.as_str());
    cats.load(&store).await;
    cats.new_name = "Work".into();
    let work = cats.create(&store).await.unwrap();
    assert_eq!(work.id, 1);

    let mut page = DashboardPage::new(owner.as_str());
    page.load(&store).await;
    assert_eq!(page.status, PageStatus::Ready);
    assert_eq!(page.form.category_id, Some(1));

    page.form.title = "Ship".into();
    page.form.due_date = "2025-06-13".into();
    let task = page.create_task(&store).await.unwrap();

    assert_eq!(task.category_name.as_deref(), Some("Work"));
    assert_eq!(page.tasks.len(), 1);
    assert_eq!(
        store.rows(TASKS_TABLE),
        vec![json!({
            "id": task.id,
            "titulo": "Ship",
            "descripcion": null,
            "fecha": "2025-06-13",
            "categoria_id": 1,
            "estado": false,
            "user_id": "u1",
        })]
    );
}

#[tokio::test]
async fn other_users_rows_stay_invisible() {
    let store = MemoryStore::new();

    let mut mine = CategoriesPage::new("u1");
    mine.new_name = "Work".into();
    mine.create(&store).await.unwrap();

    let mut theirs = CategoriesPage::new("u2");
    theirs.new_name = "Garden".into();
    theirs.create(&store).await.unwrap();

    let mut page = DashboardPage::new("u1");
    page.load(&store).await;
    assert_eq!(page.categories.len(), 1);
    assert_eq!(page.categories[0].name, "Work");

    for req in store.requests() {
        if req.operation == Operation::Select {
            assert!(req.filters.iter().any(|(col, v)| col == "user_id" && v == "u1"));
        }
    }
}

#[tokio::test]
async fn deleting_a_category_takes_its_tasks() {
    let store = MemoryStore::new();

    let mut cats = CategoriesPage::new("u1");
    cats.new_name = "Work".into();
    let work = cats.create(&store).await.unwrap();
    cats.new_name = "Home".into();
    cats.create(&store).await.unwrap();

    let mut page = DashboardPage::new("u1");
    page.load(&store).await;
    page.form.title = "Ship".into();
    page.form.category_id = Some(work.id);
    page.create_task(&store).await.unwrap();

    assert!(cats.request_delete(work.id).is_some());
    assert!(cats.resolve_delete(&store, Decision::Confirm).await);

    assert_eq!(store.rows(CATEGORIES_TABLE).len(), 1);
    assert!(store.rows(TASKS_TABLE).is_empty());

    page.load(&store).await;
    assert!(page.tasks.is_empty());
    assert_eq!(page.categories.len(), 1);
}

#[tokio::test]
async fn failed_load_shows_banner_and_no_tasks() {
    let store = MemoryStore::new();
    store.fail_on(Operation::Select, TASKS_TABLE, "connection refused");

    let mut page = DashboardPage::new("u1");
    page.load(&store).await;

    assert_eq!(page.status, PageStatus::Ready);
    assert_eq!(page.error.as_deref(), Some("connection refused"));
    assert!(page.tasks.is_empty());
}

#[tokio::test]
async fn sign_out_removes_access() {
    let sessions = manager();
    sessions.sign_in("u1@example.com", "secret").await.unwrap();
    assert_eq!(sessions.user_id().as_deref(), Some("u1"));

    sessions.sign_out().await.unwrap();
    assert!(sessions.current().is_none());
    assert!(sessions.restore().await.unwrap().is_none());
}
