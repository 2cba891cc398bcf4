use std::io::{BufRead, Write};
use std::process::ExitCode;

use clap::Parser;

mod cli;
mod render;

use cli::{CategoryAction, Cli, Command, Credentials, TaskAction};
use tareas::access::tasks;
use tareas::config::AppConfig;
use tareas::core::RowId;
use tareas::core::category::Category;
use tareas::core::session::{Session, SessionProvider};
use tareas::error::{Error, Result};
use tareas::pages::auth::{AuthMode, AuthPage};
use tareas::pages::categories::CategoriesPage;
use tareas::pages::dashboard::DashboardPage;
use tareas::pages::{Decision, scoping_key};
use tareas::remote::RemoteStore;
use tareas::remote::auth::{AuthClient, SessionManager};
use tareas::remote::keyring::KeyringSessionStore;
use tareas::remote::postgrest::StoreClient;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(config.debug_logging || args.verbose);

    match run(args.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::NotSignedIn) => {
            eprintln!("Not signed in. Run `tareas login --email <EMAIL>` first.");
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// Log to the systemd user journal (`journalctl --user -t tareas -f`).
// Crate targets at info/debug (per config), everything else at warn.
fn init_logging(debug: bool) {
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with("tareas") {
                let max = if tareas::debug_logging() {
                    log::LevelFilter::Debug
                } else {
                    log::LevelFilter::Info
                };
                metadata.level() <= max
            } else {
                metadata.level() <= log::LevelFilter::Warn
            }
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }
        fn flush(&self) {
            self.inner.flush();
        }
    }

    tareas::set_debug_logging(debug);

    let journal = match systemd_journal_logger::JournalLog::new() {
        Ok(j) => j.with_syslog_identifier("tareas".to_string()),
        // No journald (containers, other platforms): run without a logger.
        Err(_) => return,
    };
    if log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })).is_ok() {
        // Global max must be Debug so crate debug logs can pass when enabled
        log::set_max_level(log::LevelFilter::Debug);
    }
}

async fn run(command: Command, config: &AppConfig) -> Result<()> {
    let sessions = SessionManager::new(
        Box::new(AuthClient::new(config)?),
        Box::new(KeyringSessionStore::new(config.base_url())),
    );
    let client = StoreClient::new(config)?;

    match command {
        Command::Login(creds) => authenticate(&sessions, AuthMode::Login, creds).await,
        Command::Register(creds) => authenticate(&sessions, AuthMode::Register, creds).await,
        Command::Logout => {
            sessions.restore().await?;
            sessions.sign_out().await?;
            println!("Signed out.");
            Ok(())
        }
        Command::Whoami => {
            let session = signed_in(&sessions).await?;
            println!(
                "{} ({})",
                session.user.email.as_deref().unwrap_or("no email"),
                session.user.id
            );
            Ok(())
        }
        Command::Tasks { action } => {
            let session = signed_in(&sessions).await?;
            let store = client.authenticated(&session.access_token);
            let owner = scoping_key(&sessions)?;
            run_tasks(&store, &owner, action.unwrap_or(TaskAction::List { pending: false })).await
        }
        Command::Categories { action } => {
            let session = signed_in(&sessions).await?;
            let store = client.authenticated(&session.access_token);
            let owner = scoping_key(&sessions)?;
            run_categories(&store, &owner, action.unwrap_or(CategoryAction::List)).await
        }
    }
}

async fn signed_in(sessions: &SessionManager) -> Result<Session> {
    sessions.restore().await?.ok_or(Error::NotSignedIn)
}

async fn authenticate(sessions: &SessionManager, mode: AuthMode, creds: Credentials) -> Result<()> {
    let mut page = AuthPage::new(mode);
    page.email = creds.email;
    page.password = creds.password;

    let session = page.submit(sessions).await;
    if let Some(notice) = &page.notice {
        println!("{}", notice);
    }
    if let Some(err) = page.error.take() {
        return Err(Error::Page(err));
    }
    if let Some(session) = session {
        println!(
            "Signed in as {}.",
            session.user.email.as_deref().unwrap_or(&session.user.id)
        );
    }
    Ok(())
}

/// Surface whatever the page recorded as the command's error.
fn page_outcome(error: Option<String>, invalid: Option<tareas::error::ValidationError>) -> Result<()> {
    if let Some(invalid) = invalid {
        return Err(invalid.into());
    }
    match error {
        Some(message) => Err(Error::Page(message)),
        None => Ok(()),
    }
}

/// Accept a category id or a (case-insensitive) name.
fn resolve_category(categories: &[Category], wanted: &str) -> Result<RowId> {
    let wanted = wanted.trim();
    if let Ok(id) = wanted.parse::<RowId>() {
        if categories.iter().any(|c| c.id == id) {
            return Ok(id);
        }
    }
    categories
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(wanted))
        .map(|c| c.id)
        .ok_or_else(|| Error::Page(format!("No category '{}'", wanted)))
}

fn ask(prompt: &str, assume_yes: bool) -> Result<Decision> {
    if assume_yes {
        return Ok(Decision::Confirm);
    }
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Decision::Confirm,
        _ => Decision::Cancel,
    })
}

async fn run_tasks(store: &dyn RemoteStore, owner: &str, action: TaskAction) -> Result<()> {
    let today = chrono::Local::now().date_naive();

    if let TaskAction::Show { id } = action {
        let task = tasks::get_task(store, id).await?;
        println!("{}", render::task_card(&task, &[]));
        return Ok(());
    }

    let mut page = DashboardPage::new(owner);
    page.load(store).await;
    page_outcome(page.error.take(), None)?;

    match action {
        TaskAction::List { pending } => {
            let shown: Vec<_> = page
                .tasks
                .iter()
                .filter(|t| !pending || !t.completed)
                .collect();
            println!("{}", render::task_list(&shown, &page.categories, today));
            Ok(())
        }
        TaskAction::Add {
            title,
            description,
            due,
            category,
        } => {
            if let Some(wanted) = category {
                page.form.category_id = Some(resolve_category(&page.categories, &wanted)?);
            }
            page.form.title = title;
            page.form.description = description.unwrap_or_default();
            page.form.due_date = due.unwrap_or_default();

            let created = page.create_task(store).await;
            page_outcome(page.error.take(), page.invalid.take())?;
            if let Some(task) = created {
                println!("{}", render::task_line(&task, &page.categories, today));
            }
            Ok(())
        }
        TaskAction::Edit {
            id,
            title,
            description,
            due,
            category,
        } => {
            if !page.start_edit(id) {
                return Err(Error::Page(format!("No task with id {}", id)));
            }
            let category_id = category
                .map(|wanted| resolve_category(&page.categories, &wanted))
                .transpose()?;
            if let Some(form) = page.edit_form_mut() {
                if let Some(title) = title {
                    form.title = title;
                }
                if let Some(description) = description {
                    form.description = description;
                }
                if let Some(due) = due {
                    form.due_date = due;
                }
                if let Some(category_id) = category_id {
                    form.category_id = Some(category_id);
                }
            }

            let updated = page.save_edit(store).await;
            page_outcome(page.error.take(), page.invalid.take())?;
            if let Some(task) = updated {
                println!("{}", render::task_line(&task, &page.categories, today));
            }
            Ok(())
        }
        TaskAction::Toggle { id } => {
            page.toggle(store, id).await;
            page_outcome(page.error.take(), None)?;
            if let Some(task) = page.task(id) {
                println!("{}", render::task_line(task, &page.categories, today));
            }
            Ok(())
        }
        TaskAction::Rm { id, yes } => {
            let Some(prompt) = page.request_delete(id).map(|p| p.prompt.clone()) else {
                return Err(Error::Page(format!("No task with id {}", id)));
            };
            let decision = ask(&prompt, yes)?;
            let deleted = page.resolve_delete(store, decision).await;
            page_outcome(page.error.take(), None)?;
            if deleted {
                println!("Deleted task #{}.", id);
            } else {
                println!("Nothing deleted.");
            }
            Ok(())
        }
        TaskAction::Show { .. } => Ok(()),
    }
}

async fn run_categories(store: &dyn RemoteStore, owner: &str, action: CategoryAction) -> Result<()> {
    let mut page = CategoriesPage::new(owner);
    page.load(store).await;
    page_outcome(page.error.take(), None)?;

    match action {
        CategoryAction::List => {
            println!("{}", render::category_list(&page.categories));
            Ok(())
        }
        CategoryAction::Add { name } => {
            page.new_name = name;
            let created = page.create(store).await;
            page_outcome(page.error.take(), page.invalid.take())?;
            if let Some(category) = created {
                println!("Created category #{} {}.", category.id, category.name);
            }
            Ok(())
        }
        CategoryAction::Rename { id, name } => {
            if !page.start_edit(id) {
                return Err(Error::Page(format!("No category with id {}", id)));
            }
            if let Some(edit) = page.editing.as_mut() {
                edit.name = name;
            }
            let renamed = page.save_edit(store).await;
            page_outcome(page.error.take(), page.invalid.take())?;
            if let Some(category) = renamed {
                println!("Renamed category #{} to {}.", category.id, category.name);
            }
            Ok(())
        }
        CategoryAction::Rm { id, yes } => {
            let Some(prompt) = page.request_delete(id).map(|p| p.prompt.clone()) else {
                return Err(Error::Page(format!("No category with id {}", id)));
            };
            let decision = ask(&prompt, yes)?;
            let deleted = page.resolve_delete(store, decision).await;
            page_outcome(page.error.take(), None)?;
            if deleted {
                println!("Deleted category #{} and its tasks.", id);
            } else {
                println!("Nothing deleted.");
            }
            Ok(())
        }
    }
}
