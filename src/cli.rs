use clap::{Args, Parser, Subcommand};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "tareas")]
#[command(about = "Track your tasks and categories")]
#[command(version)]
pub struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in with email and password
    Login(Credentials),
    /// Create an account
    Register(Credentials),
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Work with tasks (lists them when no action is given)
    Tasks {
        #[command(subcommand)]
        action: Option<TaskAction>,
    },
    /// Work with categories (lists them when no action is given)
    Categories {
        #[command(subcommand)]
        action: Option<CategoryAction>,
    },
}

#[derive(Args, Debug)]
pub struct Credentials {
    #[arg(short, long)]
    pub email: String,
    /// Falls back to TAREAS_PASSWORD
    #[arg(short, long, env = "TAREAS_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Subcommand, Debug)]
pub enum TaskAction {
    /// List tasks by due date
    List {
        /// Hide completed tasks
        #[arg(long)]
        pending: bool,
    },
    /// Add a task
    Add {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Due date, YYYY-MM-DD
        #[arg(long, value_name = "DATE")]
        due: Option<String>,
        /// Category id or name (defaults to the first category)
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show one task
    Show { id: i64 },
    /// Change fields of a task
    Edit {
        id: i64,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// Due date, YYYY-MM-DD; an empty value clears it
        #[arg(long, value_name = "DATE")]
        due: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Mark a task done, or pending again
    Toggle { id: i64 },
    /// Delete a task
    Rm {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CategoryAction {
    /// List categories by name
    List,
    /// Add a category
    Add { name: String },
    /// Rename a category
    Rename { id: i64, name: String },
    /// Delete a category and all of its tasks
    Rm {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
