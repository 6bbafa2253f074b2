use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tl", about = concat!("tasklist v", env!("CARGO_PKG_VERSION"), " - a local task list"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different data directory
    #[arg(short = 'C', long = "data-dir", global = true)]
    pub data_dir: Option<String>,

    /// Read config from this file instead of the default location
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a task
    Add(AddArgs),
    /// List tasks, filtered and in display order
    List(ListArgs),
    /// Toggle a task between active and completed
    Toggle(IdArgs),
    /// Edit a task's text, due date, or category
    Edit(EditArgs),
    /// Delete a task
    Rm(IdArgs),
    /// Delete every completed task
    ClearCompleted,
    /// Move a task before another one, or to the end
    Mv(MvArgs),
    /// Write all tasks to a JSON export file
    Export(ExportArgs),
    /// Replace all tasks with the contents of an export file
    Import(ImportArgs),
    /// Show or change the theme preference
    Theme(ThemeArgs),
    /// Show task counts
    Stats,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task text (may contain line breaks)
    pub text: String,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,
    /// Category (work, personal, shopping, health, academic, other, or any label)
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Status filter (all, active, completed, overdue)
    #[arg(long, default_value = "all")]
    pub status: String,
    /// Category filter (all, or a category)
    #[arg(long, default_value = "all")]
    pub category: String,
    /// Case-insensitive text search
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Args)]
pub struct IdArgs {
    /// Task ID
    pub id: i64,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID
    pub id: i64,
    /// New text
    #[arg(long)]
    pub text: Option<String>,
    /// New due date (YYYY-MM-DD), or "" to clear
    #[arg(long)]
    pub due: Option<String>,
    /// New category, or "" to clear
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Args)]
pub struct MvArgs {
    /// Task ID to move
    pub id: i64,
    /// Place before this task ID
    #[arg(long, conflicts_with = "end", required_unless_present = "end")]
    pub before: Option<i64>,
    /// Place at the end of the list
    #[arg(long)]
    pub end: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Output path (default: <prefix>-YYYY-MM-DD.json in the current directory)
    #[arg(long)]
    pub out: Option<String>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Export file to import
    pub path: String,
    /// Replace without asking
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct ThemeArgs {
    /// light, dark, or toggle (omit to show the current theme)
    pub action: Option<String>,
}
