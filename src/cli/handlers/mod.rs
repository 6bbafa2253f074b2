use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use log::{debug, info};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::kv_store::FileStore;
use crate::model::config::AppConfig;
use crate::model::task::{Category, TaskId};
use crate::model::theme::Theme;
use crate::ops::codec::{self, ImportOutcome};
use crate::ops::filter::{self, CategoryFilter, StatusFilter, ViewFilters};
use crate::ops::reorder;
use crate::ops::session::Session;
use crate::ops::store::{Patch, TaskUpdate};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Settings shared by every command
struct Context {
    config: AppConfig,
    data_dir: PathBuf,
    json: bool,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Load config for the given CLI flags (also used by `main` to set up logging).
pub fn load_config(cli: &Cli) -> Result<AppConfig, config_io::ConfigError> {
    config_io::read_config(cli.config.as_deref().map(Path::new))
}

pub fn dispatch(cli: Cli, config: AppConfig) -> CmdResult {
    let data_dir = config_io::resolve_data_dir(&config, cli.data_dir.as_deref().map(Path::new));
    debug!("data dir: {}", data_dir.display());
    let ctx = Context {
        config,
        data_dir,
        json: cli.json,
    };

    match cli.command {
        // Read commands
        Commands::List(args) => cmd_list(&ctx, args),
        Commands::Stats => cmd_stats(&ctx),
        Commands::Export(args) => cmd_export(&ctx, args),

        // Write commands
        Commands::Add(args) => cmd_add(&ctx, args),
        Commands::Toggle(args) => cmd_toggle(&ctx, args),
        Commands::Edit(args) => cmd_edit(&ctx, args),
        Commands::Rm(args) => cmd_rm(&ctx, args),
        Commands::ClearCompleted => cmd_clear_completed(&ctx),
        Commands::Mv(args) => cmd_mv(&ctx, args),
        Commands::Import(args) => cmd_import(&ctx, args),
        Commands::Theme(args) => cmd_theme(&ctx, args),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_session(ctx: &Context) -> Result<Session<FileStore>, Box<dyn std::error::Error>> {
    let backend = FileStore::open(&ctx.data_dir)?;
    let debounce = Duration::from_millis(ctx.config.search.debounce_ms);
    Ok(Session::open(backend, debounce)?)
}

fn parse_due(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid due date '{}' (expected YYYY-MM-DD): {}", s, e))
}

fn parse_category(s: &str) -> Option<Category> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(Category::from(s.to_string()))
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Ask a yes/no question on stdin. Anything but y/yes is a no.
fn confirm(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(ctx: &Context, args: ListArgs) -> CmdResult {
    let mut session = open_session(ctx)?;
    session.set_status(args.status.parse::<StatusFilter>()?);
    session.set_category(args.category.parse::<CategoryFilter>()?);
    if let Some(query) = &args.search {
        session.set_search_now(query);
    }

    let today = filter::today();
    let view = session.view(today);
    let label = session.count_label(today);

    if ctx.json {
        let out = ListJson {
            tasks: view.iter().map(|t| task_to_json(t, today)).collect(),
            label,
        };
        return print_json(&out);
    }
    for line in format_listing(&view, &label, today, &ctx.config.display) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_stats(ctx: &Context) -> CmdResult {
    let session = open_session(ctx)?;
    let stats = session.stats(filter::today());
    if ctx.json {
        return print_json(&stats_to_json(&stats));
    }
    for line in format_stats(&stats) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_export(ctx: &Context, args: ExportArgs) -> CmdResult {
    let session = open_session(ctx)?;
    let now = Utc::now();
    let doc = codec::export_document(session.store().all(), now)?;
    let path = match args.out {
        Some(p) => PathBuf::from(p),
        None => PathBuf::from(codec::export_file_name(&ctx.config.export.file_prefix, now)),
    };
    std::fs::write(&path, doc).map_err(|e| format!("could not write {}: {}", path.display(), e))?;
    info!("export written to {}", path.display());
    println!("{}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(ctx: &Context, args: AddArgs) -> CmdResult {
    let due = args.due.as_deref().map(parse_due).transpose()?;
    let category = args.category.as_deref().and_then(parse_category);

    let mut session = open_session(ctx)?;
    let task = session.store_mut().create(&args.text, due, category)?;
    session.close()?;
    if ctx.json {
        return print_json(&task_to_json(&task, filter::today()));
    }
    println!("{}", task.id);
    Ok(())
}

fn cmd_toggle(ctx: &Context, args: IdArgs) -> CmdResult {
    let mut session = open_session(ctx)?;
    let completed = session
        .store_mut()
        .toggle_completed(args.id)?
        .ok_or_else(|| format!("task not found: {}", args.id))?;
    session.close()?;
    println!(
        "{} {}",
        args.id,
        if completed { "completed" } else { "active" }
    );
    Ok(())
}

fn cmd_edit(ctx: &Context, args: EditArgs) -> CmdResult {
    let due_date = match args.due.as_deref() {
        None => Patch::Keep,
        Some(s) => Patch::<NaiveDate>::from_input(s)
            .map_err(|e| format!("invalid due date '{}' (expected YYYY-MM-DD): {}", s, e))?,
    };
    let category = match args.category.as_deref() {
        None => Patch::Keep,
        Some(s) => Patch::<Category>::from_input(s),
    };
    let update = TaskUpdate {
        text: args.text,
        due_date,
        category,
    };

    let mut session = open_session(ctx)?;
    let task = session
        .store_mut()
        .update(args.id, update)?
        .ok_or_else(|| format!("task not found: {}", args.id))?;
    session.close()?;
    if ctx.json {
        return print_json(&task_to_json(&task, filter::today()));
    }
    for line in format_task_lines(&task, filter::today(), &ctx.config.display) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_rm(ctx: &Context, args: IdArgs) -> CmdResult {
    let mut session = open_session(ctx)?;
    session
        .store_mut()
        .delete(args.id)?
        .ok_or_else(|| format!("task not found: {}", args.id))?;
    session.close()?;
    println!("deleted {}", args.id);
    Ok(())
}

fn cmd_clear_completed(ctx: &Context) -> CmdResult {
    let mut session = open_session(ctx)?;
    let removed = session.store_mut().clear_completed()?;
    session.close()?;
    println!(
        "removed {} completed task{}",
        removed,
        if removed == 1 { "" } else { "s" }
    );
    Ok(())
}

fn cmd_mv(ctx: &Context, args: MvArgs) -> CmdResult {
    let mut session = open_session(ctx)?;
    let today = filter::today();
    // Always relocate within the unfiltered list so every task is renumbered.
    let visible: Vec<TaskId> =
        filter::filtered_view(session.store().all(), &ViewFilters::default(), today)
            .iter()
            .map(|t| t.id)
            .collect();
    let target = if args.end { None } else { args.before };
    let order = reorder::relocate(session.store_mut(), &visible, args.id, target)?;
    session.close()?;
    if ctx.json {
        return print_json(&order);
    }
    let at = order.iter().position(|&id| id == args.id).unwrap_or(0);
    println!("moved {} to position {}", args.id, at);
    Ok(())
}

fn cmd_import(ctx: &Context, args: ImportArgs) -> CmdResult {
    let raw = std::fs::read_to_string(&args.path)
        .map_err(|e| format!("could not read {}: {}", args.path, e))?;

    let mut session = open_session(ctx)?;
    let yes = args.yes;
    let outcome = codec::import_document(session.store_mut(), &raw, |plan| {
        yes || confirm(&plan.confirmation_prompt())
    })?;
    session.close()?;
    match outcome {
        ImportOutcome::Imported(n) => println!("imported {} tasks", n),
        ImportOutcome::Declined(_) => println!("import cancelled"),
    }
    Ok(())
}

fn cmd_theme(ctx: &Context, args: ThemeArgs) -> CmdResult {
    let mut session = open_session(ctx)?;
    let theme = match args.action.as_deref() {
        None => session.theme(),
        Some("toggle") => session.toggle_theme()?,
        Some(name) => {
            let theme: Theme = name.parse()?;
            session.set_theme(theme)?;
            theme
        }
    };
    session.close()?;
    println!("{}", theme);
    Ok(())
}
