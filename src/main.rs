use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};

use focusdeck::backend::Backend;
use focusdeck::config::{self, Config};
use focusdeck::focus::{FocusSession, TimerEvent, TimerMode};
use focusdeck::logging;
use focusdeck::routes::Route;
use focusdeck::store::{Priority, Session, Store, Task};
use focusdeck::tasks::editor::format_due;
use focusdeck::tasks::{Checklist, Filter, ReorderOutcome, TaskDraft, TaskList};
use focusdeck::tui;

const PASSWORD_ENV: &str = "FOCUSDECK_PASSWORD";

const DEFAULT_CONFIG: &str = r#"# focusdeck configuration. Every key is optional.

[backend]
# database = "focusdeck.db"
# session_ttl_minutes = 10080

[focus]
# focus_minutes = 25
# short_break_minutes = 5
# long_break_minutes = 15

[notifications]
# enabled = true
# command = "notify-send"
# template = "{mode} finished: {task}"

[logging]
# level = "info"

[theme]
# accent = "cyan"
# drag = "magenta"
"#;

#[derive(Parser)]
#[command(
    name = "focusdeck",
    version = env!("FOCUSDECK_VERSION"),
    about = "Tasks, checklists and a focus timer in your terminal"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the TUI dashboard (default)
    Dashboard {
        /// Start on this route, e.g. /focus/<task-id>
        #[arg(long, default_value = "/")]
        route: String,
    },
    /// Create the config directory and a commented config.toml
    Init,
    /// Create an account and sign in
    Signup {
        email: String,
        #[arg(long, env = PASSWORD_ENV, hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign in to an existing account
    Login {
        email: String,
        #[arg(long, env = PASSWORD_ENV, hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Add a task
    Add {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Due date: "YYYY-MM-DD HH:MM" (local) or RFC 3339
        #[arg(long)]
        due: Option<String>,
        /// high, medium or low
        #[arg(short, long, default_value = "medium")]
        priority: Priority,
    },
    /// Edit a task
    Edit {
        /// Task id or unique id prefix
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
        #[arg(short, long)]
        priority: Option<Priority>,
    },
    /// List tasks in display order
    List {
        /// all, active or completed
        #[arg(short, long, default_value = "all")]
        filter: Filter,
    },
    /// Toggle a task's completed flag
    Toggle { id: String },
    /// Delete a task and its checklist
    Delete { id: String },
    /// Move the task at position FROM to position TO (1-based, as shown by `list`)
    Move {
        from: usize,
        to: usize,
        #[arg(short, long, default_value = "all")]
        filter: Filter,
    },
    /// Show task counts
    Stats,
    /// Manage a task's checklist
    Checklist {
        #[command(subcommand)]
        action: ChecklistAction,
    },
    /// Run the focus timer for a task
    Focus {
        id: String,
        /// focus, short-break or long-break
        #[arg(short, long, default_value = "focus")]
        mode: TimerMode,
        /// Count down in this terminal instead of opening the TUI
        #[arg(long)]
        headless: bool,
    },
    /// Export tasks and checklists as JSON
    Export {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ChecklistAction {
    /// Show a task's checklist
    List { task: String },
    /// Append an item
    Add { task: String, title: String },
    /// Toggle the item at POSITION (1-based)
    Toggle { task: String, position: usize },
    /// Remove the item at POSITION (1-based)
    Remove { task: String, position: usize },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Dashboard {
        route: "/".to_string(),
    });

    let base = config::ensure_dirs()?;
    let config = config::load()?;
    logging::init(&config::log_path()?, &config.logging.level)?;

    if let Commands::Init = command {
        return init(&base);
    }

    let store = Store::open(&config.db_path(&base), config.backend.session_ttl())?;
    store.migrate()?;

    match command {
        Commands::Init => init(&base),
        Commands::Dashboard { route } => tui::run(store, config, Route::parse(&route)),
        Commands::Signup { email, password } => {
            let password = read_password(password)?;
            let session = store.sign_up(&email, &password)?;
            println!("Created account {} and signed in", session.user.email);
            Ok(())
        }
        Commands::Login { email, password } => {
            let password = read_password(password)?;
            let session = store.sign_in(&email, &password)?;
            println!("Signed in as {}", session.user.email);
            Ok(())
        }
        Commands::Logout => {
            store.sign_out()?;
            println!("Signed out");
            Ok(())
        }
        Commands::Whoami => {
            match store.current_session()? {
                Some(session) => println!(
                    "{} (session valid until {})",
                    session.user.email,
                    format_due(session.expires_at)
                ),
                None => println!("Not signed in"),
            }
            Ok(())
        }
        Commands::Add {
            title,
            description,
            due,
            priority,
        } => {
            let (_, mut list) = open_tasks(&store)?;
            let draft = TaskDraft {
                title,
                description,
                due_date: due,
                priority: Some(priority),
            };
            let Some(task) = list.create(&store, &draft, Utc::now())? else {
                bail!("failed to create task, see the log for details");
            };
            println!("Created task '{}' ({})", task.title, short_id(&task.id));
            Ok(())
        }
        Commands::Edit {
            id,
            title,
            description,
            due,
            clear_due,
            priority,
        } => {
            let (_, mut list) = open_tasks(&store)?;
            let task = find_task(&list, &id)?.clone();
            let mut draft = TaskDraft::from_task(&task);
            if let Some(title) = title {
                draft.title = title;
            }
            if let Some(description) = description {
                draft.description = description;
            }
            if clear_due {
                draft.due_date = None;
            } else if due.is_some() {
                draft.due_date = due;
            }
            if priority.is_some() {
                draft.priority = priority;
            }
            if !list.update(&store, &task.id, &draft, Utc::now())? {
                bail!("failed to save task, see the log for details");
            }
            println!("Updated task '{}'", draft.title.trim());
            Ok(())
        }
        Commands::List { filter } => {
            let (_, mut list) = open_tasks(&store)?;
            list.set_filter(filter);
            print_tasks(&list);
            Ok(())
        }
        Commands::Toggle { id } => {
            let (_, mut list) = open_tasks(&store)?;
            let task_id = find_task(&list, &id)?.id.clone();
            if !list.toggle_complete(&store, &task_id) {
                bail!("failed to update task, see the log for details");
            }
            if let Some(task) = list.get(&task_id) {
                let state = if task.completed { "completed" } else { "active" };
                println!("'{}' is now {state}", task.title);
            }
            Ok(())
        }
        Commands::Delete { id } => {
            let (_, mut list) = open_tasks(&store)?;
            let task = find_task(&list, &id)?.clone();
            if !list.delete(&store, &task.id) {
                bail!("failed to delete task, see the log for details");
            }
            println!("Deleted '{}'", task.title);
            Ok(())
        }
        Commands::Move { from, to, filter } => {
            let (_, mut list) = open_tasks(&store)?;
            list.set_filter(filter);
            let len = list.visible().len();
            let (Some(source), Some(dest)) = (position(from, len), position(to, len)) else {
                bail!("positions must be between 1 and {len}");
            };
            match list.reorder(&store, source, Some(dest)) {
                ReorderOutcome::Unchanged => println!("Nothing to move"),
                ReorderOutcome::Persisted { total } => {
                    println!("Moved task {from} to {to} ({total} orders saved)");
                }
                ReorderOutcome::Failed { persisted, total } => {
                    bail!("reorder failed after {persisted} of {total} writes");
                }
            }
            print_tasks(&list);
            Ok(())
        }
        Commands::Stats => {
            let session = require_session(&store)?;
            let stats = store.task_stats(&session.user.id)?;
            println!("Tasks for {}:", session.user.email);
            println!("  Total:     {}", stats.total);
            println!("  Completed: {}", stats.completed);
            println!("  Pending:   {}", stats.pending());
            println!("  Progress:  {}%", stats.completion_pct());
            Ok(())
        }
        Commands::Checklist { action } => run_checklist(&store, action),
        Commands::Focus { id, mode, headless } => {
            let (_, list) = open_tasks(&store)?;
            let task_id = find_task(&list, &id)?.id.clone();
            drop(list);
            if headless {
                run_headless_focus(&store, &config, &task_id, mode)
            } else {
                tui::run(store, config, Route::Focus(task_id))
            }
        }
        Commands::Export { output } => {
            let (session, list) = open_tasks(&store)?;
            let mut tasks = Vec::with_capacity(list.all().len());
            for task in list.all() {
                let checklist = store.list_checklist(&task.id)?;
                tasks.push(serde_json::json!({ "task": task, "checklist": checklist }));
            }
            let export = serde_json::json!({
                "user": session.user.email,
                "exported_at": Utc::now().to_rfc3339(),
                "stats": list.stats(),
                "tasks": tasks,
            });
            let json = serde_json::to_string_pretty(&export)?;

            match output {
                Some(path) => {
                    write_export(&path, &json)?;
                    println!("Exported {} tasks to {}", list.all().len(), path.display());
                }
                None => println!("{json}"),
            }
            Ok(())
        }
    }
}

fn init(base: &Path) -> Result<()> {
    let path = config::config_path()?;
    if path.exists() {
        println!("focusdeck already initialized at {}", base.display());
    } else {
        fs::write(&path, DEFAULT_CONFIG)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("focusdeck initialized at {}", base.display());
    }
    Ok(())
}

fn require_session(store: &Store) -> Result<Session> {
    store
        .current_session()?
        .context("not signed in; run `focusdeck login <email>` first")
}

fn open_tasks(store: &Store) -> Result<(Session, TaskList)> {
    let session = require_session(store)?;
    let list = TaskList::open(store, &session.user.id)?;
    Ok((session, list))
}

/// Look a task up by full id or unique id prefix.
fn find_task<'a>(list: &'a TaskList, id: &str) -> Result<&'a Task> {
    if let Some(task) = list.get(id) {
        return Ok(task);
    }
    let matches: Vec<&Task> = list
        .all()
        .iter()
        .filter(|t| t.id.starts_with(id))
        .collect();
    match matches.as_slice() {
        [task] => Ok(*task),
        [] => bail!("no task matches '{id}'"),
        _ => bail!("'{id}' matches {} tasks, use a longer prefix", matches.len()),
    }
}

/// 1-based CLI position to a 0-based index.
fn position(n: usize, len: usize) -> Option<usize> {
    (1..=len).contains(&n).then(|| n - 1)
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn read_password(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn format_task_line(index: usize, task: &Task) -> String {
    let mut line = format!(
        "{:>3}. {} [{}] {}",
        index + 1,
        task.symbol(),
        &task.priority.label()[..1],
        task.title
    );
    if let Some(due) = task.due_date {
        line.push_str(&format!("  due {}", format_due(due)));
    }
    line.push_str(&format!("  ({})", short_id(&task.id)));
    line
}

fn print_tasks(list: &TaskList) {
    let visible = list.visible();
    if visible.is_empty() {
        println!("No {} tasks.", list.filter().label().to_lowercase());
        return;
    }
    for (i, task) in visible.iter().enumerate() {
        println!("{}", format_task_line(i, task));
    }
}

fn run_checklist(store: &Store, action: ChecklistAction) -> Result<()> {
    let (_, list) = open_tasks(store)?;
    let task_ref = match &action {
        ChecklistAction::List { task }
        | ChecklistAction::Add { task, .. }
        | ChecklistAction::Toggle { task, .. }
        | ChecklistAction::Remove { task, .. } => task,
    };
    let task = find_task(&list, task_ref)?.clone();
    let mut checklist = Checklist::open(store, &task.id);

    let item_id = |checklist: &Checklist, n: usize| -> Result<String> {
        let idx = position(n, checklist.items.len())
            .with_context(|| format!("'{}' has no checklist item {n}", task.title))?;
        Ok(checklist.items[idx].id.clone())
    };

    match action {
        ChecklistAction::List { .. } => {}
        ChecklistAction::Add { title, .. } => {
            if title.trim().is_empty() {
                bail!("checklist item title cannot be blank");
            }
            checklist.add(store, &title);
        }
        ChecklistAction::Toggle { position, .. } => {
            let id = item_id(&checklist, position)?;
            checklist.toggle(store, &id);
        }
        ChecklistAction::Remove { position, .. } => {
            let id = item_id(&checklist, position)?;
            checklist.remove(store, &id);
        }
    }

    let (done, total) = checklist.progress();
    println!("{} ({done}/{total})", task.title);
    for (i, item) in checklist.items.iter().enumerate() {
        let mark = if item.completed { "x" } else { " " };
        println!("{:>3}. [{mark}] {}", i + 1, item.title);
    }
    Ok(())
}

fn run_headless_focus(store: &Store, config: &Config, task_id: &str, mode: TimerMode) -> Result<()> {
    let notifier = Box::new(config.notifications.clone());
    let Some(mut session) = FocusSession::open(store, task_id, config.focus, mode, notifier)?
    else {
        bail!("task '{task_id}' not found");
    };

    println!(
        "{} on '{}' ({}), Ctrl+C to stop",
        mode.label(),
        session.task().title,
        session.timer().display()
    );
    if session.start(Instant::now()).is_none() {
        let mut stdout = io::stdout();
        loop {
            let wait = session
                .until_next_tick(Instant::now())
                .unwrap_or(Duration::from_secs(1));
            thread::sleep(wait);
            if let Some(TimerEvent::Completed(_)) = session.poll(Instant::now()) {
                break;
            }
            write!(stdout, "\r{}  ", session.timer().display())?;
            stdout.flush()?;
        }
    }
    println!("\r{} finished", mode.label());
    session.close();
    Ok(())
}

fn write_export(path: &Path, json: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}
