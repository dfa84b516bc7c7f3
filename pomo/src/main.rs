use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pomo_core::config::{load_config, Config};
use pomo_core::task::{self, matches_all, Tags, Task, TaskFilter};
use pomo_core::SqliteStore;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod session;

#[derive(Parser)]
#[command(name = "pomo")]
#[command(about = "Pomodoro task timer", long_about = None)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database path, overrides the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database
    Init,
    /// Create a task without starting it
    Create(TaskArgs),
    /// Run the intervals of an existing task
    Begin { id: i64 },
    /// Create a task and run it
    Start(TaskArgs),
    /// List tasks matching all filters (word or key=value)
    Get { filters: Vec<String> },
    /// Change a stored task; recorded intervals are kept
    Edit(EditArgs),
    /// Delete a task and its intervals
    Delete { id: i64 },
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
struct TaskArgs {
    /// Length of each interval, e.g. 25m or 1h30m
    #[arg(short, long, default_value = "25m", value_parser = parse_duration_arg)]
    duration: Duration,
    /// Number of intervals
    #[arg(short, long, default_value_t = 4)]
    pomodoros: u32,
    /// Tag as key=value, may be repeated
    #[arg(short, long = "tag")]
    tags: Vec<String>,
    message: String,
}

#[derive(Args)]
struct EditArgs {
    id: i64,
    /// New description
    #[arg(short, long)]
    message: Option<String>,
    /// New interval length
    #[arg(short, long, value_parser = parse_duration_arg)]
    duration: Option<Duration>,
    /// New number of intervals
    #[arg(short, long)]
    pomodoros: Option<u32>,
    /// Replaces all tags when given, may be repeated
    #[arg(short, long = "tag")]
    tags: Vec<String>,
}

fn parse_duration_arg(s: &str) -> std::result::Result<Duration, String> {
    task::parse_duration(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => load_config()?,
    };
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    config.ensure_paths()?;
    init_logging(&config.log_path)?;

    let store = Arc::new(
        SqliteStore::open(&config.db_path)
            .with_context(|| format!("Failed to open database at {:?}", config.db_path))?,
    );

    match cli.command {
        Commands::Init => {
            println!("Initialized {}", config.db_path.display());
        }
        Commands::Create(args) => {
            let task = create_task(&store, args)?;
            println!("{}", task.id);
        }
        Commands::Begin { id } => {
            let task = store
                .get_task(id)
                .with_context(|| format!("Failed to load task {}", id))?;
            session::run(task, store, &config).await?;
        }
        Commands::Start(args) => {
            let task = create_task(&store, args)?;
            session::run(task, store, &config).await?;
        }
        Commands::Get { filters } => {
            let filters = TaskFilter::parse_all(&filters)?;
            for task in store.list_tasks()? {
                if matches_all(&task, &filters) {
                    println!("{}", task_line(&task));
                }
            }
        }
        Commands::Edit(args) => {
            let mut task = store
                .get_task(args.id)
                .with_context(|| format!("Failed to load task {}", args.id))?;
            apply_edit(&mut task, args)?;
            store
                .update_task(&task)
                .with_context(|| format!("Failed to update task {}", task.id))?;
            println!("{}", task_line(&task));
        }
        Commands::Delete { id } => {
            store
                .delete_task(id)
                .with_context(|| format!("Failed to delete task {}", id))?;
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn create_task(store: &SqliteStore, args: TaskArgs) -> Result<Task> {
    let tags = Tags::parse(&args.tags)?;
    let mut task = Task::new(args.message, args.duration, args.pomodoros, tags);
    task.validate()?;
    store.create_task(&mut task).context("Failed to save task")?;
    Ok(task)
}

fn apply_edit(task: &mut Task, args: EditArgs) -> Result<()> {
    if let Some(message) = args.message {
        task.message = message;
    }
    if let Some(duration) = args.duration {
        task.duration = duration;
    }
    if let Some(pomodoros) = args.pomodoros {
        task.n_pomodoros = pomodoros;
    }
    if !args.tags.is_empty() {
        task.tags = Tags::parse(&args.tags)?;
    }
    task.validate()?;
    Ok(())
}

fn task_line(task: &Task) -> String {
    let tags: Vec<String> = task.tags.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!(
        "{}\t{}/{}\t{}m\t{}\t{}",
        task.id,
        task.completed(),
        task.n_pomodoros,
        task.duration.as_secs() / 60,
        task.message,
        tags.join(",")
    )
}

// Logs go to a file so they never interleave with the session output
fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file at {:?}", path))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
