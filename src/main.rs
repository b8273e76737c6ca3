use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Result, eyre};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use tasklist::render::render;
use tasklist::{Backend, Config, KvPersister, Overrides, SortCriterion, TaskListStore};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "tasklist - a single-list task manager")]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/tasklist/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the persisted list
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Storage backend: sqlite, file or memory
    #[arg(short, long)]
    backend: Option<String>,

    /// Key the list is stored under
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show all tasks
    List,

    /// Add a task to the top of the list
    Add { text: String },

    /// Replace the text of a task (by position or id prefix)
    Edit { task: String, text: String },

    /// Delete a task (by position or id prefix)
    Delete { task: String },

    /// Delete every task
    Clear,

    /// Sort the list: a-z, z-a, newest or oldest
    Sort { criterion: String },

    /// Interactive session reading commands from stdin
    Shell,
}

fn main() -> Result<()> {
    // Setup tracing on stderr so it never mixes with the list
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let overrides = Overrides {
        config: cli.config,
        backend: cli.backend.as_deref().map(str::parse::<Backend>).transpose()?,
        data_dir: cli.data_dir,
        storage_key: cli.key,
    };
    let config = Config::load(&overrides)?;

    // Open store
    let kv = config.backend.open(&config.data_dir)?;
    let mut store = TaskListStore::open(KvPersister::new(kv, config.storage_key.clone()));
    store.set_validate_edits(config.validate_edits);

    match cli.command.unwrap_or(Commands::List) {
        Commands::List => {}
        Commands::Add { text } => {
            if let Err(e) = store.create(&text) {
                eprintln!("{}", e.to_string().red());
                process::exit(1);
            }
        }
        Commands::Edit { task, text } => {
            let id = resolve_id(&store, &task)?;
            store.begin_edit(&id);
            store.change_draft(text);
            if let Err(e) = store.submit_edit() {
                eprintln!("{}", e.to_string().red());
                process::exit(1);
            }
        }
        Commands::Delete { task } => {
            let id = resolve_id(&store, &task)?;
            store.delete(&id);
        }
        Commands::Clear => {
            store.clear_all();
        }
        Commands::Sort { criterion } => {
            store.sort(criterion.parse()?);
        }
        Commands::Shell => return run_shell(&mut store, &config),
    }

    print!("{}", render(&store, &config.date_format));
    Ok(())
}

fn resolve_id(store: &TaskListStore, selector: &str) -> Result<String> {
    store
        .resolve(selector)
        .map(|t| t.id.clone())
        .ok_or_else(|| eyre!("No single task matches '{}'", selector))
}

const SHELL_HELP: &str = "\
commands:
  add <text>      add a task
  edit <task>     start editing a task (position or id prefix)
  draft <text>    replace the text being edited
  save            apply the edit
  cancel          discard the edit
  rm <task>       delete a task
  clear           delete every task
  sort <order>    a-z, z-a, newest, oldest
  list            show the list
  quit            leave";

fn run_shell(store: &mut TaskListStore, config: &Config) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    print!("{}", render(store, &config.date_format));
    println!("type 'help' for commands");

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end_matches(['\n', '\r']);
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

        match command {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                println!("{}", SHELL_HELP);
                continue;
            }
            "list" => {}
            "add" => {
                store.set_input(rest);
                if let Err(e) = store.submit_input() {
                    // Kept on the store and shown by the render below
                    debug!(error = %e, "shell: add rejected");
                }
            }
            "edit" => match resolve_id(store, rest) {
                Ok(id) => {
                    store.begin_edit(&id);
                }
                Err(e) => {
                    println!("{}", e.to_string().red());
                    continue;
                }
            },
            "draft" => {
                if !store.change_draft(rest) {
                    println!("{}", "not editing a task".red());
                    continue;
                }
            }
            "save" => {
                if let Err(e) = store.submit_edit() {
                    debug!(error = %e, "shell: save rejected, still editing");
                }
            }
            "cancel" => store.cancel_edit(),
            "rm" | "delete" => match resolve_id(store, rest) {
                Ok(id) => {
                    store.delete(&id);
                }
                Err(e) => {
                    println!("{}", e.to_string().red());
                    continue;
                }
            },
            "clear" => {
                store.clear_all();
            }
            "sort" => match rest.parse::<SortCriterion>() {
                Ok(criterion) => {
                    store.sort(criterion);
                }
                Err(e) => {
                    println!("{}", e.to_string().red());
                    continue;
                }
            },
            other => {
                println!("{}", format!("unknown command '{}', type 'help'", other).red());
                continue;
            }
        }

        print!("{}", render(store, &config.date_format));
    }

    Ok(())
}
