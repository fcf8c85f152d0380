//! Command implementations for the CLI interface.
//!
//! Each handler runs one full cycle: check the caller's session, load the
//! whole collection, mutate it, write it back and print the outcome.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use chrono::{Local, NaiveDate};
use clap::{CommandFactory, Subcommand};
use clap_complete::{generate, Shell};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

use crate::access::{Identity, SessionStore};
use crate::board::{filter_tasks, Saved, TaskBoard};
use crate::cli::Cli;
use crate::config::Config;
use crate::fields::{ListFilter, Urgency};
use crate::store::{FileStore, GistStore, TaskStore};
use crate::task::TaskFields;
use crate::tui::run::run_tui;
use crate::util::{format_stats, parse_due_input, print_table};

#[derive(Subcommand)]
pub enum Commands {
    /// Identify yourself with your organisation email.
    Login {
        email: String,
    },

    /// Forget the current session.
    Logout,

    /// Show who you are logged in as.
    Whoami,

    /// Unlock the task list (recipient only).
    Unlock {
        /// Shared secret; read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },

    /// Assign a task to the recipient.
    Assign {
        /// Task name.
        name: String,
        /// Details about the task.
        #[arg(long)]
        desc: Option<String>,
        /// Urgency: low | medium | high | critical.
        #[arg(long, value_enum, default_value_t = Urgency::Low)]
        urgency: Urgency,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", "in Nd", "friday", "eow".
        #[arg(long, default_value = "today")]
        by: String,
    },

    /// List your tasks with totals.
    Tasks {
        #[arg(long, value_enum, default_value_t = ListFilter::All)]
        filter: ListFilter,
    },

    /// Add a task to your own list.
    Add {
        name: String,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long, value_enum, default_value_t = Urgency::Low)]
        urgency: Urgency,
        #[arg(long, default_value = "today")]
        by: String,
    },

    /// Edit name, description, urgency or due date of a task.
    Edit {
        /// Task ID.
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long, value_enum)]
        urgency: Option<Urgency>,
        #[arg(long)]
        by: Option<String>,
    },

    /// Mark a task done.
    Complete {
        id: String,
    },

    /// Mark a task not done.
    Reopen {
        id: String,
    },

    /// Launch the interactive task list.
    Ui,

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Everything a handler needs: config, sessions and where tasks live.
pub struct Context {
    pub config: Config,
    pub sessions: SessionStore,
    pub db: Option<PathBuf>,
}

impl Context {
    pub fn new(config: Config, data_dir: &Path, db: Option<PathBuf>) -> Self {
        Self {
            config,
            sessions: SessionStore::load(&data_dir.join("sessions.json")),
            db,
        }
    }

    fn open_board(&self) -> Result<TaskBoard<Box<dyn TaskStore>>> {
        let store: Box<dyn TaskStore> = match &self.db {
            Some(path) => Box::new(FileStore::new(path)),
            None => Box::new(GistStore::new(&self.config.store).context("cannot reach the task store")?),
        };
        Ok(TaskBoard::open(store))
    }

    fn save_sessions(&self) -> Result<()> {
        self.sessions.save().context("failed to save session")
    }

    fn caller(&mut self) -> Result<Identity> {
        Ok(self.sessions.current().caller()?)
    }

    fn recipient(&mut self) -> Result<Identity> {
        let access = self.config.access.clone();
        Ok(self.sessions.current().require_recipient(&access)?)
    }
}

pub fn run(ctx: &mut Context, command: Commands) -> Result<()> {
    match command {
        Commands::Login { email } => cmd_login(ctx, &email),
        Commands::Logout => cmd_logout(ctx),
        Commands::Whoami => cmd_whoami(ctx),
        Commands::Unlock { password } => cmd_unlock(ctx, password),
        Commands::Assign { name, desc, urgency, by } => cmd_assign(ctx, name, desc, urgency, &by),
        Commands::Tasks { filter } => cmd_tasks(ctx, filter),
        Commands::Add { name, desc, urgency, by } => cmd_add(ctx, name, desc, urgency, &by),
        Commands::Edit { id, name, desc, urgency, by } => cmd_edit(ctx, &id, name, desc, urgency, by),
        Commands::Complete { id } => cmd_set_completed(ctx, &id, true),
        Commands::Reopen { id } => cmd_set_completed(ctx, &id, false),
        Commands::Ui => cmd_ui(ctx),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_by(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    match parse_due_input(input, today) {
        Some(d) => Ok(d),
        None => bail!("Could not understand due date '{input}'"),
    }
}

fn report<T>(saved: &Saved<T>) {
    if let Some(e) = &saved.warning {
        eprintln!("Warning: failed to save tasks: {e}");
    }
}

pub fn cmd_login(ctx: &mut Context, email: &str) -> Result<()> {
    let access = ctx.config.access.clone();
    let result = ctx.sessions.current().login(email, &access);
    ctx.save_sessions()?;
    let identity = result?;
    println!("Welcome, {}!", identity.as_str());
    if identity.as_str() == access.recipient {
        println!("Run `assign-task unlock` to open your task list.");
    }
    Ok(())
}

pub fn cmd_logout(ctx: &mut Context) -> Result<()> {
    match ctx.sessions.end_current() {
        Some(_) => println!("Logged out."),
        None => println!("No active session."),
    }
    ctx.save_sessions()
}

pub fn cmd_whoami(ctx: &mut Context) -> Result<()> {
    let session = ctx.sessions.current().clone();
    match session.caller() {
        Ok(identity) => {
            let lock = if session.elevated { "unlocked" } else { "locked" };
            println!("{} ({lock})", identity.as_str());
        }
        Err(_) => println!("Not logged in."),
    }
    if let Some(dir) = crate::logging::log_dir() {
        println!("Logs: {}", dir.display());
    }
    Ok(())
}

pub fn cmd_unlock(ctx: &mut Context, password: Option<String>) -> Result<()> {
    let secret = match password {
        Some(p) => p,
        None => prompt_secret("Password: ")?,
    };
    let access = ctx.config.access.clone();
    let result = ctx.sessions.current().unlock(&secret, &access);
    ctx.save_sessions()?;
    result?;
    println!("Unlocked.");
    Ok(())
}

/// Prompt for a secret without echoing it. Piped input is read as one line.
fn prompt_secret(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    if !io::stdin().is_terminal() {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        return Ok(line.trim_end_matches(['\r', '\n']).to_string());
    }

    enable_raw_mode()?;
    let result = collect_secret(event::read);
    disable_raw_mode()?;
    println!();
    Ok(result?)
}

/// Gather typed characters until Enter. Esc and Ctrl-C abort.
fn collect_secret(mut next_event: impl FnMut() -> io::Result<Event>) -> io::Result<String> {
    let mut secret = String::new();
    loop {
        let Event::Key(key) = next_event()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(secret),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "unlock cancelled"));
            }
            KeyCode::Esc => {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "unlock cancelled"));
            }
            KeyCode::Backspace => {
                secret.pop();
            }
            KeyCode::Char(c) => secret.push(c),
            _ => {}
        }
    }
}

/// Assign view: any authenticated caller, fixed recipient.
pub fn cmd_assign(
    ctx: &mut Context,
    name: String,
    desc: Option<String>,
    urgency: Urgency,
    by: &str,
) -> Result<()> {
    let caller = ctx.caller()?;
    let today = today();
    let fields = TaskFields::new(name, urgency, parse_by(by, today)?)
        .with_description(desc.unwrap_or_default());
    let recipient = ctx.config.access.recipient.clone();

    let mut board = ctx.open_board()?;
    let saved = board.create(&fields, caller.as_str(), &recipient, today)?;
    report(&saved);
    println!("Task Assigned! {} has been sent to {}", saved.value.id, recipient);
    Ok(())
}

/// My-tasks view: recipient only, after unlock.
pub fn cmd_tasks(ctx: &mut Context, filter: ListFilter) -> Result<()> {
    ctx.recipient()?;
    let board = ctx.open_board()?;
    let today = today();

    println!("{}", format_stats(&board.stats(today)));
    println!();
    if board.tasks().is_empty() {
        println!("No tasks yet. Add one or have someone assign one to you!");
        return Ok(());
    }

    print_table(&filter_tasks(board.tasks(), filter, today), today);
    Ok(())
}

pub fn cmd_add(
    ctx: &mut Context,
    name: String,
    desc: Option<String>,
    urgency: Urgency,
    by: &str,
) -> Result<()> {
    let me = ctx.recipient()?;
    let today = today();
    let fields = TaskFields::new(name, urgency, parse_by(by, today)?)
        .with_description(desc.unwrap_or_default());

    let mut board = ctx.open_board()?;
    let saved = board.create(&fields, me.as_str(), me.as_str(), today)?;
    report(&saved);
    println!("Added task {}", saved.value.id);
    Ok(())
}

pub fn cmd_edit(
    ctx: &mut Context,
    id: &str,
    name: Option<String>,
    desc: Option<String>,
    urgency: Option<Urgency>,
    by: Option<String>,
) -> Result<()> {
    ctx.recipient()?;
    let today = today();
    let mut board = ctx.open_board()?;
    let Some(task) = board.get(id) else {
        bail!("Task with ID {id} not found");
    };

    let mut fields = TaskFields::from_task(task, today);
    if let Some(name) = name {
        fields.task_name = name;
    }
    if let Some(desc) = desc {
        fields.description = desc;
    }
    if let Some(urgency) = urgency {
        fields.urgency = urgency;
    }
    if let Some(by) = by {
        fields.by_when = parse_by(&by, today)?;
    }

    let saved = board.update_fields(id, &fields)?;
    report(&saved);
    println!("Updated task {id}");
    Ok(())
}

pub fn cmd_set_completed(ctx: &mut Context, id: &str, value: bool) -> Result<()> {
    ctx.recipient()?;
    let mut board = ctx.open_board()?;
    let saved = board.set_completed(id, value)?;
    report(&saved);
    println!("{} task {id}", if value { "Completed" } else { "Reopened" });
    Ok(())
}

pub fn cmd_ui(ctx: &mut Context) -> Result<()> {
    ctx.recipient()?;
    let board = ctx.open_board()?;
    let session = ctx.sessions.current();
    let result = run_tui(board, session);
    ctx.save_sessions()?;
    result.context("UI error")
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "assign-task", &mut io::stdout());
}
