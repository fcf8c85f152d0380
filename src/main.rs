//! # assign-task - single-team task assignment
//!
//! Anyone on the company domain can assign a task to the team lead; the team
//! lead logs in, unlocks their view with a password, and works through the
//! list from the CLI or an interactive terminal user interface (TUI).
//!
//! ## Quick Start
//!
//! ```bash
//! # Identify yourself (must be a company address)
//! assign-task login jane.doe@mathco.com
//!
//! # Assign a task to the team lead
//! assign-task assign "Review Q4 deck" --urgency high --by friday
//!
//! # Team lead: unlock, then list or open the TUI
//! assign-task unlock
//! assign-task tasks --filter due-soon
//! assign-task ui
//! ```
//!
//! ## Storage
//!
//! Tasks are one JSON array stored in a GitHub gist file (`[store]` in the
//! config). Every change reloads, mutates and writes the whole document back,
//! so the last writer wins. Pass `--db <file>` to use a local JSON file instead.
//!
//! Config, sessions and logs live in `~/.assign-task/`.

use std::path::PathBuf;

use clap::Parser;

pub mod access;
pub mod board;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod fields;
pub mod logging;
pub mod store;
pub mod task;
pub mod util;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod enums;
    pub mod input;
    pub mod run;
    pub mod task_form;
    pub mod utils;
}

use cli::Cli;
use cmd::Context;
use config::Config;

fn main() {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let data_dir = config_path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(config::data_dir);

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init_logging(&config.log.level, &data_dir.join("logs")) {
        eprintln!("Warning: logging disabled: {e}");
    }

    let mut ctx = Context::new(config, &data_dir, cli.db);
    if let Err(e) = cmd::run(&mut ctx, cli.command) {
        log::error!("event=command_failed error={e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
