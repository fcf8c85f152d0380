use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Assign tasks to the team lead and let them work through the list.
/// Tasks live in a GitHub gist unless --db points at a local JSON file.
#[derive(Parser)]
#[command(name = "assign-task", version, about = "Single-team task assignment")]
pub struct Cli {
    /// Use a local JSON file instead of the configured gist.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Path to the TOML config file (default: ~/.assign-task/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;
    use crate::fields::{ListFilter, Urgency};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn assign_parses_urgency_and_defaults() {
        let cli = Cli::try_parse_from([
            "assign-task", "assign", "Review Q4", "--urgency", "high", "--by", "tomorrow",
        ])
        .unwrap();
        match cli.command {
            Commands::Assign { name, desc, urgency, by } => {
                assert_eq!(name, "Review Q4");
                assert_eq!(desc, None);
                assert_eq!(urgency, Urgency::High);
                assert_eq!(by, "tomorrow");
            }
            _ => panic!("expected assign"),
        }
    }

    #[test]
    fn tasks_filter_and_global_db_flag() {
        let cli = Cli::try_parse_from(["assign-task", "tasks", "--filter", "due-soon", "--db", "t.json"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("t.json")));
        assert!(matches!(cli.command, Commands::Tasks { filter: ListFilter::DueSoon }));
    }
}
