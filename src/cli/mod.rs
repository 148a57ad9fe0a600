use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(
    name = "indexer",
    version,
    about = "Chain-state indexing daemon and control CLI",
    long_about = "Indexes on-chain actor state into analytical tables.\n\n\
    Quick start:\n  \
    indexer run --config indexer.yaml\n  \
    indexer gap fill --storage primary --tasks reward\n  \
    indexer job list"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the indexing daemon
    Run(RunCmd),
    /// Launch gap filling and finding jobs
    Gap {
        #[command(subcommand)]
        command: GapCmd,
    },
    /// Manage jobs running in the daemon
    Job {
        #[command(subcommand)]
        command: JobCmd,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunCmd {
    /// Path to the daemon configuration file
    #[arg(long)]
    pub config: PathBuf,
}

/// Connection options shared by every client command.
#[derive(Args, Debug, Clone)]
pub struct ApiOpts {
    /// Address of the daemon control api.
    #[arg(long, env = "INDEXER_API", default_value = "http://127.0.0.1:8010/")]
    pub api: Url,
    /// Authentication token for the control api.
    #[arg(long, env = "INDEXER_API_TOKEN")]
    pub api_token: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum GapCmd {
    /// Fill gaps in the database
    Fill {
        #[command(flatten)]
        api: ApiOpts,
        /// Name of storage that results will be written to.
        #[arg(long)]
        storage: String,
        /// Comma separated list of tasks to fill. Each task is reported
        /// separately in the database. If empty all tasks will be filled.
        #[arg(long, default_value = "")]
        tasks: String,
        /// Lowest epoch to consider. Defaults to 0.
        #[arg(long)]
        from: Option<i64>,
        /// Highest epoch to consider. Defaults to the chain head.
        #[arg(long)]
        to: Option<i64>,
    },
    /// Find gaps in the database
    Find {
        #[command(flatten)]
        api: ApiOpts,
        /// Name of storage to scan for gaps.
        #[arg(long)]
        storage: String,
        /// Lowest epoch to consider. Defaults to 0.
        #[arg(long)]
        from: Option<i64>,
        /// Highest epoch to consider. Defaults to the chain head.
        #[arg(long)]
        to: Option<i64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum JobCmd {
    /// Start a job
    Start {
        #[command(flatten)]
        api: ApiOpts,
        /// ID of job to start
        #[arg(long)]
        id: i64,
    },
    /// Stop a job
    Stop {
        #[command(flatten)]
        api: ApiOpts,
        /// ID of job to stop
        #[arg(long)]
        id: i64,
    },
    /// List all jobs and their status
    List {
        #[command(flatten)]
        api: ApiOpts,
    },
}

/// Split a comma separated task list; empty input selects every task.
pub fn parse_task_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_task_list_selects_all() {
        assert!(parse_task_list("").is_empty());
        assert!(parse_task_list(" , ").is_empty());
    }

    #[test]
    fn task_list_splits_and_trims() {
        assert_eq!(parse_task_list("blocks, reward"), vec!["blocks", "reward"]);
    }

    #[test]
    fn gap_fill_args_parse() {
        let cli = Cli::parse_from([
            "indexer", "gap", "fill", "--storage", "primary", "--tasks", "reward", "--to", "100",
        ]);
        match cli.command {
            Commands::Gap { command: GapCmd::Fill { storage, tasks, from, to, .. } } => {
                assert_eq!(storage, "primary");
                assert_eq!(tasks, "reward");
                assert_eq!(from, None);
                assert_eq!(to, Some(100));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
