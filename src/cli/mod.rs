pub mod report;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use report::{process_report_command, ReportCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    session::start_session,
    storage::task_log::FileTaskLog,
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX, SESSION_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Tasktally", version, long_about = None)]
#[command(about = "Track work tasks and see where the time went", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Storage directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Enable trace logging")]
    log: bool,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console", global = true)]
    log_console: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(
        about = "Track tasks interactively. Reads `start <title>`, `stop [remarks]`, `list`, `status` and `quit` from stdin"
    )]
    Session {
        #[arg(long = "no-color", help = "Print the status line without colors")]
        no_color: bool,
    },
    #[command(about = "Print time spent per task and per day")]
    Report {
        #[command(flatten)]
        command: ReportCommand,
    },
}

pub async fn run_cli(args: Args) -> Result<()> {
    let dir = args.dir.map_or_else(create_application_default_path, Ok)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let prefix = match args.commands {
        Commands::Session { .. } => SESSION_PREFIX,
        Commands::Report { .. } => CLI_PREFIX,
    };
    enable_logging(prefix, &dir.join("logs"), logging_level, args.log_console)?;

    let log = Arc::new(FileTaskLog::new(dir));
    match args.commands {
        Commands::Session { no_color } => start_session(log, !no_color).await,
        Commands::Report { command } => process_report_command(log, command).await,
    }
}
