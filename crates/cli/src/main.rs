//! Dashboard CLI - admin API client with session handling

mod commands;
mod config;
mod logging;

use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use commands::{Commands, Context};
use config::DashboardConfig;
use dashboard_http::ClientError;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{Level, error, info};

#[derive(Parser)]
#[command(name = "dashboard")]
#[command(about = "Command-line client for the admin dashboard API")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to config.toml in the data directory)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for the session file, configuration and logs
    #[arg(short = 'd', long, global = true)]
    data_dir: Option<PathBuf>,

    /// Set logging level (overrides the configured level)
    #[arg(short = 'l', long, global = true)]
    log_level: Option<LogLevel>,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(dashboard_core::paths::default_state_dir);
    let config = DashboardConfig::load(cli.config.as_deref(), &data_dir)?;

    let level = match cli.log_level {
        Some(level) => level.into(),
        None => Level::from_str(&config.log.level)
            .with_context(|| format!("Invalid log.level {:?}", config.log.level))?,
    };
    logging::init_logging(level, &data_dir, cli.no_file_log)?;

    info!("Starting dashboard CLI");

    let ctx = Context { config, data_dir };
    match cli.command.execute(&ctx).await {
        Ok(()) => {
            info!("Command completed successfully");
        }
        Err(e) => {
            match e.downcast_ref::<ClientError>() {
                Some(client_error) => {
                    error!(kind = %client_error.kind(), "Command failed: {e}");
                }
                None => error!("Command failed: {e:#}"),
            }
            std::process::exit(1);
        }
    }

    Ok(())
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use commands::{ArticleCommands, ConfigCommands, Logic};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "dashboard",
            "session",
            "--data-dir",
            "/tmp/dash",
            "--log-level",
            "debug",
            "--no-file-log",
        ])
        .unwrap();

        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/dash")));
        assert!(matches!(cli.log_level, Some(LogLevel::Debug)));
        assert!(cli.no_file_log);
        assert!(matches!(cli.command, Commands::Session));
    }

    #[test]
    fn article_filters_parse() {
        let cli = Cli::try_parse_from([
            "dashboard",
            "articles",
            "list",
            "--title",
            "rust",
            "--logic",
            "or",
            "--sort-by=-created_at",
            "--created-after",
            "2024-01-31T00:00:00",
        ])
        .unwrap();

        let Commands::Articles {
            command: ArticleCommands::List {
                list,
                title,
                created,
                ..
            },
        } = cli.command
        else {
            panic!("expected articles list");
        };
        assert_eq!(title.as_deref(), Some("rust"));
        assert_eq!(list.logic, Some(Logic::Or));
        assert_eq!(list.sort_by.as_deref(), Some("-created_at"));
        assert_eq!(
            created.created_after.unwrap().to_string(),
            "2024-01-31 00:00:00"
        );
    }

    #[test]
    fn malformed_date_is_rejected() {
        let result = Cli::try_parse_from([
            "dashboard",
            "users",
            "list",
            "--created-before",
            "yesterday",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn config_init_takes_optional_output() {
        let cli = Cli::try_parse_from(["dashboard", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Init {
                    output: None,
                    force: true
                }
            }
        ));
    }
}
