//! Command-line interface for trendstore.
//!
//! This module provides the CLI structure for the `trendstore` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, HistoryCommand, KeysCommand, RecentCommand, ServeCommand, ShowCommand,
    StatusCommand,
};

/// trendstore - Record and query keyed time series
///
/// Clients push (key, value) samples over HTTP; the server timestamps and
/// stores them in `SQLite` and serves recent windows or full histories.
#[derive(Debug, Parser)]
#[command(name = "trendstore")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeCommand),

    /// List recorded keys
    Keys(KeysCommand),

    /// Show the most recent samples, oldest first
    Recent(RecentCommand),

    /// Show the full history, oldest first
    History(HistoryCommand),

    /// Show one sample by id
    Show(ShowCommand),

    /// Show database statistics
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Verbosity;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "trendstore");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["trendstore", "keys"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["trendstore", "-q", "keys"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["trendstore", "-v", "keys"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["trendstore", "-vv", "keys"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = parse(&["trendstore", "serve"]);
        let Command::Serve(cmd) = cli.command else {
            panic!("expected serve command");
        };
        assert!(cmd.host.is_none());
        assert!(cmd.port.is_none());
        assert!(cmd.database.is_none());
        assert!(!cmd.no_cors);
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = parse(&[
            "trendstore",
            "serve",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
            "--database",
            "sqlite:///tmp/t.db",
        ]);
        let Command::Serve(cmd) = cli.command else {
            panic!("expected serve command");
        };
        assert_eq!(cmd.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(cmd.port, Some(8080));
        assert_eq!(cmd.database.as_deref(), Some("sqlite:///tmp/t.db"));
    }

    #[test]
    fn test_parse_recent_default_limit() {
        let cli = parse(&["trendstore", "recent", "--key", "cpu"]);
        let Command::Recent(cmd) = cli.command else {
            panic!("expected recent command");
        };
        assert_eq!(cmd.key.as_deref(), Some("cpu"));
        assert_eq!(cmd.limit, 100);
        assert!(!cmd.json);
    }

    #[test]
    fn test_parse_recent_rejects_zero_limit() {
        let result = Cli::try_parse_from(["trendstore", "recent", "--limit", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_history_json() {
        let cli = parse(&["trendstore", "history", "-k", "mem", "--json"]);
        let Command::History(cmd) = cli.command else {
            panic!("expected history command");
        };
        assert_eq!(cmd.key.as_deref(), Some("mem"));
        assert!(cmd.json);
    }

    #[test]
    fn test_parse_show_and_status() {
        let cli = parse(&["trendstore", "show", "42", "--json"]);
        let Command::Show(cmd) = cli.command else {
            panic!("expected show command");
        };
        assert_eq!(cmd.id, 42);
        assert!(cmd.json);

        let cli = parse(&["trendstore", "status"]);
        assert!(matches!(cli.command, Command::Status(StatusCommand { json: false })));
    }

    #[test]
    fn test_parse_config_commands() {
        let cli = parse(&["trendstore", "config", "show", "--json"]);
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Show { json: true })
        ));

        let cli = parse(&["trendstore", "config", "path"]);
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Path)));
    }

    #[test]
    fn test_parse_global_config_flag() {
        let cli = parse(&["trendstore", "keys", "--config", "/tmp/trend.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/trend.toml")));
    }
}
