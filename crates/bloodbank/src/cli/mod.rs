//! Command-line interface for bloodbank.
//!
//! This module provides the CLI structure, output rendering and the stored
//! session token for the `bbank` binary.

mod commands;
pub mod output;
pub mod session_file;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, DonorCommand, InventoryCommand, LoginCommand, OperatorCommand, OutputFormat,
    RegisterArgs, RequestActionArg, RequestCommand, ScreenArgs, StatsCommand, SubmitArgs,
};

/// bbank - Blood bank donor, request and inventory management
///
/// Registers donors and walks them through check-in, screening and
/// collection, takes hospital blood requests, and tracks stock per group.
#[derive(Debug, Parser)]
#[command(name = "bbank")]
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
    /// Sign in and store the session token
    Login(LoginCommand),

    /// End the current session
    Logout,

    /// Show the signed-in operator
    Whoami,

    /// Manage operator accounts
    #[command(subcommand)]
    Operator(OperatorCommand),

    /// Register donors and run the donation workflow
    #[command(subcommand)]
    Donor(DonorCommand),

    /// Submit and process hospital blood requests
    #[command(subcommand)]
    Request(RequestCommand),

    /// View or adjust blood stock
    #[command(subcommand)]
    Inventory(InventoryCommand),

    /// Show dashboard statistics
    Stats(StatsCommand),

    /// View or modify configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Verbosity;
    use crate::models::{BloodGroup, DonorStatus, RequestStatus};
    use crate::session::Role;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["bbank"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "bbank");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(parse(&["-q", "whoami"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["whoami"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["-v", "whoami"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["-vv", "whoami"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["-c", "/custom/config.toml", "stats"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_login() {
        let cli = parse(&["login", "-u", "root", "-p", "hunter22"]);
        match cli.command {
            Command::Login(cmd) => {
                assert_eq!(cmd.username, "root");
                assert_eq!(cmd.password, "hunter22");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_operator_add() {
        let cli = parse(&[
            "operator", "add", "-u", "clinic", "-r", "hospital", "-p", "password1",
        ]);
        assert!(matches!(
            cli.command,
            Command::Operator(OperatorCommand::Add {
                role: Role::Hospital,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_donor_register() {
        let cli = parse(&[
            "donor",
            "register",
            "--name",
            "Ada Obi",
            "--age",
            "31",
            "--gender",
            "F",
            "--blood-group",
            "O-",
            "--contact",
            "555-0700",
        ]);
        match cli.command {
            Command::Donor(DonorCommand::Register(args)) => {
                assert_eq!(args.blood_group, "O-");
                assert!(args.email.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_donor_list_status() {
        let cli = parse(&["donor", "list", "--status", "ready-for-collection"]);
        assert!(matches!(
            cli.command,
            Command::Donor(DonorCommand::List {
                status: Some(DonorStatus::ReadyForCollection),
                format: OutputFormat::Table,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_donor_collect() {
        let cli = parse(&["donor", "collect", "5", "--quantity", "450"]);
        match cli.command {
            Command::Donor(DonorCommand::Collect { id, quantity, .. }) => {
                assert_eq!(id, 5);
                assert_eq!(quantity.as_deref(), Some("450"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_check_in_requires_flag_value() {
        let cli = parse(&["donor", "check-in", "7"]);
        assert!(matches!(
            cli.command,
            Command::Donor(DonorCommand::CheckIn { id: 7, yes: false })
        ));
    }

    #[test]
    fn test_parse_request_process() {
        let cli = parse(&["request", "process", "3", "fulfill"]);
        assert!(matches!(
            cli.command,
            Command::Request(RequestCommand::Process {
                id: 3,
                action: RequestActionArg::Fulfill
            })
        ));
    }

    #[test]
    fn test_parse_request_list_status() {
        let cli = parse(&["request", "list", "--status", "pending", "-f", "json"]);
        assert!(matches!(
            cli.command,
            Command::Request(RequestCommand::List {
                status: Some(RequestStatus::Pending),
                format: OutputFormat::Json,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_inventory_set() {
        let cli = parse(&["inventory", "set", "O-", "12"]);
        assert!(matches!(
            cli.command,
            Command::Inventory(InventoryCommand::Set {
                group: BloodGroup::ONegative,
                units: 12
            })
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_group() {
        let result = Cli::try_parse_from(["bbank", "inventory", "set", "C+", "1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_quiet_stats() {
        let cli = parse(&["-q", "stats"]);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Command::Stats(_)));
    }
}
