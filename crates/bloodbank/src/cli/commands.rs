//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands. Form fields are
//! taken as raw text and checked by the matching form's `validate`.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::models::{BloodGroup, DonorStatus, RequestAction, RequestStatus};
use crate::session::Role;

/// Sign-in arguments.
#[derive(Debug, Args)]
pub struct LoginCommand {
    /// Operator username
    #[arg(short, long)]
    pub username: String,

    /// Operator password
    #[arg(short, long, env = "BLOODBANK_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Operator management commands.
#[derive(Debug, Subcommand)]
pub enum OperatorCommand {
    /// Create an operator account (the first one must be an admin)
    Add {
        /// Unique username
        #[arg(short, long)]
        username: String,

        /// Role to grant: admin or hospital
        #[arg(short, long)]
        role: Role,

        /// Initial password
        #[arg(short, long, env = "BLOODBANK_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

/// Donor commands.
#[derive(Debug, Subcommand)]
pub enum DonorCommand {
    /// Register a new donor
    Register(RegisterArgs),

    /// List donors, newest first
    List {
        /// Match name or contact (case-insensitive), or an exact donor id
        #[arg(short, long)]
        search: Option<String>,

        /// Only donors in this status (e.g. "ready-for-collection")
        #[arg(long)]
        status: Option<DonorStatus>,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show a donor with donation and screening history
    Show {
        /// Donor id
        id: i64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Move an eligible donor into the screening queue
    CheckIn {
        /// Donor id
        id: i64,

        /// Confirm the check-in
        #[arg(short, long)]
        yes: bool,
    },

    /// Record a screening for a queued donor
    Screen(ScreenArgs),

    /// Record a blood collection for a screened donor
    Collect {
        /// Donor id
        id: i64,

        /// Millilitres collected (defaults to the configured quantity)
        #[arg(long)]
        quantity: Option<String>,

        /// Free-text notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Set a donor's status directly
    SetStatus {
        /// Donor id
        id: i64,

        /// New status (e.g. "not-eligible", "eligible")
        status: DonorStatus,
    },
}

/// Donor registration form.
#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// Full name
    #[arg(long)]
    pub name: String,

    /// Age in years
    #[arg(long)]
    pub age: String,

    /// Gender: M, F or O
    #[arg(long)]
    pub gender: String,

    /// Blood group, e.g. O-
    #[arg(long)]
    pub blood_group: String,

    /// Phone number
    #[arg(long)]
    pub contact: String,

    /// Email address
    #[arg(long)]
    pub email: Option<String>,

    /// Postal address
    #[arg(long)]
    pub address: Option<String>,
}

/// Screening form.
#[derive(Debug, Args)]
pub struct ScreenArgs {
    /// Donor id
    pub id: i64,

    /// Blood pressure, e.g. 120/80
    #[arg(long)]
    pub blood_pressure: String,

    /// Hemoglobin in g/dL
    #[arg(long)]
    pub hemoglobin: String,

    /// Weight in kg
    #[arg(long)]
    pub weight: String,

    /// Temperature in °C
    #[arg(long)]
    pub temperature: String,

    /// Pulse in beats per minute
    #[arg(long)]
    pub pulse: String,

    /// Free-text notes
    #[arg(long)]
    pub notes: Option<String>,
}

/// Hospital request commands.
#[derive(Debug, Subcommand)]
pub enum RequestCommand {
    /// Submit a blood request
    Submit(SubmitArgs),

    /// List requests, newest first
    List {
        /// Only requests in this status
        #[arg(long)]
        status: Option<RequestStatus>,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Approve, reject or fulfill a request
    Process {
        /// Request id
        id: i64,

        /// Decision to apply
        #[arg(value_enum)]
        action: RequestActionArg,
    },
}

/// Blood request form.
#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Requesting hospital
    #[arg(long)]
    pub hospital: String,

    /// Person to contact at the hospital
    #[arg(long)]
    pub contact_person: String,

    /// Phone number
    #[arg(long)]
    pub phone: String,

    /// Email address
    #[arg(long)]
    pub email: Option<String>,

    /// Blood group required, e.g. AB+
    #[arg(long)]
    pub blood_group: String,

    /// Number of units
    #[arg(long)]
    pub units: String,

    /// Emergency, Urgent or Normal
    #[arg(long)]
    pub urgency: Option<String>,

    /// Medical situation
    #[arg(long)]
    pub reason: Option<String>,
}

/// Inventory commands.
#[derive(Debug, Subcommand)]
pub enum InventoryCommand {
    /// Show stock per blood group
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Set the units on hand for one blood group
    Set {
        /// Blood group, e.g. O-
        group: BloodGroup,

        /// Units on hand
        units: u32,
    },
}

/// Dashboard statistics arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Request decision argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RequestActionArg {
    /// Pending to Approved
    Approve,
    /// Pending to Rejected
    Reject,
    /// Approved to Fulfilled
    Fulfill,
}

impl From<RequestActionArg> for RequestAction {
    fn from(arg: RequestActionArg) -> Self {
        match arg {
            RequestActionArg::Approve => Self::Approve,
            RequestActionArg::Reject => Self::Reject,
            RequestActionArg::Fulfill => Self::Fulfill,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_action_arg_conversion() {
        assert_eq!(
            RequestAction::from(RequestActionArg::Approve),
            RequestAction::Approve
        );
        assert_eq!(
            RequestAction::from(RequestActionArg::Reject),
            RequestAction::Reject
        );
        assert_eq!(
            RequestAction::from(RequestActionArg::Fulfill),
            RequestAction::Fulfill
        );
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_login_command_debug() {
        let cmd = LoginCommand {
            username: "root".to_string(),
            password: "secret".to_string(),
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("root"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
