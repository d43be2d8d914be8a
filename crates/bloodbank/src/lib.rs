//! `bloodbank` - Donor, hospital request and inventory management for a blood bank
//!
//! This library provides donor registration, the check-in, screening and
//! collection workflow, hospital blood requests, per-group inventory, and
//! role-based operator sessions on top of a local SQLite database.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod forms;
pub mod intake;
pub mod inventory;
pub mod logging;
pub mod models;
pub mod session;
pub mod storage;
pub mod workflow;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use session::{Role, SessionContext};
pub use storage::{DashboardStats, Storage};
pub use workflow::DonorWorkflow;
