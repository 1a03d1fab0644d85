//! CLI interface for RainSafe

pub mod commands;
mod output;

pub use output::*;

use clap::{Parser, Subcommand, ValueEnum};

use crate::auth::{Requirement, Role};

#[derive(Parser)]
#[command(name = "rainsafe")]
#[command(version)]
#[command(about = "RainSafe campus weather dashboard client", long_about = None)]
pub struct Cli {
    /// Override the backend API base URL
    #[arg(long, global = true, env = "RAINSAFE_API_URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a rainsafe.toml configuration file
    Init,

    /// Create a new account
    Register {
        #[arg(short, long)]
        email: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        age: Option<u32>,

        /// 10-11 digit mobile number
        #[arg(long)]
        contact_number: Option<String>,

        #[arg(long)]
        sex: Option<String>,

        #[arg(long)]
        purok: Option<String>,

        #[arg(long)]
        barangay: Option<String>,

        #[arg(long)]
        municipal: Option<String>,

        #[arg(long)]
        province: Option<String>,
    },

    /// Log in and store the session
    Login {
        /// Account email (prompted when omitted)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show who is logged in
    Status {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Exchange the refresh token for a new access token
    Renew,

    /// Check whether the session may open a protected view
    Authorize {
        /// Required role; any logged-in user when omitted
        #[arg(short, long)]
        role: Option<RoleArg>,
    },

    /// Read and manage notifications
    Notifications {
        #[command(subcommand)]
        action: NotificationsAction,
    },
}

#[derive(Subcommand)]
pub enum NotificationsAction {
    /// List notifications
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Poll for new notifications until interrupted
    Watch,

    /// Mark a notification as read
    Read {
        /// Notification id
        id: i64,
    },

    /// Delete all notifications
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    Admin,
    Member,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Admin => Role::Admin,
            RoleArg::Member => Role::Member,
        }
    }
}

/// Requirement for an optional role flag
pub fn requirement_for(role: Option<RoleArg>) -> Requirement {
    match role {
        Some(role) => Requirement::RoleEquals(role.into()),
        None => Requirement::AnyAuthenticated,
    }
}
