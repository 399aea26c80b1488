use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::constants::{DEMO_TOKEN, DEMO_USER_EMAIL, DEMO_USER_ID, DEMO_USER_NAME};

#[derive(Parser, Debug)]
#[command(name = "userdesk")]
#[command(version)]
#[command(about = "Users admin client: session, cached user list and media uploads", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "USERDESK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration
    Init,
    /// Show configuration, storage and session
    Status,
    /// Store a session (mock login, no network)
    Login(LoginArgs),
    /// Clear the stored session
    Logout,
    /// Show the logged-in user
    Profile,
    /// Manage users
    Users {
        #[command(subcommand)]
        action: UserCommands,
    },
    /// Upload images or videos and print the markup that embeds each
    Upload {
        /// Files to upload, in order
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    #[arg(long, default_value_t = DEMO_USER_ID)]
    pub id: i64,

    #[arg(long, default_value = DEMO_USER_NAME)]
    pub name: String,

    #[arg(long, default_value = DEMO_USER_EMAIL)]
    pub email: String,

    /// Avatar URL
    #[arg(long)]
    pub avatar: Option<String>,

    #[arg(long, default_value = DEMO_TOKEN)]
    pub token: String,
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// List all users
    List,
    /// Show one user
    Get { id: i64 },
    /// Create a user
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        avatar: Option<String>,
    },
    /// Update fields of a user
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
    },
    /// Delete a user
    Delete { id: i64 },
}
