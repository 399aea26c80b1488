/// CLI argument parsing and command handling - Gateway
mod args;
mod commands;

pub use args::{Cli, Commands, LoginArgs, UserCommands};
pub use commands::{handle_command, run_init};
