//! CLI definitions for taskrelay.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// taskrelay notification server.
#[derive(Parser)]
#[command(name = "taskrelay")]
#[command(about = "Task runtime, scheduler, and notification dispatcher")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (JSON).
    #[arg(short, long, default_value = "config/taskrelay.json", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the server in the foreground (default).
    Run {
        /// HTTP entry point host, overrides the config file.
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// HTTP entry point port, overrides `notify_api.ws.listen_port`.
        #[arg(long)]
        port: Option<u16>,
    },
}
