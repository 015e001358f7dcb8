//! taskrelay - notification server with a task runtime, scheduler, and
//! notification dispatcher.

mod cli;
mod server;

use clap::Parser;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    server::init_tracing()?;

    let cli = Cli::parse();

    match cli.command {
        None => server::run_server(cli.config, "0.0.0.0".to_string(), None).await,
        Some(Commands::Run { host, port }) => server::run_server(cli.config, host, port).await,
    }
}
