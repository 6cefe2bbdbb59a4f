//! Command-line interface for reversi_engine.

use clap::{Parser, Subcommand};

/// Reversi Engine - authoritative game server
#[derive(Parser, Debug)]
#[command(name = "reversi_engine")]
#[command(about = "Authoritative Reversi game server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP game server
    Serve {
        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Clock tick interval in milliseconds
        #[arg(long, default_value = "1000")]
        tick_interval_ms: u64,
    },
}
