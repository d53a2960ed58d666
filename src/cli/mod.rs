//! CLI module for AIVO Brain
//!
//! Provides command-line interface parsing for the `aivo-brain` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// AIVO Brain - asynchronous multi-document research server
#[derive(Parser, Debug)]
#[command(
    name = "aivo-brain",
    version,
    about = "AIVO Brain - asynchronous multi-document research server",
    long_about = "Accepts research requests over HTTP, queues them durably and runs each\n\
                  document through the chosen AI provider in the background.\n\n\
                  Run without arguments to start the server and worker.",
    after_help = "EXAMPLES:\n    \
                  aivo-brain                        # Start the server (reads aivo.toml)\n    \
                  aivo-brain --config my.toml serve # Use a custom config file\n    \
                  aivo-brain generate-api-key       # Issue a key for the x-api-key header\n    \
                  aivo-brain config --validate      # Check the configuration"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "aivo.toml", global = true, env = "AIVO_CONFIG")]
    pub config: PathBuf,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server and the research worker (default)
    Serve {
        /// Serve HTTP only, without processing queued jobs
        #[arg(long)]
        no_worker: bool,
    },

    /// Generate and store a new API key
    GenerateApiKey,

    /// Show configuration information
    Config {
        /// Validate the configuration file
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_no_subcommand() {
        let cli = Cli::try_parse_from(["aivo-brain"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from("aivo.toml"));
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["aivo-brain", "generate-api-key", "--config", "x.toml"])
            .unwrap();
        assert_eq!(cli.command, Some(Commands::GenerateApiKey));
        assert_eq!(cli.config, PathBuf::from("x.toml"));
    }

    #[test]
    fn test_config_validate() {
        let cli = Cli::try_parse_from(["aivo-brain", "config", "--validate"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Config { validate: true }));
    }

    #[test]
    fn test_serve_without_worker() {
        let cli = Cli::try_parse_from(["aivo-brain", "serve", "--no-worker"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Serve { no_worker: true }));
    }
}
