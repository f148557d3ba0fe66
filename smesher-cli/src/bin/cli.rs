//! Command-line interface for smeshing node operators.
//!
//! Runs a single command against the node's API, or, without a command,
//! starts an interactive session.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::io::BufReader;

use smesher_cli::api_client::Client;
use smesher_cli::commands::{Command, ComputeApiNames, Session};
use smesher_cli::config::{ApiConfig, Config, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use smesher_cli::interrupt::{Interrupts, EXIT_INTERRUPTED};
use smesher_cli::repl::Repl;
use smesher_cli::terminal::Terminal;
use smesher_cli::tracing::{self, prelude::*};

/// Smesher CLI
#[derive(Parser)]
#[command(name = "smesher-cli")]
#[command(about = "Interactive client for a smeshing node's administrative API")]
#[command(version)]
struct Cli {
    /// Base URL of the node's API gateway
    #[arg(long, env = "SMESHER_CLI_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Timeout for single API calls, in seconds
    #[arg(long, env = "SMESHER_CLI_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Default log level (RUST_LOG overrides)
    #[arg(long, env = "SMESHER_CLI_LOG", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand)]
enum Mode {
    #[command(flatten)]
    Run(Command),
    /// Start interactive mode (the default)
    Interactive,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            api: ApiConfig {
                url: self.api_url.clone(),
                timeout_secs: self.timeout,
            },
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config();
    tracing::init_stderr(&config.log_level);

    config.validate()?;
    let client = Client::from_config(&config.api)?;
    debug!(url = %client.base_url(), "Using node API");

    // Ctrl-C stops `progress`; anywhere else it ends the program.
    let interrupts = Interrupts::new();
    interrupts.listen(|| {
        eprintln!();
        std::process::exit(EXIT_INTERRUPTED);
    });

    let terminal = Terminal::new(BufReader::new(tokio::io::stdin()), std::io::stdout());
    let mut session =
        Session::new(client, terminal, ComputeApiNames::new()).with_interrupts(interrupts);

    match cli.mode {
        Some(Mode::Run(command)) => {
            if let Err(e) = session.execute(command).await {
                error!(command = %command, error = %e, "Command failed");
                std::process::exit(1);
            }
        }
        Some(Mode::Interactive) | None => Repl::new(session).run().await?,
    }

    Ok(())
}
