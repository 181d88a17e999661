//! ragpack CLI: the main entry point.
//!
//! Commands:
//! - `init`     Write a default config file
//! - `config`   Show, validate or locate the configuration
//! - `gateway`  Start the HTTP API server
//! - `context`  Print the packed context for local documents
//! - `ask`      Answer a question over local documents

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "ragpack",
    about = "ragpack: keyword retrieval and context packing for LLM chat",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config.toml if none exists
    Init,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the packed context for a query over local files (no network)
    Context {
        /// Directory of .txt / .md documents
        #[arg(short, long)]
        docs: PathBuf,

        /// The query to retrieve for
        query: String,

        /// Override retrieval.top_k
        #[arg(long)]
        top_k: Option<usize>,

        /// Override retrieval.max_context_chars
        #[arg(long)]
        max_chars: Option<usize>,
    },

    /// Answer a question using local documents as context
    Ask {
        /// Directory of .txt / .md documents
        #[arg(short, long)]
        docs: PathBuf,

        /// The question
        #[arg(short, long)]
        message: String,

        /// auto, primary, secondary, or a configured provider/model
        #[arg(long, default_value = "auto")]
        model: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration with secrets redacted
    Show,
    /// Check the configuration for errors
    Validate,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
        },
        Commands::Gateway { port } => commands::gateway::run(port).await?,
        Commands::Context {
            docs,
            query,
            top_k,
            max_chars,
        } => commands::context::run(&docs, &query, top_k, max_chars).await?,
        Commands::Ask {
            docs,
            message,
            model,
        } => commands::ask::run(&docs, &message, &model).await?,
    }

    Ok(())
}
