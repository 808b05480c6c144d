mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use kos::config::KosConfig;
use kos::server;

#[derive(Parser)]
#[command(name = "kos", version, about = "Validated knowledge runtime: SPOC-M statements through the K-Cycle")]
struct Cli {
    /// Config file (defaults to ~/.kos/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport unless configured otherwise)
    Serve {
        /// Serve over streamable HTTP at /mcp instead of stdio
        #[arg(long)]
        sse: bool,
    },
    /// Ingest statements from a JSON file (one statement or an array)
    Ingest { file: PathBuf },
    /// Show a statement and its K-Cycle records
    Inspect { id: String },
    /// List statements about a subject
    Find {
        subject: String,
        #[arg(long)]
        relation: Option<String>,
        /// Include superseded statements
        #[arg(long)]
        all: bool,
    },
    /// Show store statistics
    Stats,
    /// Check database and ontology health
    Doctor,
    /// Export current statements as JSON
    Export,
    /// Delete all statements
    Reset,
    /// Print the configured ontology
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = match &cli.config {
        Some(path) => KosConfig::load_from(path)?,
        None => KosConfig::load()?,
    };

    // Initialize tracing with the configured log level.
    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { sse } => {
            if sse || config.server.transport == "sse" {
                server::serve_sse(config).await?;
            } else {
                server::serve_stdio(config).await?;
            }
        }
        Command::Ingest { file } => cli::ingest::ingest(&config, &file)?,
        Command::Inspect { id } => cli::inspect::inspect(&config, &id)?,
        Command::Find {
            subject,
            relation,
            all,
        } => cli::find::find(&config, &subject, relation.as_deref(), all)?,
        Command::Stats => cli::stats::stats(&config)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Export => cli::export::export(&config)?,
        Command::Reset => cli::reset::reset(&config)?,
        Command::Schema => cli::schema::schema(&config)?,
    }

    Ok(())
}
