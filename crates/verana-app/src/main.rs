//! Verana node entry point.
//!
//! Initializes the chain from a genesis document, applies blocks read from
//! JSON files, and answers queries against the committed state.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use verana_app::{Block, Query, VeranaConfig, VeranaNode};

/// Verana Node
#[derive(Parser, Debug)]
#[command(name = "verana-node", version, about = "Verana Verifiable Trust Registry node")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "verana.toml", global = true)]
    config: PathBuf,

    /// Override the data directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override the genesis file.
    #[arg(long, global = true)]
    genesis: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default config file if missing and initialize the chain from genesis.
    Init,
    /// Execute the block stored in a JSON file and print its result.
    ApplyBlock {
        /// Path to the block (JSON).
        file: PathBuf,
    },
    /// Print the committed state as a genesis document.
    ExportGenesis {
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the parameters of every module.
    QueryParams,
    /// Run a JSON query, e.g. '{"type":"get_permission","id":1}'.
    Query {
        /// Query (JSON).
        json: String,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = VeranaConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(ref data_dir) = args.data_dir {
        config.storage.data_dir = data_dir.clone();
    }
    if let Some(ref genesis) = args.genesis {
        config.chain.genesis_file = genesis.clone();
    }
    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }

    // Initialize tracing on stderr; stdout carries command output.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.json_logs() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }

    tracing::debug!("Verana node v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Init => {
            if !args.config.exists() {
                config.save(&args.config)?;
                tracing::info!(path = %args.config.display(), "wrote default config");
            }
            let mut node = VeranaNode::open(config)?;
            // A memory node initializes itself on open.
            if matches!(node.config().storage.backend, verana_app::StorageBackend::Rocksdb) {
                let app_hash = node.init()?;
                println!("{}", serde_json::json!({ "app_hash": app_hash }));
            }
        }
        Command::ApplyBlock { file } => {
            let contents = std::fs::read_to_string(&file)?;
            let block: Block = serde_json::from_str(&contents)?;
            let mut node = VeranaNode::open(config)?;
            let result = node.apply_block(&block)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::ExportGenesis { output } => {
            let node = VeranaNode::open(config)?;
            let json = node.export_genesis()?.to_json()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    tracing::info!(path = %path.display(), "genesis exported");
                }
                None => println!("{}", json),
            }
        }
        Command::QueryParams => {
            let node = VeranaNode::open(config)?;
            let params = node.query(&Query::Params)?;
            println!("{}", serde_json::to_string_pretty(&params)?);
        }
        Command::Query { json } => {
            let query: Query = serde_json::from_str(&json)?;
            let node = VeranaNode::open(config)?;
            let value = node.query(&query)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}
