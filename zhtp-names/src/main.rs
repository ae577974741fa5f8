//! ZHTP Name Node CLI
//!
//! Rebuilds name state from a chain file and answers queries or runs RPC
//! scripts against it.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use lib_names::NameBlock;
use zhtp_names::{load_config, rpc, NameNode, NodeConfig};

/// Name registration node
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "zhtp-names")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "ZHTP_NAMES_CONFIG")]
    config: Option<PathBuf>,

    /// Chain file: JSON list of name blocks, genesis first
    #[arg(long, env = "ZHTP_NAMES_CHAIN")]
    chain: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay the chain file and print a state summary
    Replay,

    /// Show the current record of a name
    Show { name: String },

    /// Show every value a name has held
    History { name: String },

    /// List records in name order
    Scan {
        start: Option<String>,
        #[arg(long, default_value_t = rpc::DEFAULT_SCAN_COUNT)]
        count: usize,
    },

    /// Run RPC calls from a JSON script: [["method", [params...]], ...]
    Run {
        script: PathBuf,
        /// Write the resulting chain back to the chain file
        #[arg(long)]
        save: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => NodeConfig::default(),
    };

    // Initialize logging
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let blocks = match &cli.chain {
        Some(path) => read_chain(path)?,
        None => Vec::new(),
    };
    let node = NameNode::from_blocks(&config, blocks).context("Failed to replay chain")?;

    match cli.command {
        Command::Replay => print_json(&json!({
            "network": config.network,
            "tip": node.tip(),
            "names": node.name_count(),
        })),
        Command::Show { name } => print_json(&rpc::dispatch(&node, "name_show", &[json!(name)])?),
        Command::History { name } => {
            print_json(&rpc::dispatch(&node, "name_history", &[json!(name)])?)
        }
        Command::Scan { start, count } => print_json(&rpc::dispatch(
            &node,
            "name_scan",
            &[json!(start), json!(count)],
        )?),
        Command::Run { script, save } => {
            run_script(&node, &script)?;
            if save {
                let path = cli.chain.as_deref().context("--save requires --chain")?;
                write_chain(path, &node.blocks())?;
            }
            Ok(())
        }
    }
}

fn read_chain(path: &Path) -> Result<Vec<NameBlock>> {
    if !path.exists() {
        tracing::info!("Chain file {} not found, starting at genesis", path.display());
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read chain file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse chain file {}", path.display()))
}

fn write_chain(path: &Path, blocks: &[NameBlock]) -> Result<()> {
    let content = serde_json::to_string_pretty(blocks)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write chain file {}", path.display()))
}

fn run_script(node: &NameNode, script: &Path) -> Result<()> {
    let content = std::fs::read_to_string(script)
        .with_context(|| format!("Failed to read script {}", script.display()))?;
    let calls: Vec<(String, Vec<Value>)> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse script {}", script.display()))?;

    for (method, params) in calls {
        let response = match rpc::dispatch(node, &method, &params) {
            Ok(result) => json!({ "method": method, "result": result }),
            Err(e) => json!({ "method": method, "error": rpc::error_json(&e) }),
        };
        print_json(&response)?;
    }
    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
