//! CoreChain command line.

mod simulate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use corechain_contracts::{AuditLogger, AuditQuery, RewardDistributor};
use corechain_coordinator::CoordinatorConfig;
use corechain_ledger::Ledger;
use corechain_transactions::TransactionKind;
use corechain_types::HospitalId;
use corechain_utils::{init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "corechain", about = "Federated training coordinator with an auditable ledger")]
struct Cli {
    /// Path to a TOML configuration file. CLI flags and env vars override it.
    #[arg(long, env = "CORECHAIN_CONFIG")]
    config: Option<PathBuf>,

    /// Leading zero hex digits required of block hashes. Chain files do not
    /// record it: `verify`, `audit` and `leaderboard` check a loaded chain
    /// against this value, so pass the one the chain was mined at.
    #[arg(long, env = "CORECHAIN_DIFFICULTY")]
    difficulty: Option<u32>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "CORECHAIN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "CORECHAIN_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run simulated hospitals through the configured number of rounds.
    Simulate {
        /// Number of simulated hospitals.
        #[arg(long, default_value_t = 3, env = "CORECHAIN_HOSPITALS")]
        hospitals: usize,

        /// Rounds to run (defaults to `total_rounds` from config).
        #[arg(long, env = "CORECHAIN_ROUNDS")]
        rounds: Option<u64>,

        /// Updates per round that trigger aggregation.
        #[arg(long, env = "CORECHAIN_MIN_CLIENTS")]
        min_clients: Option<usize>,

        /// Where to persist the resulting chain.
        #[arg(long, env = "CORECHAIN_CHAIN_FILE")]
        chain_file: Option<PathBuf>,
    },

    /// Load a persisted chain, validate it at `--difficulty` and print its stats.
    Verify {
        #[arg(long)]
        chain: PathBuf,
    },

    /// Print the audit trail of a persisted chain as JSON.
    Audit {
        #[arg(long)]
        chain: PathBuf,

        #[arg(long)]
        hospital: Option<String>,

        /// Transaction type, e.g. MODEL_UPDATE.
        #[arg(long)]
        kind: Option<TransactionKind>,

        #[arg(long, default_value_t = corechain_contracts::audit::DEFAULT_AUDIT_LIMIT)]
        limit: usize,
    },

    /// Print the reward leaderboard of a persisted chain as JSON.
    Leaderboard {
        #[arg(long)]
        chain: PathBuf,
    },

    /// Print the effective configuration as TOML.
    Config,
}

fn load_config(cli: &Cli) -> anyhow::Result<CoordinatorConfig> {
    let mut config = match &cli.config {
        Some(path) => CoordinatorConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => CoordinatorConfig::default(),
    };
    if let Some(d) = cli.difficulty {
        config.difficulty = d;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Command::Simulate {
        rounds,
        min_clients,
        chain_file,
        ..
    } = &cli.command
    {
        if let Some(r) = rounds {
            config.total_rounds = *r;
        }
        if let Some(m) = min_clients {
            config.min_clients = *m;
        }
        if let Some(path) = chain_file {
            config.chain_file = path.clone();
        }
    }
    config.check()?;
    Ok(config)
}

/// A ledger holding the chain persisted at `path`.
fn open_chain(config: &CoordinatorConfig, path: &Path) -> anyhow::Result<Arc<Ledger>> {
    let ledger = Ledger::with_system_clock(&config.protocol_params())?;
    if !ledger.load_from_file(path)? {
        bail!("no chain file at {}", path.display());
    }
    Ok(Arc::new(ledger))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level);

    match cli.command {
        Command::Simulate { hospitals, .. } => {
            simulate::run(config, hospitals).await?;
        }
        Command::Verify { chain } => {
            let ledger = open_chain(&config, &chain)?;
            let stats = ledger.get_stats();
            println!("{}", serde_json::to_string_pretty(&stats)?);
            if let Err(e) = ledger.validate() {
                bail!(
                    "chain at {} failed validation at difficulty {}: {e}",
                    chain.display(),
                    ledger.difficulty()
                );
            }
            tracing::info!(blocks = stats.total_blocks, "chain verified");
        }
        Command::Audit {
            chain,
            hospital,
            kind,
            limit,
        } => {
            let ledger = open_chain(&config, &chain)?;
            let hospital_id = hospital.map(HospitalId::new).transpose()?;
            let trail = AuditLogger::new(ledger).get_audit_trail(&AuditQuery {
                hospital_id,
                kind,
                limit,
            });
            println!("{}", serde_json::to_string_pretty(&trail)?);
        }
        Command::Leaderboard { chain } => {
            let ledger = open_chain(&config, &chain)?;
            let board = RewardDistributor::new(ledger, config.protocol_params()).get_leaderboard();
            println!("{}", serde_json::to_string_pretty(&board)?);
        }
        Command::Config => {
            print!("{}", config.to_toml_string());
        }
    }

    Ok(())
}
