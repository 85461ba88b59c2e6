//! Binary entry point for reward-indexer.
//!
//! Replays a JSON-lines file of decoded events through the staking handlers,
//! keeping state in a checksummed snapshot between runs.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use staking_reward_indexer::config::{create_default_config, Config, NetworkType};
use staking_reward_indexer::database::DatabaseManager;
use staking_reward_indexer::{Amount, Indexer, SubstrateEvent};

#[derive(Debug, Parser)]
#[command(name = "reward-indexer", version, about = "Staking reward event indexer")]
struct Cli {
    /// Config file (defaults are used when omitted).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a JSON-lines event file through the registered handlers.
    Replay {
        #[arg(long)]
        events: PathBuf,
        /// Snapshot to resume from and write back to.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Print stored totals, or one account's records.
    Totals {
        #[arg(long)]
        snapshot: Option<PathBuf>,
        #[arg(long)]
        account: Option<String>,
    },
    /// Write a default config file.
    InitConfig {
        #[arg(long, default_value = "polkadot")]
        network: String,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Where to write the file (defaults to `<data-dir>/config.toml`).
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(p) => Config::from_file(p).with_context(|| format!("loading {}", p.display())),
        None => Ok(Config::default()),
    }
}

fn read_events(path: &Path) -> anyhow::Result<Vec<SubstrateEvent>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut events = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: SubstrateEvent = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid event", path.display(), n + 1))?;
        events.push(event);
    }
    Ok(events)
}

async fn replay(config: &Config, events: &Path, snapshot: Option<PathBuf>) -> anyhow::Result<()> {
    let snapshot_path = snapshot.unwrap_or_else(|| config.snapshot_path());
    let db = Arc::new(DatabaseManager::in_memory(config.database.clone()));
    if snapshot_path.exists() {
        db.read_snapshot(&snapshot_path).await?;
    }

    let events = read_events(events)?;
    log::info!(
        "replaying {} events on {}",
        events.len(),
        config.network.display_name()
    );

    let mut indexer = Indexer::from_config(config, Arc::clone(&db))?;
    let outcome = indexer.process_events(&events).await;

    // Keep whatever was applied before a failure.
    if let Some(parent) = snapshot_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    db.write_snapshot(&snapshot_path).await?;
    outcome?;

    let totals = db.store().sum_rewards().await?;
    println!("{}", serde_json::to_string_pretty(&totals)?);
    Ok(())
}

async fn totals(
    config: &Config,
    snapshot: Option<PathBuf>,
    account: Option<String>,
) -> anyhow::Result<()> {
    let snapshot_path = snapshot.unwrap_or_else(|| config.snapshot_path());
    if !snapshot_path.exists() {
        bail!("no snapshot at {}", snapshot_path.display());
    }
    let db = DatabaseManager::in_memory(config.database.clone());
    db.read_snapshot(&snapshot_path).await?;

    match account {
        Some(account) => {
            let records = db.rewards_for_account(&account).await?;
            let total = db.store().get_sum_reward(&account).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
            let recorded: Amount = records.iter().map(|r| &r.amount).sum();
            match total {
                Some(total) => {
                    println!("{total}");
                    if recorded != total.total_amount {
                        log::warn!(
                            "{account}: records sum to {recorded}, running total is {}",
                            total.total_amount
                        );
                    }
                }
                None => println!("no total for {account}"),
            }
        }
        None => {
            let totals = db.store().sum_rewards().await?;
            println!("{}", serde_json::to_string_pretty(&totals)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    match cli.command {
        Command::Replay { events, snapshot } => replay(&config, &events, snapshot).await,
        Command::Totals { snapshot, account } => totals(&config, snapshot, account).await,
        Command::InitConfig {
            network,
            data_dir,
            path,
        } => {
            let network: NetworkType = network.parse()?;
            let (_, written) = create_default_config(network, data_dir, path)?;
            println!("wrote {}", written.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const EVENT: &str = r#"{"block":{"height":7,"timestamp":"2021-07-01T00:00:00Z"},"idx":1,"section":"staking","method":"Rewarded","data":[{"AccountId":"A1"},{"Balance":500}]}"#;

    #[test]
    fn read_events_skips_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{EVENT}").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "   ").unwrap();
        writeln!(file, "{EVENT}").unwrap();

        let events = read_events(file.path()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].block.height, 7);
        assert_eq!(events[0].event_type(), "staking.Rewarded");
    }

    #[test]
    fn read_events_reports_bad_line_number() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{EVENT}").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{{not json").unwrap();

        let err = read_events(file.path()).unwrap_err();
        assert!(format!("{err}").ends_with(":3: invalid event"), "{err}");
    }

    #[test]
    fn read_events_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_events(&dir.path().join("absent.jsonl")).is_err());
    }
}
