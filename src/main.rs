use std::{fs, path::PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kyc_ledger::kyc::{CallerIdentity, Kyc, MemoryStore, RecordKind, ledger};

mod seed;

/// The size of the channel for submitting invocations to the ledger.
const CHANNEL_SIZE: usize = 100;

/// KYC registry over a local ledger snapshot.
#[derive(Parser)]
#[command(name = "kyc-ledger", version, about)]
struct Cli {
    /// CSV snapshot holding the world state
    #[arg(long, default_value = "data/state.csv", global = true)]
    state: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Seed the ledger with customer and bank records
    Init {
        #[arg(long, default_value = "data/customers.json")]
        customers: PathBuf,
        #[arg(long, default_value = "data/banks.json")]
        banks: PathBuf,
    },
    /// Check whether customer records were registered by an organization
    Check {
        /// Identity of the calling organization
        #[arg(long)]
        caller: String,
        /// Customer keys, e.g. customer:0
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Print the record stored under a key as JSON
    Show { key: String },
    /// Write every stored customer as CSV
    Dump,
}

#[derive(Serialize)]
struct CheckRow<'a> {
    key: &'a str,
    registered: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CustomerRow<'a> {
    key: &'a str,
    name: &'a str,
    id_number: i64,
    org_name: &'a str,
    org_num: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = if cli.state.exists() {
        MemoryStore::load_csv(&cli.state)
            .with_context(|| format!("Failed to load {}", cli.state.display()))?
    } else {
        MemoryStore::new()
    };

    let (mut ledger, handle) = ledger::channel(store, CHANNEL_SIZE);
    let runner = tokio::spawn(async move {
        ledger.run().await;
        ledger
    });

    let mut commit = false;
    let mut dump_after = false;
    match cli.command {
        Command::Init { customers, banks } => {
            let customers = seed::read_customers(&customers)?;
            let banks = seed::read_banks(&banks)?;
            let summary = handle.initialize_from_json(customers, banks).await?;
            info!(
                customers = ?summary.customers,
                banks = ?summary.banks,
                "ledger initialized"
            );
            commit = true;
        }
        Command::Check { caller, keys } => {
            let caller = CallerIdentity::new(caller);
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            for key in &keys {
                let registered = handle.is_registered_by(caller.clone(), key).await?;
                writer.serialize(CheckRow { key, registered })?;
            }
            writer.flush()?;
        }
        Command::Show { key } => {
            let json = match RecordKind::parse_key(&key) {
                Some((RecordKind::Customer, id)) => {
                    serde_json::to_string_pretty(&handle.read_customer(id).await?)?
                }
                Some((RecordKind::Bank, id)) => {
                    serde_json::to_string_pretty(&handle.read_bank(id).await?)?
                }
                None => bail!("{key} is not a customer or bank key"),
            };
            println!("{json}");
        }
        Command::Dump => dump_after = true,
    }

    drop(handle); // Close the channel so the ledger stops once it is drained
    let store = runner
        .await
        .context("Failed to join the ledger task")?
        .into_store();

    if commit {
        if let Some(parent) = cli.state.parent() {
            fs::create_dir_all(parent)?;
        }
        store
            .save_csv(&cli.state)
            .with_context(|| format!("Failed to save {}", cli.state.display()))?;
    }
    if dump_after {
        dump(store)?;
    }
    Ok(())
}

/// Writes every stored customer to stdout as CSV, in identifier order.
fn dump(mut store: MemoryStore) -> Result<()> {
    let mut ids: Vec<_> = store
        .iter()
        .filter_map(|(key, _)| match RecordKind::parse_key(key) {
            Some((RecordKind::Customer, id)) => Some(id),
            _ => None,
        })
        .collect();
    ids.sort_unstable();

    let kyc = Kyc::new(&mut store);
    let mut writer = csv::Writer::from_writer(std::io::stdout());
    for id in ids {
        let customer = kyc.read_customer(id)?;
        let credentials = customer.get_registered_by();
        writer.serialize(CustomerRow {
            key: &RecordKind::Customer.key(id),
            name: customer.get_name(),
            id_number: customer.get_id_number(),
            org_name: credentials.get_org_name(),
            org_num: credentials.get_org_num(),
        })?;
    }
    writer.flush()?;
    Ok(())
}
