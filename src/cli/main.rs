//! Policy Store CLI
//!
//! Inspect and edit policy rules kept in a document store, by default the
//! file store under `./policy-data`.

use policy_store_adapter::config::DEFAULT_URL;
use policy_store_adapter::policy::section_of;
use policy_store_adapter::telemetry::init_logging;
use policy_store_adapter::{
    Adapter, AdapterConfig, Owned, PolicyModel, Selector, StoreAdapter,
};

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;

/// Policy Store CLI
#[derive(Parser, Debug)]
#[command(name = "policy-store")]
#[command(about = "Manage authorization policy rules kept in a document store")]
#[command(version)]
struct Args {
    /// Store URL, `file://<dir>` or `memory://` (overrides configuration;
    /// defaults to `file://policy-data`)
    #[arg(short, long)]
    url: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Database name (overrides configuration)
    #[arg(long)]
    database: Option<String>,

    /// Collection name (overrides configuration)
    #[arg(long)]
    collection: Option<String>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Enable JSON log format
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace all stored rules with the rules of a policy CSV file
    Import {
        /// Policy file, one `ptype, v0, v1, ...` rule per line
        file: PathBuf,
    },
    /// Print stored rules
    List {
        /// Only rules matching `key=value` (keys: ptype, v0..v5)
        #[arg(short, long, value_parser = parse_constraint)]
        filter: Vec<(String, String)>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
    },
    /// Store one rule
    Add {
        /// Policy type, e.g. `p` or `g`
        ptype: String,
        /// Rule values
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Delete one rule equal to the given values
    Remove {
        /// Policy type
        ptype: String,
        /// Rule values
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Delete every rule matching values from a field index on; empty
    /// values match anything
    RemoveFiltered {
        /// Policy type
        ptype: String,
        /// Stored field the first value lines up with
        #[arg(short = 'i', long, default_value_t = 0, allow_negative_numbers = true)]
        field_index: i32,
        /// Field values
        values: Vec<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Csv,
    Json,
    Yaml,
}

/// Store used when no URL is configured.
const DEFAULT_CLI_URL: &str = "file://policy-data";

fn parse_constraint(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {:?}", raw))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

fn section(ptype: &str) -> anyhow::Result<&str> {
    section_of(ptype).ok_or_else(|| anyhow!("policy type cannot be empty"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.json_logs)?;

    let mut config = AdapterConfig::load(args.config.as_deref())?;
    match args.url {
        Some(url) => config = config.with_url(url),
        None if config.url == DEFAULT_URL => config = config.with_url(DEFAULT_CLI_URL),
        None => {}
    }
    if let Some(database) = args.database {
        config = config.with_database(database);
    }
    if let Some(collection) = args.collection {
        config = config.with_collection(collection);
    }
    config.validate()?;

    let url = config.url.clone();
    let mut adapter = StoreAdapter::open(config)
        .await
        .with_context(|| format!("opening {}", url))?;

    let outcome = run(&mut adapter, args.command).await;
    let closed = adapter.close().await;
    outcome?;
    closed?;
    Ok(())
}

async fn run(adapter: &mut StoreAdapter<Owned>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Import { file } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let model = PolicyModel::from_csv(&content)?;
            adapter.save_policy(&model).await?;
            let stored = adapter.metrics().records_inserted;
            info!(rules = stored, "imported policy");
            println!("imported {} rules", stored);
        }
        Command::List { filter, format } => {
            let selector: Selector = filter.into_iter().collect();
            let mut model = PolicyModel::new();
            adapter.load_filtered_policy(&mut model, Some(&selector)).await?;

            match format {
                Format::Csv => print!("{}", model.to_csv()),
                Format::Json => println!("{}", serde_json::to_string_pretty(&model)?),
                Format::Yaml => print!("{}", serde_yaml::to_string(&model)?),
            }
        }
        Command::Add { ptype, values } => {
            adapter.add_policy(section(&ptype)?, &ptype, &values).await?;
        }
        Command::Remove { ptype, values } => {
            adapter.remove_policy(section(&ptype)?, &ptype, &values).await?;
            println!("removed {} rules", adapter.metrics().records_removed);
        }
        Command::RemoveFiltered {
            ptype,
            field_index,
            values,
        } => {
            adapter
                .remove_filtered_policy(section(&ptype)?, &ptype, field_index, &values)
                .await?;
            println!("removed {} rules", adapter.metrics().records_removed);
        }
    }

    Ok(())
}
