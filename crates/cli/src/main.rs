//! Kennel inventory CLI
//!
//! Command-line front end for the location-bucket ledger. Every command
//! prints its result as JSON on stdout; logs go to stderr.

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use kennel_core::ItemId;
use kennel_events::InMemoryEventBus;
use kennel_infra::{JsonFileLedgerStore, LedgerConfig, LedgerService};
use kennel_inventory::{Kind, LedgerNotification, PresetType, ReduceMode, ReduceReason};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "kennel")]
#[command(about = "Location-bucket inventory ledger for kennel supplies")]
#[command(version)]
struct Cli {
    /// Ledger JSON file (overrides KENNEL_DATA_PATH)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Retained activity events (overrides KENNEL_ACTIVITY_CAP)
    #[arg(long, global = true)]
    activity_cap: Option<usize>,

    /// Over-reduction policy: clamped or strict (overrides KENNEL_REDUCE_MODE)
    #[arg(long, global = true)]
    reduce_mode: Option<ReduceMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create, inspect and edit items
    #[command(subcommand)]
    Item(ItemCommand),

    /// Add stock to a location
    Add {
        item: ItemId,
        amount: f64,
        /// Target bucket (default: the kind's default source)
        #[arg(long)]
        location: Option<String>,
    },

    /// Remove stock from a location
    Reduce {
        item: ItemId,
        amount: f64,
        #[arg(long)]
        location: Option<String>,
        /// used or discarded
        #[arg(long, default_value = "used")]
        reason: ReduceReason,
        /// Fail instead of clamping when the bucket holds less than `amount`
        #[arg(long)]
        strict: bool,
    },

    /// Move stock between two locations of one item
    Transfer {
        item: ItemId,
        amount: f64,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },

    /// Zero every bucket of an item
    Reset { item: ItemId },

    /// Show on-hand quantity, threshold and low flag
    Status { item: ItemId },

    /// List low items of a kind
    Low {
        #[arg(long)]
        kind: Kind,
        /// Also run today's alert check
        #[arg(long)]
        notify: bool,
    },

    /// Audit trail
    #[command(subcommand)]
    Activity(ActivityCommand),

    /// Location name presets
    #[command(subcommand)]
    Preset(PresetCommand),

    /// Per-kind settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Vendor reorders
    #[command(subcommand)]
    Reorder(ReorderCommand),

    /// Write a snapshot bundle
    Export {
        /// Output file (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Replace ledger sections from a snapshot bundle
    Import {
        /// Bundle file, or `-` for stdin
        path: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum ItemCommand {
    Create(CreateArgs),
    List {
        #[arg(long)]
        kind: Kind,
        /// Include archived items
        #[arg(long)]
        all: bool,
    },
    Show {
        item: ItemId,
    },
    /// Find an item by its external identifier
    Find {
        #[arg(long)]
        kind: Kind,
        #[arg(long)]
        id_type: String,
        #[arg(long)]
        id_value: String,
    },
    Update(UpdateArgs),
    Archive {
        item: ItemId,
    },
    Unarchive {
        item: ItemId,
    },
}

#[derive(Debug, Args)]
struct CreateArgs {
    #[arg(long)]
    kind: Kind,
    #[arg(long)]
    name: String,
    /// Initial quantity of the default bucket
    #[arg(long)]
    seed: Option<f64>,
    #[arg(long)]
    unit: Option<String>,
    /// Low-stock threshold override
    #[arg(long)]
    min: Option<f64>,
    #[arg(long, requires = "id_value")]
    id_type: Option<String>,
    #[arg(long, requires = "id_type")]
    id_value: Option<String>,
}

#[derive(Debug, Args)]
struct UpdateArgs {
    item: ItemId,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    unit: Option<String>,
    #[arg(long, conflicts_with = "clear_min")]
    min: Option<f64>,
    /// Drop the threshold override so the kind default applies
    #[arg(long)]
    clear_min: bool,
    #[arg(long, requires = "id_value", conflicts_with = "clear_identifier")]
    id_type: Option<String>,
    #[arg(long, requires = "id_type")]
    id_value: Option<String>,
    #[arg(long)]
    clear_identifier: bool,
}

#[derive(Debug, Subcommand)]
enum ActivityCommand {
    List {
        #[arg(long)]
        kind: Kind,
        /// Only this item's events
        #[arg(long)]
        item: Option<ItemId>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    Clear {
        #[arg(long)]
        kind: Kind,
    },
}

#[derive(Debug, Subcommand)]
enum PresetCommand {
    List {
        #[arg(long)]
        kind: Kind,
        /// source or dest
        #[arg(long = "type")]
        ty: PresetType,
    },
    Add {
        #[arg(long)]
        kind: Kind,
        #[arg(long = "type")]
        ty: PresetType,
        name: String,
    },
    Remove {
        #[arg(long)]
        kind: Kind,
        #[arg(long = "type")]
        ty: PresetType,
        name: String,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsCommand {
    Show {
        /// One kind only (default: both)
        #[arg(long)]
        kind: Option<Kind>,
    },
    Set {
        #[arg(long)]
        kind: Kind,
        #[arg(long)]
        default_min: Option<f64>,
        #[arg(long)]
        alerts: Option<bool>,
        #[arg(long)]
        default_bucket: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum ReorderCommand {
    Place {
        item: ItemId,
        #[arg(long)]
        vendor: String,
        #[arg(long)]
        quantity: f64,
        #[arg(long)]
        notes: Option<String>,
    },
    Receive {
        item: ItemId,
        /// Bucket to receive into (default: the kind's default source)
        #[arg(long)]
        location: Option<String>,
    },
    Cancel {
        item: ItemId,
    },
    List,
}

fn main() {
    let cli = Cli::parse();
    kennel_observability::init();

    match run(cli) {
        Ok(()) => process::exit(0),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "command failed");
            eprintln!("error: {e:#}");
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    tracing::debug!(path = %config.data_path.display(), cap = config.activity_cap, mode = ?config.reduce_mode, "configuration loaded");

    let store = JsonFileLedgerStore::open(&config.data_path, config.activity_cap)
        .with_context(|| format!("failed to open ledger at {}", config.data_path.display()))?;
    let service = LedgerService::new(store, InMemoryEventBus::<LedgerNotification>::new())
        .with_reduce_mode(config.reduce_mode);
    let notifications = service.subscribe();

    let output = commands::execute(&service, cli.command)?;

    for note in notifications.drain() {
        if let LedgerNotification::LowStock(alert) = note {
            let names: Vec<_> = alert.items.iter().map(|i| i.name.as_str()).collect();
            tracing::warn!(kind = %alert.kind, date = %alert.date, items = ?names, "items are running low");
        }
    }

    if let Some(output) = output {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}

fn resolve_config(cli: &Cli) -> anyhow::Result<LedgerConfig> {
    let mut config = LedgerConfig::from_env()?;
    if let Some(path) = &cli.data {
        config.data_path = path.clone();
    }
    if let Some(cap) = cli.activity_cap {
        anyhow::ensure!(cap > 0, "--activity-cap must be at least 1");
        config.activity_cap = cap;
    }
    if let Some(mode) = cli.reduce_mode {
        config.reduce_mode = mode;
    }
    Ok(config)
}
