//! Subcommand handlers.
//!
//! Each handler calls exactly one ledger operation and turns its result into
//! the JSON printed on stdout.

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use serde_json::{Value, json};

use kennel_core::ItemId;
use kennel_events::EventBus;
use kennel_infra::{LedgerService, LedgerStore};
use kennel_inventory::{
    Identifier, ItemPatch, Kind, LedgerNotification, NewItem, ReduceMode, SettingsPatch,
};

use crate::{
    ActivityCommand, Commands, CreateArgs, ItemCommand, PresetCommand, ReorderCommand,
    SettingsCommand, UpdateArgs,
};

pub fn execute<S, B>(service: &LedgerService<S, B>, command: Commands) -> anyhow::Result<Option<Value>>
where
    S: LedgerStore,
    B: EventBus<LedgerNotification>,
{
    let value = match command {
        Commands::Item(cmd) => item(service, cmd)?,
        Commands::Add {
            item,
            amount,
            location,
        } => {
            let location = resolve_location(service, item, location)?;
            to_json(service.add_quantity(item, &location, amount)?)?
        }
        Commands::Reduce {
            item,
            amount,
            location,
            reason,
            strict,
        } => {
            let location = resolve_location(service, item, location)?;
            let mode = if strict {
                ReduceMode::Strict
            } else {
                service.reduce_mode()
            };
            to_json(service.reduce_quantity_with_mode(item, &location, amount, reason, mode)?)?
        }
        Commands::Transfer {
            item,
            amount,
            from,
            to,
        } => to_json(service.transfer(item, &from, &to, amount)?)?,
        Commands::Reset { item } => to_json(service.reset_item(item)?)?,
        Commands::Status { item } => to_json(service.stock_status(item)?)?,
        Commands::Low { kind, notify } => {
            let alert = if notify {
                service.check_low_stock(kind)?
            } else {
                None
            };
            json!({
                "kind": kind,
                "items": service.low_items(kind)?,
                "alert": alert,
            })
        }
        Commands::Activity(cmd) => activity(service, cmd)?,
        Commands::Preset(cmd) => preset(service, cmd)?,
        Commands::Settings(cmd) => settings(service, cmd)?,
        Commands::Reorder(cmd) => reorder(service, cmd)?,
        Commands::Export { out } => {
            let json = service.export_json()?;
            match out {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    tracing::info!(path = %path.display(), "snapshot exported");
                    return Ok(None);
                }
                None => serde_json::from_str(&json)?,
            }
        }
        Commands::Import { path } => {
            let payload = read_payload(&path)?;
            service.import_json(&payload)?;
            json!({ "imported": true })
        }
    };
    Ok(Some(value))
}

fn item<S, B>(service: &LedgerService<S, B>, command: ItemCommand) -> anyhow::Result<Value>
where
    S: LedgerStore,
    B: EventBus<LedgerNotification>,
{
    match command {
        ItemCommand::Create(args) => to_json(service.create_item(new_item(args))?),
        ItemCommand::List { kind, all } => to_json(service.list_items(kind, all)?),
        ItemCommand::Show { item } => to_json(service.find_item(item)?),
        ItemCommand::Find {
            kind,
            id_type,
            id_value,
        } => {
            let identifier = Identifier::new(id_type, id_value);
            match service.find_by_identifier(kind, &identifier)? {
                Some(item) => to_json(item),
                None => anyhow::bail!("no {kind} item with identifier {}:{}", identifier.scheme, identifier.value),
            }
        }
        ItemCommand::Update(args) => {
            let item = args.item;
            to_json(service.update_item(item, item_patch(args))?)
        }
        ItemCommand::Archive { item } => to_json(service.archive_item(item)?),
        ItemCommand::Unarchive { item } => to_json(service.unarchive_item(item)?),
    }
}

fn activity<S, B>(service: &LedgerService<S, B>, command: ActivityCommand) -> anyhow::Result<Value>
where
    S: LedgerStore,
    B: EventBus<LedgerNotification>,
{
    match command {
        ActivityCommand::List { kind, item, limit } => match item {
            Some(item) => to_json(service.item_activity(item, limit)?),
            None => to_json(service.list_activity(kind, limit)?),
        },
        ActivityCommand::Clear { kind } => {
            let removed = service.clear_activity(kind)?;
            Ok(json!({ "kind": kind, "removed": removed }))
        }
    }
}

fn preset<S, B>(service: &LedgerService<S, B>, command: PresetCommand) -> anyhow::Result<Value>
where
    S: LedgerStore,
    B: EventBus<LedgerNotification>,
{
    match command {
        PresetCommand::List { kind, ty } => to_json(service.presets(kind, ty)?),
        PresetCommand::Add { kind, ty, name } => {
            let added = service.add_preset(kind, ty, &name)?;
            Ok(json!({ "added": added, "presets": service.presets(kind, ty)? }))
        }
        PresetCommand::Remove { kind, ty, name } => {
            let removed = service.remove_preset(kind, ty, &name)?;
            Ok(json!({ "removed": removed, "presets": service.presets(kind, ty)? }))
        }
    }
}

fn settings<S, B>(service: &LedgerService<S, B>, command: SettingsCommand) -> anyhow::Result<Value>
where
    S: LedgerStore,
    B: EventBus<LedgerNotification>,
{
    match command {
        SettingsCommand::Show { kind: Some(kind) } => to_json(service.settings(kind)?),
        SettingsCommand::Show { kind: None } => to_json(service.all_settings()?),
        SettingsCommand::Set {
            kind,
            default_min,
            alerts,
            default_bucket,
        } => to_json(service.update_settings(
            kind,
            SettingsPatch {
                default_min_on_hand: default_min,
                enable_low_alerts: alerts,
                default_source_bucket_name: default_bucket,
            },
        )?),
    }
}

fn reorder<S, B>(service: &LedgerService<S, B>, command: ReorderCommand) -> anyhow::Result<Value>
where
    S: LedgerStore,
    B: EventBus<LedgerNotification>,
{
    match command {
        ReorderCommand::Place {
            item,
            vendor,
            quantity,
            notes,
        } => to_json(service.place_reorder(item, &vendor, quantity, notes)?),
        ReorderCommand::Receive { item, location } => {
            let (request, change) = service.receive_reorder(item, location.as_deref())?;
            Ok(json!({ "request": request, "item": change.item }))
        }
        ReorderCommand::Cancel { item } => to_json(service.cancel_reorder(item)?),
        ReorderCommand::List => to_json(service.open_reorders()?),
    }
}

/// An explicit location, else the default source of the item's kind.
fn resolve_location<S, B>(
    service: &LedgerService<S, B>,
    item: ItemId,
    location: Option<String>,
) -> anyhow::Result<String>
where
    S: LedgerStore,
    B: EventBus<LedgerNotification>,
{
    match location {
        Some(location) => Ok(location),
        None => {
            let kind: Kind = service.find_item(item)?.kind();
            Ok(service.settings(kind)?.default_source_bucket_name)
        }
    }
}

fn new_item(args: CreateArgs) -> NewItem {
    let mut fields = NewItem::new(args.name, args.kind);
    fields.seed_quantity = args.seed;
    fields.min_on_hand = args.min;
    if let Some(unit) = args.unit {
        fields.unit = unit;
    }
    if let (Some(scheme), Some(value)) = (args.id_type, args.id_value) {
        fields.identifier = Some(Identifier::new(scheme, value));
    }
    fields
}

fn item_patch(args: UpdateArgs) -> ItemPatch {
    let identifier = match (args.id_type, args.id_value) {
        (Some(scheme), Some(value)) => Some(Some(Identifier::new(scheme, value))),
        _ if args.clear_identifier => Some(None),
        _ => None,
    };
    let min_on_hand = match args.min {
        Some(min) => Some(Some(min)),
        None if args.clear_min => Some(None),
        None => None,
    };
    ItemPatch {
        name: args.name,
        unit: args.unit,
        identifier,
        min_on_hand,
    }
}

fn read_payload(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut payload = String::new();
        std::io::stdin()
            .read_to_string(&mut payload)
            .context("failed to read bundle from stdin")?;
        return Ok(payload);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn to_json(value: impl Serialize) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(value)?)
}
