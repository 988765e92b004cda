//! `planboard` command line
//!
//! Operates on a single JSON file store. Every invocation loads the store,
//! applies one command, flushes pending saves and exits.

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use planboard_core::{diff, AccessTier, ItemId, ItemTypeId, WidgetId, WidgetSize};
use planboard_engine::{
    ConfigChange, EntityKey, Planboard, PlanboardConfig, SaveOutcome, TierPolicy,
};
use planboard_storage::FileStore;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn cli() -> Command {
    let item_type = || {
        Arg::new("type")
            .required(true)
            .value_parser(value_parser!(ItemTypeId))
            .help("Item type: countdown, budget, packing, itinerary")
    };

    Command::new("planboard")
        .version(planboard_engine::VERSION)
        .about("Trip dashboard widgets and items on a local file store")
        .subcommand_required(true)
        .arg(
            Arg::new("store")
                .long("store")
                .global(true)
                .default_value("planboard.json")
                .value_parser(value_parser!(PathBuf))
                .help("Store file"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("tier")
                .long("tier")
                .global(true)
                .default_value("standard")
                .value_parser(value_parser!(AccessTier))
                .help("Account tier: anonymous, standard, premium"),
        )
        .subcommand(
            Command::new("widgets")
                .about("Manage dashboard widgets")
                .subcommand_required(true)
                .subcommand(Command::new("list").about("List widgets in order"))
                .subcommand(
                    Command::new("add")
                        .about("Add an unbound widget")
                        .arg(item_type())
                        .arg(
                            Arg::new("size")
                                .long("size")
                                .default_value("medium")
                                .value_parser(value_parser!(WidgetSize))
                                .help("small, medium, large, full"),
                        ),
                )
                .subcommand(
                    Command::new("remove")
                        .about("Remove a widget")
                        .arg(Arg::new("id").required(true)),
                )
                .subcommand(
                    Command::new("reorder")
                        .about("Set the widget order; every widget id exactly once")
                        .arg(Arg::new("ids").required(true).num_args(1..)),
                )
                .subcommand(
                    Command::new("bind")
                        .about("Bind a widget to an item, or unbind when no item is given")
                        .arg(Arg::new("id").required(true))
                        .arg(Arg::new("item")),
                ),
        )
        .subcommand(
            Command::new("items")
                .about("Manage saved items")
                .subcommand_required(true)
                .subcommand(Command::new("list").about("List items of a type").arg(item_type()))
                .subcommand(
                    Command::new("create")
                        .about("Create a default item")
                        .arg(item_type())
                        .arg(Arg::new("name").long("name").help("Display name")),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete an item and unbind its widgets")
                        .arg(item_type())
                        .arg(Arg::new("id").required(true)),
                )
                .subcommand(
                    Command::new("rename")
                        .about("Rename an item")
                        .arg(item_type())
                        .arg(Arg::new("id").required(true))
                        .arg(Arg::new("name").required(true)),
                ),
        )
        .subcommand(
            Command::new("plugins")
                .about("List item plugins")
                .arg(
                    Arg::new("all")
                        .long("all")
                        .action(ArgAction::SetTrue)
                        .help("Include plugins above the current tier"),
                ),
        )
        .subcommand(
            Command::new("countdown")
                .about("Time remaining until an RFC 3339 instant")
                .arg(
                    Arg::new("target")
                        .required(true)
                        .value_parser(value_parser!(DateTime<Utc>)),
                ),
        )
}

fn open_board(matches: &ArgMatches) -> anyhow::Result<Planboard> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => PlanboardConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PlanboardConfig::default(),
    }
    .apply_env_overrides()?;

    let path = matches
        .get_one::<PathBuf>("store")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("planboard.json"));
    let store = FileStore::open(&path).with_context(|| format!("opening store {}", path.display()))?;

    let tier = matches
        .get_one::<AccessTier>("tier")
        .copied()
        .unwrap_or(AccessTier::Standard);
    let mut policy = TierPolicy::new(tier);
    for item_type in ItemTypeId::ALL {
        policy = policy.require_plugin(item_type, required_tier(item_type));
    }

    Ok(Planboard::new(Arc::new(store), Arc::new(policy), config))
}

fn required_tier(item_type: ItemTypeId) -> AccessTier {
    match item_type {
        ItemTypeId::Countdown => AccessTier::Anonymous,
        ItemTypeId::Budget | ItemTypeId::Packing => AccessTier::Standard,
        ItemTypeId::Itinerary => AccessTier::Premium,
    }
}

fn report(change: ConfigChange, what: &str) -> anyhow::Result<()> {
    match change {
        ConfigChange::Applied => {
            println!("{what}");
            Ok(())
        }
        ConfigChange::Unchanged => {
            println!("nothing to change");
            Ok(())
        }
        ConfigChange::Failed(err) => Err(err).context("widget configuration not saved"),
    }
}

fn widgets(board: &Planboard, matches: &ArgMatches) -> anyhow::Result<()> {
    let manager = board.widgets();
    match matches.subcommand() {
        Some(("list", _)) => {
            for widget in manager.get_configs() {
                let bound = widget
                    .selected_item_id
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ToString::to_string);
                println!(
                    "{:>3}  {}  {:<10} {:<6} {}",
                    widget.order, widget.id, widget.widget_type, widget.size, bound
                );
            }
            Ok(())
        }
        Some(("add", args)) => {
            let item_type = *args.get_one::<ItemTypeId>("type").context("missing type")?;
            let size = args.get_one::<WidgetSize>("size").copied().unwrap_or_default();
            match manager.create_widget(item_type, size) {
                Some(widget) => {
                    println!("{}", widget.id);
                    Ok(())
                }
                None => bail!("widget was not saved"),
            }
        }
        Some(("remove", args)) => {
            let id = WidgetId::from(args.get_one::<String>("id").context("missing id")?.as_str());
            report(board.remove_widget(&id), "removed")
        }
        Some(("reorder", args)) => {
            let ids: Vec<WidgetId> = args
                .get_many::<String>("ids")
                .context("missing ids")?
                .map(|id| WidgetId::from(id.as_str()))
                .collect();
            report(manager.reorder_widgets(&ids)?, "reordered")
        }
        Some(("bind", args)) => {
            let id = WidgetId::from(args.get_one::<String>("id").context("missing id")?.as_str());
            let item = args.get_one::<String>("item").map(|i| ItemId::from(i.as_str()));
            let what = if item.is_some() { "bound" } else { "unbound" };
            report(board.bind_widget(&id, item)?, what)
        }
        _ => unreachable!("subcommand required"),
    }
}

async fn items(board: &Planboard, matches: &ArgMatches) -> anyhow::Result<()> {
    let Some((name, args)) = matches.subcommand() else {
        unreachable!("subcommand required");
    };
    let item_type = *args.get_one::<ItemTypeId>("type").context("missing type")?;

    match name {
        "list" => {
            for item in board.list_items(item_type)? {
                let meta = item.meta();
                println!("{}  {}  (updated {})", meta.id, meta.name, meta.updated_at.to_rfc3339());
            }
            Ok(())
        }
        "create" => {
            let name = args.get_one::<String>("name").map(String::as_str);
            let id = board.create_item(item_type, name).await?;
            println!("{id}");
            Ok(())
        }
        "delete" => {
            let id = ItemId::from(args.get_one::<String>("id").context("missing id")?.as_str());
            if !board.delete_item(item_type, &id)? {
                bail!("no {item_type} item {id}");
            }
            println!("deleted");
            Ok(())
        }
        "rename" => {
            let id = ItemId::from(args.get_one::<String>("id").context("missing id")?.as_str());
            let new_name = args.get_one::<String>("name").context("missing name")?;
            board.edit_item(item_type, &id, &json!({ "name": new_name }))?;

            match board.save_now(&EntityKey::item(item_type, id)).await {
                SaveOutcome::Saved => println!("renamed"),
                SaveOutcome::Clean => println!("nothing to change"),
                SaveOutcome::Skipped => bail!("saving requires a standard account"),
                SaveOutcome::Failed(err) => return Err(err.into()),
                SaveOutcome::Cancelled => bail!("rename was cancelled"),
            }
            Ok(())
        }
        _ => unreachable!("unknown items subcommand"),
    }
}

fn plugins(board: &Planboard, matches: &ArgMatches) {
    let available: Vec<ItemTypeId> = board.available_plugins().iter().map(|p| p.id()).collect();
    let show_all = matches.get_flag("all");

    for plugin in board.registry().get_all_plugins() {
        let usable = available.contains(&plugin.id());
        if !usable && !show_all {
            continue;
        }
        let mark = if usable { " " } else { "*" };
        println!(
            "{mark} {:<10} {:<14} {:<9} {}",
            plugin.id(),
            plugin.display_name(),
            plugin.required_tier(),
            plugin.description()
        );
    }
}

fn countdown(matches: &ArgMatches) -> anyhow::Result<()> {
    let target = *matches.get_one::<DateTime<Utc>>("target").context("missing target")?;
    let parts = diff(target, Utc::now());
    if parts.elapsed {
        println!("elapsed");
    } else {
        println!(
            "{}d {:02}h {:02}m {:02}s",
            parts.days, parts.hours, parts.minutes, parts.seconds
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "planboard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let matches = cli().get_matches();

    if let Some(("countdown", args)) = matches.subcommand() {
        return countdown(args);
    }

    let board = open_board(&matches)?;
    let result = match matches.subcommand() {
        Some(("widgets", args)) => widgets(&board, args),
        Some(("items", args)) => items(&board, args).await,
        Some(("plugins", args)) => {
            plugins(&board, args);
            Ok(())
        }
        _ => unreachable!("subcommand required"),
    };

    for (key, outcome) in board.shutdown().await {
        if let SaveOutcome::Failed(err) = outcome {
            tracing::warn!(%key, error = %err, "unsaved changes lost");
        }
    }
    result
}
