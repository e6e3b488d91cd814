//! # Order Submit Tool
//!
//! Builds an order from a JSON draft file against live stock and submits it
//! in one atomic create.
//!
//! ## Usage
//! ```bash
//! # Validate and price only
//! cargo run -p petal-client --bin petal-submit -- --file order.json --dry-run
//!
//! # Submit, overriding the configured location
//! cargo run -p petal-client --bin petal-submit -- --file order.json --location recShop1
//! ```
//!
//! ## Draft File
//! ```json
//! {
//!   "status": "Draft",
//!   "details": { "client_id": "recClient1", "delivery_type": "Pickup" },
//!   "items": [
//!     { "item_id": "recRose", "quantity": 3, "markup": 10 },
//!     { "item_id": "recBouquet1" }
//!   ],
//!   "discount_percentage": 10,
//!   "delivery_price": 5,
//!   "attachments": ["card.jpg"]
//! }
//! ```

use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use petal_client::api::Attachment;
use petal_client::{ClientConfig, ClientError, HttpBackend, OrderComposer};
use petal_core::lifecycle::OrderStatus;
use petal_core::cart::CartStore;
use petal_core::order::{OrderDetails, OrderDraft};
use petal_core::pricing::{Discount, Markup};
use petal_core::stock::CatalogItem;
use petal_core::{CoreResult, ItemId, ItemType, Money, ValidationError};

#[derive(Debug, Deserialize)]
struct DraftFile {
    #[serde(default)]
    location_id: Option<String>,
    #[serde(default)]
    status: Option<OrderStatus>,
    #[serde(default)]
    details: OrderDetails,
    #[serde(default)]
    items: Vec<DraftLine>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    discount_percentage: Option<Decimal>,
    #[serde(default)]
    delivery_price: Option<Money>,
    #[serde(default)]
    attachments: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct DraftLine {
    item_id: String,
    #[serde(default = "default_quantity")]
    quantity: u32,
    #[serde(default)]
    markup: Option<i32>,
    /// Manual unit price; replaces any markup.
    #[serde(default)]
    price: Option<Money>,
}

fn default_quantity() -> u32 {
    1
}

struct Args {
    file: Option<PathBuf>,
    config: Option<PathBuf>,
    location: Option<String>,
    dry_run: bool,
}

fn print_help() {
    println!("Petal Orders Submit Tool");
    println!();
    println!("Usage: petal-submit --file <PATH> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -f, --file <PATH>      Order draft JSON file");
    println!("  -c, --config <PATH>    Client config file (default: platform config dir)");
    println!("  -l, --location <ID>    Shop location id (overrides draft and config)");
    println!("  -n, --dry-run          Validate and print totals without submitting");
    println!("  -h, --help             Show this help message");
}

/// Returns `None` when help was requested.
fn parse_args() -> Option<Args> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args {
        file: None,
        config: None,
        location: None,
        dry_run: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--file" | "-f" if i + 1 < args.len() => {
                parsed.file = Some(PathBuf::from(&args[i + 1]));
                i += 1;
            }
            "--config" | "-c" if i + 1 < args.len() => {
                parsed.config = Some(PathBuf::from(&args[i + 1]));
                i += 1;
            }
            "--location" | "-l" if i + 1 < args.len() => {
                parsed.location = Some(args[i + 1].clone());
                i += 1;
            }
            "--dry-run" | "-n" => parsed.dry_run = true,
            "--help" | "-h" => return None,
            other => warn!(arg = other, "Ignoring unknown argument"),
        }
        i += 1;
    }
    Some(parsed)
}

/// Adds a flower or supplement line with its pricing.
///
/// Returns `Ok(false)` when the quantity is 0 and nothing was added.
fn add_catalog_line(store: &mut CartStore, item: &CatalogItem, entry: &DraftLine) -> CoreResult<bool> {
    if !store.add_catalog_item(item, entry.quantity)? {
        return Ok(false);
    }
    apply_pricing(store, entry)?;
    Ok(true)
}

/// Markup first, then a manual price, which replaces it.
fn apply_pricing(store: &mut CartStore, entry: &DraftLine) -> CoreResult<()> {
    let item_id = ItemId::new(entry.item_id.clone());
    if let Some(markup) = entry.markup {
        store.set_markup(&item_id, Some(Markup::new(markup)?))?;
    }
    if let Some(price) = entry.price {
        store.set_price(&item_id, price)?;
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,petal_core=debug,petal_client=debug"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let Some(args) = parse_args() else {
        print_help();
        return Ok(());
    };
    let Some(file) = args.file else {
        print_help();
        return Err("missing --file".into());
    };

    let config = ClientConfig::load(args.config)?;
    let contents = tokio::fs::read_to_string(&file).await?;
    let draft_file: DraftFile = serde_json::from_str(&contents)?;

    let location = args
        .location
        .or_else(|| draft_file.location_id.clone())
        .or_else(|| config.location_id().map(str::to_string))
        .ok_or(ClientError::Core(ValidationError::required("Shop location").into()))?;

    println!("Petal Orders Submit");
    println!("===================");
    println!("Service:  {}", config.base_url());
    println!("Location: {}", location);
    println!();

    let composer = OrderComposer::new(Arc::new(HttpBackend::new(&config)?));
    let catalog = composer.load_catalog(&location).await?;
    info!(items = catalog.stock.len(), "Stock loaded");

    let mut draft = OrderDraft::new(catalog.stock.clone());
    draft.details = draft_file.details;
    if let Some(status) = draft_file.status {
        draft.set_status(status)?;
    }

    for entry in &draft_file.items {
        let item_id = ItemId::new(entry.item_id.clone());
        let Some(item) = catalog.find(&item_id) else {
            return Err(format!("Item {} is not available at {}", item_id, location).into());
        };

        let added = if item.item_type == ItemType::Bouquet {
            let line = composer.bouquet_line(item).await?;
            draft.store.add_or_update(line)?;
            apply_pricing(&mut draft.store, entry)?;
            true
        } else {
            add_catalog_line(&mut draft.store, item, entry)?
        };
        if !added {
            warn!(item_id = %item_id, "Skipping line with quantity 0");
        }
    }

    if let Some(percent) = draft_file.discount_percentage {
        draft.store.set_discount(Discount::new(percent));
    }
    if let Some(price) = draft_file.delivery_price {
        draft.store.set_delivery_price(price);
    }

    for line in draft.store.lines() {
        println!(
            "  {:<28} x{:<4} {:>9}",
            line.display_name(),
            line.quantity(),
            line.line_total().to_string()
        );
    }
    let totals = draft.totals();
    println!();
    println!("  Subtotal:  {:>9}", totals.subtotal.to_string());
    println!("  Discount:  {:>9}", totals.discount_amount.to_string());
    println!("  Delivery:  {:>9}", totals.delivery_price.to_string());
    println!("  Total:     {:>9}", totals.total.to_string());
    println!();

    if args.dry_run {
        draft.validate()?;
        println!("✓ Draft is valid ({}), not submitted", draft.status());
        return Ok(());
    }

    let mut attachments = Vec::new();
    for path in &draft_file.attachments {
        match Attachment::from_path(path).await {
            Ok(attachment) => attachments.push(attachment),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping attachment"),
        }
    }

    let outcome = composer.create_order(&draft, &attachments).await?;
    println!("✓ Order {} created as {}", outcome.order_id, outcome.status);
    for warning in &outcome.warnings {
        println!("⚠ {}", warning);
    }

    Ok(())
}
