//! # petal-core: Pure Order Engine for Petal Orders
//!
//! Everything needed to compose an order against live stock and to
//! reconcile an edited order with what was persisted, as pure, synchronous
//! code with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Petal Orders Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 petal-client (REST boundary)                    │   │
//! │  │   catalog fetch ──► create ──► edit/save ──► status change      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ petal-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────────┐   │   │
//! │  │   │  money   │  │ pricing  │  │  stock   │  │    cart      │   │   │
//! │  │   │  item    │  │ totals   │  │  guard   │  │  reducer     │   │   │
//! │  │   └──────────┘  └──────────┘  └──────────┘  └──────────────┘   │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────────────────────────┐  │   │
//! │  │   │  order   │  │lifecycle │  │ reconcile (snapshot + diff)  │  │   │
//! │  │   │validation│  │  Draft⇄C │  │                              │  │   │
//! │  │   └──────────┘  └──────────┘  └──────────────────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO INVENTORY MUTATION                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              Order service (external, owns inventory)           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Decimal money, rounded only for presentation and the wire
//! - [`item`] - Line items and the closed Flower/Bouquet/Supplement variant
//! - [`pricing`] - Markup, manual price override and order totals
//! - [`stock`] - Catalog entries, stock levels and the quantity guard
//! - [`cart`] - Pure cart reducer and the per-session [`cart::CartStore`]
//! - [`order`] - Order-level details (client, delivery, payment)
//! - [`validation`] - Pre-submission checks
//! - [`lifecycle`] - Draft ⇄ Confirmed transition requests
//! - [`reconcile`] - Edit-session snapshot and save planning
//!
//! ## Example Usage
//!
//! ```rust
//! use petal_core::cart::CartStore;
//! use petal_core::item::{ItemType, LineItem};
//! use petal_core::money::Money;
//! use petal_core::pricing::Discount;
//! use petal_core::stock::StockLevels;
//!
//! let mut stock = StockLevels::default();
//! stock.set("f1", 10);
//!
//! let mut store = CartStore::new(stock);
//! let rose = LineItem::new("f1", ItemType::Flower, "Rose", Money::from_cents(200), 3).unwrap();
//! store.add_or_update(rose).unwrap();
//! store.set_discount(Discount::from_percent(10));
//!
//! let totals = store.totals();
//! assert_eq!(totals.subtotal, Money::from_cents(600));
//! assert_eq!(totals.total.rounded(), Money::from_cents(540));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod item;
pub mod lifecycle;
pub mod money;
pub mod order;
pub mod pricing;
pub mod reconcile;
pub mod stock;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use item::{ItemId, ItemType, LineItem, PersistedId};
pub use money::Money;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Markup shortcuts offered next to the free-form markup field.
pub const MARKUP_PRESETS: [i32; 4] = [5, 10, 25, 50];

/// Discount shortcuts offered next to the order-level discount field.
pub const DISCOUNT_PRESETS: [u32; 5] = [5, 10, 15, 20, 25];

/// Catalog category that marks an item as a counted flower.
///
/// Matched case-insensitively. Anything else in the item catalog is a
/// supplement (vases, ribbons, cards).
pub const FLOWER_CATEGORY: &str = "flower";
