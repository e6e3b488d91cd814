//! # Cart Store
//!
//! The cart is a list of [`LineItem`]s keyed by item id. Every change is an
//! [`CartAction`] run through the pure [`reduce`] function.
//!
//! ## Mutation Flow
//! ```text
//!   CartStore::set_quantity("f1", 4)
//!        │
//!        ▼
//!   reduce(&cart, SetQuantity { f1, 4 }, &stock)
//!        │
//!        ├── StockGuard rejects ──► Err(..), cart untouched
//!        │
//!        └── Ok(new cart) ──► store swaps it in ──► totals() recomputed on demand
//! ```
//!
//! There is no intermediate state: the store only ever holds a cart that
//! came out of `reduce` whole.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::item::{ItemId, ItemType, LineItem, PersistedId};
use crate::money::Money;
use crate::pricing::{price_order, Discount, Markup, OrderTotals};
use crate::stock::{CatalogItem, StockGuard, StockLevels};

// =============================================================================
// Cart
// =============================================================================

/// Ordered lines, at most one per item id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<LineItem>,
    created_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            lines: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Builds a cart from lines, one line per item id.
    ///
    /// See [`Cart::from_persisted`] for how duplicates are folded.
    pub fn from_lines(lines: impl IntoIterator<Item = LineItem>) -> Self {
        Self::from_persisted(lines).0
    }

    /// Builds a cart from an order's persisted lines.
    ///
    /// The order service may hold the same item on several records. The
    /// last record is kept, the units of the earlier ones are added to it
    /// (bouquets stay at 1), and the earlier records' persisted ids are
    /// returned so they can be deleted.
    pub fn from_persisted(lines: impl IntoIterator<Item = LineItem>) -> (Self, Vec<PersistedId>) {
        let mut cart = Cart::new();
        let mut superseded = Vec::new();
        for line in lines {
            match cart.position(line.item_id()) {
                Some(idx) => {
                    let earlier = std::mem::replace(&mut cart.lines[idx], line);
                    let kept = &mut cart.lines[idx];
                    if kept.item_type() != ItemType::Bouquet {
                        kept.quantity = kept.quantity.saturating_add(earlier.quantity());
                    }
                    if let Some(pid) = earlier.persisted_id() {
                        if kept.persisted_id() != Some(pid) {
                            superseded.push(pid.clone());
                        }
                    }
                }
                None => cart.lines.push(line),
            }
        }
        (cart, superseded)
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn get(&self, item_id: &ItemId) -> Option<&LineItem> {
        self.lines.iter().find(|l| l.item_id() == item_id)
    }

    pub fn contains(&self, item_id: &ItemId) -> bool {
        self.get(item_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(LineItem::quantity).sum()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn position(&self, item_id: &ItemId) -> Option<usize> {
        self.lines.iter().position(|l| l.item_id() == item_id)
    }

    fn line_mut(&mut self, item_id: &ItemId) -> CoreResult<&mut LineItem> {
        self.lines
            .iter_mut()
            .find(|l| l.item_id() == item_id)
            .ok_or_else(|| CoreError::LineNotFound(item_id.to_string()))
    }
}

// =============================================================================
// Actions & Reducer
// =============================================================================

/// A single cart mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum CartAction {
    /// Insert a new line, or set the existing line's quantity to the given
    /// line's quantity. Existing pricing is kept.
    AddOrUpdate(LineItem),
    Remove(ItemId),
    SetQuantity { item_id: ItemId, quantity: u32 },
    AdjustQuantity { item_id: ItemId, delta: i64 },
    SetMarkup { item_id: ItemId, markup: Option<Markup> },
    SetPrice { item_id: ItemId, price: Money },
    Clear,
}

/// Applies one action, returning the next cart.
///
/// The input cart is never modified; on error the caller keeps it as is.
pub fn reduce(cart: &Cart, action: &CartAction, stock: &StockLevels) -> CoreResult<Cart> {
    let mut next = cart.clone();

    match action {
        CartAction::AddOrUpdate(line) => match next.position(line.item_id()) {
            Some(idx) => {
                let existing = &mut next.lines[idx];
                if existing.item_type() != ItemType::Bouquet {
                    let available = stock.available(existing.item_id());
                    existing.quantity =
                        StockGuard::check_quantity(existing, line.quantity(), available)?;
                }
            }
            None => {
                StockGuard::check_new_line(line, stock.available(line.item_id()))?;
                next.lines.push(line.clone());
            }
        },
        CartAction::Remove(item_id) => {
            let idx = next
                .position(item_id)
                .ok_or_else(|| CoreError::LineNotFound(item_id.to_string()))?;
            next.lines.remove(idx);
        }
        CartAction::SetQuantity { item_id, quantity } => {
            let line = next.line_mut(item_id)?;
            line.quantity = StockGuard::check_quantity(line, *quantity, stock.available(item_id))?;
        }
        CartAction::AdjustQuantity { item_id, delta } => {
            let line = next.line_mut(item_id)?;
            line.quantity = StockGuard::clamp_quantity(line, *delta, stock.available(item_id))?;
        }
        CartAction::SetMarkup { item_id, markup } => {
            next.line_mut(item_id)?.apply_markup(*markup);
        }
        CartAction::SetPrice { item_id, price } => {
            next.line_mut(item_id)?.override_price(*price);
        }
        CartAction::Clear => next.lines.clear(),
    }

    Ok(next)
}

// =============================================================================
// Store
// =============================================================================

/// The cart for one editing session, with its stock view and order-level
/// pricing inputs.
#[derive(Debug, Clone)]
pub struct CartStore {
    cart: Cart,
    stock: StockLevels,
    discount: Discount,
    delivery_price: Money,
}

impl CartStore {
    pub fn new(stock: StockLevels) -> Self {
        Self::with_cart(Cart::new(), stock)
    }

    pub fn with_cart(cart: Cart, stock: StockLevels) -> Self {
        CartStore {
            cart,
            stock,
            discount: Discount::none(),
            delivery_price: Money::zero(),
        }
    }

    /// Runs an action through the reducer and keeps the result.
    pub fn dispatch(&mut self, action: CartAction) -> CoreResult<()> {
        match reduce(&self.cart, &action, &self.stock) {
            Ok(next) => {
                debug!(?action, lines = next.len(), "Cart updated");
                self.cart = next;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Cart change rejected");
                Err(e)
            }
        }
    }

    pub fn add_or_update(&mut self, line: LineItem) -> CoreResult<()> {
        self.dispatch(CartAction::AddOrUpdate(line))
    }

    /// Adds `quantity` of a catalog entry.
    ///
    /// Returns `Ok(false)` without touching the cart when `quantity` is 0.
    pub fn add_catalog_item(&mut self, item: &CatalogItem, quantity: u32) -> CoreResult<bool> {
        if quantity == 0 && item.item_type != ItemType::Bouquet {
            return Ok(false);
        }
        self.add_or_update(item.to_line(quantity)?)?;
        Ok(true)
    }

    /// Removes a line and returns it.
    pub fn remove(&mut self, item_id: &ItemId) -> CoreResult<LineItem> {
        let line = self
            .cart
            .get(item_id)
            .cloned()
            .ok_or_else(|| CoreError::LineNotFound(item_id.to_string()))?;
        self.dispatch(CartAction::Remove(item_id.clone()))?;
        Ok(line)
    }

    pub fn set_quantity(&mut self, item_id: &ItemId, quantity: u32) -> CoreResult<()> {
        self.dispatch(CartAction::SetQuantity {
            item_id: item_id.clone(),
            quantity,
        })
    }

    pub fn adjust_quantity(&mut self, item_id: &ItemId, delta: i64) -> CoreResult<()> {
        self.dispatch(CartAction::AdjustQuantity {
            item_id: item_id.clone(),
            delta,
        })
    }

    pub fn set_markup(&mut self, item_id: &ItemId, markup: Option<Markup>) -> CoreResult<()> {
        self.dispatch(CartAction::SetMarkup {
            item_id: item_id.clone(),
            markup,
        })
    }

    pub fn set_price(&mut self, item_id: &ItemId, price: Money) -> CoreResult<()> {
        self.dispatch(CartAction::SetPrice {
            item_id: item_id.clone(),
            price,
        })
    }

    pub fn clear(&mut self) -> CoreResult<()> {
        self.dispatch(CartAction::Clear)
    }

    pub fn set_discount(&mut self, discount: Discount) {
        self.discount = discount;
    }

    pub fn set_delivery_price(&mut self, price: Money) {
        self.delivery_price = price.non_negative();
    }

    /// Replaces the stock view after a refetch. Lines are not re-checked;
    /// see [`StockGuard::find_conflicts`].
    pub fn replace_stock(&mut self, stock: StockLevels) {
        self.stock = stock;
    }

    /// Records the id the order service gave a newly created line.
    pub(crate) fn mark_persisted(&mut self, item_id: &ItemId, id: PersistedId) -> bool {
        match self.cart.line_mut(item_id) {
            Ok(line) => {
                line.mark_persisted(id);
                true
            }
            Err(_) => false,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn lines(&self) -> &[LineItem] {
        self.cart.lines()
    }

    pub fn stock(&self) -> &StockLevels {
        &self.stock
    }

    pub fn discount(&self) -> Discount {
        self.discount
    }

    pub fn delivery_price(&self) -> Money {
        self.delivery_price
    }

    /// Current totals at full precision.
    pub fn totals(&self) -> OrderTotals {
        price_order(self.cart.lines(), self.discount, self.delivery_price)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn stock() -> StockLevels {
        let mut s = StockLevels::for_location("loc1");
        s.set("f1", 10);
        s.set("s1", 2);
        s
    }

    fn rose(qty: u32) -> LineItem {
        LineItem::new("f1", ItemType::Flower, "Rose", Money::from_cents(200), qty).unwrap()
    }

    fn bouquet() -> LineItem {
        LineItem::new("b1", ItemType::Bouquet, "Spring", Money::from_cents(2500), 1).unwrap()
    }

    fn id(s: &str) -> ItemId {
        ItemId::from(s)
    }

    #[test]
    fn test_reduce_is_pure() {
        let cart = Cart::new();
        let next = reduce(&cart, &CartAction::AddOrUpdate(rose(2)), &stock()).unwrap();
        assert!(cart.is_empty());
        assert_eq!(next.len(), 1);
    }

    #[test]
    fn test_add_same_item_updates_in_place() {
        let mut store = CartStore::new(stock());
        store.add_or_update(rose(2)).unwrap();
        store.add_or_update(rose(5)).unwrap();

        assert_eq!(store.cart().len(), 1);
        assert_eq!(store.cart().get(&id("f1")).unwrap().quantity(), 5);
    }

    #[test]
    fn test_add_same_item_keeps_pricing() {
        let mut store = CartStore::new(stock());
        store.add_or_update(rose(1)).unwrap();
        store.set_markup(&id("f1"), Some(Markup::clamped(20))).unwrap();
        store.add_or_update(rose(3)).unwrap();

        let line = store.cart().get(&id("f1")).unwrap();
        assert_eq!(line.markup(), Some(Markup::clamped(20)));
        assert_eq!(line.actual_price(), Money::from_cents(240));
    }

    #[test]
    fn test_add_over_stock_rejected() {
        let mut store = CartStore::new(stock());
        let err = store.add_or_update(rose(11)).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { .. }));
        assert!(store.cart().is_empty());
    }

    #[test]
    fn test_add_zero_from_catalog_is_noop() {
        let entry = CatalogItem {
            id: id("f1"),
            item_type: ItemType::Flower,
            name: "Rose".into(),
            color: None,
            category: Some("flower".into()),
            standard_price: Money::from_cents(200),
            current_balance: 10,
            picture: None,
        };
        let mut store = CartStore::new(stock());
        assert!(!store.add_catalog_item(&entry, 0).unwrap());
        assert!(store.cart().is_empty());
        assert!(store.add_catalog_item(&entry, 2).unwrap());
        assert_eq!(store.cart().total_quantity(), 2);
    }

    #[test]
    fn test_bouquet_readd_stays_at_one() {
        let mut store = CartStore::new(stock());
        store.add_or_update(bouquet()).unwrap();
        store.add_or_update(bouquet()).unwrap();
        assert_eq!(store.cart().len(), 1);
        assert_eq!(store.cart().get(&id("b1")).unwrap().quantity(), 1);

        assert!(store.adjust_quantity(&id("b1"), 1).is_err());
        assert!(store.set_quantity(&id("b1"), 3).is_err());
        assert_eq!(store.cart().get(&id("b1")).unwrap().quantity(), 1);
    }

    #[test]
    fn test_adjust_quantity_boundaries() {
        let mut store = CartStore::new(stock());
        store
            .add_or_update(LineItem::new("s1", ItemType::Supplement, "Vase", Money::from_cents(900), 1).unwrap())
            .unwrap();

        store.adjust_quantity(&id("s1"), 1).unwrap();
        assert_eq!(store.cart().get(&id("s1")).unwrap().quantity(), 2);

        let err = store.adjust_quantity(&id("s1"), 1).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { requested: 3, available: 2, .. }));
        assert_eq!(store.cart().get(&id("s1")).unwrap().quantity(), 2);

        store.adjust_quantity(&id("s1"), -5).unwrap();
        assert_eq!(store.cart().get(&id("s1")).unwrap().quantity(), 1);
    }

    #[test]
    fn test_remove_returns_line() {
        let mut store = CartStore::new(stock());
        store.add_or_update(rose(2)).unwrap();
        let removed = store.remove(&id("f1")).unwrap();
        assert_eq!(removed.quantity(), 2);
        assert!(store.cart().is_empty());
        assert!(matches!(store.remove(&id("f1")), Err(CoreError::LineNotFound(_))));
    }

    #[test]
    fn test_price_and_markup_last_call_wins() {
        let mut store = CartStore::new(stock());
        store.add_or_update(rose(1)).unwrap();

        store.set_markup(&id("f1"), Some(Markup::clamped(50))).unwrap();
        store.set_price(&id("f1"), Money::from_cents(199)).unwrap();
        let line = store.cart().get(&id("f1")).unwrap();
        assert_eq!(line.markup(), None);
        assert_eq!(line.actual_price(), Money::from_cents(199));

        store.set_markup(&id("f1"), Some(Markup::clamped(10))).unwrap();
        let line = store.cart().get(&id("f1")).unwrap();
        assert_eq!(line.actual_price(), Money::from_cents(220));
    }

    #[test]
    fn test_totals_follow_every_mutation() {
        let mut store = CartStore::new(stock());
        store.add_or_update(rose(3)).unwrap();
        store.add_or_update(bouquet()).unwrap();
        store.set_discount(Discount::from_percent(10));
        store.set_delivery_price(Money::from_cents(500));
        assert_eq!(store.totals().total, Money::from_cents(3290));

        store.adjust_quantity(&id("f1"), -1).unwrap();
        assert_eq!(store.totals().subtotal, Money::from_cents(2900));
    }

    #[test]
    fn test_stale_stock_replaced() {
        let mut store = CartStore::new(stock());
        store.add_or_update(rose(2)).unwrap();

        let mut fresh = StockLevels::for_location("loc1");
        fresh.set("f1", 2);
        store.replace_stock(fresh);

        assert!(store.adjust_quantity(&id("f1"), 1).is_err());
        store.adjust_quantity(&id("f1"), -1).unwrap();
    }

    #[test]
    fn test_unknown_line() {
        let mut store = CartStore::new(stock());
        assert!(matches!(
            store.set_quantity(&id("nope"), 1),
            Err(CoreError::LineNotFound(_))
        ));
    }

    #[test]
    fn test_from_lines_dedups() {
        let cart = Cart::from_lines(vec![rose(1), rose(4)]);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_from_persisted_folds_duplicate_records() {
        let record = |pid: &str, qty: u32, cents: i64| {
            LineItem::persisted(
                PersistedId::new(pid),
                "f1",
                ItemType::Flower,
                "Rose",
                Money::from_cents(200),
                Money::from_cents(cents),
                qty,
            )
            .unwrap()
        };

        let (cart, superseded) = Cart::from_persisted(vec![record("rec1", 2, 200), record("rec2", 3, 250)]);

        assert_eq!(cart.len(), 1);
        let line = cart.get(&id("f1")).unwrap();
        assert_eq!(line.quantity(), 5);
        assert_eq!(line.persisted_id(), Some(&PersistedId::new("rec2")));
        assert_eq!(line.actual_price(), Money::from_cents(250));
        assert_eq!(superseded, vec![PersistedId::new("rec1")]);
    }

    #[test]
    fn test_clear_goes_through_reducer() {
        let mut store = CartStore::new(stock());
        store.add_or_update(rose(2)).unwrap();
        store.set_discount(Discount::from_percent(10));
        let created = store.cart().created_at();

        store.clear().unwrap();

        assert!(store.cart().is_empty());
        assert_eq!(store.cart().created_at(), created);
        assert_eq!(store.discount(), Discount::from_percent(10));
    }
}
