//! # Diff Reconciliation
//!
//! Editing an existing order: the snapshot taken at load, the session that
//! mutates freely on top of it, and the save plan sent to the order service.
//!
//! ## Edit Session Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  load order                                                             │
//! │     │                                                                   │
//! │     ├──► PreviousItemsSnapshot (deep copy, frozen for the session)      │
//! │     └──► CartStore (mutable)                                            │
//! │                                                                         │
//! │  edit: add / remove / quantity / markup / price                         │
//! │     └── removing a saved line queues its persisted id for deletion      │
//! │                                                                         │
//! │  save: SavePlan                                                         │
//! │     1. DELETE queued order items                                        │
//! │     2. POST   lines without a persisted id (one batch)                  │
//! │     3. PATCH  saved lines whose quantity or price changed               │
//! │     4. PATCH  order fields + totals + previous_items = snapshot         │
//! │                                                                         │
//! │  The service diffs snapshot vs now-persisted items and applies the      │
//! │  net inventory change in one pass.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Steps 1 to 3 are separate calls with no client-side transaction. After
//! each step succeeds the session records it (queue drained, persisted ids
//! assigned), so a retried save only resends what is still outstanding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cart::{Cart, CartStore};
use crate::error::CoreResult;
use crate::item::{ItemId, ItemType, LineItem, PersistedId};
use crate::lifecycle::OrderStatus;
use crate::money::Money;
use crate::order::OrderDetails;
use crate::pricing::{Discount, Markup, OrderTotals};
use crate::stock::{CatalogItem, StockLevels};
use crate::validation::{validate_order, ValidationResult};

// =============================================================================
// Snapshot
// =============================================================================

/// One entry of `previous_items` as the order service reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotLine {
    pub item_id: ItemId,
    pub item_name: String,
    pub item_type: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// The order's lines exactly as loaded. Immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviousItemsSnapshot {
    lines: Arc<[LineItem]>,
    taken_at: DateTime<Utc>,
}

impl PreviousItemsSnapshot {
    /// Deep-copies the given lines.
    pub fn capture(lines: &[LineItem]) -> Self {
        PreviousItemsSnapshot {
            lines: lines.to_vec().into(),
            taken_at: Utc::now(),
        }
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Wire form, with prices rounded to 2 places.
    pub fn previous_items(&self) -> Vec<SnapshotLine> {
        self.lines
            .iter()
            .map(|line| SnapshotLine {
                item_id: line.item_id().clone(),
                item_name: line.name().to_string(),
                item_type: line.item_type().wire_name().to_string(),
                quantity: line.quantity(),
                unit_price: line.actual_price().rounded(),
                subtotal: line.line_total().rounded(),
            })
            .collect()
    }

    pub fn find_persisted(&self, persisted_id: &PersistedId) -> Option<&LineItem> {
        self.lines
            .iter()
            .find(|l| l.persisted_id() == Some(persisted_id))
    }

    /// Units of an item held at session start.
    pub fn quantity_of(&self, item_id: &ItemId) -> u32 {
        self.lines
            .iter()
            .filter(|l| l.item_id() == item_id)
            .map(LineItem::quantity)
            .sum()
    }
}

// =============================================================================
// Adjustments
// =============================================================================

/// Net inventory change the service is expected to apply for one item.
///
/// `change > 0` returns units to stock, `change < 0` takes more. For a
/// bouquet, `+1` means unmark sold and `-1` means mark sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockAdjustment {
    pub item_id: ItemId,
    pub item_type: ItemType,
    pub change: i64,
}

// =============================================================================
// Save Plan
// =============================================================================

/// Everything one save will send, in send order.
#[derive(Debug, Clone)]
pub struct SavePlan {
    pub order_id: String,
    pub deletions: Vec<PersistedId>,
    pub creations: Vec<LineItem>,
    pub updates: Vec<LineItem>,
    pub details: OrderDetails,
    pub discount: Discount,
    pub totals: OrderTotals,
    pub previous_items: Vec<SnapshotLine>,
}

impl SavePlan {
    /// True when only the order-level update will be sent.
    pub fn items_unchanged(&self) -> bool {
        self.deletions.is_empty() && self.creations.is_empty() && self.updates.is_empty()
    }
}

// =============================================================================
// Edit Session
// =============================================================================

/// One editing pass over a persisted order.
///
/// Constructed fresh for every edit. A successful save retakes the
/// snapshot (see [`EditSession::rebase`]); navigating away drops it.
#[derive(Debug, Clone)]
pub struct EditSession {
    id: Uuid,
    order_id: String,
    status: OrderStatus,
    pub details: OrderDetails,
    store: CartStore,
    snapshot: PreviousItemsSnapshot,
    pending_deletions: Vec<PersistedId>,
    started_at: DateTime<Utc>,
}

impl EditSession {
    /// Opens a session on the order's persisted lines.
    ///
    /// For an order that already holds inventory, the units it holds are
    /// credited on top of `stock` so keeping them never trips the guard.
    pub fn begin(
        order_id: impl Into<String>,
        status: OrderStatus,
        details: OrderDetails,
        lines: Vec<LineItem>,
        stock: StockLevels,
    ) -> Self {
        let snapshot = PreviousItemsSnapshot::capture(&lines);
        let (cart, superseded) = Cart::from_persisted(lines);
        let stock = credit_held(stock, status, &snapshot);

        let session = EditSession {
            id: Uuid::new_v4(),
            order_id: order_id.into(),
            status,
            details,
            store: CartStore::with_cart(cart, stock),
            snapshot,
            pending_deletions: superseded,
            started_at: Utc::now(),
        };
        if !session.pending_deletions.is_empty() {
            warn!(
                order_id = %session.order_id,
                records = ?session.pending_deletions,
                "Duplicate item records folded; extras queued for deletion"
            );
        }
        debug!(
            session = %session.id,
            order_id = %session.order_id,
            lines = session.snapshot.lines().len(),
            "Edit session started"
        );
        session
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn snapshot(&self) -> &PreviousItemsSnapshot {
        &self.snapshot
    }

    pub fn store(&self) -> &CartStore {
        &self.store
    }

    pub fn lines(&self) -> &[LineItem] {
        self.store.lines()
    }

    pub fn pending_deletions(&self) -> &[PersistedId] {
        &self.pending_deletions
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn totals(&self) -> OrderTotals {
        self.store.totals()
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    pub fn add_or_update(&mut self, line: LineItem) -> CoreResult<()> {
        self.store.add_or_update(line)
    }

    pub fn add_catalog_item(&mut self, item: &CatalogItem, quantity: u32) -> CoreResult<bool> {
        self.store.add_catalog_item(item, quantity)
    }

    /// Removes a line; a saved line is queued for deletion.
    pub fn remove(&mut self, item_id: &ItemId) -> CoreResult<LineItem> {
        let line = self.store.remove(item_id)?;
        if let Some(persisted_id) = line.persisted_id() {
            if !self.pending_deletions.contains(persisted_id) {
                self.pending_deletions.push(persisted_id.clone());
            }
        }
        Ok(line)
    }

    pub fn set_quantity(&mut self, item_id: &ItemId, quantity: u32) -> CoreResult<()> {
        self.store.set_quantity(item_id, quantity)
    }

    pub fn adjust_quantity(&mut self, item_id: &ItemId, delta: i64) -> CoreResult<()> {
        self.store.adjust_quantity(item_id, delta)
    }

    pub fn set_markup(&mut self, item_id: &ItemId, markup: Option<Markup>) -> CoreResult<()> {
        self.store.set_markup(item_id, markup)
    }

    pub fn set_price(&mut self, item_id: &ItemId, price: Money) -> CoreResult<()> {
        self.store.set_price(item_id, price)
    }

    pub fn set_discount(&mut self, discount: Discount) {
        self.store.set_discount(discount);
    }

    pub fn set_delivery_price(&mut self, price: Money) {
        self.store.set_delivery_price(price);
    }

    /// Swaps in freshly fetched balances, re-crediting held units.
    pub fn refresh_stock(&mut self, stock: StockLevels) {
        let stock = credit_held(stock, self.status, &self.snapshot);
        self.store.replace_stock(stock);
    }

    // -------------------------------------------------------------------------
    // Save
    // -------------------------------------------------------------------------

    pub fn validate(&self) -> ValidationResult<()> {
        validate_order(&self.details, self.store.cart(), self.store.stock())
    }

    /// Builds the calls for the next save attempt.
    ///
    /// A saved line is updated when its quantity or actual price differs
    /// from its snapshot entry, or when it has no snapshot entry (created
    /// by an earlier attempt of this session).
    pub fn plan_save(&self) -> SavePlan {
        let creations = self.lines().iter().filter(|l| l.is_new()).cloned().collect();

        let updates = self
            .lines()
            .iter()
            .filter(|line| match line.persisted_id() {
                None => false,
                Some(pid) => match self.snapshot.find_persisted(pid) {
                    Some(before) => {
                        before.quantity() != line.quantity()
                            || before.actual_price() != line.actual_price()
                    }
                    None => true,
                },
            })
            .cloned()
            .collect();

        SavePlan {
            order_id: self.order_id.clone(),
            deletions: self.pending_deletions.clone(),
            creations,
            updates,
            details: self.details.clone(),
            discount: self.store.discount(),
            totals: self.store.totals(),
            previous_items: self.snapshot.previous_items(),
        }
    }

    /// Records a successful item deletion.
    pub fn mark_deleted(&mut self, persisted_id: &PersistedId) {
        self.pending_deletions.retain(|p| p != persisted_id);
    }

    /// Records the id the service assigned to a created line.
    ///
    /// Returns false when the line is no longer in the cart.
    pub fn mark_created(&mut self, item_id: &ItemId, persisted_id: PersistedId) -> bool {
        self.store.mark_persisted(item_id, persisted_id)
    }

    /// Starts the next round of edits from the state just saved.
    ///
    /// Call only after every step of a save succeeded. The snapshot is
    /// retaken from the current lines so the next save diffs against what
    /// the service now holds. Held-unit credit is unchanged: the service
    /// deducted exactly what the new snapshot credits.
    pub fn rebase(&mut self) {
        self.snapshot = PreviousItemsSnapshot::capture(self.store.lines());
        self.pending_deletions.clear();
        debug!(
            session = %self.id,
            order_id = %self.order_id,
            lines = self.snapshot.lines().len(),
            "Edit session rebased"
        );
    }

    /// Net change per item between session start and now, for orders that
    /// hold inventory. Empty for drafts: nothing was deducted yet.
    pub fn expected_adjustments(&self) -> Vec<StockAdjustment> {
        if !self.status.holds_inventory() {
            return Vec::new();
        }

        let mut net: BTreeMap<ItemId, (ItemType, i64)> = BTreeMap::new();
        for line in self.snapshot.lines() {
            let entry = net.entry(line.item_id().clone()).or_insert((line.item_type(), 0));
            entry.1 += i64::from(line.quantity());
        }
        for line in self.lines() {
            let entry = net.entry(line.item_id().clone()).or_insert((line.item_type(), 0));
            entry.1 -= i64::from(line.quantity());
        }

        net.into_iter()
            .filter(|(_, (_, change))| *change != 0)
            .map(|(item_id, (item_type, change))| StockAdjustment {
                item_id,
                item_type,
                change,
            })
            .collect()
    }
}

fn credit_held(mut stock: StockLevels, status: OrderStatus, snapshot: &PreviousItemsSnapshot) -> StockLevels {
    if status.holds_inventory() {
        for line in snapshot.lines().iter().filter(|l| l.item_type().is_stock_counted()) {
            stock.credit(line.item_id(), line.quantity());
        }
    }
    stock
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn saved(pid: &str, item: &str, qty: u32, cents: i64) -> LineItem {
        LineItem::persisted(
            PersistedId::new(pid),
            item,
            ItemType::Flower,
            "Rose",
            Money::from_cents(cents),
            Money::from_cents(cents),
            qty,
        )
        .unwrap()
    }

    fn stock() -> StockLevels {
        let mut s = StockLevels::for_location("loc1");
        s.set("f1", 0);
        s.set("f2", 10);
        s
    }

    fn session(status: OrderStatus) -> EditSession {
        EditSession::begin(
            "ord1",
            status,
            OrderDetails {
                client_id: Some("cli1".into()),
                ..Default::default()
            },
            vec![saved("rec1", "f1", 2, 200)],
            stock(),
        )
    }

    fn id(s: &str) -> ItemId {
        ItemId::from(s)
    }

    #[test]
    fn test_snapshot_is_frozen() {
        let mut s = session(OrderStatus::Confirmed);
        s.set_quantity(&id("f1"), 1).unwrap();
        s.set_markup(&id("f1"), Some(Markup::clamped(50))).unwrap();
        s.remove(&id("f1")).unwrap();

        let snap = s.snapshot().lines();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].quantity(), 2);
        assert_eq!(snap[0].actual_price(), Money::from_cents(200));
    }

    #[test]
    fn test_previous_items_wire_shape() {
        let s = session(OrderStatus::Confirmed);
        let items = s.snapshot().previous_items();
        assert_eq!(
            items,
            vec![SnapshotLine {
                item_id: id("f1"),
                item_name: "Rose".into(),
                item_type: "Flower".into(),
                quantity: 2,
                unit_price: Money::from_cents(200),
                subtotal: Money::from_cents(400),
            }]
        );
    }

    #[test]
    fn test_confirmed_order_can_keep_held_units() {
        // shelf balance is 0, but the order already holds 2
        let mut s = session(OrderStatus::Confirmed);
        s.set_quantity(&id("f1"), 2).unwrap();
        assert!(s.adjust_quantity(&id("f1"), 1).is_err());
        assert!(s.validate().is_ok());

        let draft = session(OrderStatus::Draft);
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_remove_queues_deletion_once() {
        let mut s = session(OrderStatus::Confirmed);
        s.remove(&id("f1")).unwrap();
        assert_eq!(s.pending_deletions(), &[PersistedId::new("rec1")]);

        // re-added as a new line, removed again
        s.add_or_update(LineItem::new("f1", ItemType::Flower, "Rose", Money::from_cents(200), 1).unwrap())
            .unwrap();
        s.remove(&id("f1")).unwrap();
        assert_eq!(s.pending_deletions().len(), 1);
    }

    #[test]
    fn test_plan_only_changed_lines_updated() {
        let mut s = EditSession::begin(
            "ord1",
            OrderStatus::Draft,
            OrderDetails::default(),
            vec![saved("rec1", "f1", 2, 200), saved("rec2", "f2", 1, 300)],
            stock(),
        );
        s.set_price(&id("f2"), Money::from_cents(350)).unwrap();

        let plan = s.plan_save();
        assert!(plan.creations.is_empty());
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].item_id(), &id("f2"));
    }

    #[test]
    fn test_unchanged_round_trip_is_not_an_update() {
        let mut s = session(OrderStatus::Confirmed);
        s.set_quantity(&id("f1"), 1).unwrap();
        s.set_quantity(&id("f1"), 2).unwrap();
        assert!(s.plan_save().items_unchanged());
    }

    #[test]
    fn test_retry_after_partial_save() {
        let mut s = session(OrderStatus::Confirmed);
        s.remove(&id("f1")).unwrap();
        s.add_or_update(LineItem::new("f2", ItemType::Flower, "Tulip", Money::from_cents(150), 1).unwrap())
            .unwrap();

        let first = s.plan_save();
        assert_eq!(first.deletions.len(), 1);
        assert_eq!(first.creations.len(), 1);

        // deletion and creation went through, then the order update failed
        s.mark_deleted(&PersistedId::new("rec1"));
        assert!(s.mark_created(&id("f2"), PersistedId::new("rec9")));

        let retry = s.plan_save();
        assert!(retry.deletions.is_empty());
        assert!(retry.creations.is_empty());
        // created earlier this session, so it has no snapshot entry
        assert_eq!(retry.updates.len(), 1);
        assert_eq!(retry.previous_items, first.previous_items);
    }

    #[test]
    fn test_expected_adjustments() {
        let mut s = session(OrderStatus::Confirmed);
        s.remove(&id("f1")).unwrap();
        s.add_or_update(LineItem::new("f2", ItemType::Flower, "Tulip", Money::from_cents(150), 1).unwrap())
            .unwrap();

        assert_eq!(
            s.expected_adjustments(),
            vec![
                StockAdjustment {
                    item_id: id("f1"),
                    item_type: ItemType::Flower,
                    change: 2,
                },
                StockAdjustment {
                    item_id: id("f2"),
                    item_type: ItemType::Flower,
                    change: -1,
                },
            ]
        );

        assert!(session(OrderStatus::Draft).expected_adjustments().is_empty());
    }

    #[test]
    fn test_duplicate_records_keep_their_snapshot_entries() {
        let s = EditSession::begin(
            "ord1",
            OrderStatus::Confirmed,
            OrderDetails {
                client_id: Some("cli1".into()),
                ..Default::default()
            },
            vec![saved("rec1", "f1", 2, 200), saved("rec2", "f1", 3, 200)],
            stock(),
        );

        // both records are in previous_items
        let previous = s.snapshot().previous_items();
        assert_eq!(previous.len(), 2);
        assert_eq!(s.snapshot().quantity_of(&id("f1")), 5);

        // one line carries all units; the extra record goes away on save
        assert_eq!(s.lines().len(), 1);
        assert_eq!(s.lines()[0].quantity(), 5);
        assert_eq!(s.pending_deletions(), &[PersistedId::new("rec1")]);
        assert!(s.validate().is_ok());

        let plan = s.plan_save();
        assert_eq!(plan.deletions, vec![PersistedId::new("rec1")]);
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].persisted_id(), Some(&PersistedId::new("rec2")));
        assert_eq!(plan.updates[0].quantity(), 5);
        assert!(s.expected_adjustments().is_empty());
    }

    #[test]
    fn test_rebase_after_save_retakes_snapshot() {
        let mut s = session(OrderStatus::Confirmed);
        s.remove(&id("f1")).unwrap();
        s.add_or_update(LineItem::new("f2", ItemType::Flower, "Tulip", Money::from_cents(150), 1).unwrap())
            .unwrap();
        s.mark_deleted(&PersistedId::new("rec1"));
        assert!(s.mark_created(&id("f2"), PersistedId::new("rec9")));

        s.rebase();

        let plan = s.plan_save();
        assert!(plan.items_unchanged());
        assert_eq!(plan.previous_items.len(), 1);
        assert_eq!(plan.previous_items[0].item_id, id("f2"));
        assert_eq!(plan.previous_items[0].quantity, 1);
        assert!(s.expected_adjustments().is_empty());
    }

    #[test]
    fn test_refresh_stock_keeps_credit() {
        let mut s = session(OrderStatus::Confirmed);
        let mut fresh = StockLevels::for_location("loc1");
        fresh.set("f1", 1);
        s.refresh_stock(fresh);
        s.set_quantity(&id("f1"), 3).unwrap();
        assert!(s.adjust_quantity(&id("f1"), 1).is_err());
    }
}
