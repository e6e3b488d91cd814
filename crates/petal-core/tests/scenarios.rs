//! End-to-end flows through the engine: compose, price, edit, confirm.

use petal_core::cart::CartStore;
use petal_core::item::{ItemId, ItemType, LineItem, PersistedId};
use petal_core::lifecycle::{OrderLifecycle, OrderStatus, TransitionOutcome};
use petal_core::money::Money;
use petal_core::order::OrderDetails;
use petal_core::pricing::{Discount, Markup};
use petal_core::reconcile::EditSession;
use petal_core::stock::{StockGuard, StockLevels};
use petal_core::CoreError;

fn stock() -> StockLevels {
    let mut s = StockLevels::for_location("loc1");
    s.set("f1", 10);
    s.set("f2", 10);
    s
}

fn flower(id: &str, cents: i64, qty: u32) -> LineItem {
    LineItem::new(id, ItemType::Flower, "Rose", Money::from_cents(cents), qty).unwrap()
}

#[test]
fn flower_and_bouquet_with_discount_and_delivery() {
    let mut store = CartStore::new(stock());
    store.add_or_update(flower("f1", 200, 3)).unwrap();
    store
        .add_or_update(LineItem::new("b1", ItemType::Bouquet, "Spring", Money::from_cents(2500), 1).unwrap())
        .unwrap();
    store.set_discount(Discount::from_percent(10));
    store.set_delivery_price(Money::from_cents(500));

    let totals = store.totals().rounded();
    assert_eq!(totals.subtotal, Money::from_cents(3100));
    assert_eq!(totals.discount_amount, Money::from_cents(310));
    assert_eq!(totals.total, Money::from_cents(3290));
    assert_eq!(totals.total.to_string(), "32.90");
}

#[test]
fn markup_applied_then_cleared() {
    let mut store = CartStore::new(stock());
    store.add_or_update(flower("f1", 200, 1)).unwrap();
    let f1 = ItemId::from("f1");

    store.set_markup(&f1, Some(Markup::new(20).unwrap())).unwrap();
    assert_eq!(store.cart().get(&f1).unwrap().actual_price(), Money::from_cents(240));

    store.set_markup(&f1, None).unwrap();
    let line = store.cart().get(&f1).unwrap();
    assert_eq!(line.actual_price(), Money::from_cents(200));
    assert_eq!(line.actual_price(), line.standard_price());
}

#[test]
fn edit_replaces_one_flower_with_another() {
    let persisted = LineItem::persisted(
        PersistedId::new("rec1"),
        "f1",
        ItemType::Flower,
        "Rose",
        Money::from_cents(200),
        Money::from_cents(200),
        2,
    )
    .unwrap();

    let mut session = EditSession::begin(
        "ord1",
        OrderStatus::Confirmed,
        OrderDetails {
            client_id: Some("cli1".into()),
            ..Default::default()
        },
        vec![persisted],
        stock(),
    );

    session.remove(&ItemId::from("f1")).unwrap();
    session.add_or_update(flower("f2", 150, 1)).unwrap();

    let plan = session.plan_save();

    assert_eq!(plan.previous_items.len(), 1);
    assert_eq!(plan.previous_items[0].item_id, ItemId::from("f1"));
    assert_eq!(plan.previous_items[0].quantity, 2);

    assert_eq!(plan.creations.len(), 1);
    assert_eq!(plan.creations[0].item_id(), &ItemId::from("f2"));
    assert_eq!(plan.creations[0].quantity(), 1);

    assert_eq!(plan.deletions, vec![PersistedId::new("rec1")]);
    assert!(plan.updates.is_empty());

    let changes: Vec<(String, i64)> = session
        .expected_adjustments()
        .into_iter()
        .map(|a| (a.item_id.to_string(), a.change))
        .collect();
    assert_eq!(changes, vec![("f1".to_string(), 2), ("f2".to_string(), -1)]);
}

#[test]
fn confirm_rejected_when_stock_dropped() {
    let mut store = CartStore::new(stock());
    store.add_or_update(flower("f1", 200, 4)).unwrap();

    // balance fell to 2 after the cart was built
    let mut fresh = StockLevels::for_location("loc1");
    fresh.set("f1", 2);
    store.replace_stock(fresh);
    assert_eq!(StockGuard::find_conflicts(store.lines(), store.stock()).len(), 1);

    let mut lifecycle = OrderLifecycle::new(OrderStatus::Draft);
    lifecycle.begin(OrderStatus::Confirmed).unwrap();
    let err = lifecycle
        .resolve(TransitionOutcome::Rejected {
            reason: "Insufficient stock for Rose: available 2, requested 4".into(),
        })
        .unwrap_err();

    assert!(matches!(err, CoreError::TransitionRejected { .. }));
    assert!(err.to_string().contains("available 2, requested 4"));
    assert_eq!(lifecycle.status(), OrderStatus::Draft);
}

#[test]
fn bouquet_never_leaves_quantity_one() {
    let mut store = CartStore::new(stock());
    store
        .add_or_update(LineItem::new("b1", ItemType::Bouquet, "Spring", Money::from_cents(2500), 1).unwrap())
        .unwrap();
    let b1 = ItemId::from("b1");

    for delta in [-2, -1, 1, 5] {
        assert!(store.adjust_quantity(&b1, delta).is_err());
    }
    assert!(store.set_quantity(&b1, 2).is_err());
    assert_eq!(store.cart().get(&b1).unwrap().quantity(), 1);
}
