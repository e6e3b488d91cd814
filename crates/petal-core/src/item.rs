//! # Line Item Model
//!
//! One purchasable line inside a cart.
//!
//! ## Item Types
//! ```text
//! ┌──────────────┬────────────────────────┬──────────────────────────────┐
//! │ ItemType     │ itemId refers to       │ Quantity                     │
//! ├──────────────┼────────────────────────┼──────────────────────────────┤
//! │ Flower       │ catalog flower         │ counted against stock        │
//! │ Supplement   │ catalog non-flower     │ counted against stock        │
//! │ Bouquet      │ one assembled instance │ pinned at 1                  │
//! └──────────────┴────────────────────────┴──────────────────────────────┘
//! ```
//!
//! Fields are crate-private; quantities change only through the stock
//! guard and prices only through the pricing functions, so a `LineItem`
//! outside this crate always satisfies `quantity >= 1` and
//! `actual_price >= 0`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::Markup;
use crate::FLOWER_CATEGORY;

// =============================================================================
// Identifiers
// =============================================================================

/// Catalog identifier: a flower/supplement record or a bouquet instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        ItemId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        ItemId(s)
    }
}

/// Identifier of an order-item record, assigned by the order service.
///
/// Its presence on a line means the line has been saved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistedId(String);

impl PersistedId {
    pub fn new(id: impl Into<String>) -> Self {
        PersistedId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersistedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Item Type
// =============================================================================

/// Closed set of line kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Flower,
    Bouquet,
    Supplement,
}

impl ItemType {
    /// Flowers and supplements draw on counted stock; bouquets do not.
    pub fn is_stock_counted(&self) -> bool {
        !matches!(self, ItemType::Bouquet)
    }

    /// Maps a catalog category: `"flower"` in any case is a flower,
    /// everything else is a supplement.
    pub fn from_category(category: Option<&str>) -> Self {
        match category {
            Some(c) if c.trim().eq_ignore_ascii_case(FLOWER_CATEGORY) => ItemType::Flower,
            _ => ItemType::Supplement,
        }
    }

    /// Name the order service stores for this type.
    ///
    /// The service keeps a two-valued `item_type` column; counted items of
    /// either kind are recorded as `Flower`.
    pub fn wire_name(&self) -> &'static str {
        match self {
            ItemType::Bouquet => "Bouquet",
            ItemType::Flower | ItemType::Supplement => "Flower",
        }
    }

    /// Parses a stored `item_type`, including the legacy `Item` and
    /// `Service` values.
    pub fn from_wire(value: &str) -> CoreResult<Self> {
        match value.trim() {
            "Bouquet" => Ok(ItemType::Bouquet),
            "Flower" | "Item" | "Service" => Ok(ItemType::Flower),
            "Supplement" => Ok(ItemType::Supplement),
            other => Err(CoreError::UnknownVariant {
                kind: "item type",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemType::Flower => "Flower",
            ItemType::Bouquet => "Bouquet",
            ItemType::Supplement => "Supplement",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Bouquet Composition
// =============================================================================

/// One constituent flower of an assembled bouquet. Display and audit only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BouquetComponent {
    pub name: String,
    pub color: Option<String>,
    pub quantity: u32,
}

// =============================================================================
// Line Item
// =============================================================================

/// A cart entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub(crate) item_id: ItemId,
    pub(crate) item_type: ItemType,
    pub(crate) name: String,
    pub(crate) color: Option<String>,
    pub(crate) picture_ref: Option<String>,
    pub(crate) quantity: u32,
    pub(crate) standard_price: Money,
    pub(crate) markup: Option<Markup>,
    pub(crate) actual_price: Money,
    pub(crate) bouquet_composition: Option<Vec<BouquetComponent>>,
    pub(crate) persisted_id: Option<PersistedId>,
}

impl LineItem {
    /// Creates an unsaved line priced at its standard price.
    ///
    /// Bouquet lines are always created with quantity 1 whatever is asked.
    ///
    /// ## Errors
    /// - `MustBePositive` for quantity 0 on a counted item
    pub fn new(
        item_id: impl Into<ItemId>,
        item_type: ItemType,
        name: impl Into<String>,
        standard_price: Money,
        quantity: u32,
    ) -> CoreResult<Self> {
        let quantity = match item_type {
            ItemType::Bouquet => 1,
            _ if quantity == 0 => {
                return Err(ValidationError::MustBePositive {
                    field: "quantity".into(),
                }
                .into())
            }
            _ => quantity,
        };
        let standard_price = standard_price.non_negative();

        Ok(LineItem {
            item_id: item_id.into(),
            item_type,
            name: name.into(),
            color: None,
            picture_ref: None,
            quantity,
            standard_price,
            markup: None,
            actual_price: standard_price,
            bouquet_composition: None,
            persisted_id: None,
        })
    }

    /// Rebuilds a line that the order service already holds.
    ///
    /// The stored unit price becomes the actual price; markup is not
    /// persisted, so it starts cleared.
    pub fn persisted(
        persisted_id: PersistedId,
        item_id: impl Into<ItemId>,
        item_type: ItemType,
        name: impl Into<String>,
        standard_price: Money,
        unit_price: Money,
        quantity: u32,
    ) -> CoreResult<Self> {
        let mut line = LineItem::new(item_id, item_type, name, standard_price, quantity)?;
        line.actual_price = unit_price.non_negative();
        line.persisted_id = Some(persisted_id);
        Ok(line)
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        let color = color.into();
        self.color = if color.trim().is_empty() { None } else { Some(color) };
        self
    }

    pub fn with_picture(mut self, picture_ref: impl Into<String>) -> Self {
        self.picture_ref = Some(picture_ref.into());
        self
    }

    /// Attaches the constituent flowers. Ignored for non-bouquet lines.
    pub fn with_composition(mut self, composition: Vec<BouquetComponent>) -> Self {
        if self.item_type == ItemType::Bouquet {
            self.bouquet_composition = Some(composition);
        }
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn picture_ref(&self) -> Option<&str> {
        self.picture_ref.as_deref()
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn standard_price(&self) -> Money {
        self.standard_price
    }

    pub fn markup(&self) -> Option<Markup> {
        self.markup
    }

    pub fn actual_price(&self) -> Money {
        self.actual_price
    }

    pub fn bouquet_composition(&self) -> Option<&[BouquetComponent]> {
        self.bouquet_composition.as_deref()
    }

    pub fn persisted_id(&self) -> Option<&PersistedId> {
        self.persisted_id.as_ref()
    }

    pub fn is_new(&self) -> bool {
        self.persisted_id.is_none()
    }

    /// `quantity × actual_price`, unrounded.
    pub fn line_total(&self) -> Money {
        self.actual_price.multiply_quantity(self.quantity)
    }

    /// "Rose (red)", or just the name when there is no color.
    pub fn display_name(&self) -> String {
        match &self.color {
            Some(color) => format!("{} ({})", self.name, color),
            None => self.name.clone(),
        }
    }

    /// Records the id the order service assigned after creation.
    pub fn mark_persisted(&mut self, persisted_id: PersistedId) {
        self.persisted_id = Some(persisted_id);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_line_uses_standard_price() {
        let line = LineItem::new("f1", ItemType::Flower, "Rose", Money::from_cents(200), 3).unwrap();
        assert_eq!(line.quantity(), 3);
        assert_eq!(line.actual_price(), Money::from_cents(200));
        assert_eq!(line.markup(), None);
        assert!(line.is_new());
        assert_eq!(line.line_total(), Money::from_cents(600));
    }

    #[test]
    fn test_bouquet_is_pinned_at_creation() {
        let line = LineItem::new("b1", ItemType::Bouquet, "Spring", Money::from_cents(2500), 4).unwrap();
        assert_eq!(line.quantity(), 1);

        let line = LineItem::new("b2", ItemType::Bouquet, "Spring", Money::from_cents(2500), 0).unwrap();
        assert_eq!(line.quantity(), 1);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let err = LineItem::new("f1", ItemType::Flower, "Rose", Money::from_cents(200), 0).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_negative_standard_price_clamped() {
        let line = LineItem::new("f1", ItemType::Flower, "Rose", Money::from_cents(-100), 1).unwrap();
        assert_eq!(line.standard_price(), Money::zero());
        assert_eq!(line.actual_price(), Money::zero());
    }

    #[test]
    fn test_display_name() {
        let line = LineItem::new("f1", ItemType::Flower, "Rose", Money::from_cents(200), 1)
            .unwrap()
            .with_color("red");
        assert_eq!(line.display_name(), "Rose (red)");

        let plain = LineItem::new("s1", ItemType::Supplement, "Vase", Money::from_cents(900), 1)
            .unwrap()
            .with_color("  ");
        assert_eq!(plain.display_name(), "Vase");
    }

    #[test]
    fn test_composition_only_on_bouquets() {
        let parts = vec![BouquetComponent {
            name: "Tulip".into(),
            color: Some("yellow".into()),
            quantity: 7,
        }];
        let bouquet = LineItem::new("b1", ItemType::Bouquet, "Sunny", Money::from_cents(3000), 1)
            .unwrap()
            .with_composition(parts.clone());
        assert_eq!(bouquet.bouquet_composition(), Some(parts.as_slice()));

        let flower = LineItem::new("f1", ItemType::Flower, "Tulip", Money::from_cents(150), 1)
            .unwrap()
            .with_composition(parts);
        assert_eq!(flower.bouquet_composition(), None);
    }

    #[test]
    fn test_persisted_line_keeps_stored_price() {
        let line = LineItem::persisted(
            PersistedId::new("rec1"),
            "f1",
            ItemType::Flower,
            "Rose",
            Money::from_cents(200),
            Money::from_cents(250),
            2,
        )
        .unwrap();
        assert_eq!(line.actual_price(), Money::from_cents(250));
        assert_eq!(line.standard_price(), Money::from_cents(200));
        assert_eq!(line.persisted_id().map(PersistedId::as_str), Some("rec1"));
        assert!(!line.is_new());
    }

    #[test]
    fn test_item_type_mapping() {
        assert_eq!(ItemType::from_category(Some("Flower")), ItemType::Flower);
        assert_eq!(ItemType::from_category(Some("FLOWER ")), ItemType::Flower);
        assert_eq!(ItemType::from_category(Some("Vase")), ItemType::Supplement);
        assert_eq!(ItemType::from_category(None), ItemType::Supplement);

        assert_eq!(ItemType::from_wire("Item").unwrap(), ItemType::Flower);
        assert_eq!(ItemType::from_wire("Bouquet").unwrap(), ItemType::Bouquet);
        assert!(ItemType::from_wire("Gift card").is_err());

        assert_eq!(ItemType::Supplement.wire_name(), "Flower");
        assert_eq!(ItemType::Bouquet.wire_name(), "Bouquet");
        assert!(!ItemType::Bouquet.is_stock_counted());
    }
}
