//! # Stock Guard
//!
//! Catalog entries, the last known balances per location, and the central
//! quantity rules every cart mutation goes through.
//!
//! ## Quantity Rules
//! ```text
//! ┌──────────────────────┬─────────────────────────────────────────────────┐
//! │ Flower / Supplement  │ new = max(1, current + delta)                   │
//! │                      │ decrease: always allowed down to 1              │
//! │                      │ increase past available: REJECTED, unchanged    │
//! ├──────────────────────┼─────────────────────────────────────────────────┤
//! │ Bouquet              │ quantity is 1, any other request is REJECTED    │
//! └──────────────────────┴─────────────────────────────────────────────────┘
//! ```
//!
//! Balances are never copied onto a line. Every check reads the current
//! [`StockLevels`], which the caller replaces whenever it refetches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::item::{ItemId, ItemType, LineItem};
use crate::money::Money;

// =============================================================================
// Catalog
// =============================================================================

/// An entry from the available-items or available-bouquets listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub item_type: ItemType,
    pub name: String,
    pub color: Option<String>,
    pub category: Option<String>,
    pub standard_price: Money,
    pub current_balance: u32,
    pub picture: Option<String>,
}

impl CatalogItem {
    /// Builds an unsaved line for this entry.
    ///
    /// Bouquets come out with quantity 1 regardless of `quantity`.
    pub fn to_line(&self, quantity: u32) -> CoreResult<LineItem> {
        let mut line = LineItem::new(
            self.id.clone(),
            self.item_type,
            self.name.clone(),
            self.standard_price,
            quantity,
        )?;
        if let Some(color) = &self.color {
            line = line.with_color(color.clone());
        }
        if let Some(picture) = &self.picture {
            line = line.with_picture(picture.clone());
        }
        Ok(line)
    }
}

// =============================================================================
// Stock Levels
// =============================================================================

/// Latest known balances for one shop location.
///
/// Unknown items have a balance of 0.
#[derive(Debug, Clone, PartialEq)]
pub struct StockLevels {
    location_id: Option<String>,
    balances: HashMap<ItemId, u32>,
    fetched_at: DateTime<Utc>,
}

impl Default for StockLevels {
    fn default() -> Self {
        StockLevels {
            location_id: None,
            balances: HashMap::new(),
            fetched_at: Utc::now(),
        }
    }
}

impl StockLevels {
    pub fn for_location(location_id: impl Into<String>) -> Self {
        StockLevels {
            location_id: Some(location_id.into()),
            ..Default::default()
        }
    }

    /// Balances taken from a catalog listing.
    pub fn from_catalog<'a, I>(location_id: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = &'a CatalogItem>,
    {
        let mut levels = StockLevels::for_location(location_id);
        for item in items {
            levels.set(item.id.clone(), item.current_balance);
        }
        levels
    }

    pub fn set(&mut self, item_id: impl Into<ItemId>, balance: u32) {
        self.balances.insert(item_id.into(), balance);
    }

    /// Adds units this order already holds.
    ///
    /// A Confirmed order's items were deducted at confirmation, so an
    /// editor may keep or reuse them on top of the shelf balance.
    pub fn credit(&mut self, item_id: &ItemId, quantity: u32) {
        let entry = self.balances.entry(item_id.clone()).or_insert(0);
        *entry = entry.saturating_add(quantity);
    }

    pub fn available(&self, item_id: &ItemId) -> u32 {
        self.balances.get(item_id).copied().unwrap_or(0)
    }

    pub fn location_id(&self) -> Option<&str> {
        self.location_id.as_deref()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

// =============================================================================
// Guard
// =============================================================================

/// A line whose quantity no longer fits the known balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockConflict {
    pub item_id: ItemId,
    pub name: String,
    pub requested: u32,
    pub available: u32,
}

/// Central quantity rules. Stateless.
pub struct StockGuard;

impl StockGuard {
    /// Applies a relative change to a line's quantity.
    ///
    /// ## Errors
    /// - `BouquetQuantityPinned` for any non-zero delta on a bouquet
    /// - `InsufficientStock` when an increase lands above `available`
    ///
    /// ## Example
    /// ```rust
    /// use petal_core::item::{ItemType, LineItem};
    /// use petal_core::money::Money;
    /// use petal_core::stock::StockGuard;
    ///
    /// let line = LineItem::new("f1", ItemType::Flower, "Rose", Money::from_cents(200), 2).unwrap();
    /// assert_eq!(StockGuard::clamp_quantity(&line, -5, 10).unwrap(), 1);
    /// assert_eq!(StockGuard::clamp_quantity(&line, 3, 10).unwrap(), 5);
    /// assert!(StockGuard::clamp_quantity(&line, 9, 10).is_err());
    /// ```
    pub fn clamp_quantity(line: &LineItem, delta: i64, available: u32) -> CoreResult<u32> {
        if line.item_type() == ItemType::Bouquet {
            return if delta == 0 { Ok(1) } else { Err(Self::pinned(line)) };
        }

        let target = (line.quantity() as i64).saturating_add(delta).max(1);
        let target = u32::try_from(target).unwrap_or(u32::MAX);
        if delta > 0 && target > available {
            return Err(Self::insufficient(line, target, available));
        }
        Ok(target)
    }

    /// Applies an absolute quantity, with the same rules as
    /// [`StockGuard::clamp_quantity`].
    pub fn check_quantity(line: &LineItem, requested: u32, available: u32) -> CoreResult<u32> {
        let delta = i64::from(requested) - i64::from(line.quantity());
        if line.item_type() == ItemType::Bouquet {
            return if requested == 1 { Ok(1) } else { Err(Self::pinned(line)) };
        }
        Self::clamp_quantity(line, delta, available)
    }

    /// Checks a line about to be inserted.
    pub fn check_new_line(line: &LineItem, available: u32) -> CoreResult<()> {
        if line.item_type().is_stock_counted() && line.quantity() > available {
            return Err(Self::insufficient(line, line.quantity(), available));
        }
        Ok(())
    }

    /// Every counted line whose quantity is above the known balance.
    pub fn find_conflicts<'a, I>(lines: I, stock: &StockLevels) -> Vec<StockConflict>
    where
        I: IntoIterator<Item = &'a LineItem>,
    {
        lines
            .into_iter()
            .filter(|line| line.item_type().is_stock_counted())
            .filter_map(|line| {
                let available = stock.available(line.item_id());
                (line.quantity() > available).then(|| StockConflict {
                    item_id: line.item_id().clone(),
                    name: line.display_name(),
                    requested: line.quantity(),
                    available,
                })
            })
            .collect()
    }

    fn pinned(line: &LineItem) -> CoreError {
        CoreError::BouquetQuantityPinned {
            item_id: line.item_id().to_string(),
        }
    }

    fn insufficient(line: &LineItem, requested: u32, available: u32) -> CoreError {
        CoreError::InsufficientStock {
            item_id: line.item_id().to_string(),
            name: line.display_name(),
            available,
            requested,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn flower(qty: u32) -> LineItem {
        LineItem::new("f1", ItemType::Flower, "Rose", Money::from_cents(200), qty).unwrap()
    }

    fn bouquet() -> LineItem {
        LineItem::new("b1", ItemType::Bouquet, "Spring", Money::from_cents(2500), 1).unwrap()
    }

    #[test]
    fn test_decrease_floors_at_one() {
        let line = flower(3);
        assert_eq!(StockGuard::clamp_quantity(&line, -1, 0).unwrap(), 2);
        assert_eq!(StockGuard::clamp_quantity(&line, -10, 0).unwrap(), 1);
    }

    #[test]
    fn test_increase_within_stock() {
        let line = flower(3);
        assert_eq!(StockGuard::clamp_quantity(&line, 2, 5).unwrap(), 5);
    }

    #[test]
    fn test_increase_beyond_stock_rejected() {
        let line = flower(5);
        let err = StockGuard::clamp_quantity(&line, 1, 5).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                item_id: "f1".into(),
                name: "Rose".into(),
                available: 5,
                requested: 6,
            }
        );
    }

    #[test]
    fn test_decrease_allowed_when_already_over_stock() {
        // balance dropped after the line was added
        let line = flower(8);
        assert_eq!(StockGuard::clamp_quantity(&line, -1, 2).unwrap(), 7);
        assert!(StockGuard::clamp_quantity(&line, 1, 2).is_err());
    }

    #[test]
    fn test_bouquet_pinned() {
        let line = bouquet();
        for delta in [-3, -1, 1, 2, 100] {
            assert!(matches!(
                StockGuard::clamp_quantity(&line, delta, 10),
                Err(CoreError::BouquetQuantityPinned { .. })
            ));
        }
        assert_eq!(StockGuard::clamp_quantity(&line, 0, 0).unwrap(), 1);
        assert_eq!(StockGuard::check_quantity(&line, 1, 0).unwrap(), 1);
        assert!(StockGuard::check_quantity(&line, 2, 10).is_err());
    }

    #[test]
    fn test_check_quantity_absolute() {
        let line = flower(2);
        assert_eq!(StockGuard::check_quantity(&line, 4, 4).unwrap(), 4);
        assert_eq!(StockGuard::check_quantity(&line, 0, 0).unwrap(), 1);
        assert!(StockGuard::check_quantity(&line, 5, 4).is_err());
    }

    #[test]
    fn test_check_new_line() {
        assert!(StockGuard::check_new_line(&flower(3), 3).is_ok());
        assert!(StockGuard::check_new_line(&flower(4), 3).is_err());
        assert!(StockGuard::check_new_line(&bouquet(), 0).is_ok());
    }

    #[test]
    fn test_stock_levels() {
        let mut stock = StockLevels::for_location("loc1");
        stock.set("f1", 4);
        assert_eq!(stock.available(&ItemId::from("f1")), 4);
        assert_eq!(stock.available(&ItemId::from("unknown")), 0);

        stock.credit(&ItemId::from("f1"), 2);
        stock.credit(&ItemId::from("f2"), 1);
        assert_eq!(stock.available(&ItemId::from("f1")), 6);
        assert_eq!(stock.available(&ItemId::from("f2")), 1);
        assert_eq!(stock.location_id(), Some("loc1"));
        assert_eq!(stock.len(), 2);
    }

    #[test]
    fn test_find_conflicts() {
        let mut stock = StockLevels::default();
        stock.set("f1", 2);
        let lines = vec![flower(3), bouquet()];

        let conflicts = StockGuard::find_conflicts(&lines, &stock);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].requested, 3);
        assert_eq!(conflicts[0].available, 2);
    }

    #[test]
    fn test_catalog_to_line() {
        let entry = CatalogItem {
            id: ItemId::from("f1"),
            item_type: ItemType::Flower,
            name: "Rose".into(),
            color: Some("red".into()),
            category: Some("Flower".into()),
            standard_price: Money::from_cents(200),
            current_balance: 12,
            picture: None,
        };
        let line = entry.to_line(2).unwrap();
        assert_eq!(line.display_name(), "Rose (red)");
        assert_eq!(line.quantity(), 2);

        let stock = StockLevels::from_catalog("loc1", [&entry]);
        assert_eq!(stock.available(&entry.id), 12);
    }
}
