//! # Wire Types
//!
//! Request and response bodies of the order service, and their mapping to
//! and from the core model.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  GET    orders/available-items?shop_location_id=   → [AvailableItem]   │
//! │  GET    orders/available-bouquets?shop_location_id= → [AvailableItem] │
//! │  GET    orders/bouquet-details/{id}                 → BouquetDetails   │
//! │  GET    orders/{id}                                 → PersistedOrder   │
//! │  POST   orders                      CreateOrderRequest                  │
//! │  POST   orders/{id}/items           [OrderItemPayload] → CreatedItems   │
//! │  PATCH  orders/{id}/items/{itemId}  OrderItemUpdate                     │
//! │  DELETE orders/{id}/items/{itemId}                                      │
//! │  PATCH  orders/{id}                 OrderUpdateRequest                  │
//! │  PATCH  orders/{id}/status          StatusChangeRequest                 │
//! │  POST   orders/{id}/attachments     multipart "file"                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Money goes out as a JSON number already rounded to 2 places.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

use petal_core::lifecycle::OrderStatus;
use petal_core::order::{DeliveryType, OrderDetails, OrderDraft, PaymentMethod, PaymentStatus};
use petal_core::pricing::Discount;
use petal_core::reconcile::{SavePlan, SnapshotLine};
use petal_core::item::BouquetComponent;
use petal_core::stock::CatalogItem;
use petal_core::{ItemId, ItemType, LineItem, Money, PersistedId, ValidationError};

use crate::error::{ClientError, ClientResult};

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Catalog
// =============================================================================

/// One row of an available-items or available-bouquets listing.
#[derive(Debug, Clone, Deserialize)]
pub struct AvailableItem {
    #[serde(alias = "id")]
    pub flower_item_record_id: String,

    #[serde(alias = "name")]
    pub item_name: String,

    #[serde(rename = "Color", alias = "color", default)]
    pub color: Option<String>,

    #[serde(default)]
    pub item_category: Option<String>,

    /// Reported as a number that may be fractional or negative.
    #[serde(default)]
    pub current_balance: Option<f64>,

    #[serde(default)]
    pub standard_price: Option<Money>,

    #[serde(default)]
    pub item_picture: Option<String>,
}

impl AvailableItem {
    fn balance(&self) -> u32 {
        // saturating: NaN and negatives become 0
        self.current_balance.unwrap_or(0.0).max(0.0).floor() as u32
    }

    fn into_catalog_as(self, item_type: ItemType) -> CatalogItem {
        let current_balance = self.balance();
        CatalogItem {
            id: ItemId::new(self.flower_item_record_id),
            item_type,
            name: self.item_name,
            color: non_blank(self.color.as_deref()),
            category: self.item_category,
            standard_price: self.standard_price.unwrap_or_default().non_negative(),
            current_balance,
            picture: self.item_picture,
        }
    }

    /// Entry from `available-items`: flower or supplement by category.
    pub fn into_catalog(self) -> CatalogItem {
        let item_type = ItemType::from_category(self.item_category.as_deref());
        self.into_catalog_as(item_type)
    }

    /// Entry from `available-bouquets`.
    pub fn into_bouquet(self) -> CatalogItem {
        self.into_catalog_as(ItemType::Bouquet)
    }
}

/// One flower inside a bouquet, as the service lists it.
#[derive(Debug, Clone, Deserialize)]
pub struct CompositionEntry {
    pub item_name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub quantity: u32,
}

impl From<CompositionEntry> for BouquetComponent {
    fn from(entry: CompositionEntry) -> Self {
        BouquetComponent {
            name: entry.item_name,
            color: non_blank(entry.color.as_deref()),
            quantity: entry.quantity,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BouquetDetails {
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub composition: Vec<CompositionEntry>,
    #[serde(default)]
    pub total_flowers_used: u32,
}

impl BouquetDetails {
    pub fn components(&self) -> Vec<BouquetComponent> {
        self.composition.iter().cloned().map(BouquetComponent::from).collect()
    }
}

// =============================================================================
// Create
// =============================================================================

/// One line of a create or batch-add request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItemPayload {
    pub item_id: ItemId,
    pub item_type: &'static str,
    pub quantity: u32,
    pub unit_price: Money,
}

impl From<&LineItem> for OrderItemPayload {
    fn from(line: &LineItem) -> Self {
        OrderItemPayload {
            item_id: line.item_id().clone(),
            item_type: line.item_type().wire_name(),
            quantity: line.quantity(),
            unit_price: line.actual_price().rounded(),
        }
    }
}

/// Atomic create: every line and the full pricing block in one call.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    pub client_id: String,
    pub shop_location_id: String,
    pub delivery_type: DeliveryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    pub order_status: OrderStatus,
    pub subtotal: Money,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_percentage: Decimal,
    pub discount_amount: Money,
    pub delivery_price: Money,
    pub items: Vec<OrderItemPayload>,
}

impl CreateOrderRequest {
    /// Builds the request body.
    ///
    /// ## Errors
    /// - `Required` when the client or location is missing
    pub fn from_draft(draft: &OrderDraft) -> ClientResult<Self> {
        let details = &draft.details;
        let client_id = details
            .client()
            .ok_or_else(|| ValidationError::required("Client"))?
            .to_string();
        let shop_location_id = draft
            .location_id()
            .ok_or_else(|| ValidationError::required("Shop location"))?
            .to_string();
        let totals = draft.totals().rounded();

        Ok(CreateOrderRequest {
            client_id,
            shop_location_id,
            delivery_type: details.delivery_type,
            delivery_address: details.effective_address().map(str::to_string),
            delivery_date_time: non_blank(details.delivery_date_time.as_deref()),
            notes: non_blank(details.notes.as_deref()),
            payment_status: details.payment_status,
            payment_method: details.effective_payment_method(),
            order_status: draft.status(),
            subtotal: totals.subtotal,
            discount_percentage: draft.store.discount().percent(),
            discount_amount: totals.discount_amount,
            delivery_price: totals.delivery_price,
            items: draft.store.lines().iter().map(OrderItemPayload::from).collect(),
        })
    }
}

/// The service answers a create with `{id, fields}` or `{order_id, ...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
}

impl CreateOrderResponse {
    pub fn into_order_id(self) -> ClientResult<String> {
        self.id
            .or(self.order_id)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                ClientError::InvalidResponse("Order created but no ID returned from server".into())
            })
    }
}

// =============================================================================
// Edit
// =============================================================================

/// Id the service assigned to a line from a batch add.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedItem {
    pub id: String,
    #[serde(default)]
    pub item_id: Option<String>,
}

/// Batch-add response: a bare list or a wrapped one.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CreatedItems {
    List(Vec<CreatedItem>),
    Wrapped {
        #[serde(alias = "created")]
        items: Vec<CreatedItem>,
    },
}

impl CreatedItems {
    pub fn into_vec(self) -> Vec<CreatedItem> {
        match self {
            CreatedItems::List(items) | CreatedItems::Wrapped { items } => items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItemUpdate {
    pub quantity: u32,
    pub unit_price: Money,
}

impl From<&LineItem> for OrderItemUpdate {
    fn from(line: &LineItem) -> Self {
        OrderItemUpdate {
            quantity: line.quantity(),
            unit_price: line.actual_price().rounded(),
        }
    }
}

/// Order-level PATCH closing a save. Never carries `order_status`.
#[derive(Debug, Clone, Serialize)]
pub struct OrderUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub delivery_type: DeliveryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_percentage: Decimal,
    pub discount_amount: Money,
    pub delivery_price: Money,
    pub subtotal: Money,
    pub total_price: Money,
    pub previous_items: Vec<SnapshotLine>,
}

impl From<&SavePlan> for OrderUpdateRequest {
    fn from(plan: &SavePlan) -> Self {
        let details = &plan.details;
        let totals = plan.totals.rounded();
        OrderUpdateRequest {
            client_id: details.client().map(str::to_string),
            delivery_type: details.delivery_type,
            delivery_address: details.effective_address().map(str::to_string),
            delivery_date_time: non_blank(details.delivery_date_time.as_deref()),
            notes: non_blank(details.notes.as_deref()),
            payment_status: details.payment_status,
            payment_method: details.payment_method,
            discount_percentage: plan.discount.percent(),
            discount_amount: totals.discount_amount,
            delivery_price: totals.delivery_price,
            subtotal: totals.subtotal,
            total_price: totals.total,
            previous_items: plan.previous_items.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusChangeRequest {
    pub new_status: OrderStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChangeResponse {
    pub previous_status: OrderStatus,
    pub new_status: OrderStatus,
}

// =============================================================================
// Persisted Order
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersistedOrderFields {
    #[serde(default)]
    pub order_status: Option<String>,
    #[serde(default)]
    pub client_id: Vec<String>,
    #[serde(default)]
    pub shop_location_id: Vec<String>,
    #[serde(default)]
    pub delivery_type: Option<String>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub delivery_date_time: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub discount_percentage: Option<Decimal>,
    #[serde(default)]
    pub delivery_price: Option<Money>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersistedBouquetDetails {
    #[serde(default)]
    pub composition: Vec<CompositionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistedOrderItem {
    #[serde(default)]
    pub id: Option<String>,
    pub item_id: String,
    pub item_type: String,
    #[serde(default)]
    pub item_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    #[serde(default)]
    pub standard_unit_price: Option<Money>,
    #[serde(default)]
    pub flower_picture: Option<String>,
    #[serde(default)]
    pub bouquet_details: Option<PersistedBouquetDetails>,
}

impl PersistedOrderItem {
    /// Rebuilds the line with its persisted id. Markup starts cleared.
    pub fn into_line(self) -> ClientResult<LineItem> {
        let persisted_id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .map(PersistedId::new)
            .ok_or_else(|| {
                ClientError::InvalidResponse(format!("order item {} has no id", self.item_id))
            })?;
        let item_type = ItemType::from_wire(&self.item_type)?;
        let standard = self.standard_unit_price.unwrap_or(self.unit_price);

        let mut line = LineItem::persisted(
            persisted_id,
            self.item_id,
            item_type,
            self.item_name,
            standard,
            self.unit_price,
            self.quantity,
        )?;
        if let Some(picture) = self.flower_picture {
            line = line.with_picture(picture);
        }
        if let Some(details) = self.bouquet_details {
            let components = details.composition.into_iter().map(BouquetComponent::from).collect();
            line = line.with_composition(components);
        }
        Ok(line)
    }
}

/// An order as `GET orders/{id}` returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistedOrder {
    pub id: String,
    #[serde(default)]
    pub fields: PersistedOrderFields,
    #[serde(default)]
    pub items: Vec<PersistedOrderItem>,
}

impl PersistedOrder {
    pub fn status(&self) -> ClientResult<OrderStatus> {
        match non_blank(self.fields.order_status.as_deref()) {
            Some(s) => Ok(s.parse()?),
            None => Ok(OrderStatus::Draft),
        }
    }

    pub fn location_id(&self) -> Option<&str> {
        self.fields.shop_location_id.first().map(String::as_str)
    }

    pub fn discount(&self) -> Discount {
        Discount::new(self.fields.discount_percentage.unwrap_or_default())
    }

    pub fn delivery_price(&self) -> Money {
        self.fields.delivery_price.unwrap_or_default().non_negative()
    }

    /// Unknown or missing enum values fall back to their defaults.
    pub fn details(&self) -> OrderDetails {
        let f = &self.fields;
        OrderDetails {
            client_id: f.client_id.first().cloned(),
            delivery_type: f
                .delivery_type
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            delivery_address: non_blank(f.delivery_address.as_deref()),
            delivery_date_time: non_blank(f.delivery_date_time.as_deref()),
            notes: non_blank(f.notes.as_deref()),
            payment_status: f
                .payment_status
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            payment_method: f.payment_method.as_deref().and_then(|s| s.parse().ok()),
        }
    }

    pub fn into_lines(self) -> ClientResult<Vec<LineItem>> {
        self.items.into_iter().map(PersistedOrderItem::into_line).collect()
    }
}

// =============================================================================
// Attachments
// =============================================================================

/// A file to upload after create.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .to_string();
        Attachment { file_name, bytes, mime }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("attachment")
            .to_string();
        let bytes = tokio::fs::read(path).await.map_err(|e| ClientError::Attachment {
            name: file_name.clone(),
            reason: e.to_string(),
        })?;
        Ok(Attachment::new(file_name, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petal_core::pricing::Markup;
    use petal_core::reconcile::EditSession;
    use petal_core::stock::StockLevels;
    use serde_json::json;

    #[test]
    fn test_available_item_mapping() {
        let raw = json!([
            {"flower_item_record_id": "recF1", "item_name": "Rose", "Color": "Red",
             "item_category": "Flower", "current_balance": 12.0, "standard_price": 2.5},
            {"flower_item_record_id": "recS1", "item_name": "Ribbon", "Color": "",
             "item_category": "Accessories", "current_balance": -3}
        ]);
        let items: Vec<AvailableItem> = serde_json::from_value(raw).unwrap();
        let catalog: Vec<CatalogItem> = items.into_iter().map(AvailableItem::into_catalog).collect();

        assert_eq!(catalog[0].item_type, ItemType::Flower);
        assert_eq!(catalog[0].current_balance, 12);
        assert_eq!(catalog[0].standard_price, Money::from_cents(250));
        assert_eq!(catalog[0].color.as_deref(), Some("Red"));

        assert_eq!(catalog[1].item_type, ItemType::Supplement);
        assert_eq!(catalog[1].current_balance, 0);
        assert!(catalog[1].color.is_none());
        assert!(catalog[1].standard_price.is_zero());
    }

    #[test]
    fn test_create_request_shape() {
        let mut stock = StockLevels::for_location("loc1");
        stock.set("f1", 10);
        let mut draft = OrderDraft::new(stock);
        draft.details.client_id = Some("cli1".into());
        draft.details.delivery_address = Some("1 Main St".into());
        draft.details.payment_method = Some(PaymentMethod::Card);
        draft
            .store
            .add_or_update(LineItem::new("f1", ItemType::Flower, "Rose", Money::from_cents(200), 3).unwrap())
            .unwrap();
        draft
            .store
            .set_markup(&ItemId::from("f1"), Some(Markup::clamped(10)))
            .unwrap();

        let body = serde_json::to_value(CreateOrderRequest::from_draft(&draft).unwrap()).unwrap();

        assert_eq!(body["order_status"], "Confirmed");
        assert_eq!(body["shop_location_id"], "loc1");
        // pickup with pending payment: no address, no method
        assert!(body.get("delivery_address").is_none());
        assert!(body.get("payment_method").is_none());
        assert_eq!(body["items"][0]["item_type"], "Flower");
        assert_eq!(body["items"][0]["unit_price"], 2.2);
        assert_eq!(body["subtotal"], 6.6);
    }

    #[test]
    fn test_order_update_request_shape() {
        let mut stock = StockLevels::for_location("loc1");
        stock.set("f1", 0);
        let rose = LineItem::persisted(
            PersistedId::new("rec1"),
            "f1",
            ItemType::Flower,
            "Rose",
            Money::from_cents(333),
            Money::from_cents(333),
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
            vec![rose],
            stock,
        );
        session
            .set_markup(&ItemId::from("f1"), Some(Markup::clamped(10)))
            .unwrap();
        session.set_discount(Discount::from_percent(10));

        let body = serde_json::to_value(OrderUpdateRequest::from(&session.plan_save())).unwrap();

        // status only changes through the status endpoint
        assert!(body.get("order_status").is_none());
        assert_eq!(
            body["previous_items"],
            json!([{"item_id": "f1", "item_name": "Rose", "item_type": "Flower",
                    "quantity": 2, "unit_price": 3.33, "subtotal": 6.66}])
        );
        // 2 x 3.663 = 7.326, less 10%
        assert_eq!(body["subtotal"], 7.33);
        assert_eq!(body["discount_amount"], 0.73);
        assert_eq!(body["total_price"], 6.59);
        assert_eq!(body["discount_percentage"], 10.0);
        assert_eq!(body["client_id"], "cli1");
        assert!(body.get("delivery_address").is_none());
    }

    #[test]
    fn test_create_response_shapes() {
        let a: CreateOrderResponse = serde_json::from_value(json!({"id": "rec1", "fields": {}})).unwrap();
        assert_eq!(a.into_order_id().unwrap(), "rec1");

        let b: CreateOrderResponse =
            serde_json::from_value(json!({"success": true, "order_id": "rec2"})).unwrap();
        assert_eq!(b.into_order_id().unwrap(), "rec2");

        let c: CreateOrderResponse = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(matches!(c.into_order_id(), Err(ClientError::InvalidResponse(_))));
    }

    #[test]
    fn test_persisted_order_load() {
        let raw = json!({
            "id": "ord1",
            "fields": {
                "order_status": "In progress",
                "client_id": ["cli1"],
                "shop_location_id": ["loc1"],
                "payment_status": "Paid",
                "payment_method": "Bank Transfer",
                "discount_percentage": 10,
                "delivery_price": 5
            },
            "items": [
                {"id": "rec1", "item_id": "f1", "item_type": "Item", "item_name": "Rose",
                 "quantity": 2, "unit_price": 2.4},
                {"id": "rec2", "item_id": "b1", "item_type": "Bouquet", "item_name": "Spring",
                 "quantity": 1, "unit_price": 25, "standard_unit_price": 25,
                 "bouquet_details": {"composition": [{"item_name": "Tulip", "color": "Yellow", "quantity": 7}]}}
            ]
        });
        let order: PersistedOrder = serde_json::from_value(raw).unwrap();

        assert_eq!(order.status().unwrap(), OrderStatus::InProgress);
        assert_eq!(order.location_id(), Some("loc1"));
        assert_eq!(order.discount().percent(), Decimal::from(10));
        let details = order.details();
        assert_eq!(details.client_id.as_deref(), Some("cli1"));
        assert_eq!(details.payment_method, Some(PaymentMethod::BankTransfer));

        let lines = order.into_lines().unwrap();
        assert_eq!(lines[0].item_type(), ItemType::Flower);
        // no standard_unit_price: falls back to unit_price
        assert_eq!(lines[0].standard_price(), Money::from_cents(240));
        assert!(lines[0].markup().is_none());
        assert_eq!(lines[1].bouquet_composition().unwrap()[0].quantity, 7);
        assert_eq!(lines[1].persisted_id(), Some(&PersistedId::new("rec2")));
    }

    #[test]
    fn test_created_items_both_shapes() {
        let list: CreatedItems = serde_json::from_value(json!([{"id": "rec9", "item_id": "f2"}])).unwrap();
        assert_eq!(list.into_vec()[0].id, "rec9");

        let wrapped: CreatedItems = serde_json::from_value(json!({"items": [{"id": "rec8"}]})).unwrap();
        let items = wrapped.into_vec();
        assert_eq!(items[0].id, "rec8");
        assert!(items[0].item_id.is_none());
    }

    #[test]
    fn test_attachment_mime() {
        assert_eq!(Attachment::new("card.JPG", vec![1]).mime, "image/jpeg");
        assert_eq!(Attachment::new("invoice.pdf", vec![1]).mime, "application/pdf");
        assert_eq!(Attachment::new("notes", vec![]).mime, "application/octet-stream");
    }
}
