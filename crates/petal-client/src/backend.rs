//! # Order Backend
//!
//! The seam between the composer workflow and the order service. The
//! production implementation is [`crate::http::HttpBackend`]; tests plug in
//! an in-memory one.

use async_trait::async_trait;

use petal_core::lifecycle::OrderStatus;
use petal_core::PersistedId;

use crate::api::{
    Attachment, AvailableItem, BouquetDetails, CreateOrderRequest, CreatedItem, OrderItemPayload,
    OrderItemUpdate, OrderUpdateRequest, PersistedOrder, StatusChangeResponse,
};
use crate::error::ClientResult;

/// One method per order-service call.
///
/// Implementations map every non-success response to a
/// [`crate::ClientError`] carrying the server's message.
#[async_trait]
pub trait OrderBackend: Send + Sync {
    // =========================================================================
    // Reads
    // =========================================================================

    async fn available_items(&self, location_id: &str) -> ClientResult<Vec<AvailableItem>>;

    async fn available_bouquets(&self, location_id: &str) -> ClientResult<Vec<AvailableItem>>;

    async fn bouquet_details(&self, bouquet_id: &str) -> ClientResult<BouquetDetails>;

    async fn get_order(&self, order_id: &str) -> ClientResult<PersistedOrder>;

    // =========================================================================
    // Writes
    // =========================================================================

    /// Atomic create. Returns the new order id.
    async fn create_order(&self, request: &CreateOrderRequest) -> ClientResult<String>;

    async fn add_order_items(
        &self,
        order_id: &str,
        items: &[OrderItemPayload],
    ) -> ClientResult<Vec<CreatedItem>>;

    async fn update_order_item(
        &self,
        order_id: &str,
        item: &PersistedId,
        update: &OrderItemUpdate,
    ) -> ClientResult<()>;

    async fn delete_order_item(&self, order_id: &str, item: &PersistedId) -> ClientResult<()>;

    async fn update_order(&self, order_id: &str, request: &OrderUpdateRequest) -> ClientResult<()>;

    async fn change_status(
        &self,
        order_id: &str,
        new_status: OrderStatus,
    ) -> ClientResult<StatusChangeResponse>;

    async fn upload_attachment(&self, order_id: &str, attachment: &Attachment) -> ClientResult<()>;
}
