//! # HTTP Backend
//!
//! [`OrderBackend`] over the order service's REST API.
//!
//! ```text
//! ┌──────────────┐   bearer token, 15s timeout   ┌──────────────────────┐
//! │ HttpBackend  │ ────────────────────────────► │ order service        │
//! │              │                               │                      │
//! │ GET  ──► retry transient failures (backoff)  │                      │
//! │ POST/PATCH/DELETE ──► one attempt only       │                      │
//! └──────────────┘ ◄── {"detail": ...} on error  └──────────────────────┘
//! ```

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use petal_core::lifecycle::OrderStatus;
use petal_core::PersistedId;

use crate::api::{
    Attachment, AvailableItem, BouquetDetails, CreateOrderRequest, CreateOrderResponse, CreatedItem,
    CreatedItems, OrderItemPayload, OrderItemUpdate, OrderUpdateRequest, PersistedOrder,
    StatusChangeRequest, StatusChangeResponse,
};
use crate::backend::OrderBackend;
use crate::config::{ClientConfig, RetrySettings};
use crate::error::{extract_server_message, ClientError, ClientResult};

/// Longest raw body echoed back as an error message.
const MAX_RAW_MESSAGE: usize = 200;

pub struct HttpBackend {
    client: Client,
    base: Url,
    base_url: String,
    token: Option<String>,
    retry: RetrySettings,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(HttpBackend {
            client,
            base: Url::parse(config.base_url())?,
            base_url: config.base_url().to_string(),
            token: config.token().map(str::to_string),
            retry: config.retry.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =========================================================================
    // Request Plumbing
    // =========================================================================

    fn request(&self, method: Method, segments: &[&str]) -> ClientResult<RequestBuilder> {
        let builder = self.client.request(method, endpoint(&self.base, segments)?);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(&self, builder: RequestBuilder) -> ClientResult<Response> {
        let response = builder.send().await?;
        handle_response(response).await
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.retry.initial_backoff(),
            max_interval: self.retry.max_backoff(),
            multiplier: 2.0,
            max_elapsed_time: Some(self.retry.max_elapsed()),
            ..Default::default()
        }
    }

    /// GET with retry of transient failures.
    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> ClientResult<T> {
        let mut backoff = self.create_backoff();
        let mut attempt = 0u32;
        let path = segments.join("/");
        let path = path.as_str();

        loop {
            attempt += 1;
            debug!(path, attempt, "GET");
            let result = match self.send(self.request(Method::GET, segments)?.query(query)).await {
                Ok(response) => response.json::<T>().await.map_err(ClientError::from),
                Err(e) => Err(e),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if self.retry.is_enabled() && e.is_retryable() => match backoff.next_backoff() {
                    Some(delay) => {
                        warn!(path, attempt, ?delay, error = %e, "Read failed, retrying");
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        warn!(path, attempt, error = %e, "Read failed, giving up");
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }

    /// Single-attempt write with a JSON body.
    async fn write_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> ClientResult<Response> {
        debug!(%method, path = %segments.join("/"), "write");
        self.send(self.request(method, segments)?.json(body)).await
    }
}

// =============================================================================
// Response Handling
// =============================================================================

/// Appends path segments to the base URL, percent-encoding each one.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> ClientResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidUrl(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Passes successes through; turns anything else into `ClientError::Server`.
async fn handle_response(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(status.as_u16(), status.canonical_reason(), &body);
    warn!(status = status.as_u16(), message = %message, "Order service returned an error");

    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}

/// Structured detail, else the raw body, else the status text.
pub(crate) fn error_message(status: u16, reason: Option<&str>, body: &str) -> String {
    if let Some(message) = extract_server_message(body) {
        return message;
    }
    let raw = body.trim();
    if !raw.is_empty() {
        return raw.chars().take(MAX_RAW_MESSAGE).collect();
    }
    match reason {
        Some(reason) => format!("Request failed with status {} {}", status, reason),
        None => format!("Request failed with status {}", status),
    }
}

// =============================================================================
// OrderBackend
// =============================================================================

#[async_trait]
impl OrderBackend for HttpBackend {
    async fn available_items(&self, location_id: &str) -> ClientResult<Vec<AvailableItem>> {
        self.get_json(&["orders", "available-items"], &[("shop_location_id", location_id)])
            .await
    }

    async fn available_bouquets(&self, location_id: &str) -> ClientResult<Vec<AvailableItem>> {
        self.get_json(&["orders", "available-bouquets"], &[("shop_location_id", location_id)])
            .await
    }

    async fn bouquet_details(&self, bouquet_id: &str) -> ClientResult<BouquetDetails> {
        self.get_json(&["orders", "bouquet-details", bouquet_id], &[])
            .await
    }

    async fn get_order(&self, order_id: &str) -> ClientResult<PersistedOrder> {
        self.get_json(&["orders", order_id], &[]).await
    }

    async fn create_order(&self, request: &CreateOrderRequest) -> ClientResult<String> {
        let response = self.write_json(Method::POST, &["orders"], request).await?;
        let created: CreateOrderResponse = response.json().await?;
        let order_id = created.into_order_id()?;
        info!(order_id = %order_id, items = request.items.len(), "Order created");
        Ok(order_id)
    }

    async fn add_order_items(
        &self,
        order_id: &str,
        items: &[OrderItemPayload],
    ) -> ClientResult<Vec<CreatedItem>> {
        let response = self
            .write_json(Method::POST, &["orders", order_id, "items"], items)
            .await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let created: CreatedItems = serde_json::from_str(&text)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        Ok(created.into_vec())
    }

    async fn update_order_item(
        &self,
        order_id: &str,
        item: &PersistedId,
        update: &OrderItemUpdate,
    ) -> ClientResult<()> {
        self.write_json(
            Method::PATCH,
            &["orders", order_id, "items", item.as_str()],
            update,
        )
        .await?;
        Ok(())
    }

    async fn delete_order_item(&self, order_id: &str, item: &PersistedId) -> ClientResult<()> {
        let segments = ["orders", order_id, "items", item.as_str()];
        debug!(path = %segments.join("/"), "DELETE");
        self.send(self.request(Method::DELETE, &segments)?).await?;
        Ok(())
    }

    async fn update_order(&self, order_id: &str, request: &OrderUpdateRequest) -> ClientResult<()> {
        self.write_json(Method::PATCH, &["orders", order_id], request)
            .await?;
        Ok(())
    }

    async fn change_status(
        &self,
        order_id: &str,
        new_status: OrderStatus,
    ) -> ClientResult<StatusChangeResponse> {
        let response = self
            .write_json(
                Method::PATCH,
                &["orders", order_id, "status"],
                &StatusChangeRequest { new_status },
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn upload_attachment(&self, order_id: &str, attachment: &Attachment) -> ClientResult<()> {
        let part = Part::bytes(attachment.bytes.clone())
            .file_name(attachment.file_name.clone())
            .mime_str(&attachment.mime)
            .map_err(|e| ClientError::Attachment {
                name: attachment.file_name.clone(),
                reason: e.to_string(),
            })?;
        let form = Form::new().part("file", part);

        let segments = ["orders", order_id, "attachments"];
        debug!(path = %segments.join("/"), file = %attachment.file_name, "upload");
        self.send(self.request(Method::POST, &segments)?.multipart(form))
            .await?;
        Ok(())
    }
}
