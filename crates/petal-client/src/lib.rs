//! # petal-client: Order Service Client for Petal Orders
//!
//! Connects the pure engine in `petal-core` to the order service that owns
//! orders and inventory.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Client Architecture                              │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                  OrderComposer (workflow)                        │  │
//! │  │                                                                  │  │
//! │  │  load_catalog ─► CartStore / OrderDraft / EditSession (core)    │  │
//! │  │  create_order ─► one atomic POST, attachments best-effort       │  │
//! │  │  save_edit    ─► delete → add → update → order PATCH            │  │
//! │  │  change_status ► Draft ⇄ Confirmed, rejection kept verbatim     │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │ Arc<dyn OrderBackend>                   │
//! │                               ▼                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                HttpBackend (reqwest + backoff)                   │  │
//! │  │  wire types in `api`, server messages from {"detail": ...}       │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`api`] - Request and response bodies
//! - [`backend`] - The `OrderBackend` trait
//! - [`composer`] - Create, edit-save and status workflows
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Client error types
//! - [`http`] - reqwest implementation of `OrderBackend`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use petal_client::{ClientConfig, HttpBackend, OrderComposer};
//! use petal_core::order::OrderDraft;
//!
//! let config = ClientConfig::load_or_default(None);
//! let composer = OrderComposer::new(Arc::new(HttpBackend::new(&config)?));
//!
//! let catalog = composer.load_catalog("recShop1").await?;
//! let mut draft = OrderDraft::new(catalog.stock.clone());
//! draft.details.client_id = Some("recClient1".into());
//! draft.store.add_catalog_item(&catalog.flowers[0], 3)?;
//!
//! let outcome = composer.create_order(&draft, &[]).await?;
//! println!("Created {}", outcome.order_id);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod api;
pub mod backend;
pub mod composer;
pub mod config;
pub mod error;
pub mod http;

// =============================================================================
// Re-exports
// =============================================================================

pub use backend::OrderBackend;
pub use composer::{Catalog, CreateOutcome, OpenedOrder, OrderComposer, SaveReport};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, SaveProgress};
pub use http::HttpBackend;
