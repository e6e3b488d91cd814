//! # Order Composer
//!
//! Drives the engine against the order service: catalog load, atomic
//! create, edit-session save and status changes.
//!
//! ## Save Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  save_edit(session)                                                     │
//! │     │                                                                   │
//! │     ├── validate ──► ClientError::Core, nothing sent                    │
//! │     │                                                                   │
//! │     ├── DELETE each queued item ─────────── session.mark_deleted        │
//! │     ├── POST   new lines (one batch) ────── session.mark_created        │
//! │     ├── PATCH  each changed saved line                                  │
//! │     └── PATCH  order + previous_items                                   │
//! │                                                                         │
//! │  first call fails  ──► that error                                       │
//! │  later call fails  ──► PartialSave { progress, source }                 │
//! │  all calls done    ──► session.rebase, snapshot retaken                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One create or save runs at a time per composer; a second attempt while
//! one is in flight fails fast with `SaveInProgress`.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use petal_core::lifecycle::{OrderLifecycle, OrderStatus, TransitionOutcome};
use petal_core::order::OrderDraft;
use petal_core::reconcile::{EditSession, SavePlan, StockAdjustment};
use petal_core::stock::{CatalogItem, StockLevels};
use petal_core::{CoreError, ItemId, ItemType, LineItem, PersistedId};

use crate::api::{
    Attachment, AvailableItem, CreateOrderRequest, CreatedItem, OrderItemPayload, OrderItemUpdate,
    OrderUpdateRequest,
};
use crate::backend::OrderBackend;
use crate::error::{ClientError, ClientResult, SaveProgress};

// =============================================================================
// Results
// =============================================================================

/// Everything sellable at one location, with its balances.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub flowers: Vec<CatalogItem>,
    pub supplements: Vec<CatalogItem>,
    pub bouquets: Vec<CatalogItem>,
    pub stock: StockLevels,
}

impl Catalog {
    pub fn items(&self) -> impl Iterator<Item = &CatalogItem> {
        self.flowers
            .iter()
            .chain(self.supplements.iter())
            .chain(self.bouquets.iter())
    }

    pub fn find(&self, item_id: &ItemId) -> Option<&CatalogItem> {
        self.items().find(|item| &item.id == item_id)
    }
}

#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub order_id: String,
    pub status: OrderStatus,
    /// Best-effort steps that failed, such as attachment uploads.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SaveReport {
    pub progress: SaveProgress,
    /// Inventory change the service should have applied.
    pub adjustments: Vec<StockAdjustment>,
}

/// A loaded order ready for editing.
#[derive(Debug, Clone)]
pub struct OpenedOrder {
    pub session: EditSession,
    /// `None` when the order has no shop location.
    pub catalog: Option<Catalog>,
}

// =============================================================================
// Composer
// =============================================================================

pub struct OrderComposer {
    backend: Arc<dyn OrderBackend>,
    save_lock: Mutex<()>,
}

impl OrderComposer {
    pub fn new(backend: Arc<dyn OrderBackend>) -> Self {
        OrderComposer {
            backend,
            save_lock: Mutex::new(()),
        }
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    /// Fetches items and bouquets for a location in parallel.
    pub async fn load_catalog(&self, location_id: &str) -> ClientResult<Catalog> {
        let (items, bouquets) = tokio::try_join!(
            self.backend.available_items(location_id),
            self.backend.available_bouquets(location_id),
        )?;

        let (flowers, supplements): (Vec<CatalogItem>, Vec<CatalogItem>) = items
            .into_iter()
            .map(AvailableItem::into_catalog)
            .partition(|item| item.item_type == ItemType::Flower);
        let bouquets: Vec<CatalogItem> = bouquets.into_iter().map(AvailableItem::into_bouquet).collect();

        let stock = StockLevels::from_catalog(
            location_id,
            flowers.iter().chain(supplements.iter()).chain(bouquets.iter()),
        );
        debug!(
            location_id,
            flowers = flowers.len(),
            supplements = supplements.len(),
            bouquets = bouquets.len(),
            "Catalog loaded"
        );

        Ok(Catalog {
            flowers,
            supplements,
            bouquets,
            stock,
        })
    }

    /// Builds a bouquet line with its composition.
    ///
    /// If the details call fails the line is returned without composition.
    pub async fn bouquet_line(&self, bouquet: &CatalogItem) -> ClientResult<LineItem> {
        let line = bouquet.to_line(1)?;
        match self.backend.bouquet_details(bouquet.id.as_str()).await {
            Ok(details) => Ok(line.with_composition(details.components())),
            Err(e) => {
                warn!(item_id = %bouquet.id, error = %e, "Bouquet details unavailable");
                Ok(line)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Create
    // -------------------------------------------------------------------------

    /// Validates and submits a draft in one call, then uploads attachments.
    ///
    /// ## Errors
    /// - `Core` when validation fails (no call is made)
    /// - `SaveInProgress` when another create or save is running
    pub async fn create_order(
        &self,
        draft: &OrderDraft,
        attachments: &[Attachment],
    ) -> ClientResult<CreateOutcome> {
        let _guard = self
            .save_lock
            .try_lock()
            .map_err(|_| ClientError::SaveInProgress)?;

        draft.validate()?;
        let request = CreateOrderRequest::from_draft(draft)?;
        let order_id = self.backend.create_order(&request).await?;

        let mut warnings = Vec::new();
        for attachment in attachments {
            if let Err(e) = self.backend.upload_attachment(&order_id, attachment).await {
                warn!(order_id = %order_id, file = %attachment.file_name, error = %e, "Attachment upload failed");
                warnings.push(format!(
                    "Attachment {} was not uploaded: {}",
                    attachment.file_name, e
                ));
            }
        }

        Ok(CreateOutcome {
            order_id,
            status: draft.status(),
            warnings,
        })
    }

    // -------------------------------------------------------------------------
    // Edit
    // -------------------------------------------------------------------------

    /// Loads an order and opens a fresh edit session on it.
    pub async fn open_edit_session(&self, order_id: &str) -> ClientResult<OpenedOrder> {
        let order = self.backend.get_order(order_id).await?;
        let status = order.status()?;
        let details = order.details();
        let discount = order.discount();
        let delivery_price = order.delivery_price();

        let catalog = match order.location_id() {
            Some(location_id) => Some(self.load_catalog(location_id).await?),
            None => {
                warn!(order_id, "Order has no shop location; stock is unknown");
                None
            }
        };
        let stock = catalog
            .as_ref()
            .map(|c| c.stock.clone())
            .unwrap_or_default();

        let id = order.id.clone();
        let lines = order.into_lines()?;
        let mut session = EditSession::begin(id, status, details, lines, stock);
        session.set_discount(discount);
        session.set_delivery_price(delivery_price);

        Ok(OpenedOrder { session, catalog })
    }

    /// Sends the session's changes.
    ///
    /// Each step that succeeds is recorded in the session, so calling this
    /// again after a `PartialSave` only sends what is still outstanding.
    pub async fn save_edit(&self, session: &mut EditSession) -> ClientResult<SaveReport> {
        let _guard = self
            .save_lock
            .try_lock()
            .map_err(|_| ClientError::SaveInProgress)?;

        session.validate()?;
        let plan = session.plan_save();
        let adjustments = session.expected_adjustments();
        debug!(
            order_id = %plan.order_id,
            deletions = plan.deletions.len(),
            creations = plan.creations.len(),
            updates = plan.updates.len(),
            "Saving order"
        );

        let mut progress = SaveProgress::default();
        match self.run_save(session, &plan, &mut progress).await {
            Ok(()) => {
                session.rebase();
                info!(order_id = %plan.order_id, %progress, "Order saved");
                Ok(SaveReport {
                    progress,
                    adjustments,
                })
            }
            Err(e) if progress.is_empty() => Err(e),
            Err(e) => {
                error!(order_id = %plan.order_id, %progress, error = %e, "Save stopped part way");
                Err(ClientError::PartialSave {
                    progress,
                    source: Box::new(e),
                })
            }
        }
    }

    async fn run_save(
        &self,
        session: &mut EditSession,
        plan: &SavePlan,
        progress: &mut SaveProgress,
    ) -> ClientResult<()> {
        let order_id = plan.order_id.as_str();

        for persisted_id in &plan.deletions {
            self.backend.delete_order_item(order_id, persisted_id).await?;
            session.mark_deleted(persisted_id);
            progress.deleted += 1;
        }

        if !plan.creations.is_empty() {
            let payload: Vec<OrderItemPayload> =
                plan.creations.iter().map(OrderItemPayload::from).collect();
            let created = self.backend.add_order_items(order_id, &payload).await?;
            progress.created += plan.creations.len();
            record_created(session, &plan.creations, &created)?;
        }

        for line in &plan.updates {
            if let Some(persisted_id) = line.persisted_id() {
                self.backend
                    .update_order_item(order_id, persisted_id, &OrderItemUpdate::from(line))
                    .await?;
                progress.updated += 1;
            }
        }

        self.backend
            .update_order(order_id, &OrderUpdateRequest::from(plan))
            .await?;
        progress.order_updated = true;

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Status
    // -------------------------------------------------------------------------

    /// Requests Draft ⇄ Confirmed from the service.
    ///
    /// A refusal leaves `lifecycle` at its prior status and returns
    /// `TransitionRejected` with the service's reason unchanged.
    pub async fn change_status(
        &self,
        order_id: &str,
        lifecycle: &mut OrderLifecycle,
        target: OrderStatus,
    ) -> ClientResult<OrderStatus> {
        let transition = lifecycle.begin(target)?;
        info!(
            order_id,
            from = %transition.from,
            to = %transition.to,
            effect = ?transition.effect(),
            "Requesting status change"
        );

        match self.backend.change_status(order_id, target).await {
            Ok(response) => Ok(lifecycle.resolve(TransitionOutcome::Accepted {
                previous_status: response.previous_status,
                new_status: response.new_status,
            })?),
            Err(e) if e.is_rejection() => {
                let outcome = TransitionOutcome::Rejected {
                    reason: e.to_string(),
                };
                match lifecycle.resolve(outcome) {
                    Err(CoreError::TransitionRejected { to, reason }) => {
                        Err(ClientError::TransitionRejected { to, reason })
                    }
                    Err(other) => Err(other.into()),
                    Ok(status) => Ok(status),
                }
            }
            Err(e) => {
                lifecycle.abandon();
                Err(e)
            }
        }
    }
}

/// Assigns persisted ids from a batch-add response.
///
/// Matches by `item_id` when the response carries it, else by position when
/// the counts agree. A line left without an id fails the save: sending it
/// again would create a second record, so the caller must reload instead.
fn record_created(
    session: &mut EditSession,
    creations: &[LineItem],
    created: &[CreatedItem],
) -> ClientResult<()> {
    let positional = created.len() == creations.len();
    let mut missing = Vec::new();
    for (index, line) in creations.iter().enumerate() {
        let matched = created
            .iter()
            .find(|c| c.item_id.as_deref() == Some(line.item_id().as_str()))
            .or_else(|| if positional { created.get(index) } else { None });

        match matched {
            Some(item) => {
                session.mark_created(line.item_id(), PersistedId::new(item.id.clone()));
            }
            None => missing.push(line.item_id().to_string()),
        }
    }

    if missing.is_empty() {
        return Ok(());
    }
    warn!(missing = ?missing, "Created lines missing from response");
    Err(ClientError::InvalidResponse(format!(
        "created items without an id in the response: {}; reload the order before saving again",
        missing.join(", ")
    )))
}

// =============================================================================
// Tests
// =============================================================================
