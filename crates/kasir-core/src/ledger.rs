//! # Stock Ledger
//!
//! The single path by which `Item.stock_quantity` changes.
//!
//! ## Movement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_movement(request)                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock item ───────────────────────────────────────────┐                │
//! │       │                                                │ held across   │
//! │       ▼                                                │ read, check   │
//! │  previous = stock_quantity                             │ and write     │
//! │  new      = previous + change                          │               │
//! │       │                                                │               │
//! │       ├── new < 0 ──► NegativeStock (nothing written)  │               │
//! │       │                                                │               │
//! │       ▼                                                │               │
//! │  stock_quantity = new ; append StockMovement           │               │
//! │  unlock item ◄─────────────────────────────────────────┘               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`StockMovement::plan`] is the pure half of this: every ledger
//! implementation (the in-memory one here, the SQLite one in kasir-db)
//! runs its read-check-write around it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::ident::Clock;
use crate::types::{Item, MovementType, StockAdjustment, StockMovement};
use crate::validation;

// =============================================================================
// Movement Request
// =============================================================================

/// A requested stock change, before it is checked against current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRequest {
    pub item_id: String,
    pub movement_type: MovementType,
    /// Signed change in base units.
    pub quantity_change: i64,
    pub reason: String,
    /// User id of whoever caused the movement.
    pub actor: String,
    /// Originating line item, for sales.
    pub transaction_item_id: Option<String>,
}

impl MovementRequest {
    /// Incoming goods.
    pub fn restock(item_id: &str, quantity: i64, reason: &str, actor: &str) -> Self {
        MovementRequest {
            item_id: item_id.to_string(),
            movement_type: MovementType::Restock,
            quantity_change: quantity,
            reason: reason.to_string(),
            actor: actor.to_string(),
            transaction_item_id: None,
        }
    }

    /// Manual correction by a signed delta.
    pub fn adjustment(item_id: &str, delta: i64, reason: &str, actor: &str) -> Self {
        MovementRequest {
            item_id: item_id.to_string(),
            movement_type: MovementType::Adjustment,
            quantity_change: delta,
            reason: reason.to_string(),
            actor: actor.to_string(),
            transaction_item_id: None,
        }
    }
}

impl StockMovement {
    /// Checks `request` against the item's current stock and builds the
    /// ledger entry that applying it would produce.
    ///
    /// Pure: nothing is written.
    ///
    /// ## Errors
    /// - `InvalidQuantity` for a zero change, or a sign the movement type
    ///   does not allow (sales must be negative, restocks positive)
    /// - `NegativeStock` if the result would drop below zero
    pub fn plan(item: &Item, request: &MovementRequest, at: DateTime<Utc>) -> CoreResult<Self> {
        let change = request.quantity_change;
        if !request.movement_type.accepts(change) {
            return Err(CoreError::InvalidQuantity { quantity: change });
        }
        validation::validate_reason(&request.reason)?;

        let previous = item.stock_quantity;
        let new_stock = item
            .stock_after(change)
            .ok_or(CoreError::InvalidQuantity { quantity: change })?;

        if new_stock < 0 {
            return Err(CoreError::NegativeStock {
                item_id: item.id.clone(),
                current: previous,
                change,
            });
        }

        Ok(StockMovement::from_parts(
            &item.id,
            request.transaction_item_id.clone(),
            request.movement_type,
            change,
            previous,
            new_stock,
            request.reason.clone(),
            at,
            request.actor.clone(),
        ))
    }
}

// =============================================================================
// Ledger Trait
// =============================================================================

/// Authoritative stock mutation.
///
/// Implementations serialize read-check-write per item, either with a lock
/// held across the three steps or with a compare-and-swap and retry.
pub trait StockLedger: Send + Sync {
    /// Applies one movement. On error the item and ledger are unchanged.
    fn apply_movement(&self, request: MovementRequest) -> CoreResult<StockMovement>;
}

// =============================================================================
// In-Memory Ledger
// =============================================================================

/// Stock ledger held in memory, one mutex per item.
///
/// Movements for different items never contend; movements for the same
/// item run one at a time.
pub struct MemoryStockLedger {
    items: RwLock<HashMap<String, Arc<Mutex<Item>>>>,
    entries: Mutex<Vec<StockMovement>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStockLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        MemoryStockLedger {
            items: RwLock::new(HashMap::new()),
            entries: Mutex::new(Vec::new()),
            clock,
        }
    }

    /// Registers an item. Replaces any item with the same id.
    pub fn insert(&self, item: Item) {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.insert(item.id.clone(), Arc::new(Mutex::new(item)));
    }

    /// Snapshot of an item.
    pub fn item(&self, item_id: &str) -> Option<Item> {
        self.slot(item_id)
            .map(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    /// Every ledger entry, in application order.
    pub fn entries(&self) -> Vec<StockMovement> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Ledger entries for one item, in application order.
    pub fn entries_for(&self, item_id: &str) -> Vec<StockMovement> {
        self.entries()
            .into_iter()
            .filter(|m| m.item_id() == item_id)
            .collect()
    }

    /// Adds received goods.
    pub fn restock(
        &self,
        item_id: &str,
        quantity: i64,
        reason: &str,
        actor: &str,
    ) -> CoreResult<StockMovement> {
        self.apply_movement(MovementRequest::restock(item_id, quantity, reason, actor))
    }

    /// Sets stock to an absolute level.
    ///
    /// The delta is computed under the item lock, so a concurrent sale
    /// cannot slip between the read and the write.
    pub fn set_stock(&self, adjustment: &StockAdjustment, actor: &str) -> CoreResult<StockMovement> {
        validation::validate_stock_level("new_quantity", adjustment.new_quantity)?;

        let slot = self
            .slot(&adjustment.item_id)
            .ok_or_else(|| CoreError::ItemNotFound(adjustment.item_id.clone()))?;
        let mut item = slot.lock().unwrap_or_else(PoisonError::into_inner);

        let request = MovementRequest::adjustment(
            &adjustment.item_id,
            adjustment.new_quantity - item.stock_quantity,
            &adjustment.reason,
            actor,
        );
        self.apply_locked(&mut item, request)
    }

    fn slot(&self, item_id: &str) -> Option<Arc<Mutex<Item>>> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(item_id)
            .cloned()
    }

    /// Check, write and append while the caller holds the item lock.
    fn apply_locked(&self, item: &mut Item, request: MovementRequest) -> CoreResult<StockMovement> {
        let now = self.clock.now();
        let movement = match StockMovement::plan(item, &request, now) {
            Ok(movement) => movement,
            Err(e) => {
                warn!(
                    item_id = %request.item_id,
                    change = request.quantity_change,
                    stock = item.stock_quantity,
                    error = %e,
                    "Stock movement rejected"
                );
                return Err(e);
            }
        };

        item.stock_quantity = movement.new_stock();
        item.updated_at = now;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(movement.clone());

        debug!(
            item_id = %item.id,
            movement_type = ?movement.movement_type(),
            previous = movement.previous_stock(),
            new = movement.new_stock(),
            "Stock movement applied"
        );
        Ok(movement)
    }
}

impl StockLedger for MemoryStockLedger {
    fn apply_movement(&self, request: MovementRequest) -> CoreResult<StockMovement> {
        let slot = self
            .slot(&request.item_id)
            .ok_or_else(|| CoreError::ItemNotFound(request.item_id.clone()))?;
        let mut item = slot.lock().unwrap_or_else(PoisonError::into_inner);
        self.apply_locked(&mut item, request)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
