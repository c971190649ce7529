//! # Inventory Operations
//!
//! Restock and manual adjustment, each a single ledger movement in its own
//! database transaction. Both go through the same compare-and-swap write
//! as checkout, so a sale running at the same time is never overwritten.

use tracing::info;

use kasir_core::ledger::MovementRequest;
use kasir_core::validation;
use kasir_core::{StockAdjustment, StockMovement};

use crate::error::DbResult;
use crate::pool::Database;
use crate::repository::stock;

impl Database {
    /// Records incoming goods. `quantity` is in base units and must be > 0.
    pub async fn restock(
        &self,
        item_id: &str,
        quantity: i64,
        reason: &str,
        actor: &str,
    ) -> DbResult<StockMovement> {
        let request = MovementRequest::restock(item_id, quantity, reason, actor);

        let mut tx = self.begin_write().await?;
        let movement =
            stock::apply_movement(&mut tx, &request, self.clock.now(), self.ledger.max_stock_retries)
                .await?;
        tx.commit().await?;

        info!(
            item_id = %item_id,
            quantity,
            new_stock = movement.new_stock(),
            "Item restocked"
        );
        Ok(movement)
    }

    /// Sets stock to an absolute level (stock take, damage, loss).
    ///
    /// The delta is computed from the stock read inside the compare-and-swap
    /// loop, so a sale committed in between is reflected in the recorded
    /// `quantity_change` rather than silently undone.
    pub async fn adjust_stock(
        &self,
        adjustment: &StockAdjustment,
        actor: &str,
    ) -> DbResult<StockMovement> {
        validation::validate_stock_level("new_quantity", adjustment.new_quantity)?;

        let mut tx = self.begin_write().await?;
        let movement = stock::apply_with(
            &mut tx,
            &adjustment.item_id,
            self.clock.now(),
            self.ledger.max_stock_retries,
            |item| {
                Ok(MovementRequest::adjustment(
                    &item.id,
                    adjustment.new_quantity - item.stock_quantity,
                    &adjustment.reason,
                    actor,
                ))
            },
        )
        .await?;
        tx.commit().await?;

        info!(
            item_id = %adjustment.item_id,
            previous_stock = movement.previous_stock(),
            new_stock = movement.new_stock(),
            "Stock adjusted"
        );
        Ok(movement)
    }
}
