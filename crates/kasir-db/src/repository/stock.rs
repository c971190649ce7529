//! # Stock Ledger Persistence
//!
//! Append-only `stock_movements` plus the compare-and-swap write that keeps
//! `items.stock_quantity` in step with them.
//!
//! ## Compare-and-Swap Debit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  loop attempt in 1..=max_attempts                                      │
//! │    SELECT item, version          (stock = 10, version = 7)             │
//! │    StockMovement::plan(..)       (10 - 5 = 5, rejects negatives)       │
//! │    UPDATE items SET stock = 5, version = 8                             │
//! │      WHERE id = ? AND version = 7                                      │
//! │    rows_affected == 1 ──► INSERT movement, done                        │
//! │    rows_affected == 0 ──► someone else wrote first, re-read            │
//! │  exhausted ──► DbError::StockConflict                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two cashiers selling the last unit both read version 7; only one UPDATE
//! matches, the other re-reads stock 0 and fails with `NegativeStock`.
//!
//! Callers run the loop inside `Database::begin_write`, which holds the
//! SQLite write lock, so concurrent writers queue on the busy timeout and
//! then read the committed version.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use super::item;
use crate::error::{DbError, DbResult};
use kasir_core::ledger::MovementRequest;
use kasir_core::{CoreError, CoreResult, Item, StockMovement};

const MOVEMENT_COLUMNS: &str = "id, item_id, transaction_item_id, movement_type, \
     quantity_change, previous_stock, new_stock, reason, created_at, created_by";

/// Read access to the stock ledger.
#[derive(Debug, Clone)]
pub struct StockMovementRepository {
    pool: SqlitePool,
}

impl StockMovementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockMovementRepository { pool }
    }

    /// Movements of one item, oldest first.
    pub async fn for_item(&self, item_id: &str) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE item_id = ?1 ORDER BY created_at, rowid"
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(item_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(movements)
    }

    /// Sale movements of a transaction, in line order.
    pub async fn for_transaction(&self, transaction_id: &str) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {cols} FROM stock_movements m \
             JOIN transaction_items ti ON ti.id = m.transaction_item_id \
             WHERE ti.transaction_id = ?1 ORDER BY m.rowid",
            cols = prefixed("m", MOVEMENT_COLUMNS)
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(transaction_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(movements)
    }

    /// Sum of every `quantity_change` recorded for an item.
    ///
    /// For an item created with zero stock this equals its current stock.
    pub async fn net_change(&self, item_id: &str) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity_change), 0) FROM stock_movements WHERE item_id = ?1",
        )
        .bind(item_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_movements")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn prefixed(alias: &str, columns: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Ledger Writes (inside a caller's transaction)
// =============================================================================

/// Applies one movement request with compare-and-swap on `items.version`.
pub(crate) async fn apply_movement(
    conn: &mut SqliteConnection,
    request: &MovementRequest,
    at: DateTime<Utc>,
    max_attempts: u32,
) -> DbResult<StockMovement> {
    apply_with(conn, &request.item_id, at, max_attempts, |_| Ok(request.clone())).await
}

/// Compare-and-swap loop where the request is derived from the item as
/// read on each attempt. Used for absolute adjustments, whose delta
/// depends on the stock at write time.
pub(crate) async fn apply_with<F>(
    conn: &mut SqliteConnection,
    item_id: &str,
    at: DateTime<Utc>,
    max_attempts: u32,
    build: F,
) -> DbResult<StockMovement>
where
    F: Fn(&Item) -> CoreResult<MovementRequest>,
{
    for attempt in 1..=max_attempts {
        let current = item::fetch_versioned(conn, item_id)
            .await?
            .ok_or_else(|| CoreError::ItemNotFound(item_id.to_string()))?;

        let request = build(&current.item)?;
        let movement = StockMovement::plan(&current.item, &request, at)?;

        let result = sqlx::query(
            r#"
            UPDATE items
            SET stock_quantity = ?1, version = version + 1, updated_at = ?2
            WHERE id = ?3 AND version = ?4
            "#,
        )
        .bind(movement.new_stock())
        .bind(at)
        .bind(item_id)
        .bind(current.version)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 1 {
            insert_movement(conn, &movement).await?;
            debug!(
                item_id = %item_id,
                movement_type = ?movement.movement_type(),
                change = movement.quantity_change(),
                new_stock = movement.new_stock(),
                "Stock movement recorded"
            );
            return Ok(movement);
        }

        warn!(
            item_id = %item_id,
            attempt,
            version = current.version,
            "Stock version changed underneath, retrying"
        );
    }

    Err(DbError::StockConflict {
        item_id: item_id.to_string(),
        attempts: max_attempts,
    })
}

async fn insert_movement(conn: &mut SqliteConnection, movement: &StockMovement) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, item_id, transaction_item_id, movement_type, quantity_change,
            previous_stock, new_stock, reason, created_at, created_by
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(movement.id())
    .bind(movement.item_id())
    .bind(movement.transaction_item_id())
    .bind(movement.movement_type())
    .bind(movement.quantity_change())
    .bind(movement.previous_stock())
    .bind(movement.new_stock())
    .bind(movement.reason())
    .bind(movement.created_at())
    .bind(movement.created_by())
    .execute(&mut *conn)
    .await?;
    Ok(())
}
