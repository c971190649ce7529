//! # Transaction Repository
//!
//! Reads transactions back as [`Transaction`] aggregates. Every read goes
//! through [`Transaction::restore`], so a row whose totals no longer add up
//! is reported instead of returned.

use std::sync::Arc;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use kasir_core::ident::Clock;
use kasir_core::transaction::{Transaction, TransactionRecord};
use kasir_core::views::TransactionResponse;
use kasir_core::{LineItem, TransactionStatus};

use super::{ItemRepository, UserRepository};

const TRANSACTION_COLUMNS: &str = "id, transaction_number, user_id, subtotal, tax_amount, \
     discount_amount, total_amount, payment_amount, change_amount, status, notes, \
     transaction_date, created_at, updated_at";

const LINE_COLUMNS: &str = "id, transaction_id, item_id, quantity, unit_mode, unit_price, \
     total_price, ecer_quantity, created_at";

#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        TransactionRepository { pool, clock }
    }

    /// Loads a transaction and its lines.
    pub async fn get(&self, id: &str) -> DbResult<Option<Transaction>> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1");
        let record = sqlx::query_as::<_, TransactionRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match record {
            Some(record) => Ok(Some(self.hydrate(record).await?)),
            None => Ok(None),
        }
    }

    /// Receipt lookup by `TXN-...` number.
    pub async fn get_by_number(&self, number: &str) -> DbResult<Option<Transaction>> {
        let sql =
            format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE transaction_number = ?1");
        let record = sqlx::query_as::<_, TransactionRecord>(&sql)
            .bind(number.trim())
            .fetch_optional(&self.pool)
            .await?;

        match record {
            Some(record) => Ok(Some(self.hydrate(record).await?)),
            None => Ok(None),
        }
    }

    /// Most recent transactions first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<TransactionRecord>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             ORDER BY transaction_date DESC, rowid DESC LIMIT ?1"
        );
        let records = sqlx::query_as::<_, TransactionRecord>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    pub async fn list_by_status(&self, status: TransactionStatus) -> DbResult<Vec<TransactionRecord>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE status = ?1 ORDER BY transaction_date DESC"
        );
        let records = sqlx::query_as::<_, TransactionRecord>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    /// Lines of a transaction, in the order they were rung up.
    pub async fn lines(&self, transaction_id: &str) -> DbResult<Vec<LineItem>> {
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM transaction_items \
             WHERE transaction_id = ?1 ORDER BY rowid"
        );
        let lines = sqlx::query_as::<_, LineItem>(&sql)
            .bind(transaction_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(lines)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// The transaction with cashier name and per-line item names.
    pub async fn response(&self, id: &str) -> DbResult<Option<TransactionResponse>> {
        let Some(txn) = self.get(id).await? else {
            return Ok(None);
        };

        let user = UserRepository::new(self.pool.clone(), self.clock.clone())
            .get_by_id(&txn.record().user_id)
            .await?;

        let item_repo = ItemRepository::new(self.pool.clone(), self.clock.clone());
        let mut items = Vec::with_capacity(txn.lines().len());
        for line in txn.lines() {
            if items.iter().any(|i: &kasir_core::Item| i.id == line.item_id()) {
                continue;
            }
            if let Some(item) = item_repo.get_by_id(line.item_id()).await? {
                items.push(item);
            }
        }

        Ok(Some(TransactionResponse::project(&txn, user.as_ref(), &items)))
    }

    async fn hydrate(&self, record: TransactionRecord) -> DbResult<Transaction> {
        let lines = self.lines(&record.id).await?;
        debug!(
            transaction_number = %record.transaction_number,
            lines = lines.len(),
            "Transaction loaded"
        );
        Ok(Transaction::restore(record, lines, self.clock.clone())?)
    }
}

// =============================================================================
// Connection-level writes
// =============================================================================

pub(crate) async fn insert_header(
    conn: &mut SqliteConnection,
    record: &TransactionRecord,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, transaction_number, user_id,
            subtotal, tax_amount, discount_amount, total_amount,
            payment_amount, change_amount,
            status, notes, transaction_date, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(&record.id)
    .bind(&record.transaction_number)
    .bind(&record.user_id)
    .bind(record.subtotal)
    .bind(record.tax_amount)
    .bind(record.discount_amount)
    .bind(record.total_amount)
    .bind(record.payment_amount)
    .bind(record.change_amount)
    .bind(record.status)
    .bind(&record.notes)
    .bind(record.transaction_date)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn insert_line(conn: &mut SqliteConnection, line: &LineItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transaction_items (
            id, transaction_id, item_id, quantity, unit_mode,
            unit_price, total_price, ecer_quantity, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(line.id())
    .bind(line.transaction_id())
    .bind(line.item_id())
    .bind(line.quantity())
    .bind(line.unit_mode())
    .bind(line.unit_price())
    .bind(line.total_price())
    .bind(line.ecer_quantity())
    .bind(line.created_at())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Writes totals, notes and status, guarded on the status the caller
/// last saw.
///
/// Returns `NotFound` if the row is gone or another writer moved it first.
pub(crate) async fn update_header(
    conn: &mut SqliteConnection,
    record: &TransactionRecord,
    expected: TransactionStatus,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE transactions SET
            subtotal = ?1,
            tax_amount = ?2,
            discount_amount = ?3,
            total_amount = ?4,
            payment_amount = ?5,
            change_amount = ?6,
            notes = ?7,
            status = ?8,
            updated_at = ?9
        WHERE id = ?10 AND status = ?11
        "#,
    )
    .bind(record.subtotal)
    .bind(record.tax_amount)
    .bind(record.discount_amount)
    .bind(record.total_amount)
    .bind(record.payment_amount)
    .bind(record.change_amount)
    .bind(&record.notes)
    .bind(record.status)
    .bind(record.updated_at)
    .bind(&record.id)
    .bind(expected)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found(
            format!("{expected:?} transaction"),
            &record.id,
        ));
    }
    Ok(())
}
