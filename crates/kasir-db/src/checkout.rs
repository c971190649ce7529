//! # Checkout Unit of Work
//!
//! Persists a sale atomically: either the header, every line, every stock
//! debit and its ledger entry are written, or none of them are.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CheckoutRequest                                                       │
//! │       │  load items (pool)                                             │
//! │       ▼                                                                 │
//! │  Transaction::open ─► add_line* ─► set_notes ─► finalize               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                 │
//! │    INSERT transactions (Pending)   ◄── takes the SQLite write lock     │
//! │    INSERT transaction_items                                            │
//! │    per line: CAS debit items.stock_quantity + INSERT stock_movements   │
//! │    Transaction::complete                                               │
//! │    UPDATE transactions SET status = 'Completed'                        │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  any error ──► ROLLBACK (nothing persisted)                            │
//! │  UNIQUE(transaction_number) ──► ROLLBACK, renumber, try again          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A held sale is a `Pending` transaction stored without moving stock.
//! It is later settled with [`Database::checkout_held`] or abandoned with
//! [`Database::cancel_transaction`].

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use kasir_core::transaction::Transaction;
use kasir_core::{CoreError, Money, SaleLine, TransactionStatus};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::{stock, transaction};

const NUMBER_COLUMN: &str = "transaction_number";

/// What a checkout attempt writes.
#[derive(Debug, Clone, Copy)]
enum SaleWrite {
    /// Header, lines, stock debits, status `Completed`.
    Complete,
    /// Header and lines only, status `Pending`.
    Hold,
}

/// Everything a cashier submits at the till.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: String,
    pub lines: Vec<SaleLine>,
    #[serde(default)]
    pub tax_amount: Money,
    #[serde(default)]
    pub discount_amount: Money,
    pub payment_amount: Money,
    #[serde(default)]
    pub notes: String,
}

impl Database {
    /// Prices, persists and completes a sale in one database transaction.
    ///
    /// ## Errors
    /// - `Core(ItemNotFound | ItemInactive | InvalidQuantity | InsufficientStock)`
    ///   while pricing, before anything is written
    /// - `Core(InvalidPayment | InvalidAmount)` from finalize
    /// - `Core(NegativeStock)` if stock ran out between pricing and debit
    /// - `StockConflict` if a debit lost every compare-and-swap attempt
    /// - `Core(DuplicateIdentifier)` once transaction number retries run out
    pub async fn checkout(&self, request: &CheckoutRequest) -> DbResult<Transaction> {
        let mut txn = self.ring_up(request).await?;
        txn.finalize(
            request.tax_amount,
            request.discount_amount,
            request.payment_amount,
        )?;

        let completed = self.with_fresh_number(txn, SaleWrite::Complete).await?;

        info!(
            transaction_number = %completed.number(),
            lines = completed.lines().len(),
            total = %completed.record().total_amount,
            "Checkout completed"
        );
        Ok(completed)
    }

    /// Stores a priced sale as `Pending` without touching stock.
    pub async fn hold(&self, request: &CheckoutRequest) -> DbResult<Transaction> {
        let txn = self.ring_up(request).await?;
        if txn.lines().is_empty() {
            return Err(CoreError::EmptyTransaction(txn.number().to_string()).into());
        }

        let held = self.with_fresh_number(txn, SaleWrite::Hold).await?;

        info!(transaction_number = %held.number(), "Sale held");
        Ok(held)
    }

    /// Settles a held sale: finalize, debit stock, mark `Completed`.
    ///
    /// Line prices are the ones captured when the sale was held.
    pub async fn checkout_held(
        &self,
        transaction_id: &str,
        tax_amount: Money,
        discount_amount: Money,
        payment_amount: Money,
    ) -> DbResult<Transaction> {
        let mut txn = self
            .transactions()
            .get(transaction_id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", transaction_id))?;

        txn.finalize(tax_amount, discount_amount, payment_amount)?;
        let debits = txn.pending_debits()?;

        let mut staged = txn.clone();
        let mut tx = self.begin_write().await?;

        let at = self.clock.now();
        let mut movements = Vec::with_capacity(debits.len());
        for request in &debits {
            let movement =
                stock::apply_movement(&mut tx, request, at, self.ledger.max_stock_retries).await?;
            movements.push(movement);
        }

        staged.complete(&movements)?;
        transaction::update_header(&mut tx, staged.record(), TransactionStatus::Pending).await?;
        tx.commit().await?;

        info!(transaction_number = %staged.number(), "Held sale completed");
        Ok(staged)
    }

    /// Abandons a `Pending` transaction.
    ///
    /// A `Completed` sale is rejected with `InvalidStateTransition`; its
    /// stock has already moved and is not reversed here.
    pub async fn cancel_transaction(&self, transaction_id: &str) -> DbResult<Transaction> {
        let mut txn = self
            .transactions()
            .get(transaction_id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", transaction_id))?;

        txn.cancel()?;

        let mut conn = self.pool().acquire().await?;
        transaction::update_header(&mut conn, txn.record(), TransactionStatus::Pending).await?;

        info!(transaction_number = %txn.number(), "Transaction cancelled");
        Ok(txn)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Opens a transaction and prices every requested line against the
    /// current catalog.
    async fn ring_up(&self, request: &CheckoutRequest) -> DbResult<Transaction> {
        let items = self.items();
        let mut txn = Transaction::open(&request.user_id, self.ids.as_ref(), self.clock.clone());

        for line in &request.lines {
            let item = items
                .get_by_id(&line.item_id)
                .await?
                .ok_or_else(|| CoreError::ItemNotFound(line.item_id.clone()))?;
            txn.add_line(&item, line.quantity, line.unit_mode)?;
        }

        if !request.notes.trim().is_empty() {
            txn.set_notes(&request.notes)?;
        }
        Ok(txn)
    }

    /// Runs `write` and, while it fails on a taken transaction number,
    /// draws a new number and runs it again.
    async fn with_fresh_number(&self, mut txn: Transaction, write: SaleWrite) -> DbResult<Transaction> {
        let mut renumbered = 0;
        loop {
            let attempt = match write {
                SaleWrite::Complete => self.commit_new_sale(&txn).await,
                SaleWrite::Hold => self.insert_pending(&txn).await,
            };
            match attempt {
                Ok(written) => return Ok(written),
                Err(e) if e.is_unique_violation_on(NUMBER_COLUMN) => {
                    if renumbered >= self.ledger.max_id_retries {
                        return Err(CoreError::DuplicateIdentifier {
                            field: NUMBER_COLUMN.to_string(),
                            value: txn.number().to_string(),
                        }
                        .into());
                    }
                    renumbered += 1;
                    warn!(
                        transaction_number = %txn.number(),
                        attempt = renumbered,
                        "Transaction number taken, renumbering"
                    );
                    txn.renumber(self.ids.as_ref())?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One attempt at persisting and completing a finalized sale.
    ///
    /// Works on a copy so a failed attempt leaves `txn` `Pending`.
    async fn commit_new_sale(&self, txn: &Transaction) -> DbResult<Transaction> {
        let debits = txn.pending_debits()?;
        let mut staged = txn.clone();

        // Dropping `tx` on any early return rolls everything back.
        let mut tx = self.begin_write().await?;

        transaction::insert_header(&mut tx, txn.record()).await?;
        for line in txn.lines() {
            transaction::insert_line(&mut tx, line).await?;
        }

        let at = self.clock.now();
        let mut movements = Vec::with_capacity(debits.len());
        for request in &debits {
            let movement =
                stock::apply_movement(&mut tx, request, at, self.ledger.max_stock_retries).await?;
            movements.push(movement);
        }

        staged.complete(&movements)?;
        transaction::update_header(&mut tx, staged.record(), TransactionStatus::Pending).await?;

        tx.commit().await?;
        Ok(staged)
    }

    async fn insert_pending(&self, txn: &Transaction) -> DbResult<Transaction> {
        let mut tx = self.begin_write().await?;
        transaction::insert_header(&mut tx, txn.record()).await?;
        for line in txn.lines() {
            transaction::insert_line(&mut tx, line).await?;
        }
        tx.commit().await?;
        Ok(txn.clone())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, Fixture, RepeatingIds};
    use kasir_core::{StockAdjustment, UnitMode};
    use std::sync::Arc;

    fn sale(fx: &Fixture, quantity: i64, unit_mode: UnitMode, payment: i64) -> CheckoutRequest {
        CheckoutRequest {
            user_id: fx.cashier.id.clone(),
            lines: vec![SaleLine {
                item_id: fx.indomie.id.clone(),
                quantity,
                unit_mode,
            }],
            payment_amount: Money::from_cents(payment),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_wholesale_checkout_debits_base_units() {
        let fx = testing::fixture().await;

        let txn = fx.db.checkout(&sale(&fx, 1, UnitMode::Wholesale, 5_000)).await.unwrap();

        assert_eq!(txn.status(), TransactionStatus::Completed);
        assert_eq!(txn.lines()[0].ecer_quantity(), 5);
        assert_eq!(txn.record().total_amount.cents(), 4_500);
        assert_eq!(txn.record().change_amount.cents(), 500);

        let item = fx.db.items().get_by_id(&fx.indomie.id).await.unwrap().unwrap();
        assert_eq!(item.stock_quantity, 5);

        let movements = fx.db.stock_movements().for_transaction(txn.id()).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].previous_stock(), 10);
        assert_eq!(movements[0].new_stock(), 5);
        assert_eq!(movements[0].quantity_change(), -5);
        assert_eq!(movements[0].transaction_item_id(), Some(txn.lines()[0].id()));
        assert_eq!(movements[0].created_by(), fx.cashier.id);

        let stored = fx.db.transactions().get(txn.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), TransactionStatus::Completed);
        assert_eq!(stored.record(), txn.record());
    }

    #[tokio::test]
    async fn test_oversell_is_rejected_before_writing() {
        let fx = testing::fixture().await;

        let err = fx
            .db
            .checkout(&sale(&fx, 3, UnitMode::Wholesale, 100_000))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { available: 10, requested: 15, .. })
        ));
        assert_eq!(fx.db.transactions().count().await.unwrap(), 0);
        assert_eq!(fx.stock_of(&fx.indomie.id).await, 10);
    }

    #[tokio::test]
    async fn test_failed_line_rolls_back_whole_sale() {
        let fx = testing::fixture().await;

        // Priced while stock was 10, then stock drops under the second line.
        let mut request = sale(&fx, 4, UnitMode::Retail, 100_000);
        request.lines.push(SaleLine {
            item_id: fx.indomie.id.clone(),
            quantity: 4,
            unit_mode: UnitMode::Retail,
        });
        let mut txn = fx.db.ring_up(&request).await.unwrap();
        txn.finalize(Money::zero(), Money::zero(), request.payment_amount).unwrap();

        fx.db
            .adjust_stock(
                &StockAdjustment {
                    item_id: fx.indomie.id.clone(),
                    new_quantity: 6,
                    reason: "Damaged".to_string(),
                },
                &fx.admin.id,
            )
            .await
            .unwrap();

        let err = fx.db.commit_new_sale(&txn).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::NegativeStock { current: 2, change: -4, .. })));

        // First line's debit was rolled back with everything else.
        assert_eq!(fx.stock_of(&fx.indomie.id).await, 6);
        assert_eq!(fx.db.transactions().count().await.unwrap(), 0);
        assert!(fx.db.stock_movements().for_transaction(txn.id()).await.unwrap().is_empty());
        assert_eq!(txn.status(), TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn test_totals_with_tax_and_discount() {
        let fx = testing::fixture().await;

        let mut request = sale(&fx, 2, UnitMode::Wholesale, 20_000);
        request.tax_amount = Money::from_cents(1_000);
        request.discount_amount = Money::from_cents(500);
        request.notes = "Pelanggan tetap".to_string();

        let txn = fx.db.checkout(&request).await.unwrap();
        let record = txn.record();
        assert_eq!(record.subtotal.cents(), 9_000);
        assert_eq!(record.total_amount.cents(), 9_500);
        assert_eq!(record.change_amount.cents(), 10_500);
        assert_eq!(record.notes, "Pelanggan tetap");
        assert_eq!(fx.stock_of(&fx.indomie.id).await, 0);
    }

    #[tokio::test]
    async fn test_underpayment_writes_nothing() {
        let fx = testing::fixture().await;

        let err = fx.db.checkout(&sale(&fx, 2, UnitMode::Retail, 1_500)).await.unwrap_err();

        assert!(matches!(err, DbError::Core(CoreError::InvalidPayment { .. })));
        assert_eq!(fx.db.transactions().count().await.unwrap(), 0);
        assert_eq!(fx.stock_of(&fx.indomie.id).await, 10);
    }

    #[tokio::test]
    async fn test_unknown_item() {
        let fx = testing::fixture().await;
        let mut request = sale(&fx, 1, UnitMode::Retail, 1_000);
        request.lines[0].item_id = "missing".to_string();

        let err = fx.db.checkout(&request).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::ItemNotFound(id)) if id == "missing"));
    }

    #[tokio::test]
    async fn test_taken_number_is_regenerated() {
        let ids = Arc::new(RepeatingIds::new(&["TXN202601150930420001", "TXN202601150930420001", "TXN202601150930420002"]));
        let fx = testing::fixture_with_ids(ids).await;

        let first = fx.db.checkout(&sale(&fx, 1, UnitMode::Retail, 1_000)).await.unwrap();
        let second = fx.db.checkout(&sale(&fx, 1, UnitMode::Retail, 1_000)).await.unwrap();

        assert_eq!(first.number(), "TXN202601150930420001");
        assert_eq!(second.number(), "TXN202601150930420002");
        assert_eq!(fx.db.transactions().count().await.unwrap(), 2);
        assert_eq!(fx.stock_of(&fx.indomie.id).await, 8);
    }

    #[tokio::test]
    async fn test_number_retries_exhausted() {
        let ids = Arc::new(RepeatingIds::new(&["TXN202601150930420001"]));
        let fx = testing::fixture_with_ids(ids).await;

        fx.db.checkout(&sale(&fx, 1, UnitMode::Retail, 1_000)).await.unwrap();
        let err = fx.db.checkout(&sale(&fx, 1, UnitMode::Retail, 1_000)).await.unwrap_err();

        assert!(err.is_retryable());
        assert!(matches!(err, DbError::Core(CoreError::DuplicateIdentifier { .. })));
        assert_eq!(fx.stock_of(&fx.indomie.id).await, 9);
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_never_oversell() {
        let fx = testing::fixture().await;

        // Each sale alone fits; together they need 12 of 10.
        let a = sale(&fx, 6, UnitMode::Retail, 10_000);
        let b = sale(&fx, 6, UnitMode::Retail, 10_000);
        let (ra, rb) = tokio::join!(fx.db.checkout(&a), fx.db.checkout(&b));

        let successes = [ra.is_ok(), rb.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);

        let failure = ra.err().or(rb.err()).unwrap();
        assert!(matches!(
            failure,
            DbError::Core(CoreError::NegativeStock { .. } | CoreError::InsufficientStock { .. })
        ));
        assert_eq!(fx.stock_of(&fx.indomie.id).await, 4);
        assert_eq!(fx.db.stock_movements().net_change(&fx.indomie.id).await.unwrap(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_checkouts_on_file_database() {
        let (fx, _dir) = testing::file_fixture().await;

        // Five sales of 3 against 10 in stock: three fit, two must fail.
        let mut handles = Vec::new();
        for _ in 0..5 {
            let db = fx.db.clone();
            let request = sale(&fx, 3, UnitMode::Retail, 10_000);
            handles.push(tokio::spawn(async move { db.checkout(&request).await }));
        }

        let mut completed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(txn) => {
                    assert_eq!(txn.status(), TransactionStatus::Completed);
                    completed += 1;
                }
                Err(e) => assert!(
                    matches!(
                        e,
                        DbError::Core(CoreError::NegativeStock { .. } | CoreError::InsufficientStock { .. })
                    ),
                    "unexpected error: {e:?}"
                ),
            }
        }

        assert_eq!(completed, 3);
        assert_eq!(fx.stock_of(&fx.indomie.id).await, 1);
        assert_eq!(fx.db.stock_movements().net_change(&fx.indomie.id).await.unwrap(), 1);
        assert_eq!(fx.db.transactions().count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_hold_then_checkout() {
        let fx = testing::fixture().await;

        let held = fx.db.hold(&sale(&fx, 3, UnitMode::Retail, 0)).await.unwrap();
        assert_eq!(held.status(), TransactionStatus::Pending);
        assert_eq!(fx.stock_of(&fx.indomie.id).await, 10);

        let done = fx
            .db
            .checkout_held(held.id(), Money::zero(), Money::zero(), Money::from_cents(5_000))
            .await
            .unwrap();

        assert_eq!(done.status(), TransactionStatus::Completed);
        assert_eq!(done.record().change_amount.cents(), 2_000);
        assert_eq!(fx.stock_of(&fx.indomie.id).await, 7);

        let stored = fx.db.transactions().get(held.id()).await.unwrap().unwrap();
        assert_eq!(stored.record().payment_amount.cents(), 5_000);
    }

    #[tokio::test]
    async fn test_cancel_pending_and_reject_completed() {
        let fx = testing::fixture().await;

        let held = fx.db.hold(&sale(&fx, 1, UnitMode::Retail, 0)).await.unwrap();
        let cancelled = fx.db.cancel_transaction(held.id()).await.unwrap();
        assert_eq!(cancelled.status(), TransactionStatus::Cancelled);
        assert_eq!(fx.stock_of(&fx.indomie.id).await, 10);

        // Cancelled is terminal.
        let err = fx
            .db
            .checkout_held(held.id(), Money::zero(), Money::zero(), Money::from_cents(1_000))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidStateTransition { .. })));

        let done = fx.db.checkout(&sale(&fx, 1, UnitMode::Retail, 1_000)).await.unwrap();
        let err = fx.db.cancel_transaction(done.id()).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InvalidStateTransition { status: TransactionStatus::Completed, .. })
        ));
        assert_eq!(fx.stock_of(&fx.indomie.id).await, 9);
    }

    #[tokio::test]
    async fn test_cancel_unknown_transaction() {
        let fx = testing::fixture().await;
        let err = fx.db.cancel_transaction("nope").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_transaction_response() {
        let fx = testing::fixture().await;
        let txn = fx.db.checkout(&sale(&fx, 2, UnitMode::Retail, 2_000)).await.unwrap();

        let view = fx.db.transactions().response(txn.id()).await.unwrap().unwrap();
        assert_eq!(view.transaction_number, txn.number());
        assert_eq!(view.user_name.as_deref(), Some("Siti Kasir"));
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].item_name.as_deref(), Some("Indomie Goreng"));
    }
}
