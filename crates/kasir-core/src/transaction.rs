//! # Transaction Aggregator
//!
//! A sale in progress and its lifecycle.
//!
//! ## State Machine
//! ```text
//!                 add_line / finalize / set_notes / renumber
//!                          ┌────────┐
//!                          ▼        │
//!   open() ──────────► ┌─────────┐ ─┘
//!                      │ Pending │
//!                      └────┬────┘
//!            commit()       │        cancel()
//!        ┌──────────────────┴──────────────────┐
//!        ▼                                     ▼
//!  ┌───────────┐                         ┌───────────┐
//!  │ Completed │  (terminal, stock moved) │ Cancelled │  (terminal)
//!  └───────────┘                         └───────────┘
//! ```
//!
//! ## Commit Atomicity
//! `commit` applies one Sale movement per line, in order. If line N fails,
//! lines 1..N-1 stay debited in the ledger and the transaction stays
//! `Pending`. All-or-nothing across lines is the job of a persistence unit
//! of work: kasir-db's checkout runs [`Transaction::pending_debits`] inside
//! one SQLite transaction and then calls [`Transaction::complete`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::ident::{Clock, IdGenerator};
use crate::ledger::{MovementRequest, StockLedger};
use crate::money::Money;
use crate::pricing::{self, Totals};
use crate::types::{Item, LineItem, MovementType, StockMovement, TransactionStatus, UnitMode};
use crate::validation;

// =============================================================================
// Transaction Record
// =============================================================================

/// The persisted header of a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransactionRecord {
    pub id: String,
    pub transaction_number: String,
    /// Cashier who rang the sale.
    pub user_id: String,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
    pub payment_amount: Money,
    pub change_amount: Money,
    pub status: TransactionStatus,
    pub notes: String,
    /// When the sale was rung up.
    pub transaction_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn totals(&self) -> Totals {
        Totals {
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            discount_amount: self.discount_amount,
            total_amount: self.total_amount,
            payment_amount: self.payment_amount,
            change_amount: self.change_amount,
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A transaction with its lines.
///
/// Every mutation either succeeds completely or leaves the transaction as
/// it was. Timestamps (`updated_at`, line `created_at`) come from the clock
/// the transaction was opened or restored with.
#[derive(Debug, Clone)]
pub struct Transaction {
    record: TransactionRecord,
    lines: Vec<LineItem>,
    finalized: bool,
    clock: Arc<dyn Clock>,
}

impl Transaction {
    /// Starts an empty `Pending` transaction for `user_id`.
    pub fn open(user_id: &str, ids: &dyn IdGenerator, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        let record = TransactionRecord {
            id: Uuid::new_v4().to_string(),
            transaction_number: ids.transaction_number(now),
            user_id: user_id.to_string(),
            subtotal: Money::zero(),
            tax_amount: Money::zero(),
            discount_amount: Money::zero(),
            total_amount: Money::zero(),
            payment_amount: Money::zero(),
            change_amount: Money::zero(),
            status: TransactionStatus::Pending,
            notes: String::new(),
            transaction_date: now,
            created_at: now,
            updated_at: now,
        };

        debug!(transaction_number = %record.transaction_number, "Transaction opened");
        Transaction {
            record,
            lines: Vec::new(),
            finalized: false,
            clock,
        }
    }

    /// Rebuilds a transaction from persisted state, checking that the stored
    /// totals agree with the stored lines.
    ///
    /// Totals are checked for `Completed` transactions only; a sale that was
    /// held and then cancelled may never have been finalized. A restored
    /// `Pending` transaction must be finalized again before it can be
    /// committed.
    pub fn restore(record: TransactionRecord, lines: Vec<LineItem>, clock: Arc<dyn Clock>) -> CoreResult<Self> {
        let txn = Transaction {
            record,
            lines,
            finalized: false,
            clock,
        };

        if let Some(line) = txn
            .lines
            .iter()
            .find(|l| l.transaction_id() != txn.record.id || !l.is_consistent())
        {
            return Err(txn.corrupt("lines", format!("line {} does not belong or add up", line.id())));
        }

        let record = &txn.record;
        if pricing::subtotal(&txn.lines)? != record.subtotal {
            return Err(txn.corrupt("subtotal", format!("{} is not the sum of its lines", record.subtotal)));
        }

        // Only a completed sale is guaranteed to have been finalized.
        if record.status == TransactionStatus::Completed {
            let total = record
                .subtotal
                .checked_add(record.tax_amount)
                .and_then(|gross| gross.checked_sub(record.discount_amount));
            if total != Some(record.total_amount) {
                return Err(txn.corrupt("total_amount", format!("{} does not add up", record.total_amount)));
            }
            let change = record
                .payment_amount
                .checked_sub(record.total_amount)
                .map(Money::clamp_to_zero);
            if change != Some(record.change_amount) {
                return Err(txn.corrupt("change_amount", format!("{} does not add up", record.change_amount)));
            }
        }

        Ok(txn)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn record(&self) -> &TransactionRecord {
        &self.record
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn number(&self) -> &str {
        &self.record.transaction_number
    }

    pub fn status(&self) -> TransactionStatus {
        self.record.status
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn subtotal(&self) -> Money {
        self.record.subtotal
    }

    /// True once `finalize` has succeeded and no line was added since.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn into_parts(self) -> (TransactionRecord, Vec<LineItem>) {
        (self.record, self.lines)
    }

    // -------------------------------------------------------------------------
    // Pending Operations
    // -------------------------------------------------------------------------

    /// Prices and appends a line, then recomputes the subtotal from scratch.
    ///
    /// Adding a line after `finalize` invalidates the finalized totals.
    pub fn add_line(&mut self, item: &Item, quantity: i64, unit: UnitMode) -> CoreResult<&LineItem> {
        self.require_pending("add line")?;

        let line = pricing::price_line(&self.record.id, item, quantity, unit, self.clock.now())?;
        let index = self.lines.len();
        self.lines.push(line);

        match pricing::subtotal(&self.lines) {
            Ok(subtotal) => self.record.subtotal = subtotal,
            Err(e) => {
                self.lines.pop();
                return Err(e);
            }
        }
        self.finalized = false;
        self.touch();

        debug!(
            transaction_number = %self.record.transaction_number,
            item_id = %item.id,
            quantity,
            unit = ?unit,
            subtotal = %self.record.subtotal,
            "Line added"
        );
        Ok(&self.lines[index])
    }

    /// Sets tax, discount and payment and computes the total and change.
    ///
    /// Status does not change. On error nothing is written.
    pub fn finalize(&mut self, tax_amount: Money, discount_amount: Money, payment_amount: Money) -> CoreResult<Totals> {
        self.require_pending("finalize")?;
        if self.lines.is_empty() {
            return Err(CoreError::EmptyTransaction(self.record.transaction_number.clone()));
        }

        let totals = Totals::compute(
            pricing::subtotal(&self.lines)?,
            tax_amount,
            discount_amount,
            payment_amount,
        )?;

        self.record.subtotal = totals.subtotal;
        self.record.tax_amount = totals.tax_amount;
        self.record.discount_amount = totals.discount_amount;
        self.record.total_amount = totals.total_amount;
        self.record.payment_amount = totals.payment_amount;
        self.record.change_amount = totals.change_amount;
        self.finalized = true;
        self.touch();

        Ok(totals)
    }

    pub fn set_notes(&mut self, notes: &str) -> CoreResult<()> {
        self.require_pending("edit notes")?;
        validation::validate_notes(notes)?;
        self.record.notes = notes.trim().to_string();
        self.touch();
        Ok(())
    }

    /// Draws a fresh transaction number after a uniqueness collision.
    pub fn renumber(&mut self, ids: &dyn IdGenerator) -> CoreResult<()> {
        self.require_pending("renumber")?;
        let previous = std::mem::replace(
            &mut self.record.transaction_number,
            ids.transaction_number(self.clock.now()),
        );
        debug!(
            previous = %previous,
            transaction_number = %self.record.transaction_number,
            "Transaction renumbered"
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Commit
    // -------------------------------------------------------------------------

    /// The Sale movements `commit` would apply, one per line, in line order.
    pub fn pending_debits(&self) -> CoreResult<Vec<MovementRequest>> {
        self.require_pending("commit")?;
        if self.lines.is_empty() {
            return Err(CoreError::EmptyTransaction(self.record.transaction_number.clone()));
        }
        if !self.finalized {
            return Err(self.invalid_transition("commit before finalize"));
        }

        let reason = format!("Sale {}", self.record.transaction_number);
        Ok(self
            .lines
            .iter()
            .map(|line| MovementRequest {
                item_id: line.item_id().to_string(),
                movement_type: MovementType::Sale,
                quantity_change: -line.ecer_quantity(),
                reason: reason.clone(),
                actor: self.record.user_id.clone(),
                transaction_item_id: Some(line.id().to_string()),
            })
            .collect())
    }

    /// Debits stock for every line through `ledger`, then completes.
    ///
    /// If a debit fails the transaction stays `Pending` and debits already
    /// applied for earlier lines are not reversed.
    pub fn commit(&mut self, ledger: &dyn StockLedger) -> CoreResult<Vec<StockMovement>> {
        let debits = self.pending_debits()?;

        let mut movements = Vec::with_capacity(debits.len());
        for request in debits {
            match ledger.apply_movement(request) {
                Ok(movement) => movements.push(movement),
                Err(e) => {
                    warn!(
                        transaction_number = %self.record.transaction_number,
                        applied = movements.len(),
                        error = %e,
                        "Commit aborted"
                    );
                    return Err(e);
                }
            }
        }

        self.complete(&movements)?;
        Ok(movements)
    }

    /// Marks the transaction `Completed` given the movements that debited it.
    ///
    /// `movements` must hold exactly one Sale movement per line, in line
    /// order, each debiting that line's `ecer_quantity`.
    pub fn complete(&mut self, movements: &[StockMovement]) -> CoreResult<()> {
        let expected = self.pending_debits()?;

        if movements.len() != expected.len() {
            return Err(self.mismatch(format!(
                "expected {} movements, got {}",
                expected.len(),
                movements.len()
            )));
        }

        for (want, got) in expected.iter().zip(movements) {
            if got.item_id() != want.item_id
                || got.movement_type() != MovementType::Sale
                || got.quantity_change() != want.quantity_change
                || got.transaction_item_id() != want.transaction_item_id.as_deref()
            {
                return Err(self.mismatch(format!(
                    "movement {} does not debit line {:?}",
                    got.id(),
                    want.transaction_item_id
                )));
            }
        }

        if let Some(line) = self.lines.iter().find(|l| !l.is_consistent()) {
            return Err(self.mismatch(format!("line {} is inconsistent", line.id())));
        }

        self.record.status = TransactionStatus::Completed;
        self.touch();

        info!(
            transaction_number = %self.record.transaction_number,
            lines = self.lines.len(),
            total = %self.record.total_amount,
            "Transaction completed"
        );
        Ok(())
    }

    /// Abandons a `Pending` transaction. A completed sale cannot be
    /// cancelled; its stock has already moved.
    pub fn cancel(&mut self) -> CoreResult<()> {
        self.require_pending("cancel")?;
        self.record.status = TransactionStatus::Cancelled;
        self.touch();

        info!(transaction_number = %self.record.transaction_number, "Transaction cancelled");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn require_pending(&self, operation: &'static str) -> CoreResult<()> {
        if self.record.status != TransactionStatus::Pending {
            return Err(self.invalid_transition(operation));
        }
        Ok(())
    }

    fn invalid_transition(&self, operation: &'static str) -> CoreError {
        CoreError::InvalidStateTransition {
            transaction_number: self.record.transaction_number.clone(),
            status: self.record.status,
            operation,
        }
    }

    fn mismatch(&self, reason: String) -> CoreError {
        CoreError::LedgerMismatch {
            transaction_number: self.record.transaction_number.clone(),
            reason,
        }
    }

    fn corrupt(&self, field: &'static str, detail: String) -> CoreError {
        CoreError::InvalidAmount {
            field,
            reason: format!("transaction {}: {detail}", self.record.transaction_number),
        }
    }

    fn touch(&mut self) {
        self.record.updated_at = self.clock.now();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::tests::{fixed_instant, FixedClock, SequenceIds};
    use crate::ledger::MemoryStockLedger;
    use crate::types::tests::sample_item;
    use crate::types::NewItem;
    use std::sync::Arc;

    fn open() -> Transaction {
        Transaction::open("user-1", &SequenceIds::default(), Arc::new(FixedClock(fixed_instant())))
    }

    fn ledger(items: &[&Item]) -> MemoryStockLedger {
        let ledger = MemoryStockLedger::new(Arc::new(FixedClock(fixed_instant())));
        for item in items {
            ledger.insert((*item).clone());
        }
        ledger
    }

    /// Item priced so that one Grosir pack plus five Ecer units come to 15000.
    fn priced_item() -> Item {
        let input = NewItem {
            wholesale_selling_price: Money::from_cents(10_000),
            quantity_per_wholesale: 10,
            retail_selling_price: Money::from_cents(1_000),
            stock_quantity: 100,
            ..NewItem::named("Beras 5kg", "cat-sembako")
        };
        Item::new(input, "BERAS00005".into(), fixed_instant()).unwrap()
    }

    #[test]
    fn test_open_is_pending_and_numbered() {
        let txn = open();
        assert_eq!(txn.status(), TransactionStatus::Pending);
        assert_eq!(txn.number(), "TXN202601150930420001");
        assert!(txn.lines().is_empty());
        assert!(txn.subtotal().is_zero());
    }

    #[test]
    fn test_totals_scenario() {
        let item = priced_item();
        let mut txn = open();
        txn.add_line(&item, 1, UnitMode::Wholesale).unwrap();
        txn.add_line(&item, 5, UnitMode::Retail).unwrap();
        assert_eq!(txn.subtotal().cents(), 15_000);

        let totals = txn
            .finalize(
                Money::from_cents(1_500),
                Money::from_cents(500),
                Money::from_cents(17_000),
            )
            .unwrap();
        assert_eq!(totals.total_amount.cents(), 16_000);
        assert_eq!(totals.change_amount.cents(), 1_000);
        assert_eq!(txn.record().totals(), totals);
        assert_eq!(txn.status(), TransactionStatus::Pending);
    }

    #[test]
    fn test_underpayment_leaves_transaction_untouched() {
        let item = priced_item();
        let ledger = ledger(&[&item]);
        let mut txn = open();
        txn.add_line(&item, 1, UnitMode::Wholesale).unwrap();
        txn.add_line(&item, 5, UnitMode::Retail).unwrap();

        let err = txn
            .finalize(
                Money::from_cents(1_500),
                Money::from_cents(500),
                Money::from_cents(10_000),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidPayment { .. }));
        assert_eq!(txn.status(), TransactionStatus::Pending);
        assert!(!txn.is_finalized());
        assert!(txn.record().total_amount.is_zero());

        assert!(txn.commit(&ledger).is_err());
        assert!(ledger.entries().is_empty());
        assert_eq!(ledger.item(&item.id).unwrap().stock_quantity, 100);
    }

    #[test]
    fn test_failed_add_line_leaves_transaction_unchanged() {
        let item = sample_item();
        let mut txn = open();
        txn.add_line(&item, 1, UnitMode::Retail).unwrap();

        assert!(txn.add_line(&item, 3, UnitMode::Wholesale).is_err());
        assert!(txn.add_line(&item, 0, UnitMode::Retail).is_err());
        assert_eq!(txn.lines().len(), 1);
        assert_eq!(txn.subtotal().cents(), 1_000);
    }

    #[test]
    fn test_commit_debits_base_units() {
        let item = sample_item();
        let ledger = ledger(&[&item]);
        let mut txn = open();
        txn.add_line(&item, 1, UnitMode::Wholesale).unwrap();
        txn.finalize(Money::zero(), Money::zero(), Money::from_cents(5_000))
            .unwrap();

        let movements = txn.commit(&ledger).unwrap();
        assert_eq!(txn.status(), TransactionStatus::Completed);
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].quantity_change(), -5);
        assert_eq!(movements[0].created_by(), "user-1");
        assert_eq!(movements[0].reason(), format!("Sale {}", txn.number()));
        assert_eq!(ledger.item(&item.id).unwrap().stock_quantity, 5);
    }

    #[test]
    fn test_commit_requires_finalize() {
        let item = sample_item();
        let ledger = ledger(&[&item]);
        let mut txn = open();
        txn.add_line(&item, 1, UnitMode::Retail).unwrap();
        assert!(matches!(
            txn.commit(&ledger),
            Err(CoreError::InvalidStateTransition { .. })
        ));

        txn.finalize(Money::zero(), Money::zero(), Money::from_cents(1_000))
            .unwrap();
        txn.add_line(&item, 1, UnitMode::Retail).unwrap();
        assert!(!txn.is_finalized());
        assert!(txn.commit(&ledger).is_err());
    }

    #[test]
    fn test_empty_transaction() {
        let mut txn = open();
        assert!(matches!(
            txn.finalize(Money::zero(), Money::zero(), Money::zero()),
            Err(CoreError::EmptyTransaction(_))
        ));
    }

    /// Without a unit of work around it, a failed second line keeps the
    /// first line's debit.
    #[test]
    fn test_partial_commit_without_unit_of_work() {
        let item = sample_item();
        let ledger = ledger(&[&item]);
        let mut txn = open();
        txn.add_line(&item, 1, UnitMode::Wholesale).unwrap();
        txn.add_line(&item, 2, UnitMode::Wholesale).unwrap();
        txn.finalize(Money::zero(), Money::zero(), Money::from_cents(20_000))
            .unwrap();

        let err = txn.commit(&ledger).unwrap_err();
        assert!(matches!(err, CoreError::NegativeStock { current: 5, change: -10, .. }));
        assert_eq!(txn.status(), TransactionStatus::Pending);
        assert_eq!(ledger.item(&item.id).unwrap().stock_quantity, 5);
        assert_eq!(ledger.entries().len(), 1);
    }

    #[test]
    fn test_cancel_rules() {
        let item = sample_item();
        let ledger = ledger(&[&item]);

        let mut pending = open();
        pending.cancel().unwrap();
        assert_eq!(pending.status(), TransactionStatus::Cancelled);
        assert!(pending.add_line(&item, 1, UnitMode::Retail).is_err());
        assert!(pending.cancel().is_err());

        let mut done = open();
        done.add_line(&item, 2, UnitMode::Retail).unwrap();
        done.finalize(Money::zero(), Money::zero(), Money::from_cents(2_000))
            .unwrap();
        done.commit(&ledger).unwrap();

        let err = done.cancel().unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidStateTransition {
                status: TransactionStatus::Completed,
                operation: "cancel",
                ..
            }
        ));
        assert_eq!(done.status(), TransactionStatus::Completed);
        assert_eq!(ledger.item(&item.id).unwrap().stock_quantity, 8);
    }

    #[test]
    fn test_complete_rejects_mismatched_movements() {
        let item = sample_item();
        let other = sample_item();
        let ledger = ledger(&[&item, &other]);
        let mut txn = open();
        txn.add_line(&item, 1, UnitMode::Retail).unwrap();
        txn.finalize(Money::zero(), Money::zero(), Money::from_cents(1_000))
            .unwrap();

        assert!(matches!(txn.complete(&[]), Err(CoreError::LedgerMismatch { .. })));

        let stray = ledger
            .restock(&other.id, 1, "Supplier delivery", "admin")
            .unwrap();
        assert!(matches!(
            txn.complete(&[stray]),
            Err(CoreError::LedgerMismatch { .. })
        ));
        assert_eq!(txn.status(), TransactionStatus::Pending);
    }

    #[test]
    fn test_add_line_overflow_leaves_transaction_unchanged() {
        let mut item = sample_item();
        item.retail_selling_price = Money::from_cents(i64::MAX / 2 + 1);

        let mut txn = open();
        txn.add_line(&item, 1, UnitMode::Retail).unwrap();
        let err = txn.add_line(&item, 1, UnitMode::Retail).unwrap_err();

        assert!(matches!(err, CoreError::InvalidAmount { field: "subtotal", .. }));
        assert_eq!(txn.lines().len(), 1);
        assert_eq!(txn.subtotal(), item.retail_selling_price);
    }

    #[test]
    fn test_timestamps_come_from_clock() {
        let item = sample_item();
        let mut txn = open();
        txn.add_line(&item, 1, UnitMode::Retail).unwrap();
        txn.finalize(Money::zero(), Money::zero(), Money::from_cents(1_000)).unwrap();
        txn.cancel().unwrap();

        assert_eq!(txn.lines()[0].created_at(), fixed_instant());
        assert_eq!(txn.record().updated_at, fixed_instant());
    }

    #[test]
    fn test_restore_checks_totals() {
        let item = sample_item();
        let ledger = ledger(&[&item]);
        let mut txn = open();
        txn.add_line(&item, 2, UnitMode::Retail).unwrap();
        txn.finalize(Money::from_cents(200), Money::zero(), Money::from_cents(5_000))
            .unwrap();
        txn.commit(&ledger).unwrap();

        let (record, lines) = txn.into_parts();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(fixed_instant()));
        let restored = Transaction::restore(record.clone(), lines.clone(), clock.clone()).unwrap();
        assert_eq!(restored.status(), TransactionStatus::Completed);
        assert!(!restored.is_finalized());

        let tampered = TransactionRecord {
            change_amount: Money::zero(),
            ..record.clone()
        };
        assert!(matches!(
            Transaction::restore(tampered, lines.clone(), clock.clone()),
            Err(CoreError::InvalidAmount { field: "change_amount", .. })
        ));
        assert!(Transaction::restore(record, Vec::new(), clock).is_err());
    }

    #[test]
    fn test_renumber_and_notes() {
        let ids = SequenceIds::default();
        let mut txn = Transaction::open("user-1", &ids, Arc::new(FixedClock(fixed_instant())));
        let first = txn.number().to_string();

        txn.renumber(&ids).unwrap();
        assert_ne!(txn.number(), first);

        txn.set_notes("  Pelanggan tetap  ").unwrap();
        assert_eq!(txn.record().notes, "Pelanggan tetap");
        assert!(txn.set_notes(&"x".repeat(501)).is_err());

        txn.cancel().unwrap();
        assert!(txn.renumber(&ids).is_err());
    }
}
