//! # Pricing
//!
//! Line item calculator and transaction totals.
//!
//! ## Totals
//! ```text
//! subtotal      = Σ line.total_price
//! total_amount  = subtotal + tax_amount − discount_amount
//! change_amount = max(0, payment_amount − total_amount)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Item, LineItem, UnitMode};

/// Prices one line against an item snapshot.
///
/// The stock check here is advisory: the ledger re-checks at debit time.
///
/// ## Errors
/// - `InvalidQuantity` if `quantity <= 0`
/// - `ItemInactive` if the item is soft-deleted
/// - `InsufficientStock` if the item cannot fulfill the request right now
pub fn price_line(
    transaction_id: &str,
    item: &Item,
    quantity: i64,
    unit: UnitMode,
    at: DateTime<Utc>,
) -> CoreResult<LineItem> {
    let ecer_quantity = item.to_base_quantity(quantity, unit)?;

    if !item.is_active {
        return Err(CoreError::ItemInactive(item.barcode.clone()));
    }

    if !item.can_fulfill(quantity, unit) {
        return Err(CoreError::InsufficientStock {
            barcode: item.barcode.clone(),
            available: item.stock_quantity,
            requested: ecer_quantity,
        });
    }

    let unit_price = item.price_for(unit);
    let total_price = unit_price
        .checked_multiply_quantity(quantity)
        .ok_or(CoreError::InvalidQuantity { quantity })?;

    Ok(LineItem::new(
        transaction_id,
        &item.id,
        quantity,
        unit,
        unit_price,
        total_price,
        ecer_quantity,
        at,
    ))
}

/// Sum of line totals, recomputed from scratch.
///
/// ## Errors
/// - `InvalidAmount` if the sum does not fit in a `Money`
pub fn subtotal(lines: &[LineItem]) -> CoreResult<Money> {
    lines.iter().try_fold(Money::zero(), |acc, line| {
        acc.checked_add(line.total_price())
            .ok_or_else(|| overflow("subtotal", acc, line.total_price()))
    })
}

fn overflow(field: &'static str, a: Money, b: Money) -> CoreError {
    CoreError::InvalidAmount {
        field,
        reason: format!("{a} and {b} overflow"),
    }
}

/// Final monetary breakdown of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Totals {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
    pub payment_amount: Money,
    pub change_amount: Money,
}

impl Totals {
    /// Computes totals and checks the payment covers them.
    ///
    /// ## Example
    /// ```rust
    /// use kasir_core::money::Money;
    /// use kasir_core::pricing::Totals;
    ///
    /// let t = Totals::compute(
    ///     Money::from_cents(15_000),
    ///     Money::from_cents(1_500),
    ///     Money::from_cents(500),
    ///     Money::from_cents(17_000),
    /// ).unwrap();
    /// assert_eq!(t.total_amount.cents(), 16_000);
    /// assert_eq!(t.change_amount.cents(), 1_000);
    /// ```
    ///
    /// ## Errors
    /// - `InvalidAmount` for a negative subtotal, tax, discount or payment, a
    ///   discount larger than `subtotal + tax`, or amounts too large to add
    /// - `InvalidPayment` if `payment < total`
    pub fn compute(
        subtotal: Money,
        tax_amount: Money,
        discount_amount: Money,
        payment_amount: Money,
    ) -> CoreResult<Self> {
        for (field, amount) in [
            ("subtotal", subtotal),
            ("tax_amount", tax_amount),
            ("discount_amount", discount_amount),
            ("payment_amount", payment_amount),
        ] {
            if amount.is_negative() {
                return Err(CoreError::InvalidAmount {
                    field,
                    reason: format!("{amount} is negative"),
                });
            }
        }

        let gross = subtotal
            .checked_add(tax_amount)
            .ok_or_else(|| overflow("tax_amount", subtotal, tax_amount))?;
        if discount_amount > gross {
            return Err(CoreError::InvalidAmount {
                field: "discount_amount",
                reason: format!("{discount_amount} exceeds subtotal plus tax {gross}"),
            });
        }

        // discount <= gross and both are non-negative, so this cannot wrap.
        let total_amount = gross - discount_amount;
        if payment_amount < total_amount {
            return Err(CoreError::InvalidPayment {
                payment: payment_amount,
                total: total_amount,
            });
        }

        Ok(Totals {
            subtotal,
            tax_amount,
            discount_amount,
            total_amount,
            payment_amount,
            change_amount: (payment_amount - total_amount).clamp_to_zero(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::tests::fixed_instant;
    use crate::types::tests::sample_item;

    #[test]
    fn test_price_wholesale_line() {
        let item = sample_item();
        let line = price_line("txn-1", &item, 1, UnitMode::Wholesale, fixed_instant()).unwrap();

        assert_eq!(line.unit_price().cents(), 4_500);
        assert_eq!(line.total_price().cents(), 4_500);
        assert_eq!(line.ecer_quantity(), 5);
        assert_eq!(line.unit_mode(), UnitMode::Wholesale);
        assert_eq!(line.item_id(), item.id);
        assert_eq!(line.created_at(), fixed_instant());
    }

    #[test]
    fn test_price_retail_line() {
        let item = sample_item();
        let line = price_line("txn-1", &item, 3, UnitMode::Retail, fixed_instant()).unwrap();
        assert_eq!(line.total_price().cents(), 3_000);
        assert_eq!(line.ecer_quantity(), 3);
    }

    #[test]
    fn test_insufficient_stock() {
        let item = sample_item();
        let err = price_line("txn-1", &item, 3, UnitMode::Wholesale, fixed_instant()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 10,
                requested: 15,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_quantity_checked_first() {
        let mut item = sample_item();
        item.is_active = false;
        assert!(matches!(
            price_line("txn-1", &item, 0, UnitMode::Retail, fixed_instant()),
            Err(CoreError::InvalidQuantity { quantity: 0 })
        ));
        assert!(matches!(
            price_line("txn-1", &item, 1, UnitMode::Retail, fixed_instant()),
            Err(CoreError::ItemInactive(_))
        ));
    }

    #[test]
    fn test_totals_scenarios() {
        let err = Totals::compute(
            Money::from_cents(15_000),
            Money::from_cents(1_500),
            Money::from_cents(500),
            Money::from_cents(10_000),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidPayment { .. }));

        let exact = Totals::compute(
            Money::from_cents(15_000),
            Money::zero(),
            Money::zero(),
            Money::from_cents(15_000),
        )
        .unwrap();
        assert!(exact.change_amount.is_zero());
    }

    #[test]
    fn test_totals_reject_bad_amounts() {
        assert!(matches!(
            Totals::compute(
                Money::from_cents(1_000),
                Money::from_cents(-1),
                Money::zero(),
                Money::from_cents(1_000)
            ),
            Err(CoreError::InvalidAmount { field: "tax_amount", .. })
        ));
        assert!(matches!(
            Totals::compute(
                Money::from_cents(1_000),
                Money::from_cents(100),
                Money::from_cents(1_101),
                Money::from_cents(1_000)
            ),
            Err(CoreError::InvalidAmount { field: "discount_amount", .. })
        ));
    }

    #[test]
    fn test_subtotal_is_sum_of_lines() {
        let item = sample_item();
        let lines = vec![
            price_line("t", &item, 1, UnitMode::Wholesale, fixed_instant()).unwrap(),
            price_line("t", &item, 2, UnitMode::Retail, fixed_instant()).unwrap(),
        ];
        assert_eq!(subtotal(&lines).unwrap().cents(), 6_500);
        assert!(subtotal(&[]).unwrap().is_zero());
    }

    #[test]
    fn test_subtotal_overflow_is_an_error() {
        let mut item = sample_item();
        item.retail_selling_price = Money::from_cents(i64::MAX / 2 + 1);
        let lines = vec![
            price_line("t", &item, 1, UnitMode::Retail, fixed_instant()).unwrap(),
            price_line("t", &item, 1, UnitMode::Retail, fixed_instant()).unwrap(),
        ];
        assert!(matches!(
            subtotal(&lines),
            Err(CoreError::InvalidAmount { field: "subtotal", .. })
        ));
    }

    #[test]
    fn test_totals_overflow_is_an_error() {
        assert!(matches!(
            Totals::compute(
                Money::from_cents(100),
                Money::from_cents(i64::MAX),
                Money::zero(),
                Money::zero()
            ),
            Err(CoreError::InvalidAmount { field: "tax_amount", .. })
        ));
        assert!(matches!(
            Totals::compute(
                Money::from_cents(i64::MIN),
                Money::zero(),
                Money::zero(),
                Money::from_cents(i64::MAX)
            ),
            Err(CoreError::InvalidAmount { field: "subtotal", .. })
        ));
    }
}
