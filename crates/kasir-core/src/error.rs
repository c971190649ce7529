//! # Error Types
//!
//! Domain-specific error types for kasir-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kasir-core errors (this file)                                         │
//! │  ├── CoreError        - Pricing, lifecycle and ledger failures         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kasir-db errors (separate crate)                                      │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error is scoped to the single operation that raised it. None of
//! them leaves an Item or Transaction partially updated; the one documented
//! exception is a multi-line `commit` against a ledger with no unit of work
//! around it (see [`crate::transaction`]).

use thiserror::Error;

use crate::money::Money;
use crate::types::TransactionStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Quantity was zero, negative, or overflowed base-unit conversion.
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: i64 },

    /// Advisory pre-check failed while pricing a line.
    ///
    /// ## User Workflow
    /// ```text
    /// add_line(item, 3, Grosir)   quantity_per_wholesale = 5
    ///      │
    ///      ▼
    /// needs 15 base units, stock = 10
    ///      │
    ///      ▼
    /// InsufficientStock { barcode, available: 10, requested: 15 }
    /// ```
    #[error("Insufficient stock for {barcode}: available {available}, requested {requested}")]
    InsufficientStock {
        barcode: String,
        available: i64,
        requested: i64,
    },

    /// Authoritative debit-time failure: the movement would drive stock
    /// below zero. Nothing was written.
    #[error("Stock for item {item_id} cannot go negative: current {current}, change {change}")]
    NegativeStock {
        item_id: String,
        current: i64,
        change: i64,
    },

    /// Payment does not cover the transaction total.
    #[error("Payment {payment} is less than total {total}")]
    InvalidPayment { payment: Money, total: Money },

    /// Operation attempted outside the state that allows it.
    #[error("Transaction {transaction_number} is {status:?}, cannot {operation}")]
    InvalidStateTransition {
        transaction_number: String,
        status: TransactionStatus,
        operation: &'static str,
    },

    /// A generated identifier collided with an existing one.
    /// Retryable: regenerate and try again.
    #[error("Duplicate {field}: '{value}' already exists")]
    DuplicateIdentifier { field: String, value: String },

    /// Item cannot be found.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Item is soft-deleted and cannot be sold.
    #[error("Item {0} is inactive")]
    ItemInactive(String),

    /// `finalize` or `commit` on a transaction with no lines.
    #[error("Transaction {0} has no items")]
    EmptyTransaction(String),

    /// A monetary amount is outside its allowed range.
    #[error("Invalid {field}: {reason}")]
    InvalidAmount { field: &'static str, reason: String },

    /// Stock movements handed to `Transaction::complete` do not match its lines.
    #[error("Ledger mismatch for transaction {transaction_number}: {reason}")]
    LedgerMismatch {
        transaction_number: String,
        reason: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns true if the caller should regenerate an identifier and retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::DuplicateIdentifier { .. })
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., lowercase barcode, malformed amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            barcode: "AB12CD34EF".to_string(),
            available: 10,
            requested: 15,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for AB12CD34EF: available 10, requested 15"
        );

        let err = CoreError::InvalidPayment {
            payment: Money::from_cents(10_000),
            total: Money::from_cents(16_000),
        };
        assert_eq!(err.to_string(), "Payment 100.00 is less than total 160.00");
    }

    #[test]
    fn test_state_transition_message() {
        let err = CoreError::InvalidStateTransition {
            transaction_number: "TXN202601010000001234".to_string(),
            status: TransactionStatus::Completed,
            operation: "cancel",
        };
        assert_eq!(
            err.to_string(),
            "Transaction TXN202601010000001234 is Completed, cannot cancel"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "barcode".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_retryable() {
        let dup = CoreError::DuplicateIdentifier {
            field: "barcode".to_string(),
            value: "AAAA000000".to_string(),
        };
        assert!(dup.is_retryable());
        assert!(!CoreError::InvalidQuantity { quantity: 0 }.is_retryable());
    }
}
