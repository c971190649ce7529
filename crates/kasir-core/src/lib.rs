//! # kasir-core: Pricing and Stock Rules for Kasir POS
//!
//! This crate holds the business rules of the point of sale: how a line is
//! priced in retail (Ecer) or wholesale (Grosir) units, how a transaction
//! totals up, and how stock may change. It does no I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kasir POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           HTTP / UI layer (outside this workspace)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kasir-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────────┐ ┌────────┐ ┌───────┐ │   │
//! │  │   │  types  │ │ pricing │ │ transaction │ │ ledger │ │ ident │ │   │
//! │  │   │  Item   │ │ LineItem│ │  Pending →  │ │ Stock  │ │ TXN.. │ │   │
//! │  │   │  units  │ │ Totals  │ │  Completed  │ │ Ledger │ │ Clock │ │   │
//! │  │   └─────────┘ └─────────┘ └─────────────┘ └────────┘ └───────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO DATABASE • NO NETWORK • INJECTED CLOCK AND RANDOMNESS      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kasir-db (Database Layer)                    │   │
//! │  │     SQLite repositories, atomic checkout, versioned stock       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic
//! - [`types`] - Domain types (Item, LineItem, StockMovement, ...)
//! - [`pricing`] - Line item calculator and totals
//! - [`transaction`] - Transaction state machine
//! - [`ledger`] - Stock ledger: the only way stock changes
//! - [`ident`] - Transaction numbers, barcodes and the clock
//! - [`views`] - Read-only projections for presentation
//! - [`validation`] - Field rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use kasir_core::ident::{SecureIdGenerator, SystemClock};
//! use kasir_core::ledger::MemoryStockLedger;
//! use kasir_core::transaction::Transaction;
//! use kasir_core::{Item, Money, NewItem, TransactionStatus, UnitMode};
//!
//! let item = Item::new(
//!     NewItem {
//!         retail_selling_price: Money::from_cents(350_000),
//!         wholesale_selling_price: Money::from_cents(3_300_000),
//!         quantity_per_wholesale: 10,
//!         stock_quantity: 40,
//!         ..NewItem::named("Minyak Goreng 1L", "cat-sembako")
//!     },
//!     "MINYAK0001".to_string(),
//!     chrono::Utc::now(),
//! )
//! .unwrap();
//!
//! let ledger = MemoryStockLedger::new(Arc::new(SystemClock));
//! ledger.insert(item.clone());
//!
//! let mut txn = Transaction::open("user-1", &SecureIdGenerator, Arc::new(SystemClock));
//! txn.add_line(&item, 2, UnitMode::Wholesale).unwrap();
//! txn.finalize(Money::zero(), Money::zero(), Money::from_cents(7_000_000)).unwrap();
//! txn.commit(&ledger).unwrap();
//!
//! assert_eq!(txn.status(), TransactionStatus::Completed);
//! assert_eq!(ledger.item(&item.id).unwrap().stock_quantity, 20);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ident;
pub mod ledger;
pub mod money;
pub mod pricing;
pub mod transaction;
pub mod types;
pub mod validation;
pub mod views;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Prefix of every transaction number.
pub const TRANSACTION_NUMBER_PREFIX: &str = "TXN";

/// Length of a generated barcode.
pub const BARCODE_LENGTH: usize = 10;

/// Longest barcode accepted from a scanner or catalog import.
pub const MAX_BARCODE_LENGTH: usize = 20;
