//! # kasir-db: Persistence Layer for Kasir POS
//!
//! SQLite storage for the catalog, users, transactions and the stock
//! ledger, built on sqlx. Every write that spans several rows runs inside
//! one SQLite transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kasir POS Data Flow                              │
//! │                                                                         │
//! │  Till / admin screen                                                   │
//! │       │  CheckoutRequest, StockAdjustment, NewItem                     │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kasir-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │ Unit of work  │    │ Repositories │  │   │
//! │  │   │   (pool.rs)   │    │ checkout.rs   │    │ item, user,  │  │   │
//! │  │   │               │───►│ inventory.rs  │───►│ transaction, │  │   │
//! │  │   │ SqlitePool    │    │ catalog.rs    │    │ stock ledger │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │          ▲                      │                               │   │
//! │  │   KasirConfig (config.rs)       ▼  kasir-core rules            │   │
//! │  │                          Transaction / StockMovement::plan      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   <platform data dir>/kasir.db  (migrations embedded)          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - TOML + environment configuration
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Row-level reads and catalog edits
//! - [`checkout`] - Atomic sale persistence, held sales, cancellation
//! - [`inventory`] - Restock and stock-take adjustments
//! - [`catalog`] - User, category and item creation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kasir_db::{CheckoutRequest, Database, DbConfig, KasirConfig};
//!
//! let config = KasirConfig::load(None)?;
//! let db = Database::new(DbConfig::from_config(&config)).await?;
//!
//! let item = db.items().get_by_barcode("INDOMIE001").await?;
//! let txn = db.checkout(&CheckoutRequest { /* lines, payment */ ..Default::default() }).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod inventory;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::CheckoutRequest;
pub use config::{DatabaseSettings, KasirConfig, LedgerSettings, StoreSettings};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    CategoryRepository, ItemRepository, StockMovementRepository, TransactionRepository,
    UserRepository,
};
