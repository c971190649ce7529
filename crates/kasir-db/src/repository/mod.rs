//! # Repository Module
//!
//! Database repository implementations for Kasir POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Caller                                                                │
//! │       │  db.items().get_by_barcode("8991234567890")                    │
//! │       ▼                                                                 │
//! │  ItemRepository                                                        │
//! │  ├── get_by_id / get_by_barcode / search                               │
//! │  ├── update (catalog fields only, never stock)                         │
//! │  └── deactivate                                                        │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Writes that must be atomic with other writes (checkout, restock)      │
//! │  are crate-internal functions taking `&mut SqliteConnection`, so      │
//! │  they run inside the caller's transaction.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ItemRepository`] - Catalog items
//! - [`CategoryRepository`] - Item categories
//! - [`UserRepository`] - Cashiers and administrators
//! - [`TransactionRepository`] - Transactions and their lines
//! - [`StockMovementRepository`] - Read side of the stock ledger

pub mod category;
pub mod item;
pub mod stock;
pub mod transaction;
pub mod user;

pub use category::CategoryRepository;
pub use item::ItemRepository;
pub use stock::StockMovementRepository;
pub use transaction::TransactionRepository;
pub use user::UserRepository;
