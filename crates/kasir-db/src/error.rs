//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        CoreError (kasir-core)              │
//! │       │                                 │                               │
//! │       ▼                                 ▼                               │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Caller (HTTP / UI layer) ← Maps to a user-facing message              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use kasir_core::{CoreError, ValidationError};

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - ID doesn't exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate barcode, username or category name
    /// - Duplicate transaction number
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Referencing a non-existent category_id, user_id or item_id
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Optimistic stock update kept losing to concurrent writers.
    #[error("Stock for item {item_id} changed concurrently {attempts} times, giving up")]
    StockConflict { item_id: String, attempts: u32 },

    /// SQLite's write lock stayed held past the busy timeout.
    #[error("Database is busy: {0}")]
    Busy(String),

    /// Business rule rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Configuration file could not be read, parsed or validated.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns true if the same request may succeed when tried again
    /// (after regenerating an identifier, or against fresher stock).
    pub fn is_retryable(&self) -> bool {
        match self {
            DbError::UniqueViolation { .. } | DbError::StockConflict { .. } | DbError::Busy(_) => {
                true
            }
            DbError::Core(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// True if this is a uniqueness violation on `column`.
    pub(crate) fn is_unique_violation_on(&self, column: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field, .. } if field.ends_with(column))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type / SQLITE_BUSY
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked") || msg.contains("database is busy") {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Core(CoreError::Validation(err))
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        DbError::InvalidConfig(err.to_string())
    }
}

impl From<toml::de::Error> for DbError {
    fn from(err: toml::de::Error) -> Self {
        DbError::InvalidConfig(err.to_string())
    }
}

impl From<toml::ser::Error> for DbError {
    fn from(err: toml::ser::Error) -> Self {
        DbError::InvalidConfig(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(DbError::duplicate("transactions.transaction_number", "TXN1").is_retryable());
        assert!(DbError::StockConflict {
            item_id: "i".into(),
            attempts: 3
        }
        .is_retryable());
        assert!(DbError::Core(CoreError::DuplicateIdentifier {
            field: "barcode".into(),
            value: "X".into()
        })
        .is_retryable());
        assert!(!DbError::Core(CoreError::InvalidQuantity { quantity: 0 }).is_retryable());
        assert!(DbError::Busy("database is locked".into()).is_retryable());
        assert!(!DbError::PoolExhausted.is_retryable());
    }

    #[test]
    fn test_unique_violation_column() {
        let err = DbError::duplicate("items.barcode", "unknown");
        assert!(err.is_unique_violation_on("barcode"));
        assert!(!err.is_unique_violation_on("transaction_number"));
    }

    #[test]
    fn test_core_error_is_transparent() {
        let err: DbError = CoreError::ItemNotFound("abc".into()).into();
        assert_eq!(err.to_string(), "Item not found: abc");
    }
}
