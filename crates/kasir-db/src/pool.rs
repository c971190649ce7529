//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  KasirConfig::load(None)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::from_config(&config) ← Pool settings + retry bounds         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Repositories (reads)     Unit-of-work operations (writes)             │
//! │  db.items().get(..)       db.checkout(..) / db.restock(..)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled for file databases:
//! - Readers don't block writers
//! - Writers don't block readers
//! - Better crash recovery
//!
//! ## Write Transactions
//! Every unit of work that writes opens with `BEGIN IMMEDIATE`
//! (`Database::begin_write`). The write lock is taken before the first
//! read, so a concurrent writer waits up to `busy_timeout` instead of
//! failing with `SQLITE_BUSY` when its read snapshot goes stale.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use kasir_core::ident::{Clock, IdGenerator, SecureIdGenerator, SystemClock};

use crate::config::{KasirConfig, LedgerSettings};
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::{
    CategoryRepository, ItemRepository, StockMovementRepository, TransactionRepository,
    UserRepository,
};

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/kasir.db")
///     .max_connections(5)
///     .max_stock_retries(8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// `None` keeps connections open (required for in-memory databases).
    pub idle_timeout: Option<Duration>,

    /// How long a writer waits for SQLite's write lock.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,

    /// Retry bounds for stock compare-and-swap and identifier regeneration.
    pub ledger: LedgerSettings,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
            ledger: LedgerSettings::default(),
        }
    }

    /// Builds a database configuration from the loaded [`KasirConfig`].
    pub fn from_config(config: &KasirConfig) -> Self {
        let db = &config.database;
        DbConfig {
            database_path: db.path.clone(),
            max_connections: db.max_connections,
            min_connections: db.min_connections,
            connect_timeout: Duration::from_secs(db.connect_timeout_secs),
            idle_timeout: Some(Duration::from_secs(db.idle_timeout_secs)),
            busy_timeout: Duration::from_secs(db.busy_timeout_secs),
            run_migrations: db.run_migrations,
            ledger: config.ledger,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets how long a writer waits for the write lock.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Sets the compare-and-swap attempts per stock movement.
    pub fn max_stock_retries(mut self, retries: u32) -> Self {
        self.ledger.max_stock_retries = retries;
        self
    }

    /// Sets how many times a colliding identifier is regenerated.
    pub fn max_id_retries(mut self, retries: u32) -> Self {
        self.ledger.max_id_retries = retries;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// // Database is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
            ledger: LedgerSettings::default(),
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access and the unit-of-work
/// operations (checkout, cancel, restock, adjust).
///
/// Cloning is cheap: the pool and capabilities are shared.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    pub(crate) ids: Arc<dyn IdGenerator>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) ledger: LedgerSettings,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("pool", &self.pool)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads (file databases)
    ///    - NORMAL synchronous
    ///    - Foreign keys enabled
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let base_options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .create_if_missing(true)
        };
        // SQLite has foreign keys disabled by default
        let connect_options = base_options
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout);

        debug!("Connection options configured");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout);
        if config.is_in_memory() {
            // Dropping the last connection drops the database.
            pool_options = pool_options.max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            ids: Arc::new(SecureIdGenerator),
            clock: Arc::new(SystemClock),
            ledger: config.ledger,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Replaces the identifier generator (tests use a deterministic one).
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runs database migrations.
    ///
    /// Called by `new()` if `run_migrations` is true.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Opens a write transaction holding SQLite's write lock from the start.
    ///
    /// Stock and transaction writes go through here. Dropping the returned
    /// transaction without `commit` rolls it back.
    pub(crate) async fn begin_write(&self) -> DbResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    /// Returns a reference to the connection pool.
    ///
    /// For advanced queries not covered by repositories.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn ledger_settings(&self) -> LedgerSettings {
        self.ledger
    }

    pub fn items(&self) -> ItemRepository {
        ItemRepository::new(self.pool.clone(), self.clock.clone())
    }

    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(self.pool.clone(), self.clock.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone(), self.clock.clone())
    }

    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.pool.clone(), self.clock.clone())
    }

    /// Read access to the append-only stock ledger.
    pub fn stock_movements(&self) -> StockMovementRepository {
        StockMovementRepository::new(self.pool.clone())
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
