//! # Kasir Configuration
//!
//! Configuration for the database layer and the stock ledger.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     KASIR_DATABASE_PATH=/srv/kasir/kasir.db                            │
//! │     KASIR_STOCK_RETRIES=8                                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/kasir-pos/kasir.toml (Linux)                             │
//! │     ~/Library/Application Support/id.kasir.pos/kasir.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # kasir.toml
//! [database]
//! path = "/srv/kasir/kasir.db"
//! max_connections = 5
//! run_migrations = true
//!
//! [ledger]
//! max_stock_retries = 5   # optimistic stock update attempts per line
//! max_id_retries = 3      # transaction number / barcode regenerations
//!
//! [store]
//! name = "Toko Makmur"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};

// =============================================================================
// Database Settings
// =============================================================================

/// Connection pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Path to the SQLite file, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Seconds to wait for a free connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Seconds before an idle connection is closed.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Seconds a writer waits for SQLite's write lock before failing.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("id", "kasir", "pos")
        .map(|dirs| dirs.data_dir().join("kasir.db"))
        .unwrap_or_else(|| PathBuf::from("./kasir.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_busy_timeout() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            busy_timeout_secs: default_busy_timeout(),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Ledger Settings
// =============================================================================

/// Retry bounds for the stock ledger and identifier generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Compare-and-swap attempts per stock movement before `StockConflict`.
    #[serde(default = "default_stock_retries")]
    pub max_stock_retries: u32,

    /// Regenerations of a colliding transaction number or barcode.
    #[serde(default = "default_id_retries")]
    pub max_id_retries: u32,
}

fn default_stock_retries() -> u32 {
    5
}

fn default_id_retries() -> u32 {
    3
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            max_stock_retries: default_stock_retries(),
            max_id_retries: default_id_retries(),
        }
    }
}

// =============================================================================
// Store Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Shown on receipts and in logs.
    #[serde(default = "default_store_name")]
    pub name: String,
}

fn default_store_name() -> String {
    "Kasir POS".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: default_store_name(),
        }
    }
}

// =============================================================================
// Kasir Config
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KasirConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,

    #[serde(default)]
    pub store: StoreSettings,
}

impl KasirConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (kasir.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading kasir config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load kasir config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> DbResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| DbError::InvalidConfig("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Kasir config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(DbError::InvalidConfig("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(DbError::InvalidConfig(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(DbError::InvalidConfig(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }

        if self.ledger.max_stock_retries == 0 {
            return Err(DbError::InvalidConfig(
                "ledger.max_stock_retries must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `KASIR_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("KASIR_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("KASIR_MAX_CONNECTIONS") {
            match max.parse() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid KASIR_MAX_CONNECTIONS"),
            }
        }

        if let Some(retries) = lookup("KASIR_STOCK_RETRIES") {
            match retries.parse() {
                Ok(n) => self.ledger.max_stock_retries = n,
                Err(_) => warn!(value = %retries, "Ignoring invalid KASIR_STOCK_RETRIES"),
            }
        }

        if let Some(retries) = lookup("KASIR_ID_RETRIES") {
            match retries.parse() {
                Ok(n) => self.ledger.max_id_retries = n,
                Err(_) => warn!(value = %retries, "Ignoring invalid KASIR_ID_RETRIES"),
            }
        }

        if let Some(name) = lookup("KASIR_STORE_NAME") {
            self.store.name = name;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("id", "kasir", "pos")
            .map(|dirs| dirs.config_dir().join("kasir.toml"))
    }
}
