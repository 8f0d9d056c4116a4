//! # Service Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     INSPECTA_DB_PATH=/srv/inspecta/inspecta.db                         │
//! │     INSPECTA_JUSTIFICATION_THRESHOLD=20000                             │
//! │     INSPECTA_SUMMARY_TTL_SECS=15                                       │
//! │     INSPECTA_LOG=info,inspecta=debug                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/inspecta/backoffice.toml (Linux)                         │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/srv/inspecta/inspecta.db"
//! max_connections = 5
//!
//! [reconciliation]
//! threshold = 20000
//! min_justification_chars = 10
//!
//! [cache]
//! summary_ttl_secs = 15     # 0 disables the cache
//!
//! [treasury]
//! default_alert_threshold = 100000
//!
//! [notifications]
//! channel_capacity = 256
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use inspecta_core::{
    Money, ReconciliationEngine, ReconciliationPolicy, DEFAULT_ALERT_THRESHOLD,
    DEFAULT_JUSTIFICATION_THRESHOLD, DEFAULT_MIN_JUSTIFICATION_CHARS, MAX_AMOUNT,
};
use inspecta_db::DbConfig;

use crate::error::{ServiceError, ServiceResult};

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("co", "inspecta", "inspecta")
        .map(|dirs| dirs.data_dir().join("inspecta.db"))
        .unwrap_or_else(|| PathBuf::from("inspecta.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Arqueo tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSettings {
    /// Largest |difference| accepted without a justification.
    #[serde(default = "default_threshold")]
    pub threshold: Money,

    #[serde(default = "default_min_justification_chars")]
    pub min_justification_chars: usize,
}

fn default_threshold() -> Money {
    DEFAULT_JUSTIFICATION_THRESHOLD
}

fn default_min_justification_chars() -> usize {
    DEFAULT_MIN_JUSTIFICATION_CHARS
}

impl Default for ReconciliationSettings {
    fn default() -> Self {
        ReconciliationSettings {
            threshold: default_threshold(),
            min_justification_chars: default_min_justification_chars(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Lifetime of a cached session summary. 0 disables caching.
    #[serde(default = "default_summary_ttl")]
    pub summary_ttl_secs: u64,
}

fn default_summary_ttl() -> u64 {
    15
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            summary_ttl_secs: default_summary_ttl(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreasuryConfig {
    /// Seeds the stored settings the first time the database is opened.
    /// Later changes go through `update_treasury_settings`.
    #[serde(default = "default_alert_threshold")]
    pub default_alert_threshold: Money,
}

fn default_alert_threshold() -> Money {
    DEFAULT_ALERT_THRESHOLD
}

impl Default for TreasuryConfig {
    fn default() -> Self {
        TreasuryConfig {
            default_alert_threshold: default_alert_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Events a slow subscriber may fall behind before it starts lagging.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for NotificationSettings {
    fn default() -> Self {
        NotificationSettings {
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive; `None` uses the built-in default.
    #[serde(default)]
    pub filter: Option<String>,
}

// =============================================================================
// Service Configuration
// =============================================================================

/// Complete back-office configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub reconciliation: ReconciliationSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub treasury: TreasuryConfig,

    #[serde(default)]
    pub notifications: NotificationSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl ServiceConfig {
    /// Defaults with an in-memory database, for tests and demos.
    pub fn in_memory() -> Self {
        ServiceConfig {
            database: DatabaseSettings {
                path: PathBuf::from(IN_MEMORY),
                max_connections: 1,
            },
            ..Default::default()
        }
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`backoffice.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ServiceResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading back-office config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn from_file(path: &Path) -> ServiceResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn validate(&self) -> ServiceResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ServiceError::Config("database.path must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ServiceError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.reconciliation.threshold.is_negative() {
            return Err(ServiceError::Config(
                "reconciliation.threshold must not be negative".into(),
            ));
        }
        if self.reconciliation.min_justification_chars == 0 {
            return Err(ServiceError::Config(
                "reconciliation.min_justification_chars must be greater than 0".into(),
            ));
        }
        let alert = self.treasury.default_alert_threshold;
        if alert.is_negative() || alert > MAX_AMOUNT {
            return Err(ServiceError::Config(format!(
                "treasury.default_alert_threshold must be between 0 and {}",
                MAX_AMOUNT
            )));
        }
        if self.notifications.channel_capacity == 0 {
            return Err(ServiceError::Config(
                "notifications.channel_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("INSPECTA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(threshold) = std::env::var("INSPECTA_JUSTIFICATION_THRESHOLD") {
            match threshold.parse::<i64>() {
                Ok(units) => self.reconciliation.threshold = Money::from_units(units),
                Err(_) => warn!(value = %threshold, "Ignoring invalid INSPECTA_JUSTIFICATION_THRESHOLD"),
            }
        }

        if let Ok(ttl) = std::env::var("INSPECTA_SUMMARY_TTL_SECS") {
            match ttl.parse::<u64>() {
                Ok(secs) => self.cache.summary_ttl_secs = secs,
                Err(_) => warn!(value = %ttl, "Ignoring invalid INSPECTA_SUMMARY_TTL_SECS"),
            }
        }

        if let Ok(filter) = std::env::var("INSPECTA_LOG") {
            self.logging.filter = Some(filter);
        }
    }

    /// `backoffice.toml` in the platform config directory.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("co", "inspecta", "inspecta")
            .map(|dirs| dirs.config_dir().join("backoffice.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn db_config(&self) -> DbConfig {
        if self.database.path.as_os_str() == IN_MEMORY {
            DbConfig::in_memory()
        } else {
            DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
        }
    }

    pub fn reconciliation_engine(&self) -> ReconciliationEngine {
        ReconciliationEngine::new(ReconciliationPolicy {
            threshold: self.reconciliation.threshold,
            min_justification_chars: self.reconciliation.min_justification_chars,
        })
    }

    pub fn summary_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.summary_ttl_secs)
    }
}
