// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Server configuration

use chrono::Duration;
use folio_logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Server configuration
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,

    /// Path to SQLite database; `:memory:` keeps everything in RAM
    pub database_path: String,

    /// Enable permissive CORS headers for development
    pub enable_cors: bool,

    pub auth: AuthConfig,

    pub rate_limit: RateLimitConfig,

    pub login: LoginThrottleConfig,

    pub backup: BackupConfig,

    pub notifications: NotificationConfig,

    /// Seconds a settings read stays cached
    pub settings_cache_ttl_secs: u64,

    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            database_path: ":memory:".to_string(),
            enable_cors: false,
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            login: LoginThrottleConfig::default(),
            backup: BackupConfig::default(),
            notifications: NotificationConfig::default(),
            settings_cache_ttl_secs: 300,
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&raw)?)
    }
}

/// Session token and bootstrap account settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AuthConfig {
    /// HS256 signing secret; a random one is generated per process when unset
    pub jwt_secret: Option<String>,

    /// Token lifetime in days
    pub token_ttl_days: i64,

    /// Admin created on first start when the users table is empty
    pub bootstrap_admin_email: Option<String>,
    pub bootstrap_admin_password: Option<String>,
    pub bootstrap_admin_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_days: 30,
            bootstrap_admin_email: None,
            bootstrap_admin_password: None,
            bootstrap_admin_name: "Administrator".to_string(),
        }
    }
}

impl AuthConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::days(self.token_ttl_days)
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RateLimitConfig {
    /// Requests per minute per client
    pub requests_per_minute: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
        }
    }
}

/// Failed-login lockout policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoginThrottleConfig {
    pub max_attempts: u32,
    pub lockout_minutes: i64,
}

impl Default for LoginThrottleConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_minutes: 30,
        }
    }
}

impl LoginThrottleConfig {
    pub fn lockout(&self) -> Duration {
        Duration::minutes(self.lockout_minutes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BackupConfig {
    /// Backups are written under `<dir>/backups/`
    pub dir: PathBuf,
    pub retention_days: i64,
    /// How often the scheduler checks whether a backup is due
    pub check_interval_secs: u64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./data"),
            retention_days: 30,
            check_interval_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NotificationConfig {
    /// Read notifications older than this are removed
    pub retention_days: i64,
    pub cleanup_interval_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            retention_days: 30,
            cleanup_interval_secs: 3600,
        }
    }
}
