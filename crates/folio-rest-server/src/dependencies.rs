// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Dependency wiring for the REST server

use crate::auth::{hash_password, random_secret, TokenIssuer};
use crate::config::ServerConfig;
use crate::services::{
    BackupService, BackupStore, FilesystemBackupStore, LogSink, LoginThrottle,
    NotificationChannel, NotificationService, NotificationSink, SecurityService, SettingsService,
};
use crate::state::AppState;
use anyhow::Result;
use folio_api_contract::UserRole;
use folio_local_db::{Database, UserStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Buffered realtime analytics events per subscriber
const REALTIME_CHANNEL_CAPACITY: usize = 256;

/// Default dependency builder: SQLite, filesystem backups and log-only sinks
pub struct DefaultServerDependencies {
    state: AppState,
}

impl DefaultServerDependencies {
    pub async fn new(config: ServerConfig) -> Result<Self> {
        let db = Arc::new(Database::open(&config.database_path)?);
        let store: Arc<dyn BackupStore> = Arc::new(FilesystemBackupStore::new(&config.backup.dir));
        Self::with_parts(config, db, store).await
    }

    /// Build around an existing database and backup store
    pub async fn with_parts(
        config: ServerConfig,
        db: Arc<Database>,
        backup_store: Arc<dyn BackupStore>,
    ) -> Result<Self> {
        seed_admin(&db, &config)?;

        let secret = match config.auth.jwt_secret.clone() {
            Some(secret) => secret,
            None => {
                let secret = random_secret();
                tracing::warn!(
                    jwt_secret = %folio_logging::redact(&secret),
                    "no JWT secret configured, generated one for this process; sessions will not survive a restart"
                );
                secret
            }
        };
        let tokens = Arc::new(TokenIssuer::new(secret.as_bytes(), config.auth.token_ttl()));

        let sinks: Vec<Arc<dyn NotificationSink>> = vec![
            Arc::new(LogSink::new(NotificationChannel::Email)),
            Arc::new(LogSink::new(NotificationChannel::Push)),
        ];
        let notifications = Arc::new(NotificationService::new(Arc::clone(&db), sinks));

        let security = Arc::new(SecurityService::new(Arc::clone(&db), Arc::clone(&notifications)));
        let rules = security.load_rules()?;
        tracing::debug!(rules, "security rules loaded");

        let settings = Arc::new(SettingsService::new(
            Arc::clone(&db),
            Duration::from_secs(config.settings_cache_ttl_secs),
        ));
        let backups = Arc::new(BackupService::new(
            Arc::clone(&db),
            backup_store,
            config.backup.retention_days,
        ));
        let (realtime, _) = broadcast::channel(REALTIME_CHANNEL_CAPACITY);

        let state = AppState {
            db,
            tokens,
            login: Arc::new(LoginThrottle::new(&config.login)),
            settings,
            notifications,
            security,
            backups,
            realtime,
            config,
        };
        Ok(Self { state })
    }

    /// Consume the dependency builder and return the resulting app state
    pub fn into_state(self) -> AppState {
        self.state
    }
}

/// Create the configured admin when no account exists yet
fn seed_admin(db: &Database, config: &ServerConfig) -> Result<()> {
    let (Some(email), Some(password)) = (
        config.auth.bootstrap_admin_email.as_deref(),
        config.auth.bootstrap_admin_password.as_deref(),
    ) else {
        return Ok(());
    };
    if db.with_conn(|conn| UserStore::new(conn).count())? > 0 {
        return Ok(());
    }
    let hash = hash_password(password)?;
    let admin = db.with_conn(|conn| {
        UserStore::new(conn).create(
            email,
            &config.auth.bootstrap_admin_name,
            &hash,
            UserRole::Admin,
        )
    })?;
    tracing::info!(user_id = %admin.id, email, "bootstrap admin created");
    Ok(())
}
