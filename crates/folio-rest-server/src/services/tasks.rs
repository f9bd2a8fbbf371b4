// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Periodic background jobs

use crate::error::ServerResult;
use crate::services::backup::{backup_due, BackupService};
use crate::services::settings::SettingsService;
use crate::state::AppState;
use chrono::{DateTime, Utc};
use folio_api_contract::{BackupKind, BackupRecord};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

fn ticker(every_secs: u64) -> tokio::time::Interval {
    let mut ticker = tokio::time::interval(Duration::from_secs(every_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Delete old read notifications on a fixed interval
pub fn spawn_notification_cleanup(state: AppState) -> JoinHandle<()> {
    let config = state.config.notifications.clone();
    tokio::spawn(async move {
        let mut ticker = ticker(config.cleanup_interval_secs);
        loop {
            ticker.tick().await;
            if let Err(err) = state.notifications.cleanup(config.retention_days) {
                tracing::warn!(error = %err, "notification cleanup failed");
            }
        }
    })
}

/// Take a scheduled backup when the settings ask for one and it is due,
/// then prune expired backups
pub async fn run_backup_check(
    settings: &SettingsService,
    backups: &BackupService,
    now: DateTime<Utc>,
) -> ServerResult<Option<BackupRecord>> {
    let (enabled, frequency) = settings.backup_policy().await?;
    if !enabled {
        return Ok(None);
    }

    let last = backups.latest()?.map(|record| record.created_at);
    let created = if backup_due(&frequency, last, now) {
        let record = backups.create(BackupKind::Scheduled).await?;
        tracing::info!(filename = %record.filename, %frequency, "scheduled backup created");
        Some(record)
    } else {
        None
    };

    backups.cleanup(now).await?;
    Ok(created)
}

pub fn spawn_scheduled_backups(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = ticker(state.config.backup.check_interval_secs);
        loop {
            ticker.tick().await;
            if let Err(err) = run_backup_check(&state.settings, &state.backups, Utc::now()).await {
                tracing::warn!(error = %err, "scheduled backup failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::backup::FilesystemBackupStore;
    use folio_local_db::Database;
    use serde_json::json;
    use std::sync::Arc;

    fn services(dir: &std::path::Path) -> (SettingsService, BackupService) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let settings = SettingsService::new(Arc::clone(&db), Duration::from_secs(300));
        let backups = BackupService::new(db, Arc::new(FilesystemBackupStore::new(dir)), 30);
        (settings, backups)
    }

    #[tokio::test]
    async fn disabled_policy_takes_no_backup() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, backups) = services(dir.path());
        let created = run_backup_check(&settings, &backups, Utc::now()).await.unwrap();
        assert!(created.is_none());
        assert!(backups.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn due_backup_is_taken_once() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, backups) = services(dir.path());
        settings
            .update(
                &json!({ "backup": { "autoBackup": true, "backupFrequency": "daily" } }),
                "admin",
            )
            .await
            .unwrap();

        let first = run_backup_check(&settings, &backups, Utc::now()).await.unwrap();
        assert_eq!(first.map(|record| record.kind), Some(BackupKind::Scheduled));
        let second = run_backup_check(&settings, &backups, Utc::now()).await.unwrap();
        assert!(second.is_none());
        assert_eq!(backups.list().unwrap().len(), 1);
    }
}
