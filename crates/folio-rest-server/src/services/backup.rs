// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Content snapshots and restore

use crate::error::{ServerError, ServerResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use folio_api_contract::{
    AnalyticsEvent, BackupKind, BackupRecord, BackupStatus, PortfolioItem, Post, PricingPlan,
    Testimonial, User, UserFilter, BACKUP_FORMAT_VERSION,
};
use folio_local_db::{
    AnalyticsStore, BackupRecordStore, Database, PortfolioStore, PostStore, PricingStore,
    SettingsStore, TestimonialStore, UserStore,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Analytics events included in a snapshot
const BACKUP_ANALYTICS_LIMIT: u32 = 1000;

/// Where backup documents live
#[async_trait]
pub trait BackupStore: Send + Sync {
    async fn put(&self, filename: &str, bytes: Vec<u8>) -> anyhow::Result<()>;

    /// `None` when no document has that name
    async fn get(&self, filename: &str) -> anyhow::Result<Option<Vec<u8>>>;

    async fn delete(&self, filename: &str) -> anyhow::Result<()>;

    async fn list(&self) -> anyhow::Result<Vec<String>>;
}

/// Stores backups as files under `<dir>/backups/`
pub struct FilesystemBackupStore {
    root: PathBuf,
}

impl FilesystemBackupStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            root: dir.as_ref().join("backups"),
        }
    }

    fn path(&self, filename: &str) -> anyhow::Result<PathBuf> {
        if filename.is_empty()
            || filename.contains(['/', '\\'])
            || filename.starts_with('.')
        {
            anyhow::bail!("invalid backup filename: {filename}");
        }
        Ok(self.root.join(filename))
    }
}

#[async_trait]
impl BackupStore for FilesystemBackupStore {
    async fn put(&self, filename: &str, bytes: Vec<u8>) -> anyhow::Result<()> {
        let path = self.path(filename)?;
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn get(&self, filename: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let path = self.path(filename)?;
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&self, filename: &str) -> anyhow::Result<()> {
        let path = self.path(filename)?;
        match tokio::fs::remove_file(path).await {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }

    async fn list(&self) -> anyhow::Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(err) => return Err(err.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Serialized snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupDocument {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub data: BackupData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupData {
    /// Accounts without password hashes; informational only
    pub users: Vec<User>,
    pub posts: Vec<Post>,
    pub portfolio: Vec<PortfolioItem>,
    pub testimonials: Vec<Testimonial>,
    pub pricing: Vec<PricingPlan>,
    pub settings: Option<Value>,
    pub analytics: Vec<AnalyticsEvent>,
}

/// `backup-<timestamp>.json` with `:` replaced so the name is portable
pub fn backup_filename(at: DateTime<Utc>) -> String {
    format!(
        "backup-{}.json",
        at.to_rfc3339_opts(SecondsFormat::Micros, true).replace(':', "-")
    )
}

/// Whether a scheduled backup is due given the newest existing one
pub fn backup_due(frequency: &str, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    let interval = match frequency {
        "weekly" => Duration::weeks(1),
        "monthly" => Duration::days(30),
        _ => Duration::days(1),
    };
    last.map_or(true, |last| now - last >= interval)
}

pub struct BackupService {
    db: Arc<Database>,
    store: Arc<dyn BackupStore>,
    retention_days: i64,
}

impl BackupService {
    pub fn new(db: Arc<Database>, store: Arc<dyn BackupStore>, retention_days: i64) -> Self {
        Self {
            db,
            store,
            retention_days,
        }
    }

    fn snapshot(&self, now: DateTime<Utc>) -> ServerResult<BackupDocument> {
        let data = self.db.with_conn(|conn| {
            Ok(BackupData {
                users: UserStore::new(conn).list(&UserFilter::default())?,
                posts: PostStore::new(conn).all()?,
                portfolio: PortfolioStore::new(conn).list(None)?,
                testimonials: TestimonialStore::new(conn).list()?,
                pricing: PricingStore::new(conn).list()?,
                settings: SettingsStore::new(conn).get()?,
                analytics: AnalyticsStore::new(conn).latest(BACKUP_ANALYTICS_LIMIT)?,
            })
        })?;
        Ok(BackupDocument {
            version: BACKUP_FORMAT_VERSION.to_string(),
            timestamp: now,
            data,
        })
    }

    pub async fn create(&self, kind: BackupKind) -> ServerResult<BackupRecord> {
        let now = Utc::now();
        let filename = backup_filename(now);
        let bytes = serde_json::to_vec_pretty(&self.snapshot(now)?)
            .map_err(|e| ServerError::Internal(format!("backup serialization failed: {e}")))?;
        let size = bytes.len() as u64;

        if let Err(err) = self.store.put(&filename, bytes).await {
            tracing::error!(%filename, error = %err, "backup upload failed");
            self.db.with_conn(|conn| {
                BackupRecordStore::new(conn).insert(&filename, 0, kind, BackupStatus::Failed)
            })?;
            return Err(err.into());
        }

        let record = self.db.with_conn(|conn| {
            BackupRecordStore::new(conn).insert(&filename, size, kind, BackupStatus::Completed)
        })?;
        tracing::info!(%filename, size, kind = %kind, "backup created");
        Ok(record)
    }

    /// Raw snapshot for download; only names this service produces are served
    pub async fn download(&self, filename: &str) -> ServerResult<Vec<u8>> {
        let not_found = || ServerError::NotFound(format!("backup '{filename}' not found"));
        if !filename.starts_with("backup-")
            || !filename.ends_with(".json")
            || filename.contains(['/', '\\'])
        {
            return Err(not_found());
        }
        self.store.get(filename).await?.ok_or_else(not_found)
    }

    /// Replace content tables with the snapshot's. Users and analytics stay as they are.
    pub async fn restore(&self, filename: &str) -> ServerResult<()> {
        let bytes = self
            .store
            .get(filename)
            .await?
            .ok_or_else(|| ServerError::NotFound(format!("backup '{filename}' not found")))?;
        let document: BackupDocument = serde_json::from_slice(&bytes)
            .map_err(|e| ServerError::BadRequest(format!("unreadable backup: {e}")))?;
        if document.version != BACKUP_FORMAT_VERSION {
            return Err(ServerError::BadRequest(format!(
                "unsupported backup version {}",
                document.version
            )));
        }

        let data = document.data;
        self.db.transaction(|tx| {
            let posts = PostStore::new(tx);
            let portfolio = PortfolioStore::new(tx);
            let testimonials = TestimonialStore::new(tx);
            let pricing = PricingStore::new(tx);
            let settings = SettingsStore::new(tx);

            posts.delete_all()?;
            portfolio.delete_all()?;
            testimonials.delete_all()?;
            pricing.delete_all()?;
            settings.delete_all()?;

            for post in &data.posts {
                posts.restore(post)?;
            }
            for item in &data.portfolio {
                portfolio.restore(item)?;
            }
            for testimonial in &data.testimonials {
                testimonials.restore(testimonial)?;
            }
            for plan in &data.pricing {
                pricing.restore(plan)?;
            }
            if let Some(document) = &data.settings {
                settings.put(document)?;
            }
            Ok(())
        })?;

        tracing::info!(%filename, "backup restored");
        Ok(())
    }

    pub fn list(&self) -> ServerResult<Vec<BackupRecord>> {
        Ok(self.db.with_conn(|conn| BackupRecordStore::new(conn).list())?)
    }

    /// Newest backup of any kind
    pub fn latest(&self) -> ServerResult<Option<BackupRecord>> {
        Ok(self.list()?.into_iter().next())
    }

    /// Remove backups older than the retention period
    pub async fn cleanup(&self, now: DateTime<Utc>) -> ServerResult<u64> {
        let cutoff = now - Duration::days(self.retention_days);
        let expired = self
            .db
            .with_conn(|conn| BackupRecordStore::new(conn).created_before(cutoff))?;

        let mut removed = 0;
        for record in expired {
            if let Err(err) = self.store.delete(&record.filename).await {
                tracing::warn!(
                    filename = %record.filename,
                    error = %err,
                    "failed to delete backup file"
                );
                continue;
            }
            self.db
                .with_conn(|conn| BackupRecordStore::new(conn).delete(&record.id))?;
            removed += 1;
        }
        if removed > 0 {
            tracing::info!(removed, "expired backups removed");
        }
        Ok(removed)
    }
}
