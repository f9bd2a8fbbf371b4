// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Site settings with a read-through cache

use crate::auth::random_secret;
use crate::error::{ServerError, ServerResult};
use chrono::Utc;
use folio_api_contract::{default_settings, merge_json};
use folio_local_db::{Database, SettingsStore};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct Cached {
    loaded_at: Instant,
    document: Value,
}

/// Cached document and a counter bumped on every invalidation
#[derive(Default)]
struct SettingsCache {
    entry: Option<Cached>,
    generation: u64,
}

pub struct SettingsService {
    db: Arc<Database>,
    ttl: Duration,
    cache: RwLock<SettingsCache>,
}

impl SettingsService {
    pub fn new(db: Arc<Database>, ttl: Duration) -> Self {
        Self {
            db,
            ttl,
            cache: RwLock::new(SettingsCache::default()),
        }
    }

    /// Stored document merged over the defaults, bypassing the cache
    fn load(&self) -> ServerResult<Value> {
        let mut document = default_settings();
        if let Some(stored) = self.db.with_conn(|conn| SettingsStore::new(conn).get())? {
            merge_json(&mut document, &stored);
        }
        Ok(document)
    }

    pub async fn get(&self) -> ServerResult<Value> {
        let generation = {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.entry.as_ref() {
                if cached.loaded_at.elapsed() < self.ttl {
                    return Ok(cached.document.clone());
                }
            }
            cache.generation
        };

        let document = self.load()?;
        self.remember(generation, document.clone()).await;
        Ok(document)
    }

    /// Cache a document read at `generation`, unless a write invalidated it since
    async fn remember(&self, generation: u64, document: Value) {
        let mut cache = self.cache.write().await;
        if cache.generation == generation {
            cache.entry = Some(Cached {
                loaded_at: Instant::now(),
                document,
            });
        }
    }

    /// Deep-merge `patch` into the stored document
    pub async fn update(&self, patch: &Value, updated_by: &str) -> ServerResult<Value> {
        if !patch.is_object() {
            return Err(ServerError::BadRequest("settings patch must be a JSON object".into()));
        }
        let mut document = self.load()?;
        merge_json(&mut document, patch);
        self.store(document, updated_by).await
    }

    /// Replace the stored document wholesale
    pub async fn replace(&self, document: Value, updated_by: &str) -> ServerResult<Value> {
        if !document.is_object() {
            return Err(ServerError::BadRequest("settings document must be a JSON object".into()));
        }
        let mut merged = default_settings();
        merge_json(&mut merged, &document);
        self.store(merged, updated_by).await
    }

    async fn store(&self, mut document: Value, updated_by: &str) -> ServerResult<Value> {
        merge_json(
            &mut document,
            &json!({ "updatedBy": updated_by, "updatedAt": Utc::now() }),
        );
        self.db
            .with_conn(|conn| SettingsStore::new(conn).put(&document))?;
        self.clear_cache().await;
        tracing::info!(updated_by, "settings updated");
        Ok(document)
    }

    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        cache.entry = None;
        cache.generation += 1;
    }

    /// Generate, store and return a fresh API key
    pub async fn rotate_api_key(&self, updated_by: &str) -> ServerResult<String> {
        let api_key = random_secret();
        self.update(&json!({ "api": { "apiKey": api_key } }), updated_by)
            .await?;
        Ok(api_key)
    }

    /// `(autoBackup, backupFrequency)` from the backup section
    pub async fn backup_policy(&self) -> ServerResult<(bool, String)> {
        let document = self.get().await?;
        let backup = &document["backup"];
        Ok((
            backup["autoBackup"].as_bool().unwrap_or(false),
            backup["backupFrequency"]
                .as_str()
                .unwrap_or("daily")
                .to_string(),
        ))
    }
}
