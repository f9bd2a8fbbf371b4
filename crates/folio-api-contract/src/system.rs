// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Settings, backup, search and dashboard types

use crate::accounts::ActivityEntry;
use crate::content::PostSummary;
use crate::types::{BackupKind, BackupStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

/// Id of the single settings row
pub const SETTINGS_ID: &str = "default";

/// Format version written into every backup document
pub const BACKUP_FORMAT_VERSION: &str = "1.0";

/// Settings document served when nothing has been stored yet
pub fn default_settings() -> Value {
    json!({
        "siteName": "Folio",
        "siteDescription": "",
        "theme": "system",
        "maintenanceMode": false,
        "smtp": {
            "host": "",
            "port": 587,
            "user": "",
            "password": "",
            "emailFrom": "",
            "emailTemplate": "default"
        },
        "security": {
            "enableTwoFactor": false,
            "maxLoginAttempts": 5,
            "sessionTimeout": 30,
            "passwordPolicy": {
                "minLength": 8,
                "requireNumbers": true,
                "requireSymbols": false
            }
        },
        "socialLinks": {},
        "analytics": {
            "googleAnalyticsId": "",
            "facebookPixelId": ""
        },
        "backup": {
            "autoBackup": false,
            "backupFrequency": "daily",
            "backupRetention": 30
        },
        "api": {
            "enableApi": false,
            "apiKey": null,
            "allowedOrigins": []
        },
        "notifications": {
            "notificationTypes": [],
            "pushEnabled": false
        },
        "customCode": {
            "customCss": "",
            "customJs": "",
            "headerScripts": "",
            "footerScripts": ""
        },
        "updatedBy": null,
        "updatedAt": null
    })
}

/// Merge `patch` into `target`. Objects merge key by key, a `null` in the
/// patch removes the key, anything else replaces the target value.
pub fn merge_json(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                if value.is_null() {
                    target.remove(key);
                } else {
                    merge_json(target.entry(key.clone()).or_insert(Value::Null), value);
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    pub api_key: String,
}

/// Backup bookkeeping row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    pub id: String,
    pub filename: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: BackupKind,
    pub status: BackupStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct BackupCreated {
    pub success: bool,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct RestoreRequest {
    #[validate(length(min = 1))]
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct BackupCleanup {
    pub removed: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum SearchResultType {
    Post,
    User,
    Portfolio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct SearchResult {
    pub id: String,
    #[serde(rename = "type")]
    pub result_type: SearchResultType,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct PostCounts {
    pub total: u64,
    pub published: u64,
    pub draft: u64,
}

/// `GET /dashboard/summary`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub posts: PostCounts,
    pub portfolio_items: u64,
    pub testimonials: u64,
    pub users: u64,
    pub unread_notifications: u64,
    pub recent_activities: Vec<ActivityEntry>,
    pub recent_posts: Vec<PostSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_deep_and_null_removes() {
        let mut settings = default_settings();
        merge_json(
            &mut settings,
            &json!({
                "siteName": "Studio",
                "backup": {"autoBackup": true},
                "updatedBy": null
            }),
        );
        assert_eq!(settings["siteName"], "Studio");
        assert_eq!(settings["backup"]["autoBackup"], true);
        assert_eq!(settings["backup"]["backupFrequency"], "daily");
        assert!(settings.get("updatedBy").is_none());
    }

    #[test]
    fn merge_replaces_non_objects() {
        let mut target = json!({"api": {"allowedOrigins": ["a"]}});
        merge_json(&mut target, &json!({"api": {"allowedOrigins": ["b", "c"]}}));
        assert_eq!(target["api"]["allowedOrigins"], json!(["b", "c"]));
    }
}
