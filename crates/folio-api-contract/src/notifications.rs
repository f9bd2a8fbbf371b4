// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Notification and notification-preference types

use crate::error::ApiContractError;
use crate::types::NotificationKind;
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Stored notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub category: String,
    pub link: Option<String>,
    pub read: bool,
    #[cfg_attr(feature = "utoipa", schema(value_type = Object))]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Notification about to be dispatched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
    #[serde(default = "default_category")]
    pub category: String,
    pub link: Option<String>,
    #[serde(default)]
    pub play_sound: bool,
}

fn default_category() -> String {
    "system".to_string()
}

impl NewNotification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind: NotificationKind::Info,
            category: default_category(),
            link: None,
            play_sound: false,
        }
    }

    pub fn kind(mut self, kind: NotificationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_sound(mut self) -> Self {
        self.play_sound = true;
        self
    }
}

/// Admin request fanning a notification out to several users
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct BulkNotificationRequest {
    #[validate(length(min = 1))]
    pub user_ids: Vec<String>,
    #[validate(nested)]
    pub notification: NewNotification,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<u32>,
}

/// Daily window during which notifications are suppressed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct QuietHours {
    pub enabled: bool,
    /// `HH:MM`
    pub start: String,
    /// `HH:MM`
    pub end: String,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start: "22:00".to_string(),
            end: "07:00".to_string(),
        }
    }
}

fn parse_clock(raw: &str) -> Result<NaiveTime, ApiContractError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| ApiContractError::InvalidTime(raw.to_string()))
}

impl QuietHours {
    /// Parsed `(start, end)` times
    pub fn window(&self) -> Result<(NaiveTime, NaiveTime), ApiContractError> {
        Ok((parse_clock(&self.start)?, parse_clock(&self.end)?))
    }

    /// Whether `now` falls inside the window. The window is half-open
    /// `[start, end)`, wraps midnight when `start > end` and is empty when
    /// `start == end`. Unparseable bounds never suppress anything.
    pub fn contains(&self, now: NaiveTime) -> bool {
        if !self.enabled {
            return false;
        }
        let Ok((start, end)) = self.window() else {
            return false;
        };
        if start == end {
            false
        } else if start < end {
            now >= start && now < end
        } else {
            now >= start || now < end
        }
    }
}

/// Per-user notification preferences. Missing keys take their defaults, so a
/// stored partial document is always readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub sound_enabled: bool,
    pub desktop_notifications: bool,
    pub notify_on_new_users: bool,
    pub notify_on_new_posts: bool,
    pub notify_on_comments: bool,
    pub notify_on_mentions: bool,
    pub browser_notifications: bool,
    pub security_alerts: bool,
    pub maintenance_alerts: bool,
    pub digest_emails: String,
    pub notification_volume: f64,
    pub quiet_hours: QuietHours,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email_notifications: true,
            push_notifications: false,
            sound_enabled: true,
            desktop_notifications: false,
            notify_on_new_users: true,
            notify_on_new_posts: true,
            notify_on_comments: true,
            notify_on_mentions: true,
            browser_notifications: false,
            security_alerts: true,
            maintenance_alerts: true,
            digest_emails: "never".to_string(),
            notification_volume: 0.5,
            quiet_hours: QuietHours::default(),
        }
    }
}

impl NotificationPreferences {
    /// Rejects values the dispatcher cannot act on
    pub fn check(&self) -> Result<(), ApiContractError> {
        self.quiet_hours.window()?;
        if !(0.0..=1.0).contains(&self.notification_volume) {
            return Err(ApiContractError::InvalidRange(format!(
                "notificationVolume {}",
                self.notification_volume
            )));
        }
        Ok(())
    }
}
