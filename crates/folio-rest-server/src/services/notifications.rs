// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Notification dispatch honouring per-user preferences

use crate::error::{ServerError, ServerResult};
use async_trait::async_trait;
use chrono::{Duration, Local, NaiveTime, Utc};
use folio_api_contract::{NewNotification, Notification, NotificationPreferences, User, UserRole};
use folio_local_db::{Database, NotificationStore, UserStore};
use serde_json::json;
use std::sync::Arc;

/// Out-of-band delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationChannel {
    Email,
    Push,
}

impl NotificationChannel {
    fn enabled_in(self, preferences: &NotificationPreferences) -> bool {
        match self {
            NotificationChannel::Email => preferences.email_notifications,
            NotificationChannel::Push => preferences.push_notifications,
        }
    }
}

/// Delivers a stored notification outside the dashboard (e-mail, push)
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn channel(&self) -> NotificationChannel;

    async fn deliver(&self, user: &User, notification: &Notification) -> anyhow::Result<()>;
}

/// Sink that only records the delivery in the log
pub struct LogSink {
    channel: NotificationChannel,
}

impl LogSink {
    pub fn new(channel: NotificationChannel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl NotificationSink for LogSink {
    fn channel(&self) -> NotificationChannel {
        self.channel
    }

    async fn deliver(&self, user: &User, notification: &Notification) -> anyhow::Result<()> {
        tracing::info!(
            channel = ?self.channel,
            user_id = %user.id,
            title = %notification.title,
            "notification delivered"
        );
        Ok(())
    }
}

/// Which admins a fan-out notification is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    System,
    NewUser,
    NewPost,
    Security,
}

impl Audience {
    fn wants(self, preferences: &NotificationPreferences) -> bool {
        match self {
            Audience::System => true,
            Audience::NewUser => preferences.notify_on_new_users,
            Audience::NewPost => preferences.notify_on_new_posts,
            Audience::Security => preferences.security_alerts,
        }
    }
}

pub struct NotificationService {
    db: Arc<Database>,
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl NotificationService {
    pub fn new(db: Arc<Database>, sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { db, sinks }
    }

    /// Send to one user at the current local time.
    ///
    /// Returns `None` when the user's quiet hours suppressed it.
    pub async fn send(
        &self,
        user_id: &str,
        new: &NewNotification,
    ) -> ServerResult<Option<Notification>> {
        self.send_at(user_id, new, Local::now().time()).await
    }

    pub async fn send_at(
        &self,
        user_id: &str,
        new: &NewNotification,
        local_time: NaiveTime,
    ) -> ServerResult<Option<Notification>> {
        let (user, preferences) = self.db.with_conn(|conn| {
            let users = UserStore::new(conn);
            Ok((users.get(user_id)?, users.notification_preferences(user_id)?))
        })?;

        if preferences.quiet_hours.contains(local_time) {
            tracing::debug!(user_id, title = %new.title, "notification suppressed by quiet hours");
            return Ok(None);
        }

        let metadata = json!({
            "playSound": new.play_sound && preferences.sound_enabled,
            "volume": preferences.notification_volume,
        });
        let notification = self
            .db
            .with_conn(|conn| NotificationStore::new(conn).insert(user_id, new, metadata))?;

        for sink in self
            .sinks
            .iter()
            .filter(|sink| sink.channel().enabled_in(&preferences))
        {
            if let Err(err) = sink.deliver(&user, &notification).await {
                tracing::warn!(
                    channel = ?sink.channel(),
                    user_id,
                    error = %err,
                    "notification delivery failed"
                );
            }
        }

        Ok(Some(notification))
    }

    /// Fan out to every admin interested in `audience`; returns how many were stored
    pub async fn notify_admins(
        &self,
        audience: Audience,
        new: &NewNotification,
    ) -> ServerResult<usize> {
        let admins = self.db.with_conn(|conn| {
            let users = UserStore::new(conn);
            let mut interested = Vec::new();
            for admin in users.with_role(UserRole::Admin)? {
                if audience.wants(&users.notification_preferences(&admin.id)?) {
                    interested.push(admin.id);
                }
            }
            Ok(interested)
        })?;

        let mut sent = 0;
        for admin_id in admins {
            if self.send(&admin_id, new).await?.is_some() {
                sent += 1;
            }
        }
        Ok(sent)
    }

    /// Send the same notification to each listed user.
    ///
    /// Nothing is sent unless every id names an existing user.
    pub async fn send_bulk(
        &self,
        user_ids: &[String],
        new: &NewNotification,
    ) -> ServerResult<usize> {
        let unknown = self.db.with_conn(|conn| {
            let users = UserStore::new(conn);
            let mut unknown = Vec::new();
            for user_id in user_ids {
                if users.find(user_id)?.is_none() {
                    unknown.push(user_id.as_str());
                }
            }
            Ok(unknown)
        })?;
        if !unknown.is_empty() {
            return Err(ServerError::NotFound(format!(
                "unknown users: {}",
                unknown.join(", ")
            )));
        }

        let mut sent = 0;
        for user_id in user_ids {
            if self.send(user_id, new).await?.is_some() {
                sent += 1;
            }
        }
        Ok(sent)
    }

    /// Delete read notifications older than `retention_days`
    pub fn cleanup(&self, retention_days: i64) -> ServerResult<u64> {
        let cutoff = Utc::now() - Duration::days(retention_days);
        let removed = self
            .db
            .with_conn(|conn| NotificationStore::new(conn).delete_read_before(cutoff))?;
        if removed > 0 {
            tracing::info!(removed, "old notifications cleaned up");
        }
        Ok(removed)
    }
}
