// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Accounts, credentials, profiles and preferences

use crate::codec::{conflict_on_unique, json, like_pattern, new_id, text_enum, to_json, Filter};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use folio_api_contract::{
    BanDuration, NotificationPreferences, UpdateProfileRequest, UpdateUserRequest, User,
    UserFilter, UserProfile, UserRole, UserStatus,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const STATUS_BAN_REASON: &str = "Banned by administrator";

const USER_COLUMNS: &str = "id, email, name, role, status, image, banned_until, ban_reason, \
     login_attempts, last_login, two_factor_enabled, created_at, updated_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        role: text_enum(row, 3)?,
        status: text_enum(row, 4)?,
        image: row.get(5)?,
        banned_until: row.get(6)?,
        ban_reason: row.get(7)?,
        login_attempts: row.get(8)?,
        last_login: row.get(9)?,
        two_factor_enabled: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

/// An account together with its password hash; never serialized
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

pub struct UserStore<'a> {
    conn: &'a Connection,
}

impl<'a> UserStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn create(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<User> {
        let id = new_id();
        let now = Utc::now();
        self.conn
            .execute(
                "INSERT INTO users (id, email, name, password_hash, role, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'active', ?6, ?6)",
                params![id, email.trim(), name, password_hash, role.as_str(), now],
            )
            .map_err(|e| conflict_on_unique(e, || format!("email {email} is already registered")))?;
        self.get(&id)
    }

    /// Re-insert an account from a snapshot with a placeholder password
    pub fn restore(&self, user: &User, password_hash: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO users (id, email, name, password_hash, role, status, image,
                 banned_until, ban_reason, login_attempts, last_login, two_factor_enabled,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                user.id,
                user.email,
                user.name,
                password_hash,
                user.role.as_str(),
                user.status.as_str(),
                user.image,
                user.banned_until,
                user.ban_reason,
                user.login_attempts,
                user.last_login,
                user.two_factor_enabled,
                user.created_at,
                user.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<User> {
        self.find(id)?.ok_or_else(|| Error::not_found("user", id))
    }

    pub fn find(&self, id: &str) -> Result<Option<User>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()?)
    }

    /// Case-insensitive lookup used by login
    pub fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1"),
                params![email.trim()],
                |row| {
                    Ok(UserCredentials {
                        user: user_from_row(row)?,
                        password_hash: row.get(13)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn password_hash(&self, id: &str) -> Result<String> {
        self.conn
            .query_row(
                "SELECT password_hash FROM users WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::not_found("user", id))
    }

    /// Newest first
    pub fn list(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let mut where_ = Filter::default();
        if let Some(status) = filter.status {
            where_.push("status = ?", status.as_str());
        }
        if let Some(role) = filter.role {
            where_.push("role = ?", role.as_str());
        }
        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            where_.push_repeated(
                "(name LIKE {} ESCAPE '\\' OR email LIKE {} ESCAPE '\\')",
                like_pattern(q),
            );
        }
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users{} ORDER BY created_at DESC, rowid DESC",
            where_.where_sql()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let users = stmt
            .query_map(where_.params(), user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    pub fn search(&self, term: &str, limit: u32) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE name LIKE ?1 ESCAPE '\\' OR email LIKE ?1 ESCAPE '\\'
             ORDER BY created_at DESC, rowid DESC LIMIT ?2"
        ))?;
        let users = stmt
            .query_map(params![like_pattern(term), limit], user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    pub fn with_role(&self, role: UserRole) -> Result<Vec<User>> {
        self.list(&UserFilter {
            role: Some(role),
            ..Default::default()
        })
    }

    pub fn update(&self, id: &str, update: &UpdateUserRequest) -> Result<User> {
        let changed = self.conn.execute(
            "UPDATE users SET
                 name = COALESCE(?2, name),
                 role = COALESCE(?3, role),
                 status = COALESCE(?4, status),
                 image = COALESCE(?5, image),
                 updated_at = ?6
             WHERE id = ?1",
            params![
                id,
                update.name,
                update.role.map(|r| r.as_str()),
                update.status.map(|s| s.as_str()),
                update.image,
                Utc::now(),
            ],
        )?;
        if changed == 0 {
            return Err(Error::not_found("user", id));
        }
        self.get(id)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(Error::not_found("user", id));
        }
        Ok(())
    }

    /// Set the status; leaving the banned state clears the ban fields.
    ///
    /// Banning this way is permanent unless a ban is already running.
    pub fn set_status(&self, id: &str, status: UserStatus) -> Result<User> {
        let changed = if status == UserStatus::Banned {
            let now = Utc::now();
            self.conn.execute(
                "UPDATE users SET status = 'banned',
                     banned_until = CASE WHEN status = 'banned' AND banned_until > ?2
                                         THEN banned_until ELSE ?3 END,
                     ban_reason = COALESCE(ban_reason, ?4),
                     updated_at = ?2
                 WHERE id = ?1",
                params![id, now, BanDuration::Permanent.banned_until(now), STATUS_BAN_REASON],
            )?
        } else {
            self.conn.execute(
                "UPDATE users SET status = ?2, banned_until = NULL, ban_reason = NULL, updated_at = ?3
                 WHERE id = ?1",
                params![id, status.as_str(), Utc::now()],
            )?
        };
        if changed == 0 {
            return Err(Error::not_found("user", id));
        }
        self.get(id)
    }

    /// Ban until `until`; also resets the failed-attempt counter
    pub fn ban(&self, id: &str, until: DateTime<Utc>, reason: &str) -> Result<User> {
        let changed = self.conn.execute(
            "UPDATE users SET status = 'banned', banned_until = ?2, ban_reason = ?3,
                 login_attempts = 0, updated_at = ?4
             WHERE id = ?1",
            params![id, until, reason, Utc::now()],
        )?;
        if changed == 0 {
            return Err(Error::not_found("user", id));
        }
        self.get(id)
    }

    pub fn unban(&self, id: &str) -> Result<User> {
        self.set_status(id, UserStatus::Active)
    }

    /// Increment the failed-attempt counter and return the new value
    pub fn record_failed_attempt(&self, id: &str) -> Result<u32> {
        self.conn
            .query_row(
                "UPDATE users SET login_attempts = login_attempts + 1 WHERE id = ?1
                 RETURNING login_attempts",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::not_found("user", id))
    }

    pub fn record_successful_login(&self, id: &str, at: DateTime<Utc>) -> Result<User> {
        self.conn.execute(
            "UPDATE users SET login_attempts = 0, last_login = ?2 WHERE id = ?1",
            params![id, at],
        )?;
        self.get(id)
    }

    /// Replace the password hash and clear failed attempts
    pub fn set_password(&self, id: &str, password_hash: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE users SET password_hash = ?2, login_attempts = 0, updated_at = ?3 WHERE id = ?1",
            params![id, password_hash, Utc::now()],
        )?;
        if changed == 0 {
            return Err(Error::not_found("user", id));
        }
        Ok(())
    }

    pub fn set_two_factor(&self, id: &str, enabled: bool) -> Result<User> {
        let changed = self.conn.execute(
            "UPDATE users SET two_factor_enabled = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, enabled, Utc::now()],
        )?;
        if changed == 0 {
            return Err(Error::not_found("user", id));
        }
        self.get(id)
    }

    pub fn count(&self) -> Result<u64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
    }

    /// Accounts created in `[since, until)`
    pub fn count_created_between(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Result<u64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE created_at >= ?1 AND created_at < ?2",
            params![since, until],
            |row| row.get(0),
        )?)
    }

    /// Sign-ups per UTC day since `since`
    pub fn signups_by_day(&self, since: DateTime<Utc>) -> Result<Vec<(NaiveDate, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT substr(created_at, 1, 10) AS day, COUNT(*) FROM users
             WHERE created_at >= ?1 GROUP BY day ORDER BY day",
        )?;
        let rows = stmt
            .query_map(params![since], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn profile(&self, id: &str) -> Result<UserProfile> {
        self.conn
            .query_row(
                "SELECT name, email, phone, image, bio, location, website, social_links, preferences
                 FROM users WHERE id = ?1",
                params![id],
                |row| {
                    Ok(UserProfile {
                        name: row.get(0)?,
                        email: row.get(1)?,
                        phone: row.get(2)?,
                        avatar: row.get(3)?,
                        bio: row.get(4)?,
                        location: row.get(5)?,
                        website: row.get(6)?,
                        social_links: json(row, 7)?,
                        preferences: json(row, 8)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| Error::not_found("user", id))
    }

    pub fn update_profile(&self, id: &str, update: &UpdateProfileRequest) -> Result<UserProfile> {
        let social_links = update.social_links.as_ref().map(to_json).transpose()?;
        let preferences = update.preferences.as_ref().map(to_json).transpose()?;
        let changed = self.conn.execute(
            "UPDATE users SET
                 name = COALESCE(?2, name),
                 phone = COALESCE(?3, phone),
                 image = COALESCE(?4, image),
                 bio = COALESCE(?5, bio),
                 location = COALESCE(?6, location),
                 website = COALESCE(?7, website),
                 social_links = COALESCE(?8, social_links),
                 preferences = COALESCE(?9, preferences),
                 updated_at = ?10
             WHERE id = ?1",
            params![
                id,
                update.name,
                update.phone,
                update.avatar,
                update.bio,
                update.location,
                update.website,
                social_links,
                preferences,
                Utc::now(),
            ],
        )?;
        if changed == 0 {
            return Err(Error::not_found("user", id));
        }
        self.profile(id)
    }

    /// Stored preferences merged over the defaults
    pub fn notification_preferences(&self, id: &str) -> Result<NotificationPreferences> {
        self.conn
            .query_row(
                "SELECT notification_preferences FROM users WHERE id = ?1",
                params![id],
                |row| json(row, 0),
            )
            .optional()?
            .ok_or_else(|| Error::not_found("user", id))
    }

    pub fn set_notification_preferences(
        &self,
        id: &str,
        preferences: &NotificationPreferences,
    ) -> Result<NotificationPreferences> {
        let changed = self.conn.execute(
            "UPDATE users SET notification_preferences = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, to_json(preferences)?, Utc::now()],
        )?;
        if changed == 0 {
            return Err(Error::not_found("user", id));
        }
        Ok(preferences.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::Duration;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn duplicate_email_conflicts_case_insensitively() {
        let db = db();
        db.with_conn(|conn| {
            let users = UserStore::new(conn);
            users.create("ada@example.com", "Ada", "h", UserRole::Admin)?;
            let err = users
                .create("ADA@example.com", "Ada 2", "h", UserRole::User)
                .unwrap_err();
            assert!(matches!(err, Error::Conflict(_)));
            assert!(users.find_by_email("Ada@Example.com")?.is_some());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn ban_then_unban_clears_fields() {
        let db = db();
        db.with_conn(|conn| {
            let users = UserStore::new(conn);
            let user = users.create("u@example.com", "U", "h", UserRole::User)?;
            users.record_failed_attempt(&user.id)?;
            let until = Utc::now() + Duration::hours(1);
            let banned = users.ban(&user.id, until, "spam")?;
            assert_eq!(banned.status, UserStatus::Banned);
            assert_eq!(banned.login_attempts, 0);
            assert_eq!(banned.ban_reason.as_deref(), Some("spam"));

            let active = users.unban(&user.id)?;
            assert_eq!(active.status, UserStatus::Active);
            assert!(active.banned_until.is_none());
            assert!(active.ban_reason.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn status_ban_is_permanent_with_reason() {
        let db = db();
        db.with_conn(|conn| {
            let users = UserStore::new(conn);
            let user = users.create("s@example.com", "S", "h", UserRole::User)?;
            let banned = users.set_status(&user.id, UserStatus::Banned)?;
            assert_eq!(banned.status, UserStatus::Banned);
            assert_eq!(
                banned.banned_until.map(|d| d.to_rfc3339()).as_deref(),
                Some("2099-12-31T00:00:00+00:00")
            );
            assert_eq!(banned.ban_reason.as_deref(), Some("Banned by administrator"));

            let until = Utc::now() + Duration::hours(1);
            let timed = users.ban(&user.id, until, "spam")?;
            let kept = users.set_status(&user.id, UserStatus::Banned)?;
            assert_eq!(kept.banned_until, timed.banned_until);
            assert_eq!(kept.ban_reason.as_deref(), Some("spam"));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn failed_attempts_increment() {
        let db = db();
        db.with_conn(|conn| {
            let users = UserStore::new(conn);
            let user = users.create("x@example.com", "X", "h", UserRole::User)?;
            assert_eq!(users.record_failed_attempt(&user.id)?, 1);
            assert_eq!(users.record_failed_attempt(&user.id)?, 2);
            let user = users.record_successful_login(&user.id, Utc::now())?;
            assert_eq!(user.login_attempts, 0);
            assert!(user.last_login.is_some());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn list_filters_by_role_and_term() {
        let db = db();
        db.with_conn(|conn| {
            let users = UserStore::new(conn);
            users.create("ed@example.com", "Editor Ed", "h", UserRole::Editor)?;
            users.create("al@example.com", "Admin Al", "h", UserRole::Admin)?;
            let editors = users.with_role(UserRole::Editor)?;
            assert_eq!(editors.len(), 1);
            let found = users.list(&UserFilter {
                q: Some("admin".into()),
                ..Default::default()
            })?;
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].email, "al@example.com");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn preferences_default_when_unset() {
        let db = db();
        db.with_conn(|conn| {
            let users = UserStore::new(conn);
            let user = users.create("p@example.com", "P", "h", UserRole::User)?;
            let prefs = users.notification_preferences(&user.id)?;
            assert_eq!(prefs, NotificationPreferences::default());

            let mut changed = prefs.clone();
            changed.push_notifications = true;
            users.set_notification_preferences(&user.id, &changed)?;
            assert!(users.notification_preferences(&user.id)?.push_notifications);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn profile_patch_keeps_unset_fields() {
        let db = db();
        db.with_conn(|conn| {
            let users = UserStore::new(conn);
            let user = users.create("pr@example.com", "Pro", "h", UserRole::User)?;
            users.update_profile(
                &user.id,
                &UpdateProfileRequest {
                    bio: Some("Designer".into()),
                    ..Default::default()
                },
            )?;
            let profile = users.update_profile(
                &user.id,
                &UpdateProfileRequest {
                    location: Some("Lisbon".into()),
                    ..Default::default()
                },
            )?;
            assert_eq!(profile.bio.as_deref(), Some("Designer"));
            assert_eq!(profile.location.as_deref(), Some("Lisbon"));
            assert_eq!(profile.name, "Pro");
            Ok(())
        })
        .unwrap();
    }
}
