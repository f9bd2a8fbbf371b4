// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Schema migrations tracked through `PRAGMA user_version`

use rusqlite::Connection;

/// Ordered migrations; index + 1 is the schema version after applying it
const MIGRATIONS: &[&str] = &[
    // v1: accounts, content, analytics
    r#"
    CREATE TABLE users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE COLLATE NOCASE,
        name TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'user',
        status TEXT NOT NULL DEFAULT 'active',
        image TEXT,
        banned_until TEXT,
        ban_reason TEXT,
        login_attempts INTEGER NOT NULL DEFAULT 0,
        last_login TEXT,
        two_factor_enabled INTEGER NOT NULL DEFAULT 0,
        phone TEXT,
        bio TEXT,
        location TEXT,
        website TEXT,
        social_links TEXT NOT NULL DEFAULT '{}',
        preferences TEXT NOT NULL DEFAULT '{}',
        notification_preferences TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE login_history (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        ip TEXT,
        user_agent TEXT,
        success INTEGER NOT NULL,
        reason TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX idx_login_history_user ON login_history(user_id, created_at);

    CREATE TABLE activity_log (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        action TEXT NOT NULL,
        description TEXT NOT NULL,
        metadata TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL
    );
    CREATE INDEX idx_activity_user ON activity_log(user_id, created_at);

    CREATE TABLE posts (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        content TEXT NOT NULL,
        excerpt TEXT,
        cover_image TEXT,
        category TEXT,
        read_time TEXT,
        status TEXT NOT NULL DEFAULT 'draft',
        tags TEXT NOT NULL DEFAULT '[]',
        views INTEGER NOT NULL DEFAULT 0,
        author_id TEXT REFERENCES users(id) ON DELETE SET NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX idx_posts_created ON posts(created_at);

    CREATE TABLE page_views (
        url TEXT PRIMARY KEY,
        post_id TEXT REFERENCES posts(id) ON DELETE SET NULL,
        views INTEGER NOT NULL DEFAULT 0,
        unique_views INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE portfolio (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        category TEXT NOT NULL,
        description TEXT NOT NULL,
        image TEXT NOT NULL,
        client TEXT,
        date TEXT,
        services TEXT NOT NULL DEFAULT '[]',
        budget TEXT,
        likes INTEGER NOT NULL DEFAULT 0,
        views INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'published',
        link TEXT,
        author_id TEXT REFERENCES users(id) ON DELETE SET NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE testimonials (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        position TEXT NOT NULL DEFAULT '',
        company TEXT NOT NULL DEFAULT '',
        image TEXT,
        rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
        review TEXT NOT NULL,
        project_type TEXT NOT NULL DEFAULT '',
        date TEXT NOT NULL DEFAULT '',
        author_id TEXT REFERENCES users(id) ON DELETE SET NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE pricing_plans (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        price_cents INTEGER NOT NULL CHECK (price_cents >= 0),
        currency TEXT NOT NULL DEFAULT 'USD',
        duration TEXT,
        description TEXT NOT NULL DEFAULT '',
        features TEXT NOT NULL DEFAULT '[]',
        delivery_time TEXT NOT NULL DEFAULT '',
        revisions TEXT NOT NULL DEFAULT '',
        sort_order INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE analytics_events (
        id TEXT PRIMARY KEY,
        page_url TEXT NOT NULL,
        user_agent TEXT,
        browser TEXT NOT NULL,
        device TEXT NOT NULL,
        os TEXT NOT NULL,
        country TEXT NOT NULL,
        city TEXT,
        ip TEXT NOT NULL,
        session_id TEXT,
        referrer TEXT,
        event_type TEXT NOT NULL DEFAULT 'pageview',
        click_x INTEGER,
        click_y INTEGER,
        timestamp TEXT NOT NULL
    );
    CREATE INDEX idx_analytics_timestamp ON analytics_events(timestamp);
    "#,
    // v2: notifications, settings, security, backups
    r#"
    CREATE TABLE notifications (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        message TEXT NOT NULL,
        kind TEXT NOT NULL DEFAULT 'info',
        category TEXT NOT NULL DEFAULT 'system',
        link TEXT,
        read INTEGER NOT NULL DEFAULT 0,
        metadata TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL
    );
    CREATE INDEX idx_notifications_user ON notifications(user_id, created_at);

    CREATE TABLE settings (
        id TEXT PRIMARY KEY,
        document TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE security_logs (
        id TEXT PRIMARY KEY,
        event_type TEXT NOT NULL,
        severity TEXT NOT NULL,
        message TEXT NOT NULL,
        details TEXT NOT NULL DEFAULT '{}',
        ip TEXT,
        user_agent TEXT,
        user_id TEXT,
        resolved INTEGER NOT NULL DEFAULT 0,
        resolved_by TEXT,
        resolved_at TEXT,
        created_at TEXT NOT NULL
    );
    CREATE INDEX idx_security_logs_created ON security_logs(created_at);

    CREATE TABLE security_alerts (
        id TEXT PRIMARY KEY,
        log_id TEXT NOT NULL REFERENCES security_logs(id) ON DELETE CASCADE,
        event_type TEXT NOT NULL,
        severity TEXT NOT NULL,
        message TEXT NOT NULL,
        notification_sent INTEGER NOT NULL,
        error TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE blocked_ips (
        ip TEXT PRIMARY KEY,
        reason TEXT NOT NULL,
        expires_at TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE security_rules (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        rule_type TEXT NOT NULL,
        pattern TEXT,
        enabled INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL
    );

    CREATE TABLE security_audit (
        id TEXT PRIMARY KEY,
        action TEXT NOT NULL,
        user_id TEXT NOT NULL,
        details TEXT NOT NULL DEFAULT '{}',
        ip_address TEXT,
        user_agent TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE backups (
        id TEXT PRIMARY KEY,
        filename TEXT NOT NULL UNIQUE,
        size INTEGER NOT NULL DEFAULT 0,
        kind TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    "#,
];

/// Latest schema version this build knows about
pub fn latest_version() -> i64 {
    MIGRATIONS.len() as i64
}

/// Apply every migration newer than the database's `user_version`
pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    let current: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    for (index, sql) in MIGRATIONS.iter().enumerate().skip(current.max(0) as usize) {
        let version = index as i64 + 1;
        tracing::debug!(version, "Applying schema migration");
        conn.execute_batch(&format!("BEGIN;\n{sql}\nPRAGMA user_version = {version};\nCOMMIT;"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        let version: i64 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, latest_version());
    }
}
