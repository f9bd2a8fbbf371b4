// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Analytics events and per-URL page views

use crate::codec::{new_id, text_enum};
use crate::Result;
use chrono::{DateTime, Utc};
use folio_api_contract::{AnalyticsEvent, CountryCount, EventType, HeatmapPoint, PageView};
use rusqlite::{params, Connection, Row};

const EVENT_COLUMNS: &str = "id, page_url, user_agent, browser, device, os, country, city, ip, \
     session_id, referrer, event_type, click_x, click_y, timestamp";

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<AnalyticsEvent> {
    Ok(AnalyticsEvent {
        id: row.get(0)?,
        page_url: row.get(1)?,
        user_agent: row.get(2)?,
        browser: row.get(3)?,
        device: row.get(4)?,
        os: row.get(5)?,
        country: row.get(6)?,
        city: row.get(7)?,
        ip: row.get(8)?,
        session_id: row.get(9)?,
        referrer: row.get(10)?,
        event_type: text_enum(row, 11)?,
        click_x: row.get(12)?,
        click_y: row.get(13)?,
        timestamp: row.get(14)?,
    })
}

/// Normalised event ready for insertion
#[derive(Debug, Clone, Default)]
pub struct NewAnalyticsEvent {
    pub page_url: String,
    pub user_agent: Option<String>,
    pub browser: String,
    pub device: String,
    pub os: String,
    pub country: String,
    pub city: Option<String>,
    pub ip: String,
    pub session_id: Option<String>,
    pub referrer: Option<String>,
    pub event_type: EventType,
    pub click_x: Option<i64>,
    pub click_y: Option<i64>,
}

pub struct AnalyticsStore<'a> {
    conn: &'a Connection,
}

impl<'a> AnalyticsStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<AnalyticsEvent>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, event_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn insert(&self, event: &NewAnalyticsEvent) -> Result<AnalyticsEvent> {
        self.insert_at(event, Utc::now())
    }

    pub fn insert_at(
        &self,
        event: &NewAnalyticsEvent,
        at: DateTime<Utc>,
    ) -> Result<AnalyticsEvent> {
        let stored = AnalyticsEvent {
            id: new_id(),
            page_url: event.page_url.clone(),
            user_agent: event.user_agent.clone(),
            browser: event.browser.clone(),
            device: event.device.clone(),
            os: event.os.clone(),
            country: event.country.clone(),
            city: event.city.clone(),
            ip: event.ip.clone(),
            session_id: event.session_id.clone(),
            referrer: event.referrer.clone(),
            event_type: event.event_type,
            click_x: event.click_x,
            click_y: event.click_y,
            timestamp: at,
        };
        self.conn.execute(
            &format!(
                "INSERT INTO analytics_events ({EVENT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
            ),
            params![
                stored.id,
                stored.page_url,
                stored.user_agent,
                stored.browser,
                stored.device,
                stored.os,
                stored.country,
                stored.city,
                stored.ip,
                stored.session_id,
                stored.referrer,
                stored.event_type.as_str(),
                stored.click_x,
                stored.click_y,
                stored.timestamp,
            ],
        )?;
        Ok(stored)
    }

    /// Events in `[since, until)`, oldest first
    pub fn between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<AnalyticsEvent>> {
        self.query(
            &format!(
                "SELECT {EVENT_COLUMNS} FROM analytics_events
                 WHERE timestamp >= ?1 AND timestamp < ?2 ORDER BY timestamp, rowid"
            ),
            params![since, until],
        )
    }

    /// Events since `since`, newest first
    pub fn recent(&self, since: DateTime<Utc>, limit: Option<u32>) -> Result<Vec<AnalyticsEvent>> {
        let limit = limit.map(i64::from).unwrap_or(-1);
        self.query(
            &format!(
                "SELECT {EVENT_COLUMNS} FROM analytics_events
                 WHERE timestamp >= ?1 ORDER BY timestamp DESC, rowid DESC LIMIT ?2"
            ),
            params![since, limit],
        )
    }

    /// Most recent events regardless of age
    pub fn latest(&self, limit: u32) -> Result<Vec<AnalyticsEvent>> {
        self.query(
            &format!(
                "SELECT {EVENT_COLUMNS} FROM analytics_events
                 ORDER BY timestamp DESC, rowid DESC LIMIT ?1"
            ),
            params![limit],
        )
    }

    /// Distinct session ids; events without one are not counted
    pub fn distinct_sessions_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<u64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(DISTINCT session_id) FROM analytics_events
             WHERE timestamp >= ?1 AND timestamp < ?2",
            params![since, until],
            |row| row.get(0),
        )?)
    }

    /// Click counts grouped by position and page since `since`
    pub fn clicks_since(
        &self,
        since: DateTime<Utc>,
        page_url: Option<&str>,
    ) -> Result<Vec<HeatmapPoint>> {
        let mut stmt = self.conn.prepare(
            "SELECT click_x, click_y, page_url, COUNT(*) AS n FROM analytics_events
             WHERE event_type = 'click' AND timestamp >= ?1
               AND click_x IS NOT NULL AND click_y IS NOT NULL
               AND (?2 IS NULL OR page_url = ?2)
             GROUP BY click_x, click_y, page_url ORDER BY n DESC, page_url, click_x, click_y",
        )?;
        let rows = stmt
            .query_map(params![since, page_url], |row| {
                Ok(HeatmapPoint {
                    x: row.get(0)?,
                    y: row.get(1)?,
                    page_url: row.get(2)?,
                    value: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Countries by event count since `since`
    pub fn top_countries(&self, since: DateTime<Utc>, limit: u32) -> Result<Vec<CountryCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT country, COUNT(*) AS n FROM analytics_events WHERE timestamp >= ?1
             GROUP BY country ORDER BY n DESC, country LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![since, limit], |row| {
                Ok(CountryCount {
                    country: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

pub struct PageViewStore<'a> {
    conn: &'a Connection,
}

impl<'a> PageViewStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Count one view of `url`, creating the row on first sight
    pub fn record(&self, url: &str, post_id: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO page_views (url, post_id, views, unique_views) VALUES (?1, ?2, 1, 1)
             ON CONFLICT(url) DO UPDATE SET views = views + 1",
            params![url, post_id],
        )?;
        Ok(())
    }

    /// Most viewed first
    pub fn top(&self, limit: u32) -> Result<Vec<PageView>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, post_id, views, unique_views FROM page_views
             ORDER BY views DESC, url LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(PageView {
                    url: row.get(0)?,
                    post_id: row.get(1)?,
                    views: row.get(2)?,
                    unique_views: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn total_views(&self) -> Result<u64> {
        Ok(self
            .conn
            .query_row("SELECT COALESCE(SUM(views), 0) FROM page_views", [], |row| row.get(0))?)
    }
}
