// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Analytics capture and the aggregations behind the chart endpoints
//!
//! Everything here runs against a borrowed connection so handlers can call it
//! inside [`folio_local_db::Database::with_conn`] or a transaction.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use folio_api_contract::{
    AnalyticsEvent, DashboardResponse, DashboardStat, EventType, HeatmapPoint, LabeledCounts,
    NamedValue, OverviewCharts, OverviewRange, OverviewResponse, OverviewStats, PageStat,
    PostSummary, RealtimeResponse, RecentVisitor, TimeRange, TrackEventRequest, TrafficSeries,
    UserAnalyticsResponse, UserGrowthSeries, UserStats, UNKNOWN,
};
use folio_local_db::{
    AnalyticsStore, Connection, NewAnalyticsEvent, PageViewStore, PostStore, Result, UserStore,
};
use std::collections::{BTreeMap, HashMap, HashSet};

const REALTIME_WINDOW_MINUTES: i64 = 30;
const RECENT_VISITOR_MINUTES: i64 = 5;
const RECENT_VISITOR_LIMIT: usize = 10;
const HEATMAP_WINDOW_HOURS: i64 = 24;
const TOP_LIMIT: u32 = 10;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Percentage change against `previous`, one decimal; 0 when `previous` is 0
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    round1((current - previous) / previous * 100.0)
}

/// Like [`percent_change`] but growth from nothing counts as 100%
pub fn growth_percent(current: u64, previous: u64) -> f64 {
    if previous == 0 {
        return 100.0;
    }
    percent_change(current as f64, previous as f64)
}

/// Visitor identity: session id when present, otherwise the IP
fn visitor_key(event: &AnalyticsEvent) -> &str {
    event.session_id.as_deref().unwrap_or(&event.ip)
}

fn distinct_visitors<'a>(events: impl IntoIterator<Item = &'a AnalyticsEvent>) -> u64 {
    events
        .into_iter()
        .map(visitor_key)
        .collect::<HashSet<_>>()
        .len() as u64
}

/// Occurrences of each value, most frequent first, ties by name
fn ranked<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<(String, u64)> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    let mut ranked: Vec<(String, u64)> = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

pub fn labeled_counts<'a>(values: impl IntoIterator<Item = &'a str>) -> LabeledCounts {
    let (labels, values) = ranked(values).into_iter().unzip();
    LabeledCounts { labels, values }
}

/// Share of each value as a rounded percentage of the total
pub fn shares<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<NamedValue> {
    let ranked = ranked(values);
    let total: u64 = ranked.iter().map(|(_, count)| count).sum();
    ranked
        .into_iter()
        .map(|(name, count)| NamedValue {
            name,
            value: if total == 0 {
                0
            } else {
                (count as f64 / total as f64 * 100.0).round() as u64
            },
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SessionMetrics {
    pub sessions: u64,
    pub avg_duration_secs: f64,
    /// Percentage of sessions with exactly one page view
    pub bounce_rate: f64,
}

/// Duration and bounce figures over events carrying a session id
pub fn session_metrics(events: &[AnalyticsEvent]) -> SessionMetrics {
    struct Span {
        first: DateTime<Utc>,
        last: DateTime<Utc>,
        pageviews: u64,
    }

    let mut sessions: HashMap<&str, Span> = HashMap::new();
    for event in events {
        let Some(session_id) = event.session_id.as_deref() else {
            continue;
        };
        let span = sessions.entry(session_id).or_insert(Span {
            first: event.timestamp,
            last: event.timestamp,
            pageviews: 0,
        });
        span.first = span.first.min(event.timestamp);
        span.last = span.last.max(event.timestamp);
        if event.event_type == EventType::Pageview {
            span.pageviews += 1;
        }
    }

    if sessions.is_empty() {
        return SessionMetrics::default();
    }
    let count = sessions.len() as f64;
    let total_secs: f64 = sessions
        .values()
        .map(|span| (span.last - span.first).num_milliseconds() as f64 / 1000.0)
        .sum();
    let bounces = sessions.values().filter(|span| span.pageviews == 1).count() as f64;
    SessionMetrics {
        sessions: sessions.len() as u64,
        avg_duration_secs: round1(total_secs / count),
        bounce_rate: round1(bounces / count * 100.0),
    }
}

/// `2m 45s`
pub fn format_duration(secs: f64) -> String {
    let secs = secs.max(0.0).round() as u64;
    format!("{}m {}s", secs / 60, secs % 60)
}

/// Calendar days from `since` to `until`, both inclusive
pub fn day_buckets(since: DateTime<Utc>, until: DateTime<Utc>) -> Vec<NaiveDate> {
    let last = until.date_naive();
    since
        .date_naive()
        .iter_days()
        .take_while(|day| *day <= last)
        .collect()
}

fn day_label(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Fill defaults and resolve the client IP for a validated track request
pub fn normalize(request: TrackEventRequest, forwarded_for: Option<&str>) -> NewAnalyticsEvent {
    let or_unknown =
        |value: Option<String>| non_empty(value).unwrap_or_else(|| UNKNOWN.to_string());
    let forwarded = forwarded_for
        .and_then(|header| header.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string);
    NewAnalyticsEvent {
        page_url: request.page_url.unwrap_or_default(),
        user_agent: non_empty(request.user_agent),
        browser: or_unknown(request.browser),
        device: or_unknown(request.device),
        os: or_unknown(request.os),
        country: or_unknown(request.country),
        city: non_empty(request.city),
        ip: non_empty(request.ip)
            .or(forwarded)
            .unwrap_or_else(|| UNKNOWN.to_string()),
        session_id: non_empty(request.session_id),
        referrer: non_empty(request.referrer),
        event_type: request.event_type,
        click_x: request.click_x,
        click_y: request.click_y,
    }
}

/// Post slug addressed by a `/blog/...` URL
pub fn blog_slug(page_url: &str) -> Option<&str> {
    let path = page_url.split(['?', '#']).next()?;
    let rest = path.strip_prefix("/blog/")?;
    rest.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|slug| !slug.is_empty())
}

/// Store an event; page views of blog posts also bump the view counters
pub fn track(conn: &Connection, event: &NewAnalyticsEvent) -> Result<AnalyticsEvent> {
    let stored = AnalyticsStore::new(conn).insert(event)?;
    if stored.event_type != EventType::Pageview {
        return Ok(stored);
    }
    if let Some(slug) = blog_slug(&stored.page_url) {
        let posts = PostStore::new(conn);
        if let Some(post) = posts.find_by_slug(slug)? {
            PageViewStore::new(conn).record(&stored.page_url, &post.id)?;
            posts.increment_views(&post.id)?;
        }
    }
    Ok(stored)
}

pub fn overview(
    conn: &Connection,
    range: OverviewRange,
    now: DateTime<Utc>,
) -> Result<OverviewResponse> {
    let posts = PostStore::new(conn);
    let since = now - range.duration();
    let previous_since = since - range.duration();

    // All-time views against views of posts created in the previous window
    let total_views = posts.total_views()?;
    let previous_views = posts.views_of_posts_created_between(previous_since, since)?;
    let total_posts = posts.count()?;
    let new_posts = posts.count_created_since(since)?;
    let posts_change = if total_posts == 0 {
        0.0
    } else {
        round1(new_posts as f64 / total_posts as f64 * 100.0)
    };

    Ok(OverviewResponse {
        stats: OverviewStats {
            total_views,
            views_change: percent_change(total_views as f64, previous_views as f64),
            total_posts,
            posts_change,
        },
        charts: OverviewCharts {
            daily_views: posts.daily_views_since(since)?,
        },
        popular_posts: posts.popular(5)?.iter().map(PostSummary::from).collect(),
        recent_activities: posts.recent(10)?.iter().map(PostSummary::from).collect(),
    })
}

fn pageviews(events: &[AnalyticsEvent]) -> impl Iterator<Item = &AnalyticsEvent> {
    events
        .iter()
        .filter(|event| event.event_type == EventType::Pageview)
}

fn stat(label: &str, value: f64, display: String, trend: f64) -> DashboardStat {
    DashboardStat {
        label: label.to_string(),
        value,
        display,
        trend,
    }
}

pub fn dashboard(
    conn: &Connection,
    range: TimeRange,
    now: DateTime<Utc>,
) -> Result<DashboardResponse> {
    let analytics = AnalyticsStore::new(conn);
    let page_views = PageViewStore::new(conn);
    let since = now - range.duration();
    let previous_since = since - range.duration();

    let current = analytics.between(since, now)?;
    let previous = analytics.between(previous_since, since)?;

    let visitors = distinct_visitors(&current);
    let previous_visitors = distinct_visitors(&previous);
    let views = pageviews(&current).count() as f64;
    let previous_views = pageviews(&previous).count() as f64;
    let sessions = session_metrics(&current);
    let previous_sessions = session_metrics(&previous);
    let total_page_views = page_views.total_views()?;

    let stats = vec![
        stat(
            "Total Visitors",
            visitors as f64,
            visitors.to_string(),
            percent_change(visitors as f64, previous_visitors as f64),
        ),
        stat(
            "Page Views",
            total_page_views as f64,
            total_page_views.to_string(),
            percent_change(views, previous_views),
        ),
        stat(
            "Avg. Session Duration",
            sessions.avg_duration_secs,
            format_duration(sessions.avg_duration_secs),
            percent_change(sessions.avg_duration_secs, previous_sessions.avg_duration_secs),
        ),
        stat(
            "Bounce Rate",
            sessions.bounce_rate,
            format!("{:.1}%", sessions.bounce_rate),
            percent_change(sessions.bounce_rate, previous_sessions.bounce_rate),
        ),
    ];

    let days = day_buckets(since, now);
    let mut per_day: BTreeMap<NaiveDate, (u64, HashSet<&str>)> = days
        .iter()
        .map(|day| (*day, (0, HashSet::new())))
        .collect();
    for event in &current {
        if let Some((views, visitors)) = per_day.get_mut(&event.timestamp.date_naive()) {
            if event.event_type == EventType::Pageview {
                *views += 1;
            }
            visitors.insert(visitor_key(event));
        }
    }
    let mut traffic = TrafficSeries::default();
    for (day, (views, visitors)) in per_day {
        traffic.labels.push(day_label(day));
        traffic.pageviews.push(views);
        traffic.visitors.push(visitors.len() as u64);
    }

    Ok(DashboardResponse {
        stats,
        traffic,
        browsers: labeled_counts(current.iter().map(|e| e.browser.as_str())),
        devices: labeled_counts(current.iter().map(|e| e.device.as_str())),
        locations: analytics.top_countries(since, TOP_LIMIT)?,
        pages: page_views
            .top(TOP_LIMIT)?
            .into_iter()
            .map(PageStat::from)
            .collect(),
    })
}

pub fn realtime(conn: &Connection, now: DateTime<Utc>) -> Result<RealtimeResponse> {
    let events = AnalyticsStore::new(conn)
        .recent(now - Duration::minutes(REALTIME_WINDOW_MINUTES), None)?;
    Ok(RealtimeResponse {
        active_visitors: distinct_visitors(&events),
        devices: shares(events.iter().map(|e| e.device.as_str())),
        browsers: shares(events.iter().map(|e| e.browser.as_str())),
        recent_visitors: events
            .iter()
            .take(RECENT_VISITOR_LIMIT)
            .map(RecentVisitor::from)
            .collect(),
    })
}

pub fn recent_visitors(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<RecentVisitor>> {
    let events = AnalyticsStore::new(conn).recent(
        now - Duration::minutes(RECENT_VISITOR_MINUTES),
        Some(RECENT_VISITOR_LIMIT as u32),
    )?;
    Ok(events.iter().map(RecentVisitor::from).collect())
}

pub fn heatmap(
    conn: &Connection,
    page_url: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<HeatmapPoint>> {
    AnalyticsStore::new(conn).clicks_since(now - Duration::hours(HEATMAP_WINDOW_HOURS), page_url)
}

pub fn user_analytics(
    conn: &Connection,
    range: TimeRange,
    now: DateTime<Utc>,
) -> Result<UserAnalyticsResponse> {
    let users = UserStore::new(conn);
    let analytics = AnalyticsStore::new(conn);
    let since = now - range.duration();
    let previous_since = since - range.duration();

    let new_users = users.count_created_between(since, now)?;
    let previous_new_users = users.count_created_between(previous_since, since)?;

    let days = day_buckets(since, now);
    let signups: HashMap<NaiveDate, u64> = users.signups_by_day(since)?.into_iter().collect();
    let mut sessions_per_day: HashMap<NaiveDate, HashSet<String>> = HashMap::new();
    for event in analytics.between(since, now)? {
        if let Some(session_id) = event.session_id {
            sessions_per_day
                .entry(event.timestamp.date_naive())
                .or_default()
                .insert(session_id);
        }
    }

    let growth = UserGrowthSeries {
        labels: days.iter().copied().map(day_label).collect(),
        new_users: days
            .iter()
            .map(|day| signups.get(day).copied().unwrap_or(0))
            .collect(),
        active_users: days
            .iter()
            .map(|day| sessions_per_day.get(day).map_or(0, |set| set.len() as u64))
            .collect(),
    };

    Ok(UserAnalyticsResponse {
        stats: UserStats {
            total_users: users.count()?,
            active_users: analytics.distinct_sessions_between(since, now)?,
            new_users,
            user_growth: growth_percent(new_users, previous_new_users),
        },
        growth,
        user_locations: analytics.top_countries(since, TOP_LIMIT)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_api_contract::{PostInput, PostStatus, UserRole};
    use folio_local_db::Database;

    fn event(session: &str, device: &str, event_type: EventType) -> NewAnalyticsEvent {
        NewAnalyticsEvent {
            page_url: "/".into(),
            browser: "Firefox".into(),
            device: device.into(),
            os: "Linux".into(),
            country: "PT".into(),
            ip: "10.0.0.1".into(),
            session_id: Some(session.into()),
            event_type,
            ..Default::default()
        }
    }

    #[test]
    fn percentages_never_divide_by_zero() {
        assert_eq!(percent_change(5.0, 0.0), 0.0);
        assert_eq!(percent_change(15.0, 10.0), 50.0);
        assert_eq!(percent_change(1.0, 3.0), -66.7);
        assert_eq!(growth_percent(3, 0), 100.0);
        assert_eq!(growth_percent(0, 0), 100.0);
        assert_eq!(growth_percent(2, 4), -50.0);
    }

    #[test]
    fn shares_are_rounded_and_sorted() {
        let shares = shares(["mobile", "desktop", "mobile"]);
        assert_eq!(
            shares,
            vec![
                NamedValue { name: "mobile".into(), value: 67 },
                NamedValue { name: "desktop".into(), value: 33 },
            ]
        );
    }

    #[test]
    fn session_metrics_count_bounces() {
        let db = Database::open_in_memory().unwrap();
        let start = Utc::now() - Duration::hours(1);
        let events = db
            .with_conn(|conn| {
                let store = AnalyticsStore::new(conn);
                Ok(vec![
                    store.insert_at(&event("a", "desktop", EventType::Pageview), start)?,
                    store.insert_at(
                        &event("a", "desktop", EventType::Pageview),
                        start + Duration::seconds(120),
                    )?,
                    store.insert_at(&event("b", "mobile", EventType::Pageview), start)?,
                    store.insert_at(
                        &event("b", "mobile", EventType::Click),
                        start + Duration::seconds(30),
                    )?,
                ])
            })
            .unwrap();

        let metrics = session_metrics(&events);
        assert_eq!(metrics.sessions, 2);
        assert_eq!(metrics.avg_duration_secs, 75.0);
        assert_eq!(metrics.bounce_rate, 50.0);
        assert_eq!(format_duration(metrics.avg_duration_secs), "1m 15s");
    }

    #[test]
    fn day_buckets_include_both_ends() {
        let until = DateTime::parse_from_rfc3339("2025-03-10T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let days = day_buckets(until - Duration::days(7), until);
        assert_eq!(days.len(), 8);
        assert_eq!(day_label(days[0]), "2025-03-03");
        assert_eq!(day_label(days[7]), "2025-03-10");
    }

    #[test]
    fn normalize_fills_unknowns_and_forwarded_ip() {
        let request = TrackEventRequest {
            page_url: Some("/blog/hello".into()),
            user_agent: Some("Mozilla/5.0".into()),
            browser: Some("".into()),
            ..Default::default()
        };
        let event = normalize(request, Some("198.51.100.7, 10.0.0.1"));
        assert_eq!(event.browser, UNKNOWN);
        assert_eq!(event.country, UNKNOWN);
        assert_eq!(event.ip, "198.51.100.7");
    }

    #[test]
    fn blog_slug_takes_last_segment() {
        assert_eq!(blog_slug("/blog/hello-world"), Some("hello-world"));
        assert_eq!(blog_slug("/blog/2025/hello/?ref=x"), Some("hello"));
        assert_eq!(blog_slug("/blog/"), None);
        assert_eq!(blog_slug("/portfolio/hello"), None);
    }

    #[test]
    fn tracking_a_blog_page_counts_views() {
        let db = Database::open_in_memory().unwrap();
        let post = db
            .with_conn(|conn| {
                let input = PostInput {
                    title: "Hello".into(),
                    content: "body".into(),
                    status: PostStatus::Published,
                    ..Default::default()
                };
                PostStore::new(conn).create(&input, "hello", None)
            })
            .unwrap();

        let mut new = event("s1", "desktop", EventType::Pageview);
        new.page_url = "/blog/hello".into();
        db.transaction(|tx| track(tx, &new)).unwrap();
        db.transaction(|tx| track(tx, &new)).unwrap();
        new.event_type = EventType::Click;
        db.transaction(|tx| track(tx, &new)).unwrap();

        let (views, page_total) = db
            .with_conn(|conn| {
                Ok((
                    PostStore::new(conn).get(&post.id)?.views,
                    PageViewStore::new(conn).total_views()?,
                ))
            })
            .unwrap();
        assert_eq!(views, 2);
        assert_eq!(page_total, 2);
    }

    #[test]
    fn dashboard_series_align_with_labels() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        db.with_conn(|conn| {
            let store = AnalyticsStore::new(conn);
            store.insert_at(&event("a", "desktop", EventType::Pageview), now - Duration::days(1))?;
            store.insert_at(&event("b", "mobile", EventType::Pageview), now - Duration::hours(1))?;
            store.insert_at(&event("c", "mobile", EventType::Pageview), now - Duration::days(9))?;
            Ok(())
        })
        .unwrap();

        let response = db
            .with_conn(|conn| dashboard(conn, TimeRange::Week, now))
            .unwrap();
        assert_eq!(response.traffic.labels.len(), 8);
        assert_eq!(response.traffic.pageviews.len(), 8);
        assert_eq!(response.traffic.pageviews.iter().sum::<u64>(), 2);
        assert_eq!(response.stats[0].value, 2.0);
        assert_eq!(response.stats[0].trend, 100.0);
        assert_eq!(response.devices.labels.len(), 2);
    }

    #[test]
    fn realtime_covers_last_half_hour() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        db.with_conn(|conn| {
            let store = AnalyticsStore::new(conn);
            let a = event("a", "mobile", EventType::Pageview);
            let b = event("b", "desktop", EventType::Pageview);
            store.insert_at(&a, now - Duration::minutes(2))?;
            store.insert_at(&b, now - Duration::minutes(20))?;
            store.insert_at(&event("c", "desktop", EventType::Pageview), now - Duration::hours(2))?;
            Ok(())
        })
        .unwrap();

        let response = db.with_conn(|conn| realtime(conn, now)).unwrap();
        assert_eq!(response.active_visitors, 2);
        assert_eq!(response.recent_visitors.len(), 2);
        let recent = db.with_conn(|conn| recent_visitors(conn, now)).unwrap();
        assert_eq!(recent.len(), 1);
    }

    #[test]
    fn user_growth_compares_windows() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let users = UserStore::new(conn);
            users.create("a@example.com", "A", "h", UserRole::User)?;
            users.create("b@example.com", "B", "h", UserRole::User)?;
            Ok(())
        })
        .unwrap();

        let now = Utc::now() + Duration::seconds(1);
        let response = db
            .with_conn(|conn| user_analytics(conn, TimeRange::Month, now))
            .unwrap();
        assert_eq!(response.stats.total_users, 2);
        assert_eq!(response.stats.new_users, 2);
        assert_eq!(response.stats.user_growth, 100.0);
        assert_eq!(response.growth.new_users.iter().sum::<u64>(), 2);
        assert_eq!(response.growth.labels.len(), response.growth.active_users.len());
    }

    #[test]
    fn active_users_count_sessions_only() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        db.with_conn(|conn| {
            let store = AnalyticsStore::new(conn);
            let hour_ago = now - Duration::hours(1);
            store.insert_at(&event("s1", "desktop", EventType::Pageview), hour_ago)?;
            store.insert_at(&event("s1", "desktop", EventType::Click), hour_ago)?;
            store.insert_at(&event("s2", "mobile", EventType::Pageview), hour_ago)?;
            let anonymous = NewAnalyticsEvent {
                session_id: None,
                ip: "10.0.0.7".into(),
                ..event("", "mobile", EventType::Pageview)
            };
            store.insert_at(&anonymous, hour_ago)?;
            Ok(())
        })
        .unwrap();

        let response = db
            .with_conn(|conn| user_analytics(conn, TimeRange::Day, now + Duration::seconds(1)))
            .unwrap();
        assert_eq!(response.stats.active_users, 2);
        assert_eq!(response.growth.active_users.iter().max(), Some(&2));
    }

    #[test]
    fn views_change_compares_total_with_previous_window() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let posts = PostStore::new(conn);
            let input = PostInput {
                title: "Old".into(),
                content: "body".into(),
                status: PostStatus::Published,
                ..Default::default()
            };
            let post = posts.create(&input, "old", None)?;
            for _ in 0..4 {
                posts.increment_views(&post.id)?;
            }
            Ok(())
        })
        .unwrap();

        // The post now falls in the window before the current week
        let now = Utc::now() + Duration::days(10);
        let response = db
            .with_conn(|conn| overview(conn, OverviewRange::Week, now))
            .unwrap();
        assert_eq!(response.stats.total_views, 4);
        assert_eq!(response.stats.views_change, 0.0);
    }
}
