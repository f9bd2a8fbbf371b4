// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Analytics capture and aggregation types

use crate::content::PostSummary;
use crate::error::ApiContractError;
use crate::types::{CountryCount, EventType, LabeledCounts, NamedValue};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Value recorded for browser/device/os/country when the client omits it
pub const UNKNOWN: &str = "Unknown";

/// Body of `POST /analytics/track`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TrackEventRequest {
    pub page_url: Option<String>,
    pub user_agent: Option<String>,
    pub browser: Option<String>,
    pub device: Option<String>,
    pub os: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub ip: Option<String>,
    pub session_id: Option<String>,
    pub referrer: Option<String>,
    #[serde(default)]
    pub event_type: EventType,
    pub click_x: Option<i64>,
    pub click_y: Option<i64>,
}

impl TrackEventRequest {
    /// Checks the fields each event type requires
    pub fn check(&self) -> Result<(), ApiContractError> {
        if self.page_url.as_deref().map_or(true, str::is_empty) {
            return Err(ApiContractError::MissingField("pageUrl"));
        }
        match self.event_type {
            EventType::Pageview => {
                if self.user_agent.as_deref().map_or(true, str::is_empty) {
                    return Err(ApiContractError::MissingField("userAgent"));
                }
            }
            EventType::Click => {
                if self.click_x.is_none() {
                    return Err(ApiContractError::MissingField("clickX"));
                }
                if self.click_y.is_none() {
                    return Err(ApiContractError::MissingField("clickY"));
                }
            }
        }
        Ok(())
    }
}

/// Stored analytics event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub id: String,
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
    pub timestamp: DateTime<Utc>,
}

/// Per-URL view counter for blog pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub url: String,
    pub post_id: Option<String>,
    pub views: u64,
    pub unique_views: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    pub total_views: u64,
    pub views_change: f64,
    pub total_posts: u64,
    pub posts_change: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct DailyCount {
    pub date: NaiveDate,
    pub views: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct OverviewCharts {
    pub daily_views: Vec<DailyCount>,
}

/// `GET /analytics/overview`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    pub stats: OverviewStats,
    pub charts: OverviewCharts,
    pub popular_posts: Vec<PostSummary>,
    pub recent_activities: Vec<PostSummary>,
}

/// One headline tile on the analytics dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct DashboardStat {
    pub label: String,
    pub value: f64,
    /// Human formatted value, e.g. "2m 45s" or "42.3%"
    pub display: String,
    pub trend: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct TrafficSeries {
    pub labels: Vec<String>,
    pub pageviews: Vec<u64>,
    pub visitors: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PageStat {
    pub url: String,
    pub views: u64,
    pub unique_views: u64,
}

impl From<PageView> for PageStat {
    fn from(view: PageView) -> Self {
        Self {
            url: view.url,
            views: view.views,
            unique_views: view.unique_views,
        }
    }
}

/// `GET /analytics/dashboard`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct DashboardResponse {
    pub stats: Vec<DashboardStat>,
    pub traffic: TrafficSeries,
    pub browsers: LabeledCounts,
    pub devices: LabeledCounts,
    pub locations: Vec<CountryCount>,
    pub pages: Vec<PageStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct RecentVisitor {
    pub id: String,
    pub page: String,
    pub browser: String,
    pub device: String,
    pub country: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&AnalyticsEvent> for RecentVisitor {
    fn from(event: &AnalyticsEvent) -> Self {
        Self {
            id: event.id.clone(),
            page: event.page_url.clone(),
            browser: event.browser.clone(),
            device: event.device.clone(),
            country: event.country.clone(),
            timestamp: event.timestamp,
        }
    }
}

/// `GET /analytics/realtime`; share values are rounded percentages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RealtimeResponse {
    pub active_visitors: u64,
    pub devices: Vec<NamedValue>,
    pub browsers: Vec<NamedValue>,
    pub recent_visitors: Vec<RecentVisitor>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct HeatmapQuery {
    pub page_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct HeatmapPoint {
    pub x: i64,
    pub y: i64,
    pub page_url: String,
    pub value: u64,
}
