// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Visitor tracking, dashboards and the realtime feed

use crate::auth::AuthUser;
use crate::error::ServerResult;
use crate::services::analytics;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::Utc;
use folio_api_contract::{
    AnalyticsEvent, DashboardResponse, HeatmapPoint, HeatmapQuery, OverviewRange,
    OverviewResponse, RangeQuery, RealtimeResponse, RecentVisitor, SuccessResponse, TimeRange,
    TrackEventRequest,
};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::pin::Pin;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;

type AnalyticsSseStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

/// Record a page view or click from the public site
pub async fn track(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TrackEventRequest>,
) -> ServerResult<(StatusCode, Json<SuccessResponse>)> {
    request.check()?;

    let forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok());
    let event = analytics::normalize(request, forwarded_for);
    let stored = state.db.transaction(|tx| analytics::track(tx, &event))?;

    // No receivers is fine; nobody is watching the live feed
    let _ = state.realtime.send(stored);
    Ok((StatusCode::CREATED, Json(SuccessResponse::ok())))
}

pub async fn overview(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<RangeQuery>,
) -> ServerResult<Json<OverviewResponse>> {
    let range: OverviewRange = query.parse()?;
    let now = Utc::now();
    Ok(Json(state.db.with_conn(|conn| analytics::overview(conn, range, now))?))
}

pub async fn dashboard(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<RangeQuery>,
) -> ServerResult<Json<DashboardResponse>> {
    let range: TimeRange = query.parse()?;
    let now = Utc::now();
    Ok(Json(state.db.with_conn(|conn| analytics::dashboard(conn, range, now))?))
}

pub async fn realtime(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ServerResult<Json<RealtimeResponse>> {
    let now = Utc::now();
    Ok(Json(state.db.with_conn(|conn| analytics::realtime(conn, now))?))
}

pub async fn realtime_visitors(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ServerResult<Json<Vec<RecentVisitor>>> {
    let now = Utc::now();
    Ok(Json(state.db.with_conn(|conn| analytics::recent_visitors(conn, now))?))
}

pub async fn heatmap(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<HeatmapQuery>,
) -> ServerResult<Json<Vec<HeatmapPoint>>> {
    let now = Utc::now();
    let points = state
        .db
        .with_conn(|conn| analytics::heatmap(conn, query.page_url.as_deref(), now))?;
    Ok(Json(points))
}

/// Server-sent events for every newly tracked event
pub async fn stream(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ServerResult<Sse<AnalyticsSseStream>> {
    let receiver = state.realtime.subscribe();
    let stream: AnalyticsSseStream =
        Box::pin(BroadcastStream::new(receiver).filter_map(|result| async move {
            match result {
                Ok(event) => Some(analytics_event_to_sse(&event)),
                Err(err) => {
                    tracing::debug!(error = %err, "realtime subscriber lagged");
                    None
                }
            }
        }));

    Ok(Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("keep-alive")))
}

fn analytics_event_to_sse(event: &AnalyticsEvent) -> Result<Event, Infallible> {
    let payload = serde_json::to_string(event).unwrap_or_else(|_| "{}".into());
    Ok(Event::default().event(event.event_type.as_str()).id(event.id.clone()).data(payload))
}
