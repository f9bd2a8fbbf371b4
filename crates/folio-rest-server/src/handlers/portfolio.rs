// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Portfolio projects, their statistics and CSV export

use crate::auth::{AuthUser, EditorUser};
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use folio_api_contract::{
    BulkActionRequest, BulkActionResponse, ExportRequest, NamedValue, PortfolioAnalytics,
    PortfolioInput, PortfolioItem, PortfolioOverview, PortfolioStats, PortfolioStatus,
    PortfolioSummary, DEFAULT_PORTFOLIO_CATEGORIES,
};
use folio_local_db::PortfolioStore;
use serde::Deserialize;
use validator::Validate;

const POPULAR_CATEGORIES: u32 = 5;
const RECENT_PROJECTS: u32 = 6;

const EXPORT_COLUMNS: [&str; 10] = [
    "title",
    "category",
    "description",
    "client",
    "date",
    "views",
    "likes",
    "services",
    "author",
    "created_at",
];

#[derive(Debug, Default, Deserialize)]
pub struct PortfolioQuery {
    pub status: Option<PortfolioStatus>,
}

pub async fn list_items(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<PortfolioQuery>,
) -> ServerResult<Json<Vec<PortfolioItem>>> {
    Ok(Json(state.db.with_conn(|conn| PortfolioStore::new(conn).list(query.status))?))
}

pub async fn get_item(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ServerResult<Json<PortfolioItem>> {
    Ok(Json(state.db.with_conn(|conn| PortfolioStore::new(conn).get(&id))?))
}

pub async fn create_item(
    State(state): State<AppState>,
    EditorUser(author): EditorUser,
    Json(input): Json<PortfolioInput>,
) -> ServerResult<(StatusCode, Json<PortfolioItem>)> {
    input.validate()?;
    let item = state
        .db
        .with_conn(|conn| PortfolioStore::new(conn).create(&input, Some(&author.id)))?;
    tracing::info!(item_id = %item.id, author = %author.id, "portfolio item created");
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(state): State<AppState>,
    _editor: EditorUser,
    Path(id): Path<String>,
    Json(input): Json<PortfolioInput>,
) -> ServerResult<Json<PortfolioItem>> {
    input.validate()?;
    Ok(Json(state.db.with_conn(|conn| PortfolioStore::new(conn).update(&id, &input))?))
}

pub async fn delete_item(
    State(state): State<AppState>,
    _editor: EditorUser,
    Path(id): Path<String>,
) -> ServerResult<StatusCode> {
    state.db.with_conn(|conn| PortfolioStore::new(conn).delete(&id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn stats(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ServerResult<Json<PortfolioStats>> {
    let stats = state.db.with_conn(|conn| {
        let store = PortfolioStore::new(conn);
        let (total_projects, total_views, total_likes) = store.totals()?;
        Ok(PortfolioStats {
            total_projects,
            total_views,
            total_likes,
            total_categories: store.categories()?.len() as u64,
            popular_categories: store.category_counts(Some(POPULAR_CATEGORIES))?,
        })
    })?;
    Ok(Json(stats))
}

pub async fn overview(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ServerResult<Json<PortfolioOverview>> {
    let overview = state.db.with_conn(|conn| {
        let store = PortfolioStore::new(conn);
        let (total_projects, total_views, total_likes) = store.totals()?;
        Ok(PortfolioOverview {
            total_projects,
            total_views,
            total_likes,
            recent_projects: store
                .recent(RECENT_PROJECTS)?
                .iter()
                .map(PortfolioSummary::from)
                .collect(),
            popular_categories: store.category_counts(Some(POPULAR_CATEGORIES))?,
        })
    })?;
    Ok(Json(overview))
}

/// Built-in categories followed by any others in use, first occurrence wins
fn merge_categories(stored: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> =
        Vec::with_capacity(DEFAULT_PORTFOLIO_CATEGORIES.len() + stored.len());
    for category in DEFAULT_PORTFOLIO_CATEGORIES
        .iter()
        .map(|c| c.to_string())
        .chain(stored)
    {
        if !merged.contains(&category) {
            merged.push(category);
        }
    }
    merged
}

pub async fn categories(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ServerResult<Json<Vec<String>>> {
    let stored = state.db.with_conn(|conn| PortfolioStore::new(conn).categories())?;
    Ok(Json(merge_categories(stored)))
}

pub async fn analytics(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ServerResult<Json<PortfolioAnalytics>> {
    let analytics = state.db.with_conn(|conn| {
        let store = PortfolioStore::new(conn);
        Ok(PortfolioAnalytics {
            views_by_category: store.views_by_category()?,
            projects_by_category: store
                .category_counts(None)?
                .into_iter()
                .map(|c| NamedValue {
                    name: c.category,
                    value: c.count,
                })
                .collect(),
            projects_by_status: store.count_by_status()?,
        })
    })?;
    Ok(Json(analytics))
}

fn export_csv(items: &[PortfolioItem]) -> ServerResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_error = |err: csv::Error| ServerError::Internal(format!("CSV export failed: {err}"));

    writer.write_record(EXPORT_COLUMNS).map_err(csv_error)?;
    for item in items {
        writer
            .write_record([
                item.title.clone(),
                item.category.clone(),
                item.description.clone(),
                item.client.clone().unwrap_or_default(),
                item.date.map(|d| d.to_string()).unwrap_or_default(),
                item.views.to_string(),
                item.likes.to_string(),
                item.services.join("; "),
                item.author_name.clone().unwrap_or_default(),
                item.created_at.to_rfc3339(),
            ])
            .map_err(csv_error)?;
    }
    writer
        .into_inner()
        .map_err(|err| ServerError::Internal(format!("CSV export failed: {err}")))
}

pub async fn export(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(request): Json<ExportRequest>,
) -> ServerResult<impl IntoResponse> {
    request.validate()?;
    let items = state
        .db
        .with_conn(|conn| PortfolioStore::new(conn).by_ids(&request.ids))?;
    let body = export_csv(&items)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"portfolio-export.csv\"",
            ),
        ],
        body,
    ))
}

pub async fn bulk(
    State(state): State<AppState>,
    EditorUser(editor): EditorUser,
    Json(request): Json<BulkActionRequest>,
) -> ServerResult<Json<BulkActionResponse>> {
    request.validate()?;
    let affected = state
        .db
        .with_conn(|conn| PortfolioStore::new(conn).bulk(&request.ids, request.action))?;
    tracing::info!(
        action = ?request.action,
        affected,
        editor = %editor.id,
        "portfolio bulk action"
    );
    Ok(Json(BulkActionResponse { affected }))
}

pub async fn like(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ServerResult<Json<PortfolioItem>> {
    Ok(Json(state.db.with_conn(|conn| PortfolioStore::new(conn).like(&id))?))
}
