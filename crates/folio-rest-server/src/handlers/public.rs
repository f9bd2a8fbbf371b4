// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Unauthenticated reads for the public site; only published content

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use folio_api_contract::{
    PortfolioItem, PortfolioStatus, Post, PostFilter, PostStatus, PricingPlan, Testimonial,
};
use folio_local_db::{PortfolioStore, PostStore, PricingStore, TestimonialStore};

pub async fn posts(
    State(state): State<AppState>,
    Query(filter): Query<PostFilter>,
) -> ServerResult<Json<Vec<Post>>> {
    let filter = PostFilter {
        status: Some(PostStatus::Published),
        ..filter
    };
    Ok(Json(state.db.with_conn(|conn| PostStore::new(conn).list(&filter, None))?))
}

pub async fn post_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ServerResult<Json<Post>> {
    state
        .db
        .with_conn(|conn| PostStore::new(conn).find_by_slug(&slug))?
        .filter(|post| post.status == PostStatus::Published)
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("post '{slug}' not found")))
}

pub async fn portfolio(State(state): State<AppState>) -> ServerResult<Json<Vec<PortfolioItem>>> {
    let items = state
        .db
        .with_conn(|conn| PortfolioStore::new(conn).list(Some(PortfolioStatus::Published)))?;
    Ok(Json(items))
}

pub async fn testimonials(State(state): State<AppState>) -> ServerResult<Json<Vec<Testimonial>>> {
    Ok(Json(state.db.with_conn(|conn| TestimonialStore::new(conn).list())?))
}

pub async fn pricing(State(state): State<AppState>) -> ServerResult<Json<Vec<PricingPlan>>> {
    Ok(Json(state.db.with_conn(|conn| PricingStore::new(conn).list())?))
}
