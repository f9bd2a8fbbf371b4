// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Pricing plans, listed by their sort order

use crate::auth::{AuthUser, EditorUser};
use crate::error::ServerResult;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use folio_api_contract::{PricingPlan, PricingPlanInput};
use folio_local_db::PricingStore;
use validator::Validate;

pub async fn list_plans(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ServerResult<Json<Vec<PricingPlan>>> {
    Ok(Json(state.db.with_conn(|conn| PricingStore::new(conn).list())?))
}

pub async fn get_plan(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ServerResult<Json<PricingPlan>> {
    Ok(Json(state.db.with_conn(|conn| PricingStore::new(conn).get(&id))?))
}

pub async fn create_plan(
    State(state): State<AppState>,
    _editor: EditorUser,
    Json(input): Json<PricingPlanInput>,
) -> ServerResult<(StatusCode, Json<PricingPlan>)> {
    input.validate()?;
    let plan = state.db.with_conn(|conn| PricingStore::new(conn).create(&input))?;
    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn update_plan(
    State(state): State<AppState>,
    _editor: EditorUser,
    Path(id): Path<String>,
    Json(input): Json<PricingPlanInput>,
) -> ServerResult<Json<PricingPlan>> {
    input.validate()?;
    Ok(Json(state.db.with_conn(|conn| PricingStore::new(conn).update(&id, &input))?))
}

pub async fn delete_plan(
    State(state): State<AppState>,
    _editor: EditorUser,
    Path(id): Path<String>,
) -> ServerResult<StatusCode> {
    state.db.with_conn(|conn| PricingStore::new(conn).delete(&id))?;
    Ok(StatusCode::NO_CONTENT)
}
