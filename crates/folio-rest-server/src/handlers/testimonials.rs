// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use crate::auth::{AuthUser, EditorUser};
use crate::error::ServerResult;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use folio_api_contract::{Testimonial, TestimonialInput};
use folio_local_db::TestimonialStore;
use validator::Validate;

pub async fn list_testimonials(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ServerResult<Json<Vec<Testimonial>>> {
    Ok(Json(state.db.with_conn(|conn| TestimonialStore::new(conn).list())?))
}

pub async fn get_testimonial(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ServerResult<Json<Testimonial>> {
    Ok(Json(state.db.with_conn(|conn| TestimonialStore::new(conn).get(&id))?))
}

pub async fn create_testimonial(
    State(state): State<AppState>,
    EditorUser(author): EditorUser,
    Json(input): Json<TestimonialInput>,
) -> ServerResult<(StatusCode, Json<Testimonial>)> {
    input.validate()?;
    let testimonial = state
        .db
        .with_conn(|conn| TestimonialStore::new(conn).create(&input, Some(&author.id)))?;
    Ok((StatusCode::CREATED, Json(testimonial)))
}

pub async fn update_testimonial(
    State(state): State<AppState>,
    _editor: EditorUser,
    Path(id): Path<String>,
    Json(input): Json<TestimonialInput>,
) -> ServerResult<Json<Testimonial>> {
    input.validate()?;
    Ok(Json(state.db.with_conn(|conn| TestimonialStore::new(conn).update(&id, &input))?))
}

pub async fn delete_testimonial(
    State(state): State<AppState>,
    _editor: EditorUser,
    Path(id): Path<String>,
) -> ServerResult<StatusCode> {
    state.db.with_conn(|conn| TestimonialStore::new(conn).delete(&id))?;
    Ok(StatusCode::NO_CONTENT)
}
