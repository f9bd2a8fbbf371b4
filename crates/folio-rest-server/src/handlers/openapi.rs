// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! OpenAPI schema endpoint

use crate::ServerResult;
use axum::Json;

/// Component schemas of the wire types
pub async fn openapi_spec() -> ServerResult<Json<utoipa::openapi::OpenApi>> {
    Ok(Json(folio_api_contract::openapi_schema()))
}
