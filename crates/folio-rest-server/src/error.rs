// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Server error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use folio_api_contract::validation::field_messages;
use folio_api_contract::{ApiContractError, ProblemDetails};
use std::collections::HashMap;

/// Server result type
pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Database error: {0}")]
    Database(#[from] folio_local_db::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid request: {0}")]
    Contract(#[from] ApiContractError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Rate limited")]
    RateLimited,
}

fn problem(kind: &str, title: &str, status: StatusCode, detail: String) -> ProblemDetails {
    ProblemDetails {
        problem_type: format!("https://docs.folio.dev/errors/{kind}"),
        title: title.to_string(),
        status: Some(status.as_u16()),
        detail,
        errors: HashMap::new(),
    }
}

impl ServerError {
    /// Convert error to Problem+JSON response
    pub fn to_problem(&self) -> ProblemDetails {
        match self {
            ServerError::Database(folio_local_db::Error::NotFound { entity, id }) => problem(
                "not-found",
                "Not Found",
                StatusCode::NOT_FOUND,
                format!("{entity} '{id}' not found"),
            ),
            ServerError::Database(folio_local_db::Error::Conflict(msg))
            | ServerError::Conflict(msg) => {
                problem("conflict", "Conflict", StatusCode::CONFLICT, msg.clone())
            }
            ServerError::Database(err) => problem(
                "database",
                "Database Error",
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database operation failed: {err}"),
            ),
            ServerError::Auth(msg) => problem(
                "auth",
                "Authentication Failed",
                StatusCode::UNAUTHORIZED,
                msg.clone(),
            ),
            ServerError::Authorization(msg) => problem(
                "authz",
                "Authorization Failed",
                StatusCode::FORBIDDEN,
                msg.clone(),
            ),
            ServerError::Validation(err) => ProblemDetails {
                errors: field_messages(err),
                ..problem(
                    "validation",
                    "Validation Error",
                    StatusCode::BAD_REQUEST,
                    "Request validation failed".to_string(),
                )
            },
            ServerError::Contract(ApiContractError::Validation(err)) => {
                ServerError::Validation(err.clone()).to_problem()
            }
            ServerError::Contract(err) => problem(
                "bad-request",
                "Bad Request",
                StatusCode::BAD_REQUEST,
                err.to_string(),
            ),
            ServerError::NotFound(msg) => {
                problem("not-found", "Not Found", StatusCode::NOT_FOUND, msg.clone())
            }
            ServerError::BadRequest(msg) => problem(
                "bad-request",
                "Bad Request",
                StatusCode::BAD_REQUEST,
                msg.clone(),
            ),
            ServerError::Internal(msg) => problem(
                "internal",
                "Internal Server Error",
                StatusCode::INTERNAL_SERVER_ERROR,
                msg.clone(),
            ),
            ServerError::RateLimited => problem(
                "rate-limited",
                "Rate Limited",
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests".to_string(),
            ),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let problem = self.to_problem();
        let status = StatusCode::from_u16(problem.status.unwrap_or(500))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(problem)).into_response()
    }
}

/// Convert any error to ServerError
impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

/// Convert IO errors
impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::BadRequest(format!("Invalid JSON: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Named {
        #[validate(length(min = 1, message = "name is required"))]
        name: String,
    }

    #[test]
    fn store_errors_map_to_http_statuses() {
        let missing = ServerError::from(folio_local_db::Error::NotFound {
            entity: "post",
            id: "p1".into(),
        });
        assert_eq!(missing.to_problem().status, Some(404));

        let taken = ServerError::from(folio_local_db::Error::Conflict("slug taken".into()));
        assert_eq!(taken.to_problem().status, Some(409));
        assert_eq!(taken.to_problem().detail, "slug taken");
    }

    #[test]
    fn validation_errors_carry_field_messages() {
        let err = Named { name: String::new() }.validate().unwrap_err();
        let problem = ServerError::from(err).to_problem();
        assert_eq!(problem.status, Some(400));
        assert_eq!(problem.errors["name"], vec!["name is required".to_string()]);
    }

    #[test]
    fn contract_errors_are_bad_requests() {
        let problem = ServerError::from(ApiContractError::InvalidRange("1y".into())).to_problem();
        assert_eq!(problem.status, Some(400));
        assert!(problem.detail.contains("1y"));
    }
}
