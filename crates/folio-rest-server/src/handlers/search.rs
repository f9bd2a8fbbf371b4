// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Cross-entity search for the admin command palette

use crate::auth::AuthUser;
use crate::error::ServerResult;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use folio_api_contract::{
    PortfolioItem, Post, SearchQuery, SearchResponse, SearchResult, SearchResultType, User,
};
use folio_local_db::{PortfolioStore, PostStore, UserStore};

const PER_KIND_LIMIT: u32 = 5;

fn post_result(post: Post) -> SearchResult {
    SearchResult {
        id: post.id,
        result_type: SearchResultType::Post,
        title: post.title,
        description: post.excerpt,
    }
}

fn user_result(user: User) -> SearchResult {
    SearchResult {
        description: Some(format!("{} • {}", user.role.as_str(), user.email)),
        id: user.id,
        result_type: SearchResultType::User,
        title: user.name,
    }
}

fn portfolio_result(item: PortfolioItem) -> SearchResult {
    SearchResult {
        id: item.id,
        result_type: SearchResultType::Portfolio,
        title: item.title,
        description: Some(item.description),
    }
}

pub async fn search(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<SearchQuery>,
) -> ServerResult<Json<SearchResponse>> {
    let term = query.q.as_deref().map(str::trim).unwrap_or_default();
    if term.is_empty() {
        return Ok(Json(SearchResponse::default()));
    }

    let results = state.db.with_conn(|conn| {
        let posts = PostStore::new(conn).search(term, PER_KIND_LIMIT)?;
        let users = UserStore::new(conn).search(term, PER_KIND_LIMIT)?;
        let items = PortfolioStore::new(conn).search(term, PER_KIND_LIMIT)?;
        Ok(posts
            .into_iter()
            .map(post_result)
            .chain(users.into_iter().map(user_result))
            .chain(items.into_iter().map(portfolio_result))
            .collect())
    })?;
    Ok(Json(SearchResponse { results }))
}
