// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Blog post management

use crate::auth::{AuthUser, EditorUser};
use crate::error::{ServerError, ServerResult};
use crate::services::Audience;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use folio_api_contract::validation::slugify;
use folio_api_contract::{
    NewNotification, NotificationKind, Post, PostFilter, PostInput, PostStatus,
};
use folio_local_db::{ActivityStore, PostStore};
use serde_json::json;
use validator::Validate;

/// Explicit slug, or one derived from the title
fn resolve_slug(input: &PostInput) -> ServerResult<String> {
    let slug = match input.slug.as_deref().map(str::trim) {
        Some(slug) if !slug.is_empty() => slug.to_string(),
        _ => slugify(&input.title),
    };
    if slug.is_empty() {
        return Err(ServerError::BadRequest(
            "A slug cannot be derived from this title".to_string(),
        ));
    }
    Ok(slug)
}

fn slug_conflict(slug: &str) -> folio_local_db::Error {
    folio_local_db::Error::Conflict(format!("Slug '{slug}' is already in use"))
}

async fn announce_published(state: &AppState, post: &Post) {
    let notification = NewNotification::new(
        "New post published",
        format!("\"{}\" is now live", post.title),
    )
    .kind(NotificationKind::Success)
    .category("posts")
    .link(format!("/blog/{}", post.slug));
    if let Err(err) = state.notifications.notify_admins(Audience::NewPost, &notification).await {
        tracing::warn!(error = %err, post_id = %post.id, "post notification failed");
    }
}

pub async fn list_posts(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(filter): Query<PostFilter>,
) -> ServerResult<Json<Vec<Post>>> {
    Ok(Json(state.db.with_conn(|conn| PostStore::new(conn).list(&filter, None))?))
}

pub async fn get_post(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ServerResult<Json<Post>> {
    Ok(Json(state.db.with_conn(|conn| PostStore::new(conn).get(&id))?))
}

pub async fn create_post(
    State(state): State<AppState>,
    EditorUser(author): EditorUser,
    Json(input): Json<PostInput>,
) -> ServerResult<(StatusCode, Json<Post>)> {
    input.validate()?;
    let slug = resolve_slug(&input)?;

    let post = state.db.transaction(|tx| {
        let posts = PostStore::new(tx);
        if posts.slug_taken(&slug, None)? {
            return Err(slug_conflict(&slug));
        }
        let post = posts.create(&input, &slug, Some(&author.id))?;
        ActivityStore::new(tx).record(
            &author.id,
            "post_created",
            &format!("Created post \"{}\"", post.title),
            &json!({ "postId": post.id }),
        )?;
        Ok(post)
    })?;

    if post.status == PostStatus::Published {
        announce_published(&state, &post).await;
    }
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post(
    State(state): State<AppState>,
    EditorUser(editor): EditorUser,
    Path(id): Path<String>,
    Json(input): Json<PostInput>,
) -> ServerResult<Json<Post>> {
    input.validate()?;
    let slug = resolve_slug(&input)?;

    let (before, post) = state.db.transaction(|tx| {
        let posts = PostStore::new(tx);
        let before = posts.get(&id)?;
        if posts.slug_taken(&slug, Some(&id))? {
            return Err(slug_conflict(&slug));
        }
        let post = posts.update(&id, &input, &slug)?;
        ActivityStore::new(tx).record(
            &editor.id,
            "post_updated",
            &format!("Updated post \"{}\"", post.title),
            &json!({ "postId": post.id }),
        )?;
        Ok((before, post))
    })?;

    if before.status != PostStatus::Published && post.status == PostStatus::Published {
        announce_published(&state, &post).await;
    }
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    EditorUser(editor): EditorUser,
    Path(id): Path<String>,
) -> ServerResult<StatusCode> {
    state.db.transaction(|tx| {
        let post = PostStore::new(tx).get(&id)?;
        PostStore::new(tx).delete(&id)?;
        ActivityStore::new(tx).record(
            &editor.id,
            "post_deleted",
            &format!("Deleted post \"{}\"", post.title),
            &json!({ "postId": id }),
        )
    })?;
    Ok(StatusCode::NO_CONTENT)
}
