// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use crate::auth::AuthUser;
use crate::error::ServerResult;
use crate::state::AppState;
use axum::{extract::State, Json};
use folio_api_contract::{DashboardSummary, PostCounts, PostStatus, PostSummary};
use folio_local_db::{
    ActivityStore, NotificationStore, PortfolioStore, PostStore, TestimonialStore, UserStore,
};

const RECENT_LIMIT: u32 = 5;

/// Counts and recent items for the dashboard landing page
pub async fn summary(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ServerResult<Json<DashboardSummary>> {
    let summary = state.db.with_conn(|conn| {
        let posts = PostStore::new(conn);
        Ok(DashboardSummary {
            posts: PostCounts {
                total: posts.count()?,
                published: posts.count_by_status(PostStatus::Published)?,
                draft: posts.count_by_status(PostStatus::Draft)?,
            },
            portfolio_items: PortfolioStore::new(conn).count()?,
            testimonials: TestimonialStore::new(conn).count()?,
            users: UserStore::new(conn).count()?,
            unread_notifications: NotificationStore::new(conn).unread_count(&user.id)?,
            recent_activities: ActivityStore::new(conn).recent(RECENT_LIMIT)?,
            recent_posts: posts.recent(RECENT_LIMIT)?.iter().map(PostSummary::from).collect(),
        })
    })?;
    Ok(Json(summary))
}
