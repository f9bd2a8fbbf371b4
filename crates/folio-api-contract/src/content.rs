// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Content entities: blog posts, portfolio projects, testimonials and pricing plans

use crate::types::{NamedValue, PortfolioStatus, PostStatus};
use crate::validation::{validate_link, validate_slug};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Categories offered by the portfolio form before any project exists
pub const DEFAULT_PORTFOLIO_CATEGORIES: &[&str] = &[
    "Web Development",
    "Mobile Development",
    "UI/UX Design",
    "Branding",
    "Content Writing",
    "Digital Marketing",
    "Photography",
    "Video Production",
    "Illustration",
    "Other",
];

/// Blog post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub category: Option<String>,
    pub read_time: Option<String>,
    pub status: PostStatus,
    pub tags: Vec<String>,
    pub views: u64,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/replace body for a post. The slug is derived from the title when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PostInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    #[validate(length(min = 1))]
    pub content: String,
    #[validate(length(max = 500))]
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub category: Option<String>,
    pub read_time: Option<String>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Filters for listing posts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub q: Option<String>,
}

/// Compact post row used by dashboards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: String,
    pub title: String,
    pub status: PostStatus,
    pub views: u64,
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Post> for PostSummary {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id.clone(),
            title: post.title.clone(),
            status: post.status,
            views: post.views,
            author_name: post.author_name.clone(),
            created_at: post.created_at,
        }
    }
}

/// Portfolio project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PortfolioItem {
    pub id: String,
    pub title: String,
    pub category: String,
    pub description: String,
    pub image: String,
    pub client: Option<String>,
    pub date: Option<NaiveDate>,
    pub services: Vec<String>,
    pub budget: Option<String>,
    pub likes: u64,
    pub views: u64,
    pub status: PortfolioStatus,
    pub link: Option<String>,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PortfolioInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(length(min = 1))]
    pub image: String,
    pub client: Option<String>,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub services: Vec<String>,
    pub budget: Option<String>,
    #[serde(default)]
    pub status: PortfolioStatus,
    #[validate(custom(function = "validate_link"))]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PortfolioStats {
    pub total_projects: u64,
    pub total_views: u64,
    pub total_likes: u64,
    pub total_categories: u64,
    pub popular_categories: Vec<CategoryCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct PortfolioSummary {
    pub id: String,
    pub title: String,
    pub category: String,
    pub image: String,
    pub views: u64,
    pub likes: u64,
}

impl From<&PortfolioItem> for PortfolioSummary {
    fn from(item: &PortfolioItem) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            category: item.category.clone(),
            image: item.image.clone(),
            views: item.views,
            likes: item.likes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PortfolioOverview {
    pub total_projects: u64,
    pub total_views: u64,
    pub total_likes: u64,
    pub recent_projects: Vec<PortfolioSummary>,
    pub popular_categories: Vec<CategoryCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct CategoryViews {
    pub name: String,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PortfolioAnalytics {
    pub views_by_category: Vec<CategoryViews>,
    pub projects_by_category: Vec<NamedValue>,
    pub projects_by_status: Vec<NamedValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct ExportRequest {
    #[validate(length(min = 1, message = "select at least one project"))]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Delete,
    Publish,
    Archive,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct BulkActionRequest {
    #[validate(length(min = 1, message = "select at least one project"))]
    pub ids: Vec<String>,
    pub action: BulkAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct BulkActionResponse {
    pub affected: u64,
}

/// Client testimonial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub id: String,
    pub name: String,
    pub position: String,
    pub company: String,
    pub image: Option<String>,
    pub rating: u8,
    pub review: String,
    pub project_type: String,
    /// Free-form engagement period, e.g. "Jan 2024 - Mar 2024"
    pub date: String,
    pub author_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TestimonialInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub company: String,
    pub image: Option<String>,
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: u8,
    #[validate(length(min = 1))]
    pub review: String,
    #[serde(default)]
    pub project_type: String,
    #[serde(default)]
    pub date: String,
}

/// Pricing plan shown on the public pricing table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PricingPlan {
    pub id: String,
    pub name: String,
    /// Price in minor units of `currency`
    pub price_cents: u64,
    pub currency: String,
    pub duration: Option<String>,
    pub description: String,
    pub features: Vec<String>,
    pub delivery_time: String,
    pub revisions: String,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PricingPlanInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub price_cents: u64,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "currency must be an ISO 4217 code"))]
    pub currency: String,
    pub duration: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub delivery_time: String,
    #[serde(default)]
    pub revisions: String,
    #[serde(default)]
    pub sort_order: i64,
}
