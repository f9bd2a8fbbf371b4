// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Folio REST API contract types and validation
//!
//! Wire types shared by the REST server, its storage layer and its tests.
//! JSON field names are camelCase; enum values are lowercase and double as
//! the SQLite storage representation.

pub mod accounts;
pub mod analytics;
pub mod content;
pub mod error;
pub mod notifications;
pub mod security;
pub mod system;
pub mod types;
pub mod validation;

pub use accounts::*;
pub use analytics::*;
pub use content::*;
pub use error::*;
pub use notifications::*;
pub use security::*;
pub use system::*;
pub use types::*;

/// Generate OpenAPI schema for the API contract types
#[cfg(feature = "utoipa")]
pub fn openapi_schema() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi;
    #[derive(OpenApi)]
    #[openapi(
        info(title = "Folio Admin REST API"),
        paths(),
        components(schemas(
            PostStatus,
            PortfolioStatus,
            UserRole,
            UserStatus,
            Severity,
            NotificationKind,
            EventType,
            BanDuration,
            TimeRange,
            OverviewRange,
            BackupKind,
            BackupStatus,
            SuccessResponse,
            NamedValue,
            LabeledCounts,
            CountryCount,
            LoginRequest,
            LoginResponse,
            User,
            CreateUserRequest,
            UpdateUserRequest,
            BanUserRequest,
            UpdateUserStatusRequest,
            ResetPasswordRequest,
            ChangePasswordRequest,
            LoginHistoryEntry,
            ActivityEntry,
            UserProfile,
            UpdateProfileRequest,
            SecurityOverview,
            UpdateSecurityRequest,
            UserStats,
            UserGrowthSeries,
            UserAnalyticsResponse,
            Post,
            PostInput,
            PostSummary,
            PortfolioItem,
            PortfolioInput,
            CategoryCount,
            PortfolioStats,
            PortfolioSummary,
            PortfolioOverview,
            CategoryViews,
            PortfolioAnalytics,
            ExportRequest,
            BulkAction,
            BulkActionRequest,
            BulkActionResponse,
            Testimonial,
            TestimonialInput,
            PricingPlan,
            PricingPlanInput,
            TrackEventRequest,
            AnalyticsEvent,
            OverviewStats,
            DailyCount,
            OverviewCharts,
            OverviewResponse,
            DashboardStat,
            TrafficSeries,
            PageStat,
            DashboardResponse,
            RecentVisitor,
            RealtimeResponse,
            HeatmapPoint,
            Notification,
            NewNotification,
            BulkNotificationRequest,
            QuietHours,
            NotificationPreferences,
            SecurityLogEntry,
            BlockedIp,
            BlockIpRequest,
            SecurityRule,
            SecurityRuleInput,
            SecurityAlert,
            AuditEntry,
            ApiKeyResponse,
            BackupRecord,
            BackupCreated,
            RestoreRequest,
            BackupCleanup,
            SearchResultType,
            SearchResult,
            SearchResponse,
            PostCounts,
            DashboardSummary,
            ProblemDetails
        ))
    )]
    struct ApiDoc;
    ApiDoc::openapi()
}

#[cfg(all(test, feature = "utoipa"))]
mod tests {
    #[test]
    fn openapi_lists_core_schemas() {
        let doc = super::openapi_schema();
        let components = doc.components.expect("components");
        for name in ["Post", "User", "ProblemDetails", "NotificationPreferences"] {
            assert!(components.schemas.contains_key(name), "missing {name}");
        }
    }
}
