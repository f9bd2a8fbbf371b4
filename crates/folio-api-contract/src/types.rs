// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Shared enums and small wire types used across the Folio REST API

use crate::error::ApiContractError;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum whose
/// wire names are listed explicitly. The same names are used for SQLite
/// storage so the two never drift.
macro_rules! wire_enum {
    ($ty:ident, $err:ident, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Wire/storage name of the variant
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ApiContractError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => Err(ApiContractError::$err(other.to_string())),
                }
            }
        }
    };
}

/// Publication state of a blog post
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

wire_enum!(PostStatus, InvalidStatus, {
    Draft => "draft",
    Published => "published",
});

/// Lifecycle state of a portfolio project
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum PortfolioStatus {
    Draft,
    #[default]
    Published,
    Archived,
}

wire_enum!(PortfolioStatus, InvalidStatus, {
    Draft => "draft",
    Published => "published",
    Archived => "archived",
});

/// Account role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Editor,
    #[default]
    User,
}

wire_enum!(UserRole, InvalidRole, {
    Admin => "admin",
    Editor => "editor",
    User => "user",
});

impl UserRole {
    /// Whether the role may create and modify content entities
    pub fn can_edit_content(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Editor)
    }
}

/// Account status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
    Banned,
}

wire_enum!(UserStatus, InvalidStatus, {
    Active => "active",
    Inactive => "inactive",
    Banned => "banned",
});

/// Security event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

wire_enum!(Severity, InvalidSeverity, {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

impl Severity {
    /// High and critical events raise alerts
    pub fn is_alerting(&self) -> bool {
        *self >= Severity::High
    }
}

/// Notification kind, drives icon and colour in the UI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
    Message,
    Mention,
}

wire_enum!(NotificationKind, InvalidNotificationKind, {
    Info => "info",
    Success => "success",
    Warning => "warning",
    Error => "error",
    Message => "message",
    Mention => "mention",
});

/// Kind of captured analytics event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    #[default]
    Pageview,
    Click,
}

wire_enum!(EventType, InvalidEventType, {
    Pageview => "pageview",
    Click => "click",
});

/// How long an administrator bans an account for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub enum BanDuration {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "24h")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
    #[serde(rename = "permanent")]
    Permanent,
}

wire_enum!(BanDuration, InvalidBanDuration, {
    OneHour => "1h",
    OneDay => "24h",
    SevenDays => "7d",
    ThirtyDays => "30d",
    Permanent => "permanent",
});

impl BanDuration {
    /// End of the ban when issued at `now`. Permanent bans end on 2099-12-31.
    pub fn banned_until(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            BanDuration::OneHour => now + Duration::hours(1),
            BanDuration::OneDay => now + Duration::hours(24),
            BanDuration::SevenDays => now + Duration::days(7),
            BanDuration::ThirtyDays => now + Duration::days(30),
            BanDuration::Permanent => Utc
                .with_ymd_and_hms(2099, 12, 31, 0, 0, 0)
                .single()
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }
}

/// Look-back window for dashboard and user analytics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub enum TimeRange {
    #[serde(rename = "24h")]
    Day,
    #[default]
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
}

wire_enum!(TimeRange, InvalidRange, {
    Day => "24h",
    Week => "7d",
    Month => "30d",
    Quarter => "90d",
});

impl TimeRange {
    pub fn duration(&self) -> Duration {
        match self {
            TimeRange::Day => Duration::hours(24),
            TimeRange::Week => Duration::days(7),
            TimeRange::Month => Duration::days(30),
            TimeRange::Quarter => Duration::days(90),
        }
    }
}

/// Look-back window for the blog overview
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum OverviewRange {
    #[default]
    Week,
    Month,
    Year,
}

wire_enum!(OverviewRange, InvalidRange, {
    Week => "week",
    Month => "month",
    Year => "year",
});

impl OverviewRange {
    pub fn duration(&self) -> Duration {
        match self {
            OverviewRange::Week => Duration::days(7),
            OverviewRange::Month => Duration::days(30),
            OverviewRange::Year => Duration::days(365),
        }
    }
}

/// Backup origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    Full,
    Scheduled,
}

wire_enum!(BackupKind, InvalidStatus, {
    Full => "full",
    Scheduled => "scheduled",
});

/// Backup progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum BackupStatus {
    Pending,
    Completed,
    Failed,
}

wire_enum!(BackupStatus, InvalidStatus, {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
});

/// `?range=` query parameter; parsed into a typed range by the handler
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct RangeQuery {
    pub range: Option<String>,
}

impl RangeQuery {
    /// Parse the range, falling back to the type's default when absent
    pub fn parse<T>(&self) -> Result<T, ApiContractError>
    where
        T: FromStr<Err = ApiContractError> + Default,
    {
        match self.range.as_deref() {
            None | Some("") => Ok(T::default()),
            Some(raw) => raw.parse(),
        }
    }
}

/// Generic acknowledgement body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Name/count pair used by most chart series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct NamedValue {
    pub name: String,
    pub value: u64,
}

/// Parallel label/value arrays, the shape chart widgets consume directly
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct LabeledCounts {
    pub labels: Vec<String>,
    pub values: Vec<u64>,
}

/// Country/count pair for location charts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct CountryCount {
    pub country: String,
    pub count: u64,
}
