// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Server state management

use crate::auth::TokenIssuer;
use crate::config::ServerConfig;
use crate::services::{
    BackupService, LoginThrottle, NotificationService, SecurityService, SettingsService,
};
use folio_api_contract::AnalyticsEvent;
use folio_local_db::Database;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared server state
#[derive(Clone)]
pub struct AppState {
    /// Database connection
    pub db: Arc<Database>,

    /// Server configuration
    pub config: ServerConfig,

    pub tokens: Arc<TokenIssuer>,

    pub login: Arc<LoginThrottle>,

    pub settings: Arc<SettingsService>,

    pub notifications: Arc<NotificationService>,

    pub security: Arc<SecurityService>,

    pub backups: Arc<BackupService>,

    /// Newly tracked analytics events, fanned out to realtime subscribers
    pub realtime: broadcast::Sender<AnalyticsEvent>,
}
