// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Business logic services

pub mod analytics;
pub mod backup;
pub mod login;
pub mod notifications;
pub mod security;
pub mod settings;
pub mod tasks;

pub use backup::{BackupStore, BackupService, FilesystemBackupStore};
pub use login::LoginThrottle;
pub use notifications::{
    Audience, LogSink, NotificationChannel, NotificationService, NotificationSink,
};
pub use security::{SecurityService, ThreatDetector};
pub use settings::SettingsService;
