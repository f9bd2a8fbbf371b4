// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Folio admin REST API server
//!
//! Serves the admin dashboard and public site: authentication and user
//! administration, blog and portfolio content, visitor analytics,
//! notifications, site settings, security monitoring and backups.

pub mod auth;
pub mod config;
pub mod dependencies;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod services;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::Server;
