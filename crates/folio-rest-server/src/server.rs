// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Main server implementation

use crate::config::ServerConfig;
use crate::dependencies::DefaultServerDependencies;
use crate::error::{ServerError, ServerResult};
use crate::handlers;
use crate::middleware::{
    ip_block_middleware, rate_limit_middleware, threat_detection_middleware, RateLimitState,
};
use crate::services::tasks;
use crate::state::AppState;
use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

/// REST API server
pub struct Server {
    config: ServerConfig,
    state: AppState,
    app: Router,
}

impl Server {
    /// Create a new server instance
    pub async fn new(config: ServerConfig) -> ServerResult<Self> {
        let state = DefaultServerDependencies::new(config.clone()).await?.into_state();
        Ok(Self::with_state(config, state))
    }

    /// Construct a server from an already-built app state
    pub fn with_state(config: ServerConfig, state: AppState) -> Self {
        let app = build_app(state.clone(), &config);
        Self { config, state, app }
    }

    /// The router, for serving in-process
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Run the server with its background jobs until ctrl-c or SIGTERM
    pub async fn run(self) -> ServerResult<()> {
        let addr = self.config.bind_addr;
        info!("Starting server on {}", addr);

        let cleanup = tasks::spawn_notification_cleanup(self.state.clone());
        let backups = tasks::spawn_scheduled_backups(self.state.clone());

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|err| ServerError::Internal(format!("REST server error: {err}")));

        cleanup.abort();
        backups.abort();
        info!("Server stopped");
        served
    }

    /// Get the bind address
    pub fn addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}

/// Build the Axum application with routes and middleware
pub fn build_app(state: AppState, config: &ServerConfig) -> Router {
    let middleware_stack = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(from_fn({
            let rate_limit_state = Arc::new(RateLimitState::new(config.rate_limit.clone()));
            move |req, next| {
                let state = Arc::clone(&rate_limit_state);
                rate_limit_middleware(state, req, next)
            }
        }))
        .layer({
            if config.enable_cors {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new()
                    .allow_origin(vec![
                        HeaderValue::from_static("http://localhost:3000"),
                        HeaderValue::from_static("http://127.0.0.1:3000"),
                    ])
                    .allow_methods([
                        Method::GET,
                        Method::POST,
                        Method::PUT,
                        Method::PATCH,
                        Method::DELETE,
                    ])
                    .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            }
        });

    let api_routes = api_routes()
        .layer(from_fn_with_state(state.clone(), threat_detection_middleware))
        .layer(from_fn_with_state(state.clone(), ip_block_middleware));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/openapi.json", get(handlers::openapi::openapi_spec))
        .with_state(state)
        .layer(middleware_stack)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Health and status endpoints
        .route("/healthz", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readiness_check))
        .route("/version", get(handlers::health::version))
        // Authentication
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/logout", post(handlers::auth::logout))
        // User administration
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route("/users/analytics", get(handlers::users::user_analytics))
        .route(
            "/users/:id",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route("/users/:id/ban", post(handlers::users::ban_user))
        .route("/users/:id/unban", post(handlers::users::unban_user))
        .route("/users/:id/status", put(handlers::users::update_status))
        .route("/users/:id/reset-password", post(handlers::users::reset_password))
        .route("/users/:id/login-history", get(handlers::users::login_history))
        .route("/users/:id/activities", get(handlers::users::activities))
        // Own profile
        .route(
            "/user/profile",
            get(handlers::profile::get_profile).patch(handlers::profile::update_profile),
        )
        .route("/user/activities", get(handlers::profile::activities))
        .route(
            "/user/security",
            get(handlers::profile::get_security).patch(handlers::profile::update_security),
        )
        .route(
            "/user/security/activities",
            get(handlers::profile::security_activities),
        )
        .route(
            "/user/security/password",
            post(handlers::profile::change_password),
        )
        // Blog posts
        .route(
            "/posts",
            get(handlers::posts::list_posts).post(handlers::posts::create_post),
        )
        .route(
            "/posts/:id",
            get(handlers::posts::get_post)
                .put(handlers::posts::update_post)
                .delete(handlers::posts::delete_post),
        )
        // Portfolio
        .route(
            "/portfolio",
            get(handlers::portfolio::list_items).post(handlers::portfolio::create_item),
        )
        .route("/portfolio/stats", get(handlers::portfolio::stats))
        .route("/portfolio/overview", get(handlers::portfolio::overview))
        .route("/portfolio/categories", get(handlers::portfolio::categories))
        .route("/portfolio/analytics", get(handlers::portfolio::analytics))
        .route("/portfolio/export", post(handlers::portfolio::export))
        .route("/portfolio/bulk", post(handlers::portfolio::bulk))
        .route(
            "/portfolio/:id",
            get(handlers::portfolio::get_item)
                .put(handlers::portfolio::update_item)
                .delete(handlers::portfolio::delete_item),
        )
        .route("/portfolio/:id/like", post(handlers::portfolio::like))
        // Testimonials and pricing
        .route(
            "/testimonials",
            get(handlers::testimonials::list_testimonials)
                .post(handlers::testimonials::create_testimonial),
        )
        .route(
            "/testimonials/:id",
            get(handlers::testimonials::get_testimonial)
                .put(handlers::testimonials::update_testimonial)
                .delete(handlers::testimonials::delete_testimonial),
        )
        .route(
            "/pricing",
            get(handlers::pricing::list_plans).post(handlers::pricing::create_plan),
        )
        .route(
            "/pricing/:id",
            get(handlers::pricing::get_plan)
                .put(handlers::pricing::update_plan)
                .delete(handlers::pricing::delete_plan),
        )
        // Public site reads
        .route("/public/posts", get(handlers::public::posts))
        .route("/public/posts/:slug", get(handlers::public::post_by_slug))
        .route("/public/portfolio", get(handlers::public::portfolio))
        .route("/public/testimonials", get(handlers::public::testimonials))
        .route("/public/pricing", get(handlers::public::pricing))
        // Analytics
        .route("/analytics/track", post(handlers::analytics::track))
        .route("/analytics/overview", get(handlers::analytics::overview))
        .route("/analytics/dashboard", get(handlers::analytics::dashboard))
        .route("/analytics/realtime", get(handlers::analytics::realtime))
        .route(
            "/analytics/realtime/visitors",
            get(handlers::analytics::realtime_visitors),
        )
        .route("/analytics/heatmap", get(handlers::analytics::heatmap))
        .route("/analytics/realtime/stream", get(handlers::analytics::stream))
        // Notifications
        .route("/notifications", get(handlers::notifications::list_notifications))
        .route("/notifications/read-all", post(handlers::notifications::mark_all_read))
        .route(
            "/notifications/preferences",
            get(handlers::notifications::get_preferences)
                .patch(handlers::notifications::update_preferences),
        )
        .route("/notifications/cleanup", post(handlers::notifications::cleanup))
        .route("/notifications/bulk", post(handlers::notifications::send_bulk))
        .route("/notifications/system", post(handlers::notifications::send_system))
        .route("/notifications/:id/read", patch(handlers::notifications::mark_read))
        .route("/notifications/:id", delete(handlers::notifications::delete_notification))
        // Settings
        .route(
            "/settings",
            get(handlers::settings::get_settings).patch(handlers::settings::update_settings),
        )
        .route("/settings/cache/clear", post(handlers::settings::clear_cache))
        .route("/settings/export", get(handlers::settings::export_settings))
        .route("/settings/import", post(handlers::settings::import_settings))
        .route("/settings/api-key", post(handlers::settings::rotate_api_key))
        // Security
        .route("/security/logs", get(handlers::security::logs))
        .route("/security/logs/:id/resolve", post(handlers::security::resolve_log))
        .route("/security/threats", get(handlers::security::threats))
        .route(
            "/security/blocked-ips",
            get(handlers::security::blocked_ips).post(handlers::security::block_ip),
        )
        .route(
            "/security/blocked-ips/:ip",
            delete(handlers::security::unblock_ip),
        )
        .route(
            "/security/rules",
            get(handlers::security::rules).post(handlers::security::create_rule),
        )
        .route("/security/alerts", get(handlers::security::alerts))
        .route("/security/audit", get(handlers::security::audit_trail))
        // Backups
        .route(
            "/backups",
            get(handlers::backups::list_backups).post(handlers::backups::create_backup),
        )
        .route("/backups/restore", post(handlers::backups::restore_backup))
        .route("/backups/cleanup", post(handlers::backups::cleanup_backups))
        .route("/backups/:filename", get(handlers::backups::download_backup))
        // Search and dashboard
        .route("/search", get(handlers::search::search))
        .route("/dashboard/summary", get(handlers::dashboard::summary))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
