// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Folio REST API server binary

use clap::Parser;
use folio_logging::CliLoggingArgs;
use folio_rest_server::{Server, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bind address for the server (default: 127.0.0.1:3001)
    #[arg(short, long, env = "FOLIO_BIND")]
    bind: Option<SocketAddr>,

    /// Database path (SQLite); `:memory:` keeps data in RAM
    #[arg(short, long, env = "FOLIO_DATABASE")]
    database: Option<String>,

    /// Enable CORS for development
    #[arg(long)]
    cors: bool,

    /// TOML configuration file to load before applying flags
    #[arg(long, env = "FOLIO_CONFIG")]
    config: Option<PathBuf>,

    /// HS256 secret for session tokens
    #[arg(long, env = "FOLIO_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// E-mail of the admin created when no users exist
    #[arg(long, env = "FOLIO_ADMIN_EMAIL")]
    admin_email: Option<String>,

    /// Password of the admin created when no users exist
    #[arg(long, env = "FOLIO_ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,

    /// Directory holding the `backups/` folder
    #[arg(long, env = "FOLIO_BACKUP_DIR")]
    backup_dir: Option<PathBuf>,

    #[command(flatten)]
    logging: CliLoggingArgs,
}

impl Args {
    /// File configuration with command-line overrides applied
    fn server_config(&mut self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(database) = self.database.take() {
            config.database_path = database;
        }
        config.enable_cors |= self.cors;
        if let Some(secret) = self.jwt_secret.take() {
            config.auth.jwt_secret = Some(secret);
        }
        if let Some(email) = self.admin_email.take() {
            config.auth.bootstrap_admin_email = Some(email);
        }
        if let Some(password) = self.admin_password.take() {
            config.auth.bootstrap_admin_password = Some(password);
        }
        if let Some(dir) = self.backup_dir.take() {
            config.backup.dir = dir;
        }

        config.logging.apply_to(&mut self.logging);
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = Args::parse();
    let config = args.server_config()?;

    args.logging.init("folio-rest-server")?;

    tracing::info!(
        bind = %config.bind_addr,
        database = %config.database_path,
        "Starting Folio REST API server"
    );

    let server = Server::new(config).await?;
    server.run().await?;

    Ok(())
}
