// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Password login with failed-attempt lockout

use crate::auth::verify_password;
use crate::config::LoginThrottleConfig;
use crate::error::{ServerError, ServerResult};
use crate::middleware::ClientInfo;
use chrono::{DateTime, Duration, Utc};
use folio_api_contract::{BanDuration, User, UserStatus};
use folio_local_db::{Database, LoginHistoryStore, UserStore};

pub const LOCKOUT_REASON: &str = "Too many failed login attempts";

/// Why a login was refused
#[derive(Debug, Clone, PartialEq)]
pub enum LoginFailure {
    UnknownUser,
    Banned {
        until: DateTime<Utc>,
        reason: String,
    },
    InvalidPassword {
        user_id: String,
        attempts: u32,
    },
    Locked {
        user_id: String,
        minutes: i64,
    },
}

impl From<LoginFailure> for ServerError {
    fn from(failure: LoginFailure) -> Self {
        match failure {
            LoginFailure::UnknownUser => ServerError::Auth("No user found".to_string()),
            LoginFailure::Banned { until, reason } => ServerError::Authorization(format!(
                "Account banned until {}. Reason: {}",
                until.to_rfc3339(),
                reason
            )),
            LoginFailure::InvalidPassword { .. } => {
                ServerError::Auth("Invalid password".to_string())
            }
            LoginFailure::Locked { minutes, .. } => ServerError::Authorization(format!(
                "Account temporarily locked due to too many failed attempts. Try again in {minutes} minutes."
            )),
        }
    }
}

pub struct LoginThrottle {
    max_attempts: u32,
    lockout: Duration,
}

impl LoginThrottle {
    pub fn new(config: &LoginThrottleConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            lockout: config.lockout(),
        }
    }

    /// Check credentials, updating attempt counters, bans and login history.
    ///
    /// The outer error is a storage failure; the inner one says why the
    /// credentials were refused.
    pub fn authenticate(
        &self,
        db: &Database,
        email: &str,
        password: &str,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> ServerResult<Result<User, LoginFailure>> {
        let ip = client.ip.as_deref();
        let user_agent = client.user_agent.as_deref();

        let outcome = db.transaction(|tx| {
            let users = UserStore::new(tx);
            let history = LoginHistoryStore::new(tx);

            let Some(credentials) = users.find_by_email(email)? else {
                return Ok(Err(LoginFailure::UnknownUser));
            };
            let user = credentials.user;

            if user.status == UserStatus::Banned {
                // A ban without an end date never expires
                let until = user
                    .banned_until
                    .unwrap_or_else(|| BanDuration::Permanent.banned_until(now));
                if until > now {
                    history.record(&user.id, ip, user_agent, false, "Account banned")?;
                    return Ok(Err(LoginFailure::Banned {
                        until,
                        reason: user.ban_reason.clone().unwrap_or_default(),
                    }));
                }
                users.unban(&user.id)?;
                tracing::info!(user_id = %user.id, "expired ban lifted");
            }

            if !verify_password(password, &credentials.password_hash) {
                let attempts = users.record_failed_attempt(&user.id)?;
                if attempts >= self.max_attempts {
                    users.ban(&user.id, now + self.lockout, LOCKOUT_REASON)?;
                    history.record(&user.id, ip, user_agent, false, LOCKOUT_REASON)?;
                    return Ok(Err(LoginFailure::Locked {
                        user_id: user.id,
                        minutes: self.lockout.num_minutes(),
                    }));
                }
                history.record(&user.id, ip, user_agent, false, "Invalid password")?;
                return Ok(Err(LoginFailure::InvalidPassword {
                    user_id: user.id,
                    attempts,
                }));
            }

            let user = users.record_successful_login(&user.id, now)?;
            history.record(&user.id, ip, user_agent, true, "Successful login")?;
            Ok(Ok(user))
        })?;

        if let Err(failure) = &outcome {
            tracing::warn!(email, ?failure, "login refused");
        }
        Ok(outcome)
    }
}
