// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Authentication and authorization

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use folio_api_contract::{User, UserRole, UserStatus};
use folio_local_db::UserStore;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64, // Expiration time
}

/// Signs and verifies HS256 session tokens
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Issue a token for `user`, returning it with its expiry
    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> ServerResult<(String, DateTime<Utc>)> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ServerError::Internal(format!("token signing failed: {e}")))?;
        Ok((token, expires_at))
    }

    /// Validate JWT token
    pub fn verify(&self, token: &str) -> ServerResult<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| ServerError::Auth("Invalid JWT token".to_string()))?;
        Ok(token_data.claims)
    }
}

/// Random secret for tokens and API keys, hex encoded
pub fn random_secret() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_password(password: &str) -> ServerResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServerError::Internal(format!("password hashing failed: {e}")))
}

/// `false` for a wrong password or an unparseable hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Signed-in user, loaded fresh from the database on every request
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> ServerResult<Self> {
        let token = bearer_token(parts)
            .ok_or_else(|| {
                ServerError::Auth("Missing or invalid authorization header".to_string())
            })?;
        let claims = state.tokens.verify(token)?;

        let user = state
            .db
            .with_conn(|conn| UserStore::new(conn).find(&claims.sub))?
            .ok_or_else(|| ServerError::Auth("Account no longer exists".to_string()))?;

        if user.status == UserStatus::Banned
            && user.banned_until.map_or(true, |until| until > Utc::now())
        {
            return Err(ServerError::Authorization("Account is banned".to_string()));
        }

        Ok(AuthUser(user))
    }
}

/// Signed-in user with the `admin` role
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> ServerResult<Self> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.role != UserRole::Admin {
            return Err(ServerError::Authorization("Admin access required".to_string()));
        }
        Ok(AdminUser(user))
    }
}

/// Signed-in user allowed to write content (`admin` or `editor`)
#[derive(Debug, Clone)]
pub struct EditorUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for EditorUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> ServerResult<Self> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.can_edit_content() {
            return Err(ServerError::Authorization("Editor access required".to_string()));
        }
        Ok(EditorUser(user))
    }
}
