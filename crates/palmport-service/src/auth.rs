//! Authentication tokens and extractors.
//!
//! This module provides:
//! - `TokenKeys` - HS256 signing and verification of session tokens
//! - `AuthUser` - any signed-in account
//! - `AdminAuth` - an account with the admin role

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use palmport_core::{Account, NewAccount, Role, UserId};
use palmport_store::{Store, StoreError};

use crate::config::ServiceConfig;
use crate::crypto::hash_password;
use crate::error::ApiError;
use crate::state::AppState;

/// How long an issued token stays valid.
pub const TOKEN_TTL_DAYS: i64 = 7;

/// Claims carried by every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: UserId,
    /// Account email at issue time.
    pub email: String,
    /// Account name at issue time.
    pub name: String,
    /// Account role at issue time.
    pub role: Role,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// HS256 keys derived from the configured secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    /// Derive keys from a shared secret.
    #[must_use]
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Sign a token for an account.
    pub fn issue(&self, account: &Account) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: account.id,
            email: account.email.clone(),
            name: account.name.clone(),
            role: account.role,
            iat: now.timestamp(),
            exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
    }

    /// Verify a token's signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected session token");
                ApiError::Unauthorized("Invalid or expired token".into())
            })
    }
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenKeys(..)")
    }
}

/// Pull and verify the bearer token from request headers.
fn bearer_claims(parts: &Parts, state: &AppState) -> Result<Claims, ApiError> {
    let token = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("No token provided".into()))?;

    state.tokens.verify(token)
}

/// A signed-in account.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The account id.
    pub user_id: UserId,
    /// Verified token claims.
    pub claims: Claims,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let claims = bearer_claims(parts, state)?;
            Ok(AuthUser {
                user_id: claims.sub,
                claims,
            })
        })
    }
}

/// A signed-in account with the admin role.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    /// The admin's account id.
    pub user_id: UserId,
    /// Verified token claims.
    pub claims: Claims,
}

impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let claims = bearer_claims(parts, state)?;

            if !claims.role.is_admin() {
                tracing::warn!(user_id = %claims.sub, "Non-admin token on admin endpoint");
                return Err(ApiError::Forbidden("Access denied".into()));
            }

            Ok(AdminAuth {
                user_id: claims.sub,
                claims,
            })
        })
    }
}

/// Errors from startup admin provisioning.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The configured password could not be hashed.
    #[error("failed to hash admin password: {0}")]
    Hash(String),
}

/// Create the admin account from `ADMIN_EMAIL`/`ADMIN_PASSWORD` if missing.
///
/// Returns the account when one was created.
pub async fn provision_admin(
    store: &dyn Store,
    config: &ServiceConfig,
) -> Result<Option<Account>, ProvisionError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        tracing::warn!("ADMIN_EMAIL or ADMIN_PASSWORD not set - no admin account provisioned");
        return Ok(None);
    };

    if let Some(existing) = store.find_account_by_email(email).await? {
        if !existing.role.is_admin() {
            tracing::warn!(email = %email, "ADMIN_EMAIL belongs to a non-admin account");
        }
        return Ok(None);
    }

    let password_hash = hash_password(password).map_err(|e| ProvisionError::Hash(e.to_string()))?;
    let account = store
        .create_account(NewAccount {
            name: "Admin".into(),
            email: email.clone(),
            password_hash,
            role: Role::Admin,
        })
        .await?;

    tracing::info!(email = %account.email, "Admin account provisioned");
    Ok(Some(account))
}

#[cfg(test)]
mod tests {
    use super::*;
    use palmport_store::MemoryStore;

    fn account(role: Role) -> Account {
        NewAccount {
            name: "Ada Obi".into(),
            email: "ada@example.com".into(),
            password_hash: String::new(),
            role,
        }
        .into_account(UserId::generate(), Utc::now())
    }

    #[test]
    fn token_round_trip() {
        let keys = TokenKeys::from_secret("test-secret");
        let account = account(Role::Admin);
        let token = keys.issue(&account).unwrap();

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, account.id);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_DAYS * 24 * 60 * 60);
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let token = TokenKeys::from_secret("one").issue(&account(Role::User)).unwrap();
        assert!(matches!(
            TokenKeys::from_secret("two").verify(&token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn admin_is_provisioned_once() {
        let store = MemoryStore::new();
        let config = ServiceConfig {
            admin_email: Some("admin@palmport.ng".into()),
            admin_password: Some("s3cret".into()),
            ..ServiceConfig::default()
        };

        let created = provision_admin(&store, &config).await.unwrap().unwrap();
        assert_eq!(created.role, Role::Admin);
        assert_eq!(created.name, "Admin");
        assert!(crate::crypto::verify_password("s3cret", &created.password_hash));

        assert!(provision_admin(&store, &config).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn provisioning_needs_both_settings() {
        let store = MemoryStore::new();
        let config = ServiceConfig {
            admin_email: Some("admin@palmport.ng".into()),
            ..ServiceConfig::default()
        };
        assert!(provision_admin(&store, &config).await.unwrap().is_none());
        assert!(store
            .find_account_by_email("admin@palmport.ng")
            .await
            .unwrap()
            .is_none());
    }
}
