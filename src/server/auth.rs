//! Password hashing and signed access tokens.
//!
//! Passwords are stored as bcrypt hashes. A token is
//! `hex(username).expiry.hex(signature)` where the signature is an HMAC-SHA256
//! over the first two parts with the server secret.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::RequestPartsExt;
use axum_extra::TypedHeader;
use chrono::{DateTime, Duration, Utc};
use constant_time_eq::constant_time_eq;
use headers::authorization::Bearer;
use headers::Authorization;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

use super::db::StoredUser;
use super::error::ServerError;
use super::AppState;

pub const TOKEN_TTL_HOURS: i64 = 24;

fn sign(key: &str, parts: &[&[u8]]) -> Option<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes()).ok()?;
    for part in parts {
        mac.update(part);
    }
    Some(mac.finalize().into_bytes().to_vec())
}

/// bcrypt hash with an embedded random salt, computed off the async runtime.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, ServerError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ServerError::Internal(format!("hashing task failed: {e}")))?
        .map_err(|e| ServerError::Internal(format!("bcrypt: {e}")))
}

/// A malformed stored hash never verifies.
pub async fn verify_password(password: &str, hash: &str) -> bool {
    let (password, hash) = (password.to_string(), hash.to_string());
    match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await {
        Ok(Ok(matches)) => matches,
        Ok(Err(e)) => {
            debug!("Stored password hash rejected: {}", e);
            false
        }
        Err(e) => {
            warn!("Password check task failed: {}", e);
            false
        }
    }
}

pub fn issue_token(secret: &str, username: &str, now: DateTime<Utc>) -> String {
    let subject = hex::encode(username);
    let expiry = (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp().to_string();
    let signature = sign(secret, &[subject.as_bytes(), b".", expiry.as_bytes()])
        .map(hex::encode)
        .unwrap_or_default();
    format!("{subject}.{expiry}.{signature}")
}

/// Returns the username when the signature matches and the token is unexpired.
pub fn verify_token(secret: &str, token: &str, now: DateTime<Utc>) -> Option<String> {
    let mut parts = token.splitn(3, '.');
    let (subject, expiry, signature) = (parts.next()?, parts.next()?, parts.next()?);
    let expected = hex::decode(signature).ok()?;
    let computed = sign(secret, &[subject.as_bytes(), b".", expiry.as_bytes()])?;
    if expected.len() != computed.len() || !constant_time_eq(&computed, &expected) {
        debug!("Token signature mismatch");
        return None;
    }
    if expiry.parse::<i64>().ok()? <= now.timestamp() {
        debug!("Token expired");
        return None;
    }
    String::from_utf8(hex::decode(subject).ok()?).ok()
}

/// The authenticated caller, resolved from the bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub StoredUser);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| ServerError::InvalidCredentials)?;
        let username = verify_token(&state.secret_key, bearer.token(), Utc::now())
            .ok_or(ServerError::InvalidCredentials)?;
        state
            .db
            .user_by_name(&username)
            .await?
            .map(CurrentUser)
            .ok_or(ServerError::InvalidCredentials)
    }
}
