use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Form, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::auth::{hash_password, issue_token, verify_password, CurrentUser};
use super::db::{Conflict, LoginEvent};
use super::error::ServerError;
use super::{check_rate_limit, extract_ip, AppState};
use crate::models::{FavoriteEntry, MediaKind, NewFavorite, TmdbId, TokenResponse, User};

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "CineScope API is online" }))
}

pub async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    username: String,
    email: String,
    password: String,
}

/// Loose shape check: one `@`, something before it, a dotted domain after it.
fn valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<Json<User>, ServerError> {
    if !check_rate_limit(&state, &extract_ip(&headers)).await {
        return Err(ServerError::RateLimited);
    }
    let Json(body) = payload?;
    let username = body.username.trim();
    if username.is_empty() {
        return Err(ServerError::Validation("username must not be empty".to_string()));
    }
    if !valid_email(&body.email) {
        return Err(ServerError::Validation(
            "value is not a valid email address".to_string(),
        ));
    }
    if body.password.is_empty() {
        return Err(ServerError::Validation("password must not be empty".to_string()));
    }

    let password_hash = hash_password(&body.password, state.password_cost).await?;
    let user = match state
        .db
        .create_user(username, &body.email, &password_hash)
        .await?
    {
        Ok(user) => user,
        Err(Conflict::Username) => return Err(ServerError::UsernameTaken),
        Err(Conflict::Email) => return Err(ServerError::EmailTaken),
    };
    info!("New user registered: {} ({})", user.username, user.email);
    Ok(Json(user.public()))
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

pub async fn token(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Json<TokenResponse>, ServerError> {
    let ip = extract_ip(&headers);
    if !check_rate_limit(&state, &ip).await {
        warn!("Rate limit exceeded for {}", ip);
        return Err(ServerError::RateLimited);
    }
    let Form(form) = form?;

    let user = state
        .db
        .user_by_name(&form.username)
        .await?
        .ok_or(ServerError::BadLogin)?;
    if !verify_password(&form.password, &user.password_hash).await {
        return Err(ServerError::BadLogin);
    }

    let access_token = issue_token(&state.secret_key, &user.username, Utc::now());
    state
        .db
        .record_login(&LoginEvent {
            user_id: user.id,
            ip_address: ip.clone(),
            user_agent: headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            at: Utc::now(),
        })
        .await?;
    info!("User logged in: {} from {}", user.username, ip);
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user.public())
}

/// Forwards `path` and the query pairs, in order, to the catalog provider.
/// A caller-supplied `api_key` is dropped. The upstream status and body pass
/// through unchanged.
pub async fn tmdb_proxy(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, ServerError> {
    let params: Vec<(String, String)> = params
        .into_iter()
        .filter(|(k, _)| k != "api_key")
        .collect();
    debug!("Proxying /{} with {} params", path, params.len());

    let (status, body) = state
        .upstream
        .get(&path, &params)
        .await
        .map_err(|e| ServerError::Upstream(format!("{:#}", e)))?;
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    if !status.is_success() {
        warn!("Upstream answered {} for /{}", status, path);
    }
    Ok((status, Json(body)))
}

pub async fn list_favorites(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<FavoriteEntry>>, ServerError> {
    Ok(Json(state.db.favorites_for(user.id).await?))
}

#[derive(Debug, Deserialize)]
pub struct FavoriteBody {
    tmdb_id: TmdbId,
    title: String,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    media_type: Option<String>,
}

pub async fn add_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<FavoriteBody>, JsonRejection>,
) -> Result<Json<FavoriteEntry>, ServerError> {
    let Json(body) = payload?;
    let media_type = match body.media_type.as_deref() {
        None => MediaKind::Movie,
        Some(raw) => raw.parse().map_err(ServerError::Validation)?,
    };
    let favorite = NewFavorite {
        tmdb_id: body.tmdb_id,
        title: body.title,
        poster_path: body.poster_path,
        media_type,
    };
    let entry = state.db.add_favorite(user.id, &favorite).await?;
    debug!("{} saved {} '{}'", user.username, entry.media_type, entry.title);
    Ok(Json(entry))
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(tmdb_id): Path<TmdbId>,
) -> Result<Json<Value>, ServerError> {
    if !state.db.remove_favorite(user.id, tmdb_id).await? {
        return Err(ServerError::NotFound(
            "Movie not found in favorites".to_string(),
        ));
    }
    Ok(Json(json!({ "message": "Movie removed from favorites" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(valid_email("ana@example.com"));
        assert!(!valid_email("ana.example.com"));
        assert!(!valid_email("@example.com"));
        assert!(!valid_email("ana@localhost"));
        assert!(!valid_email("ana@a@b.com"));
    }
}
