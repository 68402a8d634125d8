use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{error, info};

use libris_db::{AuthorRow, AuthorStore, Database, NewRefreshToken, RefreshTokenStore};
use libris_types::api::{AuthorResponse, LoginRequest, RefreshTokenRequest, TokenResponse};

use crate::config::AuthConfig;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::hasher;
use crate::middleware::CurrentAuthor;
use crate::tokens::{issue_access_token, new_refresh_token};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub auth: AuthConfig,
}

/// Runs `f` against the connection on the blocking pool.
pub(crate) async fn run_blocking<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Connection) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || state.db.with_conn(f))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })?
}

/// Runs CPU-bound work (password hashing) on the blocking pool without
/// taking the connection lock.
pub(crate) async fn run_unlocked<F, T>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.to_string())
    })?
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let email = req.email;
    let candidate =
        run_blocking(&state, move |conn| Ok(AuthorStore::new(conn).find_by_email(&email)?)).await?;

    let password = req.password;
    let author = run_unlocked(move || check_credentials(candidate, &password)).await?;

    let auth = state.auth.clone();
    let (author_id, tokens) =
        run_blocking(&state, move |conn| open_session(conn, &auth, &author, Utc::now())).await?;

    info!(author_id, "Author logged in");
    Ok(Json(tokens))
}

pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshTokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let auth = state.auth.clone();
    let (author_id, tokens) = run_blocking(&state, move |conn| {
        refresh_tokens(conn, &auth, &req.refresh_token, Utc::now())
    })
    .await?;

    info!(author_id, "Refresh token rotated");
    Ok(Json(tokens))
}

pub async fn logout(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshTokenRequest>,
) -> ApiResult<StatusCode> {
    let author_id = run_blocking(&state, move |conn| revoke_token(conn, &req.refresh_token)).await?;

    info!(author_id, "Author logged out");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(Extension(CurrentAuthor(author)): Extension<CurrentAuthor>) -> Json<AuthorResponse> {
    Json(profile(author))
}

pub(crate) fn profile(author: AuthorRow) -> AuthorResponse {
    AuthorResponse {
        id: author.id,
        email: author.email,
        name: author.name,
        biography: author.biography,
        birth_year: author.birth_year,
        nationality: author.nationality,
    }
}

// -- Services --

/// Unknown email and wrong password fail identically.
pub fn check_credentials(candidate: Option<AuthorRow>, password: &str) -> ApiResult<AuthorRow> {
    candidate
        .filter(|author| hasher::verify_password(password, &author.password))
        .ok_or(ApiError::WrongCredentials)
}

/// Opens a new refresh-token session for an authenticated author.
pub fn open_session(
    conn: &Connection,
    auth: &AuthConfig,
    author: &AuthorRow,
    now: DateTime<Utc>,
) -> ApiResult<(i64, TokenResponse)> {
    let refresh_token = new_refresh_token();
    RefreshTokenStore::new(conn).insert(NewRefreshToken {
        author_id: author.id,
        refresh_token: refresh_token.clone(),
        expires_in: auth.refresh_token_seconds(),
        created_at: now,
    })?;

    let access_token = issue_access_token(auth, author.id, &author.name, now)?;
    Ok((author.id, TokenResponse::bearer(access_token, refresh_token)))
}

/// Exchanges a live refresh token for a new pair, rotating the stored row.
pub fn refresh_tokens(
    conn: &Connection,
    auth: &AuthConfig,
    presented: &str,
    now: DateTime<Utc>,
) -> ApiResult<(i64, TokenResponse)> {
    let store = RefreshTokenStore::new(conn);
    let row = store
        .find_by_token(presented)?
        .filter(|row| !row.is_expired_at(now))
        .ok_or(ApiError::RefreshToken)?;

    let author = AuthorStore::new(conn)
        .find_by_id(row.author_id)?
        .ok_or(ApiError::RefreshToken)?;

    let refresh_token = new_refresh_token();
    store
        .rotate(row.id, &refresh_token, now, auth.refresh_token_seconds())?
        .ok_or(ApiError::RefreshToken)?;

    let access_token = issue_access_token(auth, author.id, &author.name, now)?;
    Ok((author.id, TokenResponse::bearer(access_token, refresh_token)))
}

pub fn revoke_token(conn: &Connection, presented: &str) -> ApiResult<i64> {
    let store = RefreshTokenStore::new(conn);
    let row = store
        .find_by_token(presented)?
        .ok_or(ApiError::RefreshToken)?;
    store.revoke(row.id)?;
    Ok(row.author_id)
}
