use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use libris_db::{AuthorRow, AuthorStore};

use crate::auth::{AppState, run_blocking};
use crate::error::ApiError;
use crate::tokens::decode_access_token;

/// The author behind the bearer token of the current request.
#[derive(Debug, Clone)]
pub struct CurrentAuthor(pub AuthorRow);

/// Extract and validate the JWT from the Authorization header, then load its author.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::WrongCredentials)?;

    let claims = decode_access_token(&state.auth, token)?;

    let author = run_blocking(&state, move |conn| {
        AuthorStore::new(conn)
            .find_by_id(claims.sub)?
            .ok_or(ApiError::AuthorNotFound)
    })
    .await?;

    req.extensions_mut().insert(CurrentAuthor(author));
    Ok(next.run(req).await)
}
