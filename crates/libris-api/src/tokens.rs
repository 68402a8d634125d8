use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use uuid::Uuid;

use libris_types::api::Claims;

use crate::config::AuthConfig;
use crate::error::ApiError;

pub fn issue_access_token(
    config: &AuthConfig,
    author_id: i64,
    name: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: author_id,
        name: name.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + config.access_token_ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verifies signature and expiry with no leeway.
pub fn decode_access_token(config: &AuthConfig, token: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => ApiError::AccessTokenExpired,
        _ => ApiError::WrongCredentials,
    })
}

/// Opaque refresh token value.
pub fn new_refresh_token() -> String {
    Uuid::new_v4().to_string()
}
