use chrono::Duration;

/// Token settings shared by issuance and verification.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>, access_minutes: i64, refresh_days: i64) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            access_token_ttl: Duration::minutes(access_minutes),
            refresh_token_ttl: Duration::days(refresh_days),
        }
    }

    /// Lifetime stored with each refresh token row.
    pub fn refresh_token_seconds(&self) -> i64 {
        self.refresh_token_ttl.num_seconds()
    }
}
