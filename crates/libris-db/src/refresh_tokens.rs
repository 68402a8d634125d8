use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::error::StoreResult;
use crate::models::{NewRefreshToken, RefreshTokenRow};
use crate::record::{Fields, Filters, format_timestamp};
use crate::store::RecordStore;

pub struct RefreshTokenStore<'c> {
    conn: &'c Connection,
}

impl<'c> RefreshTokenStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, token: NewRefreshToken) -> StoreResult<i64> {
        self.create(&token.into_fields())
    }

    pub fn find_by_token(&self, token: &str) -> StoreResult<Option<RefreshTokenRow>> {
        self.get(&Filters::new().eq("refresh_token", token.to_string()))?
            .map(RefreshTokenRow::try_from)
            .transpose()
    }

    /// Replaces the token value and restarts its lifetime on the same row.
    pub fn rotate(
        &self,
        id: i64,
        token: &str,
        created_at: DateTime<Utc>,
        expires_in: i64,
    ) -> StoreResult<Option<RefreshTokenRow>> {
        let fields = Fields::new()
            .with("refresh_token", token.to_string())
            .with("created_at", format_timestamp(created_at))
            .with("expires_in", expires_in);
        self.update(&fields, &Filters::new().eq("id", id))?
            .map(RefreshTokenRow::try_from)
            .transpose()
    }

    pub fn revoke(&self, id: i64) -> StoreResult<()> {
        self.delete(&Filters::new().eq("id", id))
    }
}

impl RecordStore for RefreshTokenStore<'_> {
    const TABLE: &'static str = "refresh_tokens";

    fn conn(&self) -> &Connection {
        self.conn
    }
}
