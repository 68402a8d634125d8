use chrono::Utc;
use rusqlite::Connection;

use crate::error::StoreResult;
use crate::models::{AuthorRow, NewAuthor};
use crate::record::Filters;
use crate::store::RecordStore;

pub struct AuthorStore<'c> {
    conn: &'c Connection,
}

impl<'c> AuthorStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, author: NewAuthor) -> StoreResult<i64> {
        self.create(&author.into_fields(Utc::now()))
    }

    pub fn find_by_id(&self, id: i64) -> StoreResult<Option<AuthorRow>> {
        self.find(Filters::new().eq("id", id))
    }

    pub fn find_by_email(&self, email: &str) -> StoreResult<Option<AuthorRow>> {
        self.find(Filters::new().eq("email", email.to_string()))
    }

    pub fn find_by_name(&self, name: &str) -> StoreResult<Option<AuthorRow>> {
        self.find(Filters::new().eq("name", name.to_string()))
    }

    fn find(&self, filters: Filters) -> StoreResult<Option<AuthorRow>> {
        self.get(&filters)?.map(AuthorRow::try_from).transpose()
    }
}

impl RecordStore for AuthorStore<'_> {
    const TABLE: &'static str = "authors";

    fn conn(&self) -> &Connection {
        self.conn
    }
}
