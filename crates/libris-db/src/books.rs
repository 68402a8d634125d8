use chrono::Utc;
use rusqlite::Connection;
use tracing::debug;

use crate::error::StoreResult;
use crate::models::{BookRow, NewBook};
use crate::record::{Fields, Filters, Record};
use crate::store::{ListableStore, RecordStore, insert_into};

pub struct BookStore<'c> {
    conn: &'c Connection,
}

impl<'c> BookStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, book: NewBook) -> StoreResult<i64> {
        self.create(&book.into_fields(Utc::now()))
    }

    /// Inserts every book or none of them.
    pub fn insert_many(&self, books: Vec<NewBook>) -> StoreResult<Vec<i64>> {
        let now = Utc::now();
        let tx = self.conn.unchecked_transaction()?;
        let mut ids = Vec::with_capacity(books.len());
        for book in books {
            ids.push(insert_into(&tx, Self::TABLE, &book.into_fields(now))?);
        }
        tx.commit()?;

        debug!(count = ids.len(), "Inserted book batch");
        Ok(ids)
    }

    pub fn find_by_id(&self, id: i64) -> StoreResult<Option<BookRow>> {
        self.get(&Filters::new().eq("id", id))?
            .map(BookRow::try_from)
            .transpose()
    }

    pub fn update_by_id(&self, id: i64, fields: &Fields) -> StoreResult<Option<BookRow>> {
        self.update(fields, &Filters::new().eq("id", id))?
            .map(BookRow::try_from)
            .transpose()
    }

    pub fn delete_by_id(&self, id: i64) -> StoreResult<()> {
        self.delete(&Filters::new().eq("id", id))
    }

    pub fn decode_all(records: Vec<Record>) -> StoreResult<Vec<BookRow>> {
        records.into_iter().map(BookRow::try_from).collect()
    }
}

impl RecordStore for BookStore<'_> {
    const TABLE: &'static str = "books";

    fn conn(&self) -> &Connection {
        self.conn
    }
}

impl ListableStore for BookStore<'_> {}
