pub mod authors;
pub mod books;
pub mod error;
pub mod guard;
pub mod migrations;
pub mod models;
pub mod record;
pub mod refresh_tokens;
pub mod store;

use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub use authors::AuthorStore;
pub use books::BookStore;
pub use error::{StoreError, StoreResult};
pub use guard::{Condition, Fragment, GuardError, QueryGuard};
pub use models::{AuthorRow, BookRow, NewAuthor, NewBook, NewRefreshToken, RefreshTokenRow};
pub use record::{Fields, Filters, Params, Record, Value};
pub use refresh_tokens::RefreshTokenStore;
pub use store::{ListableStore, RecordStore};

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::init(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lends the connection to `f` for the duration of one unit of work.
    pub fn with_conn<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<StoreError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        f(&conn)
    }
}
