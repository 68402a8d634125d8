use rusqlite::Connection;
use tracing::info;

use crate::error::StoreResult;

pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE authors (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                name        TEXT NOT NULL UNIQUE,
                biography   TEXT,
                birth_year  INTEGER,
                nationality TEXT,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE books (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                title           TEXT NOT NULL,
                genre           TEXT NOT NULL CHECK (genre IN
                    ('FICTION', 'NON_FICTION', 'SCIENCE', 'HISTORY', 'FANTASY', 'COMEDY', 'DRAMA')),
                language        TEXT NOT NULL CHECK (language IN ('ENGLISH', 'UKRAINIAN')),
                published_year  INTEGER NOT NULL,
                author_id       INTEGER NOT NULL REFERENCES authors(id) ON DELETE CASCADE,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_books_title ON books(title);
            CREATE INDEX idx_books_genre ON books(genre);
            CREATE INDEX idx_books_language ON books(language);
            CREATE INDEX idx_books_published_year ON books(published_year);
            CREATE INDEX idx_books_author ON books(author_id);

            CREATE TABLE refresh_tokens (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                author_id       INTEGER NOT NULL REFERENCES authors(id) ON DELETE CASCADE,
                refresh_token   TEXT NOT NULL UNIQUE,
                expires_in      INTEGER NOT NULL,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
