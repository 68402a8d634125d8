//! Database row types. These map directly to SQLite rows and stay distinct
//! from the libris-types API models to keep the DB layer independent.

use chrono::{DateTime, Duration, Utc};
use libris_types::{BookGenre, BookLanguage};

use crate::error::StoreError;
use crate::record::{Fields, Record, format_timestamp};

#[derive(Debug, Clone)]
pub struct AuthorRow {
    pub id: i64,
    pub email: String,
    /// Argon2 PHC string, never the plain password.
    pub password: String,
    pub name: String,
    pub biography: Option<String>,
    pub birth_year: Option<i32>,
    pub nationality: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<Record> for AuthorRow {
    type Error = StoreError;

    fn try_from(record: Record) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.int("id")?,
            email: record.text("email")?,
            password: record.text("password")?,
            name: record.text("name")?,
            biography: record.opt_text("biography")?,
            birth_year: record
                .opt_int("birth_year")?
                .map(|y| i32::try_from(y).map_err(|_| StoreError::decode("birth_year")))
                .transpose()?,
            nationality: record.opt_text("nationality")?,
            created_at: record.timestamp("created_at")?,
            updated_at: record.timestamp("updated_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BookRow {
    pub id: i64,
    pub title: String,
    pub genre: BookGenre,
    pub language: BookLanguage,
    pub published_year: i32,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<Record> for BookRow {
    type Error = StoreError;

    fn try_from(record: Record) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.int("id")?,
            title: record.text("title")?,
            genre: record
                .text("genre")?
                .parse()
                .map_err(|_| StoreError::decode("genre"))?,
            language: record
                .text("language")?
                .parse()
                .map_err(|_| StoreError::decode("language"))?,
            published_year: i32::try_from(record.int("published_year")?)
                .map_err(|_| StoreError::decode("published_year"))?,
            author_id: record.int("author_id")?,
            created_at: record.timestamp("created_at")?,
            updated_at: record.timestamp("updated_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RefreshTokenRow {
    pub id: i64,
    pub author_id: i64,
    pub refresh_token: String,
    /// Lifetime in seconds, counted from `created_at`.
    pub expires_in: i64,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRow {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::seconds(self.expires_in)
    }

    /// Expired once `now` reaches `created_at + expires_in`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

impl TryFrom<Record> for RefreshTokenRow {
    type Error = StoreError;

    fn try_from(record: Record) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.int("id")?,
            author_id: record.int("author_id")?,
            refresh_token: record.text("refresh_token")?,
            expires_in: record.int("expires_in")?,
            created_at: record.timestamp("created_at")?,
        })
    }
}

// -- Insert payloads --

#[derive(Debug, Clone)]
pub struct NewAuthor {
    pub email: String,
    /// Already hashed.
    pub password: String,
    pub name: String,
    pub biography: Option<String>,
    pub birth_year: Option<i32>,
    pub nationality: Option<String>,
}

impl NewAuthor {
    pub fn into_fields(self, now: DateTime<Utc>) -> Fields {
        let now = format_timestamp(now);
        Fields::new()
            .with("email", self.email)
            .with("password", self.password)
            .with("name", self.name)
            .with("biography", self.biography)
            .with("birth_year", self.birth_year)
            .with("nationality", self.nationality)
            .with("created_at", now.clone())
            .with("updated_at", now)
    }
}

#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub genre: BookGenre,
    pub language: BookLanguage,
    pub published_year: i32,
    pub author_id: i64,
}

impl NewBook {
    pub fn into_fields(self, now: DateTime<Utc>) -> Fields {
        let now = format_timestamp(now);
        Fields::new()
            .with("title", self.title)
            .with("genre", self.genre.as_str().to_string())
            .with("language", self.language.as_str().to_string())
            .with("published_year", self.published_year)
            .with("author_id", self.author_id)
            .with("created_at", now.clone())
            .with("updated_at", now)
    }
}

#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub author_id: i64,
    pub refresh_token: String,
    pub expires_in: i64,
    pub created_at: DateTime<Utc>,
}

impl NewRefreshToken {
    pub fn into_fields(self) -> Fields {
        Fields::new()
            .with("author_id", self.author_id)
            .with("refresh_token", self.refresh_token)
            .with("expires_in", self.expires_in)
            .with("created_at", format_timestamp(self.created_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    fn token(created_at: DateTime<Utc>, expires_in: i64) -> RefreshTokenRow {
        RefreshTokenRow {
            id: 1,
            author_id: 1,
            refresh_token: "t".to_string(),
            expires_in,
            created_at,
        }
    }

    #[test]
    fn token_expiry_boundary_is_inclusive() {
        let created = Utc::now();
        let row = token(created, 60);
        assert!(!row.is_expired_at(created + Duration::seconds(59)));
        assert!(row.is_expired_at(created + Duration::seconds(60)));
    }

    #[test]
    fn token_created_two_hours_ago() {
        let now = Utc::now();
        let created = now - Duration::hours(2);
        assert!(token(created, 3600).is_expired_at(now));
        assert!(!token(created, 7200 + 60).is_expired_at(now));
    }

    #[test]
    fn new_book_stores_enum_codes() {
        let fields = NewBook {
            title: "Dune".to_string(),
            genre: BookGenre::NonFiction,
            language: BookLanguage::Ukrainian,
            published_year: 1965,
            author_id: 3,
        }
        .into_fields(Utc::now());

        assert_eq!(fields.get("genre"), Some(&Value::Text("NON_FICTION".to_string())));
        assert_eq!(fields.get("language"), Some(&Value::Text("UKRAINIAN".to_string())));
        assert_eq!(
            fields.names(),
            vec![
                "title",
                "genre",
                "language",
                "published_year",
                "author_id",
                "created_at",
                "updated_at"
            ]
        );
    }
}
