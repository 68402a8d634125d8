use serde::{Deserialize, Serialize};

use crate::models::{BookGenre, BookLanguage};

// -- JWT Claims --

/// Access-token claims. `sub` is the author id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub name: String,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

// -- Authors --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAuthorRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub birth_year: Option<i32>,
    #[serde(default)]
    pub nationality: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: i64,
}

/// Public author profile. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub biography: Option<String>,
    pub birth_year: Option<i32>,
    pub nationality: Option<String>,
}

// -- Books --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBookRequest {
    pub title: String,
    pub genre: BookGenre,
    pub language: BookLanguage,
    pub published_year: i32,
}

/// Partial update. Absent and `null` fields are both left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateBookRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub genre: Option<BookGenre>,
    #[serde(default)]
    pub language: Option<BookLanguage>,
    #[serde(default)]
    pub published_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookResponse {
    pub id: i64,
    pub title: String,
    pub genre: BookGenre,
    pub language: BookLanguage,
    pub published_year: i32,
    pub author_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookListQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub cursor: Option<i64>,
    pub title: Option<String>,
    pub genre: Option<BookGenre>,
    pub language: Option<BookLanguage>,
    pub author_id: Option<i64>,
    pub published_year: Option<i32>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
}

fn default_limit() -> u32 {
    10
}

impl Default for BookListQuery {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            cursor: None,
            title: None,
            genre: None,
            language: None,
            author_id: None,
            published_year: None,
            year_from: None,
            year_to: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookListResponse {
    pub items: Vec<BookResponse>,
    pub next_cursor: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportBooksResponse {
    pub imported: usize,
    pub book_ids: Vec<i64>,
}
