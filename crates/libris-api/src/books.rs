use axum::{
    Extension, Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, warn};

use libris_db::record::format_timestamp;
use libris_db::{
    BookRow, BookStore, Fragment, ListableStore, NewBook, Params, QueryGuard, RecordStore, StoreError,
    Value,
};
use libris_types::api::{
    BookListQuery, BookListResponse, BookResponse, CreateBookRequest, CreatedResponse,
    ImportBooksResponse, UpdateBookRequest,
};

use crate::auth::{AppState, run_blocking};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::importers::parse_upload;
use crate::middleware::CurrentAuthor;
use crate::validation::{update_fields, validate_book_update, validate_new_book};

/// Largest accepted import file.
pub const IMPORT_FILE_LIMIT: usize = 10 * 1024 * 1024;

pub const MAX_PAGE_SIZE: u32 = 100;

// -- Handlers --

pub async fn create_book(
    State(state): State<AppState>,
    Extension(CurrentAuthor(author)): Extension<CurrentAuthor>,
    ApiJson(req): ApiJson<CreateBookRequest>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    validate_new_book(&req)?;

    let author_id = author.id;
    let id = run_blocking(&state, move |conn| {
        Ok(BookStore::new(conn).insert(new_book(req, author_id))?)
    })
    .await?;

    info!(book_id = id, author_id, "Book created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn get_book(
    State(state): State<AppState>,
    ApiPath(book_id): ApiPath<i64>,
) -> ApiResult<Json<BookResponse>> {
    let book = run_blocking(&state, move |conn| find_book(conn, book_id)).await?;
    Ok(Json(to_response(book)))
}

pub async fn update_book(
    State(state): State<AppState>,
    Extension(CurrentAuthor(author)): Extension<CurrentAuthor>,
    ApiPath(book_id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateBookRequest>,
) -> ApiResult<Json<BookResponse>> {
    let author_id = author.id;
    let book = run_blocking(&state, move |conn| {
        update_owned_book(conn, author_id, book_id, &req)
    })
    .await?;

    info!(book_id, author_id, "Book updated");
    Ok(Json(to_response(book)))
}

pub async fn delete_book(
    State(state): State<AppState>,
    Extension(CurrentAuthor(author)): Extension<CurrentAuthor>,
    ApiPath(book_id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    let author_id = author.id;
    run_blocking(&state, move |conn| delete_owned_book(conn, author_id, book_id)).await?;

    info!(book_id, author_id, "Book deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_books(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BookListQuery>,
) -> ApiResult<Json<BookListResponse>> {
    let page = run_blocking(&state, move |conn| list_page(conn, &query)).await?;
    Ok(Json(page))
}

pub async fn import_books(
    State(state): State<AppState>,
    Extension(CurrentAuthor(author)): Extension<CurrentAuthor>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ImportBooksResponse>)> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("file") {
            let filename = field.file_name().map(str::to_string);
            let content = field.bytes().await.map_err(multipart_error)?;
            upload = Some((filename, content));
            break;
        }
    }

    let (filename, content) = upload
        .ok_or_else(|| ApiError::BadRequest("Multipart field 'file' is required".to_string()))?;
    if content.len() > IMPORT_FILE_LIMIT {
        return Err(ApiError::PayloadTooLarge);
    }

    let books = parse_upload(filename.as_deref(), &content)?;

    let author_id = author.id;
    let book_ids = run_blocking(&state, move |conn| {
        let books = books
            .into_iter()
            .map(|book| new_book(book, author_id))
            .collect();
        Ok(BookStore::new(conn).insert_many(books)?)
    })
    .await?;

    info!(author_id, imported = book_ids.len(), "Books imported");
    Ok((
        StatusCode::CREATED,
        Json(ImportBooksResponse {
            imported: book_ids.len(),
            book_ids,
        }),
    ))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        warn!("Malformed multipart upload: {}", err);
        ApiError::BadRequest(err.body_text())
    }
}

// -- Services --

fn new_book(req: CreateBookRequest, author_id: i64) -> NewBook {
    NewBook {
        title: req.title,
        genre: req.genre,
        language: req.language,
        published_year: req.published_year,
        author_id,
    }
}

pub fn to_response(book: BookRow) -> BookResponse {
    BookResponse {
        id: book.id,
        title: book.title,
        genre: book.genre,
        language: book.language,
        published_year: book.published_year,
        author_id: book.author_id,
    }
}

pub fn find_book(conn: &Connection, book_id: i64) -> ApiResult<BookRow> {
    BookStore::new(conn)
        .find_by_id(book_id)?
        .ok_or(ApiError::BookNotFound)
}

/// The book, provided `author_id` owns it.
fn owned_book(conn: &Connection, author_id: i64, book_id: i64) -> ApiResult<BookRow> {
    let book = find_book(conn, book_id)?;
    if book.author_id != author_id {
        return Err(ApiError::BookPermission);
    }
    Ok(book)
}

pub fn update_owned_book(
    conn: &Connection,
    author_id: i64,
    book_id: i64,
    req: &UpdateBookRequest,
) -> ApiResult<BookRow> {
    owned_book(conn, author_id, book_id)?;

    let mut fields = update_fields(req)?;
    validate_book_update(req)?;
    fields.set("updated_at", format_timestamp(Utc::now()));

    BookStore::new(conn)
        .update_by_id(book_id, &fields)?
        .ok_or(ApiError::BookNotFound)
}

pub fn delete_owned_book(conn: &Connection, author_id: i64, book_id: i64) -> ApiResult<()> {
    owned_book(conn, author_id, book_id)?;
    Ok(BookStore::new(conn).delete_by_id(book_id)?)
}

/// One page of books ordered by id, continuing after `query.cursor`.
pub fn list_page(conn: &Connection, query: &BookListQuery) -> ApiResult<BookListResponse> {
    if query.limit == 0 || query.limit > MAX_PAGE_SIZE {
        return Err(ApiError::Validation(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    let limit = query.limit as usize;

    let mut filter = ListFilter::default();
    if let Some(cursor) = query.cursor {
        filter.push("id", ">", "cursor", cursor)?;
    }
    if let Some(title) = &query.title {
        filter.push("title", "=", "title", title.clone())?;
    }
    if let Some(genre) = query.genre {
        filter.push("genre", "=", "genre", genre.as_str().to_string())?;
    }
    if let Some(language) = query.language {
        filter.push("language", "=", "language", language.as_str().to_string())?;
    }
    if let Some(author_id) = query.author_id {
        filter.push("author_id", "=", "author_id", author_id)?;
    }
    if let Some(year) = query.published_year {
        filter.push("published_year", "=", "published_year", year)?;
    }
    if let Some(year) = query.year_from {
        filter.push("published_year", ">=", "year_from", year)?;
    }
    if let Some(year) = query.year_to {
        filter.push("published_year", "<=", "year_to", year)?;
    }
    filter
        .params
        .insert("limit".to_string(), Value::Integer(limit as i64 + 1));

    let store = BookStore::new(conn);
    let mut rows = BookStore::decode_all(store.list(&filter.conditions, &filter.params)?)?;

    let has_more = rows.len() > limit;
    rows.truncate(limit);
    let next_cursor = if has_more {
        rows.last().map(|book| book.id)
    } else {
        None
    };

    Ok(BookListResponse {
        items: rows.into_iter().map(to_response).collect(),
        next_cursor,
    })
}

#[derive(Default)]
struct ListFilter {
    conditions: Vec<Fragment>,
    params: Params,
}

impl ListFilter {
    fn push(
        &mut self,
        column: &str,
        operator: &str,
        param: &str,
        value: impl Into<Value>,
    ) -> ApiResult<()> {
        self.params.insert(param.to_string(), value.into());
        let fragment =
            QueryGuard::condition(BookStore::TABLE, column, operator, param, &self.params)
                .map_err(StoreError::from)?;
        self.conditions.push(fragment);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_db::{AuthorStore, Database, NewAuthor};
    use libris_types::{BookGenre, BookLanguage};

    fn seed_author(conn: &Connection, name: &str) -> i64 {
        AuthorStore::new(conn)
            .insert(NewAuthor {
                email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
                password: "hash".to_string(),
                name: name.to_string(),
                biography: None,
                birth_year: None,
                nationality: None,
            })
            .unwrap()
    }

    fn seed_book(conn: &Connection, author_id: i64, title: &str, year: i32) -> i64 {
        BookStore::new(conn)
            .insert(NewBook {
                title: title.to_string(),
                genre: BookGenre::Fiction,
                language: BookLanguage::English,
                published_year: year,
                author_id,
            })
            .unwrap()
    }

    #[test]
    fn update_checks_existence_then_ownership() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let owner = seed_author(conn, "Stephen King");
            let other = seed_author(conn, "Anne Rice");
            let book = seed_book(conn, owner, "The Shining", 1977);
            let req = UpdateBookRequest {
                title: Some("Doctor Sleep".to_string()),
                ..Default::default()
            };

            assert!(matches!(
                update_owned_book(conn, owner, book + 99, &req),
                Err(ApiError::BookNotFound)
            ));
            assert!(matches!(
                update_owned_book(conn, other, book, &req),
                Err(ApiError::BookPermission)
            ));
            assert!(matches!(
                update_owned_book(conn, owner, book, &UpdateBookRequest::default()),
                Err(ApiError::NoFieldsToUpdate)
            ));

            let updated = update_owned_book(conn, owner, book, &req)?;
            assert_eq!(updated.title, "Doctor Sleep");
            assert_eq!(updated.published_year, 1977);
            assert!(updated.updated_at >= updated.created_at);
            Ok::<_, ApiError>(())
        })
        .unwrap();
    }

    #[test]
    fn update_rejects_invalid_values() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let owner = seed_author(conn, "Stephen King");
            let book = seed_book(conn, owner, "The Shining", 1977);
            let req = UpdateBookRequest {
                published_year: Some(1700),
                ..Default::default()
            };
            assert!(matches!(
                update_owned_book(conn, owner, book, &req),
                Err(ApiError::Validation(_))
            ));
            assert_eq!(find_book(conn, book)?.published_year, 1977);
            Ok::<_, ApiError>(())
        })
        .unwrap();
    }

    #[test]
    fn delete_requires_ownership() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let owner = seed_author(conn, "Stephen King");
            let other = seed_author(conn, "Anne Rice");
            let book = seed_book(conn, owner, "The Shining", 1977);

            assert!(matches!(
                delete_owned_book(conn, other, book),
                Err(ApiError::BookPermission)
            ));
            delete_owned_book(conn, owner, book)?;
            assert!(matches!(find_book(conn, book), Err(ApiError::BookNotFound)));
            Ok::<_, ApiError>(())
        })
        .unwrap();
    }

    #[test]
    fn pages_follow_the_cursor() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let author = seed_author(conn, "Stephen King");
            for (title, year) in [("Carrie", 1974), ("The Stand", 1978), ("It", 1986)] {
                seed_book(conn, author, title, year);
            }

            let first = list_page(
                conn,
                &BookListQuery {
                    limit: 2,
                    ..Default::default()
                },
            )?;
            assert_eq!(first.items.len(), 2);
            let cursor = first.next_cursor.unwrap();
            assert_eq!(cursor, first.items[1].id);

            let second = list_page(
                conn,
                &BookListQuery {
                    limit: 2,
                    cursor: Some(cursor),
                    ..Default::default()
                },
            )?;
            assert_eq!(second.items.len(), 1);
            assert_eq!(second.items[0].title, "It");
            assert_eq!(second.next_cursor, None);
            Ok::<_, ApiError>(())
        })
        .unwrap();
    }

    #[test]
    fn filters_combine() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let king = seed_author(conn, "Stephen King");
            let rice = seed_author(conn, "Anne Rice");
            seed_book(conn, king, "Carrie", 1974);
            seed_book(conn, king, "It", 1986);
            seed_book(conn, rice, "The Witching Hour", 1990);

            let page = list_page(
                conn,
                &BookListQuery {
                    year_from: Some(1980),
                    year_to: Some(1995),
                    ..Default::default()
                },
            )?;
            assert_eq!(page.items.len(), 2);

            let page = list_page(
                conn,
                &BookListQuery {
                    author_id: Some(king),
                    year_from: Some(1980),
                    ..Default::default()
                },
            )?;
            assert_eq!(page.items.len(), 1);
            assert_eq!(page.items[0].title, "It");

            let page = list_page(
                conn,
                &BookListQuery {
                    genre: Some(BookGenre::Drama),
                    ..Default::default()
                },
            )?;
            assert!(page.items.is_empty());
            Ok::<_, ApiError>(())
        })
        .unwrap();
    }

    #[test]
    fn limit_is_bounded() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            for limit in [0, MAX_PAGE_SIZE + 1] {
                let query = BookListQuery {
                    limit,
                    ..Default::default()
                };
                assert!(matches!(list_page(conn, &query), Err(ApiError::Validation(_))));
            }
            Ok::<_, ApiError>(())
        })
        .unwrap();
    }
}
