use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use rusqlite::Connection;
use tracing::info;

use libris_db::{AuthorStore, NewAuthor};
use libris_types::api::{AuthorResponse, CreateAuthorRequest, CreatedResponse};

use crate::auth::{AppState, profile, run_blocking, run_unlocked};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::hasher;
use crate::validation::validate_new_author;

pub async fn create_author(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateAuthorRequest>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    validate_new_author(&req)?;

    let plain = req.password;
    let password = run_unlocked(move || hasher::hash_password(&plain)).await?;
    let author = NewAuthor {
        email: req.email,
        password,
        name: req.name,
        biography: req.biography,
        birth_year: req.birth_year,
        nationality: req.nationality,
    };

    let id = run_blocking(&state, move |conn| register_author(conn, author)).await?;

    info!(author_id = id, "Author registered");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn get_author(
    State(state): State<AppState>,
    ApiPath(author_id): ApiPath<i64>,
) -> ApiResult<Json<AuthorResponse>> {
    let author = run_blocking(&state, move |conn| {
        AuthorStore::new(conn)
            .find_by_id(author_id)?
            .ok_or(ApiError::AuthorNotFound)
    })
    .await?;

    Ok(Json(profile(author)))
}

/// Stores a validated registration whose password is already hashed.
/// Email and name must both be unused.
pub fn register_author(conn: &Connection, author: NewAuthor) -> ApiResult<i64> {
    let store = AuthorStore::new(conn);
    if store.find_by_email(&author.email)?.is_some() || store.find_by_name(&author.name)?.is_some() {
        return Err(ApiError::Conflict);
    }
    Ok(store.insert(author)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_db::Database;

    fn author(email: &str, name: &str) -> NewAuthor {
        NewAuthor {
            email: email.to_string(),
            password: hasher::hash_password("Arrakis1!").unwrap(),
            name: name.to_string(),
            biography: Some("Wrote about desert planets.".to_string()),
            birth_year: Some(1920),
            nationality: None,
        }
    }

    #[test]
    fn registration_stores_the_prepared_hash() {
        let db = Database::open_in_memory().unwrap();
        let prepared = author("frank@herbert.com", "Frank Herbert");
        let hash = prepared.password.clone();
        db.with_conn(|conn| {
            let id = register_author(conn, prepared)?;
            let row = AuthorStore::new(conn).find_by_id(id)?.unwrap();
            assert_eq!(row.password, hash);
            assert!(hasher::verify_password("Arrakis1!", &row.password));
            assert_eq!(row.biography.as_deref(), Some("Wrote about desert planets."));
            Ok::<_, ApiError>(())
        })
        .unwrap();
    }

    #[test]
    fn duplicate_email_or_name_conflicts() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            register_author(conn, author("frank@herbert.com", "Frank Herbert"))?;
            assert!(matches!(
                register_author(conn, author("frank@herbert.com", "Brian Herbert")),
                Err(ApiError::Conflict)
            ));
            assert!(matches!(
                register_author(conn, author("brian@herbert.com", "Frank Herbert")),
                Err(ApiError::Conflict)
            ));
            Ok::<_, ApiError>(())
        })
        .unwrap();
    }
}
