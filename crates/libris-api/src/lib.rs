pub mod auth;
pub mod authors;
pub mod books;
pub mod config;
pub mod error;
pub mod extract;
pub mod hasher;
pub mod importers;
pub mod middleware;
pub mod tokens;
pub mod validation;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
};
use serde_json::{Value, json};

pub use auth::{AppState, AppStateInner};
pub use config::AuthConfig;
pub use error::{ApiError, ApiResult};

/// Multipart framing allowance on top of the import file limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Every route of the service. Protected routes require a bearer token.
pub fn router(state: AppState) -> Router {
    let auth_layer = from_fn_with_state(state.clone(), middleware::require_auth);

    let book_item = get(books::get_book).merge(
        patch(books::update_book)
            .delete(books::delete_book)
            .route_layer(auth_layer.clone()),
    );

    let public = Router::new()
        .route("/health", get(health))
        .route("/api/v1/author", post(authors::create_author))
        .route("/api/v1/author/{author_id}", get(authors::get_author))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/books/all", get(books::list_books))
        .route("/api/v1/books/{book_id}", book_item);

    let protected = Router::new()
        .route("/api/v1/auth/me", get(auth::me))
        .route("/api/v1/books", post(books::create_book))
        .route(
            "/api/v1/books/import",
            post(books::import_books)
                .layer(DefaultBodyLimit::max(books::IMPORT_FILE_LIMIT + MULTIPART_OVERHEAD)),
        )
        .route_layer(auth_layer);

    public.merge(protected).with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
