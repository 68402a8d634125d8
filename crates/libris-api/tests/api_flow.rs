use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use libris_api::{AppStateInner, AuthConfig, router};
use libris_db::Database;

fn app() -> Router {
    let state = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        auth: AuthConfig::new("integration-secret", 30, 7),
    });
    router(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, body)
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn upload_request(token: &str, filename: &str, content: &str) -> Request<Body> {
    let boundary = "libris-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         {content}\r\n\
         --{boundary}--\r\n"
    );
    Request::builder()
        .method(Method::POST)
        .uri("/api/v1/books/import")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap()
}

/// Registers an author and logs in, returning (author id, access token, refresh token).
async fn register_and_login(app: &Router, email: &str, name: &str) -> (i64, String, String) {
    let (status, body) = send(
        app,
        json_request(
            Method::POST,
            "/api/v1/author",
            None,
            json!({ "email": email, "password": "Secret12!", "name": name }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["id"].as_i64().unwrap();

    let (status, body) = send(
        app,
        json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            json!({ "email": email, "password": "Secret12!" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["token_type"], "Bearer");
    (
        id,
        body["access_token"].as_str().unwrap().to_string(),
        body["refresh_token"].as_str().unwrap().to_string(),
    )
}

fn dune() -> Value {
    json!({
        "title": "Dune",
        "genre": "SCIENCE",
        "language": "ENGLISH",
        "published_year": 1965
    })
}

#[tokio::test]
async fn health_is_public() {
    let app = app();
    let (status, body) = send(&app, empty_request(Method::GET, "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn author_registration_and_profile() {
    let app = app();
    let (id, token, _) = register_and_login(&app, "frank@herbert.com", "Frank Herbert").await;

    let (status, body) = send(
        &app,
        empty_request(Method::GET, &format!("/api/v1/author/{id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Frank Herbert");
    assert!(body.get("password").is_none());

    let (status, body) = send(&app, empty_request(Method::GET, "/api/v1/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/author",
            None,
            json!({ "email": "frank@herbert.com", "password": "Secret12!", "name": "Other Name" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["detail"].is_string());

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/author",
            None,
            json!({ "email": "weak@example.com", "password": "weakpass", "name": "Weak Author" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(&app, empty_request(Method::GET, "/api/v1/author/999", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Author by this id not found.");
}

#[tokio::test]
async fn login_failures_and_token_lifecycle() {
    let app = app();
    let (_, _, refresh) = register_and_login(&app, "ursula@example.com", "Ursula Le Guin").await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            json!({ "email": "ursula@example.com", "password": "Wrong123!" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid credentials provided");

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/auth/refresh",
            None,
            json!({ "refresh_token": refresh }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rotated = body["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(rotated, refresh);

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/auth/refresh",
            None,
            json!({ "refresh_token": refresh }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/auth/logout",
            None,
            json!({ "refresh_token": rotated }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/auth/logout",
            None,
            json!({ "refresh_token": rotated }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = app();
    let (status, _) = send(&app, json_request(Method::POST, "/api/v1/books", None, dune())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        json_request(Method::POST, "/api/v1/books", Some("garbage"), dune()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        json_request(Method::PATCH, "/api/v1/books/1", None, json!({ "title": "Other" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn book_crud_with_ownership() {
    let app = app();
    let (author_id, owner, _) = register_and_login(&app, "frank@herbert.com", "Frank Herbert").await;
    let (_, intruder, _) = register_and_login(&app, "anne@rice.com", "Anne Rice").await;

    let (status, body) = send(
        &app,
        json_request(Method::POST, "/api/v1/books", Some(&owner), dune()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let book_id = body["id"].as_i64().unwrap();
    let uri = format!("/api/v1/books/{book_id}");

    let (status, body) = send(&app, empty_request(Method::GET, &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["author_id"], author_id);
    assert_eq!(body["genre"], "SCIENCE");

    let (status, _) = send(
        &app,
        json_request(Method::PATCH, &uri, Some(&intruder), json!({ "title": "Stolen" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        json_request(Method::PATCH, &uri, Some(&owner), json!({ "title": null })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"], "No fields provided for update");

    let (status, body) = send(
        &app,
        json_request(
            Method::PATCH,
            &uri,
            Some(&owner),
            json!({ "title": "Dune Messiah", "published_year": 1969 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Dune Messiah");
    assert_eq!(body["published_year"], 1969);
    assert_eq!(body["language"], "ENGLISH");

    let (status, _) = send(
        &app,
        json_request(Method::PATCH, "/api/v1/books/999", Some(&owner), json!({ "title": "Gone" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, empty_request(Method::DELETE, &uri, Some(&intruder))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, empty_request(Method::DELETE, &uri, Some(&owner))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, empty_request(Method::GET, &uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Book was not found");
}

#[tokio::test]
async fn invalid_books_are_rejected() {
    let app = app();
    let (_, token, _) = register_and_login(&app, "frank@herbert.com", "Frank Herbert").await;

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/books",
            Some(&token),
            json!({ "title": "Dune", "genre": "POETRY", "language": "ENGLISH", "published_year": 1965 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/books",
            Some(&token),
            json!({ "title": "Dune", "genre": "SCIENCE", "language": "ENGLISH", "published_year": 1700 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn import_then_page_through_listing() {
    let app = app();
    let (author_id, token, _) = register_and_login(&app, "stephen@king.com", "Stephen King").await;

    let json_books = json!([
        { "title": "Carrie", "genre": "FICTION", "language": "ENGLISH", "published_year": 1974 },
        { "title": "The Stand", "genre": "FICTION", "language": "ENGLISH", "published_year": 1978 }
    ]);
    let (status, body) = send(
        &app,
        upload_request(&token, "books.json", &json_books.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["imported"], 2);

    let csv_books = "title,genre,language,published_year\n\
                     It,FICTION,ENGLISH,1986\n\
                     Kobzar,DRAMA,UKRAINIAN,1840\n";
    let (status, body) = send(&app, upload_request(&token, "books.csv", csv_books)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["book_ids"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, upload_request(&token, "books.txt", "whatever")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Unsupported file format. Use .json or .csv");

    let bad_item = json!([
        { "title": "Misery", "genre": "FICTION", "language": "ENGLISH", "published_year": 1987 },
        { "title": "X", "genre": "FICTION", "language": "ENGLISH", "published_year": 1987 }
    ]);
    let (status, _) = send(&app, upload_request(&token, "more.json", &bad_item.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, page) = send(
        &app,
        empty_request(Method::GET, "/api/v1/books/all?limit=3", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["items"].as_array().unwrap().len(), 3);
    let cursor = page["next_cursor"].as_i64().unwrap();

    let (_, page) = send(
        &app,
        empty_request(
            Method::GET,
            &format!("/api/v1/books/all?limit=3&cursor={cursor}"),
            None,
        ),
    )
    .await;
    let items = page["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Kobzar");
    assert!(page["next_cursor"].is_null());

    let (_, page) = send(
        &app,
        empty_request(
            Method::GET,
            &format!("/api/v1/books/all?language=UKRAINIAN&author_id={author_id}"),
            None,
        ),
    )
    .await;
    assert_eq!(page["items"].as_array().unwrap().len(), 1);

    let (_, page) = send(
        &app,
        empty_request(Method::GET, "/api/v1/books/all?year_from=1975&year_to=1990", None),
    )
    .await;
    assert_eq!(page["items"].as_array().unwrap().len(), 2);

    let (status, _) = send(
        &app,
        empty_request(Method::GET, "/api/v1/books/all?limit=101", None),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn malformed_requests_answer_with_detail() {
    let app = app();

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/author",
            None,
            json!({
                "email": "extra@example.com",
                "password": "Secret12!",
                "name": "Extra Field",
                "extra": 1
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("extra"), "{body}");

    let broken = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, broken).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string(), "{body}");

    let (status, body) = send(&app, empty_request(Method::GET, "/api/v1/books/all?limit=abc", None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string(), "{body}");

    let (status, body) = send(&app, empty_request(Method::GET, "/api/v1/books/abc", None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string(), "{body}");
}
