//! In-process tests that drive the composed router end to end.


use crate::{
    auth::TokenRegistry,
    services::{catalog_store::CatalogStore, media_store::MediaStore, resolver::Resolver},
    state::AppState,
};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower::ServiceExt;

/// Token granted every scope in the test registry.
pub const ADMIN_TOKEN: &str = "admin-token";
/// Known token granted an unrelated scope only.
pub const READONLY_TOKEN: &str = "readonly-token";

/// Build a router over a fresh in-memory database with the schema applied.
pub async fn test_app() -> Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    crate::apply_migrations(&pool, crate::MIGRATIONS)
        .await
        .expect("schema");

    let db = Arc::new(pool);
    let catalog = CatalogStore::new(db.clone());
    let media = MediaStore::new(db);
    let state = AppState {
        resolver: Resolver::new(catalog.clone(), media.clone()),
        catalog,
        media,
        tokens: TokenRegistry::parse(&format!(
            "{}=write:product|delete:product|write:image|delete:image|write:category,{}=read:metrics",
            ADMIN_TOKEN, READONLY_TOKEN
        )),
        port: 8080,
    };
    crate::routes::routes::routes().with_state(state)
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("infallible service")
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: &serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn bare_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Build a `multipart/form-data` upload request with a single part.
pub fn multipart_request(
    uri: &str,
    token: Option<&str>,
    field_name: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    let boundary = "test-boundary-7MA4YWxkTrZu0gW";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field_name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Create a category through the API, asserting success.
pub async fn seed_category(app: &Router, slug: &str, name: &str) {
    let response = send(
        app,
        json_request(
            "POST",
            "/category",
            Some(ADMIN_TOKEN),
            &serde_json::json!({"slug": slug, "name": name}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

/// Create a product through the API and return its id.
pub async fn seed_product(app: &Router, body: &serde_json::Value) -> String {
    let response = send(app, json_request("POST", "/product", Some(ADMIN_TOKEN), body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_text(response).await
}
