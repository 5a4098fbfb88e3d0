//! HTTP handlers for categories and products.
//!
//! Reads go through the resolver so every product leaves the service as a
//! denormalized view; writes go through the mutation pipeline so nothing
//! invalid reaches the store.

use crate::{
    auth,
    errors::ApiError,
    models::category::CategorySummary,
    services::{
        mutation,
        resolver::{ProductView, RequestBase},
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde_json::{Map, Value};
use uuid::Uuid;

/// GET `/categories` — every category, slug and name only.
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state.catalog.list_categories().await?;
    Ok(Json(
        categories
            .into_iter()
            .map(CategorySummary::from)
            .collect::<Vec<_>>(),
    ))
}

/// POST `/category` — admin write path for new categories.
pub async fn create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    auth::authorize(&state.tokens, &headers, auth::WRITE_CATEGORY)?;

    let slug = body
        .get("slug")
        .and_then(Value::as_str)
        .filter(|slug| !slug.is_empty())
        .ok_or(ApiError::Validation("slug"))?;
    let name = body
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or(ApiError::Validation("name"))?;

    let category = state.catalog.insert_category(slug, name).await?;
    Ok((StatusCode::CREATED, Json(CategorySummary::from(category))))
}

/// GET `/category/{slug}` — resolved views of a category's products.
/// 404 for an unknown slug, as distinct from a known slug with no products.
pub async fn category_products(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.catalog.find_category_by_slug(&slug).await?;
    let products = state.catalog.products_in_category(category.id).await?;
    let base = RequestBase::from_headers(&headers, state.port);
    Ok(Json(state.resolver.resolve_all(products, &base).await?))
}

/// GET `/products` — resolved views of the whole catalog.
pub async fn list_products(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let products = state.catalog.list_products().await?;
    let base = RequestBase::from_headers(&headers, state.port);
    Ok(Json(state.resolver.resolve_all(products, &base).await?))
}

/// GET `/product/{id}` — one resolved view.
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let product = state.catalog.find_product(id).await?;
    let base = RequestBase::from_headers(&headers, state.port);
    Ok(Json(state.resolver.resolve(product, &base).await?))
}

/// POST `/product` — create; responds 201 with the new id.
pub async fn create_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    auth::authorize(&state.tokens, &headers, auth::WRITE_PRODUCT)?;
    let body = object(body)?;
    let id = mutation::create_product(&state.catalog, &body).await?;
    Ok((StatusCode::CREATED, id.to_string()))
}

/// PUT `/product/{id}` — full-document replace.
pub async fn replace_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<ProductView>, ApiError> {
    auth::authorize(&state.tokens, &headers, auth::WRITE_PRODUCT)?;
    let id = parse_id(&id)?;
    let body = object(body)?;
    mutation::replace_product(&state.catalog, id, &body).await?;
    resolved_view(&state, id, &headers).await
}

/// PATCH `/product/{id}` — partial merge; unsupplied fields persist.
pub async fn merge_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<ProductView>, ApiError> {
    auth::authorize(&state.tokens, &headers, auth::WRITE_PRODUCT)?;
    let id = parse_id(&id)?;
    let body = object(body)?;
    mutation::merge_product(&state.catalog, id, &body).await?;
    resolved_view(&state, id, &headers).await
}

/// DELETE `/product/{id}` — 404 when the id never existed.
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    auth::authorize(&state.tokens, &headers, auth::DELETE_PRODUCT)?;
    let id = parse_id(&id)?;
    mutation::delete_product(&state.catalog, id).await?;
    Ok(StatusCode::OK)
}

async fn resolved_view(
    state: &AppState,
    id: Uuid,
    headers: &HeaderMap,
) -> Result<Json<ProductView>, ApiError> {
    let product = state.catalog.find_product(id).await?;
    let base = RequestBase::from_headers(headers, state.port);
    Ok(Json(state.resolver.resolve(product, &base).await?))
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidIdentifier(raw.to_owned()))
}

fn object(body: Value) -> Result<Map<String, Value>, ApiError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::Validation("body")),
    }
}
