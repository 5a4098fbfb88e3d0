//! Validation and sequencing of catalog writes.
//!
//! Every write path resolves references before touching the store: the
//! `category` field (a slug in the request) must resolve to a stored
//! category, an `image` value must parse as a media identifier, and field
//! shapes are checked with the first failure naming the field. Only then is
//! anything persisted, so the store never observes an invalid or
//! half-applied product.
//!
//! Requests arrive as raw JSON objects rather than typed structs so that a
//! wrong-typed field surfaces as a 406 naming the field instead of a
//! framework decode rejection. Fields outside the product schema are
//! ignored.

use crate::{
    errors::ApiError,
    models::product::{ProductDelta, ProductDocument, Rating},
    services::catalog_store::CatalogStore,
};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Sentinel price applied when a full-document write omits `price`.
const DEFAULT_PRICE: f64 = 100.0;

/// Validate and insert a new product, returning its id.
pub async fn create_product(
    catalog: &CatalogStore,
    body: &Map<String, Value>,
) -> Result<Uuid, ApiError> {
    let doc = build_document(catalog, body).await?;
    catalog.insert_product(&doc).await
}

/// Validate and apply a full-document replace. Fields omitted from `body`
/// are dropped to their defaults, not preserved.
pub async fn replace_product(
    catalog: &CatalogStore,
    id: Uuid,
    body: &Map<String, Value>,
) -> Result<(), ApiError> {
    let doc = build_document(catalog, body).await?;
    catalog.replace_product(id, &doc).await
}

/// Validate and apply a partial merge: only supplied fields change, each
/// under the same per-field rules as a create. The stored row stays typed,
/// so a delta that passes validation cannot leave the merged document
/// invalid.
pub async fn merge_product(
    catalog: &CatalogStore,
    id: Uuid,
    body: &Map<String, Value>,
) -> Result<(), ApiError> {
    // Existence first: a missing id is NotFound, not a validation failure.
    catalog.find_product(id).await?;
    let delta = build_delta(catalog, body).await?;
    catalog.update_product_fields(id, &delta).await
}

/// Load-then-delete so a missing id surfaces as NotFound, never as a
/// silent success.
pub async fn delete_product(catalog: &CatalogStore, id: Uuid) -> Result<(), ApiError> {
    catalog.find_product(id).await?;
    catalog.delete_product(id).await
}

/// Build a full product document: resolve the category slug, parse the
/// image reference, then validate remaining fields, filling defaults.
async fn build_document(
    catalog: &CatalogStore,
    body: &Map<String, Value>,
) -> Result<ProductDocument, ApiError> {
    let category_id = resolve_category(catalog, body.get("category")).await?;
    let image = parse_image(body.get("image"))?.flatten();

    let name = match body.get("name") {
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        _ => return Err(ApiError::Validation("name")),
    };
    let description = match body.get("description") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(description)) => description.clone(),
        Some(_) => return Err(ApiError::Validation("description")),
    };
    let price = match body.get("price") {
        None | Some(Value::Null) => DEFAULT_PRICE,
        Some(value) => value.as_f64().ok_or(ApiError::Validation("price"))?,
    };
    let in_stock = match body.get("in_stock") {
        None | Some(Value::Null) => 0,
        Some(value) => value.as_i64().ok_or(ApiError::Validation("in_stock"))?,
    };
    let rating = parse_rating(body.get("rating"))?.ok_or(ApiError::Validation("rating"))?;

    Ok(ProductDocument {
        name,
        description,
        price,
        in_stock,
        image,
        category_id,
        rating,
    })
}

/// Apply the per-field rules to only the fields present in `body`.
async fn build_delta(
    catalog: &CatalogStore,
    body: &Map<String, Value>,
) -> Result<ProductDelta, ApiError> {
    let mut delta = ProductDelta::default();

    if body.contains_key("category") {
        delta.category_id = Some(resolve_category(catalog, body.get("category")).await?);
    }
    delta.image = parse_image(body.get("image"))?;

    if let Some(value) = body.get("name") {
        delta.name = match value {
            Value::String(name) if !name.is_empty() => Some(name.clone()),
            _ => return Err(ApiError::Validation("name")),
        };
    }
    if let Some(value) = body.get("description") {
        delta.description = match value {
            Value::String(description) => Some(description.clone()),
            _ => return Err(ApiError::Validation("description")),
        };
    }
    if let Some(value) = body.get("price") {
        delta.price = Some(value.as_f64().ok_or(ApiError::Validation("price"))?);
    }
    if let Some(value) = body.get("in_stock") {
        delta.in_stock = Some(value.as_i64().ok_or(ApiError::Validation("in_stock"))?);
    }
    if body.contains_key("rating") {
        delta.rating = Some(parse_rating(body.get("rating"))?.ok_or(ApiError::Validation("rating"))?);
    }

    Ok(delta)
}

/// Resolve the request's category slug to the stored category id.
async fn resolve_category(
    catalog: &CatalogStore,
    value: Option<&Value>,
) -> Result<Uuid, ApiError> {
    let slug = match value {
        Some(Value::String(slug)) if !slug.is_empty() => slug,
        _ => return Err(ApiError::Validation("category")),
    };
    match catalog.find_category_by_slug(slug).await {
        Ok(category) => Ok(category.id),
        Err(ApiError::NotFound) => Err(ApiError::InvalidCategory),
        Err(other) => Err(other),
    }
}

/// Parse an image reference: absent (`None`), explicit null to clear
/// (`Some(None)`), or a media identifier string (`Some(Some(id))`).
/// Existence of the media object is checked lazily at read time, not here.
fn parse_image(value: Option<&Value>) -> Result<Option<Option<Uuid>>, ApiError> {
    match value {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(None)),
        Some(Value::String(raw)) => Uuid::parse_str(raw)
            .map(|id| Some(Some(id)))
            .map_err(|_| ApiError::InvalidReference(raw.clone())),
        Some(other) => Err(ApiError::InvalidReference(other.to_string())),
    }
}

fn parse_rating(value: Option<&Value>) -> Result<Option<Rating>, ApiError> {
    let obj = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(obj)) => obj,
        Some(_) => return Err(ApiError::Validation("rating")),
    };
    let rate = obj
        .get("rate")
        .and_then(Value::as_f64)
        .ok_or(ApiError::Validation("rating"))?;
    let count = obj
        .get("count")
        .and_then(Value::as_i64)
        .ok_or(ApiError::Validation("rating"))?;
    Ok(Some(Rating { rate, count }))
}
