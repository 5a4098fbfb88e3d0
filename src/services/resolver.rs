//! Read-side assembly of product responses.
//!
//! Turns stored product rows into denormalized views: the category
//! reference expands to its slug and name, and an image reference expands
//! to a derived download URL. Both lookups tolerate a missing target:
//! integrity is enforced at write time, so a dangling reference degrades
//! here instead of failing the whole response.

use crate::{
    config::DEFAULT_PORT,
    errors::ApiError,
    models::{
        category::CategorySummary,
        product::{Product, Rating},
    },
    services::{
        catalog_store::CatalogStore,
        media_store::{self, MediaStore},
    },
};
use axum::http::{HeaderMap, header};
use futures::future::try_join_all;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

/// Denormalized response shape for a product.
#[derive(Serialize, Clone, Debug)]
pub struct ProductView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub in_stock: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    pub category: CategorySummary,
    pub rating: Rating,
}

/// An expanded image reference. `url` is absent when the media object has
/// been deleted out from under the product.
#[derive(Serialize, Clone, Debug)]
pub struct ImageRef {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Scheme and host derived from one inbound request. No state is shared
/// across requests; two requests from different hosts get different bases.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestBase {
    scheme: String,
    host: String,
}

impl RequestBase {
    /// Derive the URL base from the request headers and the configured
    /// port. The scheme comes from `x-forwarded-proto` (default `http`),
    /// the hostname from `Host` with its own port segment dropped; the
    /// configured port is appended unless it is the default (8080) or 80.
    pub fn from_headers(headers: &HeaderMap, port: u16) -> Self {
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("http")
            .to_owned();
        let hostname = headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("localhost");
        let hostname = match hostname.rsplit_once(':') {
            Some((name, digits)) if digits.chars().all(|c| c.is_ascii_digit()) => name,
            _ => hostname,
        };
        let host = if port == DEFAULT_PORT || port == 80 {
            hostname.to_owned()
        } else {
            format!("{}:{}", hostname, port)
        };
        Self { scheme, host }
    }

    pub fn url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}

/// Download URL for a stored image: `{base}/image/{id}.{ext}`.
pub fn image_url(base: &RequestBase, id: Uuid, content_type: &str) -> String {
    format!(
        "{}/image/{}.{}",
        base.url(),
        id,
        media_store::resolve_extension(content_type)
    )
}

/// Stateless resolver over the two stores; all state lives in them.
#[derive(Clone)]
pub struct Resolver {
    catalog: CatalogStore,
    media: MediaStore,
}

impl Resolver {
    pub fn new(catalog: CatalogStore, media: MediaStore) -> Self {
        Self { catalog, media }
    }

    /// Expand one product into its response view.
    ///
    /// A category row that has vanished degrades to empty slug/name; a
    /// vanished media object degrades to an id-only image reference. Store
    /// failures other than absence still fail the response.
    pub async fn resolve(
        &self,
        product: Product,
        base: &RequestBase,
    ) -> Result<ProductView, ApiError> {
        let category = match self.catalog.find_category_by_id(product.category_id).await {
            Ok(category) => CategorySummary::from(category),
            Err(ApiError::NotFound) => CategorySummary {
                slug: String::new(),
                name: String::new(),
            },
            Err(other) => return Err(other),
        };

        let image = match product.image {
            None => None,
            Some(id) => Some(self.resolve_image(id, base).await?),
        };

        Ok(ProductView {
            id: product.id,
            rating: product.rating(),
            name: product.name,
            description: product.description,
            price: product.price,
            in_stock: product.in_stock,
            image,
            category,
        })
    }

    /// Expand many products; lookups for the individual views run
    /// concurrently.
    pub async fn resolve_all(
        &self,
        products: Vec<Product>,
        base: &RequestBase,
    ) -> Result<Vec<ProductView>, ApiError> {
        try_join_all(products.into_iter().map(|product| self.resolve(product, base))).await
    }

    async fn resolve_image(&self, id: Uuid, base: &RequestBase) -> Result<ImageRef, ApiError> {
        match self.media.metadata(id).await {
            Ok(meta) => Ok(ImageRef {
                id,
                url: Some(image_url(base, id, &meta.content_type)),
            }),
            Err(ApiError::NotFound) => {
                warn!(image = %id, "product references a missing media object");
                Ok(ImageRef { id, url: None })
            }
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use bytes::Bytes;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;

    fn headers(host: Option<&str>, proto: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(host) = host {
            map.insert(header::HOST, HeaderValue::from_str(host).unwrap());
        }
        if let Some(proto) = proto {
            map.insert("x-forwarded-proto", HeaderValue::from_str(proto).unwrap());
        }
        map
    }

    #[test]
    fn default_and_plain_http_ports_are_suppressed() {
        let base = RequestBase::from_headers(&headers(Some("shop.example.com:8080"), None), 8080);
        assert_eq!(base.url(), "http://shop.example.com");

        let base = RequestBase::from_headers(&headers(Some("shop.example.com"), None), 80);
        assert_eq!(base.url(), "http://shop.example.com");
    }

    #[test]
    fn custom_port_is_appended_from_config_not_host_header() {
        let base = RequestBase::from_headers(&headers(Some("shop.example.com:9999"), None), 3000);
        assert_eq!(base.url(), "http://shop.example.com:3000");
    }

    #[test]
    fn forwarded_proto_sets_the_scheme() {
        let base = RequestBase::from_headers(&headers(Some("shop.example.com"), Some("https")), 8080);
        assert_eq!(base.url(), "https://shop.example.com");
    }

    #[test]
    fn missing_host_falls_back_to_localhost() {
        let base = RequestBase::from_headers(&headers(None, None), 8080);
        assert_eq!(base.url(), "http://localhost");
    }

    async fn stores() -> (CatalogStore, MediaStore, Resolver) {
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
        let resolver = Resolver::new(catalog.clone(), media.clone());
        (catalog, media, resolver)
    }

    fn product(category_id: Uuid, image: Option<Uuid>) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Lamp".into(),
            description: "Brass".into(),
            price: 60.0,
            in_stock: 2,
            image,
            category_id,
            rating_rate: 4.0,
            rating_count: 11,
        }
    }

    #[tokio::test]
    async fn resolves_category_and_image_url() {
        let (catalog, media, resolver) = stores().await;
        let category = catalog.insert_category("lighting", "Lighting").await.unwrap();
        let file = media
            .put(
                "lamp.png",
                "image/png",
                futures::stream::iter(vec![Ok(Bytes::from_static(b"png-bytes"))]),
            )
            .await
            .unwrap();

        let base = RequestBase::from_headers(&headers(Some("shop.example.com"), None), 8080);
        let view = resolver
            .resolve(product(category.id, Some(file.id)), &base)
            .await
            .unwrap();

        assert_eq!(view.category.slug, "lighting");
        assert_eq!(view.category.name, "Lighting");
        let image = view.image.unwrap();
        assert_eq!(image.id, file.id);
        assert_eq!(
            image.url.unwrap(),
            format!("http://shop.example.com/image/{}.png", file.id)
        );
    }

    #[tokio::test]
    async fn missing_category_degrades_to_empty_fields() {
        let (_, _, resolver) = stores().await;
        let base = RequestBase::from_headers(&headers(Some("shop.example.com"), None), 8080);

        let view = resolver
            .resolve(product(Uuid::new_v4(), None), &base)
            .await
            .unwrap();

        assert_eq!(view.category.slug, "");
        assert_eq!(view.category.name, "");
        assert!(view.image.is_none());
    }

    #[tokio::test]
    async fn missing_media_degrades_to_id_only_reference() {
        let (catalog, _, resolver) = stores().await;
        let category = catalog.insert_category("lighting", "Lighting").await.unwrap();
        let ghost = Uuid::new_v4();
        let base = RequestBase::from_headers(&headers(Some("shop.example.com"), None), 8080);

        let view = resolver
            .resolve(product(category.id, Some(ghost)), &base)
            .await
            .unwrap();

        let image = view.image.unwrap();
        assert_eq!(image.id, ghost);
        assert!(image.url.is_none());
    }
}
