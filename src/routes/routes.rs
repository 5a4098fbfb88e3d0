//! Defines routes for the catalog and media API.
//!
//! ## Structure
//! - **Catalog endpoints**
//!   - `GET    /categories` — list categories (slug + name)
//!   - `POST   /category` — create category (write:category)
//!   - `GET    /category/{slug}` — products in a category, resolved
//!   - `GET    /products` — all products, resolved
//!   - `POST   /product` — create product (write:product)
//!   - `GET    /product/{id}` — one product, resolved
//!   - `PUT    /product/{id}` — full replace (write:product)
//!   - `PATCH  /product/{id}` — partial merge (write:product)
//!   - `DELETE /product/{id}` — delete (delete:product)
//!
//! - **Media endpoints**
//!   - `GET    /images` — metadata of the images bucket
//!   - `POST   /image` — multipart upload (write:image)
//!   - `GET    /image/{id}` — streamed download; `{id}` may carry a
//!     cosmetic extension (`{id}.jpg`)
//!   - `DELETE /image/{id}` — delete (delete:image)
//!
//! Every route shares [`AppState`]; server failures are logged with the
//! request method and path by `log_failures`.

use crate::{
    errors::log_failures,
    handlers::{
        catalog_handlers::{
            category_products, create_category, create_product, delete_product, get_product,
            list_categories, list_products, merge_product, replace_product,
        },
        health_handlers::{healthz, readyz},
        media_handlers::{delete_image, download_image, list_images, upload_image},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};

/// Build and return the router for all catalog and media routes.
///
/// The router carries shared state ([`AppState`]) to all handlers; the
/// caller attaches it with `.with_state(..)`.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Catalog routes
        .route("/categories", get(list_categories))
        .route("/category", post(create_category))
        .route("/category/{slug}", get(category_products))
        .route("/products", get(list_products))
        .route("/product", post(create_product))
        .route(
            "/product/{id}",
            get(get_product)
                .put(replace_product)
                .patch(merge_product)
                .delete(delete_product),
        )
        // Media routes
        .route("/images", get(list_images))
        .route(
            "/image",
            post(upload_image).layer(DefaultBodyLimit::disable()),
        )
        .route("/image/{id}", get(download_image).delete(delete_image))
        .layer(middleware::from_fn(log_failures))
}
