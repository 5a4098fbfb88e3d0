//! Products and the write-side document shapes.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A stored product row.
///
/// `category_id` references a category that existed at write time. `image`
/// is an optional media object reference whose existence is only checked
/// when the product is resolved into a response view.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct Product {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    pub name: String,

    pub description: String,

    pub price: f64,

    /// Units currently in stock.
    pub in_stock: i64,

    /// Optional media object reference. Absence means "no image".
    pub image: Option<Uuid>,

    /// The owning category.
    pub category_id: Uuid,

    pub rating_rate: f64,

    pub rating_count: i64,
}

impl Product {
    pub fn rating(&self) -> Rating {
        Rating {
            rate: self.rating_rate,
            count: self.rating_count,
        }
    }
}

/// Customer rating aggregate embedded in a product.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Rating {
    pub rate: f64,
    pub count: i64,
}

/// A fully validated product document, ready to be inserted or to replace
/// an existing row wholesale.
#[derive(Clone, Debug)]
pub struct ProductDocument {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub in_stock: i64,
    pub image: Option<Uuid>,
    pub category_id: Uuid,
    pub rating: Rating,
}

/// Field-level changes produced by a merge request.
///
/// `image` distinguishes "leave untouched" (`None`) from "clear the
/// reference" (`Some(None)`).
#[derive(Clone, Debug, Default)]
pub struct ProductDelta {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub in_stock: Option<i64>,
    pub image: Option<Option<Uuid>>,
    pub category_id: Option<Uuid>,
    pub rating: Option<Rating>,
}

impl ProductDelta {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.in_stock.is_none()
            && self.image.is_none()
            && self.category_id.is_none()
            && self.rating.is_none()
    }
}
