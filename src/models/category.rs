//! Product categories, addressed by slug.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A product category.
///
/// Categories are referenced by products through their id and addressed in
/// URLs through their `slug`, a unique human-readable key that never changes
/// after creation.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct Category {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Unique, immutable lookup key used in URLs.
    pub slug: String,

    /// Display label.
    pub name: String,
}

/// The public projection of a category: slug and name only.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CategorySummary {
    pub slug: String,
    pub name: String,
}

impl From<Category> for CategorySummary {
    fn from(category: Category) -> Self {
        Self {
            slug: category.slug,
            name: category.name,
        }
    }
}
