//! Persistent records for categories and products.
//!
//! Plain CRUD with key/slug lookups. Driver-level `RowNotFound` maps to
//! [`ApiError::NotFound`] at this boundary so callers never branch on
//! sqlx error variants.

use crate::{
    errors::ApiError,
    models::{
        category::Category,
        product::{Product, ProductDelta, ProductDocument},
    },
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// CatalogStore provides lookups and writes for the two catalog entities.
///
/// Uniqueness of category slugs is enforced by the schema; this layer
/// translates the constraint violation into a domain error.
#[derive(Clone)]
pub struct CatalogStore {
    /// Shared SQLite connection pool used for all catalog queries.
    pub db: Arc<SqlitePool>,
}

impl CatalogStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub async fn find_category_by_slug(&self, slug: &str) -> Result<Category, ApiError> {
        sqlx::query_as::<_, Category>("SELECT id, slug, name FROM categories WHERE slug = ?")
            .bind(slug)
            .fetch_one(&*self.db)
            .await
            .map_err(not_found)
    }

    pub async fn find_category_by_id(&self, id: Uuid) -> Result<Category, ApiError> {
        sqlx::query_as::<_, Category>("SELECT id, slug, name FROM categories WHERE id = ?")
            .bind(id)
            .fetch_one(&*self.db)
            .await
            .map_err(not_found)
    }

    /// All categories. Order is not guaranteed.
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        Ok(
            sqlx::query_as::<_, Category>("SELECT id, slug, name FROM categories")
                .fetch_all(&*self.db)
                .await?,
        )
    }

    /// Insert a category; a duplicate slug fails with `CategoryExists`.
    pub async fn insert_category(&self, slug: &str, name: &str) -> Result<Category, ApiError> {
        let category = Category {
            id: Uuid::new_v4(),
            slug: slug.to_owned(),
            name: name.to_owned(),
        };
        match sqlx::query("INSERT INTO categories (id, slug, name) VALUES (?, ?, ?)")
            .bind(category.id)
            .bind(&category.slug)
            .bind(&category.name)
            .execute(&*self.db)
            .await
        {
            Ok(_) => Ok(category),
            Err(err) if is_unique_violation(&err) => Err(ApiError::CategoryExists),
            Err(err) => Err(ApiError::Database(err)),
        }
    }

    pub async fn find_product(&self, id: Uuid) -> Result<Product, ApiError> {
        sqlx::query_as::<_, Product>(
            "SELECT id, name, description, price, in_stock, image, category_id, rating_rate, rating_count
             FROM products WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(not_found)
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        Ok(sqlx::query_as::<_, Product>(
            "SELECT id, name, description, price, in_stock, image, category_id, rating_rate, rating_count
             FROM products",
        )
        .fetch_all(&*self.db)
        .await?)
    }

    pub async fn products_in_category(&self, category_id: Uuid) -> Result<Vec<Product>, ApiError> {
        Ok(sqlx::query_as::<_, Product>(
            "SELECT id, name, description, price, in_stock, image, category_id, rating_rate, rating_count
             FROM products WHERE category_id = ?",
        )
        .bind(category_id)
        .fetch_all(&*self.db)
        .await?)
    }

    pub async fn insert_product(&self, doc: &ProductDocument) -> Result<Uuid, ApiError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO products (id, name, description, price, in_stock, image, category_id, rating_rate, rating_count)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&doc.name)
        .bind(&doc.description)
        .bind(doc.price)
        .bind(doc.in_stock)
        .bind(doc.image)
        .bind(doc.category_id)
        .bind(doc.rating.rate)
        .bind(doc.rating.count)
        .execute(&*self.db)
        .await?;
        Ok(id)
    }

    /// Full-document swap: every column takes the value from `doc`.
    pub async fn replace_product(&self, id: Uuid, doc: &ProductDocument) -> Result<(), ApiError> {
        let result = sqlx::query(
            "UPDATE products
             SET name = ?, description = ?, price = ?, in_stock = ?, image = ?,
                 category_id = ?, rating_rate = ?, rating_count = ?
             WHERE id = ?",
        )
        .bind(&doc.name)
        .bind(&doc.description)
        .bind(doc.price)
        .bind(doc.in_stock)
        .bind(doc.image)
        .bind(doc.category_id)
        .bind(doc.rating.rate)
        .bind(doc.rating.count)
        .bind(id)
        .execute(&*self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }

    /// Field-level update: only the columns present in `delta` change.
    pub async fn update_product_fields(
        &self,
        id: Uuid,
        delta: &ProductDelta,
    ) -> Result<(), ApiError> {
        if delta.is_empty() {
            // Nothing to change, but a missing id must still be reported.
            return self.find_product(id).await.map(|_| ());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE products SET ");
        {
            let mut fields = builder.separated(", ");
            if let Some(name) = &delta.name {
                fields.push("name = ");
                fields.push_bind_unseparated(name.clone());
            }
            if let Some(description) = &delta.description {
                fields.push("description = ");
                fields.push_bind_unseparated(description.clone());
            }
            if let Some(price) = delta.price {
                fields.push("price = ");
                fields.push_bind_unseparated(price);
            }
            if let Some(in_stock) = delta.in_stock {
                fields.push("in_stock = ");
                fields.push_bind_unseparated(in_stock);
            }
            if let Some(image) = delta.image {
                fields.push("image = ");
                fields.push_bind_unseparated(image);
            }
            if let Some(category_id) = delta.category_id {
                fields.push("category_id = ");
                fields.push_bind_unseparated(category_id);
            }
            if let Some(rating) = delta.rating {
                fields.push("rating_rate = ");
                fields.push_bind_unseparated(rating.rate);
                fields.push("rating_count = ");
                fields.push_bind_unseparated(rating.count);
            }
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);

        let result = builder.build().execute(&*self.db).await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }

    pub async fn delete_product(&self, id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }
}

fn not_found(err: sqlx::Error) -> ApiError {
    match err {
        sqlx::Error::RowNotFound => ApiError::NotFound,
        other => ApiError::Database(other),
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::product::Rating;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> CatalogStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory database");
        crate::apply_migrations(&pool, crate::MIGRATIONS)
            .await
            .expect("schema");
        CatalogStore::new(Arc::new(pool))
    }

    fn document(category_id: Uuid) -> ProductDocument {
        ProductDocument {
            name: "Walnut desk".into(),
            description: "Solid walnut, 140cm".into(),
            price: 450.0,
            in_stock: 3,
            image: None,
            category_id,
            rating: Rating { rate: 4.5, count: 17 },
        }
    }

    #[tokio::test]
    async fn duplicate_slug_is_rejected() {
        let store = store().await;
        store.insert_category("desks", "Desks").await.unwrap();
        assert!(matches!(
            store.insert_category("desks", "Other desks").await,
            Err(ApiError::CategoryExists)
        ));
        assert_eq!(store.list_categories().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn slug_and_id_lookups_agree() {
        let store = store().await;
        let created = store.insert_category("desks", "Desks").await.unwrap();
        let by_slug = store.find_category_by_slug("desks").await.unwrap();
        let by_id = store.find_category_by_id(created.id).await.unwrap();
        assert_eq!(by_slug, by_id);
        assert!(matches!(
            store.find_category_by_slug("chairs").await,
            Err(ApiError::NotFound)
        ));
    }

    #[tokio::test]
    async fn partial_update_touches_only_supplied_columns() {
        let store = store().await;
        let category = store.insert_category("desks", "Desks").await.unwrap();
        let id = store.insert_product(&document(category.id)).await.unwrap();

        let delta = ProductDelta {
            in_stock: Some(9),
            ..ProductDelta::default()
        };
        store.update_product_fields(id, &delta).await.unwrap();

        let product = store.find_product(id).await.unwrap();
        assert_eq!(product.in_stock, 9);
        assert_eq!(product.description, "Solid walnut, 140cm");
        assert_eq!(product.price, 450.0);
    }

    #[tokio::test]
    async fn clearing_an_image_sets_null() {
        let store = store().await;
        let category = store.insert_category("desks", "Desks").await.unwrap();
        let mut doc = document(category.id);
        doc.image = Some(Uuid::new_v4());
        let id = store.insert_product(&doc).await.unwrap();

        let delta = ProductDelta {
            image: Some(None),
            ..ProductDelta::default()
        };
        store.update_product_fields(id, &delta).await.unwrap();
        assert_eq!(store.find_product(id).await.unwrap().image, None);
    }

    #[tokio::test]
    async fn targeted_mutations_on_missing_ids_are_not_found() {
        let store = store().await;
        let category = store.insert_category("desks", "Desks").await.unwrap();
        let ghost = Uuid::new_v4();

        assert!(matches!(
            store.replace_product(ghost, &document(category.id)).await,
            Err(ApiError::NotFound)
        ));
        assert!(matches!(
            store
                .update_product_fields(ghost, &ProductDelta { in_stock: Some(1), ..Default::default() })
                .await,
            Err(ApiError::NotFound)
        ));
        assert!(matches!(
            store.delete_product(ghost).await,
            Err(ApiError::NotFound)
        ));
        assert!(matches!(
            store.update_product_fields(ghost, &ProductDelta::default()).await,
            Err(ApiError::NotFound)
        ));
    }
}
