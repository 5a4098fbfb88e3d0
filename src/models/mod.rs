//! Core data models for the catalog and media storage service.
//!
//! These entities represent categories, products, and stored media objects.
//! They map cleanly to database tables via `sqlx::FromRow` and serialize
//! naturally as JSON via `serde`.

pub mod category;
pub mod media;
pub mod product;
