//! Shared per-process state handed to every handler.

use crate::{
    auth::TokenRegistry,
    config::AppConfig,
    services::{catalog_store::CatalogStore, media_store::MediaStore, resolver::Resolver},
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Everything a handler needs: the two stores, the read-side resolver, the
/// token registry, and the configured port for URL synthesis.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogStore,
    pub media: MediaStore,
    pub resolver: Resolver,
    pub tokens: TokenRegistry,
    pub port: u16,
}

impl AppState {
    pub fn new(db: Arc<SqlitePool>, config: &AppConfig) -> Self {
        let catalog = CatalogStore::new(db.clone());
        let media = MediaStore::new(db);
        Self {
            resolver: Resolver::new(catalog.clone(), media.clone()),
            catalog,
            media,
            tokens: TokenRegistry::parse(&config.api_tokens),
            port: config.port,
        }
    }
}
