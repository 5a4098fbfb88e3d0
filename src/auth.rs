//! Bearer-token authorization gate.
//!
//! Credential issuance and rotation live outside this service; handlers
//! consume the gate as a proceed/reject check against a static registry of
//! tokens and their granted scopes, loaded from configuration.

use crate::errors::ApiError;
use axum::http::{HeaderMap, header};
use std::collections::{HashMap, HashSet};

pub const WRITE_PRODUCT: &str = "write:product";
pub const DELETE_PRODUCT: &str = "delete:product";
pub const WRITE_IMAGE: &str = "write:image";
pub const DELETE_IMAGE: &str = "delete:image";
pub const WRITE_CATEGORY: &str = "write:category";

/// Static token-to-scopes registry.
#[derive(Clone, Debug, Default)]
pub struct TokenRegistry {
    tokens: HashMap<String, HashSet<String>>,
}

impl TokenRegistry {
    /// Parse the `token=scope|scope,token2=...` format used by
    /// `CATALOG_API_TOKENS`. An entry without `=` is a token granting no
    /// scopes; blank entries are skipped.
    pub fn parse(raw: &str) -> Self {
        let mut tokens = HashMap::new();
        for entry in raw.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let (token, scopes) = entry.split_once('=').unwrap_or((entry, ""));
            let scopes = scopes
                .split('|')
                .map(str::trim)
                .filter(|scope| !scope.is_empty())
                .map(str::to_owned)
                .collect();
            tokens.insert(token.trim().to_owned(), scopes);
        }
        Self { tokens }
    }

    fn scopes_for(&self, token: &str) -> Option<&HashSet<String>> {
        self.tokens.get(token)
    }
}

/// Check the request's bearer credential against the registry.
///
/// Missing, malformed, or unknown tokens reject with `Unauthorized` (401);
/// a known token without `scope` rejects with `Forbidden` (403).
pub fn authorize(
    registry: &TokenRegistry,
    headers: &HeaderMap,
    scope: &str,
) -> Result<(), ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::Unauthorized)?;
    let scopes = registry.scopes_for(token).ok_or(ApiError::Unauthorized)?;
    if scopes.contains(scope) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
