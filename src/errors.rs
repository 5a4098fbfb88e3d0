use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Everything a route handler can fail with.
///
/// Client-caused failures carry a short plain-text reason in the body; 404
/// and server failures respond with an empty body. Server-side detail is
/// attached to the response extensions and logged by [`log_failures`]
/// together with the request method and path, never shown to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Entity or media object absent.
    #[error("not found")]
    NotFound,

    /// A path parameter failed to parse as an identifier.
    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),

    /// A category slug that does not resolve.
    #[error("Invalid category")]
    InvalidCategory,

    /// A media reference that is not a well-formed identifier.
    #[error("invalid image reference `{0}`")]
    InvalidReference(String),

    /// Field-level validation failure, naming the offending field.
    #[error("invalid or missing field `{0}`")]
    Validation(&'static str),

    /// Multipart upload without a `file` field.
    #[error("Missing file")]
    MissingFile,

    /// Duplicate category slug.
    #[error("category already exists")]
    CategoryExists,

    /// Missing, malformed, or unknown bearer credential.
    #[error("missing or invalid credentials")]
    Unauthorized,

    /// Valid credential without the required scope.
    #[error("insufficient scope")]
    Forbidden,

    #[error("malformed multipart body")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Server-failure detail carried to the logging middleware.
#[derive(Clone, Debug)]
pub struct FailureDetail(pub String);

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCategory
            | ApiError::InvalidReference(_)
            | ApiError::Validation(_)
            | ApiError::MissingFile
            | ApiError::Multipart(_) => StatusCode::NOT_ACCEPTABLE,
            ApiError::CategoryExists => StatusCode::CONFLICT,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Database(_) | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Database(_) | ApiError::Io(_) => {
                let mut response = status.into_response();
                response
                    .extensions_mut()
                    .insert(FailureDetail(self.to_string()));
                response
            }
            ApiError::NotFound | ApiError::Unauthorized | ApiError::Forbidden => {
                status.into_response()
            }
            other => (status, other.to_string()).into_response(),
        }
    }
}

/// Middleware that logs 5xx responses with the request method and path.
pub async fn log_failures(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let response = next.run(request).await;
    if response.status().is_server_error() {
        match response.extensions().get::<FailureDetail>() {
            Some(FailureDetail(detail)) => {
                tracing::error!(%method, %path, error = %detail, "request failed");
            }
            None => tracing::error!(%method, %path, "request failed"),
        }
    }
    response
}
