//! Media object metadata and bucket routing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata record for a stored media object.
///
/// The binary payload lives in ordered fixed-size chunk rows; this record is
/// written only after every chunk is durable, so its presence is what makes
/// an object visible to readers.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct MediaFile {
    /// Opaque identifier assigned at upload time.
    pub id: Uuid,

    /// Logical partition chosen once at upload from the declared MIME type.
    pub bucket: String,

    /// Original filename supplied by the uploader.
    pub filename: String,

    /// Declared MIME type.
    pub content_type: String,

    /// Total payload size in bytes.
    pub length: i64,

    /// Chunk size the payload was split with.
    pub chunk_size: i64,

    /// Hex digest of the payload, computed while streaming.
    pub md5: String,

    /// When the upload completed.
    pub upload_date: DateTime<Utc>,
}

/// The two logical partitions of the media store.
///
/// Routing happens once, at upload, on the exact declared MIME string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaBucket {
    Images,
    Files,
}

impl MediaBucket {
    pub fn for_content_type(content_type: &str) -> Self {
        match content_type {
            "image/png" | "image/jpeg" => MediaBucket::Images,
            _ => MediaBucket::Files,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaBucket::Images => "images",
            MediaBucket::Files => "files",
        }
    }
}
