//! src/services/media_store.rs
//!
//! MediaStore — chunked binary blob storage backed by SQLite. Payloads are
//! split into fixed-size chunks written strictly in order, and the metadata
//! row is written only after the last chunk is durable, so readers can never
//! observe a partially uploaded object. Deletion removes the metadata row
//! and every chunk in a single transaction.

use crate::{
    errors::ApiError,
    models::media::{MediaBucket, MediaFile},
};
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut, stream::BoxStream};
use md5::Context;
use sqlx::SqlitePool;
use std::{io, sync::Arc};
use tracing::debug;
use uuid::Uuid;

/// Fixed chunk size for every stored object, chosen once for the store.
pub const CHUNK_SIZE: usize = 255 * 1024;

/// MediaStore provides streamed blob operations:
/// - Upload a blob (ordered chunk inserts, metadata row written last)
/// - Open a blob for reading (metadata plus a lazy chunk stream)
/// - Delete a blob (metadata and chunks removed as a unit)
///
/// It holds nothing but the shared pool handle, so it is cheap to clone
/// into handlers.
#[derive(Clone)]
pub struct MediaStore {
    /// Shared SQLite connection pool used for metadata and chunk rows.
    pub db: Arc<SqlitePool>,
}

impl MediaStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Stream-upload a blob.
    ///
    /// Consumes `stream` to the end, splitting it into `CHUNK_SIZE` chunks.
    /// Chunk `k` is durable before chunk `k + 1` is written, and the
    /// metadata row is inserted only after the final chunk. A stream or
    /// insert failure removes every chunk already written and surfaces the
    /// error; the object is never reachable under the new id.
    pub async fn put<S>(
        &self,
        filename: &str,
        content_type: &str,
        stream: S,
    ) -> Result<MediaFile, ApiError>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let id = Uuid::new_v4();
        let bucket = MediaBucket::for_content_type(content_type);

        let mut pending = BytesMut::new();
        let mut digest = Context::new();
        let mut length: i64 = 0;
        let mut next_idx: i64 = 0;

        pin_mut!(stream);
        while let Some(piece) = stream.next().await {
            let piece = match piece {
                Ok(piece) => piece,
                Err(err) => {
                    self.discard_chunks(id).await;
                    return Err(ApiError::Io(err));
                }
            };
            digest.consume(&piece);
            length += piece.len() as i64;
            pending.extend_from_slice(&piece);

            while pending.len() >= CHUNK_SIZE {
                let chunk = pending.split_to(CHUNK_SIZE).freeze();
                if let Err(err) = self.write_chunk(id, next_idx, &chunk).await {
                    self.discard_chunks(id).await;
                    return Err(err);
                }
                next_idx += 1;
            }
        }

        if !pending.is_empty() {
            let chunk = pending.split().freeze();
            if let Err(err) = self.write_chunk(id, next_idx, &chunk).await {
                self.discard_chunks(id).await;
                return Err(err);
            }
            next_idx += 1;
        }

        let file = MediaFile {
            id,
            bucket: bucket.as_str().to_owned(),
            filename: filename.to_owned(),
            content_type: content_type.to_owned(),
            length,
            chunk_size: CHUNK_SIZE as i64,
            md5: format!("{:x}", digest.compute()),
            upload_date: Utc::now(),
        };

        let inserted = sqlx::query(
            "INSERT INTO media_files (id, bucket, filename, content_type, length, chunk_size, md5, upload_date)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(file.id)
        .bind(&file.bucket)
        .bind(&file.filename)
        .bind(&file.content_type)
        .bind(file.length)
        .bind(file.chunk_size)
        .bind(&file.md5)
        .bind(file.upload_date)
        .execute(&*self.db)
        .await;

        if let Err(err) = inserted {
            self.discard_chunks(id).await;
            return Err(ApiError::Database(err));
        }

        debug!(id = %file.id, bucket = %file.bucket, chunks = next_idx, "stored media object");
        Ok(file)
    }

    async fn write_chunk(&self, file_id: Uuid, idx: i64, data: &Bytes) -> Result<(), ApiError> {
        sqlx::query("INSERT INTO media_chunks (file_id, idx, data) VALUES (?, ?, ?)")
            .bind(file_id)
            .bind(idx)
            .bind(&data[..])
            .execute(&*self.db)
            .await?;
        Ok(())
    }

    /// Best-effort removal of the chunks of a failed upload. The metadata
    /// row was never written, so the object was never visible.
    async fn discard_chunks(&self, file_id: Uuid) {
        if let Err(err) = sqlx::query("DELETE FROM media_chunks WHERE file_id = ?")
            .bind(file_id)
            .execute(&*self.db)
            .await
        {
            debug!(%file_id, error = %err, "failed to discard chunks of aborted upload");
        }
    }

    /// Fetch only the metadata record. NotFound when no such object exists.
    pub async fn metadata(&self, id: Uuid) -> Result<MediaFile, ApiError> {
        sqlx::query_as::<_, MediaFile>(
            "SELECT id, bucket, filename, content_type, length, chunk_size, md5, upload_date
             FROM media_files WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => ApiError::NotFound,
            other => ApiError::Database(other),
        })
    }

    /// Open a blob for reading.
    ///
    /// Returns the metadata and a lazy single-pass byte stream over the
    /// chunks in ascending order. Visibility is gated on the metadata row:
    /// a zero-length object yields an empty stream, a missing object yields
    /// NotFound. The stream owns its own pool handle, so dropping it early
    /// aborts the iteration without touching stored data.
    pub async fn open(
        &self,
        id: Uuid,
    ) -> Result<(MediaFile, BoxStream<'static, sqlx::Result<Bytes>>), ApiError> {
        let file = self.metadata(id).await?;
        let stream = futures::stream::try_unfold(
            (self.db.clone(), id, 0i64),
            |(db, id, idx)| async move {
                let row: Option<(Vec<u8>,)> =
                    sqlx::query_as("SELECT data FROM media_chunks WHERE file_id = ? AND idx = ?")
                        .bind(id)
                        .bind(idx)
                        .fetch_optional(&*db)
                        .await?;
                Ok(row.map(|(data,)| (Bytes::from(data), (db, id, idx + 1))))
            },
        );
        Ok((file, stream.boxed()))
    }

    /// Delete a blob: metadata row and all chunks as a unit. Readers that
    /// pass the metadata gate before the transaction commits still hold a
    /// consistent view; afterwards the id resolves to NotFound.
    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let mut tx = self.db.begin().await?;
        let result = sqlx::query("DELETE FROM media_files WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound);
        }
        sqlx::query("DELETE FROM media_chunks WHERE file_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        debug!(%id, "deleted media object");
        Ok(())
    }

    /// List metadata for one bucket. Order is not guaranteed.
    pub async fn list(&self, bucket: MediaBucket) -> Result<Vec<MediaFile>, ApiError> {
        Ok(sqlx::query_as::<_, MediaFile>(
            "SELECT id, bucket, filename, content_type, length, chunk_size, md5, upload_date
             FROM media_files WHERE bucket = ?",
        )
        .bind(bucket.as_str())
        .fetch_all(&*self.db)
        .await?)
    }
}

/// Derive a file-extension token from the MIME subtype; anything without a
/// non-empty subtype falls back to `jpeg`. Used only for URL synthesis,
/// never for bucket routing.
pub fn resolve_extension(content_type: &str) -> &str {
    match content_type.split_once('/') {
        Some((_, subtype)) if !subtype.is_empty() => subtype,
        _ => "jpeg",
    }
}
