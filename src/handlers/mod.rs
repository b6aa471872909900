use actix_multipart::Multipart;
use futures::StreamExt;
use std::path::Path;

use crate::error::AppError;
use crate::images::{ImageError, UploadedFile};

pub mod categories;
pub mod images;
pub mod labels;
pub mod products;
pub mod public;
pub mod store;

/// Buffers every file part of a multipart body, rejecting bodies over `limit` bytes.
/// Parts without a filename are read and dropped.
pub async fn collect_files(mut payload: Multipart, limit: usize) -> Result<Vec<UploadedFile>, AppError> {
    let mut files = Vec::new();
    let mut total = 0usize;

    while let Some(field) = payload.next().await {
        let mut field = field?;
        let filename = field
            .content_disposition()
            .get_filename()
            .and_then(|name| Path::new(name).file_name())
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            total += chunk.len();
            if total > limit {
                return Err(AppError::PayloadTooLarge(limit));
            }
            if filename.is_some() {
                bytes.extend_from_slice(&chunk);
            }
        }

        if let Some(filename) = filename {
            files.push(UploadedFile { filename, bytes });
        }
    }

    Ok(files)
}

/// Decode and format problems come from the client; only I/O is ours.
pub fn client_image_error(err: ImageError) -> AppError {
    match err {
        ImageError::Io(e) => AppError::Io(e),
        other => AppError::BadRequest(other.to_string()),
    }
}

/// Missing rows become a 404 naming `what`.
pub fn not_found(what: &'static str) -> impl Fn(diesel::result::Error) -> AppError {
    move |err| match err {
        diesel::result::Error::NotFound => AppError::NotFound(what.to_string()),
        other => AppError::from(other),
    }
}

/// Rejects bearer ids that do not name a provisioned user.
pub fn ensure_user(conn: &mut diesel::PgConnection, user: &crate::CurrentUser) -> Result<(), AppError> {
    if !crate::db::repository::user_exists(conn, user.user_id)? {
        return Err(AppError::Unauthorized(format!("unknown user {}", user.user_id)));
    }
    Ok(())
}
