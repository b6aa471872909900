use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::Utc;

use crate::db::repository;
use crate::error::AppError;
use crate::handlers::{client_image_error, collect_files, not_found};
use crate::images::{self, ImageOutcome};
use crate::models::{CameraCaptureRequest, ImageView, UploadReport};
use crate::{AppState, CurrentUser};

/// Stores each uploaded file independently; failures are reported, not fatal.
pub async fn upload_images(
    data: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i32>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let product = {
        let conn = &mut data.conn()?;
        repository::get_product(conn, user.user_id, id.into_inner()).map_err(not_found("product"))?
    };

    let files = collect_files(payload, data.settings.uploads.max_content_length).await?;
    if files.is_empty() {
        return Err(AppError::BadRequest("no files in upload".to_string()));
    }

    let dir = data.settings.product_folder(product.id);
    let uploads = data.settings.uploads.clone();
    let outcomes = {
        let dir = dir.clone();
        web::block(move || images::save_product_images(&dir, &files, &uploads)).await?
    };

    let saved: Vec<String> = outcomes
        .iter()
        .filter_map(|outcome| outcome.saved_filename().map(str::to_string))
        .collect();

    let conn = &mut data.conn()?;
    let rows = match repository::insert_images(conn, product.id, &saved) {
        Ok(rows) => rows,
        Err(e) => {
            for filename in &saved {
                let _ = images::remove_image_files(&dir, filename);
            }
            return Err(e.into());
        }
    };

    let failed: Vec<ImageOutcome> = outcomes
        .into_iter()
        .filter(|outcome| matches!(outcome, ImageOutcome::Failed { .. }))
        .collect();
    log::info!(
        "Product {}: stored {} image(s), {} failed",
        product.id,
        rows.len(),
        failed.len()
    );

    Ok(HttpResponse::Ok().json(UploadReport {
        saved: rows.iter().map(ImageView::from).collect(),
        failed,
    }))
}

/// Accepts a `data:image/...;base64,` snapshot from the browser camera.
pub async fn camera_capture(
    data: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i32>,
    body: web::Json<CameraCaptureRequest>,
) -> Result<HttpResponse, AppError> {
    let product = {
        let conn = &mut data.conn()?;
        repository::get_product(conn, user.user_id, id.into_inner()).map_err(not_found("product"))?
    };

    let bytes = images::decode_data_url(&body.image).map_err(client_image_error)?;
    let limit = data.settings.uploads.max_content_length;
    if bytes.len() > limit {
        return Err(AppError::PayloadTooLarge(limit));
    }

    let dir = data.settings.product_folder(product.id);
    let uploads = data.settings.uploads.clone();
    let taken_at = Utc::now().naive_utc();
    let filename = {
        let dir = dir.clone();
        web::block(move || images::save_camera_capture(&dir, &bytes, taken_at, &uploads))
            .await?
            .map_err(client_image_error)?
    };

    let conn = &mut data.conn()?;
    let rows = match repository::insert_images(conn, product.id, std::slice::from_ref(&filename)) {
        Ok(rows) => rows,
        Err(e) => {
            let _ = images::remove_image_files(&dir, &filename);
            return Err(e.into());
        }
    };

    let view = rows
        .first()
        .map(ImageView::from)
        .ok_or_else(|| AppError::Internal("image row was not returned".to_string()))?;
    Ok(HttpResponse::Created().json(view))
}

pub async fn delete_image(
    data: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let conn = &mut data.conn()?;
    let image = repository::get_image_for_user(conn, user.user_id, id.into_inner()).map_err(not_found("image"))?;
    repository::delete_image(conn, image.id)?;

    let dir = data.settings.product_folder(image.product_id);
    if let Err(e) = images::remove_image_files(&dir, &image.filename) {
        log::warn!("Could not remove files of image {}: {}", image.id, e);
    }
    Ok(HttpResponse::NoContent().finish())
}
