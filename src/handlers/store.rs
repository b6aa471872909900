use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use std::io;
use uuid::Uuid;

use crate::db::models::{LabelTemplateUpdate, StoreProfileUpdate};
use crate::db::repository;
use crate::error::AppError;
use crate::handlers::{client_image_error, collect_files, ensure_user};
use crate::images::{self, file_extension};
use crate::label::{check_range, LabelConfig, FONT_SIZE_RANGE_PT};
use crate::models::validate_name;
use crate::{AppState, CurrentUser};

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn check_len(field: &str, value: Option<&str>, max: usize) -> Result<(), AppError> {
    match value {
        Some(v) if v.chars().count() > max => Err(AppError::Validation(format!(
            "{} cannot exceed {} characters",
            field, max
        ))),
        _ => Ok(()),
    }
}

pub async fn get_store(data: web::Data<AppState>, user: CurrentUser) -> Result<HttpResponse, AppError> {
    let conn = &mut data.conn()?;
    ensure_user(conn, &user)?;
    let store = repository::get_or_create_store(conn, user.user_id)?;
    Ok(HttpResponse::Ok().json(store))
}

pub async fn update_store(
    data: web::Data<AppState>,
    user: CurrentUser,
    body: web::Json<StoreProfileUpdate>,
) -> Result<HttpResponse, AppError> {
    validate_name(&body.name).map_err(AppError::Validation)?;
    check_range("label_font_size", body.label_font_size, FONT_SIZE_RANGE_PT)?;

    let mut profile = body.into_inner();
    profile.name = profile.name.trim().to_string();
    profile.phone = blank_to_none(profile.phone);
    profile.email = blank_to_none(profile.email);
    profile.address = blank_to_none(profile.address);
    profile.website = blank_to_none(profile.website);
    check_len("phone", profile.phone.as_deref(), 50)?;
    check_len("email", profile.email.as_deref(), 120)?;
    check_len("website", profile.website.as_deref(), 200)?;

    let conn = &mut data.conn()?;
    ensure_user(conn, &user)?;
    let store = repository::update_store_profile(conn, user.user_id, &profile)?;
    Ok(HttpResponse::Ok().json(store))
}

pub async fn update_label_template(
    data: web::Data<AppState>,
    user: CurrentUser,
    body: web::Json<LabelTemplateUpdate>,
) -> Result<HttpResponse, AppError> {
    LabelConfig::from_update(&body)?.validate()?;

    let conn = &mut data.conn()?;
    ensure_user(conn, &user)?;
    let store = repository::update_label_template(conn, user.user_id, &body)?;
    log::info!("User {} changed label template to {}", user.user_id, store.label_template);
    Ok(HttpResponse::Ok().json(store))
}

/// Replaces the store logo; the previous file is removed once the new one is recorded.
pub async fn upload_logo(
    data: web::Data<AppState>,
    user: CurrentUser,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let uploads = &data.settings.uploads;
    let file = collect_files(payload, uploads.max_content_length)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::BadRequest("no logo file in upload".to_string()))?;

    match file_extension(&file.filename) {
        Some(ext) if uploads.is_allowed_extension(&ext) => {}
        _ => {
            return Err(AppError::Validation(format!(
                "unsupported file type: {}",
                file.filename
            )))
        }
    }

    let previous = {
        let conn = &mut data.conn()?;
        ensure_user(conn, &user)?;
        repository::get_or_create_store(conn, user.user_id)?.logo_filename
    };

    let store_dir = data.settings.store_folder();
    let filename = format!("logo_{}_{}.jpg", user.user_id, Uuid::new_v4().simple());
    let dest = store_dir.join(&filename);
    let max_width = uploads.logo_max_width;
    {
        let dest = dest.clone();
        web::block(move || images::process_logo(&file.bytes, &dest, max_width))
            .await?
            .map_err(client_image_error)?;
    }

    let conn = &mut data.conn()?;
    let store = match repository::set_store_logo(conn, user.user_id, &filename) {
        Ok(store) => store,
        Err(e) => {
            let _ = std::fs::remove_file(&dest);
            return Err(e.into());
        }
    };

    if let Some(old) = previous.filter(|old| *old != filename) {
        match std::fs::remove_file(store_dir.join(&old)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not remove old logo {}: {}", old, e),
        }
    }

    Ok(HttpResponse::Ok().json(store))
}
