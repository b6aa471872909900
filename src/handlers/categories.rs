use actix_web::{web, HttpResponse};

use crate::db::models::{NewCategory, UpdateCategory};
use crate::db::repository;
use crate::error::AppError;
use crate::handlers::{ensure_user, not_found};
use crate::models::{slugify, validate_name, CreateCategoryRequest};
use crate::{AppState, CurrentUser};

pub async fn list_categories(data: web::Data<AppState>, user: CurrentUser) -> Result<HttpResponse, AppError> {
    let conn = &mut data.conn()?;
    let categories = repository::list_categories(conn, user.user_id)?;
    Ok(HttpResponse::Ok().json(categories))
}

pub async fn get_category(
    data: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let conn = &mut data.conn()?;
    let category = repository::get_category(conn, user.user_id, id.into_inner()).map_err(not_found("category"))?;
    Ok(HttpResponse::Ok().json(category))
}

pub async fn create_category(
    data: web::Data<AppState>,
    user: CurrentUser,
    body: web::Json<CreateCategoryRequest>,
) -> Result<HttpResponse, AppError> {
    validate_name(&body.name).map_err(AppError::Validation)?;
    let body = body.into_inner();
    let conn = &mut data.conn()?;
    ensure_user(conn, &user)?;

    let name = body.name.trim().to_string();
    let mut slug = slugify(&name);
    if slug.is_empty() {
        slug = "category".to_string();
    }

    let category = repository::create_category(
        conn,
        NewCategory {
            user_id: user.user_id,
            name,
            description: body.description.filter(|d| !d.trim().is_empty()),
            slug,
            active: body.active.unwrap_or(true),
        },
    )?;
    log::info!("User {} created category {} ({})", user.user_id, category.id, category.slug);
    Ok(HttpResponse::Created().json(category))
}

/// Name, description and active flag change; the slug stays as first assigned.
pub async fn update_category(
    data: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i32>,
    body: web::Json<CreateCategoryRequest>,
) -> Result<HttpResponse, AppError> {
    validate_name(&body.name).map_err(AppError::Validation)?;
    let body = body.into_inner();
    let conn = &mut data.conn()?;

    let category = repository::update_category(
        conn,
        user.user_id,
        id.into_inner(),
        UpdateCategory {
            name: body.name.trim().to_string(),
            description: body.description.filter(|d| !d.trim().is_empty()),
            active: body.active.unwrap_or(true),
        },
    )
    .map_err(not_found("category"))?;
    Ok(HttpResponse::Ok().json(category))
}

/// Refused with 409 while products still reference the category.
pub async fn delete_category(
    data: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let conn = &mut data.conn()?;
    let category = repository::get_category(conn, user.user_id, id.into_inner()).map_err(not_found("category"))?;

    let in_use = repository::count_products_in_category(conn, category.id)?;
    if in_use > 0 {
        return Err(AppError::Conflict(format!(
            "category {} still has {} product(s)",
            category.name, in_use
        )));
    }

    repository::delete_category(conn, user.user_id, category.id)?;
    Ok(HttpResponse::NoContent().finish())
}
