use actix_web::{web, HttpRequest, HttpResponse};
use diesel::PgConnection;

use crate::db::models::{NewProduct, Product, UpdateProduct};
use crate::db::repository;
use crate::error::AppError;
use crate::handlers::{ensure_user, not_found};
use crate::images::remove_product_dir;
use crate::models::{
    generate_sku, normalize_price, sanitize_sku, slugify, validate_product, validate_product_update,
    CreateProductRequest, ImageView, PriceHistoryResponse, ProductDetail, ProductQuery,
    SkuLookupResponse, UpdateProductRequest,
};
use crate::{public_product_url, AppState, CurrentUser};

const SKU_PREFIX: &str = "PRD";
const SKU_ATTEMPTS: usize = 5;

pub(crate) fn product_detail(
    conn: &mut PgConnection,
    req: &HttpRequest,
    data: &AppState,
    product: Product,
) -> Result<ProductDetail, AppError> {
    let images = repository::list_images(conn, &product)?;
    let category = match product.category_id {
        Some(category_id) => repository::get_category(conn, product.created_by, category_id).ok(),
        None => None,
    };

    Ok(ProductDetail {
        price_formatted: product.price_formatted(),
        public_url: public_product_url(req, &data.settings, &product.sku),
        images: images.iter().map(ImageView::from).collect(),
        category,
        product,
    })
}

fn check_category(conn: &mut PgConnection, user_id: i32, category_id: Option<i32>) -> Result<(), AppError> {
    if let Some(category_id) = category_id {
        repository::get_category(conn, user_id, category_id).map_err(|err| match err {
            diesel::result::Error::NotFound => {
                AppError::Validation(format!("category {} does not exist", category_id))
            }
            other => AppError::from(other),
        })?;
    }
    Ok(())
}

fn unique_generated_sku(conn: &mut PgConnection) -> Result<String, AppError> {
    for _ in 0..SKU_ATTEMPTS {
        let sku = generate_sku(SKU_PREFIX);
        if !repository::sku_exists(conn, &sku)? {
            return Ok(sku);
        }
    }
    Err(AppError::Internal("could not generate a free SKU".to_string()))
}

pub async fn list_products(
    data: web::Data<AppState>,
    user: CurrentUser,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse, AppError> {
    let conn = &mut data.conn()?;
    let products = repository::list_products(conn, user.user_id, query.search.as_deref(), query.category_id)?;
    Ok(HttpResponse::Ok().json(products))
}

pub async fn get_product(
    req: HttpRequest,
    data: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let conn = &mut data.conn()?;
    let product = repository::get_product(conn, user.user_id, id.into_inner()).map_err(not_found("product"))?;
    Ok(HttpResponse::Ok().json(product_detail(conn, &req, &data, product)?))
}

pub async fn create_product(
    req: HttpRequest,
    data: web::Data<AppState>,
    user: CurrentUser,
    body: web::Json<CreateProductRequest>,
) -> Result<HttpResponse, AppError> {
    validate_product(&body).map_err(AppError::Validation)?;
    let body = body.into_inner();
    let conn = &mut data.conn()?;
    ensure_user(conn, &user)?;
    check_category(conn, user.user_id, body.category_id)?;

    let sku = match body.sku.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(sku) => {
            if repository::sku_exists(conn, sku)? {
                return Err(AppError::Conflict(format!("SKU {} already exists", sku)));
            }
            sku.to_string()
        }
        None => unique_generated_sku(conn)?,
    };

    let name = body.name.trim().to_string();
    let product = repository::create_product(
        conn,
        NewProduct {
            sku,
            slug: slugify(&name),
            name,
            description: body.description.filter(|d| !d.trim().is_empty()),
            price: normalize_price(&body.price),
            active: body.active.unwrap_or(true),
            created_by: user.user_id,
            category_id: body.category_id,
        },
    )?;
    log::info!("User {} created product {} ({})", user.user_id, product.id, product.sku);

    Ok(HttpResponse::Created().json(product_detail(conn, &req, &data, product)?))
}

pub async fn update_product(
    req: HttpRequest,
    data: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i32>,
    body: web::Json<UpdateProductRequest>,
) -> Result<HttpResponse, AppError> {
    validate_product_update(&body).map_err(AppError::Validation)?;
    let body = body.into_inner();
    let id = id.into_inner();
    let conn = &mut data.conn()?;
    let current = repository::get_product(conn, user.user_id, id).map_err(not_found("product"))?;

    if let Some(Some(category_id)) = body.category_id {
        check_category(conn, user.user_id, Some(category_id))?;
    }

    let new_sku = body.sku.map(|s| s.trim().to_string()).filter(|s| *s != current.sku);
    if let Some(sku) = &new_sku {
        if repository::sku_exists(conn, sku)? {
            return Err(AppError::Conflict(format!("SKU {} already exists", sku)));
        }
    }

    let name = body.name.map(|n| n.trim().to_string());
    let changes = UpdateProduct {
        slug: name.as_deref().map(slugify),
        name,
        sku: new_sku.clone(),
        description: body.description.map(|d| d.filter(|d| !d.trim().is_empty())),
        price: body.price.as_ref().map(normalize_price),
        active: body.active,
        category_id: body.category_id,
    };

    let product = repository::update_product(conn, user.user_id, id, changes)?;
    if new_sku.is_some() {
        data.qr.remove_cached(&current.sku, current.id);
    }

    Ok(HttpResponse::Ok().json(product_detail(conn, &req, &data, product)?))
}

/// Drops the row, then the image directory and cached QR code.
pub async fn delete_product(
    data: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let conn = &mut data.conn()?;
    let product = repository::get_product(conn, user.user_id, id.into_inner()).map_err(not_found("product"))?;
    repository::delete_product(conn, user.user_id, product.id)?;

    let dir = data.settings.product_folder(product.id);
    let removal = web::block(move || remove_product_dir(&dir)).await?;
    if let Err(e) = removal {
        log::warn!("Could not remove images of product {}: {}", product.id, e);
    }
    data.qr.remove_cached(&product.sku, product.id);

    log::info!("User {} deleted product {} ({})", user.user_id, product.id, product.sku);
    Ok(HttpResponse::NoContent().finish())
}

pub async fn toggle_active(
    data: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let conn = &mut data.conn()?;
    let product = repository::toggle_product_active(conn, user.user_id, id.into_inner())
        .map_err(not_found("product"))?;
    Ok(HttpResponse::Ok().json(product))
}

pub async fn price_history(
    data: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let conn = &mut data.conn()?;
    let product = repository::get_product(conn, user.user_id, id.into_inner()).map_err(not_found("product"))?;
    let entries = repository::list_price_history(conn, product.id)?;
    Ok(HttpResponse::Ok().json(PriceHistoryResponse {
        product_id: product.id,
        entries,
    }))
}

/// Case-insensitive lookup within the caller's products. Scanner input often
/// carries stray characters, so a sanitized form is tried second.
pub async fn lookup_sku(
    data: web::Data<AppState>,
    user: CurrentUser,
    sku: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let raw = sku.into_inner();
    let cleaned = raw.trim();
    let conn = &mut data.conn()?;

    let mut product = if cleaned.is_empty() {
        None
    } else {
        repository::find_product_by_sku(conn, user.user_id, cleaned)?
    };

    if product.is_none() {
        let alt = sanitize_sku(cleaned);
        if !alt.is_empty() && !alt.eq_ignore_ascii_case(cleaned) {
            log::debug!("SKU {:?} not found, retrying as {:?}", cleaned, alt);
            product = repository::find_product_by_sku(conn, user.user_id, &alt)?;
        }
    }

    Ok(HttpResponse::Ok().json(SkuLookupResponse {
        exists: product.is_some(),
        product,
    }))
}
