use actix_web::{web, HttpRequest, HttpResponse};

use crate::db::repository;
use crate::error::AppError;
use crate::handlers::not_found;
use crate::views::public_product_page;
use crate::{public_product_url, AppState};

/// Landing page behind every printed QR code. Inactive products are hidden.
pub async fn product_page(
    req: HttpRequest,
    data: web::Data<AppState>,
    sku: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let sku = sku.into_inner();
    let conn = &mut data.conn()?;
    let product = repository::get_active_product_by_sku(conn, &sku).map_err(not_found("product"))?;
    let images = repository::list_images(conn, &product)?;
    let store = repository::get_or_create_store(conn, product.created_by)?;

    let share_url = public_product_url(&req, &data.settings, &product.sku);
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(public_product_page(&product, &images, &store, &share_url)))
}
