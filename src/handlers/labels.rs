use actix_web::{http::header, web, HttpRequest, HttpResponse};
use base64::{engine::general_purpose, Engine as _};

use crate::db::repository;
use crate::error::AppError;
use crate::handlers::not_found;
use crate::label::{render_label_html, visible_fields, LabelConfig, LabelLayout};
use crate::{public_product_url, AppState, CurrentUser};

pub async fn product_qr(
    req: HttpRequest,
    data: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let product = {
        let conn = &mut data.conn()?;
        repository::get_product(conn, user.user_id, id.into_inner()).map_err(not_found("product"))?
    };

    let url = public_product_url(&req, &data.settings, &product.sku);
    let png = data.qr.generate_png(&url)?;
    data.qr.store_cached(&product.sku, product.id, &png);

    Ok(HttpResponse::Ok()
        .content_type("image/png")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"qr_{}.png\"", product.sku),
        ))
        .body(png))
}

/// Print-ready HTML page for one product label.
pub async fn print_label(
    req: HttpRequest,
    data: web::Data<AppState>,
    user: CurrentUser,
    id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let (product, store) = {
        let conn = &mut data.conn()?;
        let product = repository::get_product(conn, user.user_id, id.into_inner()).map_err(not_found("product"))?;
        let store = repository::get_or_create_store(conn, user.user_id)?;
        (product, store)
    };

    let config = LabelConfig::from_store(&store);
    let layout = LabelLayout::compute(&config);

    let url = public_product_url(&req, &data.settings, &product.sku);
    let qr_src = data.qr.generate_data_url(&url)?;

    let logo_src = match store.logo_filename.as_deref() {
        Some(filename) if config.show.logo => {
            let path = data.settings.store_folder().join(filename);
            match tokio::fs::read(&path).await {
                Ok(bytes) => Some(format!(
                    "data:image/jpeg;base64,{}",
                    general_purpose::STANDARD.encode(bytes)
                )),
                Err(e) => {
                    log::warn!("Store logo {} unreadable: {}", path.display(), e);
                    None
                }
            }
        }
        _ => None,
    };

    let fields = visible_fields(&config, &store.name, logo_src.as_deref(), &product);
    let html = render_label_html(&config, &layout, &fields, &qr_src, &format!("Label {}", product.sku));

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html))
}
