use actix_web::error::JsonPayloadError;
use actix_web::{dev::Payload, web, Error as ActixError, FromRequest, HttpRequest};
use futures::future::{ready, Ready};

pub mod db;
pub mod error;
pub mod handlers;
pub mod images;
pub mod label;
pub mod models;
pub mod qr;
pub mod settings;
pub mod views;

use crate::db::{PgPool, PgPooledConnection};
use crate::error::AppError;
use crate::qr::QrService;
use crate::settings::Settings;

pub struct AppState {
    pub pool: PgPool,
    pub settings: Settings,
    pub qr: QrService,
}

impl AppState {
    pub fn new(pool: PgPool, settings: Settings) -> Self {
        let qr = QrService::with_cache_dir(settings.uploads.qr_folder.clone());
        AppState { pool, settings, qr }
    }

    pub fn conn(&self) -> Result<PgPooledConnection, AppError> {
        Ok(self.pool.get()?)
    }
}

/// Tenant taken from `Authorization: Bearer <user_id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: i32,
}

impl FromRequest for CurrentUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user_id = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .and_then(|token| token.trim().parse::<i32>().ok())
            .filter(|id| *id > 0);

        match user_id {
            Some(user_id) => ready(Ok(CurrentUser { user_id })),
            None => ready(Err(AppError::Unauthorized(
                "missing or invalid Authorization header".to_string(),
            )
            .into())),
        }
    }
}

/// Absolute link to the public page of `sku`.
pub fn public_product_url(req: &HttpRequest, settings: &Settings, sku: &str) -> String {
    let base = match settings.public_base_url.as_deref() {
        Some(base) if !base.trim().is_empty() => base.trim_end_matches('/').to_string(),
        _ => {
            let info = req.connection_info();
            format!("{}://{}", info.scheme(), info.host())
        }
    };
    format!("{}/p/{}", base, sku)
}

/// JSON bodies up to the upload limit, with errors in the `AppError` shape.
pub fn json_config(settings: &Settings) -> web::JsonConfig {
    let limit = settings.uploads.max_content_length;
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(move |err, _req| match err {
            JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
                AppError::PayloadTooLarge(limit).into()
            }
            other => AppError::BadRequest(other.to_string()).into(),
        })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    use crate::handlers::{categories, images, labels, products, public, store};

    cfg.service(
        web::scope("/api")
            .route("/products", web::get().to(products::list_products))
            .route("/products", web::post().to(products::create_product))
            .route("/products/sku/{sku}", web::get().to(products::lookup_sku))
            .route("/products/{id}", web::get().to(products::get_product))
            .route("/products/{id}", web::patch().to(products::update_product))
            .route("/products/{id}", web::delete().to(products::delete_product))
            .route("/products/{id}/toggle-active", web::post().to(products::toggle_active))
            .route("/products/{id}/price-history", web::get().to(products::price_history))
            .route("/products/{id}/images", web::post().to(images::upload_images))
            .route("/products/{id}/camera-capture", web::post().to(images::camera_capture))
            .route("/products/{id}/qr.png", web::get().to(labels::product_qr))
            .route("/products/{id}/print-label", web::get().to(labels::print_label))
            .route("/product-images/{id}", web::delete().to(images::delete_image))
            .route("/categories", web::get().to(categories::list_categories))
            .route("/categories", web::post().to(categories::create_category))
            .route("/categories/{id}", web::get().to(categories::get_category))
            .route("/categories/{id}", web::put().to(categories::update_category))
            .route("/categories/{id}", web::delete().to(categories::delete_category))
            .route("/store", web::get().to(store::get_store))
            .route("/store", web::put().to(store::update_store))
            .route("/store/label-template", web::put().to(store::update_label_template))
            .route("/store/logo", web::post().to(store::upload_logo)),
    )
    .route("/p/{sku}", web::get().to(public::product_page));
}
