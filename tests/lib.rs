use actix_web::body::to_bytes;
use actix_web::http::StatusCode;
use actix_web::{test, web, App, FromRequest, ResponseError};
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use serde_json::{json, Value};

use tag2qr::error::AppError;
use tag2qr::settings::Settings;
use tag2qr::{configure, json_config, public_product_url, AppState, CurrentUser};

// Nothing in these tests reaches the database; the pool never connects.
fn test_state(settings: Settings) -> web::Data<AppState> {
    let manager = ConnectionManager::<PgConnection>::new("postgres://127.0.0.1:1/unused");
    let pool = Pool::builder().min_idle(Some(0)).build_unchecked(manager);
    web::Data::new(AppState::new(pool, settings))
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .app_data(json_config(&$state.settings))
                .configure(configure),
        )
        .await
    };
}

fn label_template_body() -> Value {
    json!({
        "label_template": "rectangular",
        "label_width": 80,
        "label_height": 50,
        "label_padding": 5,
        "label_qr_size": 30,
        "label_border": true,
        "label_border_width": 1,
        "label_border_color": "#000000",
        "label_background_color": "#FFFFFF",
        "label_text_color": "#000000",
        "label_show_store_name": true,
        "label_show_product_name": true,
        "label_show_logo": true,
        "label_show_price": true,
        "label_show_sku": true,
        "label_show_description": false,
        "label_font_size": 14
    })
}

#[actix_web::test]
async fn test_bearer_header_identifies_user() {
    let req = test::TestRequest::default()
        .insert_header(("Authorization", "Bearer 42"))
        .to_http_request();
    let user = CurrentUser::extract(&req).await.unwrap();
    assert_eq!(user.user_id, 42);
}

#[actix_web::test]
async fn test_invalid_bearer_headers_are_rejected() {
    for header in ["Bearer abc", "Basic 42", "Bearer ", "Bearer -3", "Bearer 0"] {
        let req = test::TestRequest::default()
            .insert_header(("Authorization", header))
            .to_http_request();
        assert!(CurrentUser::extract(&req).await.is_err(), "accepted {:?}", header);
    }

    let req = test::TestRequest::default().to_http_request();
    assert!(CurrentUser::extract(&req).await.is_err());
}

#[actix_web::test]
async fn test_missing_auth_returns_401() {
    let state = test_state(Settings::default());
    let app = init_app!(state);

    for uri in ["/api/products", "/api/categories", "/api/store", "/api/products/1/qr.png"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "unauthorized");
    }
}

#[actix_web::test]
async fn test_create_product_validation() {
    let state = test_state(Settings::default());
    let app = init_app!(state);

    let cases = [
        json!({"name": "", "price": "9.99"}),
        json!({"name": "Mug", "price": "-1"}),
        json!({"name": "Mug", "price": "99999999.999"}),
        json!({"name": "Mug", "price": "9.99", "sku": "has spaces"}),
        json!({"name": "Mug", "price": "9.99", "category_id": 0}),
    ];
    for body in cases {
        let req = test::TestRequest::post()
            .uri("/api/products")
            .insert_header(("Authorization", "Bearer 1"))
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", body);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "validation_error");
    }
}

#[actix_web::test]
async fn test_malformed_json_is_bad_request() {
    let state = test_state(Settings::default());
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/products")
        .insert_header(("Authorization", "Bearer 1"))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"name\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "bad_request");
}

#[actix_web::test]
async fn test_oversized_json_is_413() {
    let mut settings = Settings::default();
    settings.uploads.max_content_length = 64;
    let state = test_state(settings);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/products/1/camera-capture")
        .insert_header(("Authorization", "Bearer 1"))
        .set_json(json!({ "image": format!("data:image/png;base64,{}", "A".repeat(200)) }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[actix_web::test]
async fn test_label_template_out_of_range_is_rejected() {
    let state = test_state(Settings::default());
    let app = init_app!(state);

    let overrides = [
        ("label_qr_size", json!(81)),
        ("label_qr_size", json!(19)),
        ("label_width", json!(201)),
        ("label_height", json!(10)),
        ("label_padding", json!(21)),
        ("label_border_width", json!(0)),
        ("label_font_size", json!(30)),
        ("label_text_color", json!("black")),
        ("label_template", json!("hexagon")),
    ];
    for (field, value) in overrides {
        let mut body = label_template_body();
        body[field] = value;
        let req = test::TestRequest::put()
            .uri("/api/store/label-template")
            .insert_header(("Authorization", "Bearer 1"))
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{} accepted", field);
    }
}

#[actix_web::test]
async fn test_store_font_size_is_checked() {
    let state = test_state(Settings::default());
    let app = init_app!(state);

    let req = test::TestRequest::put()
        .uri("/api/store")
        .insert_header(("Authorization", "Bearer 1"))
        .set_json(json!({
            "name": "Corner Shop",
            "phone": null,
            "email": null,
            "address": null,
            "website": null,
            "label_show_logo": true,
            "label_show_price": true,
            "label_show_sku": true,
            "label_show_description": false,
            "label_font_size": 7
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_error_bodies() {
    let resp = AppError::NotFound("product".to_string()).error_response();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(&to_bytes(resp.into_body()).await.unwrap()).unwrap();
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["message"], "product not found");

    let resp = AppError::Conflict("category in use".to_string()).error_response();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = AppError::Internal("/var/secret".to_string()).error_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&to_bytes(resp.into_body()).await.unwrap()).unwrap();
    assert_eq!(body["message"], "internal server error");
}

#[actix_web::test]
async fn test_public_url_uses_configured_base() {
    let mut settings = Settings::default();
    settings.public_base_url = Some("https://shop.example.com/".to_string());
    let req = test::TestRequest::default().to_http_request();
    assert_eq!(
        public_product_url(&req, &settings, "PRD-ABC123"),
        "https://shop.example.com/p/PRD-ABC123"
    );
}

#[actix_web::test]
async fn test_public_url_falls_back_to_request_host() {
    let settings = Settings::default();
    let req = test::TestRequest::default()
        .insert_header(("Host", "labels.local:8080"))
        .to_http_request();
    assert_eq!(
        public_product_url(&req, &settings, "SKU-1"),
        "http://labels.local:8080/p/SKU-1"
    );
}
