use bigdecimal::BigDecimal;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::models::{Category, PriceHistory, Product, ProductImage};
use crate::images::ImageOutcome;

pub const MAX_SKU_LEN: usize = 64;
pub const MAX_NAME_LEN: usize = 200;
const SKU_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: BigDecimal,
    /// Generated as `PRD-XXXXXX` when blank.
    pub sku: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub price: Option<BigDecimal>,
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<i32>>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CameraCaptureRequest {
    /// `data:image/...;base64,...`
    pub image: String,
}

#[derive(Debug, Serialize)]
pub struct ImageView {
    pub id: i32,
    pub filename: String,
    pub thumbnail: String,
    pub position: i32,
    pub url: String,
    pub thumbnail_url: String,
}

impl From<&ProductImage> for ImageView {
    fn from(img: &ProductImage) -> Self {
        ImageView {
            id: img.id,
            filename: img.filename.clone(),
            thumbnail: img.thumbnail_filename(),
            position: img.position,
            url: img.url(),
            thumbnail_url: img.thumbnail_url(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub price_formatted: String,
    pub category: Option<Category>,
    pub images: Vec<ImageView>,
    pub public_url: String,
}

#[derive(Debug, Serialize)]
pub struct SkuLookupResponse {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
}

#[derive(Debug, Serialize)]
pub struct PriceHistoryResponse {
    pub product_id: i32,
    pub entries: Vec<PriceHistory>,
}

/// Result of a multipart upload: stored rows plus per-file outcomes.
#[derive(Debug, Serialize)]
pub struct UploadReport {
    pub saved: Vec<ImageView>,
    pub failed: Vec<ImageOutcome>,
}

// Validation function for product data
pub fn validate_product(product: &CreateProductRequest) -> Result<(), String> {
    validate_name(&product.name)?;
    validate_price(&product.price)?;
    if let Some(sku) = product.sku.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        validate_sku(sku)?;
    }
    if let Some(category_id) = product.category_id {
        if category_id <= 0 {
            return Err("Invalid category ID".to_string());
        }
    }
    Ok(())
}

pub fn validate_product_update(update: &UpdateProductRequest) -> Result<(), String> {
    if let Some(name) = &update.name {
        validate_name(name)?;
    }
    if let Some(price) = &update.price {
        validate_price(price)?;
    }
    if let Some(sku) = &update.sku {
        validate_sku(sku.trim())?;
    }
    if let Some(Some(category_id)) = update.category_id {
        if category_id <= 0 {
            return Err("Invalid category ID".to_string());
        }
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Name cannot be empty".to_string());
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!("Name cannot exceed {} characters", MAX_NAME_LEN));
    }
    Ok(())
}

/// Prices are `NUMERIC(10,2)`: non-negative with at most eight integer digits.
pub fn validate_price(price: &BigDecimal) -> Result<(), String> {
    if *price < BigDecimal::from(0) {
        return Err("Product price cannot be negative".to_string());
    }
    // compare the rounded value, which is what gets stored
    if normalize_price(price) >= BigDecimal::from(100_000_000) {
        return Err("Product price is too large".to_string());
    }
    Ok(())
}

pub fn normalize_price(price: &BigDecimal) -> BigDecimal {
    price.round(2).with_scale(2)
}

pub fn is_valid_sku(sku: &str) -> bool {
    !sku.is_empty()
        && sku.len() <= MAX_SKU_LEN
        && sku
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

pub fn validate_sku(sku: &str) -> Result<(), String> {
    if !is_valid_sku(sku) {
        return Err(format!(
            "SKU must be 1-{} characters of letters, digits, '-', '_' or '.'",
            MAX_SKU_LEN
        ));
    }
    Ok(())
}

/// Drops every character a SKU cannot contain.
pub fn sanitize_sku(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect()
}

/// `PRD-7G2QX9`
pub fn generate_sku(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| SKU_ALPHABET[rng.gen_range(0..SKU_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", prefix, suffix)
}

/// Lowercase words joined by single dashes; punctuation is dropped.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.to_lowercase().chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }
    slug
}
