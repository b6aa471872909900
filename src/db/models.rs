use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::schema::{categories, price_history, product_images, products, stores, users};
use crate::images::thumbnail_filename;

#[derive(Queryable, Selectable, Serialize, Debug, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub email: &'a str,
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone)]
#[diesel(table_name = stores)]
pub struct Store {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub logo_filename: Option<String>,
    pub label_show_store_name: bool,
    pub label_show_product_name: bool,
    pub label_show_logo: bool,
    pub label_show_price: bool,
    pub label_show_sku: bool,
    pub label_show_description: bool,
    pub label_font_size: i32,
    pub label_template: String,
    pub label_width: i32,
    pub label_height: i32,
    pub label_padding: i32,
    pub label_qr_size: i32,
    pub label_border: bool,
    pub label_border_width: i32,
    pub label_border_color: String,
    pub label_background_color: String,
    pub label_text_color: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = stores)]
pub struct NewStore<'a> {
    pub user_id: i32,
    pub name: &'a str,
}

/// Profile fields plus the label content toggles shown on the store form.
#[derive(AsChangeset, Deserialize, Debug, Clone)]
#[diesel(table_name = stores, treat_none_as_null = true)]
pub struct StoreProfileUpdate {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub label_show_logo: bool,
    pub label_show_price: bool,
    pub label_show_sku: bool,
    pub label_show_description: bool,
    pub label_font_size: i32,
}

#[derive(AsChangeset, Deserialize, Serialize, Debug, Clone, PartialEq)]
#[diesel(table_name = stores)]
pub struct LabelTemplateUpdate {
    pub label_template: String,
    pub label_width: i32,
    pub label_height: i32,
    pub label_padding: i32,
    pub label_qr_size: i32,
    pub label_border: bool,
    pub label_border_width: i32,
    pub label_border_color: String,
    pub label_background_color: String,
    pub label_text_color: String,
    pub label_show_store_name: bool,
    pub label_show_product_name: bool,
    pub label_show_logo: bool,
    pub label_show_price: bool,
    pub label_show_sku: bool,
    pub label_show_description: bool,
    pub label_font_size: i32,
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = categories)]
pub struct Category {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub slug: String,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = categories)]
pub struct NewCategory {
    pub user_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub slug: String,
    pub active: bool,
}

#[derive(AsChangeset)]
#[diesel(table_name = categories, treat_none_as_null = true)]
pub struct UpdateCategory {
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone)]
#[diesel(table_name = products)]
pub struct Product {
    pub id: i32,
    pub sku: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub active: bool,
    pub created_by: i32,
    pub category_id: Option<i32>,
    pub created_at: NaiveDateTime,
}

impl Product {
    pub fn price_formatted(&self) -> String {
        format!("${}", self.price.with_scale(2))
    }
}

#[derive(Insertable)]
#[diesel(table_name = products)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub active: bool,
    pub created_by: i32,
    pub category_id: Option<i32>,
}

/// `None` leaves a column untouched; `Some(None)` clears a nullable one.
#[derive(AsChangeset, Default)]
#[diesel(table_name = products)]
pub struct UpdateProduct {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<BigDecimal>,
    pub active: Option<bool>,
    pub category_id: Option<Option<i32>>,
}

impl UpdateProduct {
    pub fn is_empty(&self) -> bool {
        self.sku.is_none()
            && self.name.is_none()
            && self.slug.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.active.is_none()
            && self.category_id.is_none()
    }
}

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone)]
#[diesel(belongs_to(Product))]
#[diesel(table_name = product_images)]
pub struct ProductImage {
    pub id: i32,
    pub product_id: i32,
    pub filename: String,
    pub position: i32,
    pub created_at: NaiveDateTime,
}

impl ProductImage {
    pub fn thumbnail_filename(&self) -> String {
        thumbnail_filename(&self.filename)
    }

    pub fn url(&self) -> String {
        format!("/uploads/products/{}/{}", self.product_id, self.filename)
    }

    pub fn thumbnail_url(&self) -> String {
        format!("/uploads/products/{}/{}", self.product_id, self.thumbnail_filename())
    }
}

#[derive(Insertable)]
#[diesel(table_name = product_images)]
pub struct NewProductImage {
    pub product_id: i32,
    pub filename: String,
    pub position: i32,
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone)]
#[diesel(table_name = price_history)]
pub struct PriceHistory {
    pub id: i32,
    pub product_id: i32,
    pub price: BigDecimal,
    pub changed_at: NaiveDateTime,
    pub changed_by: Option<i32>,
}

#[derive(Insertable)]
#[diesel(table_name = price_history)]
pub struct NewPriceHistory {
    pub product_id: i32,
    pub price: BigDecimal,
    pub changed_by: Option<i32>,
}
