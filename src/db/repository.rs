use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::dsl::{count_star, max};
use diesel::prelude::*;
use diesel::sql_types::Text;

use crate::db::models::*;
use crate::db::schema::*;

diesel::sql_function!(fn lower(x: Text) -> Text);

pub fn create_user(conn: &mut PgConnection, email: &str) -> QueryResult<User> {
    diesel::insert_into(users::table)
        .values(NewUser { email })
        .returning(User::as_returning())
        .get_result(conn)
}

pub fn find_user_by_email(conn: &mut PgConnection, email: &str) -> QueryResult<Option<User>> {
    users::table
        .filter(users::email.eq(email))
        .select(User::as_select())
        .first(conn)
        .optional()
}

pub fn user_exists(conn: &mut PgConnection, user_id: i32) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(users::table.find(user_id))).get_result(conn)
}

/// One store row per user, created with defaults on first access.
pub fn get_or_create_store(conn: &mut PgConnection, user_id_val: i32) -> QueryResult<Store> {
    if let Some(store) = stores::table
        .filter(stores::user_id.eq(user_id_val))
        .select(Store::as_select())
        .first(conn)
        .optional()?
    {
        return Ok(store);
    }

    log::debug!("Creating default store for user {}", user_id_val);
    diesel::insert_into(stores::table)
        .values(NewStore {
            user_id: user_id_val,
            name: "MY STORE",
        })
        .on_conflict(stores::user_id)
        .do_nothing()
        .execute(conn)?;

    stores::table
        .filter(stores::user_id.eq(user_id_val))
        .select(Store::as_select())
        .first(conn)
}

pub fn update_store_profile(
    conn: &mut PgConnection,
    user_id_val: i32,
    profile: &StoreProfileUpdate,
) -> QueryResult<Store> {
    get_or_create_store(conn, user_id_val)?;
    diesel::update(stores::table.filter(stores::user_id.eq(user_id_val)))
        .set((profile, stores::updated_at.eq(Utc::now().naive_utc())))
        .returning(Store::as_returning())
        .get_result(conn)
}

pub fn update_label_template(
    conn: &mut PgConnection,
    user_id_val: i32,
    template: &LabelTemplateUpdate,
) -> QueryResult<Store> {
    get_or_create_store(conn, user_id_val)?;
    diesel::update(stores::table.filter(stores::user_id.eq(user_id_val)))
        .set((template, stores::updated_at.eq(Utc::now().naive_utc())))
        .returning(Store::as_returning())
        .get_result(conn)
}

pub fn rename_store(conn: &mut PgConnection, user_id_val: i32, name: &str) -> QueryResult<Store> {
    diesel::update(stores::table.filter(stores::user_id.eq(user_id_val)))
        .set((stores::name.eq(name), stores::updated_at.eq(Utc::now().naive_utc())))
        .returning(Store::as_returning())
        .get_result(conn)
}

pub fn set_store_logo(conn: &mut PgConnection, user_id_val: i32, filename: &str) -> QueryResult<Store> {
    diesel::update(stores::table.filter(stores::user_id.eq(user_id_val)))
        .set((
            stores::logo_filename.eq(filename),
            stores::updated_at.eq(Utc::now().naive_utc()),
        ))
        .returning(Store::as_returning())
        .get_result(conn)
}

pub fn list_categories(conn: &mut PgConnection, user_id_val: i32) -> QueryResult<Vec<Category>> {
    categories::table
        .filter(categories::user_id.eq(user_id_val))
        .order(categories::name.asc())
        .select(Category::as_select())
        .load(conn)
}

pub fn get_category(conn: &mut PgConnection, user_id_val: i32, id: i32) -> QueryResult<Category> {
    categories::table
        .filter(categories::id.eq(id))
        .filter(categories::user_id.eq(user_id_val))
        .select(Category::as_select())
        .first(conn)
}

/// Slugs are unique per user; a taken slug gets the user's category count as suffix.
pub fn create_category(conn: &mut PgConnection, mut new_category: NewCategory) -> QueryResult<Category> {
    let taken: bool = diesel::select(diesel::dsl::exists(
        categories::table
            .filter(categories::user_id.eq(new_category.user_id))
            .filter(categories::slug.eq(&new_category.slug)),
    ))
    .get_result(conn)?;

    if taken {
        let existing: i64 = categories::table
            .filter(categories::user_id.eq(new_category.user_id))
            .select(count_star())
            .get_result(conn)?;
        new_category.slug = format!("{}-{}", new_category.slug, existing + 1);
    }

    diesel::insert_into(categories::table)
        .values(&new_category)
        .returning(Category::as_returning())
        .get_result(conn)
}

pub fn update_category(
    conn: &mut PgConnection,
    user_id_val: i32,
    id: i32,
    changes: UpdateCategory,
) -> QueryResult<Category> {
    diesel::update(
        categories::table
            .filter(categories::id.eq(id))
            .filter(categories::user_id.eq(user_id_val)),
    )
    .set(changes)
    .returning(Category::as_returning())
    .get_result(conn)
}

pub fn count_products_in_category(conn: &mut PgConnection, category_id_val: i32) -> QueryResult<i64> {
    products::table
        .filter(products::category_id.eq(category_id_val))
        .select(count_star())
        .get_result(conn)
}

pub fn delete_category(conn: &mut PgConnection, user_id_val: i32, id: i32) -> QueryResult<usize> {
    diesel::delete(
        categories::table
            .filter(categories::id.eq(id))
            .filter(categories::user_id.eq(user_id_val)),
    )
    .execute(conn)
}

/// `%term%` for ILIKE with the term's own wildcards and escape character taken literally.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Caller's products, newest first, optionally narrowed by a name/SKU search and category.
pub fn list_products(
    conn: &mut PgConnection,
    user_id_val: i32,
    search: Option<&str>,
    category_id_val: Option<i32>,
) -> QueryResult<Vec<Product>> {
    let mut query = products::table
        .filter(products::created_by.eq(user_id_val))
        .into_boxed();

    if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = like_pattern(term);
        query = query.filter(
            products::name
                .ilike(pattern.clone())
                .or(products::sku.ilike(pattern)),
        );
    }
    if let Some(category_id_val) = category_id_val {
        query = query.filter(products::category_id.eq(category_id_val));
    }

    query
        .order(products::created_at.desc())
        .select(Product::as_select())
        .load(conn)
}

pub fn get_product(conn: &mut PgConnection, user_id_val: i32, id: i32) -> QueryResult<Product> {
    products::table
        .filter(products::id.eq(id))
        .filter(products::created_by.eq(user_id_val))
        .select(Product::as_select())
        .first(conn)
}

pub fn find_product_by_sku(
    conn: &mut PgConnection,
    user_id_val: i32,
    sku: &str,
) -> QueryResult<Option<Product>> {
    products::table
        .filter(lower(products::sku).eq(sku.to_lowercase()))
        .filter(products::created_by.eq(user_id_val))
        .select(Product::as_select())
        .first(conn)
        .optional()
}

/// SKUs are unique across every tenant.
pub fn sku_exists(conn: &mut PgConnection, sku: &str) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(products::table.filter(products::sku.eq(sku)))).get_result(conn)
}

pub fn get_active_product_by_sku(conn: &mut PgConnection, sku: &str) -> QueryResult<Product> {
    products::table
        .filter(products::sku.eq(sku))
        .filter(products::active.eq(true))
        .select(Product::as_select())
        .first(conn)
}

/// Inserts the product and its opening price-history row in one transaction.
pub fn create_product(conn: &mut PgConnection, new_product: NewProduct) -> QueryResult<Product> {
    conn.transaction(|conn| {
        let product = diesel::insert_into(products::table)
            .values(&new_product)
            .returning(Product::as_returning())
            .get_result(conn)?;

        diesel::insert_into(price_history::table)
            .values(NewPriceHistory {
                product_id: product.id,
                price: product.price.clone(),
                changed_by: Some(new_product.created_by),
            })
            .execute(conn)?;

        Ok(product)
    })
}

/// Applies `changes`, recording a price-history row when the price moves.
pub fn update_product(
    conn: &mut PgConnection,
    user_id_val: i32,
    id: i32,
    changes: UpdateProduct,
) -> QueryResult<Product> {
    conn.transaction(|conn| {
        let current = get_product(conn, user_id_val, id)?;
        if changes.is_empty() {
            return Ok(current);
        }

        let price_changed = matches!(&changes.price, Some(price) if *price != current.price);
        let new_price: Option<BigDecimal> = if price_changed { changes.price.clone() } else { None };

        let product = diesel::update(products::table.find(current.id))
            .set(&changes)
            .returning(Product::as_returning())
            .get_result(conn)?;

        if let Some(price) = new_price {
            diesel::insert_into(price_history::table)
                .values(NewPriceHistory {
                    product_id: product.id,
                    price,
                    changed_by: Some(user_id_val),
                })
                .execute(conn)?;
        }

        Ok(product)
    })
}

pub fn toggle_product_active(conn: &mut PgConnection, user_id_val: i32, id: i32) -> QueryResult<Product> {
    let current = get_product(conn, user_id_val, id)?;
    diesel::update(products::table.find(current.id))
        .set(products::active.eq(!current.active))
        .returning(Product::as_returning())
        .get_result(conn)
}

/// Images and price history go with the product through `ON DELETE CASCADE`.
pub fn delete_product(conn: &mut PgConnection, user_id_val: i32, id: i32) -> QueryResult<usize> {
    diesel::delete(
        products::table
            .filter(products::id.eq(id))
            .filter(products::created_by.eq(user_id_val)),
    )
    .execute(conn)
}

pub fn list_price_history(conn: &mut PgConnection, product_id_val: i32) -> QueryResult<Vec<PriceHistory>> {
    price_history::table
        .filter(price_history::product_id.eq(product_id_val))
        .order(price_history::changed_at.asc())
        .select(PriceHistory::as_select())
        .load(conn)
}

pub fn list_images(conn: &mut PgConnection, product: &Product) -> QueryResult<Vec<ProductImage>> {
    ProductImage::belonging_to(product)
        .order(product_images::position.asc())
        .select(ProductImage::as_select())
        .load(conn)
}

/// Appends images after the current last position, keeping their given order.
pub fn insert_images(
    conn: &mut PgConnection,
    product_id_val: i32,
    filenames: &[String],
) -> QueryResult<Vec<ProductImage>> {
    if filenames.is_empty() {
        return Ok(Vec::new());
    }

    conn.transaction(|conn| {
        let last: Option<i32> = product_images::table
            .filter(product_images::product_id.eq(product_id_val))
            .select(max(product_images::position))
            .get_result(conn)?;
        let start = last.unwrap_or(0);

        let rows: Vec<NewProductImage> = filenames
            .iter()
            .enumerate()
            .map(|(i, filename)| NewProductImage {
                product_id: product_id_val,
                filename: filename.clone(),
                position: start + i as i32 + 1,
            })
            .collect();

        diesel::insert_into(product_images::table)
            .values(&rows)
            .returning(ProductImage::as_returning())
            .get_results(conn)
    })
}

/// Looks an image up through its product so other tenants' images stay invisible.
pub fn get_image_for_user(conn: &mut PgConnection, user_id_val: i32, image_id: i32) -> QueryResult<ProductImage> {
    product_images::table
        .inner_join(products::table)
        .filter(product_images::id.eq(image_id))
        .filter(products::created_by.eq(user_id_val))
        .select(ProductImage::as_select())
        .first(conn)
}

pub fn delete_image(conn: &mut PgConnection, image_id: i32) -> QueryResult<usize> {
    diesel::delete(product_images::table.find(image_id)).execute(conn)
}
