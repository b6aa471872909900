diesel::table! {
    users (id) {
        id -> Int4,
        email -> Varchar,
        created_at -> Timestamp,
    }
}

diesel::table! {
    stores (id) {
        id -> Int4,
        user_id -> Int4,
        name -> Varchar,
        phone -> Nullable<Varchar>,
        email -> Nullable<Varchar>,
        address -> Nullable<Text>,
        website -> Nullable<Varchar>,
        logo_filename -> Nullable<Varchar>,
        label_show_store_name -> Bool,
        label_show_product_name -> Bool,
        label_show_logo -> Bool,
        label_show_price -> Bool,
        label_show_sku -> Bool,
        label_show_description -> Bool,
        label_font_size -> Int4,
        label_template -> Varchar,
        label_width -> Int4,
        label_height -> Int4,
        label_padding -> Int4,
        label_qr_size -> Int4,
        label_border -> Bool,
        label_border_width -> Int4,
        label_border_color -> Varchar,
        label_background_color -> Varchar,
        label_text_color -> Varchar,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    categories (id) {
        id -> Int4,
        user_id -> Int4,
        name -> Varchar,
        description -> Nullable<Text>,
        slug -> Varchar,
        active -> Bool,
        created_at -> Timestamp,
    }
}

diesel::table! {
    products (id) {
        id -> Int4,
        sku -> Varchar,
        name -> Varchar,
        slug -> Varchar,
        description -> Nullable<Text>,
        price -> Numeric,
        active -> Bool,
        created_by -> Int4,
        category_id -> Nullable<Int4>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    product_images (id) {
        id -> Int4,
        product_id -> Int4,
        filename -> Varchar,
        position -> Int4,
        created_at -> Timestamp,
    }
}

diesel::table! {
    price_history (id) {
        id -> Int4,
        product_id -> Int4,
        price -> Numeric,
        changed_at -> Timestamp,
        changed_by -> Nullable<Int4>,
    }
}

diesel::joinable!(stores -> users (user_id));
diesel::joinable!(categories -> users (user_id));
diesel::joinable!(products -> users (created_by));
diesel::joinable!(products -> categories (category_id));
diesel::joinable!(product_images -> products (product_id));
diesel::joinable!(price_history -> products (product_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    stores,
    categories,
    products,
    product_images,
    price_history,
);
