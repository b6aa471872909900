use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::str::FromStr;

use tag2qr::db::models::{LabelTemplateUpdate, Product, Store};
use tag2qr::label::{
    qr_size_mm, render_label_html, visible_fields, LabelConfig, LabelField, LabelLayout, LabelTemplate,
};

fn timestamp() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(12, 0, 0).unwrap()
}

fn product(name: &str, description: Option<&str>) -> Product {
    Product {
        id: 3,
        sku: "PRD-AB12CD".to_string(),
        name: name.to_string(),
        slug: "slug".to_string(),
        description: description.map(str::to_string),
        price: BigDecimal::from_str("12.5").unwrap(),
        active: true,
        created_by: 1,
        category_id: None,
        created_at: timestamp(),
    }
}

fn store() -> Store {
    Store {
        id: 1,
        user_id: 1,
        name: "MY STORE".to_string(),
        phone: None,
        email: None,
        address: None,
        website: None,
        logo_filename: None,
        label_show_store_name: true,
        label_show_product_name: true,
        label_show_logo: true,
        label_show_price: true,
        label_show_sku: true,
        label_show_description: false,
        label_font_size: 14,
        label_template: "square".to_string(),
        label_width: 60,
        label_height: 60,
        label_padding: 4,
        label_qr_size: 50,
        label_border: false,
        label_border_width: 2,
        label_border_color: "#112233".to_string(),
        label_background_color: "#FFFFFF".to_string(),
        label_text_color: "#000000".to_string(),
        updated_at: timestamp(),
    }
}

fn template_update() -> LabelTemplateUpdate {
    LabelTemplateUpdate {
        label_template: "circular".to_string(),
        label_width: 50,
        label_height: 50,
        label_padding: 3,
        label_qr_size: 60,
        label_border: true,
        label_border_width: 1,
        label_border_color: "#000000".to_string(),
        label_background_color: "#ffffff".to_string(),
        label_text_color: "#000000".to_string(),
        label_show_store_name: false,
        label_show_product_name: true,
        label_show_logo: false,
        label_show_price: true,
        label_show_sku: true,
        label_show_description: false,
        label_font_size: 10,
    }
}

#[test]
fn qr_size_is_width_percentage() {
    for width in [20, 33, 50, 80, 120, 200] {
        for percent in [20, 25, 30, 50, 75, 80] {
            let expected = width as f64 * percent as f64 / 100.0;
            assert!((qr_size_mm(width as f64, percent as f64) - expected).abs() < 1e-9);

            let config = LabelConfig {
                width_mm: width,
                qr_percent: percent,
                ..LabelConfig::default()
            };
            let layout = LabelLayout::compute(&config);
            assert!((layout.qr_size_mm - expected).abs() < 1e-9, "{}mm at {}%", width, percent);
        }
    }
}

#[test]
fn shape_does_not_change_geometry() {
    let base = LabelConfig::default();
    let rect = LabelLayout::compute(&base);
    for template in [LabelTemplate::Square, LabelTemplate::Circular] {
        let layout = LabelLayout::compute(&LabelConfig { template, ..base.clone() });
        assert_eq!(layout.qr_size_mm, rect.qr_size_mm);
        assert_eq!(layout.content_width_mm, rect.content_width_mm);
    }
}

#[test]
fn default_layout() {
    let layout = LabelLayout::compute(&LabelConfig::default());
    assert_eq!(layout.width_mm, 80.0);
    assert_eq!(layout.height_mm, 50.0);
    assert_eq!(layout.qr_size_mm, 24.0);
    assert_eq!(layout.content_width_mm, 70.0);
    assert_eq!(layout.content_height_mm, 40.0);
}

#[test]
fn defaults_and_bounds_are_valid() {
    assert!(LabelConfig::default().validate().is_ok());

    let edges = LabelConfig {
        width_mm: 20,
        height_mm: 200,
        padding_mm: 0,
        qr_percent: 80,
        border_width_px: 10,
        font_size_pt: 8,
        ..LabelConfig::default()
    };
    assert!(edges.validate().is_ok());
}

#[test]
fn out_of_range_values_are_rejected() {
    let base = LabelConfig::default();
    let bad = [
        LabelConfig { width_mm: 19, ..base.clone() },
        LabelConfig { width_mm: 201, ..base.clone() },
        LabelConfig { height_mm: 19, ..base.clone() },
        LabelConfig { padding_mm: -1, ..base.clone() },
        LabelConfig { padding_mm: 21, ..base.clone() },
        LabelConfig { qr_percent: 19, ..base.clone() },
        LabelConfig { qr_percent: 81, ..base.clone() },
        LabelConfig { border_width_px: 0, ..base.clone() },
        LabelConfig { border_width_px: 11, ..base.clone() },
        LabelConfig { font_size_pt: 25, ..base.clone() },
        LabelConfig { border_color: "#12345".to_string(), ..base.clone() },
        LabelConfig { text_color: "#GGGGGG".to_string(), ..base.clone() },
        LabelConfig { background_color: "white".to_string(), ..base.clone() },
    ];
    for config in bad {
        assert!(config.validate().is_err(), "{:?} accepted", config);
    }
}

#[test]
fn config_from_store_and_update() {
    let config = LabelConfig::from_store(&store());
    assert_eq!(config.template, LabelTemplate::Square);
    assert_eq!(config.width_mm, 60);
    assert!(!config.border);
    assert!(!config.show.description);

    let mut odd = store();
    odd.label_template = "triangle".to_string();
    assert_eq!(LabelConfig::from_store(&odd).template, LabelTemplate::Rectangular);

    let config = LabelConfig::from_update(&template_update()).unwrap();
    assert_eq!(config.template, LabelTemplate::Circular);
    assert!(config.validate().is_ok());

    let mut update = template_update();
    update.label_template = "oval".to_string();
    assert!(LabelConfig::from_update(&update).is_err());
}

#[test]
fn visible_fields_follow_print_order() {
    let config = LabelConfig::default();
    let fields = visible_fields(&config, "Corner Shop", Some("data:image/jpeg;base64,AAAA"), &product("Tea", None));
    assert_eq!(
        fields,
        vec![
            LabelField::Logo("data:image/jpeg;base64,AAAA".to_string()),
            LabelField::StoreName("Corner Shop".to_string()),
            LabelField::ProductName("Tea".to_string()),
            LabelField::Price("$12.50".to_string()),
            LabelField::Sku("PRD-AB12CD".to_string()),
        ]
    );
}

#[test]
fn hidden_and_empty_fields_are_skipped() {
    let mut config = LabelConfig::default();
    config.show.store_name = false;
    config.show.price = false;
    config.show.description = true;

    let fields = visible_fields(&config, "Corner Shop", None, &product("Tea", Some("   ")));
    assert_eq!(
        fields,
        vec![
            LabelField::ProductName("Tea".to_string()),
            LabelField::Sku("PRD-AB12CD".to_string()),
        ]
    );

    let fields = visible_fields(&config, "Corner Shop", None, &product("Tea", Some("Loose leaf")));
    assert_eq!(fields.last(), Some(&LabelField::Description("Loose leaf".to_string())));
}

#[test]
fn html_is_sized_and_escaped() {
    let config = LabelConfig::default();
    let layout = LabelLayout::compute(&config);
    let fields = visible_fields(&config, "Tom & Jerry's", None, &product("<Mug>", None));
    let html = render_label_html(&config, &layout, &fields, "data:image/png;base64,QR", "Label PRD-AB12CD");

    assert!(html.contains("@page { size: 80mm 50mm; margin: 0; }"));
    assert!(html.contains("width: 24mm; height: 24mm;"));
    assert!(html.contains(r#"src="data:image/png;base64,QR""#));
    assert!(html.contains("&lt;Mug&gt;"));
    assert!(html.contains("Tom &amp; Jerry&#39;s"));
    assert!(!html.contains("<Mug>"));
    assert!(html.contains("1px solid #000000"));
    assert!(html.contains("flex-direction: row"));
}

#[test]
fn circular_template_rounds_the_label() {
    let config = LabelConfig {
        template: LabelTemplate::Circular,
        border: false,
        width_mm: 45,
        height_mm: 45,
        qr_percent: 50,
        ..LabelConfig::default()
    };
    let layout = LabelLayout::compute(&config);
    let html = render_label_html(&config, &layout, &[], "data:image/png;base64,QR", "x");

    assert!(html.contains("border-radius: 50%"));
    assert!(html.contains("border: none;"));
    assert!(html.contains("width: 22.5mm; height: 22.5mm;"));
    assert!(html.contains("template-circular"));
}
