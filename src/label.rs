//! Printable label geometry and its HTML rendering.
//!
//! All sizes are millimetres except the border (CSS pixels) and the font
//! (points). The QR code edge is `width_mm * qr_percent / 100` for every
//! template; the template only picks the arrangement.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::models::{LabelTemplateUpdate, Product, Store};
use crate::error::AppError;
use crate::views::escape_html;

pub const WIDTH_RANGE_MM: (i32, i32) = (20, 200);
pub const HEIGHT_RANGE_MM: (i32, i32) = (20, 200);
pub const PADDING_RANGE_MM: (i32, i32) = (0, 20);
pub const QR_PERCENT_RANGE: (i32, i32) = (20, 80);
pub const BORDER_WIDTH_RANGE_PX: (i32, i32) = (1, 10);
pub const FONT_SIZE_RANGE_PT: (i32, i32) = (8, 24);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelTemplate {
    Rectangular,
    Square,
    Circular,
}

impl LabelTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelTemplate::Rectangular => "rectangular",
            LabelTemplate::Square => "square",
            LabelTemplate::Circular => "circular",
        }
    }

    fn css(&self) -> &'static str {
        match self {
            LabelTemplate::Rectangular => {
                ".label { flex-direction: row; align-items: center; }\n\
                 .info { flex: 1; text-align: left; }"
            }
            LabelTemplate::Square => {
                ".label { flex-direction: column; align-items: center; justify-content: center; }\n\
                 .info { text-align: center; }"
            }
            LabelTemplate::Circular => {
                ".label { flex-direction: column; align-items: center; justify-content: center; border-radius: 50%; }\n\
                 .info { text-align: center; }"
            }
        }
    }
}

impl fmt::Display for LabelTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LabelTemplate {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rectangular" => Ok(LabelTemplate::Rectangular),
            "square" => Ok(LabelTemplate::Square),
            "circular" => Ok(LabelTemplate::Circular),
            other => Err(AppError::Validation(format!("unknown label template {:?}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldVisibility {
    pub logo: bool,
    pub store_name: bool,
    pub product_name: bool,
    pub price: bool,
    pub sku: bool,
    pub description: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelConfig {
    pub template: LabelTemplate,
    pub width_mm: i32,
    pub height_mm: i32,
    pub padding_mm: i32,
    pub qr_percent: i32,
    pub border: bool,
    pub border_width_px: i32,
    pub border_color: String,
    pub background_color: String,
    pub text_color: String,
    pub font_size_pt: i32,
    pub show: FieldVisibility,
}

impl Default for LabelConfig {
    fn default() -> Self {
        LabelConfig {
            template: LabelTemplate::Rectangular,
            width_mm: 80,
            height_mm: 50,
            padding_mm: 5,
            qr_percent: 30,
            border: true,
            border_width_px: 1,
            border_color: "#000000".to_string(),
            background_color: "#FFFFFF".to_string(),
            text_color: "#000000".to_string(),
            font_size_pt: 14,
            show: FieldVisibility {
                logo: true,
                store_name: true,
                product_name: true,
                price: true,
                sku: true,
                description: false,
            },
        }
    }
}

impl LabelConfig {
    /// Stored rows are trusted; an unknown template name falls back to rectangular.
    pub fn from_store(store: &Store) -> Self {
        let template = store.label_template.parse().unwrap_or_else(|_| {
            log::warn!(
                "Store {} has unknown label template {:?}, using rectangular",
                store.id,
                store.label_template
            );
            LabelTemplate::Rectangular
        });

        LabelConfig {
            template,
            width_mm: store.label_width,
            height_mm: store.label_height,
            padding_mm: store.label_padding,
            qr_percent: store.label_qr_size,
            border: store.label_border,
            border_width_px: store.label_border_width,
            border_color: store.label_border_color.clone(),
            background_color: store.label_background_color.clone(),
            text_color: store.label_text_color.clone(),
            font_size_pt: store.label_font_size,
            show: FieldVisibility {
                logo: store.label_show_logo,
                store_name: store.label_show_store_name,
                product_name: store.label_show_product_name,
                price: store.label_show_price,
                sku: store.label_show_sku,
                description: store.label_show_description,
            },
        }
    }

    pub fn from_update(update: &LabelTemplateUpdate) -> Result<Self, AppError> {
        Ok(LabelConfig {
            template: update.label_template.parse()?,
            width_mm: update.label_width,
            height_mm: update.label_height,
            padding_mm: update.label_padding,
            qr_percent: update.label_qr_size,
            border: update.label_border,
            border_width_px: update.label_border_width,
            border_color: update.label_border_color.clone(),
            background_color: update.label_background_color.clone(),
            text_color: update.label_text_color.clone(),
            font_size_pt: update.label_font_size,
            show: FieldVisibility {
                logo: update.label_show_logo,
                store_name: update.label_show_store_name,
                product_name: update.label_show_product_name,
                price: update.label_show_price,
                sku: update.label_show_sku,
                description: update.label_show_description,
            },
        })
    }

    pub fn validate(&self) -> Result<(), AppError> {
        check_range("label_width", self.width_mm, WIDTH_RANGE_MM)?;
        check_range("label_height", self.height_mm, HEIGHT_RANGE_MM)?;
        check_range("label_padding", self.padding_mm, PADDING_RANGE_MM)?;
        check_range("label_qr_size", self.qr_percent, QR_PERCENT_RANGE)?;
        check_range("label_border_width", self.border_width_px, BORDER_WIDTH_RANGE_PX)?;
        check_range("label_font_size", self.font_size_pt, FONT_SIZE_RANGE_PT)?;
        check_color("label_border_color", &self.border_color)?;
        check_color("label_background_color", &self.background_color)?;
        check_color("label_text_color", &self.text_color)?;
        Ok(())
    }
}

pub fn check_range(field: &str, value: i32, (min, max): (i32, i32)) -> Result<(), AppError> {
    if value < min || value > max {
        return Err(AppError::Validation(format!(
            "{} must be between {} and {}, got {}",
            field, min, max, value
        )));
    }
    Ok(())
}

/// Accepts `#RRGGBB` only.
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

fn check_color(field: &str, value: &str) -> Result<(), AppError> {
    if !is_hex_color(value) {
        return Err(AppError::Validation(format!("{} must look like #RRGGBB, got {:?}", field, value)));
    }
    Ok(())
}

/// Edge length of the QR code on the label.
pub fn qr_size_mm(width_mm: f64, qr_percent: f64) -> f64 {
    width_mm * qr_percent / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelLayout {
    pub template: LabelTemplate,
    pub width_mm: f64,
    pub height_mm: f64,
    pub padding_mm: f64,
    pub qr_size_mm: f64,
    /// Box left inside the padding.
    pub content_width_mm: f64,
    pub content_height_mm: f64,
}

impl LabelLayout {
    pub fn compute(config: &LabelConfig) -> Self {
        let width = config.width_mm as f64;
        let height = config.height_mm as f64;
        let padding = config.padding_mm as f64;

        LabelLayout {
            template: config.template,
            width_mm: width,
            height_mm: height,
            padding_mm: padding,
            qr_size_mm: qr_size_mm(width, config.qr_percent as f64),
            content_width_mm: (width - 2.0 * padding).max(0.0),
            content_height_mm: (height - 2.0 * padding).max(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelField {
    Logo(String),
    StoreName(String),
    ProductName(String),
    Price(String),
    Sku(String),
    Description(String),
}

impl LabelField {
    fn to_html(&self) -> String {
        match self {
            LabelField::Logo(src) => {
                format!(r#"<img class="logo" src="{}" alt="logo">"#, escape_html(src))
            }
            LabelField::StoreName(v) => format!(r#"<div class="store-name">{}</div>"#, escape_html(v)),
            LabelField::ProductName(v) => format!(r#"<div class="product-name">{}</div>"#, escape_html(v)),
            LabelField::Price(v) => format!(r#"<div class="price">{}</div>"#, escape_html(v)),
            LabelField::Sku(v) => format!(r#"<div class="sku">SKU: {}</div>"#, escape_html(v)),
            LabelField::Description(v) => format!(r#"<div class="description">{}</div>"#, escape_html(v)),
        }
    }
}

/// Fields switched on in `config`, in print order. The logo needs a source
/// and the description needs text to appear.
pub fn visible_fields(
    config: &LabelConfig,
    store_name: &str,
    logo_src: Option<&str>,
    product: &Product,
) -> Vec<LabelField> {
    let show = &config.show;
    let mut fields = Vec::new();

    if show.logo {
        if let Some(src) = logo_src {
            fields.push(LabelField::Logo(src.to_string()));
        }
    }
    if show.store_name {
        fields.push(LabelField::StoreName(store_name.to_string()));
    }
    if show.product_name {
        fields.push(LabelField::ProductName(product.name.clone()));
    }
    if show.price {
        fields.push(LabelField::Price(product.price_formatted()));
    }
    if show.sku {
        fields.push(LabelField::Sku(product.sku.clone()));
    }
    if show.description {
        if let Some(desc) = product.description.as_deref().filter(|d| !d.trim().is_empty()) {
            fields.push(LabelField::Description(desc.to_string()));
        }
    }

    fields
}

/// Self-contained page sized for print-to-PDF at the label's exact size.
pub fn render_label_html(
    config: &LabelConfig,
    layout: &LabelLayout,
    fields: &[LabelField],
    qr_src: &str,
    title: &str,
) -> String {
    let border = if config.border {
        format!("{}px solid {}", config.border_width_px, config.border_color)
    } else {
        "none".to_string()
    };
    let body: String = fields.iter().map(LabelField::to_html).collect::<Vec<_>>().join("\n      ");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <style>
    @page {{ size: {w}mm {h}mm; margin: 0; }}
    html, body {{ margin: 0; padding: 0; }}
    .label {{
      box-sizing: border-box;
      width: {w}mm;
      height: {h}mm;
      padding: {p}mm;
      display: flex;
      gap: 2mm;
      overflow: hidden;
      border: {border};
      background: {bg};
      color: {fg};
      font-size: {font}pt;
      font-family: sans-serif;
    }}
    .qr {{ width: {qr}mm; height: {qr}mm; flex: none; }}
    .logo {{ max-height: 10mm; max-width: 100%; }}
    .product-name {{ font-weight: bold; }}
    .description {{ font-size: 0.7em; }}
    {template_css}
    @media print {{ .no-print {{ display: none; }} }}
  </style>
</head>
<body class="template-{template}">
  <div class="label">
    <img class="qr" src="{qr_src}" alt="QR code">
    <div class="info">
      {body}
    </div>
  </div>
  <button class="no-print" onclick="window.print()">Print</button>
</body>
</html>
"#,
        title = escape_html(title),
        w = fmt_mm(layout.width_mm),
        h = fmt_mm(layout.height_mm),
        p = fmt_mm(layout.padding_mm),
        qr = fmt_mm(layout.qr_size_mm),
        border = border,
        bg = config.background_color,
        fg = config.text_color,
        font = config.font_size_pt,
        template_css = layout.template.css(),
        template = layout.template,
        qr_src = escape_html(qr_src),
        body = body,
    )
}

/// `24` for whole millimetres, `24.5` otherwise.
fn fmt_mm(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}
