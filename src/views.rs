//! Server-rendered HTML pages.

use crate::db::models::{Product, ProductImage, Store};

/// Escapes text for use in HTML bodies and double-quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn store_contact(store: &Store) -> String {
    let mut lines = Vec::new();
    if let Some(phone) = store.phone.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!(r#"<a href="tel:{0}">{0}</a>"#, escape_html(phone)));
    }
    if let Some(email) = store.email.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!(r#"<a href="mailto:{0}">{0}</a>"#, escape_html(email)));
    }
    if let Some(address) = store.address.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("<span>{}</span>", escape_html(address)));
    }
    if let Some(website) = store.website.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!(r#"<a href="{0}" rel="noopener">{0}</a>"#, escape_html(website)));
    }
    lines.join("\n        ")
}

/// Mobile page a scanned QR code lands on.
pub fn public_product_page(product: &Product, images: &[ProductImage], store: &Store, share_url: &str) -> String {
    let gallery: String = images
        .iter()
        .map(|img| {
            format!(
                r#"<a href="{}"><img src="{}" alt="{}" loading="lazy"></a>"#,
                escape_html(&img.url()),
                escape_html(&img.thumbnail_url()),
                escape_html(&product.name)
            )
        })
        .collect::<Vec<_>>()
        .join("\n      ");

    let description = product
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(|d| format!(r#"<p class="description">{}</p>"#, escape_html(d)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{name} | {store_name}</title>
  <meta property="og:title" content="{name}">
  <meta property="og:url" content="{share_url}">
  <style>
    body {{ font-family: sans-serif; margin: 0 auto; max-width: 640px; padding: 1rem; }}
    .gallery {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(140px, 1fr)); gap: .5rem; }}
    .gallery img {{ width: 100%; border-radius: 4px; }}
    .price {{ font-size: 1.6rem; font-weight: bold; }}
    .sku {{ color: #666; }}
    footer {{ margin-top: 2rem; display: flex; flex-direction: column; gap: .25rem; }}
  </style>
</head>
<body>
  <header><strong>{store_name}</strong></header>
  <main>
    <h1>{name}</h1>
    <div class="price">{price}</div>
    <div class="sku">SKU: {sku}</div>
    {description}
    <div class="gallery">
      {gallery}
    </div>
  </main>
  <footer>
        {contact}
  </footer>
</body>
</html>
"#,
        name = escape_html(&product.name),
        store_name = escape_html(&store.name),
        share_url = escape_html(share_url),
        price = escape_html(&product.price_formatted()),
        sku = escape_html(&product.sku),
        description = description,
        gallery = gallery,
        contact = store_contact(store),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }
}
