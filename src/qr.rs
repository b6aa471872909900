//! QR code rendering for public product links.
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// Pixels per QR module.
pub const MODULE_SIZE: u32 = 10;
/// Quiet zone around the code, in modules.
pub const BORDER_MODULES: u32 = 4;

#[derive(Debug, Clone)]
pub struct QrService {
    cache_dir: Option<PathBuf>,
}

impl QrService {
    pub fn new() -> Self {
        Self { cache_dir: None }
    }

    /// Enables the on-disk PNG cache under `dir`.
    pub fn with_cache_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: Some(dir.into()),
        }
    }

    /// Encodes `data` as a black-on-white QR code.
    pub fn render(&self, data: &str) -> Result<GrayImage> {
        let code = QrCode::with_error_correction_level(data, EcLevel::L)
            .map_err(|e| AppError::BadRequest(format!("cannot encode QR code: {}", e)))?;

        let width = code.width() as u32;
        let img_size = (width + 2 * BORDER_MODULES) * MODULE_SIZE;
        let mut img = GrayImage::from_pixel(img_size, img_size, Luma([255u8]));

        for (i, color) in code.to_colors().iter().enumerate() {
            if *color != qrcode::Color::Dark {
                continue;
            }
            let x = (i as u32 % width + BORDER_MODULES) * MODULE_SIZE;
            let y = (i as u32 / width + BORDER_MODULES) * MODULE_SIZE;
            for dy in 0..MODULE_SIZE {
                for dx in 0..MODULE_SIZE {
                    img.put_pixel(x + dx, y + dy, Luma([0u8]));
                }
            }
        }

        Ok(img)
    }

    /// PNG bytes for `data`. Identical input gives identical bytes.
    pub fn generate_png(&self, data: &str) -> Result<Vec<u8>> {
        let img = self.render(data)?;
        let mut png_bytes = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
            .map_err(|e| AppError::Internal(format!("failed to encode QR PNG: {}", e)))?;
        Ok(png_bytes)
    }

    /// `data:image/png;base64,...` form for inlining into HTML.
    pub fn generate_data_url(&self, data: &str) -> Result<String> {
        let png_bytes = self.generate_png(data)?;
        Ok(format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(png_bytes)
        ))
    }

    pub fn cache_path(&self, sku: &str, product_id: i32) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(format!("qr_{}_{}.png", sku, product_id)))
    }

    /// Best effort: a failed write is logged and otherwise ignored.
    pub fn store_cached(&self, sku: &str, product_id: i32, png_bytes: &[u8]) {
        let Some(path) = self.cache_path(sku, product_id) else {
            return;
        };
        if let Err(e) = write_file(&path, png_bytes) {
            log::warn!("Could not cache QR code at {}: {}", path.display(), e);
        }
    }

    pub fn remove_cached(&self, sku: &str, product_id: i32) {
        if let Some(path) = self.cache_path(sku, product_id) {
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Could not remove cached QR code {}: {}", path.display(), e);
                }
            }
        }
    }
}

impl Default for QrService {
    fn default() -> Self {
        Self::new()
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)
}
