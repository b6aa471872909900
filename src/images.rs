//! Product and logo image processing.
//!
//! Uploaded originals are capped at a maximum width and every stored image
//! gets a fixed-width JPEG thumbnail named `<base>_thumb.jpg` next to it.
//! Thumbnails of very tall images are bounded by height instead, at most
//! `MAX_THUMBNAIL_ASPECT` times the thumbnail width.
//! Each file in a batch is processed on its own; a bad file is reported and
//! cleaned up without touching its siblings.

use base64::{engine::general_purpose, Engine as _};
use chrono::NaiveDateTime;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use crate::settings::UploadSettings;

/// JPEG quality for originals that had to be downscaled and for logos.
pub const RESIZED_JPEG_QUALITY: u8 = 90;
/// JPEG quality for thumbnails and camera captures.
pub const THUMBNAIL_JPEG_QUALITY: u8 = 85;
/// Thumbnail height limit as a multiple of the thumbnail width.
pub const MAX_THUMBNAIL_ASPECT: u32 = 4;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid data url: {0}")]
    DataUrl(String),

    #[error("image dimensions out of range: {0}")]
    Dimensions(String),
}

/// A file pulled out of a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImageOutcome {
    Saved { original_name: String, filename: String },
    Failed { original_name: String, reason: String },
}

impl ImageOutcome {
    pub fn saved_filename(&self) -> Option<&str> {
        match self {
            ImageOutcome::Saved { filename, .. } => Some(filename),
            ImageOutcome::Failed { .. } => None,
        }
    }
}

/// `photo.png` -> `photo_thumb.jpg`
pub fn thumbnail_filename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    format!("{}_thumb.jpg", stem)
}

/// Height that keeps the aspect ratio at `target_width`, never below one pixel.
/// `None` when the result does not fit in a `u32`.
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> Option<u32> {
    if width == 0 {
        return Some(1);
    }
    let scaled = (height as u64 * target_width as u64) / width as u64;
    u32::try_from(scaled.max(1)).ok()
}

/// Largest size with the same aspect ratio that fits in `max_width x max_height`.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    let (w, h) = (width.max(1) as u64, height.max(1) as u64);
    let (max_w, max_h) = (max_width.max(1) as u64, max_height.max(1) as u64);

    let (out_w, out_h) = if max_w * h <= max_h * w {
        (max_w, (h * max_w / w).max(1))
    } else {
        ((w * max_h / h).max(1), max_h)
    };
    // both sides are bounded by the u32 maxima above
    (
        u32::try_from(out_w).unwrap_or(max_width),
        u32::try_from(out_h).unwrap_or(max_height),
    )
}

/// Thumbnail size: `thumbnail_width` wide unless that would make it taller
/// than `MAX_THUMBNAIL_ASPECT` widths.
pub fn thumbnail_size(width: u32, height: u32, thumbnail_width: u32) -> (u32, u32) {
    fit_within(
        width,
        height,
        thumbnail_width,
        thumbnail_width.saturating_mul(MAX_THUMBNAIL_ASPECT),
    )
}

/// Lowercased extension of an uploaded filename, if any.
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn unique_filename(ext: &str) -> String {
    format!("{}.{}", Uuid::new_v4().simple(), ext)
}

/// Drops alpha by compositing onto white; palette and grey images become RGB.
pub fn normalize(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

pub fn resize_to_width(img: &RgbImage, width: u32) -> Result<RgbImage, ImageError> {
    let height = scaled_height(img.width(), img.height(), width).ok_or_else(|| {
        ImageError::Dimensions(format!("{}x{} at width {}", img.width(), img.height(), width))
    })?;
    Ok(image::imageops::resize(img, width, height, FilterType::Lanczos3))
}

pub fn make_thumbnail(img: &RgbImage, thumbnail_width: u32) -> RgbImage {
    let (width, height) = thumbnail_size(img.width(), img.height(), thumbnail_width);
    image::imageops::resize(img, width, height, FilterType::Lanczos3)
}

pub fn write_jpeg(img: RgbImage, dest: &Path, quality: u8) -> Result<(), ImageError> {
    let mut writer = BufWriter::new(File::create(dest)?);
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    DynamicImage::ImageRgb8(img).write_with_encoder(encoder)?;
    writer.flush()?;
    Ok(())
}

fn decode_file(path: &Path) -> Result<DynamicImage, ImageError> {
    let bytes = fs::read(path)?;
    Ok(image::load_from_memory(&bytes)?)
}

/// Downscales the file in place when it is wider than `max_width`.
///
/// The rewritten file holds JPEG data regardless of its extension. Returns
/// whether a resize happened.
pub fn resize_image(path: &Path, max_width: u32) -> Result<bool, ImageError> {
    let img = decode_file(path)?;
    if img.width() <= max_width {
        return Ok(false);
    }

    let resized = resize_to_width(&normalize(&img), max_width)?;
    write_jpeg(resized, path, RESIZED_JPEG_QUALITY)?;
    Ok(true)
}

/// Writes a JPEG thumbnail of `source` to `dest`, sized by `thumbnail_size`.
pub fn create_thumbnail(source: &Path, dest: &Path, width: u32) -> Result<(), ImageError> {
    let img = decode_file(source)?;
    let thumb = make_thumbnail(&normalize(&img), width);
    write_jpeg(thumb, dest, THUMBNAIL_JPEG_QUALITY)
}

/// Removes an image and its thumbnail. Missing files are not an error.
pub fn remove_image_files(product_dir: &Path, filename: &str) -> io::Result<()> {
    for name in [filename.to_string(), thumbnail_filename(filename)] {
        match fs::remove_file(product_dir.join(&name)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Removes a product's image directory with every original and thumbnail in it.
pub fn remove_product_dir(product_dir: &Path) -> io::Result<bool> {
    match fs::remove_dir_all(product_dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn store_one(product_dir: &Path, file: &UploadedFile, uploads: &UploadSettings) -> Result<String, ImageError> {
    let ext = file_extension(&file.filename)
        .filter(|ext| uploads.is_allowed_extension(ext))
        .ok_or_else(|| ImageError::UnsupportedType(file.filename.clone()))?;

    let filename = unique_filename(&ext);
    let path = product_dir.join(&filename);
    let thumb_path = product_dir.join(thumbnail_filename(&filename));

    let result = fs::write(&path, &file.bytes)
        .map_err(ImageError::from)
        .and_then(|_| resize_image(&path, uploads.max_image_width))
        .and_then(|_| create_thumbnail(&path, &thumb_path, uploads.thumbnail_width));

    if let Err(e) = result {
        let _ = remove_image_files(product_dir, &filename);
        return Err(e);
    }
    Ok(filename)
}

/// Stores every file under `product_dir`, one outcome per input in input order.
pub fn save_product_images(
    product_dir: &Path,
    files: &[UploadedFile],
    uploads: &UploadSettings,
) -> Vec<ImageOutcome> {
    if files.is_empty() {
        return Vec::new();
    }

    if let Err(e) = fs::create_dir_all(product_dir) {
        log::warn!("Cannot create image directory {}: {}", product_dir.display(), e);
        return files
            .iter()
            .map(|file| ImageOutcome::Failed {
                original_name: file.filename.clone(),
                reason: e.to_string(),
            })
            .collect();
    }

    files
        .iter()
        .map(|file| match store_one(product_dir, file, uploads) {
            Ok(filename) => {
                log::debug!("Stored {} as {}", file.filename, filename);
                ImageOutcome::Saved {
                    original_name: file.filename.clone(),
                    filename,
                }
            }
            Err(e) => {
                log::warn!("Skipping image {}: {}", file.filename, e);
                ImageOutcome::Failed {
                    original_name: file.filename.clone(),
                    reason: e.to_string(),
                }
            }
        })
        .collect()
}

/// Normalizes a store logo, caps it at `max_width` and writes it as JPEG.
pub fn process_logo(bytes: &[u8], dest: &Path, max_width: u32) -> Result<(), ImageError> {
    let img = normalize(&image::load_from_memory(bytes)?);
    let img = if img.width() > max_width {
        resize_to_width(&img, max_width)?
    } else {
        img
    };
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    write_jpeg(img, dest, RESIZED_JPEG_QUALITY)
}

/// Payload bytes of a `data:<mime>;base64,<payload>` URL.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, ImageError> {
    let (header, payload) = data_url
        .split_once(',')
        .ok_or_else(|| ImageError::DataUrl("missing ',' separator".to_string()))?;
    if !header.starts_with("data:") || !header.ends_with(";base64") {
        return Err(ImageError::DataUrl(format!("unexpected header {:?}", header)));
    }
    general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| ImageError::DataUrl(e.to_string()))
}

/// Stores a camera capture as `camera_<timestamp>_<id>.jpg` plus thumbnail.
pub fn save_camera_capture(
    product_dir: &Path,
    bytes: &[u8],
    taken_at: NaiveDateTime,
    uploads: &UploadSettings,
) -> Result<String, ImageError> {
    let img = normalize(&image::load_from_memory(bytes)?);
    let img = if img.width() > uploads.max_image_width {
        resize_to_width(&img, uploads.max_image_width)?
    } else {
        img
    };

    fs::create_dir_all(product_dir)?;
    let suffix = Uuid::new_v4().simple().to_string();
    let filename = format!("camera_{}_{}.jpg", taken_at.format("%Y%m%d_%H%M%S"), &suffix[..8]);
    let path: PathBuf = product_dir.join(&filename);

    let thumb = make_thumbnail(&img, uploads.thumbnail_width);
    let result = write_jpeg(img, &path, THUMBNAIL_JPEG_QUALITY).and_then(|_| {
        write_jpeg(thumb, &product_dir.join(thumbnail_filename(&filename)), THUMBNAIL_JPEG_QUALITY)
    });
    if let Err(e) = result {
        let _ = remove_image_files(product_dir, &filename);
        return Err(e);
    }
    Ok(filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn thumbnail_name_keeps_base() {
        assert_eq!(thumbnail_filename("abc123.png"), "abc123_thumb.jpg");
        assert_eq!(thumbnail_filename("abc123.JPEG"), "abc123_thumb.jpg");
        assert_eq!(thumbnail_filename("noext"), "noext_thumb.jpg");
        assert_eq!(thumbnail_filename("a.b.webp"), "a.b_thumb.jpg");
    }

    #[test]
    fn scaled_height_truncates() {
        assert_eq!(scaled_height(2000, 1000, 1024), Some(512));
        assert_eq!(scaled_height(1500, 1001, 1024), Some(683));
        assert_eq!(scaled_height(5000, 1, 400), Some(1));
        assert_eq!(scaled_height(1, 20_000_000, 400), None);
    }

    #[test]
    fn thumbnails_of_tall_images_are_bounded() {
        assert_eq!(thumbnail_size(2000, 1000, 400), (400, 200));
        assert_eq!(thumbnail_size(300, 1200, 400), (400, 1600));
        assert_eq!(thumbnail_size(1, 20_000, 400), (1, 1600));
        assert_eq!(thumbnail_size(1, u32::MAX, 400), (1, 1600));
        assert_eq!(thumbnail_size(100, 2000, 400), (80, 1600));
    }

    #[test]
    fn transparent_pixels_become_white() {
        let mut rgba = image::RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([10, 20, 30, 255]));
        let rgb = normalize(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn data_url_needs_base64_header() {
        assert_eq!(decode_data_url("data:image/png;base64,aGk=").unwrap(), b"hi");
        assert!(decode_data_url("image/png;base64,aGk=").is_err());
        assert!(decode_data_url("data:image/png,aGk=").is_err());
        assert!(decode_data_url("no separator").is_err());
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(file_extension("Photo.JPG").as_deref(), Some("jpg"));
        assert_eq!(file_extension("noext"), None);
    }
}
