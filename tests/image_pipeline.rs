use base64::{engine::general_purpose, Engine as _};
use chrono::NaiveDate;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tempfile::tempdir;

use tag2qr::images::{
    create_thumbnail, decode_data_url, process_logo, remove_image_files, remove_product_dir,
    resize_image, save_camera_capture, save_product_images, thumbnail_filename, ImageOutcome,
    UploadedFile,
};
use tag2qr::settings::{Settings, UploadSettings};

fn uploads() -> UploadSettings {
    Settings::default().uploads
}

fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), format)
        .unwrap();
    bytes
}

// Sniffs the content: resized originals keep their extension but hold JPEG data.
fn dimensions(path: &Path) -> (u32, u32) {
    let img = image::load_from_memory(&fs::read(path).unwrap()).unwrap();
    (img.width(), img.height())
}

fn file_count(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

#[test]
fn wide_upload_is_capped_and_thumbnailed() {
    let dir = tempdir().unwrap();
    let files = vec![UploadedFile {
        filename: "Wide.PNG".to_string(),
        bytes: encoded(2000, 1000, ImageFormat::Png),
    }];

    let outcomes = save_product_images(dir.path(), &files, &uploads());
    assert_eq!(outcomes.len(), 1);
    let filename = outcomes[0].saved_filename().expect("image should be stored").to_string();
    assert!(filename.ends_with(".png"));
    assert_eq!(filename.len(), 32 + ".png".len());

    assert_eq!(dimensions(&dir.path().join(&filename)), (1024, 512));
    assert_eq!(dimensions(&dir.path().join(thumbnail_filename(&filename))), (400, 200));
}

#[test]
fn tall_sliver_gets_a_bounded_thumbnail() {
    let dir = tempdir().unwrap();
    let files = vec![UploadedFile {
        filename: "sliver.png".to_string(),
        bytes: encoded(1, 20_000, ImageFormat::Png),
    }];

    let outcomes = save_product_images(dir.path(), &files, &uploads());
    let filename = outcomes[0].saved_filename().expect("image should be stored").to_string();

    assert_eq!(dimensions(&dir.path().join(&filename)), (1, 20_000));
    let (w, h) = dimensions(&dir.path().join(thumbnail_filename(&filename)));
    assert_eq!((w, h), (1, 1600));
    assert_eq!(file_count(dir.path()), 2);
}

#[test]
fn resize_keeps_aspect_ratio() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("photo.jpg");
    fs::write(&path, encoded(3000, 1999, ImageFormat::Jpeg)).unwrap();

    assert!(resize_image(&path, 1024).unwrap());
    let (w, h) = dimensions(&path);
    assert_eq!(w, 1024);
    assert_eq!(h, 1999 * 1024 / 3000);
}

#[test]
fn narrow_image_is_left_alone() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("small.png");
    let original = encoded(300, 150, ImageFormat::Png);
    fs::write(&path, &original).unwrap();

    assert!(!resize_image(&path, 1024).unwrap());
    assert_eq!(fs::read(&path).unwrap(), original);

    let thumb = dir.path().join("small_thumb.jpg");
    create_thumbnail(&path, &thumb, 400).unwrap();
    assert_eq!(dimensions(&thumb), (400, 200));
}

#[test]
fn corrupt_file_does_not_stop_siblings() {
    let dir = tempdir().unwrap();
    let product_dir = dir.path().join("products").join("7");
    let files = vec![
        UploadedFile {
            filename: "first.png".to_string(),
            bytes: encoded(640, 480, ImageFormat::Png),
        },
        UploadedFile {
            filename: "broken.jpg".to_string(),
            bytes: b"definitely not a jpeg".to_vec(),
        },
        UploadedFile {
            filename: "third.jpeg".to_string(),
            bytes: encoded(1200, 600, ImageFormat::Jpeg),
        },
    ];

    let outcomes = save_product_images(&product_dir, &files, &uploads());
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].saved_filename().is_some());
    assert!(matches!(
        &outcomes[1],
        ImageOutcome::Failed { original_name, .. } if original_name == "broken.jpg"
    ));
    assert!(outcomes[2].saved_filename().is_some());

    // two originals and two thumbnails, nothing left from the broken file
    assert_eq!(file_count(&product_dir), 4);
}

#[test]
fn unsupported_extension_is_reported() {
    let dir = tempdir().unwrap();
    let files = vec![UploadedFile {
        filename: "anim.gif".to_string(),
        bytes: encoded(10, 10, ImageFormat::Png),
    }];

    let outcomes = save_product_images(dir.path(), &files, &uploads());
    match &outcomes[0] {
        ImageOutcome::Failed { reason, .. } => assert!(reason.contains("unsupported")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(file_count(dir.path()), 0);
}

#[test]
fn removing_product_dir_takes_thumbnails_too() {
    let dir = tempdir().unwrap();
    let product_dir = dir.path().join("42");
    let files = vec![
        UploadedFile {
            filename: "a.png".to_string(),
            bytes: encoded(50, 50, ImageFormat::Png),
        },
        UploadedFile {
            filename: "b.jpg".to_string(),
            bytes: encoded(60, 30, ImageFormat::Jpeg),
        },
    ];
    let outcomes = save_product_images(&product_dir, &files, &uploads());
    assert!(outcomes.iter().all(|o| o.saved_filename().is_some()));
    assert_eq!(file_count(&product_dir), 4);

    assert!(remove_product_dir(&product_dir).unwrap());
    assert!(!product_dir.exists());
    assert!(!remove_product_dir(&product_dir).unwrap());
}

#[test]
fn removing_one_image_removes_its_thumbnail() {
    let dir = tempdir().unwrap();
    let files = vec![UploadedFile {
        filename: "a.png".to_string(),
        bytes: encoded(50, 50, ImageFormat::Png),
    }];
    let outcomes = save_product_images(dir.path(), &files, &uploads());
    let filename = outcomes[0].saved_filename().unwrap().to_string();

    remove_image_files(dir.path(), &filename).unwrap();
    assert_eq!(file_count(dir.path()), 0);
    // already gone
    remove_image_files(dir.path(), &filename).unwrap();
}

#[test]
fn camera_capture_is_stored_as_jpeg() {
    let dir = tempdir().unwrap();
    let data_url = format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(encoded(1600, 1200, ImageFormat::Png))
    );
    let bytes = decode_data_url(&data_url).unwrap();
    let taken_at = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(3, 4, 5)
        .unwrap();

    let filename = save_camera_capture(dir.path(), &bytes, taken_at, &uploads()).unwrap();
    assert!(filename.starts_with("camera_20240102_030405_"));
    assert!(filename.ends_with(".jpg"));
    assert_eq!(dimensions(&dir.path().join(&filename)), (1024, 768));
    assert_eq!(dimensions(&dir.path().join(thumbnail_filename(&filename))), (400, 300));
}

#[test]
fn camera_capture_rejects_garbage() {
    let dir = tempdir().unwrap();
    let taken_at = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    assert!(save_camera_capture(dir.path(), b"nope", taken_at, &uploads()).is_err());
    assert_eq!(file_count(dir.path()), 0);
}

#[test]
fn logo_is_flattened_and_capped() {
    let dir = tempdir().unwrap();
    let logo = RgbaImage::from_fn(800, 400, |x, _| Rgba([0, 0, 255, if x < 400 { 0 } else { 255 }]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(logo)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();

    let dest = dir.path().join("store").join("logo.jpg");
    process_logo(&bytes, &dest, 200).unwrap();

    let written = fs::read(&dest).unwrap();
    assert_eq!(&written[..2], &[0xFF, 0xD8]);
    assert_eq!(dimensions(&dest), (200, 100));

    let decoded = image::load_from_memory(&written).unwrap().to_rgb8();
    let left = decoded.get_pixel(10, 50);
    assert!(left.0.iter().all(|c| *c > 240), "transparent area should be white, got {:?}", left);
}
