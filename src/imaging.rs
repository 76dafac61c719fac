use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView, ImageFormat};
use image::imageops::FilterType;
use sha2::{Digest, Sha256};

use crate::{ImageAsset, ShareError};

// Image normalisation applied before anything is handed to another app.
// Stickers are constrained to a small bound, backgrounds to a larger one, the longer side decides.
// Nothing is ever upscaled and an image already within bounds keeps its original bytes.

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ShareError> {
    image::load_from_memory(bytes).map_err(|e| ShareError::ImageDecode(e.to_string()))
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ShareError> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| ShareError::ImageConversion(e.to_string()))?;
    Ok(out.into_inner())
}

/// Dimensions of `(width, height)` scaled so the longer side is at most `max`.
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if max == 0 || (width <= max && height <= max) {
        return (width, height);
    }
    let scale = |side: u32, long: u32| ((side as f64 * max as f64 / long as f64).round() as u32).clamp(1, max);
    if width >= height {
        (max, scale(height, width))
    } else {
        (scale(width, height), max)
    }
}

pub fn downscale(image: DynamicImage, max: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    let (w, h) = fit_within(width, height, max);
    if (w, h) == (width, height) {
        return image;
    }
    image.resize_exact(w, h, FilterType::Triangle)
}

/// Reads an image file and bounds it to `max` pixels on its longer side.
pub fn load_asset(path: &Path, max: u32) -> Result<ImageAsset, ShareError> {
    let display = path.display().to_string();
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(ShareError::FileNotFound(display)),
        Err(e) => return Err(ShareError::File(format!("{display}: {e}"))),
    };
    let image = image::load_from_memory(&bytes).map_err(|_| ShareError::ImageLoad(display))?;
    let (width, height) = image.dimensions();
    let (w, h) = fit_within(width, height, max);
    if (w, h) == (width, height) {
        return Ok(ImageAsset{path: path.to_path_buf(), bytes, width, height, resized: false});
    }
    log::debug!("downscaling {} from {width}x{height} to {w}x{h}", path.display());
    let scaled = downscale(image, max);
    Ok(ImageAsset{path: path.to_path_buf(), bytes: encode_png(&scaled)?, width: w, height: h, resized: true})
}

/// A file another app can read for `asset`. Downscaled bytes are written once into `dir`,
/// named by their SHA-256, so concurrent shares never overwrite each other's files.
pub fn staged_path(asset: &ImageAsset, dir: &Path) -> Result<PathBuf, ShareError> {
    if !asset.resized {
        return Ok(asset.path.clone());
    }
    let path = dir.join(format!("{}.png", hex::encode(Sha256::digest(&asset.bytes))));
    if path.is_file() {
        return Ok(path);
    }
    std::fs::create_dir_all(dir)?;
    let mut staged = tempfile::Builder::new().suffix(".png").tempfile_in(dir)?;
    staged.write_all(&asset.bytes)?;
    staged.persist(&path).map_err(|e| ShareError::File(format!("{}: {}", path.display(), e.error)))?;
    Ok(path)
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(width, height, image::Rgba([200, 30, 30, 255])));
    encode_png(&image).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_bounds_is_untouched() {
        assert_eq!(fit_within(640, 480, 640), (640, 480));
        assert_eq!(fit_within(10, 10, 640), (10, 10));
        let image = decode(&png_bytes(30, 20)).unwrap();
        assert_eq!(downscale(image, 640).dimensions(), (30, 20));
    }

    #[test]
    fn longer_side_decides() {
        assert_eq!(fit_within(4000, 3000, 1920), (1920, 1440));
        assert_eq!(fit_within(1080, 1920, 640), (360, 640));
        assert_eq!(fit_within(5000, 1, 640), (640, 1));
    }

    #[test]
    fn downscale_keeps_aspect_ratio() {
        for (w, h, max) in [(1000, 333, 640), (333, 1000, 640), (2500, 2500, 1920), (1999, 1001, 300)] {
            let (nw, nh) = fit_within(w, h, max);
            assert!(nw <= w && nh <= h);
            assert!(nw.max(nh) == max);
            let before = w as f64 / h as f64;
            let after = nw as f64 / nh as f64;
            assert!((before - after).abs() / before < 0.01, "{w}x{h} -> {nw}x{nh}");
        }
    }

    #[test]
    fn downscale_is_idempotent() {
        let image = decode(&png_bytes(900, 300)).unwrap();
        let once = downscale(image, 300);
        assert_eq!(once.dimensions(), (300, 100));
        let twice = downscale(once, 300);
        assert_eq!(twice.dimensions(), (300, 100));
    }

    #[test]
    fn undecodable_bytes_are_an_error() {
        assert!(matches!(decode(b"definitely not an image"), Err(ShareError::ImageDecode(_))));
    }

    #[test]
    fn load_asset_passes_small_files_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sticker.png");
        let bytes = png_bytes(50, 40);
        std::fs::write(&path, &bytes).unwrap();

        let asset = load_asset(&path, 640).unwrap();
        assert!(!asset.resized);
        assert_eq!(asset.bytes, bytes);
        assert_eq!((asset.width, asset.height), (50, 40));
    }

    #[test]
    fn load_asset_downscales_large_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("background.png");
        std::fs::write(&path, png_bytes(800, 400)).unwrap();

        let asset = load_asset(&path, 200).unwrap();
        assert!(asset.resized);
        assert_eq!((asset.width, asset.height), (200, 100));
        assert_eq!(decode(&asset.bytes).unwrap().dimensions(), (200, 100));
    }

    #[test]
    fn staging_is_per_content() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("s.png");
        std::fs::write(&source, png_bytes(10, 10)).unwrap();
        let original = load_asset(&source, 640).unwrap();
        assert_eq!(staged_path(&original, dir.path()).unwrap(), source);

        let cache = dir.path().join("cache");
        let red = ImageAsset{resized: true, bytes: png_bytes(4, 2), width: 4, height: 2, ..original.clone()};
        let other = ImageAsset{bytes: png_bytes(2, 4), width: 2, height: 4, ..red.clone()};

        let first = staged_path(&red, &cache).unwrap();
        assert_eq!(staged_path(&red, &cache).unwrap(), first);
        let second = staged_path(&other, &cache).unwrap();
        assert_ne!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), red.bytes);
        assert_eq!(std::fs::read(&second).unwrap(), other.bytes);
        assert_eq!(std::fs::read_dir(&cache).unwrap().count(), 2);
    }

    #[test]
    fn load_asset_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.png");
        assert!(matches!(load_asset(&missing, 640), Err(ShareError::FileNotFound(_))));

        let garbage = dir.path().join("garbage.png");
        std::fs::write(&garbage, b"nope").unwrap();
        assert!(matches!(load_asset(&garbage, 640), Err(ShareError::ImageLoad(_))));
    }
}
