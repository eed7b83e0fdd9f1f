use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::config::PreprocessConfig;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// A binarized, resampled image: every pixel is exactly 0 or 255.
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    image: GrayImage,
    scale: f32,
}

impl PreprocessedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Resample factor applied to the source image.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    /// PNG encoding handed to the OCR engine.
    pub fn to_png(&self) -> Result<Vec<u8>, PreprocessError> {
        let mut buf = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| PreprocessError::Encode(e.to_string()))?;
        Ok(buf)
    }
}

/// Load an image file and binarize it for OCR.
pub fn prepare_for_ocr(path: &Path, config: &PreprocessConfig) -> Result<PreprocessedImage, PreprocessError> {
    let img = image::open(path)?;
    Ok(normalize(&img, config))
}

/// Decode raw image bytes (JPEG / PNG / WEBP / …) and binarize them for OCR.
pub fn prepare_for_ocr_from_bytes(
    data: &[u8],
    config: &PreprocessConfig,
) -> Result<PreprocessedImage, PreprocessError> {
    let img = image::load_from_memory(data)?;
    Ok(normalize(&img, config))
}

/// Resample factor: reach `target_max_dimension` on the longest edge, never
/// beyond `max_scale`.
pub fn scale_factor(width: u32, height: u32, config: &PreprocessConfig) -> f32 {
    let longest = width.max(height).max(1) as f32;
    (config.target_max_dimension as f32 / longest).min(config.max_scale)
}

/// Rec. 709 luma of an sRGB pixel.
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32
}

/// Resample + global threshold.
fn normalize(img: &DynamicImage, config: &PreprocessConfig) -> PreprocessedImage {
    let (width, height) = (img.width(), img.height());
    let scale = scale_factor(width, height, config);
    let new_width = ((width as f32 * scale).round() as u32).max(1);
    let new_height = ((height as f32 * scale).round() as u32).max(1);

    debug!(width, height, new_width, new_height, scale, "resampling receipt image");

    let resized = if (new_width, new_height) == (width, height) {
        img.to_rgb8()
    } else {
        img.resize_exact(new_width, new_height, image::imageops::FilterType::Lanczos3)
            .to_rgb8()
    };

    let threshold = config.threshold as f32;
    let binary: GrayImage = ImageBuffer::from_fn(new_width, new_height, |x, y| {
        let [r, g, b] = resized.get_pixel(x, y).0;
        if luminance(r, g, b) > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });

    PreprocessedImage { image: binary, scale }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid_rgb(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |_, _| Rgb(rgb)))
    }

    fn png_bytes(img: &DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn small_image_upscale_is_capped() {
        let cfg = PreprocessConfig::default();
        assert_eq!(scale_factor(100, 40, &cfg), 2.5);
        let out = normalize(&solid_rgb(100, 40, [200, 200, 200]), &cfg);
        assert_eq!((out.width(), out.height()), (250, 100));
    }

    #[test]
    fn large_image_is_scaled_to_target() {
        let cfg = PreprocessConfig::default();
        assert_eq!(scale_factor(5000, 1000, &cfg), 0.5);
        assert_eq!(scale_factor(1000, 2000, &cfg), 1.25);
    }

    #[test]
    fn every_pixel_is_pure_black_or_white() {
        let gradient: RgbImage = ImageBuffer::from_fn(64, 16, |x, _| {
            let v = (x * 4) as u8;
            Rgb([v, v, 255 - v])
        });
        let out = normalize(&DynamicImage::ImageRgb8(gradient), &PreprocessConfig::default());
        assert!(out.as_gray().pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert!(out.as_gray().pixels().any(|p| p[0] == 0));
        assert!(out.as_gray().pixels().any(|p| p[0] == 255));
    }

    #[test]
    fn light_paper_turns_white_and_ink_black() {
        let cfg = PreprocessConfig::default();
        let paper = normalize(&solid_rgb(8, 8, [200, 190, 170]), &cfg);
        assert!(paper.as_gray().pixels().all(|p| p[0] == 255));
        let ink = normalize(&solid_rgb(8, 8, [60, 60, 80]), &cfg);
        assert!(ink.as_gray().pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn luminance_weights_green_heaviest() {
        assert!(luminance(0, 255, 0) > luminance(255, 0, 0));
        assert!(luminance(255, 0, 0) > luminance(0, 0, 255));
        assert!((luminance(255, 255, 255) - 255.0).abs() < 0.01);
    }

    #[test]
    fn from_bytes_decodes_and_encodes_png() {
        let bytes = png_bytes(&solid_rgb(4, 4, [250, 250, 250]));
        let out = prepare_for_ocr_from_bytes(&bytes, &PreprocessConfig::default()).unwrap();
        assert_eq!(out.width(), 10);
        let png = out.to_png().unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = prepare_for_ocr_from_bytes(b"not an image", &PreprocessConfig::default()).unwrap_err();
        assert!(matches!(err, PreprocessError::Decode(_)));
    }

    #[test]
    fn prepare_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.png");
        solid_rgb(20, 10, [240, 240, 240]).save(&path).unwrap();
        let out = prepare_for_ocr(&path, &PreprocessConfig::default()).unwrap();
        assert_eq!((out.width(), out.height()), (50, 25));
    }
}
