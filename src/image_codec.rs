//! # Image Codec
//!
//! Downscales uploaded photos and re-encodes them as JPEG data URLs small
//! enough to live inside a greeting.
//!
//! ## Profiles
//!
//! | Profile | Longest edge | JPEG quality | Byte budget |
//! |---------|--------------|--------------|-------------|
//! | `Embedded` | 640 px | 60 | 96 KiB |
//! | `Upload` | 1280 px | 85 | 1 MiB |
//!
//! `Embedded` targets links that carry the whole greeting in the URL
//! fragment; `Upload` targets remote blob storage. Images are never upscaled.
//! If the first encode overshoots the byte budget, quality steps down until
//! it fits or hits the floor.

use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, imageops::FilterType};
use tracing::debug;

use crate::error::GreetcardError;

/// Data URL prefix for encoded gallery photos.
pub const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Lowest JPEG quality tried when shrinking toward the byte budget.
const MIN_QUALITY: u8 = 30;

/// Quality decrement per retry.
const QUALITY_STEP: u8 = 15;

/// Size/fidelity trade-off for a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageProfile {
    Embedded,
    Upload,
}

impl ImageProfile {
    pub fn max_edge(&self) -> u32 {
        match self {
            ImageProfile::Embedded => 640,
            ImageProfile::Upload => 1280,
        }
    }

    pub fn quality(&self) -> u8 {
        match self {
            ImageProfile::Embedded => 60,
            ImageProfile::Upload => 85,
        }
    }

    /// Budget for the final data URL, in bytes.
    pub fn max_bytes(&self) -> usize {
        match self {
            ImageProfile::Embedded => 96 * 1024,
            ImageProfile::Upload => 1024 * 1024,
        }
    }
}

impl std::str::FromStr for ImageProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "embedded" | "url" => Ok(ImageProfile::Embedded),
            "upload" | "remote" => Ok(ImageProfile::Upload),
            _ => Err(format!("Unknown image profile '{}' (embedded, upload)", s)),
        }
    }
}

/// Photo downscaler bound to one profile.
#[derive(Debug, Clone, Copy)]
pub struct ImageCodec {
    profile: ImageProfile,
}

impl ImageCodec {
    pub fn new(profile: ImageProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> ImageProfile {
        self.profile
    }

    /// Resize on the blocking pool so UI-facing tasks keep running.
    pub async fn resize(&self, raw: Vec<u8>) -> Result<String, GreetcardError> {
        let codec = *self;
        tokio::task::spawn_blocking(move || codec.resize_blocking(&raw))
            .await
            .map_err(|e| GreetcardError::UnsupportedImage(format!("Processing error: {}", e)))?
    }

    /// Decode, downscale and re-encode as a JPEG data URL.
    pub fn resize_blocking(&self, raw: &[u8]) -> Result<String, GreetcardError> {
        let img = image::load_from_memory(raw)
            .map_err(|e| GreetcardError::UnsupportedImage(format!("Failed to decode image: {}", e)))?;

        let (width, height) = (img.width(), img.height());
        let (target_w, target_h) = target_size(width, height, self.profile.max_edge());
        let img = if (target_w, target_h) != (width, height) {
            img.resize_exact(target_w, target_h, FilterType::Triangle)
        } else {
            img
        };
        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

        let mut quality = self.profile.quality();
        loop {
            let data_url = encode_jpeg(&rgb, quality)?;
            debug!(
                width,
                height,
                target_w,
                target_h,
                quality,
                bytes = data_url.len(),
                "encoded gallery image"
            );
            if data_url.len() <= self.profile.max_bytes() {
                return Ok(data_url);
            }
            if quality <= MIN_QUALITY {
                return Err(GreetcardError::PayloadTooLarge {
                    len: data_url.len(),
                    max: self.profile.max_bytes(),
                });
            }
            quality = quality.saturating_sub(QUALITY_STEP).max(MIN_QUALITY);
        }
    }
}

/// Fit `width`×`height` inside a square of `max_edge`, keeping aspect ratio.
/// Never upscales.
pub fn target_size(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_edge {
        return (width, height);
    }
    let scale = max_edge as f64 / longest as f64;
    let w = ((width as f64 * scale).round() as u32).clamp(1, max_edge);
    let h = ((height as f64 * scale).round() as u32).clamp(1, max_edge);
    (w, h)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<String, GreetcardError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
        .map_err(|e| GreetcardError::UnsupportedImage(format!("Failed to encode JPEG: {}", e)))?;
    Ok(format!("{}{}", JPEG_DATA_URL_PREFIX, STANDARD.encode(buf.into_inner())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 200])
        });
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn decoded_dims(data_url: &str) -> (u32, u32) {
        let b64 = data_url.strip_prefix(JPEG_DATA_URL_PREFIX).unwrap();
        let bytes = STANDARD.decode(b64).unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn test_target_size_landscape() {
        assert_eq!(target_size(2560, 1440, 1280), (1280, 720));
    }

    #[test]
    fn test_target_size_portrait() {
        assert_eq!(target_size(1000, 4000, 1280), (320, 1280));
    }

    #[test]
    fn test_target_size_never_upscales() {
        assert_eq!(target_size(300, 200, 1280), (300, 200));
    }

    #[test]
    fn test_target_size_extreme_aspect() {
        let (w, h) = target_size(10_000, 1, 640);
        assert_eq!(w, 640);
        assert_eq!(h, 1);
    }

    #[tokio::test]
    async fn test_resize_downscales() {
        let codec = ImageCodec::new(ImageProfile::Upload);
        let data_url = codec.resize(png_bytes(1600, 800)).await.unwrap();
        assert!(data_url.starts_with(JPEG_DATA_URL_PREFIX));
        assert_eq!(decoded_dims(&data_url), (1280, 640));
    }

    #[test]
    fn test_resize_keeps_small_images() {
        let codec = ImageCodec::new(ImageProfile::Embedded);
        let data_url = codec.resize_blocking(&png_bytes(120, 90)).unwrap();
        assert_eq!(decoded_dims(&data_url), (120, 90));
        assert!(data_url.len() <= ImageProfile::Embedded.max_bytes());
    }

    #[test]
    fn test_resize_rejects_garbage() {
        let codec = ImageCodec::new(ImageProfile::Embedded);
        let err = codec.resize_blocking(b"definitely not an image").unwrap_err();
        assert!(matches!(err, GreetcardError::UnsupportedImage(_)));
    }
}
