//! Image-to-tensor adapter.
//!
//! Converts heterogeneous input sources (decoded images, raw RGBA pixel
//! buffers, files, URLs) into normalized `[1, H, W, 3]` tensors ready for a
//! classification model. Sources are read, never mutated or retained.

use base64::{prelude::BASE64_STANDARD, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbImage, RgbaImage};
use ndarray::Array4;
use tracing::debug;

use crate::error::{Result, SourceError};
use percept_inference::{MemoryTracker, Tensor};

/// An image input for preprocessing.
///
/// The adapter reads the source and produces a new tensor; the source is
/// left untouched.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// A decoded image.
    Image(DynamicImage),
    /// A raw RGBA pixel buffer, row-major, 4 bytes per pixel.
    Pixels {
        width: u32,
        height: u32,
        rgba: Vec<u8>,
    },
}

impl ImageSource {
    /// Wrap a decoded image.
    pub fn from_image(image: DynamicImage) -> Self {
        ImageSource::Image(image)
    }

    /// Wrap a raw RGBA buffer.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        ImageSource::Pixels {
            width,
            height,
            rgba,
        }
    }

    /// Source dimensions (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ImageSource::Image(img) => img.dimensions(),
            ImageSource::Pixels { width, height, .. } => (*width, *height),
        }
    }

    /// Decode the source into an RGB buffer.
    pub fn to_rgb8(&self) -> Result<RgbImage> {
        match self {
            ImageSource::Image(img) => Ok(img.to_rgb8()),
            ImageSource::Pixels {
                width,
                height,
                rgba,
            } => {
                let buf =
                    RgbaImage::from_raw(*width, *height, rgba.clone()).ok_or_else(|| {
                        SourceError::Decode(format!(
                            "pixel buffer length {} does not match {}x{} RGBA",
                            rgba.len(),
                            width,
                            height
                        ))
                    })?;
                Ok(DynamicImage::ImageRgba8(buf).to_rgb8())
            }
        }
    }
}

impl From<DynamicImage> for ImageSource {
    fn from(image: DynamicImage) -> Self {
        ImageSource::Image(image)
    }
}

/// Adapter producing normalized input tensors from image sources.
#[derive(Debug, Clone)]
pub struct ImageAdapter {
    tracker: MemoryTracker,
    jpeg_quality: u8,
}

impl ImageAdapter {
    /// Create an adapter with its own allocation tracker.
    pub fn new() -> Self {
        Self::with_tracker(MemoryTracker::new())
    }

    /// Create an adapter registering tensors with a shared tracker.
    pub fn with_tracker(tracker: MemoryTracker) -> Self {
        Self {
            tracker,
            jpeg_quality: 95,
        }
    }

    /// Set JPEG quality for data-URL encoding.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Convert a source into a `[1, height, width, 3]` tensor.
    ///
    /// `target` is a (height, width) pair. If the source's native size
    /// differs, a bilinear stretch-to-fit resize is applied; aspect ratio is
    /// not preserved and nothing is cropped. With `normalize`, u8 pixel
    /// values are mapped to `[0.0, 1.0]` by plain division; otherwise they
    /// stay in `[0, 255]` as f32.
    pub fn to_tensor(
        &self,
        source: &ImageSource,
        target: (u32, u32),
        normalize: bool,
    ) -> Result<Tensor> {
        let (height, width) = target;
        if height == 0 || width == 0 {
            return Err(crate::error::PerceptError::Config(format!(
                "invalid target size {}x{}",
                height, width
            )));
        }

        let (src_width, src_height) = source.dimensions();
        let rgb = source.to_rgb8()?;

        let resized = if (src_width, src_height) == (width, height) {
            rgb
        } else {
            imageops::resize(&rgb, width, height, FilterType::Triangle)
        };

        let mut tensor = Array4::<f32>::zeros((1, height as usize, width as usize, 3));

        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                let value = pixel[c] as f32;
                tensor[[0, y as usize, x as usize, c]] =
                    if normalize { value / 255.0 } else { value };
            }
        }

        debug!(
            "Converted {}x{} source to [1, {}, {}, 3] tensor",
            src_width, src_height, height, width
        );

        Ok(Tensor::tracked(tensor.into_dyn(), &self.tracker))
    }

    /// Crop a region out of an image, returning a new image.
    ///
    /// Out-of-bounds coordinates are a caller error, not silently clamped.
    pub fn crop(
        &self,
        image: &DynamicImage,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage> {
        let (image_width, image_height) = image.dimensions();

        let in_bounds = x >= 0
            && y >= 0
            && width > 0
            && height > 0
            && x as u64 + width as u64 <= image_width as u64
            && y as u64 + height as u64 <= image_height as u64;

        if !in_bounds {
            return Err(SourceError::InvalidRegion {
                x,
                y,
                width,
                height,
                image_width,
                image_height,
            }
            .into());
        }

        Ok(image.crop_imm(x as u32, y as u32, width, height))
    }

    /// Resize an image, returning a new image. Stretch-to-fit, bilinear.
    pub fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        image.resize_exact(width, height, FilterType::Triangle)
    }

    /// Encode an image to a base64 JPEG data URL.
    ///
    /// Deterministic for identical pixel content and encoder version;
    /// byte-exact round-tripping across encoder implementations is not
    /// guaranteed.
    pub fn to_data_url(&self, image: &DynamicImage) -> Result<String> {
        let rgb = image.to_rgb8();
        let mut buf = Vec::new();

        let mut encoder = JpegEncoder::new_with_quality(&mut buf, self.jpeg_quality);
        encoder
            .encode_image(&rgb)
            .map_err(|e| SourceError::Encode(e.to_string()))?;

        Ok(format!(
            "data:image/jpeg;base64,{}",
            BASE64_STANDARD.encode(&buf)
        ))
    }
}

impl Default for ImageAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode an image from a file on disk.
pub fn load_from_file(path: &std::path::Path) -> Result<DynamicImage> {
    let image = image::open(path)
        .map_err(|e| SourceError::Decode(format!("{}: {}", path.display(), e)))?;
    Ok(image)
}

/// Decode an image from in-memory bytes.
pub fn load_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(bytes).map_err(|e| SourceError::Decode(e.to_string()))?;
    Ok(image)
}

/// Fetch and decode an image from a URL.
///
/// Network failures, non-success statuses, and undecodable payloads all
/// surface as [`SourceError::Decode`].
#[cfg(feature = "native")]
pub async fn load_from_url(url: &str) -> Result<DynamicImage> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| SourceError::Decode(format!("fetch {}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(SourceError::Decode(format!(
            "fetch {}: HTTP {}",
            url,
            response.status()
        ))
        .into());
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| SourceError::Decode(format!("fetch {}: {}", url, e)))?;

    load_from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PerceptError;
    use image::Rgb;
    use pretty_assertions::assert_eq;

    fn solid_image(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn test_to_tensor_shape_is_target_shape() {
        let adapter = ImageAdapter::new();
        let source = ImageSource::from_image(solid_image(64, 48, [10, 20, 30]));

        let tensor = adapter.to_tensor(&source, (8, 16), true).unwrap();
        assert_eq!(tensor.shape(), &[1, 8, 16, 3]);
    }

    #[test]
    fn test_to_tensor_large_source_downsamples_fully() {
        let adapter = ImageAdapter::new();
        let source = ImageSource::from_image(solid_image(4000, 3000, [128, 128, 128]));

        let tensor = adapter.to_tensor(&source, (224, 224), true).unwrap();
        assert_eq!(tensor.shape(), &[1, 224, 224, 3]);
    }

    #[test]
    fn test_normalize_maps_into_unit_interval() {
        let adapter = ImageAdapter::new();
        let source = ImageSource::from_image(solid_image(4, 4, [0, 128, 255]));

        let tensor = adapter.to_tensor(&source, (4, 4), true).unwrap();
        for &v in tensor.view().iter() {
            assert!((0.0..=1.0).contains(&v), "value {} out of range", v);
        }
        // Plain division, no gamma correction
        assert_eq!(tensor.view()[[0, 0, 0, 2]], 1.0);
        assert_eq!(tensor.view()[[0, 0, 0, 1]], 128.0 / 255.0);
    }

    #[test]
    fn test_unnormalized_keeps_byte_range() {
        let adapter = ImageAdapter::new();
        let source = ImageSource::from_image(solid_image(4, 4, [0, 128, 255]));

        let tensor = adapter.to_tensor(&source, (4, 4), false).unwrap();
        assert_eq!(tensor.view()[[0, 0, 0, 0]], 0.0);
        assert_eq!(tensor.view()[[0, 0, 0, 1]], 128.0);
        assert_eq!(tensor.view()[[0, 0, 0, 2]], 255.0);
    }

    #[test]
    fn test_pixel_buffer_source() {
        let adapter = ImageAdapter::new();
        let rgba = vec![255u8, 0, 0, 255].repeat(6);
        let source = ImageSource::from_rgba(3, 2, rgba);

        let tensor = adapter.to_tensor(&source, (2, 3), false).unwrap();
        assert_eq!(tensor.shape(), &[1, 2, 3, 3]);
        assert_eq!(tensor.view()[[0, 0, 0, 0]], 255.0);
        assert_eq!(tensor.view()[[0, 0, 0, 1]], 0.0);
    }

    #[test]
    fn test_short_pixel_buffer_is_a_decode_error() {
        let adapter = ImageAdapter::new();
        let source = ImageSource::from_rgba(3, 2, vec![0u8; 5]);

        let result = adapter.to_tensor(&source, (2, 3), false);
        assert!(matches!(
            result,
            Err(PerceptError::Source(SourceError::Decode(_)))
        ));
    }

    #[test]
    fn test_tensor_releases_tracker_slot_on_drop() {
        let tracker = MemoryTracker::new();
        let adapter = ImageAdapter::with_tracker(tracker.clone());
        let source = ImageSource::from_image(solid_image(8, 8, [1, 2, 3]));

        let tensor = adapter.to_tensor(&source, (4, 4), true).unwrap();
        assert_eq!(tracker.live_tensors(), 1);

        drop(tensor);
        assert_eq!(tracker.live_tensors(), 0);
    }

    #[test]
    fn test_crop_negative_origin_is_rejected() {
        let adapter = ImageAdapter::new();
        let image = solid_image(100, 100, [0, 0, 0]);

        let result = adapter.crop(&image, -10, 0, 50, 50);
        assert!(matches!(
            result,
            Err(PerceptError::Source(SourceError::InvalidRegion { .. }))
        ));
    }

    #[test]
    fn test_crop_overrun_is_rejected() {
        let adapter = ImageAdapter::new();
        let image = solid_image(100, 100, [0, 0, 0]);

        let result = adapter.crop(&image, 60, 60, 50, 50);
        assert!(matches!(
            result,
            Err(PerceptError::Source(SourceError::InvalidRegion { .. }))
        ));
    }

    #[test]
    fn test_crop_returns_new_image_and_leaves_source() {
        let adapter = ImageAdapter::new();
        let image = solid_image(100, 80, [7, 7, 7]);

        let cropped = adapter.crop(&image, 10, 20, 30, 40).unwrap();
        assert_eq!(cropped.dimensions(), (30, 40));
        assert_eq!(image.dimensions(), (100, 80));
    }

    #[test]
    fn test_resize_is_exact() {
        let adapter = ImageAdapter::new();
        let image = solid_image(100, 80, [5, 5, 5]);

        let resized = adapter.resize(&image, 13, 7);
        assert_eq!(resized.dimensions(), (13, 7));
        assert_eq!(image.dimensions(), (100, 80));
    }

    #[test]
    fn test_data_url_prefix_and_determinism() {
        let adapter = ImageAdapter::new();
        let image = solid_image(16, 16, [200, 100, 50]);

        let a = adapter.to_data_url(&image).unwrap();
        let b = adapter.to_data_url(&image).unwrap();

        assert!(a.starts_with("data:image/jpeg;base64,"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_load_from_bytes_rejects_garbage() {
        let result = load_from_bytes(b"definitely not an image");
        assert!(matches!(
            result,
            Err(PerceptError::Source(SourceError::Decode(_)))
        ));
    }
}
