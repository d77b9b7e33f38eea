//! Decoded image representation shared by the codec adapter and the search.
//!
//! A [`DecodedImage`] is plain pixels plus dimensions and layout. It carries
//! no compression state and is only ever borrowed by the core; the caller
//! (or [`crate::codec::decode`]) owns it.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

/// Pixel layout of a [`DecodedImage`] buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorMode {
    /// 8-bit grayscale, one byte per pixel.
    Gray8,
    /// 8-bit RGB, three bytes per pixel.
    Rgb8,
    /// 8-bit RGBA, four bytes per pixel.
    Rgba8,
}

impl ColorMode {
    /// Bytes per pixel for this layout.
    #[must_use]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
        }
    }
}

/// A decoded raster image: raw pixels in row-major order.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    mode: ColorMode,
}

impl DecodedImage {
    /// Create an image from a raw pixel buffer.
    ///
    /// Returns `None` if either dimension is zero or the buffer length does
    /// not equal `width * height * mode.bytes_per_pixel()`.
    #[must_use]
    pub fn from_raw(pixels: Vec<u8>, width: u32, height: u32, mode: ColorMode) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let expected = width as usize * height as usize * mode.bytes_per_pixel();
        if pixels.len() != expected {
            return None;
        }
        Some(Self {
            pixels,
            width,
            height,
            mode,
        })
    }

    /// Image width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout of the buffer.
    #[must_use]
    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    /// Raw pixel bytes in row-major order.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Uncompressed buffer size in bytes.
    ///
    /// Reported as `size_before` by [`crate::compress`], since the core
    /// never sees the source file.
    #[must_use]
    pub fn raw_size(&self) -> u64 {
        self.pixels.len() as u64
    }

    /// Convert to a packed RGB8 buffer, dropping alpha and widening grayscale.
    #[must_use]
    pub fn to_rgb8_vec(&self) -> Vec<u8> {
        match self.mode {
            ColorMode::Rgb8 => self.pixels.clone(),
            ColorMode::Gray8 => self.pixels.iter().flat_map(|&g| [g, g, g]).collect(),
            ColorMode::Rgba8 => {
                let mut rgb = Vec::with_capacity(self.width as usize * self.height as usize * 3);
                for px in self.pixels.chunks_exact(4) {
                    rgb.extend_from_slice(&px[..3]);
                }
                rgb
            }
        }
    }

    /// Convert to a packed RGBA8 buffer, with alpha 255 where absent.
    #[must_use]
    pub fn to_rgba8_vec(&self) -> Vec<u8> {
        match self.mode {
            ColorMode::Rgba8 => self.pixels.clone(),
            ColorMode::Gray8 => self.pixels.iter().flat_map(|&g| [g, g, g, 255]).collect(),
            ColorMode::Rgb8 => {
                let mut rgba = Vec::with_capacity(self.width as usize * self.height as usize * 4);
                for px in self.pixels.chunks_exact(3) {
                    rgba.extend_from_slice(px);
                    rgba.push(255);
                }
                rgba
            }
        }
    }

    /// Shrink both dimensions by `factor`, rounding to the nearest pixel and
    /// never below 1. Aspect ratio is preserved up to rounding; resampling is
    /// Lanczos3.
    #[must_use]
    pub fn downscale(&self, factor: f64) -> Self {
        let new_width = scaled_dimension(self.width, factor);
        let new_height = scaled_dimension(self.height, factor);
        let resized = self
            .to_dynamic()
            .resize_exact(new_width, new_height, FilterType::Lanczos3);
        Self::from_dynamic(resized)
    }

    pub(crate) fn to_dynamic(&self) -> DynamicImage {
        let (w, h) = (self.width, self.height);
        match self.mode {
            ColorMode::Gray8 => {
                GrayImage::from_raw(w, h, self.pixels.clone()).map(DynamicImage::ImageLuma8)
            }
            ColorMode::Rgb8 => {
                RgbImage::from_raw(w, h, self.pixels.clone()).map(DynamicImage::ImageRgb8)
            }
            ColorMode::Rgba8 => {
                RgbaImage::from_raw(w, h, self.pixels.clone()).map(DynamicImage::ImageRgba8)
            }
        }
        .expect("buffer length is checked at construction")
    }

    pub(crate) fn from_dynamic(img: DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        match img {
            DynamicImage::ImageLuma8(buf) => Self {
                pixels: buf.into_raw(),
                width,
                height,
                mode: ColorMode::Gray8,
            },
            DynamicImage::ImageRgb8(buf) => Self {
                pixels: buf.into_raw(),
                width,
                height,
                mode: ColorMode::Rgb8,
            },
            DynamicImage::ImageRgba8(buf) => Self {
                pixels: buf.into_raw(),
                width,
                height,
                mode: ColorMode::Rgba8,
            },
            // 16-bit and float layouts are narrowed to 8 bits per channel.
            other => {
                if other.color().has_alpha() {
                    Self {
                        pixels: other.to_rgba8().into_raw(),
                        width,
                        height,
                        mode: ColorMode::Rgba8,
                    }
                } else {
                    Self {
                        pixels: other.to_rgb8().into_raw(),
                        width,
                        height,
                        mode: ColorMode::Rgb8,
                    }
                }
            }
        }
    }
}

/// Round a dimension scaled by `factor` to the nearest pixel, floor 1.
pub(crate) fn scaled_dimension(dim: u32, factor: f64) -> u32 {
    let scaled = (f64::from(dim) * factor).round() as u32;
    scaled.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_image(width: u32, height: u32) -> DecodedImage {
        let pixels: Vec<u8> = (0..width as usize * height as usize)
            .map(|i| (i % 256) as u8)
            .collect();
        DecodedImage::from_raw(pixels, width, height, ColorMode::Gray8).unwrap()
    }

    #[test]
    fn test_from_raw_rejects_bad_length() {
        assert!(DecodedImage::from_raw(vec![0u8; 11], 2, 2, ColorMode::Rgb8).is_none());
        assert!(DecodedImage::from_raw(vec![0u8; 12], 2, 2, ColorMode::Rgb8).is_some());
    }

    #[test]
    fn test_from_raw_rejects_zero_dimension() {
        assert!(DecodedImage::from_raw(Vec::new(), 0, 4, ColorMode::Gray8).is_none());
    }

    #[test]
    fn test_rgb_conversions() {
        let img = DecodedImage::from_raw(vec![7, 8, 9, 100], 2, 2, ColorMode::Gray8).unwrap();
        assert_eq!(img.to_rgb8_vec(), vec![7, 7, 7, 8, 8, 8, 9, 9, 9, 100, 100, 100]);
        assert_eq!(img.to_rgba8_vec()[3], 255);

        let rgba =
            DecodedImage::from_raw(vec![1, 2, 3, 4, 5, 6, 7, 8], 2, 1, ColorMode::Rgba8).unwrap();
        assert_eq!(rgba.to_rgb8_vec(), vec![1, 2, 3, 5, 6, 7]);
    }

    #[test]
    fn test_downscale_rounds_and_floors() {
        let img = gray_image(64, 10);
        let small = img.downscale(0.7);
        assert_eq!(small.width(), 45); // 44.8 rounds up
        assert_eq!(small.height(), 7);
        assert_eq!(small.mode(), ColorMode::Gray8);

        let tiny = gray_image(2, 2).downscale(0.1);
        assert_eq!((tiny.width(), tiny.height()), (1, 1));
    }

    #[test]
    fn test_raw_size() {
        let img = gray_image(8, 4);
        assert_eq!(img.raw_size(), 32);
    }
}
