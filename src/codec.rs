//! Codec adapter: a uniform encode/decode seam over per-format codecs.
//!
//! Every format answers the same contract — encode pixels at a 1–100
//! quality setting, decode bytes back into pixels — but the quality
//! parameter means different things per format. [`QualityScale`] makes that
//! difference explicit so the quality search can adapt its step granularity
//! instead of assuming a continuous lossy knob everywhere.
//!
//! Backends: the `image` crate for JPEG/PNG/GIF and general decoding,
//! libwebp (via the `webp` crate) for lossy WebP, and `ravif` (rav1e) for
//! AVIF. None of them touch disk or network; buffers in, buffers out.

use std::io::Cursor;

use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, Frame, ImageFormat, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::{ColorMode, DecodedImage};

/// Output formats supported by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// Lossy DCT codec; quality is a continuous fidelity parameter.
    Jpeg,
    /// Lossless; quality maps to compression effort.
    Png,
    /// Palette-based; quality maps to quantizer effort.
    Gif,
    /// Lossy WebP via libwebp.
    WebP,
    /// AV1 still image via rav1e.
    Avif,
}

impl CodecKind {
    /// Stable identifier used in errors and reports.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
            Self::Avif => "avif",
        }
    }

    /// Canonical file extension for this format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
            Self::Avif => "avif",
        }
    }

    /// Parse a format from a file extension or format name (case-insensitive).
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::WebP),
            "avif" => Some(Self::Avif),
            _ => None,
        }
    }

    /// How this format interprets its quality parameter.
    #[must_use]
    pub fn scale(self) -> QualityScale {
        match self {
            Self::Jpeg | Self::WebP | Self::Avif => QualityScale::Lossy { min: 1, max: 100 },
            Self::Png => QualityScale::Effort {
                levels: PNG_EFFORT_LEVELS,
            },
            Self::Gif => QualityScale::Palette {
                steps: GIF_SPEED_STEPS,
            },
        }
    }
}

/// Representative qualities for the three PNG compression efforts
/// (Fast, Default, Best).
const PNG_EFFORT_LEVELS: &[u8] = &[20, 60, 95];

/// Distinct GIF quantizer speeds (libimagequant-style 1..=30 scale).
const GIF_SPEED_STEPS: u8 = 30;

/// How a codec's quality parameter behaves.
///
/// Lossy codecs expose a continuous fidelity trade-off over the full range.
/// PNG only varies compression effort and GIF only varies palette/dither
/// effort, so both collapse the 1–100 range onto a few distinct settings;
/// [`QualityScale::snap`] maps a probe onto the nearest setting so the
/// search never spends trials on qualities that encode identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityScale {
    /// Continuous lossy parameter over an inclusive range.
    Lossy {
        /// Lowest meaningful quality.
        min: u8,
        /// Highest meaningful quality.
        max: u8,
    },
    /// Stepped lossless effort; `levels` are the representative qualities.
    Effort {
        /// Representative quality per effort level, ascending.
        levels: &'static [u8],
    },
    /// Palette/dither effort with a fixed number of distinct settings.
    Palette {
        /// Number of distinct quantizer settings.
        steps: u8,
    },
}

impl QualityScale {
    /// Snap a probe quality onto the nearest representative setting.
    ///
    /// Idempotent: `snap(snap(q)) == snap(q)`.
    #[must_use]
    pub fn snap(&self, quality: u8) -> u8 {
        let quality = quality.clamp(1, 100);
        match self {
            Self::Lossy { min, max } => quality.clamp(*min, *max),
            Self::Effort { levels } => levels
                .iter()
                .copied()
                .min_by_key(|&level| {
                    let dist = (i16::from(level) - i16::from(quality)).abs();
                    // Ties prefer the higher level.
                    (dist, std::cmp::Reverse(level))
                })
                .unwrap_or(quality),
            Self::Palette { .. } => quality_for_gif_speed(gif_speed(quality)),
        }
    }

    /// Number of distinct encodings this scale can produce.
    #[must_use]
    pub fn distinct_settings(&self) -> u32 {
        match self {
            Self::Lossy { min, max } => u32::from(max.saturating_sub(*min)) + 1,
            Self::Effort { levels } => levels.len() as u32,
            Self::Palette { steps } => u32::from(*steps),
        }
    }

    /// Whether quality trades visual fidelity for size (rather than effort).
    ///
    /// Effort and palette scales have bounded size reduction, so callers
    /// should expect the resolution fallback to carry more of the work.
    #[must_use]
    pub fn is_lossy(&self) -> bool {
        matches!(self, Self::Lossy { .. })
    }
}

/// Map a 1–100 quality to a GIF quantizer speed (1 = best palette, 30 = fastest).
fn gif_speed(quality: u8) -> i32 {
    let q = i32::from(quality.clamp(1, 100));
    let step = ((f64::from(q - 1) * 29.0) / 99.0).round() as i32;
    30 - step
}

/// Inverse of [`gif_speed`]: the canonical quality for a speed setting.
fn quality_for_gif_speed(speed: i32) -> u8 {
    let s = speed.clamp(1, 30);
    1 + ((f64::from(30 - s) * 99.0) / 29.0).round() as u8
}

/// Encode `image` into `kind` at `quality` (1–100).
///
/// Quality semantics are per-format: fidelity for JPEG/WebP/AVIF,
/// compression effort for PNG, quantizer effort for GIF. The returned
/// buffer is the only side effect.
pub fn encode(image: &DecodedImage, kind: CodecKind, quality: u8) -> Result<Vec<u8>> {
    let quality = quality.clamp(1, 100);
    match kind {
        CodecKind::Jpeg => encode_jpeg(image, quality),
        CodecKind::Png => encode_png(image, quality),
        CodecKind::Gif => encode_gif(image, quality),
        CodecKind::WebP => encode_webp(image, quality),
        CodecKind::Avif => encode_avif(image, quality),
    }
}

/// Decode encoded bytes into a [`DecodedImage`].
///
/// The format is sniffed from the bytes. AVIF payloads are recognized but
/// cannot be decoded with this adapter's stack and report
/// [`Error::UnsupportedFormat`]; malformed input reports [`Error::Decode`].
pub fn decode(data: &[u8]) -> Result<DecodedImage> {
    let format = image::guess_format(data).map_err(|e| Error::Decode {
        codec: "sniff".to_string(),
        message: e.to_string(),
    })?;
    if format == ImageFormat::Avif {
        return Err(Error::UnsupportedFormat(
            "avif decoding is not supported".to_string(),
        ));
    }
    let img = image::load_from_memory_with_format(data, format).map_err(|e| Error::Decode {
        codec: format.to_mime_type().to_string(),
        message: e.to_string(),
    })?;
    Ok(DecodedImage::from_dynamic(img))
}

fn encode_jpeg(image: &DecodedImage, quality: u8) -> Result<Vec<u8>> {
    // JPEG carries no alpha channel; composite onto white first.
    let flat = flatten_alpha(image);
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut out), quality);
    flat.write_with_encoder(encoder).map_err(|e| Error::Encode {
        codec: CodecKind::Jpeg.id().to_string(),
        message: e.to_string(),
    })?;
    Ok(out)
}

fn encode_png(image: &DecodedImage, quality: u8) -> Result<Vec<u8>> {
    let compression = match quality {
        0..=40 => CompressionType::Fast,
        41..=80 => CompressionType::Default,
        _ => CompressionType::Best,
    };
    let mut out = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(Cursor::new(&mut out), compression, PngFilter::Adaptive);
    image
        .to_dynamic()
        .write_with_encoder(encoder)
        .map_err(|e| Error::Encode {
            codec: CodecKind::Png.id().to_string(),
            message: e.to_string(),
        })?;
    Ok(out)
}

fn encode_gif(image: &DecodedImage, quality: u8) -> Result<Vec<u8>> {
    let rgba = RgbaImage::from_raw(image.width(), image.height(), image.to_rgba8_vec())
        .ok_or_else(|| Error::Encode {
            codec: CodecKind::Gif.id().to_string(),
            message: "pixel buffer does not match dimensions".to_string(),
        })?;
    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(Cursor::new(&mut out), gif_speed(quality));
        encoder
            .encode_frame(Frame::new(rgba))
            .map_err(|e| Error::Encode {
                codec: CodecKind::Gif.id().to_string(),
                message: e.to_string(),
            })?;
    }
    Ok(out)
}

fn encode_webp(image: &DecodedImage, quality: u8) -> Result<Vec<u8>> {
    let (width, height) = (image.width(), image.height());
    // libwebp accepts RGB or RGBA; grayscale is widened.
    let out = match image.mode() {
        ColorMode::Rgba8 => {
            let rgba = image.to_rgba8_vec();
            webp::Encoder::from_rgba(&rgba, width, height)
                .encode(f32::from(quality))
                .to_vec()
        }
        ColorMode::Gray8 | ColorMode::Rgb8 => {
            let rgb = image.to_rgb8_vec();
            webp::Encoder::from_rgb(&rgb, width, height)
                .encode(f32::from(quality))
                .to_vec()
        }
    };
    Ok(out)
}

fn encode_avif(image: &DecodedImage, quality: u8) -> Result<Vec<u8>> {
    use imgref::Img;
    use ravif::Encoder;
    use rgb::RGBA8;

    let rgba = image.to_rgba8_vec();
    let pixels: Vec<RGBA8> = rgba
        .chunks_exact(4)
        .map(|c| RGBA8::new(c[0], c[1], c[2], c[3]))
        .collect();
    let img = Img::new(
        pixels.as_slice(),
        image.width() as usize,
        image.height() as usize,
    );

    let encoded = Encoder::new()
        .with_quality(f32::from(quality))
        .with_speed(6)
        .encode_rgba(img)
        .map_err(|e| Error::Encode {
            codec: CodecKind::Avif.id().to_string(),
            message: e.to_string(),
        })?;
    Ok(encoded.avif_file)
}

/// Composite alpha onto a white background for formats without alpha.
fn flatten_alpha(image: &DecodedImage) -> DynamicImage {
    match image.mode() {
        ColorMode::Rgba8 => {
            let mut rgb = Vec::with_capacity(image.width() as usize * image.height() as usize * 3);
            for px in image.pixels().chunks_exact(4) {
                let a = u16::from(px[3]);
                for &c in &px[..3] {
                    rgb.push(((u16::from(c) * a + 255 * (255 - a)) / 255) as u8);
                }
            }
            RgbImage::from_raw(image.width(), image.height(), rgb)
                .map(DynamicImage::ImageRgb8)
                .expect("buffer length matches dimensions")
        }
        ColorMode::Gray8 | ColorMode::Rgb8 => image.to_dynamic(),
    }
}
