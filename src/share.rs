//! QR share code for the final report.
//!
//! The report's UTF-8 bytes go into a single byte-mode segment at medium
//! error correction, in the smallest symbol version that holds them. Byte
//! mode is forced so a scanner hands back exactly the bytes we put in.
//!
//! Rasterized by hand at a fixed module scale with the standard 4-module
//! quiet zone, then exported as grayscale PNG, a data URI, or SVG.

use std::path::Path;

use base64::Engine;
use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Luma};
use qrcode::bits::Bits;
use qrcode::render::svg;
use qrcode::types::QrError;
use qrcode::{Color, EcLevel, QrCode, Version};

/// Error correction level for share codes.
pub const ERROR_CORRECTION: EcLevel = EcLevel::M;
/// Pixels per module; keeps dense symbols legible to phone cameras.
pub const MODULE_SCALE: u32 = 8;
/// Light border around the symbol, in modules.
pub const QUIET_ZONE_MODULES: u32 = 4;

const DARK: u8 = 0;
const LIGHT: u8 = 255;

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("The report is too long to share as a QR code ({bytes} bytes)")]
    PayloadTooLarge { bytes: usize },

    #[error("QR code generation failed: {0}")]
    Symbol(String),

    #[error("Share image could not be produced: {0}")]
    Image(String),

    #[error("Share image could not be saved: {0}")]
    Io(#[from] std::io::Error),
}

// ═══════════════════════════════════════════════════════════
// RasterImage
// ═══════════════════════════════════════════════════════════

/// 8-bit grayscale bitmap of a QR symbol (0 = dark, 255 = light).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    version: i16,
}

impl RasterImage {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// QR symbol version (1..=40).
    pub fn version(&self) -> i16 {
        self.version
    }

    /// Row-major pixel data.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Gray level at `(x, y)`; `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y as usize * self.width as usize + x as usize).copied()
    }

    /// Encode as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, EncodeError> {
        let buffer: ImageBuffer<Luma<u8>, Vec<u8>> =
            ImageBuffer::from_raw(self.width, self.height, self.pixels.clone())
                .ok_or_else(|| EncodeError::Image("pixel buffer does not match dimensions".into()))?;

        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(buffer)
            .write_to(&mut bytes, ImageOutputFormat::Png)
            .map_err(|e| EncodeError::Image(e.to_string()))?;
        Ok(bytes)
    }

    /// `data:image/png;base64,...` for inline display.
    pub fn to_data_uri(&self) -> Result<String, EncodeError> {
        let png = self.to_png()?;
        Ok(format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png)
        ))
    }

    /// Write the PNG to `path`, creating parent directories.
    pub fn save_png(&self, path: &Path) -> Result<(), EncodeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_png()?)?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// Encoding
// ═══════════════════════════════════════════════════════════

/// Build the smallest byte-mode symbol that holds `text`.
fn build_symbol(text: &str) -> Result<QrCode, EncodeError> {
    let data = text.as_bytes();
    for v in 1..=40 {
        match symbol_at(data, Version::Normal(v)) {
            Ok(code) => return Ok(code),
            Err(QrError::DataTooLong) => continue,
            Err(e) => return Err(EncodeError::Symbol(e.to_string())),
        }
    }
    Err(EncodeError::PayloadTooLarge { bytes: data.len() })
}

fn symbol_at(data: &[u8], version: Version) -> Result<QrCode, QrError> {
    let mut bits = Bits::new(version);
    bits.push_byte_data(data)?;
    bits.push_terminator(ERROR_CORRECTION)?;
    QrCode::with_bits(bits, ERROR_CORRECTION)
}

fn version_number(version: Version) -> i16 {
    match version {
        Version::Normal(v) | Version::Micro(v) => v,
    }
}

/// Encode `text` as a QR code bitmap.
pub fn encode(text: &str) -> Result<RasterImage, EncodeError> {
    let code = build_symbol(text)?;
    let modules = code.width() as u32;
    let colors = code.to_colors();

    let side = (modules + 2 * QUIET_ZONE_MODULES) * MODULE_SCALE;
    let mut pixels = vec![LIGHT; (side * side) as usize];

    for (i, color) in colors.iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let mx = i as u32 % modules + QUIET_ZONE_MODULES;
        let my = i as u32 / modules + QUIET_ZONE_MODULES;
        for dy in 0..MODULE_SCALE {
            let row = ((my * MODULE_SCALE + dy) * side) as usize;
            let start = row + (mx * MODULE_SCALE) as usize;
            pixels[start..start + MODULE_SCALE as usize].fill(DARK);
        }
    }

    let version = version_number(code.version());
    tracing::debug!(bytes = text.len(), version, side, "Encoded share code");

    Ok(RasterImage {
        width: side,
        height: side,
        pixels,
        version,
    })
}

/// Same symbol rendered as an SVG string.
pub fn encode_svg(text: &str) -> Result<String, EncodeError> {
    let code = build_symbol(text)?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .dark_color(svg::Color("#1c1917"))
        .light_color(svg::Color("#ffffff"))
        .quiet_zone(true)
        .build())
}
