//! Canvas input and processed output images.
//!
//! A [`CanvasImage`] is the raw RGBA buffer handed over by a drawing surface;
//! it is validated once on construction so the preprocessing steps never see
//! a malformed shape. A [`ProcessedImage`] is the cropped and padded RGB result.

use crate::error::InkMathError;
use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use serde::Serialize;
use std::io::Cursor;

/// Channels per canvas pixel (red, green, blue, alpha)
pub const CHANNELS: usize = 4;

/// An RGBA drawing, 8 bits per channel, origin top-left. Alpha 0 is untouched.
#[derive(Debug, Clone)]
pub struct CanvasImage {
    pixels: RgbaImage,
}

impl CanvasImage {
    /// Build a canvas from a row-major RGBA byte buffer
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, InkMathError> {
        if width == 0 || height == 0 {
            return Err(InkMathError::InvalidImage(format!(
                "canvas must not be empty, got {}x{}",
                width, height
            )));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(CHANNELS))
            .ok_or_else(|| {
                InkMathError::InvalidImage(format!("canvas {}x{} is too large", width, height))
            })?;
        if data.len() != expected {
            return Err(InkMathError::InvalidImage(format!(
                "expected {} bytes for a {}x{} RGBA canvas, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        let pixels = RgbaImage::from_raw(width, height, data).ok_or_else(|| {
            InkMathError::InvalidImage("buffer does not match canvas dimensions".to_string())
        })?;
        Ok(Self { pixels })
    }

    /// Build a canvas from an array shape `[height, width, channels]`, the
    /// layout drawing widgets usually hand out
    pub fn from_shape(shape: &[usize], data: Vec<u8>) -> Result<Self, InkMathError> {
        let [height, width, channels] = shape else {
            return Err(InkMathError::InvalidImage(format!(
                "expected a [height, width, 4] shape, got {:?}",
                shape
            )));
        };
        if *channels != CHANNELS {
            return Err(InkMathError::InvalidImage(format!(
                "canvas must have {} channels (RGBA), got {}",
                CHANNELS, channels
            )));
        }
        let width = u32::try_from(*width)
            .map_err(|_| InkMathError::InvalidImage(format!("width {} is too large", width)))?;
        let height = u32::try_from(*height)
            .map_err(|_| InkMathError::InvalidImage(format!("height {} is too large", height)))?;
        Self::from_raw(width, height, data)
    }

    pub fn from_rgba(pixels: RgbaImage) -> Result<Self, InkMathError> {
        let (width, height) = pixels.dimensions();
        Self::from_raw(width, height, pixels.into_raw())
    }

    /// Accept a decoded image only if it carries an alpha channel
    pub fn from_dynamic(image: DynamicImage) -> Result<Self, InkMathError> {
        if !image.color().has_alpha() {
            return Err(InkMathError::InvalidImage(format!(
                "canvas must have an alpha channel, got {:?}",
                image.color()
            )));
        }
        Self::from_rgba(image.into_rgba8())
    }

    /// Decode an encoded image (PNG, WebP, ...) with an alpha channel
    pub fn decode(bytes: &[u8]) -> Result<Self, InkMathError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| InkMathError::InvalidImage(format!("Failed to decode canvas: {}", e)))?;
        Self::from_dynamic(image)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// Axis-aligned rectangle around the drawn pixels, in source coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InkBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Cropped, white-bordered RGB drawing ready for recognition
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    image: RgbImage,
    ink_box: InkBox,
}

impl ProcessedImage {
    pub(crate) fn new(image: RgbImage, ink_box: InkBox) -> Self {
        Self { image, ink_box }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Where the ink was found on the original canvas
    pub fn ink_box(&self) -> InkBox {
        self.ink_box
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn to_png(&self) -> Result<Vec<u8>, InkMathError> {
        encode_png(&self.image)
    }

    /// Re-enter the image as an opaque canvas
    pub fn to_canvas(&self) -> Result<CanvasImage, InkMathError> {
        CanvasImage::from_rgba(DynamicImage::ImageRgb8(self.image.clone()).into_rgba8())
    }
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, InkMathError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| InkMathError::Internal(format!("Failed to encode PNG: {}", e)))?;
    Ok(buffer.into_inner())
}
