use crate::error::InkMathError;
use image::{imageops, Rgb, RgbImage};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Surround the image with a uniform white border of `border` pixels
pub fn apply(image: &RgbImage, border: u32) -> Result<RgbImage, InkMathError> {
    let grow = |side: u32| {
        border
            .checked_mul(2)
            .and_then(|b| side.checked_add(b))
            .ok_or_else(|| {
                InkMathError::Preprocessing(format!("border of {}px is too large", border))
            })
    };
    let mut out = RgbImage::from_pixel(grow(image.width())?, grow(image.height())?, WHITE);
    imageops::replace(&mut out, image, i64::from(border), i64::from(border));
    Ok(out)
}
