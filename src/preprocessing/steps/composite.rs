use image::{Rgb, RgbImage, RgbaImage};

/// Blend the canvas over an opaque white background using alpha as the mask
pub fn apply(canvas: &RgbaImage) -> RgbImage {
    let (width, height) = canvas.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = canvas.get_pixel(x, y).0;
        Rgb([blend(r, a), blend(g, a), blend(b, a)])
    })
}

/// `c * a + 255 * (1 - a)`, rounded
fn blend(channel: u8, alpha: u8) -> u8 {
    let (c, a) = (u32::from(channel), u32::from(alpha));
    let value = (c * a + 255 * (255 - a) + 127) / 255;
    value.min(255) as u8
}
