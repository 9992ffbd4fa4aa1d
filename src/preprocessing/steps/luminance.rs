use image::{imageops, GrayImage, RgbImage};

/// Single-channel luminance, inverted so that ink is bright and paper is zero
pub fn apply(image: &RgbImage) -> GrayImage {
    let mut gray = imageops::grayscale(image);
    imageops::invert(&mut gray);
    gray
}
