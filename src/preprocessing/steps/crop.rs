use crate::canvas::InkBox;
use image::{imageops, RgbImage};

pub fn apply(image: &RgbImage, ink_box: InkBox) -> RgbImage {
    imageops::crop_imm(image, ink_box.x, ink_box.y, ink_box.width, ink_box.height).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_crop_to_box() {
        let mut image = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));
        image.put_pixel(2, 3, Rgb([1, 2, 3]));
        let ink_box = InkBox {
            x: 2,
            y: 3,
            width: 4,
            height: 2,
        };
        let out = apply(&image, ink_box);
        assert_eq!(out.dimensions(), (4, 2));
        assert_eq!(out.get_pixel(0, 0), &Rgb([1, 2, 3]));
    }
}
