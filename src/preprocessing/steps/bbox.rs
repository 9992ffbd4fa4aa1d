use crate::canvas::InkBox;
use image::GrayImage;

/// Tightest rectangle enclosing every nonzero pixel, `None` for a blank image
pub fn apply(ink: &GrayImage) -> Option<InkBox> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in ink.enumerate_pixels() {
        if pixel.0[0] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((left, top, right, bottom)) => {
                (left.min(x), top.min(y), right.max(x), bottom.max(y))
            }
        });
    }
    bounds.map(|(left, top, right, bottom)| InkBox {
        x: left,
        y: top,
        width: right - left + 1,
        height: bottom - top + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_blank_image_has_no_box() {
        assert_eq!(apply(&GrayImage::new(10, 10)), None);
    }

    #[test]
    fn test_single_pixel() {
        let mut ink = GrayImage::new(10, 10);
        ink.put_pixel(4, 7, Luma([1]));
        assert_eq!(
            apply(&ink),
            Some(InkBox {
                x: 4,
                y: 7,
                width: 1,
                height: 1
            })
        );
    }

    #[test]
    fn test_encloses_all_strokes() {
        let mut ink = GrayImage::new(20, 10);
        ink.put_pixel(3, 5, Luma([200]));
        ink.put_pixel(15, 2, Luma([90]));
        ink.put_pixel(8, 9, Luma([255]));
        assert_eq!(
            apply(&ink),
            Some(InkBox {
                x: 3,
                y: 2,
                width: 13,
                height: 8
            })
        );
    }
}
