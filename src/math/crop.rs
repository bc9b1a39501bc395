//! Cropping of rendered formula pages.
//!
//! Pages come back from the typesetter as full-size rasters with the
//! formula somewhere near the top left corner. Any pixel with non-zero
//! alpha counts as ink.

use image::{RgbaImage, SubImage, imageops};

/// A rectangle inside a page raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    /// Borrow the bounded region of `img` without copying pixels.
    pub fn view<'a>(&self, img: &'a RgbaImage) -> SubImage<&'a RgbaImage> {
        imageops::crop_imm(img, self.x, self.y, self.width, self.height)
    }
}

/// Crop an inline formula, keeping its baseline centred.
///
/// Inline formulas are typeset after a calibration mark in the leftmost
/// column. The vertical midpoint of the mark lies on the maths axis; the
/// crop window is made symmetric around it so that the image lines up
/// with the surrounding text when centred vertically. The mark itself is
/// cut off.
///
/// Returns `None` if the page has no mark or nothing after it.
pub fn crop_inline(img: &RgbaImage) -> Option<Bounds> {
    let (width, height) = img.dimensions();
    if width == 0 {
        return None;
    }

    let y0 = (0..height).find(|&y| is_ink(img, 0, y))?;
    let mut y1 = y0;
    while y1 + 1 < height && is_ink(img, 0, y1 + 1) {
        y1 += 1;
    }
    let y_mid = (y0 + y1) / 2;

    let mut x_min = 0;
    while x_min < width && is_ink(img, x_min, y_mid) {
        x_min += 1;
    }

    let mut y_min = i64::from(first_ink_row(img)?);
    let mut y_max = i64::from(last_ink_row(img)?) + 1;

    let (y0, y1) = (i64::from(y0), i64::from(y1));
    if y0 - y_min > y_max - 1 - y1 {
        y_max = y0 + y1 - y_min + 1;
    } else {
        y_min = y0 + y1 - y_max + 1;
    }
    let y_min = y_min.clamp(0, i64::from(height)) as u32;
    let y_max = y_max.clamp(0, i64::from(height)) as u32;

    while x_min < width && !column_has_ink(img, x_min, y_min, y_max) {
        x_min += 1;
    }
    let mut x_max = width;
    while x_max > x_min && !column_has_ink(img, x_max - 1, y_min, y_max) {
        x_max -= 1;
    }
    if x_min >= x_max {
        return None;
    }

    Some(Bounds {
        x: x_min,
        y: y_min,
        width: x_max - x_min,
        height: y_max - y_min,
    })
}

/// Crop a displayed formula.
///
/// Rows are trimmed to the ink. Columns are trimmed by the same amount on
/// both sides, stopping as soon as either side reaches ink, so that the
/// formula stays horizontally centred.
///
/// Returns `None` for a blank page.
pub fn crop_displayed(img: &RgbaImage) -> Option<Bounds> {
    let width = img.width();
    let y_min = first_ink_row(img)?;
    let y_max = last_ink_row(img)? + 1;

    let (mut x_min, mut x_max) = (0, width);
    while x_min < x_max
        && !column_has_ink(img, x_min, y_min, y_max)
        && !column_has_ink(img, x_max - 1, y_min, y_max)
    {
        x_min += 1;
        x_max -= 1;
    }
    if x_min >= x_max {
        return None;
    }

    Some(Bounds {
        x: x_min,
        y: y_min,
        width: x_max - x_min,
        height: y_max - y_min,
    })
}

fn is_ink(img: &RgbaImage, x: u32, y: u32) -> bool {
    img.get_pixel(x, y)[3] != 0
}

fn row_has_ink(img: &RgbaImage, y: u32) -> bool {
    (0..img.width()).any(|x| is_ink(img, x, y))
}

fn column_has_ink(img: &RgbaImage, x: u32, y_min: u32, y_max: u32) -> bool {
    (y_min..y_max).any(|y| is_ink(img, x, y))
}

fn first_ink_row(img: &RgbaImage) -> Option<u32> {
    (0..img.height()).find(|&y| row_has_ink(img, y))
}

fn last_ink_row(img: &RgbaImage) -> Option<u32> {
    (0..img.height()).rev().find(|&y| row_has_ink(img, y))
}

#[cfg(test)]
mod tests {
    use std::ops::RangeInclusive;

    use image::{GenericImageView, Rgba};

    use super::*;

    const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn fill(img: &mut RgbaImage, xs: RangeInclusive<u32>, ys: RangeInclusive<u32>) {
        for x in xs {
            for y in ys.clone() {
                img.put_pixel(x, y, INK);
            }
        }
    }

    #[test]
    fn test_displayed_keeps_centre() {
        let mut img = RgbaImage::new(50, 20);
        fill(&mut img, 10..=14, 3..=6);
        img.put_pixel(30, 10, INK);

        let bounds = crop_displayed(&img).unwrap();
        assert_eq!(
            bounds,
            Bounds {
                x: 10,
                y: 3,
                width: 30,
                height: 8
            }
        );
    }

    #[test]
    fn test_displayed_is_idempotent() {
        let mut img = RgbaImage::new(50, 20);
        fill(&mut img, 10..=14, 3..=6);
        img.put_pixel(30, 10, INK);

        let cropped = crop_displayed(&img).unwrap().view(&img).to_image();
        let again = crop_displayed(&cropped).unwrap();
        assert_eq!(
            again,
            Bounds {
                x: 0,
                y: 0,
                width: cropped.width(),
                height: cropped.height()
            }
        );
    }

    #[test]
    fn test_inline_centres_on_mark() {
        let mut img = RgbaImage::new(40, 30);
        // calibration mark, rows 10..=14
        fill(&mut img, 0..=2, 10..=14);
        // formula, extending further above the mark than below
        fill(&mut img, 8..=20, 5..=16);

        let bounds = crop_inline(&img).unwrap();
        assert_eq!(
            bounds,
            Bounds {
                x: 8,
                y: 5,
                width: 13,
                height: 15
            }
        );
        // the mark's midpoint is the middle row of the crop
        assert_eq!(bounds.y + bounds.height / 2, 12);
    }

    #[test]
    fn test_inline_extends_downwards() {
        let mut img = RgbaImage::new(40, 30);
        fill(&mut img, 0..=2, 10..=14);
        fill(&mut img, 8..=20, 11..=25);

        let bounds = crop_inline(&img).unwrap();
        assert_eq!((bounds.y, bounds.height), (0, 26));
        assert_eq!(bounds.x, 8);
    }

    #[test]
    fn test_blank_pages() {
        let img = RgbaImage::new(10, 10);
        assert_eq!(crop_displayed(&img), None);
        assert_eq!(crop_inline(&img), None);

        // a mark with nothing after it
        let mut img = RgbaImage::new(10, 10);
        fill(&mut img, 0..=2, 4..=6);
        assert_eq!(crop_inline(&img), None);
    }

    #[test]
    fn test_empty_rasters() {
        for (width, height) in [(0, 5), (5, 0), (0, 0)] {
            let img = RgbaImage::new(width, height);
            assert_eq!(crop_inline(&img), None, "{width}x{height}");
            assert_eq!(crop_displayed(&img), None, "{width}x{height}");
        }
    }

    #[test]
    fn test_view_borrows_region() {
        let mut img = RgbaImage::new(8, 8);
        img.put_pixel(3, 4, INK);
        let bounds = Bounds {
            x: 2,
            y: 3,
            width: 3,
            height: 2,
        };
        let view = bounds.view(&img);
        assert_eq!(view.dimensions(), (3, 2));
        assert_eq!(view.get_pixel(1, 1), INK);
    }
}
