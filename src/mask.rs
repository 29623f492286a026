//! Binary repair mask construction.

use image::{GrayImage, Luma};

use crate::geometry::UserBox;

/// Mask value marking a pixel for repair.
pub const MASK_ON: u8 = 255;

/// Build a `width x height` binary mask from user boxes.
///
/// Each box is grown by `margin` pixels on every side, clamped to the image,
/// and filled with [`MASK_ON`]. The right and bottom box edges are filled
/// too. Overlapping boxes simply union. With no boxes the mask is all zero.
#[must_use]
pub fn build_mask(width: u32, height: u32, boxes: &[UserBox], margin: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);

    for user_box in boxes {
        let Some(rect) = user_box.dilate_clamped(margin, width, height) else {
            tracing::debug!(?user_box, "box lies outside the image, ignored");
            continue;
        };
        for y in rect.y1..rect.y2 {
            for x in rect.x1..rect.x2 {
                mask.put_pixel(x, y, Luma([MASK_ON]));
            }
        }
    }

    mask
}

/// Count the pixels marked for repair.
#[must_use]
pub fn marked_pixels(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p[0] > 0).count()
}
