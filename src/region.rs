//! Crop window selection around the repair mask.
//!
//! The model only sees a crop of the image. The crop is centred on the mask
//! and grown so that enough undamaged context surrounds it; very tight
//! selections still get a minimum border.

use image::GrayImage;

use crate::geometry::Rect;

/// Tight bounding box of all non-zero mask pixels.
///
/// Returns `None` for an empty selection, which means there is nothing to repair.
#[must_use]
pub fn bounding_box(mask: &GrayImage) -> Option<Rect> {
    let mut bbox: Option<Rect> = None;

    for (y, row) in mask.rows().enumerate() {
        let mut first = None;
        let mut last = 0;
        for (x, px) in row.enumerate() {
            if px[0] > 0 {
                if first.is_none() {
                    first = Some(x);
                }
                last = x;
            }
        }
        let Some(first) = first else { continue };

        #[allow(clippy::cast_possible_truncation)]
        let row_rect = Rect::new(first as u32, y as u32, last as u32 + 1, y as u32 + 1);
        bbox = Some(bbox.map_or(row_rect, |b| b.union(&row_rect)));
    }

    bbox
}

/// Grow `tight` into a context window clamped to a `width x height` image.
///
/// Per axis the new extent is `max(extent * multiplier, extent + min_margin)`,
/// centred on the tight box. The window always contains `tight` and never
/// leaves the image.
#[must_use]
pub fn crop_window(
    tight: Rect,
    width: u32,
    height: u32,
    multiplier: f32,
    min_margin: u32,
) -> Rect {
    let (x1, x2) = expand_axis(tight.x1, tight.x2, width, multiplier, min_margin);
    let (y1, y2) = expand_axis(tight.y1, tight.y2, height, multiplier, min_margin);
    Rect::new(x1, y1, x2, y2)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn expand_axis(lo: u32, hi: u32, limit: u32, multiplier: f32, min_margin: u32) -> (u32, u32) {
    let extent = f64::from(hi - lo);
    let center = (f64::from(lo) + f64::from(hi)) / 2.0;
    let grown = (extent * f64::from(multiplier)).max(extent + f64::from(min_margin));

    let start = (center - grown / 2.0).trunc().max(0.0);
    let end = (center + grown / 2.0).trunc().min(f64::from(limit));

    // Guard against float drift leaving the tight edges uncovered.
    ((start as u32).min(lo), (end as u32).max(hi).min(limit))
}
