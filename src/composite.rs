//! Feathered compositing of a repaired crop back into the full image.
//!
//! The repaired crop is pasted onto a copy of the original, then the pasted
//! canvas is blended with the original using a blurred copy of the mask as
//! alpha: `out = alpha * pasted + (1 - alpha) * original`. Where alpha is 0 the
//! output equals the original exactly.

use image::{imageops, GrayImage, RgbImage};

use crate::geometry::Rect;

/// Paste `crop` at `window` and blend it into `original` through a feathered `mask`.
///
/// `mask` is the full-resolution binary mask. It is blurred with a Gaussian
/// of sigma `feather_radius` (no blur when the radius is zero) and used as
/// per-pixel alpha. The caller's image is never modified.
#[must_use]
pub fn feather_composite(
    original: &RgbImage,
    crop: &RgbImage,
    window: Rect,
    mask: &GrayImage,
    feather_radius: f32,
) -> RgbImage {
    let mut canvas = original.clone();
    imageops::replace(&mut canvas, crop, i64::from(window.x1), i64::from(window.y1));

    let alpha = feather(mask, feather_radius);
    blend(&canvas, original, &alpha)
}

/// Blur a binary mask into a graded alpha mask.
#[must_use]
pub fn feather(mask: &GrayImage, radius: f32) -> GrayImage {
    if radius > 0.0 {
        imageops::blur(mask, radius)
    } else {
        mask.clone()
    }
}

/// Per-pixel linear blend of `fg` over `bg` weighted by `alpha` (0..=255).
///
/// Integer arithmetic with rounding keeps pixels where `fg == bg` or
/// `alpha == 0` bit-identical to `bg`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn blend(fg: &RgbImage, bg: &RgbImage, alpha: &GrayImage) -> RgbImage {
    let mut out = bg.clone();
    for ((o, f), a) in out.pixels_mut().zip(fg.pixels()).zip(alpha.pixels()) {
        let a = u32::from(a[0]);
        if a == 0 {
            continue;
        }
        for ch in 0..3 {
            let mixed = (a * u32::from(f[ch]) + (255 - a) * u32::from(o[ch]) + 127) / 255;
            o[ch] = mixed as u8;
        }
    }
    out
}
