//! Unsharp-mask sharpening of the fused crop.

use image::{imageops, RgbImage};

use crate::config::SharpenConfig;

/// Apply an unsharp mask to `image`.
///
/// The image is blurred with a Gaussian of sigma `radius`. Each channel whose
/// difference from the blur exceeds `threshold` is pushed away from the blur
/// by `amount_percent` of that difference. Flat regions stay untouched, so
/// noise is not amplified.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn unsharp_mask(image: &RgbImage, params: &SharpenConfig) -> RgbImage {
    if params.radius <= 0.0 || params.amount_percent <= 0.0 {
        return image.clone();
    }

    let blurred = imageops::blur(image, params.radius);
    let amount = params.amount_percent / 100.0;
    let threshold = i16::from(params.threshold);

    let mut out = blurred;
    for (o, src) in out.pixels_mut().zip(image.pixels()) {
        for ch in 0..3 {
            let diff = i16::from(src[ch]) - i16::from(o[ch]);
            o[ch] = if diff.abs() > threshold {
                let boosted = f32::from(src[ch]) + f32::from(diff) * amount;
                boosted.round().clamp(0.0, 255.0) as u8
            } else {
                src[ch]
            };
        }
    }

    out
}
