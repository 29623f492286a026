//! Mirror test-time augmentation.
//!
//! Inpainting models are not mirror-invariant. Running the crop once as-is and
//! once flipped left-right, then averaging, cancels direction-dependent
//! artifacts and smooths the fill.

use image::imageops;
use image::{GrayImage, RgbImage};

use crate::error::{Error, Result};
use crate::inference::{run_inference, InpaintModel};

/// Inpaint `crop` twice (original and mirrored) and average the results.
///
/// Pass B mirrors both crop and mask, runs the model and mirrors its output
/// back. If either pass fails the whole fusion fails. With the `parallel`
/// feature the two passes run concurrently.
///
/// # Errors
///
/// Propagates any error from [`run_inference`].
pub fn fuse_mirrored<M>(model: &M, crop: &RgbImage, mask: &GrayImage, modulus: u32) -> Result<RgbImage>
where
    M: InpaintModel + ?Sized,
{
    let pass_a = || run_inference(model, crop, mask, modulus);
    let pass_b = || {
        let flipped_crop = imageops::flip_horizontal(crop);
        let flipped_mask = imageops::flip_horizontal(mask);
        run_inference(model, &flipped_crop, &flipped_mask, modulus)
            .map(|out| imageops::flip_horizontal(&out))
    };

    #[cfg(feature = "parallel")]
    let (a, b) = rayon::join(pass_a, pass_b);
    #[cfg(not(feature = "parallel"))]
    let (a, b) = (pass_a(), pass_b());

    average(&a?, &b?)
}

/// Pixel-wise mean of two equally sized images, truncated to 8 bits.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the images differ in size.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn average(a: &RgbImage, b: &RgbImage) -> Result<RgbImage> {
    if a.dimensions() != b.dimensions() {
        return Err(Error::ShapeMismatch {
            expected: format!("{:?}", a.dimensions()),
            actual: format!("{:?}", b.dimensions()),
        });
    }

    let mut out = RgbImage::new(a.width(), a.height());
    for ((o, pa), pb) in out.pixels_mut().zip(a.pixels()).zip(b.pixels()) {
        for ch in 0..3 {
            let mean = (f32::from(pa[ch]) + f32::from(pb[ch])) / 2.0;
            o[ch] = mean.clamp(0.0, 255.0) as u8;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxedError;
    use ndarray::{Array4, ArrayView4};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Paints every masked pixel with a ramp running left to right, which is
    /// deliberately not mirror-invariant.
    struct RampFill;

    impl InpaintModel for RampFill {
        #[allow(clippy::cast_precision_loss)]
        fn infer(
            &self,
            image: ArrayView4<'_, f32>,
            mask: ArrayView4<'_, f32>,
        ) -> std::result::Result<Array4<f32>, BoxedError> {
            let mut out = image.to_owned();
            let w = image.dim().3;
            for ((_, ch, y, x), v) in out.indexed_iter_mut() {
                if mask[[0, 0, y, x]] > 0.0 {
                    *v = if ch == 0 { x as f32 / w as f32 } else { 0.5 };
                }
            }
            Ok(out)
        }
    }

    struct FailOnSecondCall(AtomicUsize);

    impl InpaintModel for FailOnSecondCall {
        fn infer(
            &self,
            image: ArrayView4<'_, f32>,
            _mask: ArrayView4<'_, f32>,
        ) -> std::result::Result<Array4<f32>, BoxedError> {
            if self.0.fetch_add(1, Ordering::SeqCst) == 1 {
                return Err("accelerator lost".into());
            }
            Ok(image.to_owned())
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn scene(width: u32, height: u32) -> (RgbImage, GrayImage) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 9 % 256) as u8, (y * 5 % 256) as u8, 40])
        });
        let mask = GrayImage::from_fn(width, height, |x, y| {
            image::Luma([if (4..12).contains(&x) && (3..9).contains(&y) { 255 } else { 0 }])
        });
        (img, mask)
    }

    #[test]
    fn average_rounds_down() {
        let a = RgbImage::from_pixel(2, 2, image::Rgb([10, 0, 255]));
        let b = RgbImage::from_pixel(2, 2, image::Rgb([13, 1, 255]));
        let avg = average(&a, &b).unwrap();
        assert!(avg.pixels().all(|p| p.0 == [11, 0, 255]));
    }

    #[test]
    fn average_rejects_size_mismatch() {
        let a = RgbImage::new(2, 2);
        let b = RgbImage::new(3, 2);
        assert!(average(&a, &b).is_err());
    }

    #[test]
    fn unmasked_pixels_survive_fusion() {
        let (img, mask) = scene(16, 12);
        let fused = fuse_mirrored(&RampFill, &img, &mask, 8).unwrap();
        for (x, y, p) in fused.enumerate_pixels() {
            if mask.get_pixel(x, y)[0] == 0 {
                assert_eq!(p, img.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn fusion_is_mirror_symmetric() {
        let (img, mask) = scene(16, 12);
        let fused = fuse_mirrored(&RampFill, &img, &mask, 8).unwrap();

        let mirrored = fuse_mirrored(
            &RampFill,
            &imageops::flip_horizontal(&img),
            &imageops::flip_horizontal(&mask),
            8,
        )
        .unwrap();

        assert_eq!(imageops::flip_horizontal(&mirrored), fused);
    }

    #[test]
    fn failure_in_either_pass_fails_fusion() {
        let (img, mask) = scene(16, 12);
        let model = FailOnSecondCall(AtomicUsize::new(0));
        let err = fuse_mirrored(&model, &img, &mask, 8).unwrap_err();
        assert!(err.to_string().contains("accelerator lost"));
    }
}
