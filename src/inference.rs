//! Adapter around an opaque inpainting model.
//!
//! Models consume NCHW `f32` tensors in `[0, 1]`: a `[1, 3, H, W]` image and a
//! `[1, 1, H, W]` binary mask whose spatial size is a multiple of the model's
//! alignment modulus. They return a `[1, 3, H, W]` image tensor of the same
//! padded size. [`run_inference`] handles the conversion, padding and decoding
//! so the rest of the pipeline only deals in 8-bit images.

use std::sync::Mutex;

use image::{GrayImage, RgbImage};
use ndarray::{Array4, ArrayView4};

use crate::error::{BoxedError, Error, Result};

/// An inpainting backend that fills masked pixels of an image tensor.
///
/// Implementations must be safe to call from several threads at once. Wrap a
/// backend that needs exclusive access in [`Exclusive`].
pub trait InpaintModel: Send + Sync {
    /// Inpaint `image` (`[1, 3, H, W]`) where `mask` (`[1, 1, H, W]`) is 1.
    ///
    /// # Errors
    ///
    /// Any backend failure; it is surfaced to the caller as [`Error::Inference`].
    fn infer(
        &self,
        image: ArrayView4<'_, f32>,
        mask: ArrayView4<'_, f32>,
    ) -> std::result::Result<Array4<f32>, BoxedError>;
}

impl<M: InpaintModel + ?Sized> InpaintModel for Box<M> {
    fn infer(
        &self,
        image: ArrayView4<'_, f32>,
        mask: ArrayView4<'_, f32>,
    ) -> std::result::Result<Array4<f32>, BoxedError> {
        (**self).infer(image, mask)
    }
}

impl<M: InpaintModel + ?Sized> InpaintModel for &M {
    fn infer(
        &self,
        image: ArrayView4<'_, f32>,
        mask: ArrayView4<'_, f32>,
    ) -> std::result::Result<Array4<f32>, BoxedError> {
        (**self).infer(image, mask)
    }
}

impl<M: InpaintModel + ?Sized> InpaintModel for std::sync::Arc<M> {
    fn infer(
        &self,
        image: ArrayView4<'_, f32>,
        mask: ArrayView4<'_, f32>,
    ) -> std::result::Result<Array4<f32>, BoxedError> {
        (**self).infer(image, mask)
    }
}

/// A backend that needs `&mut self` to run, such as a session bound to one
/// accelerator context.
pub trait InpaintModelMut: Send {
    /// Same contract as [`InpaintModel::infer`].
    ///
    /// # Errors
    ///
    /// Any backend failure.
    fn infer_mut(
        &mut self,
        image: ArrayView4<'_, f32>,
        mask: ArrayView4<'_, f32>,
    ) -> std::result::Result<Array4<f32>, BoxedError>;
}

/// Serializes every invocation of a non-reentrant backend behind one lock.
pub struct Exclusive<M> {
    inner: Mutex<M>,
}

impl<M> Exclusive<M> {
    /// Take ownership of `model`.
    pub fn new(model: M) -> Self {
        Self {
            inner: Mutex::new(model),
        }
    }

    /// Release the wrapped model.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Inference`] if a previous call panicked while holding the lock.
    pub fn into_inner(self) -> Result<M> {
        self.inner
            .into_inner()
            .map_err(|_| Error::inference("model lock poisoned"))
    }
}

impl<M: InpaintModelMut> InpaintModel for Exclusive<M> {
    fn infer(
        &self,
        image: ArrayView4<'_, f32>,
        mask: ArrayView4<'_, f32>,
    ) -> std::result::Result<Array4<f32>, BoxedError> {
        let mut model = self
            .inner
            .lock()
            .map_err(|_| BoxedError::from("model lock poisoned"))?;
        model.infer_mut(image, mask)
    }
}

/// Round `x` up to the next multiple of `modulus`.
#[must_use]
pub fn ceil_modulo(x: usize, modulus: usize) -> usize {
    if modulus <= 1 {
        return x;
    }
    x.div_ceil(modulus) * modulus
}

/// Convert an RGB image to a `[1, 3, H, W]` tensor scaled to `[0, 1]`.
#[must_use]
pub fn image_to_tensor(image: &RgbImage) -> Array4<f32> {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let mut tensor = Array4::<f32>::zeros((1, 3, h, w));

    for (x, y, px) in image.enumerate_pixels() {
        for ch in 0..3 {
            tensor[[0, ch, y as usize, x as usize]] = f32::from(px[ch]) / 255.0;
        }
    }

    tensor
}

/// Convert a single-channel mask to a `[1, 1, H, W]` tensor scaled to `[0, 1]`.
#[must_use]
pub fn mask_to_tensor(mask: &GrayImage) -> Array4<f32> {
    let (w, h) = (mask.width() as usize, mask.height() as usize);
    let mut tensor = Array4::<f32>::zeros((1, 1, h, w));

    for (x, y, px) in mask.enumerate_pixels() {
        tensor[[0, 0, y as usize, x as usize]] = f32::from(px[0]) / 255.0;
    }

    tensor
}

/// Pad height and width at the bottom/right to multiples of `modulus`.
///
/// Padding mirrors the edge including the edge pixel itself, so no hard
/// border is introduced. Pads wider than the tensor keep reflecting.
#[must_use]
pub fn pad_to_modulo(tensor: &Array4<f32>, modulus: usize) -> Array4<f32> {
    let (n, c, h, w) = tensor.dim();
    let (out_h, out_w) = (ceil_modulo(h, modulus), ceil_modulo(w, modulus));
    if (out_h, out_w) == (h, w) {
        return tensor.clone();
    }

    Array4::from_shape_fn((n, c, out_h, out_w), |(b, ch, y, x)| {
        tensor[[b, ch, symmetric_index(y, h), symmetric_index(x, w)]]
    })
}

/// Map an index past the end of an axis of length `len` back into it by reflection.
fn symmetric_index(i: usize, len: usize) -> usize {
    let period = 2 * len;
    let j = i % period;
    if j < len {
        j
    } else {
        period - 1 - j
    }
}

/// Set every strictly positive mask value to 1 and everything else to 0.
pub fn binarize(mask: &mut Array4<f32>) {
    mask.mapv_inplace(|v| if v > 0.0 { 1.0 } else { 0.0 });
}

/// Decode the top-left `width x height` region of a `[1, 3, H, W]` tensor.
///
/// Values are scaled by 255, clipped and truncated to 8 bits.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn tensor_to_image(tensor: ArrayView4<'_, f32>, width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let (x, y) = (x as usize, y as usize);
        let channel = |ch: usize| (tensor[[0, ch, y, x]] * 255.0).clamp(0.0, 255.0) as u8;
        image::Rgb([channel(0), channel(1), channel(2)])
    })
}

/// Run `model` on an image crop and its mask, returning an image of the crop's size.
///
/// # Errors
///
/// Returns [`Error::Inference`] if the model fails, or [`Error::ShapeMismatch`]
/// if the crops differ in size or the model returns a tensor that is not
/// `[1, 3, H, W]` at the padded size.
pub fn run_inference<M>(
    model: &M,
    image: &RgbImage,
    mask: &GrayImage,
    modulus: u32,
) -> Result<RgbImage>
where
    M: InpaintModel + ?Sized,
{
    if image.dimensions() != mask.dimensions() {
        return Err(Error::ShapeMismatch {
            expected: format!("mask of {:?}", image.dimensions()),
            actual: format!("mask of {:?}", mask.dimensions()),
        });
    }
    let (width, height) = image.dimensions();
    let modulus = modulus as usize;

    let image_tensor = pad_to_modulo(&image_to_tensor(image), modulus);
    let mut mask_tensor = pad_to_modulo(&mask_to_tensor(mask), modulus);
    binarize(&mut mask_tensor);

    let (_, _, padded_h, padded_w) = image_tensor.dim();
    tracing::debug!(width, height, padded_w, padded_h, "running inpainting model");

    let output = model
        .infer(image_tensor.view(), mask_tensor.view())
        .map_err(Error::Inference)?;

    let expected = [1, 3, padded_h, padded_w];
    if output.shape() != expected.as_slice() {
        return Err(Error::ShapeMismatch {
            expected: format!("{expected:?}"),
            actual: format!("{:?}", output.shape()),
        });
    }

    Ok(tensor_to_image(output.view(), width, height))
}
