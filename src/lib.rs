//! Remove boxed watermarks, logos and captions from still images by inpainting.
//!
//! The caller marks unwanted overlays with rectangles. The crate builds a
//! dilated mask from them, crops a context window around the mask, runs an
//! injected inpainting model on the crop twice (as-is and mirrored) and
//! averages both passes, sharpens the result and feathers it back into the
//! full-resolution image. Pixels away from the boxes are bit-identical to the
//! source.
//!
//! # Quick Start
//!
//! ```no_run
//! use watermark_inpaint::{FastMarchInpainter, RepairEngine};
//!
//! let engine = RepairEngine::with_defaults(FastMarchInpainter::default());
//! let img = image::open("photo.jpg").unwrap().to_rgb8();
//! let repair = engine.repair(&img, &[[100.0, 100.0, 150.0, 130.0]]).unwrap();
//! repair.image.save("cleaned.png").unwrap();
//! ```
//!
//! # Models
//!
//! The neural network is not part of this crate. Any backend implementing
//! [`InpaintModel`] can be injected; it receives NCHW tensors in `[0, 1]`
//! padded to [`RepairConfig::pad_modulus`]. Backends that are not re-entrant
//! can be wrapped in [`Exclusive`] to serialize calls. [`FastMarchInpainter`]
//! is a classical, weight-free backend.
//!
//! ```no_run
//! use ndarray::{Array4, ArrayView4};
//! use watermark_inpaint::{BoxedError, InpaintModel, RepairConfig, RepairEngine};
//!
//! struct MyLama;
//!
//! impl InpaintModel for MyLama {
//!     fn infer(
//!         &self,
//!         image: ArrayView4<'_, f32>,
//!         _mask: ArrayView4<'_, f32>,
//!     ) -> Result<Array4<f32>, BoxedError> {
//!         // hand the tensors to a runtime here
//!         Ok(image.to_owned())
//!     }
//! }
//!
//! let engine = RepairEngine::new(MyLama, RepairConfig::default()).unwrap();
//! ```

#![deny(missing_docs)]

pub mod composite;
pub mod config;
mod engine;
pub mod error;
pub mod fast_march;
pub mod fusion;
pub mod geometry;
pub mod inference;
pub mod mask;
pub mod region;
pub mod sharpen;

pub use config::{RepairConfig, SharpenConfig};
pub use engine::{
    default_output_path, is_supported_image, parse_boxes, save_image, ProcessResult, Repair,
    RepairEngine,
};
pub use error::{BoxedError, Error, Result};
pub use fast_march::FastMarchInpainter;
pub use geometry::{validate_boxes, BoxSelection, Rect, UserBox};
pub use inference::{Exclusive, InpaintModel, InpaintModelMut};
