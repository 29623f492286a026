//! Region repair engine.

use std::path::{Path, PathBuf};
use std::time::Instant;

use image::{imageops, DynamicImage, ImageFormat, RgbImage};

use crate::composite;
use crate::config::RepairConfig;
use crate::error::{Error, Result};
use crate::fusion;
use crate::geometry::{validate_boxes, Rect, UserBox};
use crate::inference::{run_inference, InpaintModel};
use crate::mask;
use crate::region;
use crate::sharpen;

/// Outcome of a single repair.
#[derive(Debug, Clone)]
pub struct Repair {
    /// The repaired image, same size as the source.
    pub image: RgbImage,
    /// Region that was sent to the model, or `None` when nothing was repaired.
    pub crop_window: Option<Rect>,
    /// Number of caller boxes dropped as malformed.
    pub dropped_boxes: usize,
}

impl Repair {
    /// True when the selection was empty and the source came back untouched.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.crop_window.is_none()
    }
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Whether the file was skipped (nothing to repair).
    pub skipped: bool,
    /// Number of caller boxes dropped as malformed.
    pub dropped_boxes: usize,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            success: false,
            skipped: false,
            dropped_boxes: 0,
            message: String::new(),
        }
    }

    fn failed(path: &Path, message: String) -> Self {
        Self {
            message,
            ..Self::new(path)
        }
    }
}

/// Repairs boxed regions of images with an injected inpainting model.
///
/// Construct once at startup with the model handle and reuse it for every
/// request; dropping the engine (or calling [`RepairEngine::into_model`])
/// releases the model. The engine holds no per-request state, so a single
/// instance can serve concurrent requests when the model allows it.
pub struct RepairEngine<M> {
    model: M,
    config: RepairConfig,
}

impl<M: InpaintModel> RepairEngine<M> {
    /// Create an engine owning `model`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` fails validation.
    pub fn new(model: M, config: RepairConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { model, config })
    }

    /// Create an engine with the default configuration.
    #[must_use]
    pub fn with_defaults(model: M) -> Self {
        Self {
            model,
            config: RepairConfig::default(),
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &RepairConfig {
        &self.config
    }

    /// The injected model.
    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Shut the engine down and hand back the model.
    pub fn into_model(self) -> M {
        self.model
    }

    /// Repair `source` where the raw `[x1, y1, x2, y2]` boxes point.
    ///
    /// Malformed boxes are dropped and counted. With no usable boxes the
    /// source is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Inference`] or [`Error::ShapeMismatch`] if the model fails.
    pub fn repair<B: AsRef<[f64]>>(&self, source: &RgbImage, boxes: &[B]) -> Result<Repair> {
        let selection = validate_boxes(boxes);
        if selection.dropped > 0 {
            tracing::warn!(dropped = selection.dropped, "ignored malformed boxes");
        }

        let mut repair = self.repair_boxes(source, &selection.boxes)?;
        repair.dropped_boxes = selection.dropped;
        Ok(repair)
    }

    /// Repair `source` under already validated boxes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Inference`] or [`Error::ShapeMismatch`] if the model fails.
    pub fn repair_boxes(&self, source: &RgbImage, boxes: &[UserBox]) -> Result<Repair> {
        let (width, height) = source.dimensions();
        let cfg = &self.config;

        let full_mask = mask::build_mask(width, height, boxes, cfg.mask_margin);
        let Some(tight) = region::bounding_box(&full_mask) else {
            tracing::debug!("empty selection, returning source unchanged");
            return Ok(Repair {
                image: source.clone(),
                crop_window: None,
                dropped_boxes: 0,
            });
        };

        let window = region::crop_window(
            tight,
            width,
            height,
            cfg.context_multiplier,
            cfg.min_context_margin,
        );
        tracing::debug!(%tight, %window, "selected crop window");

        let crop = imageops::crop_imm(source, window.x1, window.y1, window.width(), window.height())
            .to_image();
        let crop_mask =
            imageops::crop_imm(&full_mask, window.x1, window.y1, window.width(), window.height())
                .to_image();

        let started = Instant::now();
        let fused = if cfg.mirror_fusion {
            fusion::fuse_mirrored(&self.model, &crop, &crop_mask, cfg.pad_modulus)?
        } else {
            run_inference(&self.model, &crop, &crop_mask, cfg.pad_modulus)?
        };
        tracing::debug!(elapsed = ?started.elapsed(), "inference finished");

        let sharpened = sharpen::unsharp_mask(&fused, &cfg.sharpen);
        let image =
            composite::feather_composite(source, &sharpened, window, &full_mask, cfg.feather_radius);

        Ok(Repair {
            image,
            crop_window: Some(window),
            dropped_boxes: 0,
        })
    }

    /// Process a single image file: load, repair, save.
    ///
    /// Returns a [`ProcessResult`] indicating success, skip, or failure.
    #[must_use]
    pub fn process_file<B: AsRef<[f64]>>(
        &self,
        input: &Path,
        output: &Path,
        boxes: &[B],
    ) -> ProcessResult {
        let mut result = ProcessResult::new(input);

        let source = match image::open(input) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                result.message = format!("Failed to load: {e}");
                return result;
            }
        };

        let repair = match self.repair(&source, boxes) {
            Ok(r) => r,
            Err(e) => {
                result.message = format!("Inpainting did not complete: {e}");
                return result;
            }
        };
        result.dropped_boxes = repair.dropped_boxes;

        if repair.is_unchanged() {
            result.skipped = true;
            result.success = true;
            result.message = "No region selected, nothing to repair".to_string();
            return result;
        }

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    result.message = format!("Failed to create output directory: {e}");
                    return result;
                }
            }
        }

        match save_image(&repair.image, output) {
            Ok(()) => {
                result.success = true;
                result.message = match repair.crop_window {
                    Some(window) => format!("Repaired region {window}"),
                    None => "Repaired".to_string(),
                };
                tracing::info!(path = %input.display(), output = %output.display(), "repaired");
            }
            Err(e) => {
                result.message = format!("Failed to save: {e}");
            }
        }

        result
    }

    /// Apply the same boxes to every supported image in a directory.
    ///
    /// Uses parallel iteration when the `parallel` feature is enabled (via rayon).
    /// Returns a [`ProcessResult`] for each image found.
    #[must_use]
    pub fn process_directory<B>(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        boxes: &[B],
    ) -> Vec<ProcessResult>
    where
        B: AsRef<[f64]> + Sync,
    {
        let entries: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| is_supported_image(p))
                .collect(),
            Err(e) => {
                return vec![ProcessResult::failed(
                    input_dir,
                    format!("Failed to read directory: {e}"),
                )];
            }
        };

        if !output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(output_dir) {
                return vec![ProcessResult::failed(
                    output_dir,
                    format!("Failed to create output directory: {e}"),
                )];
            }
        }

        let process = |input: &PathBuf| match input.file_name() {
            Some(name) => self.process_file(input, &output_dir.join(name), boxes),
            None => ProcessResult::failed(input, "Path has no file name".to_string()),
        };

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            entries.par_iter().map(process).collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            entries.iter().map(process).collect()
        }
    }
}

/// Parse a JSON box list such as `[[x1, y1, x2, y2], ...]`.
///
/// Entries of any length are accepted here; validation happens in
/// [`RepairEngine::repair`].
///
/// # Errors
///
/// Returns [`Error::BoxParse`] if the text is not a JSON array of number arrays.
pub fn parse_boxes(json: &str) -> Result<Vec<Vec<f64>>> {
    serde_json::from_str(json).map_err(Error::BoxParse)
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Save an RGB image with format-specific quality settings.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(img: &RgbImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    match format {
        ImageFormat::Jpeg => {
            let file = std::fs::File::create(path)?;
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, 100);
            encoder.encode_image(img)?;
        }
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp => {
            DynamicImage::ImageRgb8(img.clone()).save_with_format(path, format)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}

/// Generate a default output path from an input path.
///
/// Example: `"photo.jpg"` becomes `"photo_cleaned.jpg"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let ext = input.extension().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_cleaned.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fast_march::FastMarchInpainter;

    #[test]
    fn default_output_path_appends_cleaned_suffix() {
        let p = default_output_path(Path::new("/tmp/photo.jpg"));
        assert_eq!(p, PathBuf::from("/tmp/photo_cleaned.jpg"));

        let p = default_output_path(Path::new("image.png"));
        assert_eq!(
            p.file_name().unwrap().to_str().unwrap(),
            "image_cleaned.png"
        );
    }

    #[test]
    fn is_supported_image_accepts_common_formats() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.webp")));
        assert!(is_supported_image(Path::new("photo.bmp")));
    }

    #[test]
    fn is_supported_image_rejects_unsupported_formats() {
        assert!(!is_supported_image(Path::new("photo.gif")));
        assert!(!is_supported_image(Path::new("photo.txt")));
        assert!(!is_supported_image(Path::new("photo")));
    }

    #[test]
    fn parse_boxes_keeps_ragged_entries() {
        let boxes = parse_boxes("[[10, 20, 30], [1.5, 2, 3, 4]]").unwrap();
        assert_eq!(boxes, vec![vec![10.0, 20.0, 30.0], vec![1.5, 2.0, 3.0, 4.0]]);
    }

    #[test]
    fn parse_boxes_rejects_non_arrays() {
        assert!(matches!(parse_boxes("{\"x\": 1}"), Err(Error::BoxParse(_))));
    }

    #[test]
    fn engine_rejects_invalid_config() {
        let config = RepairConfig {
            pad_modulus: 0,
            ..RepairConfig::default()
        };
        assert!(RepairEngine::new(FastMarchInpainter::default(), config).is_err());
    }

    #[test]
    fn repair_reports_window_and_drops() {
        let engine = RepairEngine::with_defaults(FastMarchInpainter::default());
        let img = RgbImage::from_pixel(400, 300, image::Rgb([30, 60, 90]));
        let boxes = vec![vec![10.0, 20.0, 30.0], vec![100.0, 100.0, 150.0, 130.0]];

        let repair = engine.repair(&img, &boxes).unwrap();
        assert_eq!(repair.dropped_boxes, 1);
        assert_eq!(repair.crop_window, Some(Rect::new(30, 30, 221, 201)));
        assert_eq!(repair.image.dimensions(), (400, 300));
    }
}
