//! Tunable parameters for the repair pipeline.
//!
//! Every knob has a default matching the values the pipeline was tuned with.
//! None of them is load-bearing: they interact empirically (dilation margin,
//! context growth and feather radius) and can be overridden from a JSON file
//! or the command line.
//!
//! ```no_run
//! use watermark_inpaint::RepairConfig;
//! use std::path::Path;
//!
//! let config = RepairConfig::from_json_file(Path::new("repair.json"))?;
//! # Ok::<(), watermark_inpaint::Error>(())
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Unsharp-mask parameters applied to the fused crop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharpenConfig {
    /// Gaussian sigma of the blur used to extract detail, in pixels.
    pub radius: f32,
    /// Strength of the detail boost, in percent (100 adds the detail once).
    pub amount_percent: f32,
    /// Minimum per-channel difference before a pixel is sharpened.
    pub threshold: u8,
}

impl Default for SharpenConfig {
    fn default() -> Self {
        Self {
            radius: 2.0,
            amount_percent: 100.0,
            threshold: 3,
        }
    }
}

/// Configuration for [`RepairEngine`](crate::RepairEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Pixels added on every side of each user box before masking.
    pub mask_margin: u32,
    /// Crop window grows to at least this multiple of the mask extent.
    pub context_multiplier: f32,
    /// Crop window grows by at least this many pixels per axis.
    pub min_context_margin: u32,
    /// Model input dimensions are padded to a multiple of this value.
    pub pad_modulus: u32,
    /// Sharpening applied after fusion.
    pub sharpen: SharpenConfig,
    /// Gaussian sigma used to feather the mask during compositing.
    pub feather_radius: f32,
    /// Run the mirrored second inference pass and average both.
    pub mirror_fusion: bool,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            mask_margin: 6,
            context_multiplier: 2.0,
            min_context_margin: 128,
            pad_modulus: 8,
            sharpen: SharpenConfig::default(),
            feather_radius: 3.0,
            mirror_fusion: true,
        }
    }
}

impl RepairConfig {
    /// Load configuration from a JSON file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, [`Error::Config`] if it
    /// is not valid JSON, or [`Error::InvalidConfig`] if a value is out of range.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(Error::Config)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable by the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.pad_modulus == 0 {
            return Err(invalid("pad_modulus", "must be at least 1"));
        }
        if !self.context_multiplier.is_finite() || self.context_multiplier < 1.0 {
            return Err(invalid(
                "context_multiplier",
                format!("must be a finite value >= 1.0, got {}", self.context_multiplier),
            ));
        }
        if !self.feather_radius.is_finite() || self.feather_radius < 0.0 {
            return Err(invalid(
                "feather_radius",
                format!("must be a finite value >= 0, got {}", self.feather_radius),
            ));
        }
        if !self.sharpen.radius.is_finite() || self.sharpen.radius < 0.0 {
            return Err(invalid(
                "sharpen.radius",
                format!("must be a finite value >= 0, got {}", self.sharpen.radius),
            ));
        }
        if !self.sharpen.amount_percent.is_finite() || self.sharpen.amount_percent < 0.0 {
            return Err(invalid(
                "sharpen.amount_percent",
                format!(
                    "must be a finite value >= 0, got {}",
                    self.sharpen.amount_percent
                ),
            ));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> Error {
    Error::InvalidConfig {
        name,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tuned_values() {
        let config = RepairConfig::default();
        assert_eq!(config.mask_margin, 6);
        assert!((config.context_multiplier - 2.0).abs() < f32::EPSILON);
        assert_eq!(config.min_context_margin, 128);
        assert_eq!(config.pad_modulus, 8);
        assert!((config.sharpen.radius - 2.0).abs() < f32::EPSILON);
        assert!((config.sharpen.amount_percent - 100.0).abs() < f32::EPSILON);
        assert_eq!(config.sharpen.threshold, 3);
        assert!((config.feather_radius - 3.0).abs() < f32::EPSILON);
        assert!(config.mirror_fusion);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: RepairConfig =
            serde_json::from_str(r#"{"mask_margin": 10, "sharpen": {"threshold": 5}}"#).unwrap();
        assert_eq!(config.mask_margin, 10);
        assert_eq!(config.sharpen.threshold, 5);
        assert!((config.sharpen.radius - 2.0).abs() < f32::EPSILON);
        assert_eq!(config.pad_modulus, 8);
    }

    #[test]
    fn validate_rejects_zero_modulus() {
        let config = RepairConfig {
            pad_modulus: 0,
            ..RepairConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pad_modulus"));
    }

    #[test]
    fn validate_rejects_shrinking_multiplier() {
        let config = RepairConfig {
            context_multiplier: 0.5,
            ..RepairConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_radii() {
        let config = RepairConfig {
            feather_radius: -1.0,
            ..RepairConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RepairConfig {
            sharpen: SharpenConfig {
                radius: f32::NAN,
                ..SharpenConfig::default()
            },
            ..RepairConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
