use std::path::PathBuf;

use crate::error::{MammoError, Result};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

/// How the preprocessed intensity image is partitioned into suspicious / background.
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ThresholdStrategy {
    /// Global threshold minimizing intra-class variance
    #[default]
    Otsu,
    /// Local Gaussian-weighted mean threshold
    Adaptive,
}

/// Immutable algorithm parameters shared by every pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Working resolution as `[width, height]`
    pub target_size: [u32; 2],
    pub clahe_clip_limit: f32,
    /// CLAHE tile grid as `[columns, rows]`
    pub clahe_tile_grid: [u32; 2],
    /// Side of the elliptical structuring element
    pub morph_kernel_size: u32,
    pub morph_iterations: u32,
    /// Components smaller than this many working-resolution pixels are discarded
    pub min_component_area: u32,
    #[schemars(range(min = 0.0, max = 0.5))]
    pub border_crop_fraction: f32,
    pub threshold: ThresholdStrategy,
    pub adaptive_block_size: u32,
    pub adaptive_offset: f32,
    /// Lower clamp of the suspicious-pixel fraction
    #[schemars(range(min = 0.0, max = 1.0))]
    pub min_ratio: f64,
    /// Upper clamp of the suspicious-pixel fraction
    #[schemars(range(min = 0.0, max = 1.0))]
    pub max_ratio: f64,
    pub ratio_weight: f64,
    pub texture_weight: f64,
    /// Optional Gaussian blur applied before thresholding
    pub denoise_sigma: Option<f32>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target_size: [1536, 1024],
            clahe_clip_limit: 2.0,
            clahe_tile_grid: [8, 8],
            morph_kernel_size: 5,
            morph_iterations: 2,
            min_component_area: 250,
            border_crop_fraction: 0.02,
            threshold: ThresholdStrategy::Otsu,
            adaptive_block_size: 75,
            adaptive_offset: -2.0,
            min_ratio: 0.01,
            max_ratio: 0.80,
            ratio_weight: 0.6,
            texture_weight: 0.004,
            denoise_sigma: None,
        }
    }
}

impl AnalysisConfig {
    /// Clamp bounds of `ratio_percent`
    pub fn ratio_percent_bounds(&self) -> (f64, f64) {
        (self.min_ratio * 100.0, self.max_ratio * 100.0)
    }

    /// Reject parameter combinations no stage can run with
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(MammoError::InvalidConfig(reason));

        if self.target_size.contains(&0) {
            return invalid(format!("target_size must be non-zero, got {:?}", self.target_size));
        }
        if self.clahe_tile_grid.contains(&0) {
            return invalid(format!("clahe_tile_grid must be non-zero, got {:?}", self.clahe_tile_grid));
        }
        if !(0.0..=1.0).contains(&self.min_ratio) || !(0.0..=1.0).contains(&self.max_ratio) {
            return invalid(format!(
                "min_ratio and max_ratio must lie in [0, 1], got {} and {}",
                self.min_ratio, self.max_ratio
            ));
        }
        if self.min_ratio > self.max_ratio {
            return invalid(format!(
                "min_ratio ({}) must not exceed max_ratio ({})",
                self.min_ratio, self.max_ratio
            ));
        }
        if !(0.0..0.5).contains(&self.border_crop_fraction) {
            return invalid(format!(
                "border_crop_fraction must lie in [0, 0.5), got {}",
                self.border_crop_fraction
            ));
        }
        let weights = [
            ("ratio_weight", self.ratio_weight),
            ("texture_weight", self.texture_weight),
            ("clahe_clip_limit", self.clahe_clip_limit as f64),
            ("adaptive_offset", self.adaptive_offset as f64),
        ];
        if let Some((name, value)) = weights.iter().find(|(_, v)| !v.is_finite()) {
            return invalid(format!("{name} must be finite, got {value}"));
        }
        if let Some(sigma) = self.denoise_sigma.filter(|s| !s.is_finite()) {
            return invalid(format!("denoise_sigma must be finite, got {sigma}"));
        }
        Ok(())
    }
}

/// Where and how analysis artifacts are written.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub annotated_dir: PathBuf,
    pub reports_dir: PathBuf,
    #[schemars(range(min = 1, max = 100))]
    pub jpeg_quality: u8,
    /// Font used for the info panel; well-known system locations are searched when unset
    pub font_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            annotated_dir: PathBuf::from("output/annotated"),
            reports_dir: PathBuf::from("output/reports"),
            jpeg_quality: 95,
            font_path: None,
        }
    }
}

impl OutputConfig {
    /// Output config rooted at `base`, using the `annotated/` and `reports/` layout
    pub fn rooted_at(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            annotated_dir: base.join("annotated"),
            reports_dir: base.join("reports"),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_defaults_match_reference_tuning() {
        let config = AnalysisConfig::default();
        assert_eq!(config.target_size, [1536, 1024]);
        assert_eq!(config.min_component_area, 250);
        assert_eq!(config.threshold, ThresholdStrategy::Otsu);
        assert_eq!(config.ratio_percent_bounds(), (1.0, 80.0));
    }

    #[test]
    fn test_default_config_is_valid() {
        AnalysisConfig::default().validate().expect("Should accept defaults");
    }

    #[test]
    fn test_validate_rejects_unusable_values() {
        let cases = [
            AnalysisConfig { min_ratio: 0.9, ..AnalysisConfig::default() },
            AnalysisConfig { max_ratio: 1.5, ..AnalysisConfig::default() },
            AnalysisConfig { min_ratio: f64::NAN, ..AnalysisConfig::default() },
            AnalysisConfig { ratio_weight: f64::INFINITY, ..AnalysisConfig::default() },
            AnalysisConfig { texture_weight: f64::NAN, ..AnalysisConfig::default() },
            AnalysisConfig { target_size: [0, 1024], ..AnalysisConfig::default() },
            AnalysisConfig { clahe_tile_grid: [8, 0], ..AnalysisConfig::default() },
            AnalysisConfig { border_crop_fraction: 0.5, ..AnalysisConfig::default() },
            AnalysisConfig { denoise_sigma: Some(f32::NAN), ..AnalysisConfig::default() },
        ];
        for config in cases {
            let err = config.validate().expect_err("Should reject config");
            assert!(matches!(err, MammoError::InvalidConfig(_)), "{config:?}");
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"threshold": "adaptive", "min_component_area": 10}"#)
                .expect("Should parse partial config");
        assert_eq!(config.threshold, ThresholdStrategy::Adaptive);
        assert_eq!(config.min_component_area, 10);
        assert_eq!(config.clahe_tile_grid, [8, 8]);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(ThresholdStrategy::from_str("OTSU").unwrap(), ThresholdStrategy::Otsu);
        assert_eq!(ThresholdStrategy::Adaptive.to_string(), "adaptive");
        assert!(ThresholdStrategy::from_str("sauvola").is_err());
    }

    #[test]
    fn test_rooted_output() {
        let output = OutputConfig::rooted_at("/tmp/run");
        assert_eq!(output.annotated_dir, PathBuf::from("/tmp/run/annotated"));
        assert_eq!(output.reports_dir, PathBuf::from("/tmp/run/reports"));
        assert_eq!(output.jpeg_quality, 95);
    }
}
