use std::path::{Path, PathBuf};

use image::GrayImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::error::Result;

/// Four-tier tissue density bucket derived from the suspicious-area ratio
#[derive(
    Debug, Clone, Copy,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq, PartialOrd, Ord, Hash
)]
pub enum DensityClass {
    A,
    B,
    C,
    D,
}

impl DensityClass {
    /// Step function over the ratio; each boundary belongs to the upper class.
    pub fn from_ratio_percent(ratio_percent: f64) -> Self {
        if ratio_percent < 5.0 {
            Self::A
        } else if ratio_percent < 15.0 {
            Self::B
        } else if ratio_percent < 35.0 {
            Self::C
        } else {
            Self::D
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::A => "Almost entirely fatty",
            Self::B => "Scattered fibroglandular",
            Self::C => "Heterogeneously dense",
            Self::D => "Extremely dense",
        }
    }

    /// `"C – Heterogeneously dense"`
    pub fn description(&self) -> String {
        format!("{} – {}", self, self.label())
    }
}

/// Quadrant of the dominant region's centroid
#[derive(
    Debug, Clone, Copy,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq, Hash
)]
pub enum Quadrant {
    #[serde(rename = "upper-inner quadrant")]
    #[strum(serialize = "upper-inner quadrant")]
    UpperInner,
    #[serde(rename = "upper-outer quadrant")]
    #[strum(serialize = "upper-outer quadrant")]
    UpperOuter,
    #[serde(rename = "lower-inner quadrant")]
    #[strum(serialize = "lower-inner quadrant")]
    LowerInner,
    #[serde(rename = "lower-outer quadrant")]
    #[strum(serialize = "lower-outer quadrant")]
    LowerOuter,
}

impl Quadrant {
    pub fn from_halves(upper: bool, inner: bool) -> Self {
        match (upper, inner) {
            (true, true) => Self::UpperInner,
            (true, false) => Self::UpperOuter,
            (false, true) => Self::LowerInner,
            (false, false) => Self::LowerOuter,
        }
    }
}

/// Follow-up priority bucket of the suspicion index
#[derive(
    Debug, Clone, Copy,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, IntoStaticStr,
    PartialEq, Eq, PartialOrd, Ord
)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn from_suspicion_index(index: f64) -> Self {
        if index < 20.0 {
            Self::Low
        } else if index < 50.0 {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// Interpretive phrase used in explanations
    pub fn severity(&self) -> &'static str {
        match self {
            Self::Low => "low suspicion, likely benign tissue pattern.",
            Self::Medium => "moderate suspicion, area merits follow-up imaging.",
            Self::High => "high suspicion, further diagnostic evaluation recommended.",
        }
    }
}

/// Axis-aligned box in pixel coordinates (inclusive origin, exclusive far edge)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Map this box from a `from` sized frame into a `to` sized frame, growing outward
    pub fn rescale(&self, from: (u32, u32), to: (u32, u32)) -> Self {
        let sx = to.0 as f64 / from.0.max(1) as f64;
        let sy = to.1 as f64 / from.1.max(1) as f64;
        let x0 = (self.x as f64 * sx).floor() as u32;
        let y0 = (self.y as f64 * sy).floor() as u32;
        let x1 = ((self.right() as f64 * sx).ceil() as u32).min(to.0);
        let y1 = ((self.bottom() as f64 * sy).ceil() as u32).min(to.1);
        Self {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }
}

/// Quantitative description of one image
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Metrics {
    /// Clamped suspicious-area ratio in percent, one decimal
    pub ratio_percent: f64,
    pub density_class: DensityClass,
    /// Composite 0–100 score of area and mask texture
    pub suspicion_index: f64,
    pub region: Quadrant,
    /// Centroid of the dominant region in working-resolution pixels
    pub centroid: [u32; 2],
}

impl Metrics {
    pub fn region_label(&self) -> String {
        self.region.to_string()
    }

    pub fn priority(&self) -> Priority {
        Priority::from_suspicion_index(self.suspicion_index)
    }
}

/// The two masks produced at working resolution
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// All cleaned components at or above the minimum area
    pub full_mask: GrayImage,
    /// Only the largest component of `full_mask`
    pub dominant_mask: GrayImage,
    pub metrics: Metrics,
    /// Offset of the cropped working buffer inside the resized frame
    pub crop_origin: (u32, u32),
    /// Size of the resized (uncropped) working frame
    pub frame_size: (u32, u32),
}

/// Files written for one analysis
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AnalysisArtifacts {
    pub annotated_path: PathBuf,
    pub report_path: PathBuf,
}

impl AnalysisArtifacts {
    /// Deterministic artifact locations for `source`
    pub fn for_source(source: &Path, annotated_dir: &Path, reports_dir: &Path) -> Self {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            annotated_path: annotated_dir.join(format!("annotated_{stem}.jpg")),
            report_path: reports_dir.join(format!("report_{stem}.txt")),
        }
    }
}

/// Result of one completed analysis
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Analysis {
    pub source: PathBuf,
    pub metrics: Metrics,
    pub artifacts: AnalysisArtifacts,
}

pub const RECOMMENDATIONS: [&str; 3] = [
    "Follow up with a radiologist.",
    "Compare with previous mammograms.",
    "Schedule additional imaging if needed.",
];

impl Analysis {
    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// `(ratio_percent, region_label, annotated_path, report_path)`
    pub fn into_outcome(self) -> (f64, String, PathBuf, PathBuf) {
        let region = self.metrics.region_label();
        (
            self.metrics.ratio_percent,
            region,
            self.artifacts.annotated_path,
            self.artifacts.report_path,
        )
    }

    /// Plain-language explanation of the finding
    pub fn explanation(&self) -> String {
        let metrics = &self.metrics;
        format!(
            "The suspicious region lies in the {}, with a density class of {}. \
             The computed suspicion index is {:.1}, indicating {}",
            metrics.region,
            metrics.density_class.description(),
            metrics.suspicion_index,
            metrics.priority().severity()
        )
    }

    pub fn summary(&self) -> Summary {
        Summary {
            filename: self.file_name(),
            suspicious_ratio: self.metrics.ratio_percent,
            density_class: self.metrics.density_class.description(),
            region: self.metrics.region_label(),
            suspicion_index: self.metrics.suspicion_index,
            priority: self.metrics.priority(),
            interpretation: self.explanation(),
            recommendations: RECOMMENDATIONS.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// Display-oriented record for dashboards and notifications
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Summary {
    pub filename: String,
    pub suspicious_ratio: f64,
    pub density_class: String,
    pub region: String,
    pub suspicion_index: f64,
    pub priority: Priority,
    pub interpretation: String,
    pub recommendations: Vec<String>,
}

impl Summary {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(suspicion_index: f64) -> Analysis {
        Analysis {
            source: PathBuf::from("input/case_01.png"),
            metrics: Metrics {
                ratio_percent: 12.3,
                density_class: DensityClass::B,
                suspicion_index,
                region: Quadrant::LowerOuter,
                centroid: [10, 20],
            },
            artifacts: AnalysisArtifacts::for_source(
                Path::new("input/case_01.png"),
                Path::new("out/annotated"),
                Path::new("out/reports"),
            ),
        }
    }

    #[test]
    fn test_density_boundaries_belong_to_upper_class() {
        assert_eq!(DensityClass::from_ratio_percent(4.9), DensityClass::A);
        assert_eq!(DensityClass::from_ratio_percent(5.0), DensityClass::B);
        assert_eq!(DensityClass::from_ratio_percent(15.0), DensityClass::C);
        assert_eq!(DensityClass::from_ratio_percent(35.0), DensityClass::D);
        assert_eq!(DensityClass::from_ratio_percent(80.0), DensityClass::D);
    }

    #[test]
    fn test_density_description() {
        assert_eq!(DensityClass::C.description(), "C – Heterogeneously dense");
    }

    #[test]
    fn test_quadrant_labels() {
        assert_eq!(Quadrant::from_halves(true, true).to_string(), "upper-inner quadrant");
        assert_eq!(Quadrant::from_halves(false, false).to_string(), "lower-outer quadrant");
    }

    #[test]
    fn test_quadrant_json_matches_report_label() {
        use strum::IntoEnumIterator;

        for quadrant in Quadrant::iter() {
            let json = serde_json::to_value(quadrant).expect("Should serialize quadrant");
            assert_eq!(json, serde_json::Value::String(quadrant.to_string()));
            let back: Quadrant = serde_json::from_value(json).expect("Should deserialize quadrant");
            assert_eq!(back, quadrant);
        }

        let analysis = analysis(30.0);
        let metrics = serde_json::to_value(&analysis.metrics).expect("Should serialize metrics");
        assert_eq!(metrics["region"], "lower-outer quadrant");
        assert_eq!(analysis.summary().region, "lower-outer quadrant");
    }

    #[test]
    fn test_priority_buckets() {
        assert_eq!(Priority::from_suspicion_index(19.9), Priority::Low);
        assert_eq!(Priority::from_suspicion_index(20.0), Priority::Medium);
        assert_eq!(Priority::from_suspicion_index(50.0), Priority::High);
    }

    #[test]
    fn test_bounding_box_rescale_grows_outward() {
        let bbox = BoundingBox { x: 3, y: 5, width: 10, height: 4 };
        let scaled = bbox.rescale((100, 50), (300, 100));
        assert_eq!(scaled, BoundingBox { x: 9, y: 10, width: 30, height: 8 });
    }

    #[test]
    fn test_artifact_paths_follow_source_stem() {
        let artifacts = analysis(0.0).artifacts;
        assert_eq!(artifacts.annotated_path, PathBuf::from("out/annotated/annotated_case_01.jpg"));
        assert_eq!(artifacts.report_path, PathBuf::from("out/reports/report_case_01.txt"));
    }

    #[test]
    fn test_outcome_tuple_shape() {
        let (ratio, region, annotated, report) = analysis(3.0).into_outcome();
        assert_eq!(ratio, 12.3);
        assert_eq!(region, "lower-outer quadrant");
        assert!(annotated.ends_with("annotated_case_01.jpg"));
        assert!(report.ends_with("report_case_01.txt"));
    }

    #[test]
    fn test_summary_carries_priority_and_interpretation() {
        let summary = analysis(42.0).summary();
        assert_eq!(summary.filename, "case_01.png");
        assert_eq!(summary.priority, Priority::Medium);
        assert!(summary.interpretation.contains("lower-outer quadrant"));
        assert!(summary.interpretation.contains("B – Scattered fibroglandular"));
        assert!(summary.interpretation.contains("42.0"));
        assert_eq!(summary.recommendations.len(), 3);
        let json = summary.to_json_pretty().expect("Should serialize summary");
        assert!(json.contains("\"priority\": \"Medium\""));
    }
}
