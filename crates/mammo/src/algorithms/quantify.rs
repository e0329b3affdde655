use image::GrayImage;
use crate::{config::AnalysisConfig, types::DensityClass};

/// Suspicious-area ratio in percent.
///
/// The foreground fraction is clamped to `[min_ratio, max_ratio]` before the
/// conversion, then rounded to one decimal. Swapped bounds are reordered and
/// a NaN bound is ignored.
pub fn ratio_percent(mask: &GrayImage, min_ratio: f64, max_ratio: f64) -> f64 {
    let total = mask.width() as u64 * mask.height() as u64;
    let fraction = if total == 0 {
        min_ratio
    } else {
        foreground_count(mask) as f64 / total as f64
    };
    let (lo, hi) = (min_ratio.min(max_ratio), min_ratio.max(max_ratio));
    let clamped = fraction.max(lo).min(hi);
    (clamped * 1000.0).round() / 10.0
}

pub fn foreground_count(mask: &GrayImage) -> u64 {
    mask.pixels().filter(|p| p[0] > 0).count() as u64
}

/// Population variance of the 4-neighbour Laplacian response
pub fn laplacian_variance(mask: &GrayImage) -> f64 {
    let total = mask.width() as f64 * mask.height() as f64;
    if total == 0.0 {
        return 0.0;
    }
    let response = imageproc::filter::laplacian_filter(mask);
    let (sum, sum_sq) = response.pixels().fold((0.0f64, 0.0f64), |(s, sq), p| {
        let v = p[0] as f64;
        (s + v, sq + v * v)
    });
    let mean = sum / total;
    (sum_sq / total - mean * mean).max(0.0)
}

/// Composite 0–100 score of area and mask edge texture
pub fn suspicion_index(
    dominant_mask: &GrayImage,
    ratio_percent: f64,
    ratio_weight: f64,
    texture_weight: f64,
) -> f64 {
    let texture = laplacian_variance(dominant_mask);
    (ratio_weight * ratio_percent + texture_weight * texture).clamp(0.0, 100.0)
}

/// Area measurements of one segmentation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub ratio_percent: f64,
    pub density_class: DensityClass,
    pub suspicion_index: f64,
}

/// Ratio and class from the full mask, texture from the dominant mask
pub fn quantify(full_mask: &GrayImage, dominant_mask: &GrayImage, config: &AnalysisConfig) -> Quantity {
    let ratio = ratio_percent(full_mask, config.min_ratio, config.max_ratio);
    Quantity {
        ratio_percent: ratio,
        density_class: DensityClass::from_ratio_percent(ratio),
        suspicion_index: suspicion_index(
            dominant_mask,
            ratio,
            config.ratio_weight,
            config.texture_weight,
        ),
    }
}
