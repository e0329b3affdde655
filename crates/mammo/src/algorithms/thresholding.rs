use image::{GrayImage, Luma};
use tracing::debug;
use crate::{error::Result, traits::Binarizer};

const FOREGROUND: Luma<u8> = Luma([255]);
const BACKGROUND: Luma<u8> = Luma([0]);

/// Global Otsu threshold, inverted so that pixels at or below the level are foreground.
#[derive(Debug, Clone, Default)]
pub struct OtsuBinarizer;

impl Binarizer for OtsuBinarizer {
    fn binarize(&self, image: &GrayImage) -> Result<GrayImage> {
        let mut pixels = image.pixels().map(|p| p[0]);
        let first = pixels.next();
        if first.is_none() || pixels.all(|v| Some(v) == first) {
            // a single intensity has no partition to find
            return Ok(GrayImage::new(image.width(), image.height()));
        }

        let level = imageproc::contrast::otsu_level(image);
        debug!("Otsu level {level}");
        Ok(imageproc::map::map_colors(image, |p| {
            if p[0] <= level { FOREGROUND } else { BACKGROUND }
        }))
    }

    fn name(&self) -> &'static str {
        "otsu"
    }
}

/// Local threshold against a Gaussian-weighted neighbourhood mean, inverted.
///
/// A pixel is foreground when it is not brighter than `mean - offset`.
#[derive(Debug, Clone)]
pub struct AdaptiveGaussianBinarizer {
    /// Odd neighbourhood side in pixels
    pub block_size: u32,
    pub offset: f32,
}

impl Default for AdaptiveGaussianBinarizer {
    fn default() -> Self {
        Self {
            block_size: 75,
            offset: -2.0,
        }
    }
}

impl AdaptiveGaussianBinarizer {
    /// Gaussian sigma matching a kernel of side `block_size`
    pub fn sigma(&self) -> f32 {
        let block = (self.block_size.max(3) | 1) as f32;
        0.3 * ((block - 1.0) * 0.5 - 1.0) + 0.8
    }
}

impl Binarizer for AdaptiveGaussianBinarizer {
    fn binarize(&self, image: &GrayImage) -> Result<GrayImage> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(image.clone());
        }
        let local_mean = imageproc::filter::gaussian_blur_f32(image, self.sigma());
        Ok(GrayImage::from_fn(image.width(), image.height(), |x, y| {
            let value = image.get_pixel(x, y)[0] as f32;
            let threshold = local_mean.get_pixel(x, y)[0] as f32 - self.offset;
            if value > threshold { BACKGROUND } else { FOREGROUND }
        }))
    }

    fn name(&self) -> &'static str {
        "adaptive_gaussian"
    }
}
