use image::{imageops::{self, FilterType}, GrayImage, Luma, RgbImage};
use tracing::debug;
use crate::{error::Result, traits::ImagePreprocessor};

/// Resize to the working resolution, averaging source areas when shrinking.
///
/// Enlarging falls back to bilinear sampling, which is what area interpolation
/// degenerates to in that direction.
pub fn resize_area(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    let (width, height) = (width.max(1), height.max(1));
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    if width <= image.width() && height <= image.height() {
        imageops::thumbnail(image, width, height)
    } else {
        imageops::resize(image, width, height, FilterType::Triangle)
    }
}

/// Contrast-limited adaptive histogram equalization
#[derive(Debug, Clone)]
pub struct ClahePreprocessor {
    pub clip_limit: f32,
    /// `[columns, rows]`
    pub tile_grid: [u32; 2],
}

impl Default for ClahePreprocessor {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tile_grid: [8, 8],
        }
    }
}

impl ImagePreprocessor for ClahePreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        Ok(equalize_adaptive(image, self.clip_limit, self.tile_grid))
    }

    fn name(&self) -> &'static str {
        "clahe"
    }
}

/// Gaussian blur preprocessor for noise reduction
#[derive(Debug, Clone)]
pub struct GaussianBlurPreprocessor {
    pub sigma: f32,
}

impl Default for GaussianBlurPreprocessor {
    fn default() -> Self {
        Self { sigma: 1.0 }
    }
}

impl ImagePreprocessor for GaussianBlurPreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        if self.sigma <= 0.0 {
            return Ok(image.clone());
        }
        Ok(imageproc::filter::gaussian_blur_f32(image, self.sigma))
    }

    fn name(&self) -> &'static str {
        "gaussian_blur"
    }
}

const BINS: usize = 256;

/// Tile-wise clipped histogram equalization with bilinear blending between tile centres.
pub fn equalize_adaptive(image: &GrayImage, clip_limit: f32, tile_grid: [u32; 2]) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let tiles_x = tile_grid[0].clamp(1, width);
    let tiles_y = tile_grid[1].clamp(1, height);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        let (y0, y1) = (ty * height / tiles_y, (ty + 1) * height / tiles_y);
        for tx in 0..tiles_x {
            let (x0, x1) = (tx * width / tiles_x, (tx + 1) * width / tiles_x);
            let mut histogram = [0u32; BINS];
            for y in y0..y1 {
                for x in x0..x1 {
                    histogram[image.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            let area = (x1 - x0) * (y1 - y0);
            luts.push(tile_lut(histogram, area, clip_limit));
        }
    }

    let columns = blend_weights(width, tiles_x);
    let rows = blend_weights(height, tiles_y);
    let lut = |tx: usize, ty: usize| &luts[ty * tiles_x as usize + tx];

    GrayImage::from_fn(width, height, |x, y| {
        let value = image.get_pixel(x, y)[0] as usize;
        let (tx1, tx2, wx) = columns[x as usize];
        let (ty1, ty2, wy) = rows[y as usize];
        let top = lut(tx1, ty1)[value] as f32 * (1.0 - wx) + lut(tx2, ty1)[value] as f32 * wx;
        let bottom = lut(tx1, ty2)[value] as f32 * (1.0 - wx) + lut(tx2, ty2)[value] as f32 * wx;
        let blended = top * (1.0 - wy) + bottom * wy;
        Luma([blended.round().clamp(0.0, 255.0) as u8])
    })
}

fn tile_lut(mut histogram: [u32; BINS], area: u32, clip_limit: f32) -> [u8; BINS] {
    if clip_limit > 0.0 {
        let clip = ((clip_limit * area as f32 / BINS as f32) as u32).max(1);
        let mut excess = 0u32;
        for count in histogram.iter_mut() {
            if *count > clip {
                excess += *count - clip;
                *count = clip;
            }
        }

        let batch = excess / BINS as u32;
        let mut residual = excess - batch * BINS as u32;
        for count in histogram.iter_mut() {
            *count += batch;
        }
        if residual > 0 {
            let step = (BINS / residual as usize).max(1);
            for count in histogram.iter_mut().step_by(step) {
                if residual == 0 {
                    break;
                }
                *count += 1;
                residual -= 1;
            }
        }
    }

    let scale = 255.0 / area.max(1) as f32;
    let mut lut = [0u8; BINS];
    let mut cumulative = 0u32;
    for (bin, count) in histogram.iter().enumerate() {
        cumulative += count;
        lut[bin] = (cumulative as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// For each coordinate along an axis: the two neighbouring tiles and the weight of the second.
fn blend_weights(len: u32, tiles: u32) -> Vec<(usize, usize, f32)> {
    let last = (tiles - 1) as usize;
    (0..len)
        .map(|i| {
            let position = (i as f32 + 0.5) * tiles as f32 / len as f32 - 0.5;
            if position <= 0.0 {
                (0, 0, 0.0)
            } else if position >= last as f32 {
                (last, last, 0.0)
            } else {
                let first = position.floor() as usize;
                (first, first + 1, position - first as f32)
            }
        })
        .collect()
}

/// Region kept after trimming a fixed fraction from every border
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropWindow {
    /// `None` when the margin rounds to zero or would consume the whole image
    pub fn for_margin(width: u32, height: u32, fraction: f32) -> Option<Self> {
        let margin_x = (width as f32 * fraction) as u32;
        let margin_y = (height as f32 * fraction) as u32;
        if margin_x == 0 || margin_y == 0 || 2 * margin_x >= width || 2 * margin_y >= height {
            return None;
        }
        Some(Self {
            x: margin_x,
            y: margin_y,
            width: width - 2 * margin_x,
            height: height - 2 * margin_y,
        })
    }
}

/// Trim the border margin; returns the cropped image and its origin in the input.
pub fn crop_border(image: &GrayImage, fraction: f32) -> (GrayImage, (u32, u32)) {
    match CropWindow::for_margin(image.width(), image.height(), fraction) {
        Some(window) => {
            let cropped =
                imageops::crop_imm(image, window.x, window.y, window.width, window.height).to_image();
            (cropped, (window.x, window.y))
        }
        None => {
            debug!(
                "Border crop of {fraction} skipped for {}x{} image",
                image.width(),
                image.height()
            );
            (image.clone(), (0, 0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| Luma([(x * 255 / (width - 1)) as u8]))
    }

    #[test]
    fn test_resize_area_shrinks_and_averages() {
        let mut image = RgbImage::new(4, 4);
        for y in 0..4 {
            for x in 0..2 {
                image.put_pixel(x, y, Rgb([200, 200, 200]));
            }
        }
        let resized = resize_area(&image, 2, 2);
        assert_eq!(resized.dimensions(), (2, 2));
        assert_eq!(resized.get_pixel(0, 0)[0], 200);
        assert_eq!(resized.get_pixel(1, 1)[0], 0);
    }

    #[test]
    fn test_resize_area_enlarges() {
        let image = RgbImage::from_pixel(10, 5, Rgb([40, 40, 40]));
        let resized = resize_area(&image, 30, 20);
        assert_eq!(resized.dimensions(), (30, 20));
        assert!(resized.pixels().all(|p| (39..=41).contains(&p[0])));
    }

    #[test]
    fn test_clahe_preserves_size_and_uniform_input_stays_uniform() {
        let image = GrayImage::from_pixel(64, 48, Luma([90]));
        let equalized = ClahePreprocessor::default().preprocess(&image).expect("Should equalize");
        assert_eq!(equalized.dimensions(), (64, 48));
        let first = equalized.get_pixel(0, 0)[0];
        assert!(equalized.pixels().all(|p| p[0] == first));
    }

    #[test]
    fn test_clahe_stretches_low_contrast() {
        let image = GrayImage::from_fn(128, 8, |x, _| Luma([100 + (x * 11 / 128) as u8]));
        let equalized = equalize_adaptive(&image, 40.0, [1, 1]);
        let min = equalized.pixels().map(|p| p[0]).min().unwrap();
        let max = equalized.pixels().map(|p| p[0]).max().unwrap();
        assert!(max - min > 100, "range {min}..{max} should widen");
    }

    #[test]
    fn test_clahe_with_more_tiles_than_pixels() {
        let image = gradient(3, 2);
        let equalized = equalize_adaptive(&image, 2.0, [8, 8]);
        assert_eq!(equalized.dimensions(), (3, 2));
    }

    #[test]
    fn test_crop_border_trims_each_side() {
        let image = GrayImage::new(100, 50);
        let (cropped, origin) = crop_border(&image, 0.1);
        assert_eq!(cropped.dimensions(), (80, 40));
        assert_eq!(origin, (10, 5));
    }

    #[test]
    fn test_crop_border_skipped_when_margin_vanishes_or_consumes() {
        let image = GrayImage::new(20, 20);
        assert_eq!(crop_border(&image, 0.02).0.dimensions(), (20, 20));
        assert_eq!(crop_border(&image, 0.5).0.dimensions(), (20, 20));
        assert!(CropWindow::for_margin(20, 20, 0.6).is_none());
    }

    #[test]
    fn test_gaussian_blur_smooths_step() {
        let image = GrayImage::from_fn(20, 1, |x, _| Luma([if x < 10 { 0 } else { 255 }]));
        let blurred = GaussianBlurPreprocessor { sigma: 1.5 }
            .preprocess(&image)
            .expect("Should blur");
        let edge = blurred.get_pixel(10, 0)[0];
        assert!(edge > 0 && edge < 255);
    }
}
