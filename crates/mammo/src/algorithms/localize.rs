use image::GrayImage;
use crate::types::Quadrant;

/// First-moment centroid of the foreground, truncated to whole pixels.
///
/// An empty mask yields the geometric centre.
pub fn centroid(mask: &GrayImage) -> (u32, u32) {
    let (mut m00, mut m10, mut m01) = (0u64, 0u64, 0u64);
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel[0] > 0 {
            m00 += 1;
            m10 += x as u64;
            m01 += y as u64;
        }
    }
    if m00 == 0 {
        (mask.width() / 2, mask.height() / 2)
    } else {
        ((m10 / m00) as u32, (m01 / m00) as u32)
    }
}

/// Bucket a point of a `width` x `height` frame into a quadrant
pub fn quadrant(point: (u32, u32), width: u32, height: u32) -> Quadrant {
    let upper = (point.1 as f64) < height as f64 / 2.0;
    let inner = (point.0 as f64) < width as f64 / 2.0;
    Quadrant::from_halves(upper, inner)
}

/// Centroid and quadrant of the dominant mask
pub fn localize(dominant_mask: &GrayImage) -> ((u32, u32), Quadrant) {
    let center = centroid(dominant_mask);
    (center, quadrant(center, dominant_mask.width(), dominant_mask.height()))
}
