use image::GrayImage;
use crate::error::Result;

/// Trait for intensity transforms applied at working resolution
pub trait ImagePreprocessor: Send + Sync {
    /// Transform the grayscale working image (e.g., equalize, blur)
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage>;

    /// Short name used in pipeline descriptions
    fn name(&self) -> &'static str;
}

/// Trait for binarization algorithms
pub trait Binarizer: Send + Sync {
    /// Produce a 0/255 mask where 255 marks suspicious (darker than threshold) pixels
    fn binarize(&self, image: &GrayImage) -> Result<GrayImage>;

    fn name(&self) -> &'static str;
}

/// Trait for binary mask cleanup steps
pub trait MaskFilter: Send + Sync {
    /// Filter a 0/255 mask, returning a new mask of the same size
    fn apply(&self, mask: &GrayImage) -> Result<GrayImage>;

    fn name(&self) -> &'static str;

    /// Smallest component area this filter keeps, for filters that drop by area
    fn min_area(&self) -> Option<u32> {
        None
    }
}
