use image::{GrayImage, Luma};
use strum::{Display, IntoStaticStr};
use crate::{error::Result, traits::MaskFilter};

/// Elliptical structuring element, stored as offsets from its anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EllipseKernel {
    size: u32,
    offsets: Vec<(i32, i32)>,
}

impl EllipseKernel {
    /// Ellipse inscribed in a `size` x `size` box, anchored at its centre
    pub fn new(size: u32) -> Self {
        let size = size.max(1);
        let radius = (size / 2) as i32;
        let inv_r2 = if radius > 0 { 1.0 / (radius * radius) as f64 } else { 0.0 };
        let mut offsets = Vec::new();
        for row in 0..size as i32 {
            let dy = row - radius;
            let half = if dy.abs() <= radius {
                (radius as f64 * (((radius * radius - dy * dy) as f64) * inv_r2).sqrt()).round() as i32
            } else {
                continue;
            };
            let first = (radius - half).max(0);
            let last = (radius + half + 1).min(size as i32);
            for column in first..last {
                offsets.push((column - radius, dy));
            }
        }
        Self { size, offsets }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }
}

/// Binary erosion; neighbours outside the image do not erode.
pub fn erode(mask: &GrayImage, kernel: &EllipseKernel) -> GrayImage {
    sweep(mask, kernel, true)
}

/// Binary dilation; neighbours outside the image do not dilate.
pub fn dilate(mask: &GrayImage, kernel: &EllipseKernel) -> GrayImage {
    sweep(mask, kernel, false)
}

fn sweep(mask: &GrayImage, kernel: &EllipseKernel, erosion: bool) -> GrayImage {
    let (width, height) = mask.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let mut neighbours = kernel.offsets().iter().filter_map(|&(dx, dy)| {
            let nx = x as i64 + dx as i64;
            let ny = y as i64 + dy as i64;
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                None
            } else {
                Some(mask.get_pixel(nx as u32, ny as u32)[0] > 0)
            }
        });
        let set = if erosion {
            neighbours.all(|on| on)
        } else {
            neighbours.any(|on| on)
        };
        Luma([if set { 255 } else { 0 }])
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum MorphologyOp {
    /// Erode then dilate: strips isolated specks
    Open,
    /// Dilate then erode: fills small gaps
    Close,
}

/// Repeated opening or closing with an elliptical kernel
#[derive(Debug, Clone)]
pub struct MorphologyFilter {
    pub op: MorphologyOp,
    pub kernel: EllipseKernel,
    pub iterations: u32,
}

impl MorphologyFilter {
    pub fn open(kernel_size: u32, iterations: u32) -> Self {
        Self {
            op: MorphologyOp::Open,
            kernel: EllipseKernel::new(kernel_size),
            iterations,
        }
    }

    pub fn close(kernel_size: u32, iterations: u32) -> Self {
        Self {
            op: MorphologyOp::Close,
            kernel: EllipseKernel::new(kernel_size),
            iterations,
        }
    }

    fn repeat(&self, mask: GrayImage, step: fn(&GrayImage, &EllipseKernel) -> GrayImage) -> GrayImage {
        (0..self.iterations).fold(mask, |current, _| step(&current, &self.kernel))
    }
}

impl MaskFilter for MorphologyFilter {
    fn apply(&self, mask: &GrayImage) -> Result<GrayImage> {
        let result = match self.op {
            MorphologyOp::Open => self.repeat(self.repeat(mask.clone(), erode), dilate),
            MorphologyOp::Close => self.repeat(self.repeat(mask.clone(), dilate), erode),
        };
        Ok(result)
    }

    fn name(&self) -> &'static str {
        self.op.into()
    }
}
