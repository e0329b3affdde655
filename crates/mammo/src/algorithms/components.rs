use image::{GrayImage, ImageBuffer, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use tracing::debug;
use crate::{error::Result, traits::MaskFilter, types::BoundingBox};

/// One 8-connected foreground region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Label in the labelling image
    pub label: u32,
    /// Pixel count
    pub area: u32,
    pub bounds: BoundingBox,
}

/// Labelled mask with per-component statistics.
///
/// Components are ordered by their first pixel in row-major scan order, so
/// index 0 is the region that starts highest (then leftmost) in the image.
#[derive(Debug, Clone)]
pub struct ComponentMap {
    labels: ImageBuffer<Luma<u32>, Vec<u32>>,
    components: Vec<Component>,
}

impl ComponentMap {
    pub fn label(mask: &GrayImage) -> Self {
        let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

        let mut slots: Vec<Option<usize>> = Vec::new();
        let mut extents: Vec<(u32, u32, u32, u32)> = Vec::new();
        let mut components: Vec<Component> = Vec::new();
        for (x, y, pixel) in labels.enumerate_pixels() {
            let label = pixel[0];
            if label == 0 {
                continue;
            }
            let slot_index = label as usize;
            if slots.len() <= slot_index {
                slots.resize(slot_index + 1, None);
            }
            let index = match slots[slot_index] {
                Some(index) => index,
                None => {
                    components.push(Component {
                        label,
                        area: 0,
                        bounds: BoundingBox { x, y, width: 1, height: 1 },
                    });
                    extents.push((x, y, x, y));
                    slots[slot_index] = Some(components.len() - 1);
                    components.len() - 1
                }
            };
            components[index].area += 1;
            let extent = &mut extents[index];
            extent.0 = extent.0.min(x);
            extent.1 = extent.1.min(y);
            extent.2 = extent.2.max(x);
            extent.3 = extent.3.max(y);
        }

        for (component, (x0, y0, x1, y1)) in components.iter_mut().zip(extents) {
            component.bounds = BoundingBox {
                x: x0,
                y: y0,
                width: x1 - x0 + 1,
                height: y1 - y0 + 1,
            };
        }

        Self { labels, components }
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Largest component by area; ties go to the earliest in scan order.
    pub fn largest(&self) -> Option<&Component> {
        self.components
            .iter()
            .fold(None, |best: Option<&Component>, candidate| match best {
                Some(current) if current.area >= candidate.area => Some(current),
                _ => Some(candidate),
            })
    }

    /// Components with at least `min_area` pixels
    pub fn at_least(&self, min_area: u32) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(move |c| c.area >= min_area)
    }

    /// Render the given components back into a 0/255 mask
    pub fn render<'a>(&self, keep: impl IntoIterator<Item = &'a Component>) -> GrayImage {
        let mut kept = Vec::new();
        for component in keep {
            let label = component.label as usize;
            if kept.len() <= label {
                kept.resize(label + 1, false);
            }
            kept[label] = true;
        }
        imageproc::map::map_colors(&self.labels, |p| {
            let on = p[0] != 0 && kept.get(p[0] as usize).copied().unwrap_or(false);
            Luma([if on { 255u8 } else { 0u8 }])
        })
    }
}

/// Discard components smaller than `min_area` pixels
#[derive(Debug, Clone)]
pub struct MinAreaFilter {
    pub min_area: u32,
}

impl Default for MinAreaFilter {
    fn default() -> Self {
        Self { min_area: 250 }
    }
}

impl MaskFilter for MinAreaFilter {
    fn apply(&self, mask: &GrayImage) -> Result<GrayImage> {
        let map = ComponentMap::label(mask);
        let kept: Vec<&Component> = map.at_least(self.min_area).collect();
        debug!(
            "Kept {} of {} components at min area {}",
            kept.len(),
            map.len(),
            self.min_area
        );
        Ok(map.render(kept))
    }

    fn name(&self) -> &'static str {
        "min_area"
    }

    fn min_area(&self) -> Option<u32> {
        Some(self.min_area)
    }
}

/// Reduce a mask to its single largest component.
///
/// A mask with zero or one component is returned unchanged.
pub fn dominant_component(mask: &GrayImage) -> GrayImage {
    let map = ComponentMap::label(mask);
    if map.len() <= 1 {
        return mask.clone();
    }
    match map.largest() {
        Some(largest) => map.render([largest]),
        None => mask.clone(),
    }
}
