use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use ab_glyph::{FontVec, PxScale};
use image::{
    codecs::jpeg::JpegEncoder,
    imageops::{self, FilterType},
    GrayImage, Rgb, RgbImage,
};
use imageproc::{
    drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_text_mut},
    rect::Rect,
};
use tracing::{debug, warn};

use crate::{
    algorithms::{centroid, foreground_count, ComponentMap},
    config::OutputConfig,
    error::{MammoError, Result},
    types::{BoundingBox, Metrics, Segmentation},
};

const IMAGE_WEIGHT: f32 = 0.8;
const TINT_WEIGHT: f32 = 0.35;
const PANEL: (u32, u32, u32, u32) = (12, 12, 360, 150);
const PANEL_KEEP: f32 = 0.65;
const BOX_THICKNESS: i32 = 2;
const MARKER_RADIUS: i32 = 5;
const RED: Rgb<u8> = Rgb([255, 0, 0]);
const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Fonts tried in order when no font path is configured
const SYSTEM_FONTS: [&str; 7] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Renders the overlay onto the original-resolution image and saves it as JPEG
pub struct Annotator {
    font: Option<FontVec>,
    jpeg_quality: u8,
    min_component_area: u32,
}

impl Annotator {
    pub fn new(output: &OutputConfig, min_component_area: u32) -> Self {
        let font = load_font(output.font_path.as_deref());
        if font.is_none() {
            warn!("No usable font found; annotated images will have an empty info panel");
        }
        Self {
            font,
            jpeg_quality: output.jpeg_quality.clamp(1, 100),
            min_component_area,
        }
    }

    pub fn min_component_area(&self) -> u32 {
        self.min_component_area
    }

    /// Draw tint, boxes, centroid marker and info panel onto a copy of `original`
    pub fn annotate(&self, original: &RgbImage, segmentation: &Segmentation) -> RgbImage {
        let (width, height) = original.dimensions();
        let working = uncrop(
            &segmentation.dominant_mask,
            segmentation.crop_origin,
            segmentation.frame_size,
        );
        let mask = imageops::resize(&working, width, height, FilterType::Nearest);

        let mut canvas = tint(original, &mask);

        let boxes: Vec<BoundingBox> = ComponentMap::label(&working)
            .at_least(self.min_component_area)
            .map(|c| c.bounds.rescale(segmentation.frame_size, (width, height)))
            .collect();
        debug!("Drawing {} bounding boxes", boxes.len());
        for bbox in &boxes {
            draw_box(&mut canvas, bbox);
        }

        if foreground_count(&mask) > 0 {
            let (cx, cy) = centroid(&mask);
            draw_filled_circle_mut(&mut canvas, (cx as i32, cy as i32), MARKER_RADIUS, GREEN);
        }

        darken_panel(&mut canvas);
        if let Some(font) = &self.font {
            for (text, top, size) in panel_lines(&segmentation.metrics) {
                draw_text_mut(&mut canvas, WHITE, 22, top, PxScale::from(size), font, &text);
            }
        }
        canvas
    }

    /// Encode `image` as JPEG at `path`, creating the parent directory if needed.
    ///
    /// A failed encode or flush removes the partial file before the error is returned.
    pub fn save(&self, image: &RgbImage, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| MammoError::write(parent, e))?;
        }
        let file = File::create(path).map_err(|e| MammoError::write(path, e))?;
        let written = encode_jpeg(image, file, self.jpeg_quality, path);
        if written.is_err() {
            if let Err(e) = fs::remove_file(path) {
                warn!("Failed to remove partial image {}: {e}", path.display());
            }
        }
        written
    }
}

fn encode_jpeg<W: Write>(image: &RgbImage, sink: W, quality: u8, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(sink);
    image
        .write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))
        .map_err(|source| MammoError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
    writer.flush().map_err(|e| MammoError::write(path, e))
}

fn load_font(configured: Option<&Path>) -> Option<FontVec> {
    let candidates: Vec<PathBuf> = match configured {
        Some(path) => vec![path.to_path_buf()],
        None => SYSTEM_FONTS.iter().map(PathBuf::from).collect(),
    };
    candidates.iter().find_map(|path| {
        let bytes = fs::read(path).ok()?;
        match FontVec::try_from_vec(bytes) {
            Ok(font) => {
                debug!("Using font {}", path.display());
                Some(font)
            }
            Err(e) => {
                warn!("Ignoring font {}: {e}", path.display());
                None
            }
        }
    })
}

/// Place a working-resolution mask back into the uncropped frame
fn uncrop(mask: &GrayImage, origin: (u32, u32), frame: (u32, u32)) -> GrayImage {
    if mask.dimensions() == frame {
        return mask.clone();
    }
    let mut full = GrayImage::new(frame.0, frame.1);
    imageops::replace(&mut full, mask, origin.0 as i64, origin.1 as i64);
    full
}

/// `0.8 * original + 0.35 * red`, where red is 255 in the red channel under the mask
fn tint(original: &RgbImage, mask: &GrayImage) -> RgbImage {
    RgbImage::from_fn(original.width(), original.height(), |x, y| {
        let Rgb([r, g, b]) = *original.get_pixel(x, y);
        let red = if mask.get_pixel(x, y)[0] > 0 { 255.0 } else { 0.0 };
        Rgb([
            blend(r as f32 * IMAGE_WEIGHT + red * TINT_WEIGHT),
            blend(g as f32 * IMAGE_WEIGHT),
            blend(b as f32 * IMAGE_WEIGHT),
        ])
    })
}

fn blend(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn draw_box(canvas: &mut RgbImage, bbox: &BoundingBox) {
    if bbox.width == 0 || bbox.height == 0 {
        return;
    }
    for inset in 0..BOX_THICKNESS {
        let rect = Rect::at(bbox.x as i32 - inset, bbox.y as i32 - inset)
            .of_size(bbox.width + 2 * inset as u32, bbox.height + 2 * inset as u32);
        draw_hollow_rect_mut(canvas, rect, RED);
    }
}

fn darken_panel(canvas: &mut RgbImage) {
    let (x0, y0, x1, y1) = PANEL;
    let x_end = (x1 + 1).min(canvas.width());
    let y_end = (y1 + 1).min(canvas.height());
    for y in y0..y_end {
        for x in x0..x_end {
            let pixel = canvas.get_pixel_mut(x, y);
            for channel in pixel.0.iter_mut() {
                *channel = blend(*channel as f32 * PANEL_KEEP);
            }
        }
    }
}

/// Text, top offset and pixel height of each panel line
fn panel_lines(metrics: &Metrics) -> [(String, i32, f32); 3] {
    [
        (format!("Density: {:.1}%", metrics.ratio_percent), 26, 24.0),
        (format!("Class: {}", metrics.density_class.description()), 61, 22.0),
        (format!("Region: {}", metrics.region), 96, 21.0),
    ]
}
