use std::path::Path;

use image::RgbImage;
use tracing::debug;

use crate::error::{MammoError, Result};

/// Accepted input extensions, compared case-insensitively
pub const SUPPORTED_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff", "dcm"];

fn extension(path: &Path) -> Option<String> {
    path.extension().map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

pub fn is_supported(path: &Path) -> bool {
    extension(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Decode `path` into an 8-bit RGB image at its native resolution.
///
/// DICOM files are min-max rescaled to `0..=255` and replicated to three
/// channels; raster formats are decoded directly in colour.
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let image = match extension(path).as_deref() {
        Some("dcm") => load_dicom(path)?,
        Some(ext) if SUPPORTED_EXTENSIONS.contains(&ext) => image::open(path)
            .map_err(|e| MammoError::decode(path, e))?
            .to_rgb8(),
        Some(ext) => return Err(MammoError::decode(path, format!("unsupported extension .{ext}"))),
        None => return Err(MammoError::decode(path, "missing file extension")),
    };

    if image.width() == 0 || image.height() == 0 {
        return Err(MammoError::decode(path, "image has no pixels"));
    }
    debug!("Loaded {} ({}x{})", path.display(), image.width(), image.height());
    Ok(image)
}

#[cfg(feature = "dicom")]
fn load_dicom(path: &Path) -> Result<RgbImage> {
    use dicom_pixeldata::PixelDecoder;

    let object = dicom_object::open_file(path).map_err(|e| MammoError::decode(path, e))?;
    let pixels = object
        .decode_pixel_data()
        .map_err(|e| MammoError::decode(path, e))?;
    let (width, height) = (pixels.columns(), pixels.rows());
    let samples = pixels.samples_per_pixel() as usize;
    let values: Vec<f32> = pixels
        .to_vec_frame(0)
        .map_err(|e| MammoError::decode(path, e))?;

    let bytes = rescale_to_u8(&values);
    let pixel_count = width as usize * height as usize;
    if pixel_count == 0 || bytes.len() < pixel_count * samples.max(1) {
        return Err(MammoError::decode(path, "pixel data shorter than image dimensions"));
    }

    let rgb: Vec<u8> = match samples {
        3 => bytes[..pixel_count * 3].to_vec(),
        _ => bytes
            .iter()
            .step_by(samples.max(1))
            .take(pixel_count)
            .flat_map(|&v| [v, v, v])
            .collect(),
    };
    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| MammoError::decode(path, "pixel buffer does not match dimensions"))
}

#[cfg(not(feature = "dicom"))]
fn load_dicom(path: &Path) -> Result<RgbImage> {
    Err(MammoError::decode(path, "built without DICOM support"))
}

/// Linear rescale mapping the observed minimum to 0 and maximum to 255.
///
/// A constant input maps to all zeros.
pub fn rescale_to_u8(values: &[f32]) -> Vec<u8> {
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = max - min;
    if !span.is_finite() || span <= 0.0 {
        return vec![0; values.len()];
    }
    values
        .iter()
        .map(|&v| (((v - min) / span) * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use std::path::PathBuf;

    #[test]
    fn test_supported_extensions_are_case_insensitive() {
        assert!(is_supported(Path::new("scan.PNG")));
        assert!(is_supported(Path::new("scan.dcm")));
        assert!(is_supported(Path::new("dir/scan.TiF")));
        assert!(!is_supported(Path::new("notes.txt")));
        assert!(!is_supported(Path::new("README")));
    }

    #[test]
    fn test_rescale_spans_full_range() {
        assert_eq!(rescale_to_u8(&[1000.0, 1500.0, 2000.0]), vec![0, 128, 255]);
    }

    #[test]
    fn test_rescale_constant_input_is_zero() {
        assert_eq!(rescale_to_u8(&[7.0, 7.0]), vec![0, 0]);
        assert!(rescale_to_u8(&[]).is_empty());
    }

    #[test]
    fn test_load_grayscale_png_as_rgb() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("gray.png");
        GrayImage::from_pixel(6, 4, Luma([90])).save(&path).expect("Should save png");

        let image = load_image(&path).expect("Should load png");
        assert_eq!(image.dimensions(), (6, 4));
        assert_eq!(image.get_pixel(0, 0).0, [90, 90, 90]);
    }

    #[test]
    fn test_garbage_file_is_decode_error() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").expect("Should write file");

        let err = load_image(&path).expect_err("Should fail to decode");
        assert!(matches!(err, MammoError::Decode { .. }));
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let err = load_image(&PathBuf::from("does/not/exist.jpg")).expect_err("Should fail");
        assert!(matches!(err, MammoError::Decode { .. }));
    }

    #[test]
    fn test_unsupported_extension_is_decode_error() {
        let err = load_image(Path::new("scan.gif")).expect_err("Should reject gif");
        assert!(err.to_string().contains("unsupported extension"));
    }

    #[cfg(feature = "dicom")]
    fn write_monochrome_dicom(path: &Path, width: u16, height: u16, values: Vec<u16>) {
        use dicom_core::{DataElement, PrimitiveValue, VR};
        use dicom_dictionary_std::tags;
        use dicom_object::{FileMetaTableBuilder, InMemDicomObject};

        let us = |value: u16| PrimitiveValue::from(value);
        let object = InMemDicomObject::from_element_iter([
            // Digital Mammography X-Ray Image Storage, For Presentation
            DataElement::new(tags::SOP_CLASS_UID, VR::UI, "1.2.840.10008.5.1.4.1.1.1.2"),
            DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, "2.25.302477025283473716296547836391234"),
            DataElement::new(tags::SAMPLES_PER_PIXEL, VR::US, us(1)),
            DataElement::new(tags::PHOTOMETRIC_INTERPRETATION, VR::CS, "MONOCHROME2"),
            DataElement::new(tags::ROWS, VR::US, us(height)),
            DataElement::new(tags::COLUMNS, VR::US, us(width)),
            DataElement::new(tags::BITS_ALLOCATED, VR::US, us(16)),
            DataElement::new(tags::BITS_STORED, VR::US, us(16)),
            DataElement::new(tags::HIGH_BIT, VR::US, us(15)),
            DataElement::new(tags::PIXEL_REPRESENTATION, VR::US, us(0)),
            DataElement::new(tags::PIXEL_DATA, VR::OW, PrimitiveValue::U16(values.into())),
        ]);
        object
            // Explicit VR Little Endian
            .with_meta(FileMetaTableBuilder::new().transfer_syntax("1.2.840.10008.1.2.1"))
            .expect("Should build file meta")
            .write_to_file(path)
            .expect("Should write dicom file");
    }

    #[cfg(feature = "dicom")]
    #[test]
    fn test_dicom_is_rescaled_to_gray_rgb() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("scan.dcm");
        // 4x3 ramp from 1000 to 2100
        let values: Vec<u16> = (0..12).map(|i| 1000 + i * 100).collect();
        write_monochrome_dicom(&path, 4, 3, values);

        let image = load_image(&path).expect("Should load dicom");
        assert_eq!(image.dimensions(), (4, 3));
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(image.get_pixel(3, 2).0, [255, 255, 255]);
        for pixel in image.pixels() {
            let [r, g, b] = pixel.0;
            assert!(r == g && g == b);
        }
        let row: Vec<u8> = image.pixels().map(|p| p[0]).collect();
        assert!(row.windows(2).all(|w| w[0] < w[1]));
    }

    #[cfg(feature = "dicom")]
    #[test]
    fn test_uppercase_dcm_extension_uses_dicom_path() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("SCAN.DCM");
        write_monochrome_dicom(&path, 2, 2, vec![0, 10, 20, 40]);

        let image = load_image(&path).expect("Should load dicom");
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(1, 1).0, [255, 255, 255]);
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0]);
    }
}
