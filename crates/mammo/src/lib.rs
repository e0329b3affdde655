//! # Mammography Suspicious-Area Analysis
//!
//! A deterministic image-processing pipeline that measures "suspicious"
//! (dense, darker than the partition threshold) tissue in a mammogram and
//! writes an annotated copy plus a plain-text report.
//!
//! ## Stages
//!
//! - **Loader**: raster formats and DICOM into an 8-bit RGB image
//! - **Preprocessor**: working-size resize, grayscale, CLAHE, border crop
//! - **Segmenter**: Otsu or adaptive threshold, morphology, minimum-area filter
//! - **Dominant region**: largest connected component of the cleaned mask
//! - **Quantifier / Localizer**: ratio, density class, suspicion index, quadrant
//! - **Annotator**: tint, boxes, centroid marker and info panel at native resolution
//! - **Session**: remembers the last analysis for explanations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mammo::{Pipeline, Session};
//! use std::path::Path;
//!
//! let pipeline = Pipeline::builder().build();
//! let session = Session::new();
//!
//! let analysis = session.analyze(&pipeline, Path::new("input/case_01.png"))?;
//! let (ratio, region, annotated, report) = analysis.into_outcome();
//! println!("{ratio:.1}% in the {region}: {} / {}", annotated.display(), report.display());
//! println!("{}", session.explain_last());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Pipeline
//!
//! ```rust,no_run
//! use mammo::{Pipeline, algorithms::*, config::AnalysisConfig};
//!
//! let pipeline = Pipeline::builder()
//!     .with_config(AnalysisConfig { target_size: [768, 512], ..Default::default() })
//!     .add_preprocessor(ClahePreprocessor { clip_limit: 3.0, tile_grid: [4, 4] })
//!     .set_binarizer(AdaptiveGaussianBinarizer::default())
//!     .add_mask_filter(MorphologyFilter::open(3, 1))
//!     .add_mask_filter(MinAreaFilter { min_area: 100 })
//!     .build();
//! println!("{}", pipeline.info());
//! ```

pub mod error;
pub mod config;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod annotate;
pub mod io;
pub mod pipeline;
pub mod session;

pub use error::{MammoError, Result};
pub use config::{AnalysisConfig, OutputConfig, ThresholdStrategy};
pub use types::{
    Analysis, AnalysisArtifacts, BoundingBox, DensityClass, Metrics, Priority, Quadrant,
    Segmentation, Summary,
};
pub use traits::*;
pub use annotate::Annotator;
pub use io::{list_images, load_image, Selection};
pub use pipeline::{builder::PipelineBuilder, Pipeline};
pub use session::{Session, NO_PREVIOUS_ANALYSIS};
