pub mod builder;

use std::{fs, path::Path};

use image::{imageops, RgbImage};
use tracing::{debug, info, warn};

use crate::{
    algorithms::{crop_border, dominant_component, foreground_count, localize, quantify, resize_area},
    annotate::Annotator,
    config::{AnalysisConfig, OutputConfig},
    error::Result,
    io::{load_image, render_report, select_image, write_report, Selection},
    traits::{Binarizer, ImagePreprocessor, MaskFilter},
    types::{Analysis, AnalysisArtifacts, Metrics, Segmentation},
};

/// The full analysis chain: preprocessing, segmentation, measurement and artifact output
pub struct Pipeline {
    config: AnalysisConfig,
    output: OutputConfig,
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    binarizer: Box<dyn Binarizer>,
    mask_filters: Vec<Box<dyn MaskFilter>>,
    annotator: Annotator,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    /// Pipeline with the default stage list for `config`
    pub fn from_config(config: AnalysisConfig, output: OutputConfig) -> Self {
        Self::builder().with_config(config).with_output(output).build()
    }

    pub fn new(
        config: AnalysisConfig,
        output: OutputConfig,
        preprocessors: Vec<Box<dyn ImagePreprocessor>>,
        binarizer: Box<dyn Binarizer>,
        mask_filters: Vec<Box<dyn MaskFilter>>,
    ) -> Self {
        if let Err(e) = config.validate() {
            warn!("{e}");
        }
        // boxes keep exactly the components the installed area filters keep
        let box_min_area = mask_filters.iter().filter_map(|f| f.min_area()).max().unwrap_or(0);
        let annotator = Annotator::new(&output, box_min_area);
        Self {
            config,
            output,
            preprocessors,
            binarizer,
            mask_filters,
            annotator,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn output(&self) -> &OutputConfig {
        &self.output
    }

    /// Area threshold applied to the annotation boxes, in working-resolution pixels
    pub fn box_min_area(&self) -> u32 {
        self.annotator.min_component_area()
    }

    /// Segment and measure an in-memory image without touching the filesystem
    pub fn process(&self, image: &RgbImage) -> Result<Segmentation> {
        let [width, height] = self.config.target_size;
        let resized = resize_area(image, width, height);
        let frame_size = resized.dimensions();

        let mut gray = imageops::grayscale(&resized);
        for preprocessor in &self.preprocessors {
            gray = preprocessor.preprocess(&gray)?;
            debug!("Applied {}", preprocessor.name());
        }
        let (gray, crop_origin) = crop_border(&gray, self.config.border_crop_fraction);

        let mut full_mask = self.binarizer.binarize(&gray)?;
        for filter in &self.mask_filters {
            full_mask = filter.apply(&full_mask)?;
        }
        let dominant_mask = dominant_component(&full_mask);
        if foreground_count(&full_mask) == 0 {
            warn!("No suspicious component survived segmentation");
        }

        let quantity = quantify(&full_mask, &dominant_mask, &self.config);
        let ((cx, cy), region) = localize(&dominant_mask);
        debug!(
            "Ratio {:.1}% class {} index {:.1} region {region}",
            quantity.ratio_percent, quantity.density_class, quantity.suspicion_index
        );

        Ok(Segmentation {
            full_mask,
            dominant_mask,
            metrics: Metrics {
                ratio_percent: quantity.ratio_percent,
                density_class: quantity.density_class,
                suspicion_index: quantity.suspicion_index,
                region,
                centroid: [cx, cy],
            },
            crop_origin,
            frame_size,
        })
    }

    /// Load, analyse and annotate `path`, writing the annotated image and the report.
    ///
    /// Nothing is left behind when either write fails.
    pub fn analyze(&self, path: &Path) -> Result<Analysis> {
        let original = load_image(path)?;
        let segmentation = self.process(&original)?;
        let artifacts = AnalysisArtifacts::for_source(
            path,
            &self.output.annotated_dir,
            &self.output.reports_dir,
        );

        let annotated = self.annotator.annotate(&original, &segmentation);
        self.annotator.save(&annotated, &artifacts.annotated_path)?;

        let analysis = Analysis {
            source: path.to_path_buf(),
            metrics: segmentation.metrics,
            artifacts,
        };
        let report = render_report(&analysis.file_name(), &analysis.metrics);
        if let Err(e) = write_report(&analysis.artifacts.report_path, &report) {
            if let Err(cleanup) = fs::remove_file(&analysis.artifacts.annotated_path) {
                warn!(
                    "Failed to remove {} after report failure: {cleanup}",
                    analysis.artifacts.annotated_path.display()
                );
            }
            return Err(e);
        }

        info!(
            "Analysed {}: {:.1}% ({}) in the {}, annotated {}, report {}",
            analysis.file_name(),
            analysis.metrics.ratio_percent,
            analysis.metrics.density_class,
            analysis.metrics.region,
            analysis.artifacts.annotated_path.display(),
            analysis.artifacts.report_path.display()
        );
        Ok(analysis)
    }

    /// Analyse the first or latest supported image of `dir`
    pub fn analyze_selected(&self, dir: &Path, selection: Selection) -> Result<Analysis> {
        let path = select_image(dir, selection)?;
        debug!("Selected {} ({selection})", path.display());
        self.analyze(&path)
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        let names = |stages: Vec<&'static str>| {
            if stages.is_empty() { "none".to_string() } else { stages.join(" -> ") }
        };
        format!(
            "Pipeline: {}x{} working size, preprocess [{}], binarize [{}], filters [{}], boxes >= {} px",
            self.config.target_size[0],
            self.config.target_size[1],
            names(self.preprocessors.iter().map(|p| p.name()).collect()),
            self.binarizer.name(),
            names(self.mask_filters.iter().map(|f| f.name()).collect()),
            self.box_min_area(),
        )
    }
}
