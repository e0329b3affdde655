use crate::{
    algorithms::{
        AdaptiveGaussianBinarizer, ClahePreprocessor, GaussianBlurPreprocessor, MinAreaFilter,
        MorphologyFilter, OtsuBinarizer,
    },
    config::{AnalysisConfig, OutputConfig, ThresholdStrategy},
    pipeline::Pipeline,
    traits::{Binarizer, ImagePreprocessor, MaskFilter},
};

/// Builder for creating analysis pipelines with a fluent API.
///
/// Stages left unset are derived from the configuration at `build` time.
pub struct PipelineBuilder {
    config: AnalysisConfig,
    output: OutputConfig,
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    binarizer: Option<Box<dyn Binarizer>>,
    mask_filters: Vec<Box<dyn MaskFilter>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: AnalysisConfig::default(),
            output: OutputConfig::default(),
            preprocessors: Vec::new(),
            binarizer: None,
            mask_filters: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }

    /// Add a preprocessor to the pipeline
    pub fn add_preprocessor<P>(mut self, preprocessor: P) -> Self
    where
        P: ImagePreprocessor + 'static,
    {
        self.preprocessors.push(Box::new(preprocessor));
        self
    }

    /// Set the binarizer (replaces any existing one)
    pub fn set_binarizer<B>(mut self, binarizer: B) -> Self
    where
        B: Binarizer + 'static,
    {
        self.binarizer = Some(Box::new(binarizer));
        self
    }

    /// Add a mask cleanup step to the pipeline
    pub fn add_mask_filter<F>(mut self, filter: F) -> Self
    where
        F: MaskFilter + 'static,
    {
        self.mask_filters.push(Box::new(filter));
        self
    }

    /// Build the pipeline with config-derived stages where none were given
    pub fn build(self) -> Pipeline {
        let config = self.config;
        let preprocessors = if self.preprocessors.is_empty() {
            default_preprocessors(&config)
        } else {
            self.preprocessors
        };
        let binarizer = self.binarizer.unwrap_or_else(|| default_binarizer(&config));
        let mask_filters = if self.mask_filters.is_empty() {
            default_mask_filters(&config)
        } else {
            self.mask_filters
        };

        Pipeline::new(config, self.output, preprocessors, binarizer, mask_filters)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// CLAHE, then the optional denoising blur
pub fn default_preprocessors(config: &AnalysisConfig) -> Vec<Box<dyn ImagePreprocessor>> {
    let mut stages: Vec<Box<dyn ImagePreprocessor>> = vec![Box::new(ClahePreprocessor {
        clip_limit: config.clahe_clip_limit,
        tile_grid: config.clahe_tile_grid,
    })];
    if let Some(sigma) = config.denoise_sigma.filter(|s| *s > 0.0) {
        stages.push(Box::new(GaussianBlurPreprocessor { sigma }));
    }
    stages
}

pub fn default_binarizer(config: &AnalysisConfig) -> Box<dyn Binarizer> {
    match config.threshold {
        ThresholdStrategy::Otsu => Box::new(OtsuBinarizer),
        ThresholdStrategy::Adaptive => Box::new(AdaptiveGaussianBinarizer {
            block_size: config.adaptive_block_size,
            offset: config.adaptive_offset,
        }),
    }
}

/// Opening, closing, then the minimum-area component filter
pub fn default_mask_filters(config: &AnalysisConfig) -> Vec<Box<dyn MaskFilter>> {
    vec![
        Box::new(MorphologyFilter::open(config.morph_kernel_size, config.morph_iterations)),
        Box::new(MorphologyFilter::close(config.morph_kernel_size, config.morph_iterations)),
        Box::new(MinAreaFilter {
            min_area: config.min_component_area,
        }),
    ]
}
