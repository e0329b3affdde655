use std::{
    path::Path,
    sync::{Arc, RwLock},
};

use crate::{error::Result, io::Selection, pipeline::Pipeline, types::Analysis};

pub const NO_PREVIOUS_ANALYSIS: &str = "No previous analysis available to explain.";

/// Per-session memory of the most recent successful analysis.
///
/// Clones share the same slot, so one session can be handed to several workers.
#[derive(Debug, Clone, Default)]
pub struct Session {
    last: Arc<RwLock<Option<Analysis>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `pipeline` on `path` and remember the result once both artifacts are written
    pub fn analyze(&self, pipeline: &Pipeline, path: &Path) -> Result<Analysis> {
        let analysis = pipeline.analyze(path)?;
        self.record(analysis.clone());
        Ok(analysis)
    }

    pub fn analyze_selected(&self, pipeline: &Pipeline, dir: &Path, selection: Selection) -> Result<Analysis> {
        let analysis = pipeline.analyze_selected(dir, selection)?;
        self.record(analysis.clone());
        Ok(analysis)
    }

    pub fn record(&self, analysis: Analysis) {
        let mut slot = match self.last.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(analysis);
    }

    pub fn last(&self) -> Option<Analysis> {
        match self.last.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Explanation of the last analysis, or a fixed sentinel when there is none
    pub fn explain_last(&self) -> String {
        self.last()
            .map(|analysis| analysis.explanation())
            .unwrap_or_else(|| NO_PREVIOUS_ANALYSIS.to_string())
    }
}
