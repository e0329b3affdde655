use std::{fs, path::Path};

use crate::{
    error::{MammoError, Result},
    types::Metrics,
};

pub const DISCLAIMER: &str = "Disclaimer: Automatic analysis for research only.";

/// Plain-text technical report, one fact per line, newline terminated
pub fn render_report(file_name: &str, metrics: &Metrics) -> String {
    format!(
        "File: {file_name}\n\
         Suspicious area ratio: {:.1}%\n\
         Density class: {}\n\
         Suspicion index (0–100): {:.1}\n\
         Region (centroid-based): {}\n\
         {DISCLAIMER}\n",
        metrics.ratio_percent,
        metrics.density_class.description(),
        metrics.suspicion_index,
        metrics.region,
    )
}

/// Write `body` to `path`, creating the parent directory if needed
pub fn write_report(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| MammoError::write(parent, e))?;
    }
    fs::write(path, body).map_err(|e| MammoError::write(path, e))
}
