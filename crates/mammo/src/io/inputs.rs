use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, VariantNames};

use crate::{
    error::{MammoError, Result},
    io::loader::is_supported,
};

/// Which image of an input directory to analyse
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames,
    PartialEq, Eq
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Selection {
    /// Oldest by modification time
    First,
    /// Newest by modification time
    #[default]
    Latest,
}

/// Supported images directly inside `dir`, oldest first.
///
/// Files with equal modification times are ordered by name.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !is_supported(&path) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        entries.push((modified, path));
    }
    entries.sort();
    Ok(entries.into_iter().map(|(_, path)| path).collect())
}

/// Pick one image of `dir` according to `selection`
pub fn select_image(dir: &Path, selection: Selection) -> Result<PathBuf> {
    let mut images = list_images(dir)?;
    let picked = match selection {
        Selection::First => images.drain(..).next(),
        Selection::Latest => images.pop(),
    };
    picked.ok_or_else(|| MammoError::NoImages(dir.to_path_buf()))
}
