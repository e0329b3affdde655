use mammo::{AnalysisConfig, OutputConfig};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Analysis(#[from] mammo::MammoError),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Settings file consumed by the `mammo` binary
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
}

impl Settings {
    /// Load settings from `path`, or the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Load Settings from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load Settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load Settings from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load Settings from JSON string
    pub fn from_json(content: &str) -> Result<Self, CliError> {
        let settings: Self = serde_json::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the analysis parameters before any pipeline is built from them
    pub fn validate(&self) -> Result<(), CliError> {
        Ok(self.analysis.validate()?)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(CliError::UnsupportedFileFormat),
        }
    }

    /// Save settings, picking the format from the file extension
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CliError> {
        let path_ref = path.as_ref();
        let content = match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => self.to_toml()?,
            Some("json") => self.to_json()?,
            _ => return Err(CliError::UnsupportedFileFormat),
        };
        fs::write(path_ref, content)?;
        Ok(())
    }

    /// Convert Settings to TOML string
    pub fn to_toml(&self) -> Result<String, CliError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    /// Convert Settings to JSON string
    pub fn to_json(&self) -> Result<String, CliError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    /// JSON schema of the settings file
    pub fn schema_json() -> Result<String, CliError> {
        Ok(serde_json::to_string_pretty(&schemars::schema_for!(Settings))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mammo::ThresholdStrategy;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            [analysis]
            threshold = "adaptive"
            target_size = [768, 512]

            [output]
            annotated_dir = "out/img"
            "#,
        )
        .expect("Should parse TOML");
        assert_eq!(settings.analysis.threshold, ThresholdStrategy::Adaptive);
        assert_eq!(settings.analysis.target_size, [768, 512]);
        assert_eq!(settings.analysis.min_component_area, 250);
        assert_eq!(settings.output.annotated_dir, Path::new("out/img"));
        assert_eq!(settings.output.reports_dir, Path::new("output/reports"));
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("mammo.toml");
        let mut settings = Settings::default();
        settings.analysis.denoise_sigma = Some(1.5);
        settings.output.jpeg_quality = 80;

        settings.to_file(&path).expect("Should write settings");
        assert_eq!(Settings::from_file(&path).expect("Should read settings"), settings);
    }

    #[test]
    fn test_json_settings() {
        let settings = Settings::from_json(r#"{"analysis": {"min_component_area": 12}}"#)
            .expect("Should parse JSON");
        assert_eq!(settings.analysis.min_component_area, 12);
        assert_eq!(settings.output, OutputConfig::default());
    }

    #[test]
    fn test_inverted_ratio_bounds_are_rejected() {
        let err = Settings::from_toml(
            r#"
            [analysis]
            min_ratio = 0.9
            "#,
        )
        .expect_err("Should reject min_ratio above max_ratio");
        assert!(matches!(err, CliError::Analysis(mammo::MammoError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"analysis": {"target_size": [0, 512]}}"#).expect("Should write settings");

        let err = Settings::load(Some(path.as_path())).expect_err("Should reject zero target size");
        assert!(err.to_string().contains("target_size"));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = Settings::from_file("settings.yaml").expect_err("Should reject yaml");
        assert!(matches!(err, CliError::UnsupportedFileFormat));
    }

    #[test]
    fn test_schema_mentions_sections() {
        let schema = Settings::schema_json().expect("Should render schema");
        assert!(schema.contains("analysis"));
        assert!(schema.contains("clahe_clip_limit"));
    }
}
