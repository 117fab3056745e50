use crate::preprocess::PreprocessParams;
use crate::DetectError;
use gingham_chessboard::DetectorConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full pipeline configuration as read from JSON. Missing fields take their
/// defaults, so `{}` is a valid file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub preprocess: PreprocessParams,
    pub detector: DetectorConfig,
}

impl Config {
    pub fn from_json_str(s: &str) -> Result<Self, DetectError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, DetectError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}
