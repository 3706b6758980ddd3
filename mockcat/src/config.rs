//! Ingestion configuration
//!
//! A run is described by a JSON document mapping source names to the mock
//! that should be read for them:
//!
//! ```json
//! {
//!   "sources": {
//!     "QSO": {
//!       "format": "gaussianfield",
//!       "target_name": "QSO",
//!       "mock_dir_name": "/data/mocks/GaussianRandomField/v0.0.5",
//!       "bounds": [0.0, 45.0, -10.0, 10.0],
//!       "LYA": { "mock_dir_name": "/data/mocks/lya_forest.fits" }
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::ObjectClass;
use crate::error::{MockError, Result};
use crate::readers::MockFormat;
use crate::sky::SkyBounds;

/// Default brick size in degrees
pub const DEFAULT_BRICKSIZE: f64 = 0.25;

/// Location of the absorption-forest catalog merged into a QSO source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub mock_dir_name: PathBuf,
}

/// One mock source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub format: MockFormat,
    pub target_name: String,
    pub mock_dir_name: PathBuf,
    #[serde(default)]
    pub bounds: Option<SkyBounds>,
    #[serde(default)]
    pub magcut: Option<f64>,
    #[serde(default, rename = "LYA", alias = "lya")]
    pub lya: Option<ForestConfig>,
}

impl SourceConfig {
    /// Object class named by `target_name`
    pub fn target_class(&self) -> Result<ObjectClass> {
        self.target_name.parse()
    }
}

/// All mock sources of a run, keyed by source name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MockConfig {
    pub sources: BTreeMap<String, SourceConfig>,
}

impl MockConfig {
    /// Load from JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Parameters shared by every reader in a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IngestParams {
    /// Brick size in degrees used for region names
    pub bricksize: f64,
    /// Worker threads for multi-file readers
    pub nproc: usize,
}

impl Default for IngestParams {
    fn default() -> Self {
        Self {
            bricksize: DEFAULT_BRICKSIZE,
            nproc: 1,
        }
    }
}

impl IngestParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.bricksize > 0.0 && self.bricksize <= 180.0) {
            return Err(MockError::Config(format!(
                "bricksize must be in (0, 180] degrees, got {}",
                self.bricksize
            )));
        }
        if self.nproc == 0 {
            return Err(MockError::Config("nproc must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const CONFIG: &str = r#"{
        "sources": {
            "STAR": {
                "format": "galaxia",
                "target_name": "STAR",
                "mock_dir_name": "/mocks/galaxia",
                "bounds": [0.0, 45.0, -10.0, 10.0],
                "magcut": 20.0
            },
            "QSO": {
                "format": "gaussianfield",
                "target_name": "QSO",
                "mock_dir_name": "/mocks/grf",
                "LYA": {"mock_dir_name": "/mocks/lya.fits"}
            }
        }
    }"#;

    #[test]
    fn test_parse_sources() {
        let config: MockConfig = serde_json::from_str(CONFIG).unwrap();
        let names: Vec<&String> = config.sources.keys().collect();
        assert_eq!(names, vec!["QSO", "STAR"]);

        let star = &config.sources["STAR"];
        assert_eq!(star.format, MockFormat::Galaxia);
        assert_eq!(star.magcut, Some(20.0));
        assert_eq!(star.bounds, Some(SkyBounds::new(0.0, 45.0, -10.0, 10.0)));
        assert_eq!(star.target_class().unwrap(), ObjectClass::Star);
        assert!(star.lya.is_none());

        let qso = &config.sources["QSO"];
        assert_eq!(qso.format, MockFormat::GaussianField);
        assert_eq!(
            qso.lya.as_ref().unwrap().mock_dir_name,
            PathBuf::from("/mocks/lya.fits")
        );
        assert!(qso.bounds.is_none());
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let bad = CONFIG.replace("galaxia", "gadget");
        assert!(serde_json::from_str::<MockConfig>(&bad).is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let config: MockConfig = serde_json::from_str(CONFIG).unwrap();
        let tmp = NamedTempFile::new().unwrap();
        config.save_to_file(tmp.path()).unwrap();
        let loaded = MockConfig::load_from_file(tmp.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_ingest_params_validation() {
        IngestParams::default().validate().unwrap();
        let bad = IngestParams {
            bricksize: 0.0,
            nproc: 1,
        };
        assert!(bad.validate().is_err());
        let bad = IngestParams {
            bricksize: 0.25,
            nproc: 0,
        };
        assert!(bad.validate().is_err());
    }
}
