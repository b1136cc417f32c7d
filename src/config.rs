use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compose::TwoStageConfig;
use crate::error::{Error, Result};

/// Which interpolation of the census features feeds the pipeline.
///
/// Resolved once at startup and passed down as a parameter; nothing
/// re-queries it mid-pipeline. The two variants were produced at different
/// hexagon resolutions, so they also determine the snapshot names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceVariant {
    Uniform,
    Weighted,
}

impl SourceVariant {
    /// Output subdirectory used by the original study layout.
    pub fn data_dir(&self) -> &'static str {
        match self {
            SourceVariant::Weighted => "01_weighted_interpolation",
            SourceVariant::Uniform => "02_uniform_interpolation",
        }
    }

    /// Hexagon grid resolution of the variant's feature snapshot.
    pub fn resolution(&self) -> u8 {
        match self {
            SourceVariant::Weighted => 8,
            SourceVariant::Uniform => 7,
        }
    }

    pub fn label_snapshot_name(&self) -> String {
        format!("clustering_labels_h{}.geojson", self.resolution())
    }
}

/// Top-level pipeline configuration, loadable from JSON.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub source: SourceVariant,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub clustering: TwoStageConfig,
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            Error::Configuration(format!("cannot parse config {}: {e}", path.display()))
        })
    }

    /// Directory the variant's artifacts land in.
    pub fn variant_dir(&self) -> PathBuf {
        self.output_dir.join(self.source.data_dir())
    }
}
