use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::commons::basic_functions::derive_output_path;
use crate::error::{BuildingsError, BuildingsResult};

/// Settings of one extraction run
///
/// A region switches on energy estimation; without one the output only
/// carries names, heights and levels.
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    /// `.osm.pbf` or `.osm` extract to read
    pub input: PathBuf,
    /// GeoJSON file to write; derived from `input` when None
    pub output: Option<PathBuf>,
    /// Region used to pick the EUI constant
    pub region: Option<String>,
    /// Fill missing building heights from tagged outline nodes
    pub infer_node_heights: bool,
    /// Indent the written GeoJSON
    pub pretty: bool,
}

impl RunConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        RunConfig {
            input: input.into(),
            output: None,
            region: None,
            infer_node_heights: false,
            pretty: false,
        }
    }

    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    pub fn with_node_height_inference(mut self, enabled: bool) -> Self {
        self.infer_node_heights = enabled;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn input_path(&self) -> &Path {
        &self.input
    }

    /// Reject arguments that cannot lead to a run, before any file is touched
    pub fn validate(&self) -> BuildingsResult<()> {
        if self.input.as_os_str().is_empty() {
            return Err(BuildingsError::InputArgument(
                "missing a filename to parse".to_string(),
            ));
        }
        if matches!(self.region.as_deref(), Some(r) if r.trim().is_empty()) {
            return Err(BuildingsError::InputArgument("empty region".to_string()));
        }
        if self.output_path() == self.input {
            return Err(BuildingsError::InputArgument(format!(
                "output would overwrite the input {}",
                self.input.display()
            )));
        }
        Ok(())
    }

    /// Explicit output path, or the input with its OSM suffix swapped for `.geojson`
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| derive_output_path(&self.input))
    }
}
