//! Session configuration
//!
//! Everything the planner and the pipelines read about the dataset is passed
//! in explicitly through these values. They are built once (usually from a
//! TOML file) and shared read-only behind an `Arc`.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::constants::protocol::REQUEST_TIMEOUT_MS;
use crate::error::ConfigError;
use crate::layer::LayerDescriptor;
use crate::texture_budget::GpuFactor;

/// An in-progress volume annotation on top of the dataset
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VolumeTracing {
    pub version: u64,
    /// Read-only dataset layer consulted for buckets the annotation lacks
    #[serde(default)]
    pub fallback_layer: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetContext {
    pub organization: String,
    pub name: String,
    pub data_store_url: String,
    pub tracing_store_url: String,
    /// Voxel scale per zoom step, index 0 is full resolution
    pub resolutions: Vec<[u32; 3]>,
    /// Color data is transferred with two voxels per byte
    pub four_bit: bool,
    pub layers: Vec<LayerDescriptor>,
    pub volume: Option<VolumeTracing>,
}

impl Default for DatasetContext {
    fn default() -> Self {
        Self {
            organization: String::new(),
            name: String::new(),
            data_store_url: "http://localhost:9000".to_string(),
            tracing_store_url: "http://localhost:9000".to_string(),
            resolutions: vec![[1, 1, 1]],
            four_bit: false,
            layers: Vec::new(),
            volume: None,
        }
    }
}

impl DatasetContext {
    pub fn resolution(&self, zoom_step: u32) -> Option<[u32; 3]> {
        self.resolutions.get(zoom_step as usize).copied()
    }

    pub fn layer(&self, name: &str) -> Option<&LayerDescriptor> {
        self.layers.iter().find(|layer| layer.name() == name)
    }

    pub fn has_segmentation(&self) -> bool {
        self.layers.iter().any(|layer| layer.is_segmentation)
    }

    /// Segmentation layers with an active volume annotation live on the
    /// tracing store
    pub fn is_edited_on_tracing_store(&self, layer: &LayerDescriptor) -> bool {
        layer.is_segmentation && self.volume.is_some()
    }

    pub fn uses_four_bit(&self, layer: &LayerDescriptor) -> bool {
        self.four_bit && !layer.is_segmentation
    }

    /// Annotation version requested alongside segmentation buckets
    pub fn request_version(&self, layer: &LayerDescriptor) -> Option<u64> {
        if layer.is_segmentation {
            self.volume.as_ref().map(|volume| volume.version)
        } else {
            None
        }
    }

    pub fn fallback_layer(&self) -> Option<&str> {
        self.volume.as_ref()?.fallback_layer.as_deref()
    }

    pub fn data_store_layer_url(&self, layer_name: &str) -> String {
        format!(
            "{}/data/datasets/{}/{}/layers/{}",
            self.data_store_url.trim_end_matches('/'),
            self.organization,
            self.name,
            layer_name
        )
    }

    pub fn tracing_store_layer_url(&self, layer_name: &str) -> String {
        format!(
            "{}/tracings/volume/{}",
            self.tracing_store_url.trim_end_matches('/'),
            layer_name
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub request_timeout_ms: u64,
    /// Codec worker threads, 0 picks one per CPU
    pub worker_threads: usize,
    pub gpu_factor: GpuFactor,
    pub required_bucket_capacity: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: REQUEST_TIMEOUT_MS,
            worker_threads: 0,
            gpu_factor: GpuFactor::default(),
            required_bucket_capacity: 4096,
        }
    }
}

impl PipelineSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.worker_threads
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    pub dataset: DatasetContext,
    pub pipeline: PipelineSettings,
}

impl StreamingConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}
