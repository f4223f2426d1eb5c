//! Error types for the planner, the probe and the bucket pipelines
//!
//! Each concern gets its own enum so callers can tell a hardware gate
//! apart from a failed batch. Missing buckets are not errors; they are
//! reported as `None` entries by the fetch pipeline.

use thiserror::Error;

/// Result type for texture budget planning
pub type PlannerResult<T> = Result<T, PlannerError>;

/// Result type for bucket fetches
pub type FetchResult<T> = Result<T, FetchError>;

/// Result type for bucket pushes
pub type PushResult<T> = Result<T, PushError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlannerError {
    #[error(
        "Minimum hardware requirements are not met. GPU should support at least a texture size of {min_dimension} \
         and {min_textures} textures (got {max_texture_dimension} and {max_bound_textures})"
    )]
    UnsupportedHardware {
        max_texture_dimension: u32,
        max_bound_textures: u32,
        min_dimension: u32,
        min_textures: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("No graphics adapter could be acquired")]
    NoAdapter,
}

/// Failures of the codec worker pool
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    #[error("Codec worker dropped the job before replying")]
    Disconnected,

    #[error("Invalid codec input: {0}")]
    InvalidInput(String),

    #[error("Failed to create codec pool: {0}")]
    PoolCreation(String),
}

/// Failures of the access token provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Access token unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Bucket request failed: {0}")]
    Http(String),

    #[error("Bucket request failed with HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("Bucket request was not authorized (HTTP status {status})")]
    Unauthorized { status: u16 },

    #[error("Bucket request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("Unexpected bucket response: {0}")]
    Protocol(String),

    #[error("Bucket decoding failed: {0}")]
    Worker(#[from] WorkerError),

    #[error("No resolution known for zoom step {zoom_step}")]
    UnknownResolution { zoom_step: u32 },

    #[error("Bucket {address} lies outside the addressable voxel range")]
    AddressOutOfRange { address: String },

    #[error("Dataset has no layer named {name}")]
    UnknownLayer { name: String },

    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushError {
    #[error("Bucket encoding failed: {0}")]
    Worker(#[from] WorkerError),

    #[error("Save queue rejected the transaction: {0}")]
    Queue(String),

    #[error("No resolution known for zoom step {zoom_step}")]
    UnknownResolution { zoom_step: u32 },

    #[error("Bucket {address} lies outside the addressable voxel range")]
    AddressOutOfRange { address: String },
}

/// Zoomed address that has no global voxel position
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("No resolution known for zoom step {zoom_step}")]
    UnknownResolution { zoom_step: u32 },

    #[error("Bucket {address} lies outside the addressable voxel range")]
    OutOfRange { address: String },
}

impl From<AddressError> for FetchError {
    fn from(err: AddressError) -> Self {
        match err {
            AddressError::UnknownResolution { zoom_step } => FetchError::UnknownResolution { zoom_step },
            AddressError::OutOfRange { address } => FetchError::AddressOutOfRange { address },
        }
    }
}

impl From<AddressError> for PushError {
    fn from(err: AddressError) -> Self {
        match err {
            AddressError::UnknownResolution { zoom_step } => PushError::UnknownResolution { zoom_step },
            AddressError::OutOfRange { address } => PushError::AddressOutOfRange { address },
        }
    }
}

/// Configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors the token scope can retry after refreshing the token
pub trait AuthorizationFailure {
    fn is_authorization_failure(&self) -> bool;
}

impl AuthorizationFailure for FetchError {
    fn is_authorization_failure(&self) -> bool {
        matches!(self, FetchError::Unauthorized { .. })
    }
}
