pub mod config;
pub mod constants;
pub mod error;
pub mod gpu;
pub mod layer;
pub mod network;
pub mod session;
pub mod streaming;
pub mod texture_budget;
pub mod thread_pool;

pub use config::{DatasetContext, PipelineSettings, StreamingConfig, VolumeTracing};
pub use error::{AddressError, AuthError, ConfigError, FetchError, PlannerError, ProbeError, PushError, WorkerError};
pub use gpu::CapabilityLimits;
pub use layer::{ElementClass, LayerCategory, LayerDescriptor, LayerId};
pub use network::{BucketTransport, HttpBucketTransport, StaticTokenProvider, TokenProvider};
pub use session::StreamingSession;
pub use streaming::{
    BucketAddress, BucketFetchPipeline, BucketPayload, BucketPushPipeline, MemorySaveQueue, SaveQueue,
};
pub use texture_budget::{FeatureSupport, GpuFactor, PackingPlan, TextureSetup, TextureSetupCache};
pub use thread_pool::{CodecPoolConfig, CodecWorkerPool, PayloadEncoder, VoxelDecoder};
