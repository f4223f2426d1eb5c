// Codec worker pool shared by the fetch and push pipelines
pub mod thread_pool;

pub use thread_pool::{
    CodecPoolConfig, CodecPoolStats, CodecWorkerPool, PayloadEncoder, PoolCounters, VoxelDecoder,
};
