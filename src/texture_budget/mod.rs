//! Texture budget planning for the bucket renderer

pub mod cache;
pub mod gpu_factor;
pub mod planner;

pub use cache::{setup_key, TextureSetupCache};
pub use gpu_factor::{
    address_space_dimensions, gpu_factors_with_labels, lookup_buffer_size, GpuFactor,
};
pub use planner::{
    bucket_capacity, channel_count, packing_degree, plan, plan_layer, FeatureSupport, PackingPlan,
    TextureSetup,
};
