// Bucket Stream Constants - SINGLE SOURCE OF TRUTH
//
// Every size, limit and timeout shared between the planner and the
// streaming pipelines lives here.

/// Bucket geometry
pub mod bucket {
    /// Edge length of a bucket in voxels
    pub const BUCKET_WIDTH: u32 = 32;
    /// Voxels per bucket (32³)
    pub const BUCKET_SIZE: u32 = BUCKET_WIDTH * BUCKET_WIDTH * BUCKET_WIDTH;
}

/// Hardware gate for the texture budget planner
pub mod hardware {
    /// Smallest max texture dimension we can render with
    pub const MIN_TEXTURE_DIMENSION: u32 = 4096;
    /// Smallest number of concurrently bound textures we can render with
    pub const MIN_BOUND_TEXTURES: u32 = 8;

    /// Every layer needs one lookup texture for bucket addressing
    pub const LOOKUP_TEXTURES_PER_LAYER: u32 = 1;
    /// Id mapping needs one lookup, one data and one color texture
    pub const MAPPING_TEXTURE_COUNT: u32 = 3;

    /// Limits reported when no graphics context can be created
    pub const HEADLESS_TEXTURE_DIMENSION: u32 = 4096;
    pub const HEADLESS_BOUND_TEXTURES: u32 = 8192;
}

/// Network protocol
pub mod protocol {
    /// Timeout for a single batched bucket request
    pub const REQUEST_TIMEOUT_MS: u64 = 30_000;
    /// Response header listing batch indices the store could not satisfy
    pub const MISSING_BUCKETS_HEADER: &str = "missing-buckets";
    /// Save queue transaction category for bucket edits
    pub const VOLUME_TRANSACTION: &str = "volume";
}

pub use self::bucket::*;
