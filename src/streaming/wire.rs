//! Wire shapes exchanged with the data and tracing stores

use serde::{Deserialize, Serialize};

/// Bucket descriptor for writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBucketInfo {
    /// Global voxel position of the bucket's origin
    pub position: [u32; 3],
    pub zoom_step: u32,
    pub cube_size: u32,
}

/// Bucket descriptor for reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBucketInfo {
    #[serde(flatten)]
    pub bucket: SendBucketInfo,
    pub four_bit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

/// Raw answer of a batched bucket request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketResponse {
    /// Concatenated payloads of all buckets that were not missing
    pub buffer: Vec<u8>,
    /// Batch indices the store could not satisfy
    pub missing: Vec<usize>,
}

/// Save queue entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "value", rename_all = "camelCase")]
pub enum UpdateAction {
    UpdateBucket(UpdateBucketAction),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBucketAction {
    #[serde(flatten)]
    pub bucket: SendBucketInfo,
    pub base64_data: String,
}

impl UpdateAction {
    pub fn update_bucket(bucket: SendBucketInfo, base64_data: String) -> Self {
        UpdateAction::UpdateBucket(UpdateBucketAction {
            bucket,
            base64_data,
        })
    }
}

/// Parse the `missing-buckets` header. An absent or malformed header means
/// nothing is missing.
pub fn parse_missing_buckets(header: Option<&str>) -> Vec<usize> {
    match header {
        Some(value) => serde_json::from_str(value).unwrap_or_else(|err| {
            log::warn!("[BucketFetch] Ignoring malformed missing-buckets header {:?}: {}", value, err);
            Vec::new()
        }),
        None => Vec::new(),
    }
}
