// Bucket streaming between the remote stores and the renderer
// Fetches flow store -> renderer, edits flow renderer -> save queue

pub mod address;
pub mod compression;
pub mod fetch;
pub mod push;
pub mod wire;

pub use address::{
    bucket_position_to_global_address, create_request_bucket_info, create_send_bucket_info,
    BucketAddress,
};
pub use compression::{decode_base64, decode_four_bit, encode_base64, encode_four_bit};
pub use fetch::{
    merge_fallback, slice_buffer_into_pieces, BucketFetchPipeline, BucketPayload, StoreTarget,
};
pub use push::{BucketPushPipeline, MemorySaveQueue, SaveQueue, SaveTransaction};
pub use wire::{
    parse_missing_buckets, BucketResponse, RequestBucketInfo, SendBucketInfo, UpdateAction,
    UpdateBucketAction,
};
