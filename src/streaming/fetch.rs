//! Batched bucket fetching with fallback
//!
//! A batch of zoomed addresses becomes one request to either the data store
//! or, for segmentation that is being annotated, the tracing store. Buckets
//! the tracing store does not have are retried against the annotation's
//! fallback layer on the data store. The result always has one entry per
//! requested address, in request order.

use std::sync::Arc;
use std::time::Duration;

use rustc_hash::FxHashSet;

use super::address::{create_request_bucket_info, BucketAddress};
use crate::config::DatasetContext;
use crate::constants::protocol::REQUEST_TIMEOUT_MS;
use crate::error::{FetchError, FetchResult};
use crate::layer::LayerDescriptor;
use crate::network::{with_access_token, BucketTransport, TokenProvider};
use crate::thread_pool::VoxelDecoder;

/// Raw voxel data of one bucket
pub type BucketPayload = Vec<u8>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreTarget {
    DataStore,
    TracingStore,
}

pub struct BucketFetchPipeline {
    context: Arc<DatasetContext>,
    transport: Arc<dyn BucketTransport>,
    tokens: Arc<dyn TokenProvider>,
    decoder: Arc<dyn VoxelDecoder>,
    timeout: Duration,
}

impl BucketFetchPipeline {
    pub fn new(
        context: Arc<DatasetContext>,
        transport: Arc<dyn BucketTransport>,
        tokens: Arc<dyn TokenProvider>,
        decoder: Arc<dyn VoxelDecoder>,
    ) -> Self {
        Self {
            context,
            transport,
            tokens,
            decoder,
            timeout: Duration::from_millis(REQUEST_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn context(&self) -> &DatasetContext {
        &self.context
    }

    pub fn store_target(&self, layer: &LayerDescriptor) -> StoreTarget {
        if self.context.is_edited_on_tracing_store(layer) {
            StoreTarget::TracingStore
        } else {
            StoreTarget::DataStore
        }
    }

    /// Fetch a batch of buckets, retrying missing ones against the fallback
    /// layer when the annotation has one
    pub async fn fetch_batch(
        &self,
        layer: &LayerDescriptor,
        batch: &[BucketAddress],
    ) -> FetchResult<Vec<Option<BucketPayload>>> {
        let target = self.store_target(layer);
        let request_url = match target {
            StoreTarget::DataStore => self.context.data_store_layer_url(layer.name()),
            StoreTarget::TracingStore => self.context.tracing_store_layer_url(layer.name()),
        };

        let buffers = self.request_from_store(&request_url, layer, batch).await?;
        let missing_indices: Vec<usize> = buffers
            .iter()
            .enumerate()
            .filter(|(_, buffer)| buffer.is_none())
            .map(|(index, _)| index)
            .collect();

        // Only buckets that were never annotated are looked up again
        let fallback_layer = match (target, self.context.fallback_layer()) {
            (StoreTarget::TracingStore, Some(fallback)) if !missing_indices.is_empty() => fallback,
            _ => return Ok(buffers),
        };

        log::debug!(
            "[BucketFetch] {} of {} buckets missing on the tracing store, asking fallback layer {}",
            missing_indices.len(),
            batch.len(),
            fallback_layer
        );

        let fallback_batch: Vec<BucketAddress> =
            missing_indices.iter().map(|&index| batch[index]).collect();
        let fallback_buffers = self
            .request_from_store(
                &self.context.data_store_layer_url(fallback_layer),
                layer,
                &fallback_batch,
            )
            .await?;

        Ok(merge_fallback(buffers, &missing_indices, fallback_buffers))
    }

    /// One batched request against a single store layer endpoint
    pub async fn request_from_store(
        &self,
        layer_url: &str,
        layer: &LayerDescriptor,
        batch: &[BucketAddress],
    ) -> FetchResult<Vec<Option<BucketPayload>>> {
        let four_bit = self.context.uses_four_bit(layer);
        let version = self.context.request_version(layer);

        let bucket_info = batch
            .iter()
            .map(|address| {
                create_request_bucket_info(address, &self.context.resolutions, four_bit, version)
                    .map_err(FetchError::from)
            })
            .collect::<FetchResult<Vec<_>>>()?;

        let bucket_info = &bucket_info;
        let response = with_access_token(self.tokens.as_ref(), |token| async move {
            self.transport
                .request_buckets(layer_url, &token, bucket_info, self.timeout)
                .await
        })
        .await?;

        let buffer = if four_bit {
            self.decoder.decode_four_bit(response.buffer).await?
        } else {
            response.buffer
        };

        slice_buffer_into_pieces(layer.bucket_byte_length(), batch.len(), &response.missing, &buffer)
    }
}

/// Cut a response buffer into per-bucket payloads.
///
/// The buffer only holds data for buckets that are not missing, so the
/// offset advances for present entries only.
pub fn slice_buffer_into_pieces(
    bucket_byte_length: usize,
    batch_len: usize,
    missing: &[usize],
    buffer: &[u8],
) -> FetchResult<Vec<Option<BucketPayload>>> {
    if let Some(index) = missing.iter().find(|&&index| index >= batch_len) {
        return Err(FetchError::Protocol(format!(
            "missing bucket index {} outside of batch of {}",
            index, batch_len
        )));
    }

    let missing: FxHashSet<usize> = missing.iter().copied().collect();
    let mut offset = 0;
    let mut pieces = Vec::with_capacity(batch_len);

    for index in 0..batch_len {
        if missing.contains(&index) {
            pieces.push(None);
            continue;
        }

        let end = offset + bucket_byte_length;
        let piece = buffer.get(offset..end).ok_or_else(|| {
            FetchError::Protocol(format!(
                "response holds {} bytes, bucket {} needs bytes {}..{}",
                buffer.len(),
                index,
                offset,
                end
            ))
        })?;
        pieces.push(Some(piece.to_vec()));
        offset = end;
    }

    if offset != buffer.len() {
        log::warn!(
            "[BucketFetch] Ignoring {} trailing bytes in bucket response",
            buffer.len() - offset
        );
    }

    Ok(pieces)
}

/// Put fallback results into the slots that were missing, position by
/// position
pub fn merge_fallback(
    mut buffers: Vec<Option<BucketPayload>>,
    missing_indices: &[usize],
    fallback_buffers: Vec<Option<BucketPayload>>,
) -> Vec<Option<BucketPayload>> {
    for (&index, fallback) in missing_indices.iter().zip(fallback_buffers) {
        buffers[index] = fallback;
    }
    buffers
}
