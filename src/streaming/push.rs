//! Bucket push pipeline
//!
//! Edited buckets are encoded on the codec workers and submitted to the
//! save queue as one transaction. Either every bucket of a batch reaches the
//! queue or none does.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use parking_lot::Mutex;

use super::address::{create_send_bucket_info, BucketAddress};
use super::fetch::BucketPayload;
use super::wire::UpdateAction;
use crate::config::DatasetContext;
use crate::constants::protocol::VOLUME_TRANSACTION;
use crate::error::{PushError, PushResult};
use crate::thread_pool::PayloadEncoder;

/// External persistence queue
#[async_trait]
pub trait SaveQueue: Send + Sync {
    async fn push_transaction(&self, items: Vec<UpdateAction>, category: &str) -> PushResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTransaction {
    pub category: String,
    pub items: Vec<UpdateAction>,
}

/// Save queue that keeps transactions in memory until drained
#[derive(Default)]
pub struct MemorySaveQueue {
    transactions: Mutex<Vec<SaveTransaction>>,
}

impl MemorySaveQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.transactions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.lock().is_empty()
    }

    pub fn drain(&self) -> Vec<SaveTransaction> {
        std::mem::take(&mut *self.transactions.lock())
    }
}

#[async_trait]
impl SaveQueue for MemorySaveQueue {
    async fn push_transaction(&self, items: Vec<UpdateAction>, category: &str) -> PushResult<()> {
        self.transactions.lock().push(SaveTransaction {
            category: category.to_string(),
            items,
        });
        Ok(())
    }
}

pub struct BucketPushPipeline {
    context: Arc<DatasetContext>,
    encoder: Arc<dyn PayloadEncoder>,
    queue: Arc<dyn SaveQueue>,
}

impl BucketPushPipeline {
    pub fn new(
        context: Arc<DatasetContext>,
        encoder: Arc<dyn PayloadEncoder>,
        queue: Arc<dyn SaveQueue>,
    ) -> Self {
        Self {
            context,
            encoder,
            queue,
        }
    }

    /// Encode and submit edited buckets in edit order
    pub async fn push_batch(&self, edits: Vec<(BucketAddress, BucketPayload)>) -> PushResult<()> {
        if edits.is_empty() {
            return Ok(());
        }

        let bucket_infos = edits
            .iter()
            .map(|(address, _)| {
                create_send_bucket_info(address, &self.context.resolutions).map_err(PushError::from)
            })
            .collect::<PushResult<Vec<_>>>()?;

        // Encodes run concurrently; try_join_all keeps input order and fails
        // the whole batch on the first error.
        let encoded = try_join_all(
            edits
                .into_iter()
                .map(|(_, payload)| self.encoder.encode_base64(payload)),
        )
        .await?;

        let items: Vec<UpdateAction> = bucket_infos
            .into_iter()
            .zip(encoded)
            .map(|(info, base64)| UpdateAction::update_bucket(info, base64))
            .collect();

        log::debug!("[BucketPush] Submitting {} bucket updates", items.len());
        self.queue.push_transaction(items, VOLUME_TRANSACTION).await
    }
}
