use std::sync::Arc;

use crate::config::{DatasetContext, PipelineSettings, StreamingConfig};
use crate::error::{FetchError, FetchResult, PlannerResult, PushResult, WorkerError};
use crate::gpu::CapabilityLimits;
use crate::network::{BucketTransport, TokenProvider};
use crate::streaming::{BucketAddress, BucketFetchPipeline, BucketPayload, BucketPushPipeline, SaveQueue};
use crate::texture_budget::{TextureSetup, TextureSetupCache};
use crate::thread_pool::{CodecPoolConfig, CodecWorkerPool};

/// Everything one viewer session needs to plan textures and move buckets.
///
/// The dataset context is frozen at construction; the capability limits can
/// be replaced, which invalidates the cached texture setup.
pub struct StreamingSession {
    context: Arc<DatasetContext>,
    settings: PipelineSettings,
    limits: CapabilityLimits,
    codecs: Arc<CodecWorkerPool>,
    setup_cache: TextureSetupCache,
    fetcher: BucketFetchPipeline,
    pusher: BucketPushPipeline,
}

impl StreamingSession {
    pub fn new(
        config: StreamingConfig,
        limits: CapabilityLimits,
        transport: Arc<dyn BucketTransport>,
        tokens: Arc<dyn TokenProvider>,
        save_queue: Arc<dyn SaveQueue>,
    ) -> Result<Self, WorkerError> {
        let StreamingConfig { dataset, pipeline } = config;
        let context = Arc::new(dataset);
        let codecs = Arc::new(CodecWorkerPool::new(CodecPoolConfig::with_threads(
            pipeline.resolved_worker_threads(),
        ))?);

        let fetcher = BucketFetchPipeline::new(context.clone(), transport, tokens, codecs.clone())
            .with_timeout(pipeline.request_timeout());
        let pusher = BucketPushPipeline::new(context.clone(), codecs.clone(), save_queue);

        log::info!(
            "[Session] {}/{}: {} layers, {} codec workers",
            context.organization,
            context.name,
            context.layers.len(),
            codecs.thread_count()
        );

        Ok(Self {
            context,
            settings: pipeline,
            limits,
            codecs,
            setup_cache: TextureSetupCache::new(),
            fetcher,
            pusher,
        })
    }

    pub fn context(&self) -> &DatasetContext {
        &self.context
    }

    pub fn limits(&self) -> CapabilityLimits {
        self.limits
    }

    pub fn update_limits(&mut self, limits: CapabilityLimits) {
        self.limits = limits;
    }

    pub fn codecs(&self) -> &CodecWorkerPool {
        &self.codecs
    }

    pub fn fetcher(&self) -> &BucketFetchPipeline {
        &self.fetcher
    }

    pub fn pusher(&self) -> &BucketPushPipeline {
        &self.pusher
    }

    /// Texture setup for the dataset's layers under the current limits
    pub fn texture_setup(&self) -> PlannerResult<Arc<TextureSetup>> {
        self.setup_cache.get_or_plan(
            &self.limits,
            &self.context.layers,
            self.settings.required_bucket_capacity,
            self.context.has_segmentation(),
        )
    }

    /// Bucket volume the lookup buffer of the configured GPU factor covers
    pub fn address_space_dimensions(&self) -> [u32; 3] {
        self.settings.gpu_factor.address_space_dimensions()
    }

    pub async fn fetch_batch(
        &self,
        layer_name: &str,
        batch: &[BucketAddress],
    ) -> FetchResult<Vec<Option<BucketPayload>>> {
        let layer = self
            .context
            .layer(layer_name)
            .ok_or_else(|| FetchError::UnknownLayer {
                name: layer_name.to_string(),
            })?;
        self.fetcher.fetch_batch(layer, batch).await
    }

    pub async fn push_batch(&self, edits: Vec<(BucketAddress, BucketPayload)>) -> PushResult<()> {
        self.pusher.push_batch(edits).await
    }
}
