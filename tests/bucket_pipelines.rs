// Integration tests for the fetch and push pipelines
// The stores are replaced by a scripted transport, codecs run on a real pool

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use bucket_stream::network::BucketTransport;
use bucket_stream::streaming::{
    decode_base64, BucketResponse, MemorySaveQueue, RequestBucketInfo, StoreTarget, UpdateAction,
};
use bucket_stream::{
    BucketAddress, BucketFetchPipeline, BucketPushPipeline, CodecPoolConfig, CodecWorkerPool,
    DatasetContext, ElementClass, FetchError, LayerDescriptor, PayloadEncoder, PushError,
    StaticTokenProvider, VolumeTracing, WorkerError,
};

const DATA_STORE: &str = "https://data.example.org";
const TRACING_STORE: &str = "https://tracing.example.org";
const BUCKET_VOXELS: usize = 32 * 32 * 32;

#[derive(Debug, Clone)]
struct RecordedRequest {
    url: String,
    token: String,
    batch: Vec<RequestBucketInfo>,
}

/// Answers requests from a per-URL script and records what was asked
#[derive(Default)]
struct ScriptedTransport {
    script: Mutex<HashMap<String, VecDeque<Result<BucketResponse, FetchError>>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    fn respond(&self, url: &str, response: Result<BucketResponse, FetchError>) {
        self.script
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl BucketTransport for ScriptedTransport {
    async fn request_buckets(
        &self,
        layer_url: &str,
        token: &str,
        batch: &[RequestBucketInfo],
        _timeout: Duration,
    ) -> Result<BucketResponse, FetchError> {
        self.requests.lock().push(RecordedRequest {
            url: layer_url.to_string(),
            token: token.to_string(),
            batch: batch.to_vec(),
        });

        self.script
            .lock()
            .get_mut(layer_url)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Err(FetchError::Http(format!("no response scripted for {}", layer_url))))
    }
}

/// Fails for any payload whose first byte is 0xFF
struct FailingEncoder;

#[async_trait]
impl PayloadEncoder for FailingEncoder {
    async fn encode_base64(&self, payload: Vec<u8>) -> Result<String, WorkerError> {
        if payload.first() == Some(&0xFF) {
            Err(WorkerError::InvalidInput("refusing payload".to_string()))
        } else {
            Ok(bucket_stream::streaming::encode_base64(&payload))
        }
    }
}

fn context(volume: Option<VolumeTracing>, four_bit: bool) -> DatasetContext {
    DatasetContext {
        organization: "lab".to_string(),
        name: "cortex".to_string(),
        data_store_url: DATA_STORE.to_string(),
        tracing_store_url: TRACING_STORE.to_string(),
        resolutions: vec![[1, 1, 1], [2, 2, 1]],
        four_bit,
        layers: vec![
            LayerDescriptor::color("color", ElementClass::Uint8),
            LayerDescriptor::segmentation("segmentation", ElementClass::Uint8),
        ],
        volume,
    }
}

fn codec_pool() -> Arc<CodecWorkerPool> {
    Arc::new(CodecWorkerPool::new(CodecPoolConfig::with_threads(2)).expect("Failed to create codec pool"))
}

fn fetcher(context: DatasetContext, transport: Arc<ScriptedTransport>) -> BucketFetchPipeline {
    BucketFetchPipeline::new(
        Arc::new(context),
        transport,
        Arc::new(StaticTokenProvider::new("secret")),
        codec_pool(),
    )
}

fn layer_url(context: &DatasetContext, store: &str, layer: &str) -> String {
    if store == TRACING_STORE {
        context.tracing_store_layer_url(layer)
    } else {
        context.data_store_layer_url(layer)
    }
}

fn filled(value: u8, buckets: usize) -> Vec<u8> {
    vec![value; BUCKET_VOXELS * buckets]
}

fn batch() -> Vec<BucketAddress> {
    vec![
        BucketAddress::new(0, 0, 0, 0),
        BucketAddress::new(1, 0, 0, 0),
        BucketAddress::new(2, 0, 0, 0),
    ]
}

#[tokio::test]
async fn test_missing_bucket_without_fallback_stays_empty() {
    let ctx = context(None, false);
    let transport = Arc::new(ScriptedTransport::default());
    let mut buffer = filled(1, 1);
    buffer.extend(filled(3, 1));
    transport.respond(
        &layer_url(&ctx, DATA_STORE, "color"),
        Ok(BucketResponse {
            buffer,
            missing: vec![1],
        }),
    );

    let pipeline = fetcher(ctx.clone(), transport.clone());
    let layer = ctx.layer("color").expect("color layer");
    let result = pipeline.fetch_batch(layer, &batch()).await.expect("fetch succeeds");

    assert_eq!(result, vec![Some(filled(1, 1)), None, Some(filled(3, 1))]);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].token, "secret");
    assert_eq!(requests[0].batch.len(), 3);
    assert_eq!(requests[0].batch[1].bucket.position, [32, 0, 0]);
    assert_eq!(requests[0].batch[1].version, None);
}

#[tokio::test]
async fn test_fallback_fills_missing_buckets() {
    let volume = VolumeTracing {
        version: 3,
        fallback_layer: Some("raw".to_string()),
    };
    let ctx = context(Some(volume), false);
    let transport = Arc::new(ScriptedTransport::default());

    let mut buffer = filled(1, 1);
    buffer.extend(filled(3, 1));
    transport.respond(
        &layer_url(&ctx, TRACING_STORE, "segmentation"),
        Ok(BucketResponse {
            buffer,
            missing: vec![1],
        }),
    );
    transport.respond(
        &layer_url(&ctx, DATA_STORE, "raw"),
        Ok(BucketResponse {
            buffer: filled(2, 1),
            missing: vec![],
        }),
    );

    let pipeline = fetcher(ctx.clone(), transport.clone());
    let layer = ctx.layer("segmentation").expect("segmentation layer");
    assert_eq!(pipeline.store_target(layer), StoreTarget::TracingStore);

    let result = pipeline.fetch_batch(layer, &batch()).await.expect("fetch succeeds");
    assert_eq!(
        result,
        vec![Some(filled(1, 1)), Some(filled(2, 1)), Some(filled(3, 1))]
    );

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url, "https://tracing.example.org/tracings/volume/segmentation");
    assert_eq!(requests[0].batch[0].version, Some(3));
    assert_eq!(
        requests[1].url,
        "https://data.example.org/data/datasets/lab/cortex/layers/raw"
    );
    assert_eq!(requests[1].batch.len(), 1);
    assert_eq!(requests[1].batch[0].bucket.position, [32, 0, 0]);
}

#[tokio::test]
async fn test_fallback_that_also_misses_leaves_slot_empty() {
    let volume = VolumeTracing {
        version: 1,
        fallback_layer: Some("raw".to_string()),
    };
    let ctx = context(Some(volume), false);
    let transport = Arc::new(ScriptedTransport::default());
    transport.respond(
        &layer_url(&ctx, TRACING_STORE, "segmentation"),
        Ok(BucketResponse {
            buffer: filled(5, 1),
            missing: vec![0, 2],
        }),
    );
    transport.respond(
        &layer_url(&ctx, DATA_STORE, "raw"),
        Ok(BucketResponse {
            buffer: filled(7, 1),
            missing: vec![0],
        }),
    );

    let pipeline = fetcher(ctx.clone(), transport);
    let layer = ctx.layer("segmentation").expect("segmentation layer");
    let result = pipeline.fetch_batch(layer, &batch()).await.expect("fetch succeeds");

    assert_eq!(result, vec![None, Some(filled(5, 1)), Some(filled(7, 1))]);
}

#[tokio::test]
async fn test_data_store_misses_are_not_retried() {
    // Segmentation without an annotation reads from the data store
    let ctx = context(None, false);
    let transport = Arc::new(ScriptedTransport::default());
    transport.respond(
        &layer_url(&ctx, DATA_STORE, "segmentation"),
        Ok(BucketResponse {
            buffer: Vec::new(),
            missing: vec![0],
        }),
    );

    let pipeline = fetcher(ctx.clone(), transport.clone());
    let layer = ctx.layer("segmentation").expect("segmentation layer");
    assert_eq!(pipeline.store_target(layer), StoreTarget::DataStore);

    let result = pipeline
        .fetch_batch(layer, &[BucketAddress::new(0, 0, 0, 0)])
        .await
        .expect("fetch succeeds");

    assert_eq!(result, vec![None]);
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_color_is_read_from_data_store_while_annotating() {
    let volume = VolumeTracing {
        version: 4,
        fallback_layer: None,
    };
    let ctx = context(Some(volume), false);
    let transport = Arc::new(ScriptedTransport::default());
    transport.respond(
        &layer_url(&ctx, DATA_STORE, "color"),
        Ok(BucketResponse {
            buffer: filled(9, 1),
            missing: vec![],
        }),
    );

    let pipeline = fetcher(ctx.clone(), transport.clone());
    let layer = ctx.layer("color").expect("color layer");
    let result = pipeline
        .fetch_batch(layer, &[BucketAddress::new(0, 0, 0, 0)])
        .await
        .expect("fetch succeeds");

    assert_eq!(result, vec![Some(filled(9, 1))]);
    let requests = transport.requests();
    assert_eq!(requests[0].url, "https://data.example.org/data/datasets/lab/cortex/layers/color");
    assert_eq!(requests[0].batch[0].version, None);
}

#[tokio::test]
async fn test_four_bit_color_is_expanded() {
    let ctx = context(None, true);
    let transport = Arc::new(ScriptedTransport::default());
    transport.respond(
        &layer_url(&ctx, DATA_STORE, "color"),
        Ok(BucketResponse {
            buffer: vec![0x12; BUCKET_VOXELS / 2],
            missing: vec![],
        }),
    );

    let pipeline = fetcher(ctx.clone(), transport.clone());
    let layer = ctx.layer("color").expect("color layer");
    let result = pipeline
        .fetch_batch(layer, &[BucketAddress::new(0, 0, 0, 0)])
        .await
        .expect("fetch succeeds");

    let expected: Vec<u8> = [0x10, 0x20].repeat(BUCKET_VOXELS / 2);
    assert_eq!(result, vec![Some(expected)]);
    assert!(transport.requests()[0].batch[0].four_bit);
}

#[tokio::test]
async fn test_segmentation_is_never_four_bit() {
    let ctx = context(None, true);
    let transport = Arc::new(ScriptedTransport::default());
    transport.respond(
        &layer_url(&ctx, DATA_STORE, "segmentation"),
        Ok(BucketResponse {
            buffer: filled(0x12, 1),
            missing: vec![],
        }),
    );

    let pipeline = fetcher(ctx.clone(), transport.clone());
    let layer = ctx.layer("segmentation").expect("segmentation layer");
    let result = pipeline
        .fetch_batch(layer, &[BucketAddress::new(0, 0, 0, 0)])
        .await
        .expect("fetch succeeds");

    assert_eq!(result, vec![Some(filled(0x12, 1))]);
    assert!(!transport.requests()[0].batch[0].four_bit);
}

#[tokio::test]
async fn test_transport_failure_aborts_batch() {
    let ctx = context(None, false);
    let transport = Arc::new(ScriptedTransport::default());
    transport.respond(
        &layer_url(&ctx, DATA_STORE, "color"),
        Err(FetchError::HttpStatus { status: 500 }),
    );

    let pipeline = fetcher(ctx.clone(), transport);
    let layer = ctx.layer("color").expect("color layer");
    let result = pipeline.fetch_batch(layer, &batch()).await;

    assert_eq!(result, Err(FetchError::HttpStatus { status: 500 }));
}

#[tokio::test]
async fn test_fallback_failure_aborts_batch() {
    let volume = VolumeTracing {
        version: 1,
        fallback_layer: Some("raw".to_string()),
    };
    let ctx = context(Some(volume), false);
    let transport = Arc::new(ScriptedTransport::default());
    transport.respond(
        &layer_url(&ctx, TRACING_STORE, "segmentation"),
        Ok(BucketResponse {
            buffer: Vec::new(),
            missing: vec![0],
        }),
    );
    transport.respond(
        &layer_url(&ctx, DATA_STORE, "raw"),
        Err(FetchError::Timeout { timeout_ms: 30_000 }),
    );

    let pipeline = fetcher(ctx.clone(), transport);
    let layer = ctx.layer("segmentation").expect("segmentation layer");
    let result = pipeline
        .fetch_batch(layer, &[BucketAddress::new(0, 0, 0, 0)])
        .await;

    assert_eq!(result, Err(FetchError::Timeout { timeout_ms: 30_000 }));
}

#[tokio::test]
async fn test_rejected_token_is_refreshed_once() {
    let ctx = context(None, false);
    let transport = Arc::new(ScriptedTransport::default());
    let url = layer_url(&ctx, DATA_STORE, "color");
    transport.respond(&url, Err(FetchError::Unauthorized { status: 401 }));
    transport.respond(
        &url,
        Ok(BucketResponse {
            buffer: filled(4, 1),
            missing: vec![],
        }),
    );

    let pipeline = fetcher(ctx.clone(), transport.clone());
    let layer = ctx.layer("color").expect("color layer");
    let result = pipeline
        .fetch_batch(layer, &[BucketAddress::new(0, 0, 0, 0)])
        .await
        .expect("second attempt succeeds");

    assert_eq!(result, vec![Some(filled(4, 1))]);
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn test_unknown_zoom_step_is_rejected_before_request() {
    let ctx = context(None, false);
    let transport = Arc::new(ScriptedTransport::default());

    let pipeline = fetcher(ctx.clone(), transport.clone());
    let layer = ctx.layer("color").expect("color layer");
    let result = pipeline
        .fetch_batch(layer, &[BucketAddress::new(0, 0, 0, 5)])
        .await;

    assert_eq!(result, Err(FetchError::UnknownResolution { zoom_step: 5 }));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_unaddressable_bucket_is_rejected_before_request() {
    let ctx = context(None, false);
    let transport = Arc::new(ScriptedTransport::default());

    let pipeline = fetcher(ctx.clone(), transport.clone());
    let layer = ctx.layer("color").expect("color layer");
    let result = pipeline
        .fetch_batch(layer, &[BucketAddress::new(u32::MAX, 0, 0, 0)])
        .await;

    assert!(matches!(result, Err(FetchError::AddressOutOfRange { .. })));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_push_submits_one_volume_transaction_in_order() {
    let ctx = Arc::new(context(None, false));
    let queue = Arc::new(MemorySaveQueue::new());
    let pipeline = BucketPushPipeline::new(ctx, codec_pool(), queue.clone());

    pipeline
        .push_batch(vec![
            (BucketAddress::new(1, 2, 3, 1), vec![7; 16]),
            (BucketAddress::new(0, 0, 0, 0), vec![8; 16]),
        ])
        .await
        .expect("push succeeds");

    let transactions = queue.drain();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].category, "volume");

    let items = &transactions[0].items;
    assert_eq!(items.len(), 2);

    let UpdateAction::UpdateBucket(first) = &items[0];
    assert_eq!(first.bucket.position, [64, 128, 96]);
    assert_eq!(first.bucket.zoom_step, 1);
    assert_eq!(first.bucket.cube_size, 32);
    assert_eq!(decode_base64(&first.base64_data).expect("valid base64"), vec![7; 16]);

    let UpdateAction::UpdateBucket(second) = &items[1];
    assert_eq!(second.bucket.position, [0, 0, 0]);
    assert_eq!(decode_base64(&second.base64_data).expect("valid base64"), vec![8; 16]);
}

#[tokio::test]
async fn test_push_is_all_or_nothing() {
    let ctx = Arc::new(context(None, false));
    let queue = Arc::new(MemorySaveQueue::new());
    let pipeline = BucketPushPipeline::new(ctx, Arc::new(FailingEncoder), queue.clone());

    let result = pipeline
        .push_batch(vec![
            (BucketAddress::new(0, 0, 0, 0), vec![1; 8]),
            (BucketAddress::new(1, 0, 0, 0), vec![0xFF; 8]),
            (BucketAddress::new(2, 0, 0, 0), vec![3; 8]),
        ])
        .await;

    assert!(matches!(result, Err(PushError::Worker(WorkerError::InvalidInput(_)))));
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_empty_push_submits_nothing() {
    let ctx = Arc::new(context(None, false));
    let queue = Arc::new(MemorySaveQueue::new());
    let pipeline = BucketPushPipeline::new(ctx, codec_pool(), queue.clone());

    pipeline.push_batch(Vec::new()).await.expect("empty push succeeds");
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_push_rejects_unknown_zoom_step() {
    let ctx = Arc::new(context(None, false));
    let queue = Arc::new(MemorySaveQueue::new());
    let pipeline = BucketPushPipeline::new(ctx, codec_pool(), queue.clone());

    let result = pipeline
        .push_batch(vec![(BucketAddress::new(0, 0, 0, 9), vec![1; 8])])
        .await;

    assert_eq!(result, Err(PushError::UnknownResolution { zoom_step: 9 }));
    assert!(queue.is_empty());
}
