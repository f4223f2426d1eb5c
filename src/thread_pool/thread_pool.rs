//! Codec Worker Pool
//!
//! Runs CPU-bound payload transforms (four-bit expansion, base64) off the
//! async caller:
//! - Each job is a request message executed on a rayon worker
//! - The result travels back over a oneshot channel
//! - A job that panics drops its reply channel, which the caller sees as
//!   `WorkerError::Disconnected`

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tokio::sync::oneshot;

use crate::error::WorkerError;
use crate::streaming::compression;

/// Configuration for the codec pool
#[derive(Debug, Clone)]
pub struct CodecPoolConfig {
    /// Number of worker threads
    pub threads: usize,
    /// Enable thread naming
    pub enable_thread_names: bool,
    /// Stack size for worker threads (in bytes)
    pub stack_size: Option<usize>,
}

impl Default for CodecPoolConfig {
    fn default() -> Self {
        Self {
            threads: num_cpus::get().max(1),
            enable_thread_names: true,
            stack_size: Some(2 * 1024 * 1024), // 2MB stack per thread
        }
    }
}

impl CodecPoolConfig {
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
            ..Self::default()
        }
    }
}

/// Lock-free job counters
#[derive(Debug, Default)]
pub struct PoolCounters {
    pub jobs_submitted: AtomicU64,
    pub jobs_completed: AtomicU64,
    pub jobs_failed: AtomicU64,
    pub total_execution_time_ns: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CodecPoolStats {
    pub jobs_submitted: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub average_job_time_ms: f64,
}

/// Expands four-bit transfer data to one byte per voxel
#[async_trait]
pub trait VoxelDecoder: Send + Sync {
    async fn decode_four_bit(&self, packed: Vec<u8>) -> Result<Vec<u8>, WorkerError>;
}

/// Turns bucket payloads into transport-safe text
#[async_trait]
pub trait PayloadEncoder: Send + Sync {
    async fn encode_base64(&self, payload: Vec<u8>) -> Result<String, WorkerError>;
}

/// Bounded pool of codec workers
pub struct CodecWorkerPool {
    pool: ThreadPool,
    counters: Arc<PoolCounters>,
}

impl CodecWorkerPool {
    pub fn new(config: CodecPoolConfig) -> Result<Self, WorkerError> {
        let counters = Arc::new(PoolCounters::default());
        let panic_counters = counters.clone();

        let mut builder = ThreadPoolBuilder::new()
            .num_threads(config.threads.max(1))
            .panic_handler(move |_| {
                panic_counters.jobs_failed.fetch_add(1, Ordering::Relaxed);
                log::error!("[CodecPool] Worker job panicked");
            });

        if config.enable_thread_names {
            builder = builder.thread_name(|idx| format!("codec-worker-{}", idx));
        }

        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let pool = builder
            .build()
            .map_err(|e| WorkerError::PoolCreation(e.to_string()))?;

        log::debug!("[CodecPool] Started {} workers", pool.current_num_threads());

        Ok(Self { pool, counters })
    }

    /// Run a job on a worker and wait for its reply without blocking the
    /// calling task
    pub async fn run<F, R>(&self, job: F) -> Result<R, WorkerError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let counters = self.counters.clone();
        counters.jobs_submitted.fetch_add(1, Ordering::Relaxed);

        self.pool.spawn(move || {
            let start = Instant::now();
            let result = job();

            let elapsed_ns = start.elapsed().as_nanos() as u64;
            counters.jobs_completed.fetch_add(1, Ordering::Relaxed);
            counters
                .total_execution_time_ns
                .fetch_add(elapsed_ns, Ordering::Relaxed);

            // The caller may have dropped its future already
            let _ = reply_tx.send(result);
        });

        reply_rx.await.map_err(|_| WorkerError::Disconnected)
    }

    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn stats(&self) -> CodecPoolStats {
        let completed = self.counters.jobs_completed.load(Ordering::Relaxed);
        let total_ns = self.counters.total_execution_time_ns.load(Ordering::Relaxed);

        CodecPoolStats {
            jobs_submitted: self.counters.jobs_submitted.load(Ordering::Relaxed),
            jobs_completed: completed,
            jobs_failed: self.counters.jobs_failed.load(Ordering::Relaxed),
            average_job_time_ms: if completed > 0 {
                total_ns as f64 / completed as f64 / 1_000_000.0
            } else {
                0.0
            },
        }
    }
}

#[async_trait]
impl VoxelDecoder for CodecWorkerPool {
    async fn decode_four_bit(&self, packed: Vec<u8>) -> Result<Vec<u8>, WorkerError> {
        self.run(move || compression::decode_four_bit(&packed)).await
    }
}

#[async_trait]
impl PayloadEncoder for CodecWorkerPool {
    async fn encode_base64(&self, payload: Vec<u8>) -> Result<String, WorkerError> {
        self.run(move || compression::encode_base64(&payload)).await
    }
}
