//! Orchestration service: the public entry point for processing requests

use crate::config::{Config, ProcessingOptions, RetryConfig};
use crate::error::{Error, Result};
use crate::ffmpeg::{FfmpegCli, TransformExecutor};
use crate::pipeline::{BatchResults, Job, Pipeline, WorkerPool, run_with_deadline};
use crate::progress::{ProgressPublisher, ProgressReporter, ProgressUpdate};
use crate::retry::retry_with_backoff;
use crate::storage::{LocalStorage, StorageProvider};
use crate::types::{AudioMetadata, BatchJob, JobId, ProcessingResult, Stage};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Audio processing service
///
/// Owns the pipeline, the worker pool and the progress publisher. Cheap to share
/// behind an `Arc`; every operation takes `&self`.
///
/// # Example
///
/// ```no_run
/// use audioflow::{AudioService, Config, ProcessingOptions};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() -> audioflow::Result<()> {
/// let service = AudioService::new(Config::default())?;
/// let cancel = CancellationToken::new();
///
/// let result = service
///     .process_one("in.wav", "out.opus", ProcessingOptions::default(), &cancel)
///     .await?;
/// println!("encoded {} in {:?}", result.output_path.display(), result.elapsed);
/// # Ok(())
/// # }
/// ```
pub struct AudioService {
    config: Config,
    pipeline: Arc<Pipeline>,
    pool: WorkerPool,
    progress: Arc<ProgressPublisher>,
}

impl AudioService {
    /// Create a service using the external ffmpeg/ffprobe tools and the local filesystem
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid or a tool binary
    /// cannot be found.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let executor = FfmpegCli::discover(config.ffmpeg_path.clone(), config.ffprobe_path.clone())?;
        info!(
            ffmpeg = %executor.ffmpeg_path().display(),
            ffprobe = %executor.ffprobe_path().display(),
            "using external audio tools"
        );
        Self::with_collaborators(config, Arc::new(executor), Arc::new(LocalStorage::new()))
    }

    /// Create a service over explicit collaborators
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn with_collaborators(
        config: Config,
        executor: Arc<dyn TransformExecutor>,
        storage: Arc<dyn StorageProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let pipeline = Arc::new(Pipeline::new(executor, storage));
        let pool = WorkerPool::new(Arc::clone(&pipeline), config.workers);

        info!(
            workers = config.workers,
            max_attempts = config.retry.max_attempts,
            "audio service initialized"
        );

        Ok(Self {
            config,
            pipeline,
            pool,
            progress: Arc::new(ProgressPublisher::new()),
        })
    }

    /// Service configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Progress publisher shared by every job run through this service
    pub fn progress(&self) -> &Arc<ProgressPublisher> {
        &self.progress
    }

    /// Subscribe to progress updates for all jobs
    ///
    /// Updates that do not fit in `buffer` are dropped.
    pub fn subscribe(&self, buffer: usize) -> mpsc::Receiver<ProgressUpdate> {
        self.progress.subscribe(buffer)
    }

    /// Process a single file with retry and a per-job deadline
    ///
    /// The attempt budget and first backoff delay come from `options`
    /// (`max_retries`, `retry_delay`); backoff growth and cap come from the service
    /// configuration. The deadline in `options.timeout` covers all attempts together.
    ///
    /// # Errors
    ///
    /// Validation failures are returned after a single attempt. Execution and
    /// processing failures are returned once the attempt budget is exhausted.
    pub async fn process_one(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        options: ProcessingOptions,
        cancel: &CancellationToken,
    ) -> Result<ProcessingResult> {
        let input = input.as_ref();
        let output = output.as_ref();
        let retry = RetryConfig {
            max_attempts: options.max_retries,
            initial_delay: options.retry_delay,
            ..self.config.retry.clone()
        };
        let timeout = options.timeout;
        let job = Job::new(
            JobId::generate(&input.to_string_lossy()),
            input,
            output,
            options,
            Arc::clone(&self.progress) as Arc<dyn ProgressReporter>,
        );
        let job_id = job.id().clone();

        info!(
            job_id = %job_id,
            input = %input.display(),
            output = %output.display(),
            "processing file"
        );

        let result = run_with_deadline(timeout, cancel, |scoped| async move {
            retry_with_backoff(&retry, &scoped, || self.pipeline.run(&job, &scoped)).await
        })
        .await;

        match &result {
            Ok(r) => info!(
                job_id = %job_id,
                elapsed_ms = r.elapsed.as_millis() as u64,
                "file processed"
            ),
            Err(e) => error!(
                job_id = %job_id,
                error = %e,
                kind = %e.kind(),
                "file processing failed"
            ),
        }
        result
    }

    /// Process many files concurrently, bounded by the configured worker count
    ///
    /// Returns immediately with a stream yielding one result per job in completion
    /// order. Batch jobs are not retried; each job's own deadline still applies.
    pub fn process_batch(&self, jobs: Vec<BatchJob>, cancel: &CancellationToken) -> BatchResults {
        info!(job_count = jobs.len(), "processing batch");
        self.pool.run(
            jobs,
            Arc::clone(&self.progress) as Arc<dyn ProgressReporter>,
            cancel.clone(),
        )
    }

    /// Inspect a file without transforming it
    ///
    /// # Errors
    ///
    /// Returns a validation failure for an empty path or a missing file, and a
    /// processing failure at the probe stage if the file cannot be inspected.
    pub async fn probe_only(
        &self,
        input: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> Result<AudioMetadata> {
        let input = input.as_ref();
        if input.as_os_str().is_empty() {
            return Err(Error::validation("input_path", "", "input path is required"));
        }

        let exists = self
            .pipeline
            .storage()
            .exists(input)
            .await
            .map_err(|e| Error::processing(Stage::Probe, "failed to check input file", e))?;
        if !exists {
            return Err(Error::validation(
                "input_path",
                input.display(),
                "input file does not exist",
            ));
        }

        self.pipeline.probe(input, cancel).await
    }
}

impl std::fmt::Debug for AudioService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioService")
            .field("config", &self.config)
            .field("workers", &self.pool.workers())
            .field("subscribers", &self.progress.subscriber_count())
            .finish()
    }
}
