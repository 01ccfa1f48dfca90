//! Single-job processing pipeline
//!
//! A job moves through fixed stages: validate, probe the input, encode, verify the
//! output, done. Each stage is a separate submodule; [`Pipeline::run`] strings them
//! together and reports progress at every checkpoint.
//!
//! The pipeline itself never retries. Retry and deadlines are layered on by the caller
//! ([`crate::AudioService`] for single files, [`WorkerPool`] for batches).

mod encode;
mod probe;
mod validate;
mod worker_pool;

pub use encode::{build_filter_chain, build_transform_args, codec_args};
pub use worker_pool::{BatchResults, WorkerPool};

use crate::config::ProcessingOptions;
use crate::error::{Error, Result};
use crate::ffmpeg::TransformExecutor;
use crate::progress::{JobProgress, ProgressReporter};
use crate::storage::StorageProvider;
use crate::types::{AudioMetadata, JobId, ProcessingResult, Stage};
use chrono::Utc;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One unit of work: a source file, a destination and the options to apply
///
/// Immutable after construction; retries of the same job share its progress handle so
/// reported percentages stay monotonic.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    input_path: PathBuf,
    output_path: PathBuf,
    options: Arc<ProcessingOptions>,
    progress: JobProgress,
}

impl Job {
    /// Create a job reporting progress into `reporter`
    pub fn new(
        id: JobId,
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        options: ProcessingOptions,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            progress: JobProgress::new(id.clone(), reporter),
            id,
            input_path: input_path.into(),
            output_path: output_path.into(),
            options: Arc::new(options),
        }
    }

    /// Job identifier
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Source file
    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    /// Destination file
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Options applied to this job
    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }

    /// Progress handle for this job
    pub fn progress(&self) -> &JobProgress {
        &self.progress
    }
}

/// Runs jobs through validate, probe, encode and verify
///
/// The pipeline is stateless between jobs and safe to share across workers.
pub struct Pipeline {
    executor: Arc<dyn TransformExecutor>,
    storage: Arc<dyn StorageProvider>,
}

impl Pipeline {
    /// Create a pipeline over the given collaborators
    pub fn new(executor: Arc<dyn TransformExecutor>, storage: Arc<dyn StorageProvider>) -> Self {
        Self { executor, storage }
    }

    /// Storage collaborator
    pub fn storage(&self) -> &Arc<dyn StorageProvider> {
        &self.storage
    }

    /// Run one job to completion
    ///
    /// Cancellation is checked at every stage boundary and observed by every tool
    /// invocation. A failure to inspect the output after a successful encode is logged
    /// and reported as zero-valued output metadata rather than failing the job.
    pub async fn run(&self, job: &Job, cancel: &CancellationToken) -> Result<ProcessingResult> {
        let start = Instant::now();
        info!(
            job_id = %job.id(),
            input = %job.input_path().display(),
            output = %job.output_path().display(),
            codec = %job.options().codec,
            "starting pipeline"
        );

        validate::run_validate_stage(job, &self.storage).await?;
        ensure_active(cancel)?;

        let input_meta = probe::probe_file(&self.executor, job.input_path(), cancel).await?;
        job.progress().report(Stage::Probe, 5.0, "input probed");
        debug!(
            job_id = %job.id(),
            duration_secs = input_meta.duration.as_secs_f64(),
            sample_rate = input_meta.sample_rate,
            channels = input_meta.channels,
            "input probed"
        );
        ensure_active(cancel)?;

        encode::run_encode_stage(job, &self.executor, cancel).await?;
        ensure_active(cancel)?;

        let output_meta =
            match probe::probe_file(&self.executor, job.output_path(), cancel).await {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(
                        job_id = %job.id(),
                        output = %job.output_path().display(),
                        error = %e,
                        stage = %Stage::Verify,
                        "failed to probe output file, returning empty metadata"
                    );
                    AudioMetadata::default()
                }
            };

        job.progress().report(Stage::Done, 100.0, "done");

        let elapsed = start.elapsed();
        info!(
            job_id = %job.id(),
            elapsed_ms = elapsed.as_millis() as u64,
            output_size = output_meta.size,
            "pipeline completed"
        );

        Ok(ProcessingResult {
            input_path: job.input_path().to_path_buf(),
            output_path: job.output_path().to_path_buf(),
            input_meta,
            output_meta,
            elapsed,
            processed_at: Utc::now(),
        })
    }

    /// Inspect a single file without transforming it
    pub async fn probe(&self, path: &Path, cancel: &CancellationToken) -> Result<AudioMetadata> {
        ensure_active(cancel)?;
        probe::probe_file(&self.executor, path, cancel).await
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Canceled);
    }
    Ok(())
}

/// Run `work` under a deadline derived from `cancel`
///
/// `work` receives a child token that fires when either the caller cancels or the
/// deadline elapses, so in-flight tool invocations are terminated in both cases. A
/// zero `timeout` disables the deadline.
pub(crate) async fn run_with_deadline<F, Fut, T>(
    timeout: Duration,
    cancel: &CancellationToken,
    work: F,
) -> Result<T>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if timeout.is_zero() {
        return work(cancel.clone()).await;
    }

    let scoped = cancel.child_token();
    match tokio::time::timeout(timeout, work(scoped.clone())).await {
        Ok(result) => result,
        Err(_) => {
            scoped.cancel();
            Err(Error::Timeout(timeout))
        }
    }
}
