//! Bounded-concurrency batch execution

use super::{Job, Pipeline, run_with_deadline};
use crate::error::{Error, Result};
use crate::progress::ProgressReporter;
use crate::types::{BatchJob, BatchResult, ProcessingResult, Stage};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Stream of per-job outcomes, in completion order
///
/// Yields exactly one [`BatchResult`] per submitted job and then ends.
pub type BatchResults = ReceiverStream<BatchResult>;

/// Runs batches of jobs through a [`Pipeline`] with at most `workers` in flight
///
/// Jobs are admitted in submission order. Once the cancellation token fires, jobs not
/// yet admitted complete immediately with [`Error::Canceled`]; jobs already running
/// observe the same token and stop at their next cancellation point.
pub struct WorkerPool {
    pipeline: Arc<Pipeline>,
    workers: usize,
}

impl WorkerPool {
    /// Create a pool of `workers` slots (at least one)
    pub fn new(pipeline: Arc<Pipeline>, workers: usize) -> Self {
        Self {
            pipeline,
            workers: workers.max(1),
        }
    }

    /// Number of jobs allowed to run concurrently
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Start processing `jobs` and return the stream of their results
    ///
    /// Returns immediately; processing continues on spawned tasks. The result channel
    /// holds one slot per job, so workers never block on a slow consumer and a dropped
    /// stream does not stall the batch. An empty batch yields an already-closed stream.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run(
        &self,
        jobs: Vec<BatchJob>,
        reporter: Arc<dyn ProgressReporter>,
        cancel: CancellationToken,
    ) -> BatchResults {
        let (tx, rx) = mpsc::channel(jobs.len().max(1));

        if jobs.is_empty() {
            return ReceiverStream::new(rx);
        }

        info!(
            job_count = jobs.len(),
            workers = self.workers,
            "starting batch"
        );

        let dispatcher = Dispatcher {
            pipeline: Arc::clone(&self.pipeline),
            semaphore: Arc::new(Semaphore::new(self.workers)),
            reporter,
            tx,
            cancel,
        };
        tokio::spawn(dispatcher.dispatch(jobs));

        ReceiverStream::new(rx)
    }
}

struct Dispatcher {
    pipeline: Arc<Pipeline>,
    semaphore: Arc<Semaphore>,
    reporter: Arc<dyn ProgressReporter>,
    tx: mpsc::Sender<BatchResult>,
    cancel: CancellationToken,
}

impl Dispatcher {
    /// Admit jobs one by one as worker slots free up
    ///
    /// The stream closes once this task and every spawned worker have dropped their
    /// sender.
    async fn dispatch(self, jobs: Vec<BatchJob>) {
        for job in jobs {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                permit = Arc::clone(&self.semaphore).acquire_owned() => permit.ok(),
            };

            let Some(permit) = permit else {
                debug!(job_id = %job.id, "batch cancelled before job was admitted");
                deliver(
                    &self.tx,
                    BatchResult {
                        job_id: job.id,
                        result: Err(Error::Canceled),
                    },
                )
                .await;
                continue;
            };

            let pipeline = Arc::clone(&self.pipeline);
            let reporter = Arc::clone(&self.reporter);
            let tx = self.tx.clone();
            let cancel = self.cancel.clone();

            tokio::spawn(async move {
                let _permit = permit;
                let job_id = job.id.clone();

                let result = AssertUnwindSafe(process_job(&pipeline, job, reporter, &cancel))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        let reason = panic_message(panic.as_ref());
                        error!(job_id = %job_id, reason = %reason, "job worker panicked");
                        Err(Error::Processing {
                            stage: Stage::Done,
                            message: format!("job worker panicked: {}", reason),
                            source: None,
                        })
                    });

                deliver(&tx, BatchResult { job_id, result }).await;
            });
        }
    }
}

async fn process_job(
    pipeline: &Pipeline,
    batch_job: BatchJob,
    reporter: Arc<dyn ProgressReporter>,
    cancel: &CancellationToken,
) -> Result<ProcessingResult> {
    let options = batch_job.options.unwrap_or_default();
    let timeout = options.timeout;
    let job_id = batch_job.id.clone();
    let job = Job::new(
        batch_job.id,
        batch_job.input_path,
        batch_job.output_path,
        options,
        reporter,
    );

    let result = run_with_deadline(timeout, cancel, |scoped| async move {
        pipeline.run(&job, &scoped).await
    })
    .await;

    if let Err(e) = &result {
        error!(job_id = %job_id, error = %e, kind = %e.kind(), "batch job failed");
    }
    result
}

async fn deliver(tx: &mpsc::Sender<BatchResult>, result: BatchResult) {
    if tx.send(result).await.is_err() {
        debug!("batch result stream dropped, discarding result");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
