//! Best-effort progress reporting
//!
//! Progress updates flow from pipeline workers to zero or more subscribers. Reporting
//! never blocks the producing worker: a full or closed subscriber channel simply
//! drops the update.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

use crate::types::{JobId, Stage};

/// A single progress update for one job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Job the update belongs to
    pub job_id: JobId,
    /// Current pipeline stage
    pub stage: Stage,
    /// Completion percentage (0-100, non-decreasing per job)
    pub percent: f64,
    /// Free-text message
    pub message: String,
    /// When the update was produced
    pub timestamp: DateTime<Utc>,
}

/// Sink for progress updates
///
/// Implementations must return promptly; `report` is called from pipeline workers.
pub trait ProgressReporter: Send + Sync {
    /// Deliver an update, dropping it if it cannot be delivered immediately
    fn report(&self, update: ProgressUpdate);
}

/// Discards all updates
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _update: ProgressUpdate) {}
}

/// Forwards updates to an mpsc channel without waiting
#[derive(Clone, Debug)]
pub struct ChannelReporter {
    tx: mpsc::Sender<ProgressUpdate>,
}

impl ChannelReporter {
    /// Create a reporter sending into `tx`
    pub fn new(tx: mpsc::Sender<ProgressUpdate>) -> Self {
        Self { tx }
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, update: ProgressUpdate) {
        if let Err(e) = self.tx.try_send(update) {
            tracing::trace!(error = %e, "dropping progress update");
        }
    }
}

/// Fans updates out to every registered reporter
///
/// With no reporters registered all updates are discarded.
///
/// # Example
///
/// ```no_run
/// use audioflow::progress::ProgressPublisher;
///
/// # async fn example() {
/// let publisher = ProgressPublisher::new();
/// let mut updates = publisher.subscribe(64);
/// tokio::spawn(async move {
///     while let Some(update) = updates.recv().await {
///         println!("{} {:.0}% {}", update.job_id, update.percent, update.message);
///     }
/// });
/// # }
/// ```
#[derive(Default)]
pub struct ProgressPublisher {
    reporters: RwLock<Vec<Arc<dyn ProgressReporter>>>,
}

impl ProgressPublisher {
    /// Create a publisher with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an additional reporter
    pub fn add(&self, reporter: Arc<dyn ProgressReporter>) {
        self.reporters.write().push(reporter);
    }

    /// Subscribe through a new channel holding up to `buffer` undelivered updates
    pub fn subscribe(&self, buffer: usize) -> mpsc::Receiver<ProgressUpdate> {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        self.add(Arc::new(ChannelReporter::new(tx)));
        rx
    }

    /// Number of registered reporters
    pub fn subscriber_count(&self) -> usize {
        self.reporters.read().len()
    }
}

impl ProgressReporter for ProgressPublisher {
    fn report(&self, update: ProgressUpdate) {
        let reporters = self.reporters.read();
        match reporters.as_slice() {
            [] => {}
            [only] => only.report(update),
            many => {
                for reporter in many {
                    reporter.report(update.clone());
                }
            }
        }
    }
}

/// Per-job progress handle tagged with the job's ID
///
/// Percentages are clamped into `0..=100` and never go backwards, including across
/// retry attempts of the same job.
pub struct JobProgress {
    job_id: JobId,
    reporter: Arc<dyn ProgressReporter>,
    // f64 bits of the highest percentage reported so far
    high_water: AtomicU64,
}

impl JobProgress {
    /// Create a handle for `job_id` reporting into `reporter`
    pub fn new(job_id: JobId, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            job_id,
            reporter,
            high_water: AtomicU64::new(0f64.to_bits()),
        }
    }

    /// Emit an update for this job
    pub fn report(&self, stage: Stage, percent: f64, message: impl Into<String>) {
        let requested = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
        let previous = self
            .high_water
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                let current = f64::from_bits(bits);
                (requested > current).then(|| requested.to_bits())
            })
            .unwrap_or_else(|bits| bits);
        let percent = requested.max(f64::from_bits(previous));

        self.reporter.report(ProgressUpdate {
            job_id: self.job_id.clone(),
            stage,
            percent,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    /// Highest percentage reported so far
    pub fn percent(&self) -> f64 {
        f64::from_bits(self.high_water.load(Ordering::Acquire))
    }
}

impl std::fmt::Debug for JobProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobProgress")
            .field("job_id", &self.job_id)
            .field("percent", &self.percent())
            .finish()
    }
}
