//! # audioflow
//!
//! Concurrent audio transcode orchestration on top of the external ffmpeg tools.
//!
//! ## Design Philosophy
//!
//! audioflow is designed to be:
//! - **Failure-aware** - Every failure carries a kind that decides whether it is retried
//! - **Cancellable** - One token stops backoff waits, queued jobs and running tools
//! - **Bounded** - Batches never run more than the configured number of jobs at once
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//!
//! ## Quick Start
//!
//! ```no_run
//! use audioflow::{AudioService, BatchJob, Codec, Config, ProcessingOptions};
//! use futures::StreamExt;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = AudioService::new(Config::default())?;
//!     let cancel = CancellationToken::new();
//!     let _signals = audioflow::cancel_on_shutdown_signal(cancel.clone());
//!
//!     // Subscribe to progress
//!     let mut progress = service.subscribe(256);
//!     tokio::spawn(async move {
//!         while let Some(update) = progress.recv().await {
//!             println!("{} {:>5.1}% {}", update.job_id, update.percent, update.message);
//!         }
//!     });
//!
//!     let jobs = vec![
//!         BatchJob::new("intro", "intro.wav", "intro.opus"),
//!         BatchJob::new("outro", "outro.wav", "outro.m4a")
//!             .with_options(ProcessingOptions::default().with_codec(Codec::Aac)),
//!     ];
//!
//!     let mut results = service.process_batch(jobs, &cancel);
//!     while let Some(outcome) = results.next().await {
//!         match outcome.result {
//!             Ok(r) => println!("{}: {:?}", outcome.job_id, r.elapsed),
//!             Err(e) => eprintln!("{}: {} ({})", outcome.job_id, e, e.kind()),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// External tool integration
pub mod ffmpeg;
/// Single-job pipeline and batch worker pool
pub mod pipeline;
/// Progress reporting
pub mod progress;
/// Retry logic with exponential backoff
pub mod retry;
/// Orchestration service
pub mod service;
/// Storage abstraction
pub mod storage;
/// Core types
pub mod types;

mod shutdown;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{BitrateMode, Codec, Config, ProcessingOptions, RetryConfig};
pub use error::{Error, ErrorDetail, ErrorKind, Result, classify};
pub use ffmpeg::{FfmpegCli, TransformExecutor};
pub use pipeline::BatchResults;
pub use progress::{ProgressPublisher, ProgressReporter, ProgressUpdate};
pub use service::AudioService;
pub use shutdown::cancel_on_shutdown_signal;
pub use storage::{LocalStorage, StorageProvider};
pub use types::{AudioMetadata, BatchJob, BatchResult, JobId, ProcessingResult, Stage};
