//! External transformation tool handling
//!
//! This module provides a trait-based boundary around the external media tool. The
//! orchestration core only ever sees [`TransformExecutor`]: it supplies ordered
//! argument tokens and receives either success or an [`Execution`](crate::Error::Execution)
//! failure carrying the exit status and captured diagnostics.
//!
//! ## Architecture
//!
//! - [`TransformExecutor`]: the execution/probe interface consumed by the pipeline
//! - [`FfmpegCli`]: runs the `ffmpeg` and `ffprobe` binaries
//! - [`FilterChainBuilder`]: builds the `-af` filter graph string
//! - [`parse_probe_output`]: turns ffprobe JSON into [`AudioMetadata`](crate::AudioMetadata)
//!
//! ## Usage
//!
//! ```no_run
//! use audioflow::ffmpeg::{FfmpegCli, TransformExecutor, parse_probe_output};
//! use std::path::Path;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor = FfmpegCli::from_path().expect("ffmpeg/ffprobe not found");
//!     let cancel = CancellationToken::new();
//!
//!     let raw = executor.probe(Path::new("input.wav"), &cancel).await?;
//!     let meta = parse_probe_output(&raw)?;
//!     println!("{} Hz, {} channels", meta.sample_rate, meta.channels);
//!     Ok(())
//! }
//! ```

mod cli;
mod filter;
mod parser;
mod traits;

pub use cli::FfmpegCli;
pub use filter::FilterChainBuilder;
pub use parser::parse_probe_output;
pub use traits::TransformExecutor;
