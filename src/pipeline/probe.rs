//! Metadata inspection stage

use crate::error::{Error, Result};
use crate::ffmpeg::{TransformExecutor, parse_probe_output};
use crate::types::{AudioMetadata, Stage};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Inspect `path` and parse the result into [`AudioMetadata`]
///
/// A failed tool invocation is wrapped as a processing failure at [`Stage::Probe`],
/// keeping the execution failure as its cause. Cancellation passes through unchanged.
pub(crate) async fn probe_file(
    executor: &Arc<dyn TransformExecutor>,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<AudioMetadata> {
    let raw = executor.probe(path, cancel).await.map_err(|e| match e {
        Error::Execution { .. } => {
            Error::processing(Stage::Probe, format!("failed to probe {}", path.display()), e)
        }
        other => other,
    })?;

    parse_probe_output(&raw)
}
