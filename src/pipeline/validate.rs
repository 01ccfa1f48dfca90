//! Request validation stage

use crate::error::{Error, Result};
use crate::storage::StorageProvider;
use crate::types::Stage;
use std::sync::Arc;
use tracing::debug;

use super::Job;

/// Reject malformed requests before any external work starts
///
/// Checks run in order: non-empty paths, numeric options, then input existence. A
/// storage failure while checking existence is a processing failure, not a validation
/// failure, so that it stays retryable.
pub(crate) async fn run_validate_stage(
    job: &Job,
    storage: &Arc<dyn StorageProvider>,
) -> Result<()> {
    if job.input_path().as_os_str().is_empty() {
        return Err(Error::validation(
            "input_path",
            "",
            "input path is required",
        ));
    }
    if job.output_path().as_os_str().is_empty() {
        return Err(Error::validation(
            "output_path",
            "",
            "output path is required",
        ));
    }

    job.options().validate()?;

    let exists = storage
        .exists(job.input_path())
        .await
        .map_err(|e| Error::processing(Stage::Validate, "failed to check input file", e))?;

    if !exists {
        return Err(Error::validation(
            "input_path",
            job.input_path().display(),
            "input file does not exist",
        ));
    }

    debug!(job_id = %job.id(), "validation passed");
    Ok(())
}
