//! Core types for audioflow

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::ProcessingOptions;
use crate::error::Error;

/// Unique identifier for a job
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

/// Number of trailing input-path bytes kept in generated job IDs
const JOB_ID_SUFFIX_LEN: usize = 20;

impl JobId {
    /// Create a new JobId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate an ID for a single-file job: `job-<unix-nanos>-<sanitized tail of input>`
    pub fn generate(input: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        Self(format!("job-{}-{}", nanos, sanitize(input)))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitize(input: &str) -> String {
    let bytes = input.as_bytes();
    let tail = &bytes[bytes.len().saturating_sub(JOB_ID_SUFFIX_LEN)..];
    tail.iter()
        .map(|&b| {
            if b.is_ascii_alphanumeric() {
                b as char
            } else {
                '_'
            }
        })
        .collect()
}

/// Pipeline stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Request and input validation
    Validate,
    /// Metadata probing of the input
    Probe,
    /// Transformation (filter + encode) via the external tool
    Encode,
    /// Metadata probing of the output
    Verify,
    /// Job finished
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::Probe => "probe",
            Stage::Encode => "encode",
            Stage::Verify => "verify",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Metadata of an audio file, derived from probe output
///
/// Fields that could not be parsed are left at their zero value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioMetadata {
    /// Playback duration
    pub duration: Duration,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u32,
    /// Stream bitrate in bits per second
    pub bitrate: u64,
    /// Codec name of the first audio stream (e.g., "pcm_s16le")
    pub codec: String,
    /// Container format name (e.g., "wav")
    pub format: String,
    /// File size in bytes
    pub size: u64,
}

/// Result of a successful processing run
#[must_use]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessingResult {
    /// Input file
    pub input_path: PathBuf,
    /// Output file
    pub output_path: PathBuf,
    /// Metadata of the input
    pub input_meta: AudioMetadata,
    /// Metadata of the output (zero-valued if the output could not be probed)
    pub output_meta: AudioMetadata,
    /// Wall-clock time spent in the pipeline
    pub elapsed: Duration,
    /// Completion timestamp
    pub processed_at: DateTime<Utc>,
}

/// A job submitted to batch processing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchJob {
    /// Caller-assigned job ID, echoed on the matching [`BatchResult`]
    pub id: JobId,
    /// Input file
    pub input_path: PathBuf,
    /// Output file
    pub output_path: PathBuf,
    /// Options for this job (defaults are used when `None`)
    #[serde(default)]
    pub options: Option<ProcessingOptions>,
}

impl BatchJob {
    /// Create a batch job using default options
    pub fn new(
        id: impl Into<JobId>,
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            input_path: input_path.into(),
            output_path: output_path.into(),
            options: None,
        }
    }

    /// Attach options to this job
    pub fn with_options(mut self, options: ProcessingOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// Outcome of one batch job
#[derive(Debug)]
pub struct BatchResult {
    /// ID of the job this outcome belongs to
    pub job_id: JobId,
    /// The processing result or the classified failure
    pub result: std::result::Result<ProcessingResult, Error>,
}

impl BatchResult {
    /// Whether the job succeeded
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}
