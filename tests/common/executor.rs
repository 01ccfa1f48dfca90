//! In-process collaborators built on the public traits

use async_trait::async_trait;
use audioflow::{Error, Result, StorageProvider, TransformExecutor};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// ffprobe-style JSON for a 3 minute stereo 48kHz FLAC file
pub const FLAC_PROBE_JSON: &str = r#"{
    "format": {"format_name": "flac", "duration": "180.0", "size": "31752000"},
    "streams": [{"codec_type": "audio", "codec_name": "flac", "sample_rate": "48000", "channels": 2}]
}"#;

/// Executor that sleeps instead of transcoding and tracks overlap
pub struct SleepyExecutor {
    delay: Duration,
    calls: AtomicUsize,
    running: AtomicUsize,
    peak: AtomicUsize,
    outputs: Mutex<Vec<String>>,
}

impl SleepyExecutor {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            outputs: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Output paths passed as the last argument, in call order
    pub fn outputs(&self) -> Vec<String> {
        self.outputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransformExecutor for SleepyExecutor {
    async fn execute(&self, args: &[String], cancel: &CancellationToken) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(last) = args.last() {
            self.outputs.lock().unwrap().push(last.clone());
        }

        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(Error::Canceled),
            _ = tokio::time::sleep(self.delay) => Ok(()),
        };

        self.running.fetch_sub(1, Ordering::SeqCst);
        outcome
    }

    async fn probe(&self, _path: &Path, cancel: &CancellationToken) -> Result<Vec<u8>> {
        if cancel.is_cancelled() {
            return Err(Error::Canceled);
        }
        Ok(FLAC_PROBE_JSON.as_bytes().to_vec())
    }

    fn name(&self) -> &'static str {
        "sleepy"
    }
}

/// Storage where only explicitly registered paths exist
#[derive(Default)]
pub struct FixedStorage {
    present: Mutex<HashSet<PathBuf>>,
}

impl FixedStorage {
    pub fn with_files<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            present: Mutex::new(paths.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl StorageProvider for FixedStorage {
    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.present.lock().unwrap().contains(path))
    }

    async fn size(&self, _path: &Path) -> Result<u64> {
        Ok(0)
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        self.present.lock().unwrap().remove(path);
        Ok(())
    }

    async fn create_temp_file(&self, dir: Option<&Path>, pattern: &str) -> Result<PathBuf> {
        let path = dir
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir)
            .join(pattern.replace('*', "1"));
        self.present.lock().unwrap().insert(path.clone());
        Ok(path)
    }
}
