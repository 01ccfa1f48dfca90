//! Shared test doubles for the executor and storage collaborators.

use crate::error::{Error, Result};
use crate::ffmpeg::TransformExecutor;
use crate::storage::StorageProvider;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Probe response for a 120.5s stereo 44.1kHz WAV file
pub(crate) const WAV_PROBE_JSON: &str = r#"{
    "format": {
        "duration": "120.5",
        "bit_rate": "192000",
        "size": "2880000",
        "format_name": "wav"
    },
    "streams": [
        {
            "codec_name": "pcm_s16le",
            "sample_rate": "44100",
            "channels": 2,
            "bit_rate": "1411200"
        }
    ]
}"#;

/// Executor that never spawns a process
///
/// Records every transformation argument list and tracks how many `execute` calls
/// overlap so tests can assert on concurrency limits.
pub(crate) struct MockExecutor {
    execute_calls: AtomicUsize,
    probe_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    remaining_failures: AtomicUsize,
    execute_delay: Duration,
    recorded: Mutex<Vec<Vec<String>>>,
    failing_probes: Mutex<HashSet<PathBuf>>,
    panic_marker: Option<String>,
}

impl MockExecutor {
    pub(crate) fn new() -> Self {
        Self {
            execute_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            remaining_failures: AtomicUsize::new(0),
            execute_delay: Duration::ZERO,
            recorded: Mutex::new(Vec::new()),
            failing_probes: Mutex::new(HashSet::new()),
            panic_marker: None,
        }
    }

    /// Fail the first `n` executions with exit code 1
    pub(crate) fn with_execute_failures(self, n: usize) -> Self {
        self.remaining_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Hold each execution for `delay` (cancellable)
    pub(crate) fn with_execute_delay(mut self, delay: Duration) -> Self {
        self.execute_delay = delay;
        self
    }

    /// Make probing `path` fail with an execution error
    pub(crate) fn with_probe_failure_for(self, path: impl Into<PathBuf>) -> Self {
        self.failing_probes.lock().insert(path.into());
        self
    }

    /// Panic during execution when any argument contains `marker`
    pub(crate) fn with_panic_on(mut self, marker: impl Into<String>) -> Self {
        self.panic_marker = Some(marker.into());
        self
    }

    pub(crate) fn execute_calls(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn recorded_args(&self) -> Vec<Vec<String>> {
        self.recorded.lock().clone()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransformExecutor for MockExecutor {
    async fn execute(&self, args: &[String], cancel: &CancellationToken) -> Result<()> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        self.recorded.lock().push(args.to_vec());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(marker) = &self.panic_marker {
            if args.iter().any(|a| a.contains(marker.as_str())) {
                panic!("mock executor asked to panic on {marker}");
            }
        }

        if !self.execute_delay.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Canceled),
                _ = tokio::time::sleep(self.execute_delay) => {}
            }
        } else if cancel.is_cancelled() {
            return Err(Error::Canceled);
        }

        let should_fail = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(Error::Execution {
                message: "ffmpeg execution failed".to_string(),
                args: args.to_vec(),
                exit_code: Some(1),
                stderr: "Conversion failed!".to_string(),
                source: None,
            });
        }

        Ok(())
    }

    async fn probe(&self, path: &Path, cancel: &CancellationToken) -> Result<Vec<u8>> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(Error::Canceled);
        }
        if self.failing_probes.lock().contains(path) {
            return Err(Error::Execution {
                message: "ffprobe execution failed".to_string(),
                args: vec![path.display().to_string()],
                exit_code: Some(1),
                stderr: "Invalid data found when processing input".to_string(),
                source: None,
            });
        }
        Ok(WAV_PROBE_JSON.as_bytes().to_vec())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Storage where every path exists unless marked missing
pub(crate) struct MockStorage {
    missing: Mutex<HashSet<PathBuf>>,
    broken: bool,
    exists_calls: AtomicUsize,
}

impl MockStorage {
    pub(crate) fn new() -> Self {
        Self {
            missing: Mutex::new(HashSet::new()),
            broken: false,
            exists_calls: AtomicUsize::new(0),
        }
    }

    /// Report `path` as nonexistent
    pub(crate) fn with_missing(self, path: impl Into<PathBuf>) -> Self {
        self.missing.lock().insert(path.into());
        self
    }

    /// Fail every operation with an I/O error
    pub(crate) fn broken() -> Self {
        Self {
            broken: true,
            ..Self::new()
        }
    }

    pub(crate) fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.broken {
            return Err(Error::Io(std::io::Error::other("storage unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageProvider for MockStorage {
    async fn exists(&self, path: &Path) -> Result<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(!self.missing.lock().contains(path))
    }

    async fn size(&self, _path: &Path) -> Result<u64> {
        self.check()?;
        Ok(0)
    }

    async fn remove(&self, _path: &Path) -> Result<()> {
        self.check()
    }

    async fn create_temp_file(&self, dir: Option<&Path>, pattern: &str) -> Result<PathBuf> {
        self.check()?;
        let dir = dir.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir);
        Ok(dir.join(pattern.replace('*', "0")))
    }
}
