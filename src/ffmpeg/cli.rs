//! CLI-based executor using the external ffmpeg and ffprobe binaries

use super::traits::TransformExecutor;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// CLI-based executor using the external `ffmpeg` and `ffprobe` binaries
///
/// Processes are spawned with `kill_on_drop`, so a cancelled invocation terminates the
/// external process instead of leaving it running in the background.
///
/// # Examples
///
/// ```no_run
/// use audioflow::ffmpeg::{FfmpegCli, TransformExecutor};
/// use std::path::PathBuf;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Create with explicit paths
/// let executor = FfmpegCli::new(
///     PathBuf::from("/usr/bin/ffmpeg"),
///     PathBuf::from("/usr/bin/ffprobe"),
/// );
///
/// // Or auto-discover from PATH
/// let executor = FfmpegCli::from_path().expect("ffmpeg not found in PATH");
///
/// let args: Vec<String> = ["-y", "-i", "in.wav", "out.opus"].map(String::from).to_vec();
/// executor.execute(&args, &CancellationToken::new()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct FfmpegCli {
    ffmpeg_path: PathBuf,
    ffprobe_path: PathBuf,
}

impl FfmpegCli {
    /// Create a new CLI executor with explicit binary paths
    pub fn new(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
        }
    }

    /// Attempt to find both ffmpeg and ffprobe in PATH
    ///
    /// Returns `None` if either binary is missing.
    pub fn from_path() -> Option<Self> {
        let ffmpeg = which::which("ffmpeg").ok()?;
        let ffprobe = which::which("ffprobe").ok()?;
        Some(Self::new(ffmpeg, ffprobe))
    }

    /// Use the given paths, searching PATH for any that are `None`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a binary without an explicit path is not in PATH.
    pub fn discover(ffmpeg_path: Option<PathBuf>, ffprobe_path: Option<PathBuf>) -> Result<Self> {
        let ffmpeg = match ffmpeg_path {
            Some(path) => path,
            None => locate("ffmpeg", "ffmpeg_path")?,
        };
        let ffprobe = match ffprobe_path {
            Some(path) => path,
            None => locate("ffprobe", "ffprobe_path")?,
        };
        Ok(Self::new(ffmpeg, ffprobe))
    }

    /// Path of the transformation binary
    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg_path
    }

    /// Path of the inspection binary
    pub fn ffprobe_path(&self) -> &Path {
        &self.ffprobe_path
    }

    /// Run `program` to completion or until `cancel` fires, returning captured stdout
    async fn run(
        &self,
        program: &Path,
        tool: &'static str,
        args: Vec<OsString>,
        capture_stdout: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        let display_args = || -> Vec<String> {
            args.iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect()
        };

        if cancel.is_cancelled() {
            return Err(Error::Canceled);
        }

        tracing::debug!(tool, program = ?program, args = ?display_args(), "executing external tool");

        let child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(if capture_stdout {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Execution {
                message: format!("failed to execute {}", tool),
                args: display_args(),
                exit_code: None,
                stderr: String::new(),
                source: Some(e),
            })?;

        // Dropping the wait future drops the child, which kills the process
        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(tool, "cancellation requested, terminating external process");
                return Err(Error::Canceled);
            }
            output = child.wait_with_output() => output.map_err(|e| Error::Execution {
                message: format!("failed to wait for {}", tool),
                args: display_args(),
                exit_code: None,
                stderr: String::new(),
                source: Some(e),
            })?,
        };

        if !output.status.success() {
            let exit_code = output.status.code();
            tracing::debug!(tool, exit_code = ?exit_code, "external tool failed");
            return Err(Error::Execution {
                message: format!("{} execution failed", tool),
                args: display_args(),
                exit_code,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                source: None,
            });
        }

        Ok(output.stdout)
    }
}

fn locate(binary: &'static str, key: &str) -> Result<PathBuf> {
    which::which(binary).map_err(|e| Error::Config {
        message: format!("{} not found in PATH: {}", binary, e),
        key: Some(key.to_string()),
    })
}

#[async_trait]
impl TransformExecutor for FfmpegCli {
    async fn execute(&self, args: &[String], cancel: &CancellationToken) -> Result<()> {
        let args = args.iter().map(OsString::from).collect();
        self.run(&self.ffmpeg_path, "ffmpeg", args, false, cancel)
            .await
            .map(|_| ())
    }

    async fn probe(&self, path: &Path, cancel: &CancellationToken) -> Result<Vec<u8>> {
        let mut args: Vec<OsString> = [
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(path.as_os_str().to_owned());

        self.run(&self.ffprobe_path, "ffprobe", args, true, cancel)
            .await
    }

    fn name(&self) -> &'static str {
        "cli-ffmpeg"
    }
}
