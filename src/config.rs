//! Configuration types for audioflow

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, str::FromStr, time::Duration};

/// Target audio codec
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// Opus via libopus (default)
    #[default]
    Opus,
    /// AAC via the native ffmpeg encoder
    Aac,
    /// MP3 via libmp3lame
    Mp3,
}

impl Codec {
    /// Lowercase codec name as used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::Opus => "opus",
            Codec::Aac => "aac",
            Codec::Mp3 => "mp3",
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a case-insensitive codec name
///
/// An unsupported name fails here with [`Error::Validation`] on field `codec`,
/// before any job is built. It is never reported later as a processing failure,
/// so callers building options from strings see a non-retryable validation error.
impl FromStr for Codec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "opus" => Ok(Codec::Opus),
            "aac" => Ok(Codec::Aac),
            "mp3" => Ok(Codec::Mp3),
            _ => Err(Error::validation("codec", s, "unsupported codec")),
        }
    }
}

/// Bitrate encoding mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitrateMode {
    /// Variable bitrate
    #[serde(rename = "vbr")]
    Variable,
    /// Constant bitrate (default)
    #[default]
    #[serde(rename = "cbr")]
    Constant,
}

impl FromStr for BitrateMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "vbr" | "variable" => Ok(BitrateMode::Variable),
            "cbr" | "constant" => Ok(BitrateMode::Constant),
            _ => Err(Error::validation(
                "bitrate_mode",
                s,
                "bitrate mode must be vbr or cbr",
            )),
        }
    }
}

/// Per-job processing options
///
/// A job takes a snapshot of these options when it is built; later changes made by
/// the caller do not affect a running job.
///
/// # Example
///
/// ```
/// use audioflow::{BitrateMode, Codec, ProcessingOptions};
///
/// let options = ProcessingOptions::default()
///     .with_codec(Codec::Aac)
///     .with_bitrate_mode(BitrateMode::Variable)
///     .with_highpass(80)
///     .with_loudness_target(-16.0);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    /// Output codec (default: opus)
    #[serde(default)]
    pub codec: Codec,

    /// Target bitrate in bits per second (default: 128000)
    #[serde(default = "default_bitrate")]
    pub bitrate: i64,

    /// Bitrate mode (default: cbr)
    #[serde(default)]
    pub bitrate_mode: BitrateMode,

    /// Output sample rate in Hz (default: 48000)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: i64,

    /// EBU R128 loudness normalization (default: true)
    #[serde(default = "default_true")]
    pub normalization_enabled: bool,

    /// Integrated loudness target in LUFS (default: -23.0)
    #[serde(default = "default_loudness_target")]
    pub loudness_target: f64,

    /// True-peak limit in dBTP (default: -1.0)
    #[serde(default = "default_true_peak_limit")]
    pub true_peak_limit: f64,

    /// Loudness range target in LU (default: 7.0)
    #[serde(default = "default_loudness_range")]
    pub loudness_range: f64,

    /// Apply a highpass filter (default: false)
    #[serde(default)]
    pub highpass_enabled: bool,

    /// Highpass cutoff in Hz (default: 80)
    #[serde(default = "default_highpass_freq")]
    pub highpass_freq: u32,

    /// Apply a lowpass filter (default: false)
    #[serde(default)]
    pub lowpass_enabled: bool,

    /// Lowpass cutoff in Hz (default: 18000)
    #[serde(default = "default_lowpass_freq")]
    pub lowpass_freq: u32,

    /// Per-job deadline, zero disables it (default: 5 minutes)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Total attempts for single-file processing (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_retries: u32,

    /// Delay before the first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub retry_delay: Duration,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            codec: Codec::Opus,
            bitrate: default_bitrate(),
            bitrate_mode: BitrateMode::Constant,
            sample_rate: default_sample_rate(),
            normalization_enabled: true,
            loudness_target: default_loudness_target(),
            true_peak_limit: default_true_peak_limit(),
            loudness_range: default_loudness_range(),
            highpass_enabled: false,
            highpass_freq: default_highpass_freq(),
            lowpass_enabled: false,
            lowpass_freq: default_lowpass_freq(),
            timeout: default_timeout(),
            max_retries: default_max_attempts(),
            retry_delay: default_initial_delay(),
        }
    }
}

impl ProcessingOptions {
    /// Set the output codec
    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Set the target bitrate in bits per second
    pub fn with_bitrate(mut self, bitrate: i64) -> Self {
        self.bitrate = bitrate;
        self
    }

    /// Set VBR or CBR mode
    pub fn with_bitrate_mode(mut self, mode: BitrateMode) -> Self {
        self.bitrate_mode = mode;
        self
    }

    /// Set the output sample rate in Hz
    pub fn with_sample_rate(mut self, hz: i64) -> Self {
        self.sample_rate = hz;
        self
    }

    /// Enable or disable loudness normalization
    pub fn with_normalization(mut self, enabled: bool) -> Self {
        self.normalization_enabled = enabled;
        self
    }

    /// Set the loudness target in LUFS
    pub fn with_loudness_target(mut self, lufs: f64) -> Self {
        self.loudness_target = lufs;
        self
    }

    /// Set the true-peak limit in dBTP
    pub fn with_true_peak_limit(mut self, dbtp: f64) -> Self {
        self.true_peak_limit = dbtp;
        self
    }

    /// Set the loudness range in LU
    pub fn with_loudness_range(mut self, lu: f64) -> Self {
        self.loudness_range = lu;
        self
    }

    /// Enable the highpass filter at `hz`
    pub fn with_highpass(mut self, hz: u32) -> Self {
        self.highpass_enabled = true;
        self.highpass_freq = hz;
        self
    }

    /// Enable the lowpass filter at `hz`
    pub fn with_lowpass(mut self, hz: u32) -> Self {
        self.lowpass_enabled = true;
        self.lowpass_freq = hz;
        self
    }

    /// Set the per-job deadline (zero disables it)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the attempt budget and first retry delay
    pub fn with_retry(mut self, max_attempts: u32, delay: Duration) -> Self {
        self.max_retries = max_attempts;
        self.retry_delay = delay;
        self
    }

    /// Check the numeric options
    pub fn validate(&self) -> Result<()> {
        if self.bitrate <= 0 {
            return Err(Error::validation(
                "bitrate",
                self.bitrate,
                "bitrate must be positive",
            ));
        }
        if self.sample_rate <= 0 {
            return Err(Error::validation(
                "sample_rate",
                self.sample_rate,
                "sample rate must be positive",
            ));
        }
        Ok(())
    }
}

/// Retry behavior configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first; 0 and 1 both mean "no retry" (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// Main configuration for [`AudioService`](crate::AudioService)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Maximum concurrently executing batch jobs (default: 4)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Retry behavior for single-file processing
    #[serde(default)]
    pub retry: RetryConfig,

    /// Path to the ffmpeg binary (None = search PATH)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Path to the ffprobe binary (None = search PATH)
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            retry: RetryConfig::default(),
            ffmpeg_path: None,
            ffprobe_path: None,
        }
    }
}

impl Config {
    /// Check settings that cannot be expressed in the type system
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config {
                message: "workers must be at least 1".to_string(),
                key: Some("workers".to_string()),
            });
        }
        if self.retry.backoff_multiplier < 1.0 || !self.retry.backoff_multiplier.is_finite() {
            return Err(Error::Config {
                message: format!(
                    "backoff multiplier must be a finite value >= 1.0, got {}",
                    self.retry.backoff_multiplier
                ),
                key: Some("retry.backoff_multiplier".to_string()),
            });
        }
        Ok(())
    }
}

// Default value functions
fn default_workers() -> usize {
    4
}

fn default_bitrate() -> i64 {
    128_000
}

fn default_sample_rate() -> i64 {
    48_000
}

fn default_true() -> bool {
    true
}

fn default_loudness_target() -> f64 {
    -23.0
}

fn default_true_peak_limit() -> f64 {
    -1.0
}

fn default_loudness_range() -> f64 {
    7.0
}

fn default_highpass_freq() -> u32 {
    80
}

fn default_lowpass_freq() -> u32 {
    18_000
}

fn default_timeout() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper (milliseconds, so sub-second delays round-trip)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
