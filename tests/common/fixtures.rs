//! Fake ffmpeg/ffprobe scripts for exercising the real CLI executor

use audioflow::{Config, RetryConfig};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Probe output printed by the fake ffprobe for every readable input
pub const WAV_PROBE_JSON: &str = r#"{
  "format": {"format_name": "wav", "duration": "120.5", "size": "2880000", "bit_rate": "192000"},
  "streams": [{"codec_type": "audio", "codec_name": "pcm_s16le", "sample_rate": "44100", "channels": 2, "bit_rate": "1411200"}]
}"#;

/// How the fake ffmpeg behaves on each invocation
#[derive(Clone, Copy, Debug)]
pub enum FfmpegBehavior {
    /// Create the output file and exit 0
    Succeed,
    /// Print a diagnostic and exit 1
    Fail,
    /// Exit 1 for the first `n` invocations, then succeed
    FailTimes(u32),
    /// Never finish on its own
    Hang,
}

/// A temp directory holding fake tool scripts plus scratch media files
pub struct FakeTools {
    dir: TempDir,
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl FakeTools {
    pub fn new(behavior: FfmpegBehavior) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();

        let ffmpeg = root.join("ffmpeg");
        write_script(&ffmpeg, &ffmpeg_script(&root, behavior));

        let ffprobe = root.join("ffprobe");
        write_script(&ffprobe, &ffprobe_script());

        Self {
            dir,
            ffmpeg,
            ffprobe,
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Service configuration pointing at the fake tools with fast backoff
    pub fn config(&self, workers: usize) -> Config {
        Config {
            workers,
            retry: RetryConfig {
                initial_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(50),
                ..RetryConfig::default()
            },
            ffmpeg_path: Some(self.ffmpeg.clone()),
            ffprobe_path: Some(self.ffprobe.clone()),
        }
    }

    /// Create a small input file and return its path
    pub fn input(&self, name: &str) -> PathBuf {
        let path = self.root().join(name);
        std::fs::write(&path, b"RIFF....WAVEfmt ").unwrap();
        path
    }

    /// Path for an output file that does not exist yet
    pub fn output(&self, name: &str) -> PathBuf {
        self.root().join("out").join(name)
    }

    /// Number of times the fake ffmpeg was started
    pub fn ffmpeg_invocations(&self) -> usize {
        std::fs::read_to_string(self.root().join("calls"))
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    /// Argument tokens of the most recent ffmpeg invocation
    pub fn last_ffmpeg_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.root().join("last_args"))
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }
}

fn write_script(path: &Path, body: &str) {
    std::fs::write(path, body).unwrap();
    let mut perms = std::fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).unwrap();
}

fn ffmpeg_script(root: &Path, behavior: FfmpegBehavior) -> String {
    let state = root.display();
    let action = match behavior {
        FfmpegBehavior::Succeed => "succeed".to_string(),
        FfmpegBehavior::Fail => "fail".to_string(),
        FfmpegBehavior::FailTimes(n) => format!(
            "if [ \"$n\" -le {n} ]; then fail; fi\nsucceed"
        ),
        FfmpegBehavior::Hang => "exec sleep 30".to_string(),
    };

    format!(
        r#"#!/bin/sh
n=$(wc -l 2>/dev/null < "{state}/calls" || echo 0)
n=$((n + 1))
echo call >> "{state}/calls"
printf '%s\n' "$@" > "{state}/last_args"
for last; do :; done

succeed() {{
    mkdir -p "$(dirname "$last")"
    printf 'encoded' > "$last"
    exit 0
}}

fail() {{
    echo "Error while opening encoder for output stream #0:0" >&2
    exit 1
}}

{action}
"#
    )
}

fn ffprobe_script() -> String {
    format!(
        r#"#!/bin/sh
for last; do :; done
case "$last" in
    *corrupt*)
        echo "Invalid data found when processing input" >&2
        exit 1
        ;;
esac
cat <<'JSON'
{WAV_PROBE_JSON}
JSON
"#
    )
}
