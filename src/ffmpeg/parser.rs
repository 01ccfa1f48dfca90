//! Parsing of ffprobe JSON output

use crate::error::{Error, Result};
use crate::types::{AudioMetadata, Stage};
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    duration: Option<Value>,
    #[serde(default)]
    size: Option<Value>,
    #[serde(default)]
    format_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    codec_type: Option<String>,
    #[serde(default)]
    codec_name: Option<String>,
    #[serde(default)]
    sample_rate: Option<Value>,
    #[serde(default)]
    channels: Option<Value>,
    #[serde(default)]
    bit_rate: Option<Value>,
}

impl ProbeStream {
    fn is_audio(&self) -> bool {
        self.codec_type.as_deref().is_none_or(|t| t == "audio")
    }
}

/// Parse ffprobe `-print_format json -show_format -show_streams` output
///
/// Each numeric field is parsed independently; a field that is missing or malformed is
/// left at zero without affecting the others. The first audio stream supplies codec,
/// channel count, sample rate and bitrate; without one those fields stay zero.
///
/// # Errors
///
/// Returns [`Error::Processing`] at [`Stage::Probe`] if the output is not a JSON
/// document of the expected shape.
pub fn parse_probe_output(raw: &[u8]) -> Result<AudioMetadata> {
    let probe: ProbeOutput = serde_json::from_slice(raw)
        .map_err(|e| Error::processing(Stage::Probe, "failed to parse probe output", e))?;

    let mut meta = AudioMetadata {
        format: probe.format.format_name.unwrap_or_default(),
        size: number(probe.format.size.as_ref()).unwrap_or_default(),
        duration: number::<f64>(probe.format.duration.as_ref())
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or_default(),
        ..AudioMetadata::default()
    };

    if let Some(stream) = probe.streams.iter().find(|s| s.is_audio()) {
        meta.codec = stream.codec_name.clone().unwrap_or_default();
        meta.channels = number(stream.channels.as_ref()).unwrap_or_default();
        meta.sample_rate = number(stream.sample_rate.as_ref()).unwrap_or_default();
        meta.bitrate = number(stream.bit_rate.as_ref()).unwrap_or_default();
    }

    Ok(meta)
}

/// ffprobe reports most numbers as strings and a few as JSON numbers
fn number<T: FromStr>(value: Option<&Value>) -> Option<T> {
    match value? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}
