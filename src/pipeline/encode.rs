//! Transformation stage: command construction and execution

use crate::config::{BitrateMode, Codec, ProcessingOptions};
use crate::error::Result;
use crate::ffmpeg::{FilterChainBuilder, TransformExecutor};
use crate::types::Stage;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Job;

/// Quality scale used for AAC and MP3 in VBR mode
const VBR_QUALITY: &str = "2";

/// Build the `-af` filter chain: highpass, then lowpass, then loudness normalization
///
/// Each filter is included only when enabled. Returns an empty string when no filter
/// is enabled.
pub fn build_filter_chain(options: &ProcessingOptions) -> String {
    let mut chain = FilterChainBuilder::new();
    if options.highpass_enabled {
        chain = chain.add_highpass(options.highpass_freq);
    }
    if options.lowpass_enabled {
        chain = chain.add_lowpass(options.lowpass_freq);
    }
    if options.normalization_enabled {
        chain = chain.add_loudnorm(
            options.loudness_target,
            options.true_peak_limit,
            options.loudness_range,
        );
    }
    chain.build()
}

/// Codec-specific encoder arguments for `{codec, bitrate_mode}`
///
/// Opus always carries an explicit bitrate; AAC and MP3 in VBR mode use a fixed
/// quality scale instead.
pub fn codec_args(options: &ProcessingOptions) -> Vec<String> {
    let bitrate = format!("{}k", options.bitrate / 1000);
    let vbr = options.bitrate_mode == BitrateMode::Variable;

    let tokens: Vec<&str> = match options.codec {
        Codec::Opus => vec![
            "-c:a",
            "libopus",
            "-vbr",
            if vbr { "on" } else { "off" },
            "-b:a",
            &bitrate,
        ],
        Codec::Aac if vbr => vec!["-c:a", "aac", "-q:a", VBR_QUALITY],
        Codec::Aac => vec!["-c:a", "aac", "-b:a", &bitrate],
        Codec::Mp3 if vbr => vec!["-c:a", "libmp3lame", "-q:a", VBR_QUALITY],
        Codec::Mp3 => vec!["-c:a", "libmp3lame", "-b:a", &bitrate],
    };
    tokens.into_iter().map(String::from).collect()
}

/// Full transformation argument list for one job
///
/// Construction is deterministic: the same inputs always yield the same tokens.
pub fn build_transform_args(
    input: &Path,
    output: &Path,
    options: &ProcessingOptions,
) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
    ];

    let filters = build_filter_chain(options);
    if !filters.is_empty() {
        args.push("-af".to_string());
        args.push(filters);
    }

    args.push("-ar".to_string());
    args.push(options.sample_rate.to_string());
    args.extend(codec_args(options));
    args.push(output.to_string_lossy().into_owned());
    args
}

/// Execute the encode stage
pub(crate) async fn run_encode_stage(
    job: &Job,
    executor: &Arc<dyn TransformExecutor>,
    cancel: &CancellationToken,
) -> Result<()> {
    let args = build_transform_args(job.input_path(), job.output_path(), job.options());

    debug!(
        job_id = %job.id(),
        executor = executor.name(),
        args = ?args,
        "running encode stage"
    );

    job.progress().report(Stage::Encode, 20.0, "encoding started");
    executor.execute(&args, cancel).await?;
    job.progress().report(Stage::Encode, 90.0, "encoding complete");

    Ok(())
}
