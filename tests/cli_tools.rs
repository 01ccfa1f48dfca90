//! End-to-end tests through the real CLI executor and local storage
//!
//! The external tools are replaced by small shell scripts (see `common::fixtures`), so
//! these tests exercise process spawning, exit-code capture, stderr capture and
//! process termination without requiring ffmpeg to be installed.

#![cfg(unix)]

mod common;

use audioflow::{
    AudioService, BatchJob, Codec, Error, ErrorKind, ProcessingOptions, Stage,
};
use common::{FakeTools, FfmpegBehavior};
use futures::StreamExt;
use serial_test::serial;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn options() -> ProcessingOptions {
    ProcessingOptions::default().with_retry(3, Duration::from_millis(10))
}

#[tokio::test]
#[serial]
async fn process_one_writes_output_and_reports_metadata() {
    let tools = FakeTools::new(FfmpegBehavior::Succeed);
    let service = AudioService::new(tools.config(2)).unwrap();
    let input = tools.input("speech.wav");
    let output = tools.output("speech.opus");

    let result = service
        .process_one(&input, &output, options().with_highpass(80), &CancellationToken::new())
        .await
        .unwrap();

    assert!(output.exists());
    assert_eq!(result.input_path, input);
    assert_eq!(result.output_path, output);
    assert_eq!(result.input_meta.codec, "pcm_s16le");
    assert_eq!(result.input_meta.sample_rate, 44_100);
    assert_eq!(result.output_meta.format, "wav");

    let args = tools.last_ffmpeg_args();
    assert_eq!(args[0], "-y");
    assert_eq!(args[2], input.display().to_string());
    assert!(args.contains(&"highpass=f=80,loudnorm=I=-23.0:TP=-1.0:LRA=7.0".to_string()));
    assert!(args.contains(&"libopus".to_string()));
    assert_eq!(args.last(), Some(&output.display().to_string()));
}

#[tokio::test]
#[serial]
async fn aac_vbr_arguments_reach_the_tool() {
    let tools = FakeTools::new(FfmpegBehavior::Succeed);
    let service = AudioService::new(tools.config(1)).unwrap();

    service
        .process_one(
            tools.input("a.wav"),
            tools.output("a.m4a"),
            options()
                .with_codec(Codec::Aac)
                .with_bitrate_mode("vbr".parse().unwrap())
                .with_normalization(false),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let args = tools.last_ffmpeg_args();
    assert!(!args.contains(&"-af".to_string()));
    assert!(!args.contains(&"-b:a".to_string()));
    let q = args.iter().position(|a| a == "-q:a").unwrap();
    assert_eq!(args[q + 1], "2");
}

#[tokio::test]
#[serial]
async fn failing_tool_is_retried_then_reported() {
    let tools = FakeTools::new(FfmpegBehavior::Fail);
    let service = AudioService::new(tools.config(1)).unwrap();

    let err = service
        .process_one(
            tools.input("a.wav"),
            tools.output("a.opus"),
            options(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    match &err {
        Error::Execution {
            exit_code,
            stderr,
            args,
            ..
        } => {
            assert_eq!(*exit_code, Some(1));
            assert!(stderr.contains("Error while opening encoder"));
            assert_eq!(args.first().map(String::as_str), Some("-y"));
        }
        other => panic!("Expected Execution error, got: {:?}", other),
    }
    assert_eq!(err.error_code(), "execution_error");
    assert_eq!(tools.ffmpeg_invocations(), 3);
}

#[tokio::test]
#[serial]
async fn transient_failures_recover_within_budget() {
    let tools = FakeTools::new(FfmpegBehavior::FailTimes(2));
    let service = AudioService::new(tools.config(1)).unwrap();
    let output = tools.output("a.opus");

    service
        .process_one(tools.input("a.wav"), &output, options(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(tools.ffmpeg_invocations(), 3);
    assert!(output.exists());
}

#[tokio::test]
#[serial]
async fn missing_input_never_starts_the_tool() {
    let tools = FakeTools::new(FfmpegBehavior::Succeed);
    let service = AudioService::new(tools.config(1)).unwrap();

    let err = service
        .process_one(
            tools.root().join("nope.wav"),
            tools.output("nope.opus"),
            options(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(tools.ffmpeg_invocations(), 0);
}

#[tokio::test]
#[serial]
async fn hung_tool_is_killed_at_deadline() {
    let tools = FakeTools::new(FfmpegBehavior::Hang);
    let service = AudioService::new(tools.config(1)).unwrap();

    let start = Instant::now();
    let err = service
        .process_one(
            tools.input("a.wav"),
            tools.output("a.opus"),
            options().with_timeout(Duration::from_millis(300)),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout(_)));
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(tools.ffmpeg_invocations(), 1);
}

#[tokio::test]
#[serial]
async fn cancellation_stops_a_running_batch() {
    let tools = FakeTools::new(FfmpegBehavior::Hang);
    let service = AudioService::new(tools.config(2)).unwrap();
    let cancel = CancellationToken::new();

    let jobs = (0..4)
        .map(|i| {
            BatchJob::new(
                format!("job-{i}"),
                tools.input(&format!("{i}.wav")),
                tools.output(&format!("{i}.opus")),
            )
        })
        .collect();
    let stream = service.process_batch(jobs, &cancel);

    tokio::time::sleep(Duration::from_millis(300)).await;
    cancel.cancel();

    let start = Instant::now();
    let results: Vec<_> = stream.collect().await;
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(results.len(), 4);
    for r in &results {
        assert_eq!(r.result.as_ref().unwrap_err().kind(), ErrorKind::Canceled);
    }
}

#[tokio::test]
#[serial]
async fn probe_only_reports_metadata_without_transforming() {
    let tools = FakeTools::new(FfmpegBehavior::Succeed);
    let service = AudioService::new(tools.config(1)).unwrap();

    let meta = service
        .probe_only(tools.input("a.wav"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(meta.format, "wav");
    assert_eq!(meta.channels, 2);
    assert_eq!(meta.duration, Duration::from_millis(120_500));
    assert_eq!(tools.ffmpeg_invocations(), 0);
}

#[tokio::test]
#[serial]
async fn probe_only_wraps_tool_failure_at_probe_stage() {
    let tools = FakeTools::new(FfmpegBehavior::Succeed);
    let service = AudioService::new(tools.config(1)).unwrap();

    let err = service
        .probe_only(tools.input("corrupt.wav"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Processing {
            stage: Stage::Probe,
            ..
        }
    ));
    let cause = err.cause().unwrap();
    assert_eq!(audioflow::classify(cause), Some(ErrorKind::Execution));
}

#[tokio::test]
async fn missing_binary_is_a_configuration_error() {
    let config = audioflow::Config {
        ffmpeg_path: None,
        ffprobe_path: None,
        ..Default::default()
    };
    // Only meaningful when the tools are not installed
    if which_ffmpeg_installed() {
        return;
    }
    let err = AudioService::new(config).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

fn which_ffmpeg_installed() -> bool {
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths)
                .any(|dir| dir.join("ffmpeg").is_file() && dir.join("ffprobe").is_file())
        })
        .unwrap_or(false)
}
