//! Batch transcode example
//!
//! This example demonstrates the core functionality of audioflow:
//! - Creating a service with auto-discovered ffmpeg/ffprobe
//! - Subscribing to progress updates
//! - Submitting every `.wav` file in a directory as a batch
//! - Cancelling in-flight work on Ctrl+C
//!
//! Usage: `cargo run --example batch_transcode -- <input_dir> <output_dir> [opus|aac|mp3]`

use audioflow::{AudioService, BatchJob, Codec, Config, ProcessingOptions};
use futures::StreamExt;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let (Some(input_dir), Some(output_dir)) = (args.next(), args.next()) else {
        eprintln!("usage: batch_transcode <input_dir> <output_dir> [opus|aac|mp3]");
        std::process::exit(2);
    };
    let codec: Codec = args.next().as_deref().unwrap_or("opus").parse()?;
    let extension = match codec {
        Codec::Opus => "opus",
        Codec::Aac => "m4a",
        Codec::Mp3 => "mp3",
    };

    let service = AudioService::new(Config::default())?;
    let cancel = CancellationToken::new();
    let _signals = audioflow::cancel_on_shutdown_signal(cancel.clone());

    // Print progress as it arrives
    let mut progress = service.subscribe(256);
    tokio::spawn(async move {
        while let Some(update) = progress.recv().await {
            println!(
                "  {} [{}] {:>5.1}% {}",
                update.job_id, update.stage, update.percent, update.message
            );
        }
    });

    let options = ProcessingOptions::default()
        .with_codec(codec)
        .with_highpass(80);

    let mut jobs = Vec::new();
    for entry in std::fs::read_dir(&input_dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("wav")) {
            let Some(stem) = path.file_stem() else { continue };
            let output = PathBuf::from(&output_dir)
                .join(stem)
                .with_extension(extension);
            let id = stem.to_string_lossy().into_owned();
            jobs.push(BatchJob::new(id, path, output).with_options(options.clone()));
        }
    }
    std::fs::create_dir_all(&output_dir)?;

    println!("Submitting {} job(s)", jobs.len());
    let mut results = service.process_batch(jobs, &cancel);

    let (mut ok, mut failed) = (0, 0);
    while let Some(outcome) = results.next().await {
        match outcome.result {
            Ok(r) => {
                ok += 1;
                println!(
                    "✓ {} -> {} ({} bytes, {:.1}s)",
                    outcome.job_id,
                    r.output_path.display(),
                    r.output_meta.size,
                    r.elapsed.as_secs_f64()
                );
            }
            Err(e) => {
                failed += 1;
                println!("✗ {} [{}]: {}", outcome.job_id, e.kind(), e);
            }
        }
    }

    println!("Done: {} succeeded, {} failed", ok, failed);
    Ok(())
}
