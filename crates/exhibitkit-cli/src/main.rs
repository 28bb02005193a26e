// SPDX-License-Identifier: MIT
//
// exhibitkit: command-line front end.
//
// Takes a job file (JSON: sources plus pipeline configuration), runs the
// pipeline once, and prints the manifest as JSON on stdout. Progress and
// diagnostics go to stderr so the manifest stays machine-readable.

use std::process::ExitCode;

use exhibitkit_core::config::PipelineConfig;
use exhibitkit_core::human_errors::humanize_error;
use exhibitkit_core::types::format_bytes;
use exhibitkit_pipeline::{ExhibitPipeline, ExhibitSource};
use serde::Deserialize;
use tracing::info;

/// On-disk description of one pipeline run.
#[derive(Debug, Deserialize)]
struct JobFile {
    sources: Vec<ExhibitSource>,
    #[serde(default)]
    config: PipelineConfig,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let job_path = match args.next() {
        Some(path) if args.next().is_none() => path,
        _ => {
            eprintln!("usage: exhibitkit <job.json>");
            return ExitCode::from(2);
        }
    };

    let job: JobFile = match std::fs::read(&job_path)
        .map_err(|err| format!("cannot read {job_path}: {err}"))
        .and_then(|bytes| {
            serde_json::from_slice(&bytes).map_err(|err| format!("invalid job file: {err}"))
        }) {
        Ok(job) => job,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    info!(sources = job.sources.len(), "starting pipeline run");
    let pipeline = ExhibitPipeline::new(job.config);
    match pipeline.run(&job.sources, |event| {
        eprintln!(
            "[{}] {}/{} {}",
            event.stage, event.current, event.total, event.detail
        );
    }) {
        Ok(manifest) => {
            info!(
                exhibits = manifest.total_exhibits,
                original = %format_bytes(manifest.total_original_size),
                compressed = %format_bytes(manifest.total_compressed_size),
                "pipeline complete"
            );
            match serde_json::to_string_pretty(&manifest) {
                Ok(json) => println!("{json}"),
                Err(err) => {
                    eprintln!("cannot serialize manifest: {err}");
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            let human = humanize_error(&err);
            eprintln!("error: {}", human.message);
            eprintln!("  {}", human.suggestion);
            eprintln!("  detail: {}", human.detail);
            ExitCode::FAILURE
        }
    }
}
