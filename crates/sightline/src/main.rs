//! sightline: run a JSON pipeline definition against an image file.
//!
//! Reads a pipeline definition, optionally decodes an input image,
//! executes the stages, prints the result document to stdout as pretty
//! JSON, and optionally writes the transformed image back out. Logging
//! goes to stderr so the result document stays machine-parseable.
//!
//! # Usage
//!
//! ```text
//! sightline -p pipeline.json [-i in.png] [-o out.png] \
//!     [-D name=value ...] [--time] [--debug | --trace]
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use sightline_pipeline::{ArgMap, DynamicImage, EngineError, Pipeline};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pipeline definitions shorter than this cannot be a valid stage
/// array; rejecting them early gives a clearer message than a JSON
/// parse error.
const MIN_PIPELINE_BYTES: usize = 10;

/// Extra runs performed by `--time`, beyond the initial one.
const BENCH_ITERATIONS: u32 = 100;

/// Run a JSON-described sequence of image processing stages and report
/// what each stage did.
#[derive(Parser, Debug)]
#[command(name = "sightline", version)]
struct Cli {
    /// Path to the JSON pipeline definition.
    #[arg(short = 'p', long = "pipeline")]
    pipeline: PathBuf,

    /// Input image (PNG, JPEG, BMP, WebP). Absent means stages start
    /// from an empty image.
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    /// Write the transformed working image here after the run.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Pipeline argument as name=value, repeatable. Referenced from
    /// stage parameters as {name}.
    #[arg(short = 'D', value_name = "NAME=VALUE")]
    define: Vec<String>,

    /// After the first run, repeat the pipeline 100 times and log the
    /// mean wall time per run.
    #[arg(long)]
    time: bool,

    /// Process live camera frames (not supported in this build).
    #[arg(long)]
    video: bool,

    /// Enable debug-level logging.
    #[arg(long)]
    debug: bool,

    /// Enable trace-level logging.
    #[arg(long, conflicts_with = "debug")]
    trace: bool,
}

fn init_tracing(cli: &Cli) {
    let fallback = if cli.trace {
        "sightline=trace,sightline_pipeline=trace"
    } else if cli.debug {
        "sightline=debug,sightline_pipeline=debug"
    } else {
        "sightline=info,sightline_pipeline=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| fallback.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Parse repeated `-D name=value` pairs into an ArgMap.
fn parse_defines(pairs: &[String]) -> Result<ArgMap, String> {
    let mut args = ArgMap::new();
    for pair in pairs {
        let Some((name, value)) = pair.split_once('=') else {
            return Err(format!("malformed -D argument \"{pair}\", expected name=value"));
        };
        if name.is_empty() {
            return Err(format!("malformed -D argument \"{pair}\", empty name"));
        }
        args.insert(name.to_string(), value.to_string());
    }
    Ok(args)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    if cli.video {
        tracing::error!("live video mode is not supported in this build");
        return ExitCode::FAILURE;
    }

    let args = match parse_defines(&cli.define) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let text = match std::fs::read_to_string(&cli.pipeline) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.pipeline.display());
            return ExitCode::FAILURE;
        }
    };
    if text.trim().len() < MIN_PIPELINE_BYTES {
        tracing::error!(
            path = %cli.pipeline.display(),
            bytes = text.trim().len(),
            "pipeline definition is too short to be a stage array"
        );
        return ExitCode::FAILURE;
    }

    let pipeline = match Pipeline::new(&text) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Error parsing {}: {e}", cli.pipeline.display());
            return ExitCode::FAILURE;
        }
    };

    let mut image = match &cli.input {
        Some(path) => match image::open(path) {
            Ok(image) => image,
            Err(e) => {
                let error = EngineError::from(e);
                eprintln!(
                    "Error decoding {} [{}]: {error}",
                    path.display(),
                    error.kind(),
                );
                return ExitCode::FAILURE;
            }
        },
        None => DynamicImage::new_rgb8(0, 0),
    };

    // The first run mutates the working image; keep a pristine copy
    // when benchmarking so every timed run starts from the same input.
    let bench_source = cli.time.then(|| image.clone());

    let result = pipeline.process(&mut image, &args);

    match serde_json::to_string_pretty(&result.into_value()) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing result document: {e}");
            return ExitCode::FAILURE;
        }
    }

    if let Some(path) = &cli.output {
        if let Err(e) = image.save(path) {
            let error = EngineError::from(e);
            eprintln!(
                "Error writing {} [{}]: {error}",
                path.display(),
                error.kind(),
            );
            return ExitCode::FAILURE;
        }
        tracing::debug!(path = %path.display(), "wrote working image");
    }

    if let Some(source) = bench_source {
        let mean = pipeline.measure(&source, &args, BENCH_ITERATIONS);
        tracing::info!(
            iterations = BENCH_ITERATIONS,
            mean_ms = mean.as_secs_f64() * 1000.0,
            "benchmark complete"
        );
    }

    ExitCode::SUCCESS
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defines_parse_into_arg_map() {
        let args = parse_defines(&[
            "sigma=2.0".to_string(),
            "label=run=7".to_string(),
        ])
        .unwrap();
        assert_eq!(args.get("sigma").map(String::as_str), Some("2.0"));
        // Only the first '=' splits; the value keeps the rest.
        assert_eq!(args.get("label").map(String::as_str), Some("run=7"));
    }

    #[test]
    fn malformed_define_is_rejected() {
        assert!(parse_defines(&["nodelimiter".to_string()]).is_err());
        assert!(parse_defines(&["=value".to_string()]).is_err());
    }

    #[test]
    fn cli_requires_pipeline_path() {
        use clap::CommandFactory;
        let err = Cli::try_parse_from(["sightline"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        Cli::command().debug_assert();
    }

    #[test]
    fn debug_and_trace_conflict() {
        let err = Cli::try_parse_from(["sightline", "-p", "x.json", "--debug", "--trace"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
