//! wavpipe command-line entry point.
//!
//! Streams one WAV file through the pipeline and prints the recognizer's
//! final result as JSON on stdout. Progress and logs go to stderr.

#![forbid(unsafe_code)]

mod args;
mod display;
mod settings;

use anyhow::Context;
use args::{parse_args, Parsed, USAGE};
use display::StderrProgress;
use settings::{default_settings_path, load_settings, save_settings};
use tracing::{debug, info};
use wavpipe_core::{NoProgress, Pipeline};

fn main() {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(Parsed::Run(args)) => args,
        Ok(Parsed::Help) => {
            println!("{USAGE}");
            return;
        }
        Err(msg) => {
            eprintln!("wavpipe: {msg}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    // ── Tracing ───────────────────────────────────────────────────────────
    let default_filter = if args.quiet {
        "wavpipe=warn,wavpipe_core=warn"
    } else {
        "wavpipe=info,wavpipe_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args) {
        eprintln!("wavpipe: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: args::Args) -> anyhow::Result<()> {
    let settings_path = args
        .settings_path
        .clone()
        .unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&settings_path);
    settings.apply_env_overrides();
    args.apply_to(&mut settings);
    debug!(?settings, path = %settings_path.display(), "effective settings");

    if args.save_settings {
        save_settings(&settings_path, &settings)
            .with_context(|| format!("could not save settings to {}", settings_path.display()))?;
        info!(path = %settings_path.display(), "settings saved");
    }

    let config = settings.to_pipeline_config();
    let kind = settings.recognizer_kind();
    let recognizer = kind.build(config.sample_rate);
    info!(
        file = %args.wav_file.display(),
        recognizer = kind.as_str(),
        chunk_size = config.chunk_size,
        queue_capacity = config.queue_capacity,
        "wavpipe starting"
    );

    let pipeline = Pipeline::new(config);
    let outcome = if settings.show_progress {
        let outcome = pipeline.run_file(&args.wav_file, recognizer, StderrProgress::new());
        eprintln!();
        outcome
    } else {
        pipeline.run_file(&args.wav_file, recognizer, NoProgress)
    };
    let result =
        outcome.with_context(|| format!("failed to process {}", args.wav_file.display()))?;

    let diag = pipeline.diagnostics_snapshot();
    debug!(?diag, "queue diagnostics");
    info!(
        chunks = result.chunks_accepted,
        bytes = result.bytes_accepted,
        producer_full_waits = diag.producer_full_waits,
        consumer_empty_waits = diag.consumer_empty_waits,
        "transfer complete"
    );

    println!("Final Result: {}", serde_json::to_string(&result)?);
    Ok(())
}
