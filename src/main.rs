//! groovescan - batch music analysis
//!
//! Scans a directory for audio files, estimates tempo, classifies genre
//! with a pretrained ONNX network, and writes timestamped CSV reports.
//! Setup failures (configuration, model artifacts) abort the run with a
//! non-zero exit; per-file failures are collected into an error report and
//! the batch continues.

use clap::Parser;
use groovescan::batch::BatchRunner;
use groovescan::classifier::GenreClassifier;
use groovescan::config::Config;
use groovescan::scanner::AudioScanner;
use groovescan::{provision, report, Error};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "groovescan", version, about = "Batch BPM and genre analysis for audio files")]
struct Args {
    /// Directory scanned for audio files
    #[arg(default_value = "audio_mp3")]
    input: PathBuf,

    /// Configuration file (falls back to built-in defaults when absent)
    #[arg(short, long, env = "GROOVESCAN_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Override the configured active model for this run
    #[arg(short, long)]
    model: Option<String>,

    /// Directory the CSV reports are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Skip tempo estimation (faster, BPM column reads 0.0)
    #[arg(long)]
    skip_bpm: bool,

    /// Descend into subdirectories of the input directory
    #[arg(short, long)]
    recursive: bool,

    /// List the configured models and exit
    #[arg(long)]
    list_models: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn init_logging(args: &Args) {
    let default_level = if args.quiet {
        "warn"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("groovescan={},ort=warn", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn list_models(config: &Config) {
    let active = &config.model_settings.active_model;
    println!("Configured models:");
    for (key, desc) in &config.model_settings.models {
        let marker = if key == active { "*" } else { " " };
        print!("{} {:<12} {}", marker, key, desc.name);
        if let Some(count) = desc.genre_count {
            print!(" ({} genres)", count);
        }
        if let Some(description) = &desc.description {
            print!(" - {}", description);
        }
        println!();
    }
}

fn run(args: &Args, interrupt: Arc<AtomicBool>) -> groovescan::Result<()> {
    let mut config = Config::load(&args.config);
    if let Some(model) = &args.model {
        config.model_settings.active_model = model.clone();
    }
    if args.skip_bpm {
        config.processing_settings.enable_tempo_analysis = false;
    }

    if args.list_models {
        list_models(&config);
        return Ok(());
    }

    let (model_key, descriptor) = config.active_descriptor()?;
    info!(model = %descriptor.name, key = model_key, "Active model");

    provision::ensure_model_files(descriptor)?;

    let mut classifier = GenreClassifier::from_config(&config)?;
    classifier.load()?;

    let scanner = if args.recursive {
        AudioScanner::recursive()
    } else {
        AudioScanner::new()
    };
    let files = scanner.scan(&args.input)?;
    if files.is_empty() {
        warn!(dir = %args.input.display(), "No audio files found, nothing to do");
        return Ok(());
    }
    info!(count = files.len(), dir = %args.input.display(), "Audio files found");

    let outcome = BatchRunner::new(interrupt).run(&files, &mut classifier)?;

    let writer = report::ReportWriter::new(
        &args.output_dir,
        config.output_settings.clone(),
        classifier.model_key(),
        classifier.model_name(),
        config.processing_settings.top_genres_count,
    );
    writer.write(&outcome)?;
    report::log_summary(&outcome);

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args);

    let interrupt = Arc::new(AtomicBool::new(false));
    let handler_flag = interrupt.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Could not install interrupt handler");
    }

    match run(&args, interrupt) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Interrupted { completed, total }) => {
            warn!(completed, total, "Interrupted, no reports written");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            ExitCode::FAILURE
        }
    }
}
