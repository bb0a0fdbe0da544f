use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use docbin::core::LogObserver;
use docbin::io::{load_gray, load_mask, save_mask};
use docbin::metrics::{evaluate, MetricsConfig};
use docbin::otsu::{Binarizer, ProcessingConfig};
use docbin::{load_json, write_json, BinarizationReport, DocbinError};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "docbin",
    version,
    about = "Binarize document images with 2D Otsu thresholding and score them with DIBCO metrics"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Binarize one image and write the mask.
    Binarize {
        #[arg(long)]
        input: PathBuf,
        /// Mask output path (black ink on white).
        #[arg(long)]
        output: PathBuf,
        /// JSON processing config; defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Ground-truth mask to evaluate the result against.
        #[arg(long)]
        ground_truth: Option<PathBuf>,
        /// Report path; printed to stdout when omitted.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Score an existing mask against ground truth.
    Evaluate {
        #[arg(long)]
        mask: PathBuf,
        #[arg(long)]
        ground_truth: PathBuf,
        /// Original image, enables contrast statistics.
        #[arg(long)]
        original: Option<PathBuf>,
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print or write the default processing config.
    DefaultConfig {
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    #[cfg(feature = "tracing")]
    {
        let _ = tracing_log::LogTracer::init();
        docbin::core::init_tracing(docbin::core::level_for_verbosity(verbose), false);
    }
    #[cfg(not(feature = "tracing"))]
    {
        let _ = docbin::core::init_with_level(docbin::core::level_for_verbosity(verbose));
    }
}

fn emit<T: Serialize>(value: &T, path: Option<&Path>) -> Result<(), DocbinError> {
    match path {
        Some(path) => {
            write_json(value, path)?;
            log::info!("wrote {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

fn run(command: Command) -> Result<(), DocbinError> {
    match command {
        Command::Binarize {
            input,
            output,
            config,
            ground_truth,
            report,
        } => {
            let config: ProcessingConfig = match &config {
                Some(path) => load_json(path)?,
                None => ProcessingConfig::default(),
            };
            let binarizer = Binarizer::new(config)?;
            let image = load_gray(&input)?;
            log::info!(
                "binarizing {} ({}x{}) with {}",
                input.display(),
                image.width,
                image.height,
                binarizer.method_name()
            );
            let out = binarizer.run_with_observer(&image.view(), &LogObserver)?;
            save_mask(&out.mask, &output)?;

            let quality = match &ground_truth {
                Some(path) => {
                    let gt = load_mask(path)?;
                    Some(evaluate(
                        &out.mask,
                        &gt,
                        Some(&image.view()),
                        &MetricsConfig::default(),
                    )?)
                }
                None => None,
            };
            let summary = BinarizationReport::new(
                input.display().to_string(),
                binarizer.method_name(),
                &out,
                quality,
            );
            emit(&summary, report.as_deref())
        }
        Command::Evaluate {
            mask,
            ground_truth,
            original,
            report,
        } => {
            let produced = load_mask(&mask)?;
            let gt = load_mask(&ground_truth)?;
            let original = original.as_ref().map(load_gray).transpose()?;
            let quality = evaluate(
                &produced,
                &gt,
                original.as_ref().map(|img| img.view()).as_ref(),
                &MetricsConfig::default(),
            )?;
            emit(&quality, report.as_deref())
        }
        Command::DefaultConfig { output } => emit(&ProcessingConfig::default(), output.as_deref()),
    }
}
