//! BioStamp Segmenter CLI
//!
//! Align and segment MC10 BioStamp RC study exports.

use anyhow::{Context, Result};
use biostamp_segmenter::{
    config::Config,
    core::MissingReferencePolicy,
    loader::StudyLoader,
    persist::{load_study, save_study, OutputFormat},
    pipeline::Pipeline,
    report::create_shared_log,
    VERSION,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "biostamp")]
#[command(version = VERSION)]
#[command(about = "Align and segment MC10 BioStamp RC recordings", long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, align and segment every subject of a study export
    Process {
        /// Study directory containing subject folders and annotations.csv
        study_dir: PathBuf,

        /// Output file (defaults to the configured output path)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Output format (json or jsonl)
        #[arg(long, default_value = "json")]
        format: OutputFormat,

        /// Seconds of data to keep before each event
        #[arg(long)]
        pre_time: Option<f64>,

        /// Skip timestamp alignment
        #[arg(long)]
        no_align: bool,

        /// Skip event segmentation
        #[arg(long)]
        no_segment: bool,

        /// Number of subjects processed in parallel
        #[arg(long)]
        workers: Option<usize>,

        /// Locations without a reference sensor: drop, passthrough or resample
        #[arg(long)]
        missing_reference: Option<MissingReferencePolicy>,

        /// Only process these subjects (repeatable)
        #[arg(long = "subject")]
        subjects: Vec<String>,
    },

    /// Summarise a saved study output
    Inspect {
        /// File written by `biostamp process` in json format
        file: PathBuf,
    },

    /// Show configuration
    Config,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Process {
            study_dir,
            output,
            format,
            pre_time,
            no_align,
            no_segment,
            workers,
            missing_reference,
            subjects,
        } => {
            let mut config = match Config::load() {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Could not load configuration, using defaults: {e}");
                    Config::default()
                }
            };
            if let Some(pre_time) = pre_time {
                config.pre_time_secs = pre_time;
            }
            if let Some(workers) = workers {
                config.workers = workers;
            }
            if let Some(policy) = missing_reference {
                config.missing_reference = policy;
            }
            config.align &= !no_align;
            config.segment &= !no_segment;

            cmd_process(&config, study_dir, output, format, subjects)
        }
        Commands::Inspect { file } => cmd_inspect(&file),
        Commands::Config => cmd_config(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_process(
    config: &Config,
    study_dir: PathBuf,
    output: Option<PathBuf>,
    format: OutputFormat,
    subjects: Vec<String>,
) -> Result<()> {
    println!("BioStamp Segmenter v{VERSION}");
    println!();

    let pipeline = Pipeline::from_config(config).context("Invalid configuration")?;

    println!("Study: {study_dir:?}");
    println!("  Alignment: {}", if config.align { "enabled" } else { "disabled" });
    println!(
        "  Segmentation: {}",
        if config.segment { "enabled" } else { "disabled" }
    );
    println!("  Pre-event time: {}s", config.pre_time_secs);
    println!("  Missing reference: {}", config.missing_reference);
    println!();

    let loaded = StudyLoader::from_config(&study_dir, config)
        .with_subjects(subjects)
        .load()
        .with_context(|| format!("Failed to load study {study_dir:?}"))?;

    let log = create_shared_log();
    let pipeline = pipeline.with_log(log.clone());
    let mut study = pipeline.process_study(loaded.subjects);
    for (subject, error) in loaded.failures {
        log.record_subject_failed();
        study.failures.insert(subject, error);
    }

    let output_path = match output {
        Some(path) => format.resolve_path(path),
        None => config.output_path.with_extension(format.extension()),
    };
    save_study(&study, &output_path, format)
        .with_context(|| format!("Failed to write {output_path:?}"))?;

    let stats_path = output_path.with_extension("stats.json");
    if let Err(e) = log.save_to(&stats_path) {
        eprintln!("Warning: Could not save run statistics: {e}");
    }

    for (subject, error) in &study.failures {
        println!("Skipped {subject}: {error}");
    }
    if !study.failures.is_empty() {
        println!();
    }
    println!("{}", log.summary());
    println!();
    println!("Saved to {output_path:?}");

    Ok(())
}

fn cmd_inspect(file: &Path) -> Result<()> {
    let study = load_study(file).with_context(|| format!("Failed to read {file:?}"))?;

    println!("Run {} ({})", study.metadata.run_id, study.metadata.created_at);
    println!(
        "  Aligned: {}, segmented: {}",
        study.metadata.aligned, study.metadata.segmented
    );
    println!();

    for (subject, output) in &study.subjects {
        println!("{subject}");
        if let Some(segments) = &output.segments {
            for (location, kinds) in segments.locations() {
                for (kind, events) in kinds {
                    println!("  {location}/{kind}: {} events", events.len());
                    for (event, table) in events {
                        println!("    {event}: {} samples", table.len());
                    }
                }
            }
        }
        if let Some(data) = &output.data {
            for (location, kinds) in data.locations() {
                for (kind, table) in kinds {
                    println!(
                        "  {location}/{kind}: {} samples, {} channels",
                        table.len(),
                        table.channel_count()
                    );
                }
            }
        }
        for warning in &output.warnings {
            println!("  warning: {warning}");
        }
    }

    for (subject, error) in &study.failures {
        println!("{subject}: failed ({error})");
    }

    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}
