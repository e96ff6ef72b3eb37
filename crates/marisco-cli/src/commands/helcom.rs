//! Helcom command - harmonize a HELCOM MORS export.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use colored::Colorize;
use marisco::encode::CsvEncoder;
use marisco::handlers::helcom::HelcomHandler;

use super::{load_config, print_steps};
use crate::cli::TargetChoice;

pub struct HelcomArgs {
    pub src_dir: PathBuf,
    pub lut_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub output: PathBuf,
    pub target: Option<TargetChoice>,
    pub config: Option<PathBuf>,
    pub overwrite_cache: bool,
    pub worms: bool,
    pub json: bool,
}

pub fn run(args: HelcomArgs, cancel: Arc<AtomicBool>) -> Result<(), Box<dyn std::error::Error>> {
    if !args.src_dir.is_dir() {
        return Err(format!("Source directory not found: {}", args.src_dir.display()).into());
    }

    let mut config = load_config(args.config, args.lut_dir)?;
    if let Some(dir) = args.cache_dir {
        config = config.with_cache_dir(dir);
    }
    if let Some(target) = args.target {
        config = config.with_target(target.into());
    }
    if args.overwrite_cache {
        config = config.with_overwrite_cache(true);
    }
    if args.worms {
        config = config.with_worms(true);
    }

    if !args.json {
        println!(
            "{} {} ({})",
            "Harmonizing".cyan().bold(),
            args.src_dir.display().to_string().white(),
            config.target
        );
    }

    let handler = HelcomHandler::new(config).with_cancel(cancel);
    let encoder = CsvEncoder::new(&args.output, "helcom");
    let summary = handler.encode(&args.src_dir, &encoder)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!();
    print_steps(&summary.report);
    println!();
    println!(
        "Dropped {} rows, {} notes in {} ms",
        summary.report.rows_dropped().to_string().white().bold(),
        summary.notes.to_string().yellow(),
        summary.report.duration_ms
    );
    println!();
    for file in &summary.files {
        println!("{} {}", "Wrote".green().bold(), file.display().to_string().white());
    }
    Ok(())
}
