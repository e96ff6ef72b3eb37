//! Legacy command - encode reference datasets of the MARIS dump.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use colored::Colorize;
use marisco::handlers::legacy::LegacyHandler;
use marisco::input::{DEFAULT_EXCLUDED_REF_ID, LegacyDump};

use super::load_config;

pub fn run(
    dump: PathBuf,
    lut_dir: Option<PathBuf>,
    output: PathBuf,
    ref_ids: Vec<i64>,
    exclude: Vec<i64>,
    config: Option<PathBuf>,
    cancel: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !dump.exists() {
        return Err(format!("Dump not found: {}", dump.display()).into());
    }
    let config = load_config(config, lut_dir)?;

    let mut excluded = exclude;
    excluded.push(DEFAULT_EXCLUDED_REF_ID);

    println!("{} {}", "Loading".cyan().bold(), dump.display().to_string().white());
    let dump = LegacyDump::load(&dump, &excluded)?;

    let ids = (!ref_ids.is_empty()).then_some(ref_ids.as_slice());
    let report = LegacyHandler::new(config)
        .with_cancel(cancel)
        .encode_all(&dump, ids, &output);

    println!();
    for (ref_id, files) in &report.encoded {
        println!(
            "  {} {:>6}  {} files",
            "ok".green(),
            ref_id,
            files.len()
        );
    }
    for failure in &report.failures {
        println!("  {} {:>6}  {}", "failed".red(), failure.ref_id, failure.error);
    }
    if !report.skipped.is_empty() {
        println!(
            "  {} {} reference ids (cancelled)",
            "skipped".yellow(),
            report.skipped.len()
        );
    }

    println!();
    println!(
        "Encoded {} of {} reference datasets into {}",
        report.encoded.len().to_string().white().bold(),
        (report.encoded.len() + report.failures.len() + report.skipped.len()).to_string().white(),
        output.display()
    );

    if report.is_success() {
        Ok(())
    } else {
        Err(format!(
            "{} failed, {} skipped",
            report.failures.len(),
            report.skipped.len()
        )
        .into())
    }
}
