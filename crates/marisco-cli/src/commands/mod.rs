//! CLI command implementations.

pub mod cache;
pub mod helcom;
pub mod init_config;
pub mod legacy;

use std::path::PathBuf;

use colored::Colorize;
use marisco::config::HandlerConfig;
use marisco::pipeline::RunReport;

/// Configuration from `path` (or defaults), with the lookup table
/// directory overridden when given.
pub(crate) fn load_config(
    path: Option<PathBuf>,
    lut_dir: Option<PathBuf>,
) -> Result<HandlerConfig, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(format!("Config file not found: {}", path.display()).into());
            }
            HandlerConfig::load(&path)?
        }
        None => HandlerConfig::default(),
    };
    if let Some(dir) = lut_dir {
        config = config.with_lut_dir(dir);
    }
    if !config.lut_dir.is_dir() {
        return Err(format!(
            "Lookup table directory not found: {}\nPass --lut-dir or set lut_dir in the config file.",
            config.lut_dir.display()
        )
        .into());
    }
    Ok(config)
}

/// Per-step row counts, as printed after a run.
pub(crate) fn print_steps(report: &RunReport) {
    println!("{}", "Steps:".yellow().bold());
    for step in &report.steps {
        let dropped = step.rows_before.saturating_sub(step.rows_after);
        let dropped = if dropped > 0 {
            format!("-{}", dropped).red().to_string()
        } else {
            String::new()
        };
        let notes = if step.notes > 0 {
            format!("{} notes", step.notes).yellow().to_string()
        } else {
            String::new()
        };
        println!("  {:32} {:>8} {:>8} {}", step.name, step.rows_after, dropped, notes);
    }
}
