//! InitConfig command - write the default handler configuration.

use std::path::PathBuf;

use colored::Colorize;
use marisco::config::HandlerConfig;

pub fn run(path: PathBuf, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !force {
        return Err(format!("{} already exists (use --force to overwrite)", path.display()).into());
    }
    HandlerConfig::default().save(&path)?;
    println!("{} {}", "Wrote".green().bold(), path.display().to_string().white());
    Ok(())
}
