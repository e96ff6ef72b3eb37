//! Cache command - inspect or clear lookup cache documents.

use std::path::PathBuf;

use colored::Colorize;
use marisco::remap::{JsonFileCache, LookupCache};

pub fn list(cache_dir: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let mut cache = JsonFileCache::new(&cache_dir);
    let names = cache.list()?;
    if names.is_empty() {
        println!("No lookup caches in {}", cache_dir.display());
        return Ok(());
    }

    println!("{} {}", "Lookup caches in".cyan().bold(), cache_dir.display());
    for name in names {
        let entries = cache.len(&name);
        println!("  {:32} {:>6} entries", name, entries);
    }
    Ok(())
}

pub fn clear(cache_dir: PathBuf, name: String) -> Result<(), Box<dyn std::error::Error>> {
    let mut cache = JsonFileCache::new(&cache_dir);
    if !cache.path_for(&name).exists() {
        return Err(format!("No cache named '{}' in {}", name, cache_dir.display()).into());
    }
    cache.invalidate(&name)?;
    println!("{} {}", "Cleared".green().bold(), name);
    Ok(())
}
