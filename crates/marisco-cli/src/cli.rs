//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use marisco::steps::EncodingTarget;
use std::path::PathBuf;

/// marisco: harmonize marine radioactivity datasets
#[derive(Parser)]
#[command(name = "marisco")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Harmonize a HELCOM MORS export and write CSV output
    Helcom {
        /// Directory holding the HELCOM CSV exports
        #[arg(value_name = "SRC_DIR")]
        src_dir: PathBuf,

        /// Directory of the canonical MARIS vocabulary CSVs
        #[arg(long)]
        lut_dir: Option<PathBuf>,

        /// Directory of the persistent lookup cache
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Encoding target (netcdf, openrefine)
        #[arg(short, long)]
        target: Option<TargetChoice>,

        /// Handler configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Recompute cached matches
        #[arg(long)]
        overwrite_cache: bool,

        /// Query WoRMS for unmatched species names
        #[arg(long)]
        worms: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Encode reference datasets of the MARIS legacy dump
    Legacy {
        /// Path to the tab-separated dump
        #[arg(value_name = "DUMP")]
        dump: PathBuf,

        /// Directory of the canonical MARIS vocabulary CSVs
        #[arg(long)]
        lut_dir: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Reference ids to encode (default: all)
        #[arg(long = "ref-id", value_name = "N")]
        ref_ids: Vec<i64>,

        /// Reference ids to leave out of the dump
        #[arg(long = "exclude", value_name = "N")]
        exclude: Vec<i64>,

        /// Handler configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Inspect or clear the persistent lookup cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Write a default handler configuration file
    InitConfig {
        /// Destination path
        #[arg(value_name = "PATH", default_value = "marisco.json")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// List cache documents and their entry counts
    List {
        #[arg(long, default_value = "cache")]
        cache_dir: PathBuf,
    },

    /// Delete one cache document
    Clear {
        /// Cache name (e.g. species_helcom)
        #[arg(value_name = "NAME")]
        name: String,

        #[arg(long, default_value = "cache")]
        cache_dir: PathBuf,
    },
}

/// Encoding target as given on the command line.
#[derive(Clone, Copy, Debug, Default)]
pub enum TargetChoice {
    #[default]
    NetCdf,
    OpenRefine,
}

impl std::str::FromStr for TargetChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "netcdf" | "nc" => Ok(TargetChoice::NetCdf),
            "openrefine" | "or" => Ok(TargetChoice::OpenRefine),
            _ => Err(format!("Unknown target: {}. Use netcdf or openrefine.", s)),
        }
    }
}

impl std::fmt::Display for TargetChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetChoice::NetCdf => write!(f, "netcdf"),
            TargetChoice::OpenRefine => write!(f, "openrefine"),
        }
    }
}

impl From<TargetChoice> for EncodingTarget {
    fn from(choice: TargetChoice) -> Self {
        match choice {
            TargetChoice::NetCdf => EncodingTarget::NetCdf,
            TargetChoice::OpenRefine => EncodingTarget::OpenRefine,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_target_choice_parsing() {
        assert!(matches!("OpenRefine".parse::<TargetChoice>(), Ok(TargetChoice::OpenRefine)));
        assert!(matches!("nc".parse::<TargetChoice>(), Ok(TargetChoice::NetCdf)));
        assert!("parquet".parse::<TargetChoice>().is_err());
    }

    #[test]
    fn test_legacy_accepts_repeated_ref_ids() {
        let cli = Cli::try_parse_from([
            "marisco", "legacy", "dump.txt", "--ref-id", "100", "--ref-id", "200",
        ])
        .unwrap();
        match cli.command {
            Commands::Legacy { ref_ids, .. } => assert_eq!(ref_ids, vec![100, 200]),
            _ => panic!("expected legacy command"),
        }
    }
}
