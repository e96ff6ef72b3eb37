//! Handler configuration, persisted as JSON.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MariscoError, Result};
use crate::remap::{DEFAULT_WORMS_TIMEOUT, FallbackMatcher, FuzzyNameMatcher, NoFallback, WormsMatcher};
use crate::steps::{EncodingTarget, SedimentRules};

/// Settings shared by the dataset handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Directory holding the canonical vocabulary CSV exports.
    pub lut_dir: PathBuf,
    /// Directory of the persistent lookup cache.
    pub cache_dir: PathBuf,
    /// Query WoRMS for species names that fail exact and fixed matching.
    pub worms_enabled: bool,
    /// WoRMS request timeout in seconds.
    pub worms_timeout_secs: u64,
    /// Maximum edit distance of the fuzzy name fallback; 0 disables it.
    pub fuzzy_max_distance: usize,
    /// Recompute cached matches instead of reading them.
    pub overwrite_cache: bool,
    pub target: EncodingTarget,
    pub sediment_rules: SedimentRules,
    /// Zotero key of the HELCOM MORS publication.
    pub zotero_key: String,
    pub keywords: Vec<String>,
}

/// Zotero record of the HELCOM MORS database.
pub const HELCOM_ZOTERO_KEY: &str = "26VMZZ2Q";

/// GCMD keywords attached to encoded marine radioactivity datasets.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "oceanography",
    "Earth Science > Oceans > Ocean Chemistry> Radionuclides",
    "Earth Science > Human Dimensions > Environmental Impacts > Nuclear Radiation Exposure",
    "Earth Science > Oceans > Ocean Chemistry > Ocean Tracers, Earth Science > Oceans > Marine Sediments",
    "Earth Science > Oceans > Ocean Chemistry, Earth Science > Oceans > Sea Ice > Isotopes",
    "Earth Science > Oceans > Water Quality > Ocean Contaminants",
    "Earth Science > Biological Classification > Animals/Vertebrates > Fish",
    "Earth Science > Biosphere > Ecosystems > Marine Ecosystems",
    "Earth Science > Biological Classification > Animals/Invertebrates > Mollusks",
    "Earth Science > Biological Classification > Animals/Invertebrates > Arthropods > Crustaceans",
    "Earth Science > Biological Classification > Plants > Macroalgae (Seaweeds)",
];

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            lut_dir: PathBuf::from("lut"),
            cache_dir: PathBuf::from("cache"),
            worms_enabled: false,
            worms_timeout_secs: DEFAULT_WORMS_TIMEOUT.as_secs(),
            fuzzy_max_distance: 0,
            overwrite_cache: false,
            target: EncodingTarget::NetCdf,
            sediment_rules: SedimentRules::default(),
            zotero_key: HELCOM_ZOTERO_KEY.to_string(),
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl HandlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lut_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lut_dir = dir.into();
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_worms(mut self, enabled: bool) -> Self {
        self.worms_enabled = enabled;
        self
    }

    pub fn with_fuzzy_max_distance(mut self, distance: usize) -> Self {
        self.fuzzy_max_distance = distance;
        self
    }

    pub fn with_overwrite_cache(mut self, overwrite: bool) -> Self {
        self.overwrite_cache = overwrite;
        self
    }

    pub fn with_target(mut self, target: EncodingTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_sediment_rules(mut self, rules: SedimentRules) -> Self {
        self.sediment_rules = rules;
        self
    }

    /// Path of a vocabulary export inside `lut_dir`.
    pub fn lut_path(&self, file: &str) -> PathBuf {
        self.lut_dir.join(file)
    }

    /// The species fallback selected by this configuration: WoRMS when
    /// enabled, else fuzzy matching when a distance is set, else none.
    pub fn species_fallback(&self) -> Result<Box<dyn FallbackMatcher>> {
        if self.worms_enabled {
            let worms = WormsMatcher::with_timeout(Duration::from_secs(self.worms_timeout_secs))?;
            return Ok(Box::new(worms));
        }
        Ok(self.name_fallback())
    }

    /// Fuzzy fallback for non-taxonomic vocabularies.
    pub fn name_fallback(&self) -> Box<dyn FallbackMatcher> {
        if self.fuzzy_max_distance > 0 {
            Box::new(FuzzyNameMatcher::new(self.fuzzy_max_distance))
        } else {
            Box::new(NoFallback)
        }
    }

    /// Load a configuration file. Absent fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| MariscoError::io(path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            MariscoError::Config(format!(
                "Failed to parse configuration '{}': {}",
                path.display(),
                e
            ))
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| MariscoError::io(parent, e))?;
            }
        }
        let file = File::create(path).map_err(|e| MariscoError::io(path, e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf").join("marisco.json");
        let config = HandlerConfig::new()
            .with_lut_dir("/data/lut")
            .with_target(EncodingTarget::OpenRefine)
            .with_fuzzy_max_distance(2);
        config.save(&path).unwrap();

        let loaded = HandlerConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("marisco.json");
        fs::write(&path, r#"{"target": "openrefine", "worms_enabled": true}"#).unwrap();

        let loaded = HandlerConfig::load(&path).unwrap();
        assert_eq!(loaded.target, EncodingTarget::OpenRefine);
        assert!(loaded.worms_enabled);
        assert_eq!(loaded.sediment_rules, SedimentRules::default());
        assert_eq!(loaded.zotero_key, HELCOM_ZOTERO_KEY);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("marisco.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(HandlerConfig::load(&path), Err(MariscoError::Config(_))));
    }
}
