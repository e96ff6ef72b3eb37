//! Persistent storage for reconciliation results.
//!
//! Each cache name maps to one JSON document on disk:
//!
//! ```text
//! cache/
//! ├── nuclides_helcom.json
//! └── species_helcom.json
//! ```
//!
//! A document is an object of provider key → [`MatchResult`]. Results are
//! deterministic for a given input, so concurrent writers are safe under
//! last-write-wins; writes go through a temporary file and a rename so
//! readers never observe a partial document.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::matching::MatchResult;
use crate::error::{MariscoError, Result};

/// Key-value store for match results, keyed by `(cache_name, provider key)`.
pub trait LookupCache {
    fn get(&mut self, cache_name: &str, key: &str) -> Option<MatchResult>;

    fn put(&mut self, cache_name: &str, key: &str, result: MatchResult);

    /// Forget every entry stored under `cache_name`.
    fn invalidate(&mut self, cache_name: &str) -> Result<()>;

    /// Persist pending writes for `cache_name`.
    fn flush(&mut self, _cache_name: &str) -> Result<()> {
        Ok(())
    }
}

/// A cache shared between remappers and across pipeline runs. The mutex
/// serializes writers.
pub type SharedCache = Arc<Mutex<dyn LookupCache + Send>>;

/// Wrap a cache for sharing.
pub fn shared(cache: impl LookupCache + Send + 'static) -> SharedCache {
    Arc::new(Mutex::new(cache))
}

/// Lock a shared cache.
pub fn lock(cache: &SharedCache) -> Result<MutexGuard<'_, dyn LookupCache + Send + 'static>> {
    cache
        .lock()
        .map_err(|_| MariscoError::Cache("lookup cache lock poisoned".to_string()))
}

/// In-process cache; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, IndexMap<String, MatchResult>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, cache_name: &str) -> usize {
        self.entries.get(cache_name).map_or(0, IndexMap::len)
    }
}

impl LookupCache for MemoryCache {
    fn get(&mut self, cache_name: &str, key: &str) -> Option<MatchResult> {
        self.entries.get(cache_name)?.get(key).cloned()
    }

    fn put(&mut self, cache_name: &str, key: &str, result: MatchResult) {
        self.entries
            .entry(cache_name.to_string())
            .or_default()
            .insert(key.to_string(), result);
    }

    fn invalidate(&mut self, cache_name: &str) -> Result<()> {
        self.entries.remove(cache_name);
        Ok(())
    }
}

/// File-backed cache: one JSON document per cache name in `dir`.
///
/// Documents are loaded on first access and written back on `flush`.
#[derive(Debug)]
pub struct JsonFileCache {
    dir: PathBuf,
    loaded: HashMap<String, IndexMap<String, MatchResult>>,
    dirty: HashSet<String>,
}

impl JsonFileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            loaded: HashMap::new(),
            dirty: HashSet::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document backing `cache_name`.
    pub fn path_for(&self, cache_name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", cache_stem(cache_name)))
    }

    /// Cache names with a document on disk, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = fs::read_dir(&self.dir)
            .map_err(|e| MariscoError::io(&self.dir, e))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Number of entries stored under `cache_name`.
    pub fn len(&mut self, cache_name: &str) -> usize {
        self.entries(cache_name).len()
    }

    fn entries(&mut self, cache_name: &str) -> &mut IndexMap<String, MatchResult> {
        let stem = cache_stem(cache_name).to_string();
        if !self.loaded.contains_key(&stem) {
            let path = self.path_for(&stem);
            let entries = read_document(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable lookup cache");
                IndexMap::new()
            });
            self.loaded.insert(stem.clone(), entries);
        }
        self.loaded.entry(stem).or_default()
    }
}

impl LookupCache for JsonFileCache {
    fn get(&mut self, cache_name: &str, key: &str) -> Option<MatchResult> {
        self.entries(cache_name).get(key).cloned()
    }

    fn put(&mut self, cache_name: &str, key: &str, result: MatchResult) {
        self.entries(cache_name).insert(key.to_string(), result);
        self.dirty.insert(cache_stem(cache_name).to_string());
    }

    fn invalidate(&mut self, cache_name: &str) -> Result<()> {
        let stem = cache_stem(cache_name).to_string();
        self.loaded.insert(stem.clone(), IndexMap::new());
        self.dirty.remove(&stem);
        let path = self.path_for(&stem);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| MariscoError::io(&path, e))?;
        }
        debug!(cache = %stem, "Invalidated lookup cache");
        Ok(())
    }

    fn flush(&mut self, cache_name: &str) -> Result<()> {
        let stem = cache_stem(cache_name).to_string();
        if !self.dirty.remove(&stem) {
            return Ok(());
        }
        let Some(entries) = self.loaded.get(&stem) else {
            return Ok(());
        };

        fs::create_dir_all(&self.dir).map_err(|e| MariscoError::io(&self.dir, e))?;
        let path = self.path_for(&stem);
        let tmp = path.with_extension("json.tmp");
        let file = File::create(&tmp).map_err(|e| MariscoError::io(&tmp, e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), entries)?;
        fs::rename(&tmp, &path).map_err(|e| MariscoError::io(&path, e))?;
        debug!(cache = %stem, entries = entries.len(), "Flushed lookup cache");
        Ok(())
    }
}

/// Cache names may carry a legacy file extension (`species_helcom.pkl`).
fn cache_stem(cache_name: &str) -> &str {
    cache_name
        .rsplit_once('.')
        .map_or(cache_name, |(stem, _)| stem)
}

fn read_document(path: &Path) -> Result<IndexMap<String, MatchResult>> {
    if !path.exists() {
        return Ok(IndexMap::new());
    }
    let file = File::open(path).map_err(|e| MariscoError::io(path, e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remap::MatchMethod;
    use crate::vocab::VocabularyEntry;
    use tempfile::TempDir;

    fn result(id: i64, name: &str, source: &str) -> MatchResult {
        MatchResult::matched(&VocabularyEntry::new(id, name), source, MatchMethod::Exact)
    }

    #[test]
    fn test_memory_cache_roundtrip() {
        let mut cache = MemoryCache::new();
        cache.put("nuclides", "CS137", result(33, "cs137", "CS137"));
        assert_eq!(cache.get("nuclides", "CS137").unwrap().matched_id, 33);
        assert!(cache.get("species", "CS137").is_none());
        cache.invalidate("nuclides").unwrap();
        assert_eq!(cache.len("nuclides"), 0);
    }

    #[test]
    fn test_file_cache_persists_across_instances() {
        let dir = TempDir::new().unwrap();

        let mut cache = JsonFileCache::new(dir.path());
        cache.put("nuclides_helcom.pkl", "K40", result(4, "k40", "K40"));
        cache.flush("nuclides_helcom.pkl").unwrap();
        assert!(dir.path().join("nuclides_helcom.json").exists());

        let mut reopened = JsonFileCache::new(dir.path());
        assert_eq!(reopened.get("nuclides_helcom", "K40").unwrap().matched_id, 4);
        assert_eq!(reopened.list().unwrap(), vec!["nuclides_helcom"]);

        reopened.invalidate("nuclides_helcom").unwrap();
        assert!(!dir.path().join("nuclides_helcom.json").exists());
        assert!(reopened.get("nuclides_helcom", "K40").is_none());
    }

    #[test]
    fn test_corrupt_document_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("species.json"), "not json").unwrap();
        let mut cache = JsonFileCache::new(dir.path());
        assert!(cache.get("species", "GADU MOR").is_none());
    }
}
