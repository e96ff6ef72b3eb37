//! Reference-data reconciliation: the Remapper and its lookup cache.
//!
//! Provider vocabularies (free-text nuclide names, species, sediment
//! types...) are mapped onto canonical MARIS ids. Each distinct provider
//! value is resolved once through a chain of strategies and the result is
//! cached across runs:
//!
//! 1. cached result (unless overwriting)
//! 2. exact match on the normalized name
//! 3. caller-supplied spelling fix, then exact match
//! 4. pluggable fallback (fuzzy names, WoRMS)
//! 5. otherwise the unmatched sentinel id
//!
//! ```no_run
//! use marisco::remap::{fixes, JsonFileCache, Remapper, shared};
//! use marisco::table::Value;
//! use marisco::vocab::CsvVocabulary;
//!
//! let cache = shared(JsonFileCache::new("cache"));
//! let vocab = CsvVocabulary::new("lut/dbo_nuclide.csv", "nuclide_id", "nc_name");
//! let mut remapper = Remapper::from_values(vec![Value::text("cs134137")], vocab, "nuclides_helcom", cache);
//! let lut = remapper.generate_lookup_table(&fixes(&[("cs134137", "cs134_137_tot")]), false)?;
//! # Ok::<(), marisco::MariscoError>(())
//! ```

mod cache;
mod fallback;
mod matching;
mod remapper;

pub use cache::{JsonFileCache, LookupCache, MemoryCache, SharedCache, lock, shared};
pub use fallback::{
    DEFAULT_WORMS_TIMEOUT, FallbackMatcher, FuzzyNameMatcher, NoFallback, WormsMatcher,
};
pub use matching::{MatchMethod, MatchResult};
pub use remapper::{Fixes, RemapStats, Remapper, fixes};
