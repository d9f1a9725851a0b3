//! Benchmark discovery over a `<root>/<language>/<algorithm>` tree.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::core::BenchmarkUnit;

/// Discovered units, grouped by algorithm then language.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    by_algorithm: BTreeMap<String, BTreeMap<String, BenchmarkUnit>>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    /// Add a unit, replacing any existing unit with the same (language, algorithm).
    pub fn insert(&mut self, unit: BenchmarkUnit) {
        self.by_algorithm
            .entry(unit.algorithm.clone())
            .or_default()
            .insert(unit.language.clone(), unit);
    }

    pub fn get(&self, language: &str, algorithm: &str) -> Option<&BenchmarkUnit> {
        self.by_algorithm.get(algorithm)?.get(language)
    }

    pub fn len(&self) -> usize {
        self.by_algorithm.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_algorithm.is_empty()
    }

    /// Algorithm names in sorted order.
    pub fn algorithms(&self) -> impl Iterator<Item = &str> {
        self.by_algorithm.keys().map(String::as_str)
    }

    /// Languages implementing `algorithm`, sorted.
    pub fn languages_for(&self, algorithm: &str) -> Vec<&str> {
        self.by_algorithm
            .get(algorithm)
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Units ordered per algorithm, then per language.
    pub fn units(&self) -> impl Iterator<Item = &BenchmarkUnit> {
        self.by_algorithm.values().flat_map(|m| m.values())
    }

    /// Units ordered per language, then per algorithm.
    pub fn units_by_language(&self) -> Vec<&BenchmarkUnit> {
        let mut units: Vec<&BenchmarkUnit> = self.units().collect();
        units.sort_by(|a, b| {
            (a.language.as_str(), a.algorithm.as_str())
                .cmp(&(b.language.as_str(), b.algorithm.as_str()))
        });
        units
    }

    /// Keep only units of `algorithm`.
    pub fn retain_algorithm(&mut self, algorithm: &str) {
        self.by_algorithm.retain(|name, _| name == algorithm);
    }
}

/// Scan `root/<language>` for each language tag; each immediate subdirectory is one unit.
///
/// Missing or unreadable language directories are skipped. Hidden entries
/// (names starting with `.`) and plain files are ignored.
pub fn discover(root: &Path, languages: &[String]) -> Catalog {
    let mut catalog = Catalog::new();

    for language in languages {
        let lang_dir = root.join(language);
        if !lang_dir.is_dir() {
            debug!(language = %language, dir = %lang_dir.display(), "no language directory, skipping");
            continue;
        }
        let entries = match std::fs::read_dir(&lang_dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(dir = %lang_dir.display(), "failed to read language directory: {e}");
                continue;
            }
        };

        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!(path = %path.display(), "skipping non UTF-8 directory name");
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            debug!(language = %language, algorithm = %name, "discovered unit");
            catalog.insert(BenchmarkUnit::new(language.clone(), name, path));
        }
    }

    catalog
}
