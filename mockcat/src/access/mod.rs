//! Table access backends
//!
//! Readers never open files themselves; they go through a [`CatalogAccess`]
//! implementation. [`MemoryAccess`] serves tables registered in memory and is
//! what the tests use. The FITS backend lives behind the `fits` feature.

#[cfg(feature = "fits")]
mod fits;

#[cfg(feature = "fits")]
pub use fits::FitsAccess;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::error::{MockError, Result};
use crate::table::{ColumnTable, HeaderCards};

/// Source of binary tables, per-HDU headers and hierarchical datasets
pub trait CatalogAccess: Send + Sync {
    /// True if `path` is a file or directory visible to this backend
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Paths matching a glob pattern, in discovery order
    fn discover(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        glob::glob(pattern)?
            .map(|entry| entry.map_err(MockError::from))
            .collect()
    }

    /// Read the named columns of the first table extension
    fn read_table(&self, path: &Path, columns: &[&str]) -> Result<ColumnTable>;

    /// Read `keys` from the header of every extension after the primary HDU
    fn read_extension_headers(&self, path: &Path, keys: &[&str]) -> Result<Vec<HeaderCards>>;

    /// Read one-dimensional datasets `names` from `group` of a hierarchical file
    fn read_datasets(&self, path: &Path, group: &str, names: &[&str]) -> Result<ColumnTable>;
}

#[derive(Debug, Clone)]
enum MemoryEntry {
    Table(ColumnTable),
    Headers(Vec<HeaderCards>),
    Groups(HashMap<String, ColumnTable>),
}

/// In-memory backend keyed by path
///
/// `discover` matches registered paths against the pattern and returns them in
/// registration order, which lets tests control discovery order.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccess {
    order: Vec<PathBuf>,
    entries: HashMap<PathBuf, MemoryEntry>,
}

impl MemoryAccess {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, path: PathBuf, entry: MemoryEntry) {
        if !self.entries.contains_key(&path) {
            self.order.push(path.clone());
        }
        self.entries.insert(path, entry);
    }

    /// Register a binary table at `path`
    pub fn insert_table(&mut self, path: impl Into<PathBuf>, table: ColumnTable) {
        self.register(path.into(), MemoryEntry::Table(table));
    }

    /// Register per-extension header cards at `path`
    pub fn insert_headers(&mut self, path: impl Into<PathBuf>, headers: Vec<HeaderCards>) {
        self.register(path.into(), MemoryEntry::Headers(headers));
    }

    /// Register a dataset group at `path`
    pub fn insert_group(&mut self, path: impl Into<PathBuf>, group: &str, table: ColumnTable) {
        let path = path.into();
        let mut groups = match self.entries.get(&path) {
            Some(MemoryEntry::Groups(g)) => g.clone(),
            _ => HashMap::new(),
        };
        groups.insert(group.trim_matches('/').to_string(), table);
        self.register(path, MemoryEntry::Groups(groups));
    }

    fn entry(&self, path: &Path) -> Result<&MemoryEntry> {
        self.entries
            .get(path)
            .ok_or_else(|| MockError::MissingSource(path.to_path_buf()))
    }
}

fn wrong_kind(path: &Path, wanted: &str) -> MockError {
    MockError::Unsupported(format!("{} does not hold {}", path.display(), wanted))
}

impl CatalogAccess for MemoryAccess {
    /// Registered paths exist, and so does every directory above them
    fn exists(&self, path: &Path) -> bool {
        self.order.iter().any(|p| p.starts_with(path))
    }

    fn discover(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let pattern = Pattern::new(pattern)?;
        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::default()
        };
        Ok(self
            .order
            .iter()
            .filter(|p| pattern.matches_path_with(p, options))
            .cloned()
            .collect())
    }

    fn read_table(&self, path: &Path, columns: &[&str]) -> Result<ColumnTable> {
        match self.entry(path)? {
            MemoryEntry::Table(table) => table.select(columns),
            _ => Err(wrong_kind(path, "a binary table")),
        }
    }

    fn read_extension_headers(&self, path: &Path, keys: &[&str]) -> Result<Vec<HeaderCards>> {
        let MemoryEntry::Headers(headers) = self.entry(path)? else {
            return Err(wrong_kind(path, "extension headers"));
        };
        for (i, cards) in headers.iter().enumerate() {
            if let Some(key) = keys.iter().find(|k| cards.get(k).is_none()) {
                return Err(MockError::MissingHeader {
                    key: key.to_string(),
                    hdu: i + 1,
                    path: path.to_path_buf(),
                });
            }
        }
        Ok(headers.clone())
    }

    fn read_datasets(&self, path: &Path, group: &str, names: &[&str]) -> Result<ColumnTable> {
        let MemoryEntry::Groups(groups) = self.entry(path)? else {
            return Err(wrong_kind(path, "dataset groups"));
        };
        groups
            .get(group.trim_matches('/'))
            .ok_or_else(|| MockError::MissingColumn {
                column: group.to_string(),
                table: path.display().to_string(),
            })?
            .select(names)
    }
}
