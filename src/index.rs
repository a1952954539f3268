//! Managed File Index
//!
//! Recursively scans the configured plugin directories and indexes every
//! regular file whose extension has a registered renderer, keyed by logical
//! name (path relative to its source directory, extension stripped). The
//! index is an immutable snapshot behind an atomic handle: a rescan builds a
//! new index and swaps it in, so an in-flight generation pass always sees a
//! consistent view.

use arc_swap::ArcSwap;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A template source file discovered during a scan, addressable by logical
/// name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedFile {
    pub logical_name: String,
    pub source_path: PathBuf,
    pub extension: String,
}

/// Immutable mapping of logical name → managed file, built once per scan.
#[derive(Debug, Default)]
pub struct FileIndex {
    files: BTreeMap<String, ManagedFile>,
}

impl FileIndex {
    /// Walk each directory recursively and index every file whose extension
    /// has a registered renderer.
    ///
    /// Directory order is precedence order: if a logical name is already
    /// present (from an earlier directory or an earlier file in the same
    /// walk), the new entry is discarded with a warning. Walk order within a
    /// directory is sorted for determinism.
    pub fn scan(directories: &[PathBuf], known_extensions: &[String]) -> Self {
        let extensions: HashSet<&str> = known_extensions.iter().map(String::as_str).collect();
        let mut files = BTreeMap::new();

        for dir in directories {
            debug!(directory = %dir.display(), "scanning plugin directory");
            for entry in WalkDir::new(dir)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| match e {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        warn!(directory = %dir.display(), error = %err, "walk error, skipping entry");
                        None
                    }
                })
            {
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                let Some(extension) = path.extension().map(|e| e.to_string_lossy().into_owned())
                else {
                    continue;
                };
                if !extensions.contains(extension.as_str()) {
                    continue;
                }
                let Ok(relative) = path.strip_prefix(dir) else {
                    continue;
                };
                let logical_name = relative.with_extension("").to_string_lossy().into_owned();

                match files.entry(logical_name.clone()) {
                    std::collections::btree_map::Entry::Occupied(_) => {
                        warn!(
                            name = %logical_name,
                            skipped = %path.display(),
                            "duplicate logical name, keeping first-registered source"
                        );
                    }
                    std::collections::btree_map::Entry::Vacant(slot) => {
                        info!(name = %logical_name, extension = %extension, "adding managed file");
                        slot.insert(ManagedFile {
                            logical_name,
                            source_path: path.to_path_buf(),
                            extension,
                        });
                    }
                }
            }
        }

        Self { files }
    }

    pub fn get(&self, logical_name: &str) -> Option<&ManagedFile> {
        self.files.get(logical_name)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Logical name → source path, in stable order.
    pub fn listing(&self) -> BTreeMap<String, PathBuf> {
        self.files
            .iter()
            .map(|(name, file)| (name.clone(), file.source_path.clone()))
            .collect()
    }
}

/// Atomic snapshot handle around the current [`FileIndex`].
///
/// Readers (`load`) get an `Arc` snapshot that stays consistent for a whole
/// generation pass; the sole writer (`replace`, on rescan) swaps in a fresh
/// index without blocking readers.
pub struct IndexHandle {
    inner: ArcSwap<FileIndex>,
}

impl IndexHandle {
    pub fn new(index: FileIndex) -> Self {
        Self {
            inner: ArcSwap::from_pointee(index),
        }
    }

    pub fn load(&self) -> Arc<FileIndex> {
        self.inner.load_full()
    }

    pub fn replace(&self, index: FileIndex) {
        self.inner.store(Arc::new(index));
    }
}
