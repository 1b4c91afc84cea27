//! Persistent backing for the record store
//!
//! A backend is a set of named collections, each holding named byte blobs.
//! The filesystem backend maps collections to directories and records to files.

use std::collections::BTreeMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::Result;

/// Record collections kept by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Sessions,
    Speakers,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Sessions => "sessions",
            Collection::Speakers => "speakers",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Narrow key-value interface the store persists through
pub trait RecordBackend {
    /// Record names in the collection, sorted; `None` if the collection does not exist
    fn list(&self, collection: Collection) -> Result<Option<Vec<String>>>;

    fn read(&self, collection: Collection, name: &str) -> Result<Vec<u8>>;

    /// Create the collection if absent
    fn ensure(&self, collection: Collection) -> Result<()>;

    /// Create or replace one record
    fn write(&self, collection: Collection, name: &str, contents: &[u8]) -> Result<()>;

    /// Human-readable location of a record, for logs and error messages
    fn locate(&self, collection: Collection, name: &str) -> String;
}

/// Directory-per-collection, file-per-record backend
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, collection: Collection) -> PathBuf {
        self.root.join(collection.name())
    }

    /// Path of one record; the name must be a single plain file name
    fn record_path(&self, collection: Collection, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        let plain = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) && !name.contains(['/', '\\', '\0']);
        if !plain {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("record name {:?} is not a plain file name", name),
            )
            .into());
        }
        Ok(self.collection_dir(collection).join(name))
    }
}

impl RecordBackend for FsBackend {
    fn list(&self, collection: Collection) -> Result<Option<Vec<String>>> {
        let entries = match std::fs::read_dir(self.collection_dir(collection)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(Some(names))
    }

    fn read(&self, collection: Collection, name: &str) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.record_path(collection, name)?)?)
    }

    fn ensure(&self, collection: Collection) -> Result<()> {
        Ok(std::fs::create_dir_all(self.collection_dir(collection))?)
    }

    fn write(&self, collection: Collection, name: &str, contents: &[u8]) -> Result<()> {
        Ok(std::fs::write(self.record_path(collection, name)?, contents)?)
    }

    fn locate(&self, collection: Collection, name: &str) -> String {
        self.collection_dir(collection).join(name).display().to_string()
    }
}

/// In-process backend, for tests and callers embedding the store
#[derive(Debug, Default)]
pub struct MemoryBackend {
    collections: Mutex<BTreeMap<Collection, BTreeMap<String, Vec<u8>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of a stored record, if present
    pub fn get(&self, collection: Collection, name: &str) -> Option<Vec<u8>> {
        let collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        collections.get(&collection)?.get(name).cloned()
    }

    /// Number of records written to the collection
    pub fn len(&self, collection: Collection) -> usize {
        let collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        collections.get(&collection).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        let collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        collections.values().all(BTreeMap::is_empty)
    }
}

impl RecordBackend for MemoryBackend {
    fn list(&self, collection: Collection) -> Result<Option<Vec<String>>> {
        let collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(collections
            .get(&collection)
            .map(|records| records.keys().cloned().collect()))
    }

    fn read(&self, collection: Collection, name: &str) -> Result<Vec<u8>> {
        self.get(collection, name).ok_or_else(|| {
            std::io::Error::new(ErrorKind::NotFound, format!("{collection}/{name}")).into()
        })
    }

    fn ensure(&self, collection: Collection) -> Result<()> {
        let mut collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        collections.entry(collection).or_default();
        Ok(())
    }

    fn write(&self, collection: Collection, name: &str, contents: &[u8]) -> Result<()> {
        let mut collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        collections
            .entry(collection)
            .or_default()
            .insert(name.to_owned(), contents.to_vec());
        Ok(())
    }

    fn locate(&self, collection: Collection, name: &str) -> String {
        format!("memory:{collection}/{name}")
    }
}
