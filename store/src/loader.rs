//! In-memory schema document stores with builder-based fallback chains.
//!
//! A [`SchemaStore`] maps schema URLs to document text and serves them as a
//! [`SchemaFetcher`], so references resolve without touching the network:
//!
//! ```no_run
//! use concordia_core::Concordia;
//! use concordia_store::SchemaStore;
//!
//! let store = SchemaStore::from_dir("schemas/", "https://schemas.example.com/").unwrap();
//! let concordia = Concordia::builder()
//!     .fetcher(store)
//!     .build_str(r#"{
//!         "type": "object",
//!         "schema": [{ "name": "home", "$ref": "https://schemas.example.com/address.json" }]
//!     }"#)
//!     .unwrap();
//! ```

use std::collections::{BTreeMap, HashMap};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use concordia_core::{FetchError, SchemaFetcher};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::manifest::{Manifest, canonical_digest};

/// Describes where a [`SchemaStore`] was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSource {
    /// Assembled in memory with [`SchemaStore::insert`].
    Memory,
    /// A directory of `*.json` documents published under `base_url`.
    Directory { path: PathBuf, base_url: String },
    /// A single JSON object mapping URL to schema document.
    Bundle(PathBuf),
    /// A fallback chain; the store came from the first source that loaded.
    Multiple(Vec<StoreSource>),
}

/// Schema documents keyed by URL.
///
/// Documents are kept as text and parsed again by every construction pass
/// that references them.
///
/// # Examples
///
/// ```
/// use concordia_core::{Concordia, DataError};
/// use concordia_store::SchemaStore;
/// use serde_json::json;
///
/// let mut store = SchemaStore::new();
/// store.insert("mem://tag", r#"{ "type": "object", "schema": [
///     { "name": "label", "type": "string" }
/// ]}"#);
///
/// let concordia = Concordia::builder()
///     .fetcher(store)
///     .build_value(json!({
///         "type": "array",
///         "schema": { "$ref": "mem://tag" }
///     }))
///     .unwrap();
///
/// assert!(concordia.validate_value(&json!([{ "label": "a" }])).is_ok());
/// assert!(matches!(
///     concordia.validate_value(&json!([{}])),
///     Err(DataError::RequiredFieldMissing { .. })
/// ));
/// ```
#[derive(Debug, Clone)]
pub struct SchemaStore {
    documents: HashMap<String, String>,
    source: StoreSource,
}

impl SchemaStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            documents: HashMap::new(),
            source: StoreSource::Memory,
        }
    }

    /// Returns a new [`StoreBuilder`] for configuring a fallback chain.
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Loads every `*.json` file in `path`. A file named `address.json` is
    /// stored under `base_url` followed by `address.json`.
    ///
    /// Files are checked to be JSON but not built as schemas; that happens
    /// when a schema references them.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory or a file cannot be read,
    /// or [`StoreError::Json`] if a file is not JSON.
    pub fn from_dir(path: impl AsRef<Path>, base_url: &str) -> Result<Self> {
        let path = path.as_ref();
        let mut documents = HashMap::new();

        for (file, file_path) in json_files(path)? {
            let text = std::fs::read_to_string(&file_path)?;
            serde_json::from_str::<Value>(&text)?;
            let url = format!("{base_url}{file}");
            debug!(url = %url, file = %file_path.display(), "loaded schema document");
            documents.insert(url, text);
        }

        Ok(Self {
            documents,
            source: StoreSource::Directory {
                path: path.to_path_buf(),
                base_url: base_url.to_string(),
            },
        })
    }

    /// Loads a bundle: one JSON object whose keys are URLs and whose values
    /// are schema documents.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be read, or
    /// [`StoreError::Json`] if it is not a JSON object.
    pub fn from_bundle(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let bundle: BTreeMap<String, Value> = serde_json::from_reader(BufReader::new(file))?;

        let documents = bundle
            .into_iter()
            .map(|(url, document)| (url, document.to_string()))
            .collect();

        Ok(Self {
            documents,
            source: StoreSource::Bundle(path.to_path_buf()),
        })
    }

    /// Inserts a document, replacing any existing one under the same URL.
    pub fn insert(&mut self, url: impl Into<String>, document: impl Into<String>) {
        self.documents.insert(url.into(), document.into());
    }

    pub fn get(&self, url: &str) -> Option<&str> {
        self.documents.get(url).map(String::as_str)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.documents.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Returns an iterator over stored URLs, in no particular order.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    pub fn source(&self) -> &StoreSource {
        &self.source
    }

    /// Checks every document listed in `manifest` against its checksum.
    ///
    /// Documents the manifest does not list are not checked.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidManifest`] if a listed URL is missing from
    /// the store, [`StoreError::Json`] if a stored document is not JSON, or
    /// [`StoreError::InvalidChecksum`] on the first mismatch.
    pub fn verify(&self, manifest: &Manifest) -> Result<()> {
        for (url, entry) in &manifest.documents {
            let Some(document) = self.get(url) else {
                return Err(StoreError::InvalidManifest(format!(
                    "{url} is listed in the manifest but not stored"
                )));
            };
            let actual = canonical_digest(document)?;
            if actual != entry.checksum {
                return Err(StoreError::InvalidChecksum(format!(
                    "{url} ({}): expected {}, found {actual}",
                    entry.file, entry.checksum
                )));
            }
        }
        debug!(documents = manifest.documents.len(), "verified store against manifest");
        Ok(())
    }
}

impl Default for SchemaStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaFetcher for SchemaStore {
    fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        self.get(url).map(str::to_owned).ok_or(FetchError::NotFound)
    }
}

/// Builder for a [`SchemaStore`] loaded from the first working source.
///
/// Sources are tried in the order they are added. If all fail,
/// [`StoreError::NoSourcesAvailable`] is returned.
///
/// # Example
///
/// ```no_run
/// use concordia_store::SchemaStore;
///
/// let store = SchemaStore::builder()
///     .from_dir("/opt/schemas/", "https://schemas.example.com/")
///     .from_bundle("/opt/schemas.bundle.json")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct StoreBuilder {
    sources: Vec<StoreSource>,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory of JSON documents as a source.
    pub fn from_dir(mut self, path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        self.sources.push(StoreSource::Directory {
            path: path.into(),
            base_url: base_url.into(),
        });
        self
    }

    /// Adds a bundle file as a source.
    pub fn from_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(StoreSource::Bundle(path.into()));
        self
    }

    /// Loads from the configured sources in order and returns the first
    /// success.
    pub fn build(self) -> Result<SchemaStore> {
        for source in &self.sources {
            let result = match source {
                StoreSource::Directory { path, base_url } => SchemaStore::from_dir(path, base_url),
                StoreSource::Bundle(path) => SchemaStore::from_bundle(path),
                StoreSource::Memory | StoreSource::Multiple(_) => continue,
            };

            match result {
                Ok(mut store) => {
                    info!(source = ?source, documents = store.len(), "loaded schema store");
                    store.source = StoreSource::Multiple(self.sources.clone());
                    return Ok(store);
                }
                Err(error) => debug!(source = ?source, error = %error, "schema source unavailable"),
            }
        }

        Err(StoreError::NoSourcesAvailable)
    }
}

/// Lists `(file name, path)` for the `*.json` files directly inside `dir`,
/// sorted by file name.
pub(crate) fn json_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            files.push((name.to_string(), path.clone()));
        }
    }
    files.sort();
    Ok(files)
}
