//! Checksum manifests for schema documents.
//!
//! A manifest maps each schema URL to the file it was loaded from and the
//! SHA-256 digest of the document. Digests cover the compact serialization
//! of the parsed JSON, so a document hashes the same whether it was read
//! from its own file or from a bundle, and reformatting does not count as a
//! change. [`SchemaStore::verify`](crate::SchemaStore::verify) compares a
//! store against the manifest, so an edited document is caught before any
//! schema is built from it.
//!
//! # Examples
//!
//! ```no_run
//! use concordia_store::{DocumentEntry, Manifest};
//!
//! let mut manifest = Manifest::new();
//! manifest.update_entry(
//!     "https://schemas.example.com/address.json",
//!     DocumentEntry {
//!         file: "address.json".into(),
//!         checksum: Manifest::calculate_checksum("schemas/address.json").unwrap(),
//!     },
//! );
//! manifest.save("schemas/manifest.json").unwrap();
//!
//! let loaded = Manifest::load("schemas/manifest.json").unwrap();
//! assert!(loaded.contains("https://schemas.example.com/address.json"));
//! ```

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{Result, StoreError};
use crate::loader::json_files;

/// Current manifest format version.
pub const MANIFEST_VERSION: &str = "1.0";

/// What the manifest knows about one schema document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEntry {
    /// File name relative to the schema directory.
    pub file: String,
    /// SHA-256 hex digest of the document, see [`canonical_digest`].
    pub checksum: String,
}

/// Top-level manifest, persisted as pretty-printed JSON next to the schemas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Manifest format version.
    pub version: String,
    /// Unix timestamp (seconds) of the last update.
    pub updated_at: u64,
    /// Entries keyed by schema URL.
    pub documents: BTreeMap<String, DocumentEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            updated_at: now_secs(),
            documents: BTreeMap::new(),
        }
    }

    /// Builds a manifest covering every `*.json` file in `dir`, using the
    /// same URL scheme as [`SchemaStore::from_dir`](crate::SchemaStore::from_dir).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory or a file cannot be read,
    /// or [`StoreError::Json`] if a file is not JSON.
    pub fn scan(dir: impl AsRef<Path>, base_url: &str) -> Result<Self> {
        let mut manifest = Self::new();
        for (file, path) in json_files(dir.as_ref())? {
            let checksum = Self::calculate_checksum(&path)?;
            manifest
                .documents
                .insert(format!("{base_url}{file}"), DocumentEntry { file, checksum });
        }
        Ok(manifest)
    }

    /// Loads and checks a manifest from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] or [`StoreError::Json`] if the file cannot
    /// be read or decoded, and [`StoreError::InvalidManifest`] if its
    /// contents are inconsistent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let manifest: Self = serde_json::from_reader(BufReader::new(file))?;
        manifest.check()?;
        Ok(manifest)
    }

    /// Saves the manifest as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Inserts or replaces the entry for `url` and refreshes `updated_at`.
    pub fn update_entry(&mut self, url: impl Into<String>, entry: DocumentEntry) {
        self.documents.insert(url.into(), entry);
        self.updated_at = now_secs();
    }

    /// Checksum of the JSON document stored in a file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be read, or
    /// [`StoreError::Json`] if it is not JSON.
    pub fn calculate_checksum(path: impl AsRef<Path>) -> Result<String> {
        let text = std::fs::read_to_string(path)?;
        canonical_digest(&text)
    }

    pub fn get(&self, url: &str) -> Option<&DocumentEntry> {
        self.documents.get(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.documents.contains_key(url)
    }

    fn check(&self) -> Result<()> {
        if self.version != MANIFEST_VERSION {
            return Err(StoreError::InvalidManifest(format!(
                "unsupported manifest version {:?}",
                self.version
            )));
        }
        for (url, entry) in &self.documents {
            let well_formed =
                entry.checksum.len() == 64 && entry.checksum.bytes().all(|b| b.is_ascii_hexdigit());
            if !well_formed {
                return Err(StoreError::InvalidManifest(format!(
                    "checksum for {url} is not a SHA-256 hex digest"
                )));
            }
        }
        Ok(())
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA-256 hex digest of `bytes`.
pub fn digest(bytes: impl AsRef<[u8]>) -> String {
    format!("{:x}", Sha256::digest(bytes.as_ref()))
}

/// SHA-256 hex digest of a JSON document's compact serialization.
///
/// Key order is kept as written, so only whitespace and formatting are
/// normalized away.
pub fn canonical_digest(document: &str) -> Result<String> {
    let value: Value = serde_json::from_str(document)?;
    Ok(digest(serde_json::to_string(&value)?))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
