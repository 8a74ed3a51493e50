//! YAML configuration for opening a schema store.
//!
//! # Example YAML
//!
//! ```yaml
//! base_url: "https://schemas.example.com/"
//! directories:
//!   - /srv/schemas
//! bundles:
//!   - /srv/schemas.bundle.json
//! manifest: /srv/schemas/manifest.json
//! ```
//!
//! Directories are tried first, then bundles; the first source that loads is
//! used. When a manifest is named, the opened store is verified against it.

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::loader::{SchemaStore, StoreBuilder};
use crate::manifest::Manifest;

/// Where a store's documents live and how to check them.
///
/// # Examples
///
/// ```no_run
/// use concordia_store::StoreConfig;
///
/// let config = StoreConfig::load("concordia.yml").unwrap();
/// let store = config.open().unwrap();
/// println!("{} schema documents", store.len());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// URL prefix for documents loaded from directories.
    pub base_url: String,
    #[serde(default)]
    pub directories: Vec<PathBuf>,
    #[serde(default)]
    pub bundles: Vec<PathBuf>,
    /// Checksum manifest to verify the opened store against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,
}

impl StoreConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            directories: Vec::new(),
            bundles: Vec::new(),
            manifest: None,
        }
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::StoreError::Io) if the file cannot be read, or
    /// [`Yaml`](crate::StoreError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let config = serde_yaml::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_yaml::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Opens the store the configuration describes.
    ///
    /// # Errors
    ///
    /// Returns [`NoSourcesAvailable`](crate::StoreError::NoSourcesAvailable)
    /// if no source loads, or any error from loading or verifying against the
    /// manifest.
    pub fn open(&self) -> Result<SchemaStore> {
        let mut builder = StoreBuilder::new();
        for dir in &self.directories {
            builder = builder.from_dir(dir, self.base_url.as_str());
        }
        for bundle in &self.bundles {
            builder = builder.from_bundle(bundle);
        }
        let store = builder.build()?;

        if let Some(path) = &self.manifest {
            debug!(manifest = %path.display(), "verifying schema store");
            store.verify(&Manifest::load(path)?)?;
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;

    #[test]
    fn test_yaml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("concordia.yml");

        let mut config = StoreConfig::new("mem://schemas/");
        config.directories.push("/srv/schemas".into());
        config.manifest = Some("/srv/schemas/manifest.json".into());
        config.save(&path).unwrap();

        assert_eq!(StoreConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_defaults_for_missing_lists() {
        let config: StoreConfig = serde_yaml::from_str("base_url: mem://\n").unwrap();
        assert!(config.directories.is_empty());
        assert!(config.bundles.is_empty());
        assert!(config.manifest.is_none());
        assert!(matches!(config.open(), Err(StoreError::NoSourcesAvailable)));
    }

    #[test]
    fn test_open_verifies_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let schemas = dir.path().join("schemas");
        std::fs::create_dir(&schemas).unwrap();
        std::fs::write(schemas.join("a.json"), r#"{ "type": "object", "schema": [] }"#).unwrap();

        let manifest_path = dir.path().join("manifest.json");
        Manifest::scan(&schemas, "mem://").unwrap().save(&manifest_path).unwrap();

        let mut config = StoreConfig::new("mem://");
        config.directories.push(schemas.clone());
        config.manifest = Some(manifest_path);
        assert!(config.open().unwrap().contains("mem://a.json"));

        std::fs::write(schemas.join("a.json"), r#"{ "type": "array", "schema": [] }"#).unwrap();
        assert!(matches!(config.open(), Err(StoreError::InvalidChecksum(_))));
    }

    #[test]
    fn test_bundle_fallback_passes_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let schemas = dir.path().join("schemas");
        std::fs::create_dir(&schemas).unwrap();
        std::fs::write(
            schemas.join("a.json"),
            "{\n  \"type\": \"object\",\n  \"schema\": []\n}\n",
        )
        .unwrap();

        let manifest_path = dir.path().join("manifest.json");
        Manifest::scan(&schemas, "mem://").unwrap().save(&manifest_path).unwrap();

        let bundle = dir.path().join("bundle.json");
        std::fs::write(&bundle, r#"{"mem://a.json":{"type":"object","schema":[]}}"#).unwrap();

        let mut config = StoreConfig::new("mem://");
        config.directories.push(dir.path().join("missing"));
        config.bundles.push(bundle);
        config.manifest = Some(manifest_path);

        let store = config.open().unwrap();
        assert!(matches!(store.source(), crate::StoreSource::Multiple(sources) if sources.len() == 2));
        assert!(store.contains("mem://a.json"));
    }
}
