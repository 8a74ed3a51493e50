//! Local schema sources for Concordia.
//!
//! This crate supplies [`SchemaFetcher`](concordia_core::SchemaFetcher)
//! implementations that resolve references without a network: an in-memory
//! [`SchemaStore`] loaded from directories or bundles, and a [`FileFetcher`]
//! for `file://` URLs. A [`Manifest`] of SHA-256 checksums guards stored
//! documents against edits, and [`StoreConfig`] describes a store in YAML.
//!
//! # Quick start
//!
//! ```no_run
//! use concordia_core::Concordia;
//! use concordia_store::{Manifest, SchemaStore};
//!
//! let store = SchemaStore::builder()
//!     .from_dir("schemas/", "https://schemas.example.com/")
//!     .from_bundle("schemas.bundle.json")
//!     .build()
//!     .unwrap();
//! store.verify(&Manifest::load("schemas/manifest.json").unwrap()).unwrap();
//!
//! let concordia = Concordia::builder()
//!     .fetcher(store)
//!     .build_str(r#"{
//!         "type": "object",
//!         "schema": [{ "name": "home", "$ref": "https://schemas.example.com/address.json" }]
//!     }"#)
//!     .unwrap();
//! ```

mod config;
mod error;
mod fetcher;
mod loader;
mod manifest;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use fetcher::FileFetcher;
pub use loader::{SchemaStore, StoreBuilder, StoreSource};
pub use manifest::{DocumentEntry, MANIFEST_VERSION, Manifest, canonical_digest, digest};
