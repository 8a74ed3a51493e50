//! Concordia: a compact JSON schema language and its validation engine.
//!
//! A schema document describes data with five kinds (`boolean`, `number`,
//! `string`, `object` and `array`) plus optional fields, documentation,
//! references to other schema documents, and caller-defined extension rules.
//!
//! Validation happens in two phases:
//!
//! - **Construction** ([`Concordia::new`], [`ConcordiaBuilder`]) checks the
//!   schema document and builds an immutable [`Schema`] tree, fetching and
//!   building referenced documents through a [`SchemaFetcher`].
//! - **Data validation** ([`Concordia::validate_value`] and friends) walks the
//!   tree against a JSON value and stops at the first violation.
//!
//! Both phases consult a [`ValidationController`], which decides the legal
//! schema kinds and runs [`Extension`]s registered per kind.
//!
//! # Example
//!
//! ```
//! use concordia_core::*;
//! use serde_json::json;
//!
//! let concordia = Concordia::new(r#"{
//!     "type": "object",
//!     "doc": "A point on a map.",
//!     "schema": [
//!         { "name": "label", "type": "string", "optional": true },
//!         { "name": "coords", "type": "array", "schema": [
//!             { "type": "number" },
//!             { "type": "number" }
//!         ]}
//!     ]
//! }"#).unwrap();
//!
//! assert!(concordia.validate_value(&json!({ "coords": [52.5, 13.4] })).is_ok());
//!
//! let err = concordia
//!     .validate_value(&json!({ "coords": [52.5] }))
//!     .unwrap_err();
//! assert!(matches!(err, DataError::LengthMismatch { expected: 2, found: 1, .. }));
//! assert_eq!(err.path().unwrap().to_string(), "$.coords");
//! ```

mod concordia;
mod controller;
mod data;
mod definition;
mod error;
mod extension;
mod path;
mod reference;
mod rules;
mod types;

pub use concordia::{Concordia, ConcordiaBuilder};
pub use controller::{BasicController, ValidationController};
pub use error::{BoxError, DataError, ExtensionFailure, FetchError, SchemaError};
pub use extension::{Extension, ExtensionRegistry, FnExtension};
pub use path::{JsonPath, PathSegment};
pub use reference::{NoFetcher, SchemaFetcher};
pub use rules::{KEY_MAX, KEY_MIN, KEY_PATTERN, NumberBounds, StringPattern};
pub use types::*;
