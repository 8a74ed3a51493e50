//! Error types for schema construction, data validation, and fetching.
//!
//! Validation is fail-fast: the first violation aborts the pass and is
//! returned with the [`JsonPath`] where it was found. Construction failures
//! point into the schema document, data failures point into the payload.

use thiserror::Error;

use crate::path::JsonPath;
use crate::types::SchemaType;

/// Error type returned by caller-supplied extensions and fetchers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while building a [`Concordia`](crate::Concordia) from a
/// schema document.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema source is not valid JSON.
    #[error("schema is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    /// A required key is missing or has the wrong JSON kind.
    #[error("invalid schema at {path}: {message}")]
    Structure { path: JsonPath, message: String },

    /// The `type` tag is missing, not a string, or not a supported kind.
    #[error("unknown schema type at {path}: {found}")]
    UnknownType { path: JsonPath, found: String },

    /// Two fields of one object share a name.
    #[error("duplicate field {name:?} at {path}")]
    DuplicateField { path: JsonPath, name: String },

    /// An array's `schema` is neither a list nor an object.
    #[error("invalid array schema at {path}: {message}")]
    InvalidArraySchema { path: JsonPath, message: String },

    /// The reference key is present but not a non-empty string.
    #[error("invalid reference at {path}")]
    InvalidReference { path: JsonPath },

    /// The fetcher could not deliver the referenced document.
    #[error("failed to fetch schema {url:?} referenced at {path}: {source}")]
    FetchFailed {
        path: JsonPath,
        url: String,
        #[source]
        source: FetchError,
    },

    /// A referenced document's root type is not the one required here.
    #[error("referenced schema {url:?} at {path} has root type {found}, expected {expected}")]
    RootTypeMismatch {
        path: JsonPath,
        url: String,
        expected: SchemaType,
        found: SchemaType,
    },

    /// The root is not an object/array, is optional, or is a reference.
    #[error("invalid schema root at {path}: {message}")]
    RootConstraint { path: JsonPath, message: String },

    /// A reference chain leads back to a document still being built.
    #[error("reference cycle detected: {}", chain.join(" -> "))]
    ReferenceCycle { chain: Vec<String> },

    /// A registered schema extension rejected the node.
    #[error("schema extension {extension:?} rejected {path}: {source}")]
    Extension {
        path: JsonPath,
        extension: String,
        #[source]
        source: BoxError,
    },

    /// Construction of a referenced document failed.
    #[error("in referenced schema {url:?}: {source}")]
    InReference {
        url: String,
        #[source]
        source: Box<SchemaError>,
    },
}

impl SchemaError {
    pub(crate) fn structure(path: &JsonPath, message: impl Into<String>) -> Self {
        Self::Structure {
            path: path.clone(),
            message: message.into(),
        }
    }

    /// Follows [`InReference`](Self::InReference) wrappers to the error that
    /// actually caused construction to fail.
    ///
    /// # Examples
    ///
    /// ```
    /// use concordia_core::{SchemaError, JsonPath};
    ///
    /// let inner = SchemaError::RootConstraint {
    ///     path: JsonPath::root().key("optional"),
    ///     message: "root cannot be optional".into(),
    /// };
    /// let wrapped = SchemaError::InReference {
    ///     url: "mem://a".into(),
    ///     source: Box::new(inner),
    /// };
    /// assert!(matches!(wrapped.root_cause(), SchemaError::RootConstraint { .. }));
    /// ```
    pub fn root_cause(&self) -> &SchemaError {
        match self {
            Self::InReference { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Errors raised while validating data against a constructed schema.
#[derive(Debug, Error)]
pub enum DataError {
    /// The data source is not valid JSON.
    #[error("data is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A non-optional value is absent or null.
    #[error("missing required value at {path}")]
    RequiredFieldMissing { path: JsonPath },

    /// A value has a different JSON kind than its schema.
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: JsonPath,
        expected: SchemaType,
        found: &'static str,
    },

    /// A tuple array has a different number of elements than its schema.
    #[error("length mismatch at {path}: expected {expected} elements, found {found}")]
    LengthMismatch {
        path: JsonPath,
        expected: usize,
        found: usize,
    },

    /// A registered data extension rejected the value.
    #[error("data extension {extension:?} rejected {path}: {source}")]
    Extension {
        path: JsonPath,
        extension: String,
        #[source]
        source: BoxError,
    },
}

impl DataError {
    /// Location of the offending value, when the error has one.
    pub fn path(&self) -> Option<&JsonPath> {
        match self {
            Self::Malformed(_) => None,
            Self::RequiredFieldMissing { path }
            | Self::TypeMismatch { path, .. }
            | Self::LengthMismatch { path, .. }
            | Self::Extension { path, .. } => Some(path),
        }
    }
}

/// Failures reported by a [`SchemaFetcher`](crate::SchemaFetcher).
#[derive(Debug, Error)]
pub enum FetchError {
    /// The remote side answered with a non-success status.
    #[error("unexpected status {status}")]
    Status { status: u16 },

    /// No document exists for the URL.
    #[error("document not found")]
    NotFound,

    /// The document was fetched but has no content.
    #[error("document is empty")]
    Empty,

    /// The fetcher cannot handle this kind of URL.
    #[error("unsupported reference: {0}")]
    Unsupported(String),

    /// Local I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other transport failure.
    #[error("{0}")]
    Other(BoxError),
}

/// Error reported by a controller when one of its extensions rejects input.
#[derive(Debug)]
pub struct ExtensionFailure {
    /// Name of the rejecting extension.
    pub extension: String,
    /// The extension's own error.
    pub source: BoxError,
}

impl ExtensionFailure {
    pub fn new(extension: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            extension: extension.into(),
            source: source.into(),
        }
    }

    pub(crate) fn into_schema_error(self, path: &JsonPath) -> SchemaError {
        SchemaError::Extension {
            path: path.clone(),
            extension: self.extension,
            source: self.source,
        }
    }

    pub(crate) fn into_data_error(self, path: &JsonPath) -> DataError {
        DataError::Extension {
            path: path.clone(),
            extension: self.extension,
            source: self.source,
        }
    }
}
