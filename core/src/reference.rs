//! Reference resolution.
//!
//! A schema fragment carrying a `$ref` key is replaced by the document found
//! at that URL. The document is fetched through a [`SchemaFetcher`] and runs
//! through the full construction pipeline, so references inside it resolve
//! too. Each URL is fetched at most once per construction pass, and a URL that
//! is still being built when it is referenced again is reported as a cycle.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::Concordia;
use crate::controller::{self, ValidationController};
use crate::definition::{collect_others, optional_bool, optional_string};
use crate::error::{FetchError, SchemaError};
use crate::path::JsonPath;
use crate::types::{KEY_DOC, KEY_NAME, KEY_OPTIONAL, KEY_REF, KEY_SCHEMA, KEY_TYPE, Reference, SchemaType};

/// Source of referenced schema documents.
///
/// Implemented for closures, so tests and small programs can serve documents
/// inline:
///
/// ```
/// use concordia_core::{Concordia, FetchError};
/// use serde_json::json;
///
/// let concordia = Concordia::builder()
///     .fetcher(|url: &str| match url {
///         "mem://point" => Ok(r#"{
///             "type": "object",
///             "schema": [
///                 { "name": "x", "type": "number" },
///                 { "name": "y", "type": "number" }
///             ]
///         }"#.to_string()),
///         _ => Err(FetchError::NotFound),
///     })
///     .build_value(json!({
///         "type": "object",
///         "schema": [{ "name": "origin", "$ref": "mem://point" }]
///     }))
///     .unwrap();
///
/// assert!(concordia.validate_value(&json!({ "origin": { "x": 0, "y": 0 } })).is_ok());
/// assert!(concordia.validate_value(&json!({ "origin": { "x": 0 } })).is_err());
/// ```
pub trait SchemaFetcher: Send + Sync {
    /// Returns the raw document stored at `url`.
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

impl<F> SchemaFetcher for F
where
    F: Fn(&str) -> Result<String, FetchError> + Send + Sync,
{
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self(url)
    }
}

/// Fetcher used when none is configured. Every reference fails to resolve.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFetcher;

impl SchemaFetcher for NoFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        Err(FetchError::Unsupported(format!(
            "no schema fetcher configured for {url:?}"
        )))
    }
}

/// Per-construction-pass resolution state.
pub(crate) struct Resolver {
    fetcher: Arc<dyn SchemaFetcher>,
    cache: HashMap<String, Concordia>,
    stack: Vec<String>,
}

impl Resolver {
    pub(crate) fn new(fetcher: Arc<dyn SchemaFetcher>) -> Self {
        Self {
            fetcher,
            cache: HashMap::new(),
            stack: Vec::new(),
        }
    }

    /// Resolves `raw` if it is a reference.
    ///
    /// Returns `Ok(None)` when `raw` has no `$ref` key, leaving it to normal
    /// type validation. When `required` is set, the referenced document's
    /// root must have exactly that type.
    pub(crate) fn resolve(
        &mut self,
        raw: &Map<String, Value>,
        required: Option<SchemaType>,
        controller: &Arc<dyn ValidationController>,
        path: &JsonPath,
    ) -> Result<Option<Reference>, SchemaError> {
        let Some(url) = raw.get(KEY_REF) else {
            return Ok(None);
        };
        let url = match url {
            Value::String(url) if !url.is_empty() => url.clone(),
            _ => {
                return Err(SchemaError::InvalidReference { path: path.clone() });
            }
        };
        for key in [KEY_TYPE, KEY_SCHEMA] {
            if raw.contains_key(key) {
                return Err(SchemaError::structure(
                    path,
                    format!("a reference cannot also declare \"{key}\""),
                ));
            }
        }

        let name = optional_string(raw, KEY_NAME, path)?;
        let doc = optional_string(raw, KEY_DOC, path)?;
        let optional = optional_bool(raw, KEY_OPTIONAL, path)?;

        let target = self.load(&url, controller, path)?;
        if let Some(expected) = required {
            let found = target.schema().schema_type();
            if found != expected {
                return Err(SchemaError::RootTypeMismatch {
                    path: path.clone(),
                    url,
                    expected,
                    found,
                });
            }
        }

        Ok(Some(Reference {
            url,
            name,
            doc,
            optional,
            others: collect_others(raw),
            target,
        }))
    }

    fn load(
        &mut self,
        url: &str,
        controller: &Arc<dyn ValidationController>,
        path: &JsonPath,
    ) -> Result<Concordia, SchemaError> {
        if let Some(cached) = self.cache.get(url) {
            debug!(url, "reusing resolved schema");
            return Ok(cached.clone());
        }
        if self.stack.iter().any(|pending| pending == url) {
            let mut chain = self.stack.clone();
            chain.push(url.to_string());
            return Err(SchemaError::ReferenceCycle { chain });
        }

        debug!(url, %path, "fetching referenced schema");
        let fetch_failed = |source: FetchError| SchemaError::FetchFailed {
            path: path.clone(),
            url: url.to_string(),
            source,
        };
        let body = self.fetcher.fetch(url).map_err(fetch_failed)?;
        if body.trim().is_empty() {
            return Err(fetch_failed(FetchError::Empty));
        }

        let in_reference = |source: SchemaError| SchemaError::InReference {
            url: url.to_string(),
            source: Box::new(source),
        };
        let document: Value =
            serde_json::from_str(&body).map_err(|e| in_reference(SchemaError::Syntax(e)))?;

        self.stack.push(url.to_string());
        let built = controller::construct(&document, controller, self);
        self.stack.pop();
        let target = built.map_err(in_reference)?;

        debug!(url, kind = %target.schema().schema_type(), "resolved referenced schema");
        self.cache.insert(url.to_string(), target.clone());
        Ok(target)
    }
}
