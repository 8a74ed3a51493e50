//! Per-type validation extensions.
//!
//! An [`Extension`] pairs an optional schema-time check with an optional
//! data-time check. Extensions are kept in an [`ExtensionRegistry`], keyed by
//! the [`SchemaType`] they apply to and ordered by registration. A registry is
//! owned by a controller, so different [`Concordia`](crate::Concordia)
//! instances can run with different rule sets side by side.
//!
//! # Examples
//!
//! ```
//! use concordia_core::{ExtensionRegistry, FnExtension, SchemaType};
//!
//! let mut registry = ExtensionRegistry::new();
//! registry.register(
//!     SchemaType::String,
//!     FnExtension::new("non-empty").on_data(|_node, value| {
//!         match value.as_str() {
//!             Some("") => Err("string must not be empty".into()),
//!             _ => Ok(()),
//!         }
//!     }),
//! );
//! assert_eq!(registry.extensions(SchemaType::String).count(), 1);
//! assert!(registry.remove(SchemaType::String, "non-empty"));
//! assert!(registry.is_empty());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{BoxError, ExtensionFailure};
use crate::types::{Schema, SchemaType};

/// A caller-defined validation rule for one schema type.
///
/// Both hooks default to accepting everything, so an extension only needs to
/// implement the phase it cares about.
pub trait Extension: Send + Sync {
    /// Name used for removal and in error reports.
    fn name(&self) -> &str;

    /// Called with the raw schema fragment after the built-in checks for its
    /// type have passed.
    fn validate_schema(&self, _raw: &Map<String, Value>) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called with the constructed node and a present (non-null) value after
    /// the built-in checks for the node have passed.
    fn validate_data(&self, _node: &Schema, _value: &Value) -> Result<(), BoxError> {
        Ok(())
    }
}

type SchemaHook = dyn Fn(&Map<String, Value>) -> Result<(), BoxError> + Send + Sync;
type DataHook = dyn Fn(&Schema, &Value) -> Result<(), BoxError> + Send + Sync;

/// An [`Extension`] assembled from closures.
///
/// # Examples
///
/// ```
/// use concordia_core::{Extension, FnExtension};
/// use serde_json::json;
///
/// let ext = FnExtension::new("no-x-keys").on_schema(|raw| {
///     if raw.contains_key("x") {
///         return Err("x is reserved".into());
///     }
///     Ok(())
/// });
/// let raw = json!({ "type": "number", "x": 1 });
/// assert!(ext.validate_schema(raw.as_object().unwrap()).is_err());
/// ```
pub struct FnExtension {
    name: String,
    schema: Option<Box<SchemaHook>>,
    data: Option<Box<DataHook>>,
}

impl FnExtension {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            data: None,
        }
    }

    /// Sets the schema-time hook.
    pub fn on_schema<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.schema = Some(Box::new(hook));
        self
    }

    /// Sets the data-time hook.
    pub fn on_data<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Schema, &Value) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.data = Some(Box::new(hook));
        self
    }
}

impl Extension for FnExtension {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate_schema(&self, raw: &Map<String, Value>) -> Result<(), BoxError> {
        match &self.schema {
            Some(hook) => hook(raw),
            None => Ok(()),
        }
    }

    fn validate_data(&self, node: &Schema, value: &Value) -> Result<(), BoxError> {
        match &self.data {
            Some(hook) => hook(node, value),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for FnExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnExtension")
            .field("name", &self.name)
            .field("schema", &self.schema.is_some())
            .field("data", &self.data.is_some())
            .finish()
    }
}

/// Ordered extensions per schema type. Empty by default.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    by_type: BTreeMap<SchemaType, Vec<Arc<dyn Extension>>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an extension for `kind`. Extensions run in registration order.
    pub fn register(&mut self, kind: SchemaType, extension: impl Extension + 'static) {
        self.register_shared(kind, Arc::new(extension));
    }

    /// Appends an already shared extension, e.g. one registered for several
    /// types.
    pub fn register_shared(&mut self, kind: SchemaType, extension: Arc<dyn Extension>) {
        self.by_type.entry(kind).or_default().push(extension);
    }

    /// Removes every extension named `name` from `kind`. Returns `true` if
    /// anything was removed.
    pub fn remove(&mut self, kind: SchemaType, name: &str) -> bool {
        let Some(list) = self.by_type.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|ext| ext.name() != name);
        let removed = list.len() != before;
        if list.is_empty() {
            self.by_type.remove(&kind);
        }
        removed
    }

    /// Removes all extensions for `kind`.
    pub fn clear(&mut self, kind: SchemaType) {
        self.by_type.remove(&kind);
    }

    /// Extensions registered for `kind`, in registration order.
    pub fn extensions(&self, kind: SchemaType) -> impl Iterator<Item = &dyn Extension> + '_ {
        self.by_type
            .get(&kind)
            .into_iter()
            .flatten()
            .map(|ext| &**ext)
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    /// Runs the schema hooks for `kind`, stopping at the first rejection.
    pub fn check_schema(
        &self,
        kind: SchemaType,
        raw: &Map<String, Value>,
    ) -> Result<(), ExtensionFailure> {
        for ext in self.extensions(kind) {
            ext.validate_schema(raw)
                .map_err(|source| ExtensionFailure::new(ext.name(), source))?;
        }
        Ok(())
    }

    /// Runs the data hooks for the node's type, stopping at the first
    /// rejection.
    pub fn check_data(&self, node: &Schema, value: &Value) -> Result<(), ExtensionFailure> {
        for ext in self.extensions(node.schema_type()) {
            ext.validate_data(node, value)
                .map_err(|source| ExtensionFailure::new(ext.name(), source))?;
        }
        Ok(())
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (kind, list) in &self.by_type {
            let names: Vec<&str> = list.iter().map(|ext| ext.name()).collect();
            map.entry(kind, &names);
        }
        map.finish()
    }
}
