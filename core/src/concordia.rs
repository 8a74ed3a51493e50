//! The [`Concordia`] facade and its builder.

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

use crate::controller::{self, BasicController, ValidationController};
use crate::error::{DataError, SchemaError};
use crate::path::JsonPath;
use crate::reference::{NoFetcher, Resolver, SchemaFetcher};
use crate::types::{ArrayShape, Field, KEY_SCHEMA, Node, RESERVED_KEYS, Schema, SchemaKind};

/// A validated, immutable schema together with the controller it was built
/// with.
///
/// Cloning is cheap: the tree and the controller are shared.
///
/// # Examples
///
/// ```
/// use concordia_core::{Concordia, DataError};
///
/// let concordia = Concordia::new(r#"{
///     "type": "object",
///     "schema": [{ "name": "n", "type": "number" }]
/// }"#).unwrap();
///
/// assert!(concordia.validate_str(r#"{ "n": 5 }"#).is_ok());
/// assert!(matches!(
///     concordia.validate_str("{}"),
///     Err(DataError::RequiredFieldMissing { .. })
/// ));
/// assert!(matches!(
///     concordia.validate_str(r#"{ "n": "5" }"#),
///     Err(DataError::TypeMismatch { .. })
/// ));
/// ```
#[derive(Clone)]
pub struct Concordia {
    root: Arc<Schema>,
    controller: Arc<dyn ValidationController>,
}

impl Concordia {
    /// Builds a schema from JSON text with the default controller and no
    /// fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Syntax`] if `schema` is not JSON, or the first
    /// structural error found in it.
    pub fn new(schema: &str) -> Result<Self, SchemaError> {
        Self::builder().build_str(schema)
    }

    /// Builds a schema from an already decoded document.
    pub fn from_value(schema: Value) -> Result<Self, SchemaError> {
        Self::builder().build_value(schema)
    }

    /// Builds a schema read from `reader`.
    pub fn from_reader(reader: impl Read) -> Result<Self, SchemaError> {
        Self::builder().build_reader(reader)
    }

    /// Validates a hand-assembled tree by running its serialized form
    /// through construction.
    ///
    /// References in `schema` are written out as `$ref` markers, so a tree
    /// containing references needs a builder with a fetcher; see
    /// [`ConcordiaBuilder::build_schema`].
    pub fn from_schema(schema: &Schema) -> Result<Self, SchemaError> {
        Self::builder().build_schema(schema)
    }

    /// Returns a builder for choosing the controller and fetcher.
    pub fn builder() -> ConcordiaBuilder {
        ConcordiaBuilder::new()
    }

    pub(crate) fn from_parts(root: Schema, controller: Arc<dyn ValidationController>) -> Self {
        Self {
            root: Arc::new(root),
            controller,
        }
    }

    /// The root of the schema tree.
    pub fn schema(&self) -> &Schema {
        &self.root
    }

    /// The controller this instance validates with.
    pub fn controller(&self) -> &Arc<dyn ValidationController> {
        &self.controller
    }

    /// The schema document, in the grammar it was parsed from.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self.root.as_ref())
    }

    /// Checks `data` against the schema.
    ///
    /// # Errors
    ///
    /// Returns the first violation found, located by its path in `data`.
    pub fn validate_value(&self, data: &Value) -> Result<(), DataError> {
        self.validate_at(Some(data), &JsonPath::root())
    }

    /// Checks `data` and hands it back on success.
    pub fn validate_data(&self, data: Value) -> Result<Value, DataError> {
        self.validate_value(&data)?;
        Ok(data)
    }

    /// Decodes `data` as JSON, checks it, and returns the decoded value.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Malformed`] if `data` is not JSON.
    pub fn validate_str(&self, data: &str) -> Result<Value, DataError> {
        let value: Value = serde_json::from_str(data)?;
        self.validate_data(value)
    }

    /// Validates `value`, reporting errors relative to `path`. Referencing
    /// nodes call this on their target so paths stay rooted in the caller's
    /// document.
    pub(crate) fn validate_at(&self, value: Option<&Value>, path: &JsonPath) -> Result<(), DataError> {
        controller::validate(self.controller.as_ref(), &self.root, value, path)
    }
}

/// Two instances are equal when their schema trees are equal. The controller
/// is not compared: the same document built under different controllers is
/// the same schema, and [`Reference`](crate::Reference) targets compare this way.
impl PartialEq for Concordia {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.root, &other.root) || self.root == other.root
    }
}

impl fmt::Debug for Concordia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Concordia")
            .field("root", &self.root)
            .field("controller", &self.controller)
            .finish()
    }
}

impl Serialize for Concordia {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

/// Configures how a [`Concordia`] is constructed.
///
/// Defaults to [`BasicController::new`] and [`NoFetcher`]. The builder can
/// be reused for several documents; each build is a separate construction
/// pass with its own reference cache.
///
/// # Examples
///
/// ```
/// use concordia_core::{BasicController, Concordia, NumberBounds, SchemaType};
///
/// let mut controller = BasicController::new();
/// controller.register(SchemaType::Number, NumberBounds);
///
/// let builder = Concordia::builder().controller(controller);
/// let concordia = builder
///     .build_str(r#"{ "type": "array", "schema": { "type": "number", "max": 9 } }"#)
///     .unwrap();
/// assert!(concordia.validate_str("[1, 2, 3]").is_ok());
/// assert!(concordia.validate_str("[1, 20]").is_err());
/// ```
#[derive(Clone)]
pub struct ConcordiaBuilder {
    controller: Arc<dyn ValidationController>,
    fetcher: Arc<dyn SchemaFetcher>,
}

impl ConcordiaBuilder {
    pub fn new() -> Self {
        Self {
            controller: Arc::new(BasicController::new()),
            fetcher: Arc::new(NoFetcher),
        }
    }

    /// Sets the controller.
    pub fn controller(mut self, controller: impl ValidationController + 'static) -> Self {
        self.controller = Arc::new(controller);
        self
    }

    /// Sets a controller that is shared with other builders or instances.
    pub fn controller_shared(mut self, controller: Arc<dyn ValidationController>) -> Self {
        self.controller = controller;
        self
    }

    /// Sets the fetcher used to resolve references.
    pub fn fetcher(mut self, fetcher: impl SchemaFetcher + 'static) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    /// Sets a fetcher that is shared with other builders.
    pub fn fetcher_shared(mut self, fetcher: Arc<dyn SchemaFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Builds from JSON text.
    pub fn build_str(&self, schema: &str) -> Result<Concordia, SchemaError> {
        let value: Value = serde_json::from_str(schema)?;
        self.build_value(value)
    }

    /// Builds from a reader yielding JSON text.
    pub fn build_reader(&self, reader: impl Read) -> Result<Concordia, SchemaError> {
        let value: Value = serde_json::from_reader(reader)?;
        self.build_value(value)
    }

    /// Builds from a decoded document.
    pub fn build_value(&self, schema: Value) -> Result<Concordia, SchemaError> {
        let mut resolver = Resolver::new(Arc::clone(&self.fetcher));
        let concordia = controller::construct(&schema, &self.controller, &mut resolver)?;
        debug!(
            kind = %concordia.schema().schema_type(),
            fields = concordia.schema().fields().len(),
            "constructed schema"
        );
        Ok(concordia)
    }

    /// Re-validates an assembled tree through its serialized form.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Structure`] if a node's `others` holds a
    /// grammar key such as `type` or `schema`, since it would not survive
    /// serialization.
    pub fn build_schema(&self, schema: &Schema) -> Result<Concordia, SchemaError> {
        if let Some((path, key)) = reserved_other(schema, &JsonPath::root()) {
            return Err(SchemaError::structure(
                &path,
                format!("\"{key}\" is a schema keyword and cannot appear among extra keys"),
            ));
        }
        let value = serde_json::to_value(schema)?;
        self.build_value(value)
    }
}

/// Locates the first node whose extra keys shadow a grammar key.
fn reserved_other(schema: &Schema, path: &JsonPath) -> Option<(JsonPath, String)> {
    let shadowed = |others: &Map<String, Value>, path: &JsonPath| {
        others
            .keys()
            .find(|key| RESERVED_KEYS.contains(&key.as_str()))
            .map(|key| (path.clone(), key.clone()))
    };
    let in_node = |node: &Node, path: &JsonPath| match node {
        Node::Schema(schema) => reserved_other(schema, path),
        Node::Reference(reference) => shadowed(&reference.others, path),
    };

    if let Some(found) = shadowed(&schema.others, path) {
        return Some(found);
    }
    let schema_path = path.key(KEY_SCHEMA);
    match &schema.kind {
        SchemaKind::Object(fields) => fields.iter().enumerate().find_map(|(index, field)| {
            let entry_path = schema_path.index(index);
            match field {
                Field::Named(node) => in_node(node, &entry_path),
                Field::Merged(reference) => shadowed(&reference.others, &entry_path),
            }
        }),
        SchemaKind::Array(ArrayShape::Tuple(slots)) => slots
            .iter()
            .enumerate()
            .find_map(|(index, slot)| in_node(slot, &schema_path.index(index))),
        SchemaKind::Array(ArrayShape::Homogeneous(slot)) => in_node(slot, &schema_path),
        SchemaKind::Boolean | SchemaKind::Number | SchemaKind::String => None,
    }
}

impl Default for ConcordiaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConcordiaBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcordiaBuilder")
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}
