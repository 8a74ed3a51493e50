//! Schema tree produced by construction.
//!
//! A constructed schema is a tree of [`Schema`] nodes. Object fields and
//! array elements are [`Node`] slots, which hold either a locally typed
//! schema or a resolved [`Reference`] to another document. Trees are only
//! ever handed out behind a shared reference once construction finishes.
//!
//! Every type here serializes back to the schema grammar it was parsed from,
//! with references emitted as `$ref` markers rather than inlined.

use std::fmt;
use std::str::FromStr;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::Concordia;

/// Key holding a node's type tag.
pub const KEY_TYPE: &str = "type";
/// Key holding a node's documentation string.
pub const KEY_DOC: &str = "doc";
/// Key marking a node as optional.
pub const KEY_OPTIONAL: &str = "optional";
/// Key holding an object field's name.
pub const KEY_NAME: &str = "name";
/// Key holding an object's fields or an array's element schema(s).
pub const KEY_SCHEMA: &str = "schema";
/// Key holding the URL of a referenced schema document.
pub const KEY_REF: &str = "$ref";

/// Keys with built-in meaning. Everything else lands in `others`.
pub(crate) const RESERVED_KEYS: [&str; 6] =
    [KEY_TYPE, KEY_DOC, KEY_OPTIONAL, KEY_NAME, KEY_SCHEMA, KEY_REF];

/// The five schema kinds.
///
/// # Examples
///
/// ```
/// use concordia_core::SchemaType;
///
/// let kind: SchemaType = "number".parse().unwrap();
/// assert_eq!(kind, SchemaType::Number);
/// assert_eq!(kind.to_string(), "number");
/// assert!("integer".parse::<SchemaType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaType {
    Boolean,
    Number,
    String,
    Object,
    Array,
}

impl SchemaType {
    /// All kinds, in tag order.
    pub const ALL: [SchemaType; 5] = [
        SchemaType::Boolean,
        SchemaType::Number,
        SchemaType::String,
        SchemaType::Object,
        SchemaType::Array,
    ];

    /// The JSON tag used in schema documents.
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaType::Boolean => "boolean",
            SchemaType::Number => "number",
            SchemaType::String => "string",
            SchemaType::Object => "object",
            SchemaType::Array => "array",
        }
    }

    /// Returns `true` for boolean, number and string.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            SchemaType::Boolean | SchemaType::Number | SchemaType::String
        )
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the five type tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTypeTag(pub String);

impl fmt::Display for UnknownTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown schema type tag {:?}", self.0)
    }
}

impl std::error::Error for UnknownTypeTag {}

impl FromStr for SchemaType {
    type Err = UnknownTypeTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SchemaType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownTypeTag(s.to_string()))
    }
}

impl Serialize for SchemaType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A locally typed schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Free-form documentation.
    pub doc: Option<String>,
    /// Whether absent or null data is accepted.
    pub optional: bool,
    /// Field name, set when the node is a field of an object.
    pub name: Option<String>,
    /// Unrecognized keys, preserved for extensions.
    pub others: Map<String, Value>,
    /// Kind-specific content.
    pub kind: SchemaKind,
}

/// Kind-specific content of a [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Boolean,
    Number,
    String,
    /// Ordered field descriptors.
    Object(Vec<Field>),
    Array(ArrayShape),
}

/// Element layout of an array schema.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayShape {
    /// Fixed length, one slot per position.
    Tuple(Vec<Node>),
    /// Any length, every element shares one slot.
    Homogeneous(Box<Node>),
}

/// A slot that is either typed in place or delegated to another document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Schema(Schema),
    Reference(Reference),
}

/// One entry of an object schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// A named field. Its node always carries a name.
    Named(Node),
    /// An unnamed reference whose root fields are merged into this object.
    Merged(Reference),
}

/// A resolved reference to another schema document.
///
/// The referenced document went through the full construction pipeline and
/// is kept as `target`; data validation reuses it without refetching.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    /// Where the document was fetched from.
    pub url: String,
    /// Field name when used as a named object field.
    pub name: Option<String>,
    pub doc: Option<String>,
    pub optional: bool,
    pub others: Map<String, Value>,
    /// The constructed sub-instance.
    pub target: Concordia,
}

impl Schema {
    /// Creates a bare node of the given kind.
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            doc: None,
            optional: false,
            name: None,
            others: Map::new(),
            kind,
        }
    }

    /// Sets the field name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the documentation string.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Marks the node optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// The node's type tag.
    pub fn schema_type(&self) -> SchemaType {
        match self.kind {
            SchemaKind::Boolean => SchemaType::Boolean,
            SchemaKind::Number => SchemaType::Number,
            SchemaKind::String => SchemaType::String,
            SchemaKind::Object(_) => SchemaType::Object,
            SchemaKind::Array(_) => SchemaType::Array,
        }
    }

    /// Object fields, or an empty slice for other kinds.
    pub fn fields(&self) -> &[Field] {
        match &self.kind {
            SchemaKind::Object(fields) => fields,
            _ => &[],
        }
    }

    /// Direct sub-nodes: named fields and array slots, in declaration order.
    ///
    /// Merged references are not listed; their fields belong to the
    /// referenced document.
    pub fn children(&self) -> Vec<&Node> {
        match &self.kind {
            SchemaKind::Object(fields) => fields
                .iter()
                .filter_map(|field| match field {
                    Field::Named(node) => Some(node),
                    Field::Merged(_) => None,
                })
                .collect(),
            SchemaKind::Array(ArrayShape::Tuple(items)) => items.iter().collect(),
            SchemaKind::Array(ArrayShape::Homogeneous(item)) => vec![item.as_ref()],
            _ => Vec::new(),
        }
    }

    /// Every field name this object accepts, including names contributed by
    /// merged references (recursively), in declaration order.
    ///
    /// # Examples
    ///
    /// ```
    /// use concordia_core::Concordia;
    ///
    /// let concordia = Concordia::new(r#"{
    ///     "type": "object",
    ///     "schema": [
    ///         { "name": "id", "type": "string" },
    ///         { "name": "age", "type": "number", "optional": true }
    ///     ]
    /// }"#).unwrap();
    /// assert_eq!(concordia.schema().field_names(), vec!["id", "age"]);
    /// ```
    pub fn field_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for field in self.fields() {
            match field {
                Field::Named(node) => names.extend(node.name()),
                Field::Merged(reference) => {
                    names.extend(reference.target.schema().field_names())
                }
            }
        }
        names
    }

    /// Looks up a named field declared directly on this object.
    pub fn field(&self, name: &str) -> Option<&Node> {
        self.fields().iter().find_map(|field| match field {
            Field::Named(node) if node.name() == Some(name) => Some(node),
            _ => None,
        })
    }
}

impl Node {
    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Schema(schema) => schema.name.as_deref(),
            Node::Reference(reference) => reference.name.as_deref(),
        }
    }

    pub fn doc(&self) -> Option<&str> {
        match self {
            Node::Schema(schema) => schema.doc.as_deref(),
            Node::Reference(reference) => reference.doc.as_deref(),
        }
    }

    pub fn is_optional(&self) -> bool {
        match self {
            Node::Schema(schema) => schema.optional,
            Node::Reference(reference) => reference.optional,
        }
    }

    /// Type of the data this slot accepts; for references, the referenced
    /// document's root type.
    pub fn schema_type(&self) -> SchemaType {
        match self {
            Node::Schema(schema) => schema.schema_type(),
            Node::Reference(reference) => reference.target.schema().schema_type(),
        }
    }

    /// Returns the local schema, if this slot is not a reference.
    pub fn as_schema(&self) -> Option<&Schema> {
        match self {
            Node::Schema(schema) => Some(schema),
            Node::Reference(_) => None,
        }
    }

    /// Returns the reference, if this slot is one.
    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Node::Reference(reference) => Some(reference),
            Node::Schema(_) => None,
        }
    }
}

impl Field {
    /// The field name; `None` for merged references.
    pub fn name(&self) -> Option<&str> {
        match self {
            Field::Named(node) => node.name(),
            Field::Merged(_) => None,
        }
    }
}

fn serialize_meta<M: SerializeMap>(
    map: &mut M,
    name: Option<&String>,
    doc: Option<&String>,
    optional: bool,
    others: &Map<String, Value>,
) -> Result<(), M::Error> {
    if let Some(name) = name {
        map.serialize_entry(KEY_NAME, name)?;
    }
    if let Some(doc) = doc {
        map.serialize_entry(KEY_DOC, doc)?;
    }
    if optional {
        map.serialize_entry(KEY_OPTIONAL, &true)?;
    }
    for (key, value) in others {
        if !RESERVED_KEYS.contains(&key.as_str()) {
            map.serialize_entry(key, value)?;
        }
    }
    Ok(())
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(KEY_TYPE, &self.schema_type())?;
        serialize_meta(
            &mut map,
            self.name.as_ref(),
            self.doc.as_ref(),
            self.optional,
            &self.others,
        )?;
        match &self.kind {
            SchemaKind::Object(fields) => map.serialize_entry(KEY_SCHEMA, fields)?,
            SchemaKind::Array(ArrayShape::Tuple(items)) => map.serialize_entry(KEY_SCHEMA, items)?,
            SchemaKind::Array(ArrayShape::Homogeneous(item)) => {
                map.serialize_entry(KEY_SCHEMA, item.as_ref())?
            }
            SchemaKind::Boolean | SchemaKind::Number | SchemaKind::String => {}
        }
        map.end()
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(KEY_REF, &self.url)?;
        serialize_meta(
            &mut map,
            self.name.as_ref(),
            self.doc.as_ref(),
            self.optional,
            &self.others,
        )?;
        map.end()
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Schema(schema) => schema.serialize(serializer),
            Node::Reference(reference) => reference.serialize(serializer),
        }
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Named(node) => node.serialize(serializer),
            Field::Merged(reference) => reference.serialize(serializer),
        }
    }
}
