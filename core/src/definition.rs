//! Schema-definition validation.
//!
//! Walks a raw schema document and builds the [`Schema`] tree, failing on
//! the first structural problem. The traversal mirrors the data validator in
//! [`crate::data`]: one method per node kind, with the same slot handling for
//! references, so a rule added on one side has an obvious counterpart on the
//! other.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::controller::{self, ValidationController};
use crate::data::json_kind;
use crate::error::SchemaError;
use crate::path::JsonPath;
use crate::reference::Resolver;
use crate::types::{
    ArrayShape, Field, KEY_DOC, KEY_NAME, KEY_OPTIONAL, KEY_REF, KEY_SCHEMA, KEY_TYPE, Node,
    RESERVED_KEYS, Schema, SchemaKind, SchemaType,
};

pub(crate) struct DefinitionValidator<'a> {
    controller: &'a Arc<dyn ValidationController>,
    resolver: &'a mut Resolver,
}

impl<'a> DefinitionValidator<'a> {
    pub(crate) fn new(
        controller: &'a Arc<dyn ValidationController>,
        resolver: &'a mut Resolver,
    ) -> Self {
        Self {
            controller,
            resolver,
        }
    }

    /// Validates a whole document, including the root-only constraints.
    pub(crate) fn validate_root(&mut self, raw: &Value) -> Result<Schema, SchemaError> {
        let path = JsonPath::root();
        let fragment = as_fragment(raw, &path)?;
        if fragment.contains_key(KEY_REF) {
            return Err(SchemaError::RootConstraint {
                path: path.key(KEY_REF),
                message: "the root cannot be a reference".to_string(),
            });
        }
        self.validate_schema(fragment, &path, true)
    }

    /// Validates a locally typed node.
    fn validate_schema(
        &mut self,
        raw: &Map<String, Value>,
        path: &JsonPath,
        is_root: bool,
    ) -> Result<Schema, SchemaError> {
        let kind = self.schema_type(raw, path)?;
        let doc = optional_string(raw, KEY_DOC, path)?;
        let optional = optional_bool(raw, KEY_OPTIONAL, path)?;
        let name = optional_string(raw, KEY_NAME, path)?;
        if is_root {
            controller::enforce_root(kind, optional, path)?;
        }

        let body = match kind {
            SchemaType::Boolean => SchemaKind::Boolean,
            SchemaType::Number => SchemaKind::Number,
            SchemaType::String => SchemaKind::String,
            SchemaType::Object => SchemaKind::Object(self.validate_fields(raw, path)?),
            SchemaType::Array => SchemaKind::Array(self.validate_shape(raw, path)?),
        };

        self.controller
            .check_schema(kind, raw)
            .map_err(|failure| failure.into_schema_error(path))?;

        Ok(Schema {
            doc,
            optional,
            name,
            others: collect_others(raw),
            kind: body,
        })
    }

    /// Validates a slot that may hold a reference instead of a local type.
    fn validate_node(
        &mut self,
        raw: &Map<String, Value>,
        path: &JsonPath,
    ) -> Result<Node, SchemaError> {
        match self.resolver.resolve(raw, None, self.controller, path)? {
            Some(reference) => Ok(Node::Reference(reference)),
            None => self.validate_schema(raw, path, false).map(Node::Schema),
        }
    }

    fn validate_fields(
        &mut self,
        raw: &Map<String, Value>,
        path: &JsonPath,
    ) -> Result<Vec<Field>, SchemaError> {
        let schema_path = path.key(KEY_SCHEMA);
        let entries = match raw.get(KEY_SCHEMA) {
            Some(Value::Array(entries)) => entries,
            None | Some(Value::Null) => {
                return Err(SchemaError::structure(
                    path,
                    "an object requires a \"schema\" list of fields",
                ));
            }
            Some(other) => {
                return Err(SchemaError::structure(
                    &schema_path,
                    format!("expected a list of fields, found {}", json_kind(other)),
                ));
            }
        };

        let mut seen: HashSet<String> = HashSet::new();
        let mut fields = Vec::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            let entry_path = schema_path.index(index);
            let entry = as_fragment(entry, &entry_path)?;
            let named = entry.contains_key(KEY_NAME);
            let required = if named { None } else { Some(SchemaType::Object) };

            let field = match self
                .resolver
                .resolve(entry, required, self.controller, &entry_path)?
            {
                Some(reference) if named => Field::Named(Node::Reference(reference)),
                Some(reference) => Field::Merged(reference),
                None if named => {
                    Field::Named(Node::Schema(self.validate_schema(entry, &entry_path, false)?))
                }
                None => {
                    self.schema_type(entry, &entry_path)?;
                    return Err(SchemaError::structure(
                        &entry_path,
                        "an object field requires a \"name\"",
                    ));
                }
            };

            let names: Vec<&str> = match &field {
                Field::Named(node) => node.name().into_iter().collect(),
                Field::Merged(reference) => reference.target.schema().field_names(),
            };
            for name in names {
                if !seen.insert(name.to_string()) {
                    return Err(SchemaError::DuplicateField {
                        path: entry_path,
                        name: name.to_string(),
                    });
                }
            }

            fields.push(field);
        }

        Ok(fields)
    }

    fn validate_shape(
        &mut self,
        raw: &Map<String, Value>,
        path: &JsonPath,
    ) -> Result<ArrayShape, SchemaError> {
        let schema_path = path.key(KEY_SCHEMA);
        match raw.get(KEY_SCHEMA) {
            Some(Value::Array(items)) => {
                let mut slots = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let item_path = schema_path.index(index);
                    let Value::Object(item) = item else {
                        return Err(SchemaError::InvalidArraySchema {
                            path: item_path,
                            message: format!(
                                "tuple entries must be objects, found {}",
                                json_kind(item)
                            ),
                        });
                    };
                    slots.push(self.validate_node(item, &item_path)?);
                }
                Ok(ArrayShape::Tuple(slots))
            }
            Some(Value::Object(item)) => Ok(ArrayShape::Homogeneous(Box::new(
                self.validate_node(item, &schema_path)?,
            ))),
            Some(other) => Err(SchemaError::InvalidArraySchema {
                path: schema_path,
                message: format!("expected a list or an object, found {}", json_kind(other)),
            }),
            None => Err(SchemaError::InvalidArraySchema {
                path: path.clone(),
                message: "an array requires a \"schema\"".to_string(),
            }),
        }
    }

    fn schema_type(
        &self,
        raw: &Map<String, Value>,
        path: &JsonPath,
    ) -> Result<SchemaType, SchemaError> {
        let found = match raw.get(KEY_TYPE) {
            Some(Value::String(tag)) => match tag.parse::<SchemaType>() {
                Ok(kind) if self.controller.supports(kind) => return Ok(kind),
                _ => format!("{tag:?}"),
            },
            Some(other) => other.to_string(),
            None => "no \"type\" key".to_string(),
        };
        Err(SchemaError::UnknownType {
            path: path.clone(),
            found,
        })
    }
}

/// Every schema fragment must be a JSON object.
pub(crate) fn as_fragment<'v>(
    value: &'v Value,
    path: &JsonPath,
) -> Result<&'v Map<String, Value>, SchemaError> {
    value.as_object().ok_or_else(|| {
        SchemaError::structure(
            path,
            format!("expected a schema object, found {}", json_kind(value)),
        )
    })
}

pub(crate) fn optional_string(
    raw: &Map<String, Value>,
    key: &str,
    path: &JsonPath,
) -> Result<Option<String>, SchemaError> {
    match raw.get(key) {
        None => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(SchemaError::structure(
            &path.key(key),
            format!("expected a string, found {}", json_kind(other)),
        )),
    }
}

pub(crate) fn optional_bool(
    raw: &Map<String, Value>,
    key: &str,
    path: &JsonPath,
) -> Result<bool, SchemaError> {
    match raw.get(key) {
        None => Ok(false),
        Some(Value::Bool(value)) => Ok(*value),
        Some(other) => Err(SchemaError::structure(
            &path.key(key),
            format!("expected a boolean, found {}", json_kind(other)),
        )),
    }
}

pub(crate) fn collect_others(raw: &Map<String, Value>) -> Map<String, Value> {
    raw.iter()
        .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::controller::BasicController;
    use crate::reference::NoFetcher;

    fn build(raw: Value) -> Result<Schema, SchemaError> {
        let controller: Arc<dyn ValidationController> = Arc::new(BasicController::new());
        let mut resolver = Resolver::new(Arc::new(NoFetcher));
        DefinitionValidator::new(&controller, &mut resolver).validate_root(&raw)
    }

    #[test]
    fn test_builds_nested_tree() {
        let schema = build(json!({
            "type": "object",
            "doc": "a person",
            "schema": [
                { "name": "name", "type": "string" },
                { "name": "tags", "type": "array", "schema": { "type": "string" } },
                { "name": "point", "type": "array", "schema": [
                    { "type": "number" }, { "type": "number", "optional": true }
                ]}
            ]
        }))
        .unwrap();

        assert_eq!(schema.schema_type(), SchemaType::Object);
        assert_eq!(schema.doc.as_deref(), Some("a person"));
        assert_eq!(schema.field_names(), vec!["name", "tags", "point"]);
        let point = schema.field("point").and_then(Node::as_schema).unwrap();
        assert!(matches!(
            &point.kind,
            SchemaKind::Array(ArrayShape::Tuple(slots)) if slots.len() == 2
        ));
    }

    #[test]
    fn test_unknown_and_missing_type() {
        let err = build(json!({ "type": "object", "schema": [{ "name": "a", "type": "integer" }] }))
            .unwrap_err();
        match err {
            SchemaError::UnknownType { path, found } => {
                assert_eq!(path.to_string(), "$.schema[0]");
                assert_eq!(found, "\"integer\"");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(matches!(
            build(json!({ "type": "object", "schema": [{ "name": "a" }] })),
            Err(SchemaError::UnknownType { .. })
        ));
        assert!(matches!(
            build(json!({ "type": null, "schema": [] })),
            Err(SchemaError::UnknownType { .. })
        ));
        assert!(matches!(
            build(json!({ "type": 7, "schema": [] })),
            Err(SchemaError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_mistyped_metadata() {
        assert!(matches!(
            build(json!({ "type": "object", "doc": 1, "schema": [] })),
            Err(SchemaError::Structure { .. })
        ));
        let err = build(json!({
            "type": "object",
            "schema": [{ "name": "a", "type": "string", "optional": "yes" }]
        }))
        .unwrap_err();
        match err {
            SchemaError::Structure { path, .. } => {
                assert_eq!(path.to_string(), "$.schema[0].optional")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_object_requires_field_list() {
        for raw in [
            json!({ "type": "object" }),
            json!({ "type": "object", "schema": null }),
            json!({ "type": "object", "schema": {} }),
        ] {
            assert!(matches!(build(raw), Err(SchemaError::Structure { .. })));
        }
    }

    #[test]
    fn test_field_requires_name() {
        let err = build(json!({ "type": "object", "schema": [{ "type": "string" }] })).unwrap_err();
        assert!(matches!(err, SchemaError::Structure { .. }));
    }

    #[test]
    fn test_unnamed_untyped_field_reports_type_first() {
        match build(json!({ "type": "object", "schema": [{ "doc": "x" }] })) {
            Err(SchemaError::UnknownType { path, .. }) => assert_eq!(path.to_string(), "$.schema[0]"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            build(json!({ "type": "object", "schema": [{ "type": "decimal", "doc": "x" }] })),
            Err(SchemaError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_duplicate_local_fields() {
        let err = build(json!({
            "type": "object",
            "schema": [
                { "name": "a", "type": "string" },
                { "name": "a", "type": "number" }
            ]
        }))
        .unwrap_err();
        match err {
            SchemaError::DuplicateField { path, name } => {
                assert_eq!(name, "a");
                assert_eq!(path.to_string(), "$.schema[1]");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_check_is_exact_match() {
        assert!(
            build(json!({
                "type": "object",
                "schema": [
                    { "name": "a", "type": "string" },
                    { "name": "A", "type": "string" }
                ]
            }))
            .is_ok()
        );
    }

    #[test]
    fn test_invalid_array_schemas() {
        for raw in [
            json!({ "type": "array" }),
            json!({ "type": "array", "schema": "number" }),
            json!({ "type": "array", "schema": null }),
            json!({ "type": "array", "schema": [1] }),
        ] {
            assert!(
                matches!(build(raw.clone()), Err(SchemaError::InvalidArraySchema { .. })),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_root_constraints() {
        assert!(matches!(
            build(json!({ "type": "number" })),
            Err(SchemaError::RootConstraint { .. })
        ));
        assert!(matches!(
            build(json!({ "type": "array", "optional": true, "schema": { "type": "number" } })),
            Err(SchemaError::RootConstraint { .. })
        ));
        assert!(build(json!({ "type": "array", "optional": false, "schema": [] })).is_ok());
        assert!(matches!(
            build(json!({ "$ref": "mem://x" })),
            Err(SchemaError::RootConstraint { .. })
        ));
        assert!(matches!(build(json!([])), Err(SchemaError::Structure { .. })));
    }

    #[test]
    fn test_preserves_unknown_keys() {
        let schema = build(json!({
            "type": "object",
            "x-table": "people",
            "schema": [{ "name": "age", "type": "number", "min": 0 }]
        }))
        .unwrap();
        assert_eq!(schema.others.get("x-table"), Some(&json!("people")));
        let age = schema.field("age").and_then(Node::as_schema).unwrap();
        assert_eq!(age.others.get("min"), Some(&json!(0)));
        assert!(!age.others.contains_key("name"));
    }

    #[test]
    fn test_reference_without_fetcher_fails() {
        let err = build(json!({
            "type": "object",
            "schema": [{ "name": "a", "$ref": "mem://a" }]
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::FetchFailed { .. }));
    }
}
