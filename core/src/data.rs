//! Data validation against a constructed schema tree.
//!
//! Mirrors [`crate::definition`]: scalars check their JSON kind, objects walk
//! their fields, arrays walk their tuple slots or shared element slot, and
//! reference slots delegate to the referenced [`Concordia`](crate::Concordia).
//! Absent and `null` values are treated alike and only accepted by optional
//! nodes.

use serde_json::Value;
use tracing::trace;

use crate::controller::ValidationController;
use crate::error::DataError;
use crate::path::JsonPath;
use crate::types::{ArrayShape, Field, Node, Schema, SchemaKind, SchemaType};

pub(crate) struct DataValidator<'a> {
    controller: &'a dyn ValidationController,
}

impl<'a> DataValidator<'a> {
    pub(crate) fn new(controller: &'a dyn ValidationController) -> Self {
        Self { controller }
    }

    /// Validates a locally typed node. Extensions run once the node and its
    /// whole subtree have passed.
    pub(crate) fn validate(
        &self,
        schema: &Schema,
        value: Option<&Value>,
        path: &JsonPath,
    ) -> Result<(), DataError> {
        let Some(value) = present(value) else {
            return require_optional(schema.optional, path);
        };
        trace!(%path, kind = %schema.schema_type(), "validating value");

        match &schema.kind {
            SchemaKind::Boolean => expect_kind(value.is_boolean(), SchemaType::Boolean, value, path)?,
            SchemaKind::Number => expect_kind(value.is_number(), SchemaType::Number, value, path)?,
            SchemaKind::String => expect_kind(value.is_string(), SchemaType::String, value, path)?,
            SchemaKind::Object(fields) => self.validate_object(fields, value, path)?,
            SchemaKind::Array(shape) => self.validate_array(shape, value, path)?,
        }

        self.controller
            .check_data(schema, value)
            .map_err(|failure| failure.into_data_error(path))
    }

    /// Validates a slot that may delegate to a referenced document.
    fn validate_node(
        &self,
        node: &Node,
        value: Option<&Value>,
        path: &JsonPath,
    ) -> Result<(), DataError> {
        match node {
            Node::Schema(schema) => self.validate(schema, value, path),
            Node::Reference(reference) => match present(value) {
                Some(value) => reference.target.validate_at(Some(value), path),
                None => require_optional(reference.optional, path),
            },
        }
    }

    fn validate_object(
        &self,
        fields: &[Field],
        value: &Value,
        path: &JsonPath,
    ) -> Result<(), DataError> {
        let Some(object) = value.as_object() else {
            return Err(mismatch(SchemaType::Object, value, path));
        };

        for field in fields {
            match field {
                Field::Merged(reference) => reference.target.validate_at(Some(value), path)?,
                Field::Named(node) => {
                    let name = node.name().unwrap_or_default();
                    self.validate_node(node, object.get(name), &path.key(name))?;
                }
            }
        }
        Ok(())
    }

    fn validate_array(
        &self,
        shape: &ArrayShape,
        value: &Value,
        path: &JsonPath,
    ) -> Result<(), DataError> {
        let Some(items) = value.as_array() else {
            return Err(mismatch(SchemaType::Array, value, path));
        };

        match shape {
            ArrayShape::Tuple(slots) => {
                if slots.len() != items.len() {
                    return Err(DataError::LengthMismatch {
                        path: path.clone(),
                        expected: slots.len(),
                        found: items.len(),
                    });
                }
                for (index, (slot, item)) in slots.iter().zip(items).enumerate() {
                    self.validate_node(slot, Some(item), &path.index(index))?;
                }
            }
            ArrayShape::Homogeneous(slot) => {
                for (index, item) in items.iter().enumerate() {
                    self.validate_node(slot, Some(item), &path.index(index))?;
                }
            }
        }
        Ok(())
    }
}

/// Name of a value's JSON kind, as used in error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|value| !value.is_null())
}

fn require_optional(optional: bool, path: &JsonPath) -> Result<(), DataError> {
    if optional {
        Ok(())
    } else {
        Err(DataError::RequiredFieldMissing { path: path.clone() })
    }
}

fn expect_kind(
    matches: bool,
    expected: SchemaType,
    value: &Value,
    path: &JsonPath,
) -> Result<(), DataError> {
    if matches {
        Ok(())
    } else {
        Err(mismatch(expected, value, path))
    }
}

fn mismatch(expected: SchemaType, value: &Value, path: &JsonPath) -> DataError {
    DataError::TypeMismatch {
        path: path.clone(),
        expected,
        found: json_kind(value),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::controller::BasicController;

    fn check(schema: &Schema, value: Value) -> Result<(), DataError> {
        let controller = BasicController::new();
        DataValidator::new(&controller).validate(schema, Some(&value), &JsonPath::root())
    }

    fn field(schema: Schema, name: &str) -> Field {
        Field::Named(Node::Schema(schema.named(name)))
    }

    #[test]
    fn test_scalars_require_exact_kind() {
        let number = Schema::new(SchemaKind::Number);
        assert!(check(&number, json!(1.5)).is_ok());
        assert!(matches!(
            check(&number, json!("1.5")),
            Err(DataError::TypeMismatch { found: "string", .. })
        ));

        let boolean = Schema::new(SchemaKind::Boolean);
        assert!(check(&boolean, json!(false)).is_ok());
        assert!(check(&boolean, json!(0)).is_err());

        let string = Schema::new(SchemaKind::String);
        assert!(check(&string, json!("")).is_ok());
        assert!(check(&string, json!(["a"])).is_err());
    }

    #[test]
    fn test_null_is_treated_as_absent() {
        let required = Schema::new(SchemaKind::String);
        assert!(matches!(
            check(&required, Value::Null),
            Err(DataError::RequiredFieldMissing { .. })
        ));
        let optional = Schema::new(SchemaKind::String).optional();
        assert!(check(&optional, Value::Null).is_ok());
    }

    #[test]
    fn test_object_fields_and_paths() {
        let schema = Schema::new(SchemaKind::Object(vec![
            field(Schema::new(SchemaKind::Number), "n"),
            field(Schema::new(SchemaKind::String).optional(), "label"),
        ]));

        assert!(check(&schema, json!({ "n": 5 })).is_ok());
        assert!(check(&schema, json!({ "n": 5, "label": null, "extra": true })).is_ok());

        match check(&schema, json!({ "label": "x" })) {
            Err(DataError::RequiredFieldMissing { path }) => assert_eq!(path.to_string(), "$.n"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            check(&schema, json!([])),
            Err(DataError::TypeMismatch {
                expected: SchemaType::Object,
                ..
            })
        ));
    }

    #[test]
    fn test_tuple_length_is_exact() {
        let schema = Schema::new(SchemaKind::Array(ArrayShape::Tuple(vec![
            Node::Schema(Schema::new(SchemaKind::Number)),
            Node::Schema(Schema::new(SchemaKind::String).optional()),
        ])));
        assert!(check(&schema, json!([1, "a"])).is_ok());
        assert!(check(&schema, json!([1, null])).is_ok());
        assert!(matches!(
            check(&schema, json!([1])),
            Err(DataError::LengthMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));
        match check(&schema, json!([1, 2])) {
            Err(DataError::TypeMismatch { path, .. }) => assert_eq!(path.to_string(), "$[1]"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_homogeneous_arrays() {
        let schema = Schema::new(SchemaKind::Array(ArrayShape::Homogeneous(Box::new(
            Node::Schema(Schema::new(SchemaKind::Boolean)),
        ))));
        assert!(check(&schema, json!([])).is_ok());
        assert!(check(&schema, json!([true, false, true])).is_ok());
        match check(&schema, json!([true, "no"])) {
            Err(DataError::TypeMismatch { path, .. }) => assert_eq!(path.to_string(), "$[1]"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            check(&schema, json!([true, null])),
            Err(DataError::RequiredFieldMissing { .. })
        ));
    }

    #[test]
    fn test_json_kind_names() {
        assert_eq!(json_kind(&json!(null)), "null");
        assert_eq!(json_kind(&json!({})), "object");
        assert_eq!(json_kind(&json!(1)), "number");
    }
}
