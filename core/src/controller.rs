//! Validation controllers.
//!
//! A [`ValidationController`] decides which schema kinds are legal and how
//! extensions are dispatched. The recursive traversals in the definition and
//! data validators never change; they consult the controller at each node.
//! Every [`Concordia`] instance carries the controller it was built with, and
//! referenced documents are built with the same one.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::Concordia;
use crate::data::DataValidator;
use crate::definition::DefinitionValidator;
use crate::error::{DataError, ExtensionFailure, SchemaError};
use crate::extension::{Extension, ExtensionRegistry};
use crate::path::JsonPath;
use crate::reference::Resolver;
use crate::types::{KEY_OPTIONAL, KEY_TYPE, Schema, SchemaType};

/// Policy consulted by both traversals.
pub trait ValidationController: Send + Sync + fmt::Debug {
    /// Returns `true` if schemas may use `kind`. Unsupported kinds fail
    /// construction as unknown types.
    fn supports(&self, kind: SchemaType) -> bool;

    /// Runs schema-time extensions for a node that passed the built-in
    /// checks for `kind`.
    fn check_schema(
        &self,
        kind: SchemaType,
        raw: &Map<String, Value>,
    ) -> Result<(), ExtensionFailure>;

    /// Runs data-time extensions for a present value that passed the
    /// built-in checks for `node`.
    fn check_data(&self, node: &Schema, value: &Value) -> Result<(), ExtensionFailure>;
}

/// The default controller: a set of allowed kinds plus an
/// [`ExtensionRegistry`].
///
/// `BasicController::new()` allows all five kinds and has no extensions.
///
/// # Examples
///
/// ```
/// use concordia_core::{BasicController, Concordia, SchemaError, SchemaType};
/// use serde_json::json;
///
/// let controller = BasicController::with_kinds([
///     SchemaType::Object,
///     SchemaType::String,
/// ]);
/// let result = Concordia::builder().controller(controller).build_value(json!({
///     "type": "object",
///     "schema": [{ "name": "n", "type": "number" }]
/// }));
/// assert!(matches!(result, Err(SchemaError::UnknownType { .. })));
/// ```
#[derive(Debug, Clone)]
pub struct BasicController {
    kinds: BTreeSet<SchemaType>,
    registry: ExtensionRegistry,
}

impl BasicController {
    pub fn new() -> Self {
        Self::with_kinds(SchemaType::ALL)
    }

    /// Creates a controller that only accepts the given kinds.
    pub fn with_kinds(kinds: impl IntoIterator<Item = SchemaType>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
            registry: ExtensionRegistry::new(),
        }
    }

    /// Replaces the extension registry.
    pub fn with_registry(mut self, registry: ExtensionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Registers an extension for `kind`.
    pub fn register(&mut self, kind: SchemaType, extension: impl Extension + 'static) {
        self.registry.register(kind, extension);
    }

    /// Removes extensions named `name` from `kind`.
    pub fn remove(&mut self, kind: SchemaType, name: &str) -> bool {
        self.registry.remove(kind, name)
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ExtensionRegistry {
        &mut self.registry
    }

    /// The kinds this controller accepts.
    pub fn kinds(&self) -> impl Iterator<Item = SchemaType> + '_ {
        self.kinds.iter().copied()
    }
}

impl Default for BasicController {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationController for BasicController {
    fn supports(&self, kind: SchemaType) -> bool {
        self.kinds.contains(&kind)
    }

    fn check_schema(
        &self,
        kind: SchemaType,
        raw: &Map<String, Value>,
    ) -> Result<(), ExtensionFailure> {
        self.registry.check_schema(kind, raw)
    }

    fn check_data(&self, node: &Schema, value: &Value) -> Result<(), ExtensionFailure> {
        self.registry.check_data(node, value)
    }
}

/// Builds a [`Concordia`] from a parsed schema document.
pub(crate) fn construct(
    raw: &Value,
    controller: &Arc<dyn ValidationController>,
    resolver: &mut Resolver,
) -> Result<Concordia, SchemaError> {
    let root = DefinitionValidator::new(controller, resolver).validate_root(raw)?;
    Ok(Concordia::from_parts(root, Arc::clone(controller)))
}

/// Enforces the constraints that only apply to a document's root node.
pub(crate) fn enforce_root(
    kind: SchemaType,
    optional: bool,
    path: &JsonPath,
) -> Result<(), SchemaError> {
    if !matches!(kind, SchemaType::Object | SchemaType::Array) {
        return Err(SchemaError::RootConstraint {
            path: path.key(KEY_TYPE),
            message: format!("the root type must be \"object\" or \"array\", found \"{kind}\""),
        });
    }
    if optional {
        return Err(SchemaError::RootConstraint {
            path: path.key(KEY_OPTIONAL),
            message: "the root cannot be optional".to_string(),
        });
    }
    Ok(())
}

/// Validates `value` against a constructed tree.
pub(crate) fn validate(
    controller: &dyn ValidationController,
    schema: &Schema,
    value: Option<&Value>,
    path: &JsonPath,
) -> Result<(), DataError> {
    DataValidator::new(controller).validate(schema, value, path)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::extension::FnExtension;

    #[test]
    fn test_default_controller_supports_all_kinds() {
        let controller = BasicController::default();
        for kind in SchemaType::ALL {
            assert!(controller.supports(kind));
        }
        assert!(controller.registry().is_empty());
    }

    #[test]
    fn test_restricted_controller() {
        let controller = BasicController::with_kinds([SchemaType::Array, SchemaType::Boolean]);
        assert!(controller.supports(SchemaType::Array));
        assert!(!controller.supports(SchemaType::Number));
        assert_eq!(controller.kinds().count(), 2);
    }

    #[test]
    fn test_register_and_remove_through_controller() {
        let mut controller = BasicController::new();
        controller.register(
            SchemaType::Boolean,
            FnExtension::new("never").on_schema(|_| Err("no booleans".into())),
        );
        let raw = json!({ "type": "boolean" });
        let failure = controller
            .check_schema(SchemaType::Boolean, raw.as_object().unwrap())
            .unwrap_err();
        assert_eq!(failure.extension, "never");

        assert!(controller.remove(SchemaType::Boolean, "never"));
        assert!(
            controller
                .check_schema(SchemaType::Boolean, raw.as_object().unwrap())
                .is_ok()
        );
    }

    #[test]
    fn test_enforce_root() {
        let root = JsonPath::root();
        assert!(enforce_root(SchemaType::Object, false, &root).is_ok());
        assert!(enforce_root(SchemaType::Array, false, &root).is_ok());
        match enforce_root(SchemaType::String, false, &root) {
            Err(SchemaError::RootConstraint { path, .. }) => assert_eq!(path.to_string(), "$.type"),
            other => panic!("unexpected result: {other:?}"),
        }
        match enforce_root(SchemaType::Object, true, &root) {
            Err(SchemaError::RootConstraint { path, .. }) => {
                assert_eq!(path.to_string(), "$.optional")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
