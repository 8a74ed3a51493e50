//! Ready-made extensions for common constraints.
//!
//! Neither rule is active unless registered on a controller:
//!
//! ```
//! use concordia_core::{BasicController, Concordia, NumberBounds, SchemaType, StringPattern};
//! use serde_json::json;
//!
//! let mut controller = BasicController::new();
//! controller.register(SchemaType::Number, NumberBounds);
//! controller.register(SchemaType::String, StringPattern::new());
//!
//! let concordia = Concordia::builder()
//!     .controller(controller)
//!     .build_value(json!({
//!         "type": "object",
//!         "schema": [
//!             { "name": "age", "type": "number", "min": 0, "max": 150 },
//!             { "name": "code", "type": "string", "pattern": "^[A-Z]{3}$" }
//!         ]
//!     }))
//!     .unwrap();
//!
//! assert!(concordia.validate_value(&json!({ "age": 30, "code": "ABC" })).is_ok());
//! assert!(concordia.validate_value(&json!({ "age": 151, "code": "ABC" })).is_err());
//! assert!(concordia.validate_value(&json!({ "age": 30, "code": "abc" })).is_err());
//! ```

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::BoxError;
use crate::extension::Extension;
use crate::types::Schema;

/// Key holding the inclusive lower bound of a number.
pub const KEY_MIN: &str = "min";
/// Key holding the inclusive upper bound of a number.
pub const KEY_MAX: &str = "max";
/// Key holding the regular expression a string must match.
pub const KEY_PATTERN: &str = "pattern";

/// Inclusive `min`/`max` bounds on `number` nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberBounds;

impl NumberBounds {
    fn bound(others: &Map<String, Value>, key: &str) -> Result<Option<f64>, BoxError> {
        match others.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| format!("{key:?} must be a number, found {value}").into()),
        }
    }
}

impl Extension for NumberBounds {
    fn name(&self) -> &str {
        "number-bounds"
    }

    fn validate_schema(&self, raw: &Map<String, Value>) -> Result<(), BoxError> {
        let min = Self::bound(raw, KEY_MIN)?;
        let max = Self::bound(raw, KEY_MAX)?;
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(format!("min {min} is greater than max {max}").into());
            }
        }
        Ok(())
    }

    fn validate_data(&self, node: &Schema, value: &Value) -> Result<(), BoxError> {
        let Some(number) = value.as_f64() else {
            return Ok(());
        };
        if let Some(min) = Self::bound(&node.others, KEY_MIN)? {
            if number < min {
                return Err(format!("{number} is less than the minimum {min}").into());
            }
        }
        if let Some(max) = Self::bound(&node.others, KEY_MAX)? {
            if number > max {
                return Err(format!("{number} is greater than the maximum {max}").into());
            }
        }
        Ok(())
    }
}

/// Regular-expression `pattern` on `string` nodes.
///
/// Patterns use [`regex`] syntax and are unanchored; write `^...$` to match
/// the whole string. Compiled patterns are cached per extension instance.
#[derive(Debug, Default)]
pub struct StringPattern {
    compiled: RwLock<HashMap<String, Regex>>,
}

impl StringPattern {
    pub fn new() -> Self {
        Self::default()
    }

    fn pattern(others: &Map<String, Value>) -> Result<Option<&str>, BoxError> {
        match others.get(KEY_PATTERN) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(pattern)) => Ok(Some(pattern)),
            Some(other) => Err(format!("\"pattern\" must be a string, found {other}").into()),
        }
    }

    fn regex(&self, pattern: &str) -> Result<Regex, BoxError> {
        let cached = self
            .compiled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pattern)
            .cloned();
        if let Some(regex) = cached {
            return Ok(regex);
        }
        let regex = Regex::new(pattern)?;
        self.compiled
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }

    fn is_match(&self, pattern: &str, text: &str) -> Result<bool, BoxError> {
        // Matching happens outside the lock.
        Ok(self.regex(pattern)?.is_match(text))
    }
}

impl Extension for StringPattern {
    fn name(&self) -> &str {
        "string-pattern"
    }

    fn validate_schema(&self, raw: &Map<String, Value>) -> Result<(), BoxError> {
        if let Some(pattern) = Self::pattern(raw)? {
            Regex::new(pattern)?;
        }
        Ok(())
    }

    fn validate_data(&self, node: &Schema, value: &Value) -> Result<(), BoxError> {
        let (Some(pattern), Some(text)) = (Self::pattern(&node.others)?, value.as_str()) else {
            return Ok(());
        };
        if self.is_match(pattern, text)? {
            Ok(())
        } else {
            Err(format!("{text:?} does not match pattern {pattern:?}").into())
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::SchemaKind;

    fn number_node(others: Value) -> Schema {
        let mut node = Schema::new(SchemaKind::Number);
        node.others = others.as_object().cloned().unwrap_or_default();
        node
    }

    #[test]
    fn test_number_bounds_schema_checks() {
        let ok = json!({ "type": "number", "min": 1, "max": 2.5 });
        assert!(NumberBounds.validate_schema(ok.as_object().unwrap()).is_ok());

        let inverted = json!({ "type": "number", "min": 3, "max": 2 });
        assert!(
            NumberBounds
                .validate_schema(inverted.as_object().unwrap())
                .is_err()
        );

        let not_number = json!({ "type": "number", "min": "1" });
        assert!(
            NumberBounds
                .validate_schema(not_number.as_object().unwrap())
                .is_err()
        );
    }

    #[test]
    fn test_number_bounds_are_inclusive() {
        let node = number_node(json!({ "min": 0, "max": 10 }));
        assert!(NumberBounds.validate_data(&node, &json!(0)).is_ok());
        assert!(NumberBounds.validate_data(&node, &json!(10)).is_ok());
        assert!(NumberBounds.validate_data(&node, &json!(-0.5)).is_err());
        assert!(NumberBounds.validate_data(&node, &json!(10.01)).is_err());
    }

    #[test]
    fn test_number_bounds_without_keys_accepts_all() {
        let node = number_node(json!({}));
        assert!(NumberBounds.validate_data(&node, &json!(-1e300)).is_ok());
    }

    #[test]
    fn test_string_pattern_rejects_invalid_regex() {
        let raw = json!({ "type": "string", "pattern": "([a-z" });
        assert!(
            StringPattern::new()
                .validate_schema(raw.as_object().unwrap())
                .is_err()
        );
    }

    #[test]
    fn test_string_pattern_matches_and_caches() {
        let rule = StringPattern::new();
        let mut node = Schema::new(SchemaKind::String);
        node.others.insert(KEY_PATTERN.into(), json!("^v[0-9]+$"));

        assert!(rule.validate_data(&node, &json!("v12")).is_ok());
        assert!(rule.validate_data(&node, &json!("x12")).is_err());
        assert_eq!(rule.compiled.read().unwrap().len(), 1);
    }

    #[test]
    fn test_string_pattern_shared_across_threads() {
        let rule = std::sync::Arc::new(StringPattern::new());
        let handles: Vec<_> = ["^a", "^b", "^a"]
            .into_iter()
            .map(|pattern| {
                let rule = std::sync::Arc::clone(&rule);
                std::thread::spawn(move || {
                    let mut node = Schema::new(SchemaKind::String);
                    node.others.insert(KEY_PATTERN.into(), json!(pattern));
                    for _ in 0..100 {
                        assert_eq!(rule.validate_data(&node, &json!("abc")).is_ok(), pattern == "^a");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(rule.compiled.read().unwrap().len(), 2);
    }
}
