//! Logical forms: tree-shaped representations of command intent.
//!
//! A logical form is a JSON object tree. Exactly one key is reserved at the
//! root: `dialogue_type`. Everything else is grammar-defined payload that the
//! pipeline treats structurally, not semantically.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::error::ParleyError;
use crate::core::spans;

/// Reserved root key naming the dialogue branch of the grammar.
pub const DIALOGUE_TYPE_KEY: &str = "dialogue_type";

/// A parsed command. Always an object at the root; values are strings,
/// numbers, nested objects, or arrays thereof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalForm(Map<String, Value>);

impl LogicalForm {
    /// The canonical fallback form substituted when grammar validation fails.
    pub fn noop() -> Self {
        let mut root = Map::new();
        root.insert(
            DIALOGUE_TYPE_KEY.to_string(),
            Value::String("NOOP".to_string()),
        );
        LogicalForm(root)
    }

    /// Wraps a JSON value, rejecting anything that is not an object at the
    /// root. Model output that fails this is a shape-contract violation, not
    /// a grammar violation.
    pub fn from_value(value: Value) -> Result<Self, ParleyError> {
        match value {
            Value::Object(map) => Ok(LogicalForm(map)),
            other => Err(ParleyError::ModelError(format!(
                "logical form root must be an object, got: {}",
                other
            ))),
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, ParleyError> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_value(value)
    }

    pub fn root(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn root_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Compact single-line serialization, used for log and audit fields.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(&Value::Object(self.0.clone())).unwrap_or_else(|_| "{}".to_string())
    }

    /// The raw `dialogue_type` string, if present and a string.
    pub fn dialogue_type_str(&self) -> Option<&str> {
        self.0.get(DIALOGUE_TYPE_KEY).and_then(Value::as_str)
    }

    pub fn is_noop(&self) -> bool {
        self.dialogue_type_str() == Some("NOOP")
    }

    /// True while any span or fixed-value marker survives anywhere in the
    /// tree. Span resolution must drive this to false.
    pub fn contains_span_markers(&self) -> bool {
        self.0.values().any(spans::value_contains_markers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_noop_shape() {
        let form = LogicalForm::noop();
        assert_eq!(form.dialogue_type_str(), Some("NOOP"));
        assert!(form.is_noop());
        assert_eq!(form.root().len(), 1);
    }

    #[test]
    fn test_from_value_rejects_non_object() {
        assert!(LogicalForm::from_value(json!("NOOP")).is_err());
        assert!(LogicalForm::from_value(json!([1, 2])).is_err());
        assert!(LogicalForm::from_value(json!({"dialogue_type": "NOOP"})).is_ok());
    }

    #[test]
    fn test_round_trip_serde() {
        let form = LogicalForm::from_json_str(
            r#"{"dialogue_type":"HUMAN_GIVE_COMMAND","action_sequence":[{"action_type":"DESTROY"}]}"#,
        )
        .unwrap();
        let encoded = form.to_json_string();
        let decoded = LogicalForm::from_json_str(&encoded).unwrap();
        assert_eq!(form, decoded);
    }

    #[test]
    fn test_span_marker_probe() {
        let with_span = LogicalForm::from_value(json!({
            "dialogue_type": "HUMAN_GIVE_COMMAND",
            "action_sequence": [{"reference_object": {"text_span": [0, [1, 1]]}}]
        }))
        .unwrap();
        assert!(with_span.contains_span_markers());

        let with_fixed = LogicalForm::from_value(json!({
            "dialogue_type": "HUMAN_GIVE_COMMAND",
            "action_sequence": [{"dance_type": {"fixed_value": "point"}}]
        }))
        .unwrap();
        assert!(with_fixed.contains_span_markers());

        let literal_only = LogicalForm::from_value(json!({
            "dialogue_type": "HUMAN_GIVE_COMMAND",
            "action_sequence": [{"reference_object": {"text_span": "this"}}]
        }))
        .unwrap();
        assert!(!literal_only.contains_span_markers());
    }
}
