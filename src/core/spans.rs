//! Span and fixed-value substitution over logical forms.
//!
//! Model output references command text by token offsets instead of carrying
//! the text itself: a span is `[chat_index, [start, end]]` with `end`
//! inclusive. Grammar-supplied constants arrive as `{"fixed_value": ...}`
//! nodes. Both are transient wire conventions; after resolution the form
//! holds only literal values.

use serde_json::Value;
use tracing::warn;

use crate::core::error::ParleyError;
use crate::core::logical_form::LogicalForm;

/// Replaces every span and fixed-value marker in `form` with its literal
/// value, returning a new tree. `original` and `lemmatized` are the
/// whitespace tokens of the raw and lemmatized command; alignment between
/// them is positional. When their lengths diverge, substitution degrades to
/// the original tokens alone and the divergence is logged.
pub fn resolve_spans(
    form: &LogicalForm,
    original: &[String],
    lemmatized: &[String],
) -> Result<LogicalForm, ParleyError> {
    if original.len() != lemmatized.len() {
        warn!(
            original_tokens = original.len(),
            lemmatized_tokens = lemmatized.len(),
            "token count mismatch between original and lemmatized command; \
             resolving spans against original tokens only"
        );
    }

    let mut root = serde_json::Map::new();
    for (key, value) in form.root() {
        root.insert(key.clone(), resolve_value(value, original, lemmatized)?);
    }
    LogicalForm::from_value(Value::Object(root))
        .map_err(|_| ParleyError::SpanError("span resolution produced a non-object root".into()))
}

fn resolve_value(
    value: &Value,
    original: &[String],
    lemmatized: &[String],
) -> Result<Value, ParleyError> {
    match value {
        Value::Object(map) => {
            // Fixed values win over any span present on the same node; the
            // whole marker object collapses to the constant.
            if let Some(fixed) = map.get("fixed_value") {
                return Ok(fixed.clone());
            }
            let mut out = serde_json::Map::new();
            for (key, child) in map {
                out.insert(key.clone(), resolve_value(child, original, lemmatized)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => {
            if let Some((chat_index, start, end)) = as_span(items) {
                return substitute_span(chat_index, start, end, original, lemmatized);
            }
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(resolve_value(item, original, lemmatized)?);
            }
            Ok(Value::Array(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_span(
    chat_index: i64,
    start: i64,
    end: i64,
    original: &[String],
    lemmatized: &[String],
) -> Result<Value, ParleyError> {
    if chat_index != 0 {
        return Err(ParleyError::SpanError(format!(
            "span references chat index {} but only single-chat commands are supported",
            chat_index
        )));
    }
    if start < 0 || end < start || end as usize >= original.len() {
        return Err(ParleyError::SpanError(format!(
            "span [{}, {}] out of range for a {}-token command",
            start,
            end,
            original.len()
        )));
    }

    let words = original[start as usize..=end as usize].join(" ");
    // spacy's lemmatizer rewrites bare pronouns to -PRON-.
    if words == "-PRON-" {
        if let Some(lemma) = lemmatized.get(start as usize) {
            return Ok(Value::String(lemma.clone()));
        }
    }
    Ok(Value::String(words))
}

/// Span shape probe: `[integer, [integer, integer]]`.
fn as_span(items: &[Value]) -> Option<(i64, i64, i64)> {
    if items.len() != 2 {
        return None;
    }
    let chat_index = items[0].as_i64()?;
    let range = items[1].as_array()?;
    if range.len() != 2 {
        return None;
    }
    Some((chat_index, range[0].as_i64()?, range[1].as_i64()?))
}

/// True if `value` (or anything beneath it) is still a span or fixed-value
/// marker. Used to check the no-markers-after-resolution invariant.
pub fn value_contains_markers(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            map.contains_key("fixed_value") || map.values().any(value_contains_markers)
        }
        Value::Array(items) => {
            as_span(items).is_some() || items.iter().any(value_contains_markers)
        }
        _ => false,
    }
}
