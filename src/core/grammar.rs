//! Grammar validation for candidate logical forms.
//!
//! The grammar is a versioned set of JSON Schema documents: one base
//! document plus sub-documents it references by relative URI. All documents
//! are loaded once at construction and the cross-references are resolved
//! against that preloaded set; nothing is fetched at validation time.
//!
//! Malformed *schema documents* are fatal at load. Malformed *candidate
//! forms* are an expected case: `validate` answers false and never errors.

use jsonschema::{Retrieve, Uri, Validator};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use crate::core::error::ParleyError;
use crate::core::logical_form::LogicalForm;

/// Base document name; the grammar's entry point.
pub const BASE_SCHEMA_NAME: &str = "grammar_spec.schema.json";

const EMBEDDED_GRAMMAR_SPEC: &str = include_str!("../../schemas/grammar_spec.schema.json");
const EMBEDDED_ACTION_DICT: &str =
    include_str!("../../schemas/action_dict_components.schema.json");
const EMBEDDED_OTHER_DIALOGUE: &str = include_str!("../../schemas/other_dialogue.schema.json");

/// The stock grammar baked into the binary. A schema directory on disk
/// overrides it wholesale.
pub fn embedded_documents() -> Vec<(String, &'static str)> {
    vec![
        (BASE_SCHEMA_NAME.to_string(), EMBEDDED_GRAMMAR_SPEC),
        (
            "action_dict_components.schema.json".to_string(),
            EMBEDDED_ACTION_DICT,
        ),
        (
            "other_dialogue.schema.json".to_string(),
            EMBEDDED_OTHER_DIALOGUE,
        ),
    ]
}

/// Resolves relative schema references against the preloaded document set.
/// References are matched by file name, the way the documents name each
/// other on disk.
struct DocumentRetriever {
    documents: HashMap<String, Value>,
}

impl Retrieve for DocumentRetriever {
    fn retrieve(
        &self,
        uri: &Uri<String>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let raw = uri.as_str();
        let name = raw.rsplit('/').next().unwrap_or(raw);
        self.documents
            .get(name)
            .cloned()
            .ok_or_else(|| format!("unknown schema document: {}", raw).into())
    }
}

pub struct GrammarValidator {
    validator: Validator,
}

impl GrammarValidator {
    /// Builds the validator from the embedded default grammar.
    pub fn embedded_default() -> Result<Self, ParleyError> {
        let mut documents = Vec::new();
        for (name, content) in embedded_documents() {
            let doc: Value = serde_json::from_str(content)
                .map_err(|e| ParleyError::SchemaError(format!("embedded {}: {}", name, e)))?;
            documents.push((name, doc));
        }
        Self::build(documents, BASE_SCHEMA_NAME)
    }

    /// Builds the validator from every `*.json` document in `schema_dir`,
    /// with `grammar_spec.schema.json` as the base document.
    pub fn from_dir(schema_dir: &Path) -> Result<Self, ParleyError> {
        let mut documents = Vec::new();
        let mut paths: Vec<_> = std::fs::read_dir(schema_dir)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        paths.sort();

        for path in paths {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            let content = std::fs::read_to_string(&path)?;
            let doc: Value = serde_json::from_str(&content)
                .map_err(|e| ParleyError::SchemaError(format!("{}: {}", path.display(), e)))?;
            documents.push((name, doc));
        }
        Self::build(documents, BASE_SCHEMA_NAME)
    }

    fn build(documents: Vec<(String, Value)>, base_name: &str) -> Result<Self, ParleyError> {
        let mut by_name: HashMap<String, Value> = HashMap::new();
        for (name, mut doc) in documents {
            match &mut doc {
                Value::Object(map) => {
                    // Anchor each document so relative references between
                    // documents resolve to retrievable URIs.
                    map.entry("$id")
                        .or_insert_with(|| Value::String(format!("parley:///{}", name)));
                }
                _ => {
                    return Err(ParleyError::SchemaError(format!(
                        "{}: schema document must be a JSON object",
                        name
                    )));
                }
            }
            by_name.insert(name, doc);
        }

        let base = by_name.get(base_name).cloned().ok_or_else(|| {
            ParleyError::SchemaError(format!("base schema document {} not found", base_name))
        })?;

        let validator = jsonschema::options()
            .with_retriever(DocumentRetriever { documents: by_name })
            .build(&base)
            .map_err(|e| ParleyError::SchemaError(format!("building grammar validator: {}", e)))?;

        Ok(Self { validator })
    }

    /// Structural conformance check. Deterministic, side-effect free, and
    /// total over arbitrary candidate forms.
    pub fn validate(&self, form: &LogicalForm) -> bool {
        self.validator.is_valid(&form.to_value())
    }

    /// Instance-path violation messages for the failure log.
    pub fn violations(&self, form: &LogicalForm) -> Vec<String> {
        let value = form.to_value();
        self.validator
            .iter_errors(&value)
            .map(|e| format!("{}: {}", e.instance_path, e))
            .collect()
    }
}
