//! Parse source selection and the resolution pipeline.
//!
//! `CommandResolver` is the only path from raw command text to an executable
//! logical form. It consults the ground-truth index first, falls back to the
//! semantic parsing model, audits every attempt, and refuses to let an
//! invalid structure past the grammar gate: validation failure substitutes
//! the canonical NOOP form, never an error and never the broken tree.

use tracing::{debug, error, info};

use crate::core::audit::{AuditLog, AuditRecord, ParseSource};
use crate::core::contract::{ChatInput, Lemmatizer, SemanticParser};
use crate::core::error::ParleyError;
use crate::core::grammar::GrammarValidator;
use crate::core::ground_truth::GroundTruthIndex;
use crate::core::logical_form::LogicalForm;
use crate::core::preprocess::whitespace_tokens;
use crate::core::spans::resolve_spans;
use crate::core::time;

/// One resolved command: the literal-only logical form plus where it came
/// from.
#[derive(Debug)]
pub struct Resolution {
    pub form: LogicalForm,
    pub source: ParseSource,
}

pub struct CommandResolver {
    ground_truth: GroundTruthIndex,
    grammar: GrammarValidator,
    parser: Box<dyn SemanticParser>,
    lemmatizer: Box<dyn Lemmatizer>,
    audit: AuditLog,
    agent_id: String,
}

impl CommandResolver {
    pub fn new(
        ground_truth: GroundTruthIndex,
        grammar: GrammarValidator,
        parser: Box<dyn SemanticParser>,
        lemmatizer: Box<dyn Lemmatizer>,
        audit: AuditLog,
        agent_id: &str,
    ) -> Self {
        Self {
            ground_truth,
            grammar,
            parser,
            lemmatizer,
            audit,
            agent_id: agent_id.to_string(),
        }
    }

    /// Resolves one command end-to-end: source selection, audit, grammar
    /// gate, span substitution. With `chat_as_sequence` the model receives
    /// the command pre-split into tokens instead of one string.
    ///
    /// Model invocation failures propagate; they are a different failure
    /// class from a present-but-invalid parse and are not masked as NOOP.
    pub fn resolve(
        &self,
        command_text: &str,
        chat_as_sequence: bool,
    ) -> Result<Resolution, ParleyError> {
        let (form, source) = match self.ground_truth.lookup(command_text) {
            Some(form) => {
                info!(command = command_text, "found ground truth action");
                (form.clone(), ParseSource::GroundTruth)
            }
            None => {
                debug!(command = command_text, "querying the semantic parsing model");
                let form = if chat_as_sequence {
                    let tokens = whitespace_tokens(command_text);
                    self.parser.parse(ChatInput::Tokens(&tokens))?
                } else {
                    self.parser.parse(ChatInput::Text(command_text))?
                };
                (form, ParseSource::Model)
            }
        };

        // Every attempt is audited before validation so invalid output is
        // still traceable offline. A failed write must not discard the
        // already-computed resolution.
        let record = AuditRecord {
            command: command_text.to_string(),
            logical_form: form.clone(),
            source,
            agent_id: self.agent_id.clone(),
            timestamp: time::now_epoch_secs(),
        };
        if let Err(e) = self.audit.append(&record) {
            error!(error = %e, "audit append failed; keeping resolution result");
        }

        if !self.grammar.validate(&form) {
            error!(
                command = command_text,
                form = %form.to_json_string(),
                "parse tree failed grammar validation; returning NOOP"
            );
            for violation in self.grammar.violations(&form) {
                debug!(violation = %violation, "grammar violation");
            }
            return Ok(Resolution {
                form: LogicalForm::noop(),
                source,
            });
        }

        let original = whitespace_tokens(command_text);
        let lemmatized = self.lemmatizer.lemmatize(command_text);
        debug!(
            original = ?original,
            lemmatized = ?lemmatized,
            "resolving spans"
        );
        let form = resolve_spans(&form, &original, &lemmatized)?;

        Ok(Resolution { form, source })
    }

    pub fn ground_truth(&self) -> &GroundTruthIndex {
        &self.ground_truth
    }

    pub fn grammar(&self) -> &GrammarValidator {
        &self.grammar
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::contract::IdentityLemmatizer;
    use serde_json::json;
    use std::cell::Cell;
    use std::path::Path;
    use tempfile::tempdir;

    /// Scripted model that counts invocations.
    struct ScriptedParser {
        form: LogicalForm,
        calls: std::rc::Rc<Cell<usize>>,
    }

    impl SemanticParser for ScriptedParser {
        fn parse(&self, _chat: ChatInput<'_>) -> Result<LogicalForm, ParleyError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.form.clone())
        }
    }

    struct FailingParser;

    impl SemanticParser for FailingParser {
        fn parse(&self, _chat: ChatInput<'_>) -> Result<LogicalForm, ParleyError> {
            Err(ParleyError::ModelError("model crashed".to_string()))
        }
    }

    fn gt_index(dir: &Path) -> GroundTruthIndex {
        let datasets = dir.join("datasets");
        std::fs::create_dir_all(&datasets).unwrap();
        std::fs::write(
            datasets.join("commands.txt"),
            "\"come here\"|{\"dialogue_type\": \"HUMAN_GIVE_COMMAND\", \"action_sequence\": [{\"action_type\": \"MOVE\"}]}\n",
        )
        .unwrap();
        GroundTruthIndex::load_dir(dir).unwrap()
    }

    fn resolver_with(
        dir: &Path,
        parser: Box<dyn SemanticParser>,
    ) -> CommandResolver {
        CommandResolver::new(
            gt_index(dir),
            GrammarValidator::embedded_default().unwrap(),
            parser,
            Box::new(IdentityLemmatizer),
            AuditLog::create(&dir.join("nsp_outputs.csv")).unwrap(),
            "test_agent",
        )
    }

    #[test]
    fn test_ground_truth_hit_skips_model() {
        let tmp = tempdir().unwrap();
        let calls = std::rc::Rc::new(Cell::new(0));
        let parser = ScriptedParser {
            form: LogicalForm::noop(),
            calls: calls.clone(),
        };
        let resolver = resolver_with(tmp.path(), Box::new(parser));

        let resolution = resolver.resolve("come here", false).unwrap();
        assert_eq!(resolution.source, ParseSource::GroundTruth);
        assert_eq!(
            resolution.form.dialogue_type_str(),
            Some("HUMAN_GIVE_COMMAND")
        );
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_miss_invokes_model_exactly_once() {
        let tmp = tempdir().unwrap();
        let calls = std::rc::Rc::new(Cell::new(0));
        let parser = ScriptedParser {
            form: LogicalForm::noop(),
            calls: calls.clone(),
        };
        let resolver = resolver_with(tmp.path(), Box::new(parser));

        let resolution = resolver.resolve("do a flip", false).unwrap();
        assert_eq!(resolution.source, ParseSource::Model);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_invalid_form_becomes_noop_but_is_audited() {
        let tmp = tempdir().unwrap();
        let calls = std::rc::Rc::new(Cell::new(0));
        let parser = ScriptedParser {
            form: LogicalForm::from_value(json!({"dialogue_type": "BOGUS", "junk": 1})).unwrap(),
            calls,
        };
        let resolver = resolver_with(tmp.path(), Box::new(parser));

        let resolution = resolver.resolve("gibberish", false).unwrap();
        assert!(resolution.form.is_noop());
        assert_eq!(resolution.form.root().len(), 1);
        assert_eq!(resolution.source, ParseSource::Model);

        // The invalid attempt still produced an audit row with the raw form.
        let content = std::fs::read_to_string(resolver.audit().path()).unwrap();
        assert!(content.contains("gibberish"));
        assert!(content.contains("BOGUS"));
    }

    #[test]
    fn test_model_failure_propagates() {
        let tmp = tempdir().unwrap();
        let resolver = resolver_with(tmp.path(), Box::new(FailingParser));
        assert!(matches!(
            resolver.resolve("do a flip", false),
            Err(ParleyError::ModelError(_))
        ));
    }

    #[test]
    fn test_spans_resolved_after_validation() {
        let tmp = tempdir().unwrap();
        let calls = std::rc::Rc::new(Cell::new(0));
        let parser = ScriptedParser {
            form: LogicalForm::from_value(json!({
                "dialogue_type": "HUMAN_GIVE_COMMAND",
                "action_sequence": [{
                    "action_type": "DESTROY",
                    "reference_object": {
                        "filters": {"contains_coreference": "yes"},
                        "text_span": [0, [1, 1]]
                    }
                }]
            }))
            .unwrap(),
            calls,
        };
        let resolver = resolver_with(tmp.path(), Box::new(parser));

        let resolution = resolver.resolve("destroy this", false).unwrap();
        assert_eq!(
            resolution.form.root()["action_sequence"][0]["reference_object"]["text_span"],
            json!("this")
        );
        assert!(!resolution.form.contains_span_markers());
    }
}
