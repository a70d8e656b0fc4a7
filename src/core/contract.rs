//! Contracts for the pipeline's external collaborators.
//!
//! The semantic parsing model, the lemmatizer, and the memory/coreference
//! engine are consumed by contract only. The pipeline never reaches around
//! these traits; swapping a live model for a scripted one is a constructor
//! argument, not a code change.

use crate::core::error::ParleyError;
use crate::core::logical_form::LogicalForm;
use crate::core::time;

/// A command as handed to the semantic parsing model: either the raw chat
/// string or a pre-split token sequence, per the caller's choice.
#[derive(Debug, Clone, Copy)]
pub enum ChatInput<'a> {
    Text(&'a str),
    Tokens(&'a [String]),
}

/// The semantic parsing model boundary: text in, logical form out.
///
/// The returned form must be structurally consumable by the grammar
/// validator; validity is NOT part of this contract, only shape. Errors are
/// model invocation failures and propagate to the caller unretried.
pub trait SemanticParser {
    fn parse(&self, chat: ChatInput<'_>) -> Result<LogicalForm, ParleyError>;
}

/// The lemmatization boundary: one base-form token per whitespace-delimited
/// input token, order preserved.
pub trait Lemmatizer {
    fn lemmatize(&self, text: &str) -> Vec<String>;
}

/// The long-term memory boundary: coreference resolution over a form plus a
/// bookkeeping write associating the form with the running conversation.
pub trait MemoryBridge {
    fn resolve_coreference(
        &mut self,
        form: &mut LogicalForm,
        chat: &str,
    ) -> Result<(), ParleyError>;

    /// Records the form against conversational memory, returning the new
    /// node id. Failures here must not affect dispatch.
    fn record(&mut self, form: &LogicalForm) -> Result<String, ParleyError>;
}

/// Token-passthrough lemmatizer for deployments without an NLP service
/// attached (tests, the debug CLI).
#[derive(Debug, Default)]
pub struct IdentityLemmatizer;

impl Lemmatizer for IdentityLemmatizer {
    fn lemmatize(&self, text: &str) -> Vec<String> {
        crate::core::preprocess::whitespace_tokens(text)
    }
}

/// Memory bridge that resolves nothing and records into the void. Node ids
/// are still real so downstream bookkeeping stays traceable.
#[derive(Debug, Default)]
pub struct NullMemory;

impl MemoryBridge for NullMemory {
    fn resolve_coreference(
        &mut self,
        _form: &mut LogicalForm,
        _chat: &str,
    ) -> Result<(), ParleyError> {
        Ok(())
    }

    fn record(&mut self, _form: &LogicalForm) -> Result<String, ParleyError> {
        Ok(time::new_event_id())
    }
}

/// Stand-in for deployments without a model attached. Every parse attempt is
/// a model invocation failure, which keeps ground-truth-only operation honest
/// about what it can and cannot resolve.
#[derive(Debug, Default)]
pub struct DetachedParser;

impl SemanticParser for DetachedParser {
    fn parse(&self, _chat: ChatInput<'_>) -> Result<LogicalForm, ParleyError> {
        Err(ParleyError::ModelError(
            "no semantic parsing model attached and command not in ground truth".to_string(),
        ))
    }
}
