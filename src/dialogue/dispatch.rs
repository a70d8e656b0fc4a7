//! Dialogue-type dispatch.
//!
//! `DialogueType` is a closed enum: every value the grammar can emit has a
//! branch here, and anything else is a contract mismatch between grammar
//! version and dispatcher. That mismatch is deliberately fatal for the turn
//! rather than coerced to NOOP; masking it would hide a deployment skew.

use crate::core::error::ParleyError;
use crate::core::logical_form::LogicalForm;
use crate::dialogue::handlers::{DialogueHandler, HandlerRegistry};

/// Canned utterance for the NOOP fallback handler.
pub const NOOP_RESPONSE: &str = "I don't know how to answer that.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueType {
    Noop,
    GetCapabilities,
    HumanGiveCommand,
    PutMemory,
    GetMemory,
}

impl DialogueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogueType::Noop => "NOOP",
            DialogueType::GetCapabilities => "GET_CAPABILITIES",
            DialogueType::HumanGiveCommand => "HUMAN_GIVE_COMMAND",
            DialogueType::PutMemory => "PUT_MEMORY",
            DialogueType::GetMemory => "GET_MEMORY",
        }
    }

    /// Reads the root `dialogue_type` of a resolved form. Absence and
    /// unrecognized values are both fatal structural errors.
    pub fn from_form(form: &LogicalForm) -> Result<Self, ParleyError> {
        match form.dialogue_type_str() {
            Some("NOOP") => Ok(DialogueType::Noop),
            Some("GET_CAPABILITIES") => Ok(DialogueType::GetCapabilities),
            Some("HUMAN_GIVE_COMMAND") => Ok(DialogueType::HumanGiveCommand),
            Some("PUT_MEMORY") => Ok(DialogueType::PutMemory),
            Some("GET_MEMORY") => Ok(DialogueType::GetMemory),
            Some(other) => Err(ParleyError::UnknownDialogueType(other.to_string())),
            None => Err(ParleyError::UnknownDialogueType(
                "dialogue_type missing from resolved form".to_string(),
            )),
        }
    }
}

impl std::fmt::Display for DialogueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a validated, span-free logical form to a handler instantiation.
/// Produces no handler on an unrecognized dialogue type.
pub fn dispatch(
    registry: &dyn HandlerRegistry,
    speaker: &str,
    form: LogicalForm,
) -> Result<(DialogueType, Box<dyn DialogueHandler>), ParleyError> {
    let dialogue_type = DialogueType::from_form(&form)?;
    let handler = match dialogue_type {
        DialogueType::Noop => registry.say(NOOP_RESPONSE),
        DialogueType::GetCapabilities => registry.capabilities(),
        DialogueType::HumanGiveCommand => registry.interpreter(speaker, form),
        DialogueType::PutMemory => registry.put_memory(speaker, form),
        DialogueType::GetMemory => registry.get_memory(speaker, form),
    };
    Ok((dialogue_type, handler))
}
