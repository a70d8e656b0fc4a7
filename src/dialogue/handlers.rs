//! Dialogue handler contracts.
//!
//! Handler business logic (the interpreter, the memory handlers) lives
//! outside this crate. The pipeline only needs two things from a handler:
//! whether it is blocking the conversation awaiting a reply, and a way to
//! construct one per dialogue type. `HandlerRegistry` is the typed analog of
//! a dialogue-object class table.

use std::any::Any;

use crate::core::logical_form::LogicalForm;

/// An in-progress conversational handler. Opaque to the pipeline apart from
/// the `awaiting_response` flag the stack gate reads.
pub trait DialogueHandler {
    /// True while the handler is blocked on a reply from the speaker. The
    /// gate refuses new commands while the top-of-stack handler says so.
    fn awaiting_response(&self) -> bool;

    /// Short human-readable tag for logs and debug surfaces.
    fn label(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

/// Constructs handlers for each dispatch decision. Implementations own the
/// actual business logic; the dispatcher only chooses which constructor runs
/// and with what arguments.
pub trait HandlerRegistry {
    /// Canned single-utterance response (NOOP fallback, safety refusal).
    fn say(&self, utterance: &str) -> Box<dyn DialogueHandler>;

    /// Scripted greeting response for a matched greeting category.
    fn greet(&self, category: &str) -> Box<dyn DialogueHandler>;

    /// Capabilities self-description.
    fn capabilities(&self) -> Box<dyn DialogueHandler>;

    /// Command interpreter; receives the speaker and the fully-resolved form.
    fn interpreter(&self, speaker: &str, form: LogicalForm) -> Box<dyn DialogueHandler>;

    fn put_memory(&self, speaker: &str, form: LogicalForm) -> Box<dyn DialogueHandler>;

    fn get_memory(&self, speaker: &str, form: LogicalForm) -> Box<dyn DialogueHandler>;
}

/// Registry producing inert, inspectable handlers. Stands in for a real
/// handler suite in tests and the debug CLI.
#[derive(Debug, Default)]
pub struct ScriptedHandlers;

/// What `ScriptedHandlers` builds: a frozen snapshot of the dispatch
/// arguments.
#[derive(Debug)]
pub struct ScriptedHandler {
    label: String,
    pub utterance: Option<String>,
    pub speaker: Option<String>,
    pub form: Option<LogicalForm>,
    pub awaiting: bool,
}

impl ScriptedHandler {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            utterance: None,
            speaker: None,
            form: None,
            awaiting: false,
        }
    }
}

impl DialogueHandler for ScriptedHandler {
    fn awaiting_response(&self) -> bool {
        self.awaiting
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl HandlerRegistry for ScriptedHandlers {
    fn say(&self, utterance: &str) -> Box<dyn DialogueHandler> {
        let mut handler = ScriptedHandler::new("say");
        handler.utterance = Some(utterance.to_string());
        Box::new(handler)
    }

    fn greet(&self, category: &str) -> Box<dyn DialogueHandler> {
        let mut handler = ScriptedHandler::new("greet");
        handler.utterance = Some(category.to_string());
        Box::new(handler)
    }

    fn capabilities(&self) -> Box<dyn DialogueHandler> {
        Box::new(ScriptedHandler::new("capabilities"))
    }

    fn interpreter(&self, speaker: &str, form: LogicalForm) -> Box<dyn DialogueHandler> {
        let mut handler = ScriptedHandler::new("interpreter");
        handler.speaker = Some(speaker.to_string());
        handler.form = Some(form);
        Box::new(handler)
    }

    fn put_memory(&self, speaker: &str, form: LogicalForm) -> Box<dyn DialogueHandler> {
        let mut handler = ScriptedHandler::new("put_memory");
        handler.speaker = Some(speaker.to_string());
        handler.form = Some(form);
        Box::new(handler)
    }

    fn get_memory(&self, speaker: &str, form: LogicalForm) -> Box<dyn DialogueHandler> {
        let mut handler = ScriptedHandler::new("get_memory");
        handler.speaker = Some(speaker.to_string());
        handler.form = Some(form);
        Box::new(handler)
    }
}
