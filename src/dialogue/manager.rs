//! The dialogue manager: intake, gating, and the turn lifecycle.
//!
//! One `step` call is one conversational turn: gate check, preprocessing,
//! safety filter, scripted-greeting short-circuit, then the full resolution
//! pipeline and handler dispatch. At most one handler is pushed per accepted
//! chat.

use tracing::{debug, info, warn};

use crate::core::audit::ParseSource;
use crate::core::config::RuntimeConfig;
use crate::core::contract::MemoryBridge;
use crate::core::error::ParleyError;
use crate::core::logical_form::LogicalForm;
use crate::core::preprocess::preprocess_chat;
use crate::core::resolver::{CommandResolver, Resolution};
use crate::core::time::hash_speaker;
use crate::dialogue::dispatch::{DialogueType, dispatch};
use crate::dialogue::handlers::HandlerRegistry;
use crate::dialogue::stack::DialogueStack;

/// Canned utterance for chats rejected by the safety filter.
pub const FILTERED_RESPONSE: &str = "I am not going to respond to that.";

/// What happened to one incoming chat.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The gate refused the chat; nothing was processed. Callers may
    /// re-queue it for a later cycle.
    Deferred,
    /// The safety filter rejected the chat before any parsing.
    Filtered,
    /// A scripted greeting short-circuited the pipeline; no model call, no
    /// audit record.
    Greeted { category: String },
    /// The full pipeline ran and a handler was pushed.
    Dispatched {
        dialogue_type: DialogueType,
        source: ParseSource,
        /// The resolved, coreference-substituted form as handed to the
        /// handler; exposed for debug callers of the same contract.
        form: LogicalForm,
        /// Memory tracking node, when the bookkeeping write succeeded.
        node_id: Option<String>,
    },
}

pub struct DialogueManager {
    resolver: CommandResolver,
    config: RuntimeConfig,
    registry: Box<dyn HandlerRegistry>,
    memory: Box<dyn MemoryBridge>,
    stack: DialogueStack,
}

impl DialogueManager {
    pub fn new(
        resolver: CommandResolver,
        config: RuntimeConfig,
        registry: Box<dyn HandlerRegistry>,
        memory: Box<dyn MemoryBridge>,
    ) -> Self {
        Self {
            resolver,
            config,
            registry,
            memory,
            stack: DialogueStack::new(),
        }
    }

    /// Processes one chat from `speaker`, maybe modifying the dialogue
    /// stack.
    pub fn step(&mut self, speaker: &str, chat: &str) -> Result<TurnOutcome, ParleyError> {
        if !self.stack.admit() {
            debug!(
                speaker = %hash_speaker(speaker),
                "top handler awaiting response; deferring chat"
            );
            return Ok(TurnOutcome::Deferred);
        }

        let sentences = preprocess_chat(chat);

        if sentences.iter().any(|s| !self.config.is_safe(s)) {
            warn!(
                speaker = %hash_speaker(speaker),
                "chat rejected by safety filter"
            );
            self.stack.push(self.registry.say(FILTERED_RESPONSE));
            return Ok(TurnOutcome::Filtered);
        }

        if let Some(category) = sentences
            .iter()
            .find_map(|s| self.config.greeting_match(s))
        {
            let category = category.to_string();
            self.stack.push(self.registry.greet(&category));
            return Ok(TurnOutcome::Greeted { category });
        }

        let command = sentences[0].as_str();
        let Resolution { mut form, source } = self.resolver.resolve(command, false)?;

        self.memory.resolve_coreference(&mut form, command)?;
        info!(
            speaker = %hash_speaker(speaker),
            form = %form.to_json_string(),
            "logical form post-coref"
        );

        // Bookkeeping only; a failed tracking write never blocks dispatch.
        let node_id = match self.memory.record(&form) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "memory tracking write failed");
                None
            }
        };

        let (dialogue_type, handler) = dispatch(self.registry.as_ref(), speaker, form.clone())?;
        self.stack.push(handler);

        Ok(TurnOutcome::Dispatched {
            dialogue_type,
            source,
            form,
            node_id,
        })
    }

    pub fn stack(&self) -> &DialogueStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut DialogueStack {
        &mut self.stack
    }

    pub fn resolver(&self) -> &CommandResolver {
        &self.resolver
    }
}
