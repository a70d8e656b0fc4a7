//! The dialogue stack and its admission gate.
//!
//! The stack owns every in-progress handler; the top entry is the most
//! recently pushed. `admit` is the sole backpressure mechanism in the
//! pipeline: while the top handler is awaiting a reply, no new chat is
//! processed at all, which keeps one live conversational turn per agent.

use crate::dialogue::handlers::DialogueHandler;

#[derive(Default)]
pub struct DialogueStack {
    entries: Vec<Box<dyn DialogueHandler>>,
}

impl DialogueStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// False when the top entry is awaiting a response; callers must not
    /// process the chat this cycle (they may re-queue it). True otherwise,
    /// including on an empty stack.
    pub fn admit(&self) -> bool {
        !self
            .entries
            .last()
            .is_some_and(|top| top.awaiting_response())
    }

    pub fn push(&mut self, handler: Box<dyn DialogueHandler>) {
        self.entries.push(handler);
    }

    pub fn pop(&mut self) -> Option<Box<dyn DialogueHandler>> {
        self.entries.pop()
    }

    pub fn peek(&self) -> Option<&dyn DialogueHandler> {
        self.entries.last().map(|b| b.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
