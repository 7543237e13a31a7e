//! Router - per-agent context windows and processed cursors.
//!
//! The router answers two separate questions for each agent:
//! - what slice of the blackboard may it see ([`Router::build_context`])
//! - has it already been offered the current state ([`Router::has_unprocessed`])
//!
//! Window size and self-exclusion are per-agent [`ContextPolicy`] values; the
//! cursor mechanism is shared.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, trace};

use crate::blackboard::Blackboard;
use crate::message::{Message, MessageId};

/// Text used when a window holds no messages.
pub const EMPTY_CONTEXT: &str = "No messages available.";

/// How an agent's context window is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextPolicy {
    /// Maximum number of messages in the window.
    pub window_size: usize,
    /// Leave the agent's own messages out of its window.
    pub exclude_own: bool,
}

impl Default for ContextPolicy {
    fn default() -> Self {
        Self {
            window_size: 5,
            exclude_own: true,
        }
    }
}

impl ContextPolicy {
    /// Creates a policy with the given window size and self-exclusion on.
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            ..Default::default()
        }
    }

    /// Sets the window size.
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Sets whether the agent's own messages are excluded.
    pub fn with_exclude_own(mut self, exclude_own: bool) -> Self {
        self.exclude_own = exclude_own;
        self
    }

    fn admits(&self, agent: &str, message: &Message) -> bool {
        !(self.exclude_own && message.is_from(agent))
    }
}

/// A snapshot of what one agent may see for one decision.
#[derive(Debug, Clone)]
pub struct ContextWindow {
    /// Agent the window was built for.
    pub agent: String,
    /// Visible messages, oldest first.
    pub messages: Vec<Arc<Message>>,
    /// Visible messages the agent has not been offered before, oldest first.
    pub fresh: Vec<Arc<Message>>,
    /// Blackboard tail id the snapshot was taken at.
    pub as_of: MessageId,
}

impl ContextWindow {
    /// Returns true if no messages are visible.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Newest visible message.
    pub fn latest(&self) -> Option<&Arc<Message>> {
        self.messages.last()
    }

    /// Formats the window one message per line as `sender: text`.
    pub fn format(&self) -> String {
        if self.messages.is_empty() {
            return EMPTY_CONTEXT.to_string();
        }
        self.messages
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Computes context windows and owns every agent's processed cursor.
///
/// A cursor is the highest message id an agent has been offered. It only
/// moves forward, and only through [`Router::mark_processed`].
pub struct Router {
    board: Arc<Blackboard>,
    cursors: Mutex<HashMap<String, MessageId>>,
}

impl Router {
    /// Creates a router over the given blackboard.
    pub fn new(board: Arc<Blackboard>) -> Self {
        Self {
            board,
            cursors: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying blackboard.
    pub fn board(&self) -> &Arc<Blackboard> {
        &self.board
    }

    /// Registers an agent with a cursor of 0. No-op if already registered.
    pub fn register(&self, agent: &str) {
        self.lock_cursors().entry(agent.to_string()).or_insert(0);
    }

    /// Current cursor of the agent (0 if never processed).
    pub fn cursor(&self, agent: &str) -> MessageId {
        self.lock_cursors().get(agent).copied().unwrap_or(0)
    }

    /// True iff the blackboard tail is past the agent's cursor.
    pub fn has_unprocessed(&self, agent: &str) -> bool {
        self.board.tail_id() > self.cursor(agent)
    }

    /// Messages past the agent's cursor that its policy lets it see.
    pub fn fresh(&self, agent: &str, policy: &ContextPolicy) -> Vec<Arc<Message>> {
        let cursor = self.cursor(agent);
        self.board
            .since(cursor)
            .into_iter()
            .filter(|m| policy.admits(agent, m))
            .collect()
    }

    /// Builds the agent's context window as of the current tail.
    ///
    /// Own messages are filtered out first (when the policy says so), then
    /// the newest `window_size` remaining messages are kept.
    pub fn build_context(&self, agent: &str, policy: &ContextPolicy) -> ContextWindow {
        let cursor = self.cursor(agent);

        let (messages, fresh, as_of) = self.board.view(|log| {
            let as_of = log.last().map_or(0, |m| m.id());

            let mut messages: Vec<Arc<Message>> = log
                .iter()
                .rev()
                .filter(|m| policy.admits(agent, m))
                .take(policy.window_size)
                .cloned()
                .collect();
            messages.reverse();

            let start = usize::try_from(cursor).unwrap_or(usize::MAX).min(log.len());
            let fresh: Vec<Arc<Message>> = log[start..]
                .iter()
                .filter(|m| policy.admits(agent, m))
                .cloned()
                .collect();

            (messages, fresh, as_of)
        });

        trace!(
            agent = %agent,
            window = messages.len(),
            fresh = fresh.len(),
            as_of,
            "context built"
        );

        ContextWindow {
            agent: agent.to_string(),
            messages,
            fresh,
            as_of,
        }
    }

    /// Advances the agent's cursor to `up_to`.
    ///
    /// Idempotent: advancing to an id at or below the current cursor changes
    /// nothing. Returns true if the cursor moved.
    pub fn mark_processed(&self, agent: &str, up_to: MessageId) -> bool {
        let mut cursors = self.lock_cursors();
        let cursor = cursors.entry(agent.to_string()).or_insert(0);
        if up_to > *cursor {
            debug!(agent = %agent, from = *cursor, to = up_to, "cursor advanced");
            *cursor = up_to;
            true
        } else {
            false
        }
    }

    /// Cursor entries are plain integers, so a poisoned map is still valid.
    fn lock_cursors(&self) -> std::sync::MutexGuard<'_, HashMap<String, MessageId>> {
        self.cursors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
