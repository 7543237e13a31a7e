//! Quorum-gated synthesis agent.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use parley_board::{Message, Sender};
use tracing::{debug, info};

use crate::agent::{Agent, AgentContext, AgentRole, Decision};
use crate::error::Result;
use crate::persona::Persona;
use crate::persona_agent::PersonaAgent;
use crate::reasoner::Reasoner;

/// Default quorum.
pub const DEFAULT_QUORUM: usize = 3;

/// Agent that summarises once enough perspective contributions accrue.
///
/// The gate is a counter of qualifying messages (posts by one of the
/// contributor agents) offered since the agent's last synthesis reached the
/// blackboard. It never calls the reasoning service below quorum and skips
/// the trigger question at or above it. The counter resets in
/// [`Agent::on_committed`], so a synthesis dropped by moderation keeps it.
pub struct SynthesisAgent {
    inner: PersonaAgent,
    quorum: usize,
    contributors: HashSet<String>,
    pending: Mutex<usize>,
}

impl SynthesisAgent {
    /// Creates a synthesis agent counting posts by `contributors`.
    pub fn new(
        persona: Persona,
        reasoner: Arc<dyn Reasoner>,
        contributors: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            inner: PersonaAgent::new(persona, reasoner),
            quorum: DEFAULT_QUORUM,
            contributors: contributors.into_iter().map(Into::into).collect(),
            pending: Mutex::new(0),
        }
    }

    /// Set the quorum (at least 1).
    pub fn with_quorum(mut self, quorum: usize) -> Self {
        self.quorum = quorum.max(1);
        self
    }

    /// Set the word limit stated in generation prompts.
    pub fn with_word_limit(mut self, word_limit: usize) -> Self {
        self.inner = self.inner.with_word_limit(word_limit);
        self
    }

    /// Quorum threshold.
    pub fn quorum(&self) -> usize {
        self.quorum
    }

    /// Qualifying contributions counted since the last committed synthesis.
    pub fn pending(&self) -> usize {
        *self.lock_pending()
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, usize> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Agent for SynthesisAgent {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn role(&self) -> AgentRole {
        AgentRole::Synthesis
    }

    async fn decide(&self, ctx: &AgentContext) -> Result<Decision> {
        let qualifying = ctx
            .window
            .fresh
            .iter()
            .filter(|m| matches!(m.sender(), Sender::Agent(name) if self.contributors.contains(name)))
            .count();

        // Counted before any await, so a cancelled call keeps the tally.
        let count = {
            let mut pending = self.lock_pending();
            *pending += qualifying;
            *pending
        };

        if count < self.quorum {
            debug!(agent = %self.name(), count, quorum = self.quorum, "below quorum");
            return Ok(Decision::Abstain);
        }

        let text = self.inner.generate(&ctx.formatted()).await?;
        info!(agent = %self.name(), contributions = count, "synthesis produced");
        Ok(Decision::Act(text))
    }

    fn completion_note(&self) -> Option<&str> {
        self.inner.completion_note()
    }

    fn on_committed(&self, message: &Message) {
        let mut pending = self.lock_pending();
        debug!(agent = %self.name(), message_id = message.id(), consumed = *pending, "quorum reset");
        *pending = 0;
    }
}
