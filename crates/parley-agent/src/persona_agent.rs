//! Generic persona-driven agent.
//!
//! One type serves every reactive and perspective voice: the persona record
//! supplies the words, the two-phase decide supplies the behaviour.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::agent::{Agent, AgentContext, AgentRole, Decision};
use crate::error::{AgentError, Result};
use crate::persona::{parse_verdict, Persona};
use crate::reasoner::{invoke_logged, Phase, Reasoner, ReasoningRequest};

/// Token budget for the YES/NO trigger question.
const DECISION_MAX_TOKENS: u32 = 50;
const DECISION_TEMPERATURE: f32 = 0.1;
const GENERATION_TEMPERATURE: f32 = 0.7;

/// Default word budget for generated replies.
pub const DEFAULT_WORD_LIMIT: usize = 100;

/// Agent backed by a [`Persona`] and a [`Reasoner`].
pub struct PersonaAgent {
    persona: Persona,
    reasoner: Arc<dyn Reasoner>,
    word_limit: usize,
}

impl PersonaAgent {
    /// Creates an agent with the default word limit.
    pub fn new(persona: Persona, reasoner: Arc<dyn Reasoner>) -> Self {
        Self {
            persona,
            reasoner,
            word_limit: DEFAULT_WORD_LIMIT,
        }
    }

    /// Set the word limit stated in generation prompts.
    pub fn with_word_limit(mut self, word_limit: usize) -> Self {
        self.word_limit = word_limit.max(1);
        self
    }

    /// The persona record.
    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Asks the trigger question. `Ok(false)` means the persona declined.
    pub async fn should_act(&self, context: &str) -> Result<bool> {
        let request = ReasoningRequest::new(
            &self.persona.name,
            Phase::Decision,
            self.persona.decision_prompt(context),
        )
        .with_max_tokens(DECISION_MAX_TOKENS)
        .with_temperature(DECISION_TEMPERATURE);

        let answer = invoke_logged(self.reasoner.as_ref(), &request).await?;
        parse_verdict(&answer).ok_or_else(|| {
            AgentError::MalformedDecision(format!(
                "expected an answer starting with YES or NO, got {:?}",
                truncate(&answer, 60)
            ))
        })
    }

    /// Generates the persona's contribution for `context`.
    pub async fn generate(&self, context: &str) -> Result<String> {
        let request = ReasoningRequest::new(
            &self.persona.name,
            Phase::Processing,
            self.persona.generation_prompt(context, self.word_limit),
        )
        .with_max_tokens(u32::try_from(self.word_limit * 2).unwrap_or(u32::MAX))
        .with_temperature(GENERATION_TEMPERATURE);

        let text = invoke_logged(self.reasoner.as_ref(), &request).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(AgentError::MalformedDecision("empty generation".into()));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl Agent for PersonaAgent {
    fn name(&self) -> &str {
        &self.persona.name
    }

    fn role(&self) -> AgentRole {
        self.persona.role
    }

    async fn decide(&self, ctx: &AgentContext) -> Result<Decision> {
        if ctx.window.is_empty() {
            debug!(agent = %self.persona.name, "empty context, abstaining");
            return Ok(Decision::Abstain);
        }

        let context = ctx.formatted();
        if !self.should_act(&context).await? {
            debug!(agent = %self.persona.name, round = ctx.round, "declined");
            return Ok(Decision::Abstain);
        }

        let text = self.generate(&context).await?;
        Ok(Decision::Act(text))
    }

    fn completion_note(&self) -> Option<&str> {
        self.persona.completion_note.as_deref()
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::testing::{Reply, ScriptedReasoner};
    use parley_board::{Blackboard, ContextPolicy, Router, Sender};

    fn context_for(agent: &str, posts: &[(Sender, &str)]) -> AgentContext {
        let board = Arc::new(Blackboard::new());
        for (sender, text) in posts {
            board.append(sender.clone(), *text).unwrap();
        }
        let router = Router::new(board);
        AgentContext::new(1, router.build_context(agent, &ContextPolicy::default()))
    }

    fn writer(reasoner: Arc<ScriptedReasoner>) -> PersonaAgent {
        PersonaAgent::new(catalog::persona("writer").unwrap(), reasoner)
    }

    #[tokio::test]
    async fn test_yes_then_generate() {
        let reasoner = Arc::new(
            ScriptedReasoner::new().script("writer", [Reply::yes(), Reply::text("  A draft about X.  ")]),
        );
        let agent = writer(reasoner.clone()).with_word_limit(80);
        let ctx = context_for("writer", &[(Sender::User, "Write a draft about X")]);

        let decision = agent.decide(&ctx).await.unwrap();
        assert_eq!(decision, Decision::Act("A draft about X.".into()));

        let requests = reasoner.requests_for("writer");
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].phase, Phase::Decision);
        assert_eq!(requests[0].max_tokens, Some(50));
        assert_eq!(requests[0].temperature, Some(0.1));
        assert!(requests[0].prompt.contains("user: Write a draft about X"));
        assert_eq!(requests[1].phase, Phase::Processing);
        assert_eq!(requests[1].max_tokens, Some(160));
        assert!(requests[1].prompt.contains("under 80 words"));
    }

    #[tokio::test]
    async fn test_no_abstains_without_generation() {
        let reasoner = Arc::new(ScriptedReasoner::new().script("writer", [Reply::no()]));
        let agent = writer(reasoner.clone());
        let ctx = context_for("writer", &[(Sender::User, "writer, stop posting")]);

        assert_eq!(agent.decide(&ctx).await.unwrap(), Decision::Abstain);
        assert_eq!(reasoner.calls(), 1);
    }

    #[tokio::test]
    async fn test_garbage_verdict_fails_closed() {
        let reasoner = Arc::new(ScriptedReasoner::new().script("writer", [Reply::Garbage]));
        let agent = writer(reasoner);
        let ctx = context_for("writer", &[(Sender::User, "hi")]);

        let err = agent.decide(&ctx).await.unwrap_err();
        assert!(matches!(err, AgentError::MalformedDecision(_)));
    }

    #[tokio::test]
    async fn test_empty_generation_is_malformed() {
        let reasoner = Arc::new(ScriptedReasoner::new().script("writer", [Reply::yes(), Reply::text("   ")]));
        let agent = writer(reasoner);
        let ctx = context_for("writer", &[(Sender::User, "Write")]);

        assert!(matches!(
            agent.decide(&ctx).await,
            Err(AgentError::MalformedDecision(_))
        ));
    }

    #[tokio::test]
    async fn test_service_error_propagates() {
        let reasoner = Arc::new(ScriptedReasoner::new().script("writer", [Reply::fail("503")]));
        let agent = writer(reasoner);
        let ctx = context_for("writer", &[(Sender::User, "Write")]);

        assert!(matches!(agent.decide(&ctx).await, Err(AgentError::Service(_))));
    }

    #[tokio::test]
    async fn test_empty_window_skips_service() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        let agent = writer(reasoner.clone());
        // Only the writer's own message exists, so its window is empty.
        let ctx = context_for("writer", &[(Sender::agent("writer"), "my draft")]);

        assert_eq!(agent.decide(&ctx).await.unwrap(), Decision::Abstain);
        assert_eq!(reasoner.calls(), 0);
    }

    #[test]
    fn test_metadata() {
        let agent = writer(Arc::new(ScriptedReasoner::new()));
        assert_eq!(agent.name(), "writer");
        assert_eq!(agent.role(), AgentRole::Reactive);
        assert!(agent.completion_note().is_some());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
