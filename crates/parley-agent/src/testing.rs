//! Test utilities: a scripted reasoner that never touches the network.
//!
//! Replies are queued per agent. When an agent's queue is empty the
//! default reply is used. Every request is recorded for later assertions.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::reasoner::{Reasoner, ReasoningRequest};

/// One scripted reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Return this text.
    Text(String),
    /// Fail with a service error.
    Fail(String),
    /// Sleep, then fail. Used to trip per-call timeouts.
    Hang(Duration),
    /// Return text that is neither YES nor NO.
    Garbage,
}

impl Reply {
    /// Text reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Affirmative trigger answer.
    pub fn yes() -> Self {
        Self::text("YES - this matches my goal")
    }

    /// Negative trigger answer.
    pub fn no() -> Self {
        Self::text("NO - nothing for me here")
    }

    /// Service failure.
    pub fn fail(reason: impl Into<String>) -> Self {
        Self::Fail(reason.into())
    }

    /// Hang for the given duration.
    pub fn hang(duration: Duration) -> Self {
        Self::Hang(duration)
    }

    /// Trigger answer followed by generated text: a full `Act`.
    pub fn act(text: impl Into<String>) -> [Self; 2] {
        [Self::yes(), Self::text(text)]
    }
}

/// Deterministic [`Reasoner`] for tests.
#[derive(Debug)]
pub struct ScriptedReasoner {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    default: Reply,
    requests: Mutex<Vec<ReasoningRequest>>,
}

impl Default for ScriptedReasoner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedReasoner {
    /// Reasoner whose default reply is NO, so unscripted agents abstain.
    pub fn new() -> Self {
        Self::with_default(Reply::no())
    }

    /// Reasoner with the given default reply.
    pub fn with_default(default: Reply) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues replies for an agent (builder form).
    pub fn script(self, agent: &str, replies: impl IntoIterator<Item = Reply>) -> Self {
        for reply in replies {
            self.push(agent, reply);
        }
        self
    }

    /// Queues one reply for an agent.
    pub fn push(&self, agent: &str, reply: Reply) {
        lock(&self.scripts)
            .entry(agent.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Every request received, in arrival order.
    pub fn requests(&self) -> Vec<ReasoningRequest> {
        lock(&self.requests).clone()
    }

    /// Requests received from one agent.
    pub fn requests_for(&self, agent: &str) -> Vec<ReasoningRequest> {
        lock(&self.requests)
            .iter()
            .filter(|r| r.agent == agent)
            .cloned()
            .collect()
    }

    /// Total number of calls.
    pub fn calls(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Replies still queued for an agent.
    pub fn remaining(&self, agent: &str) -> usize {
        lock(&self.scripts).get(agent).map_or(0, VecDeque::len)
    }
}

#[async_trait]
impl Reasoner for ScriptedReasoner {
    fn provider(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, request: &ReasoningRequest) -> Result<String> {
        lock(&self.requests).push(request.clone());
        let reply = lock(&self.scripts)
            .get_mut(&request.agent)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.default.clone());

        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Fail(reason) => Err(AgentError::Service(reason)),
            Reply::Hang(duration) => {
                tokio::time::sleep(duration).await;
                Err(AgentError::Service("scripted hang elapsed".into()))
            }
            Reply::Garbage => Ok("¯\\_(ツ)_/¯ maybe".into()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoner::Phase;

    fn request(agent: &str) -> ReasoningRequest {
        ReasoningRequest::new(agent, Phase::Decision, "prompt")
    }

    #[tokio::test]
    async fn test_scripted_replies_in_order() {
        let reasoner = ScriptedReasoner::new().script("writer", Reply::act("draft"));

        assert!(reasoner.invoke(&request("writer")).await.unwrap().starts_with("YES"));
        assert_eq!(reasoner.invoke(&request("writer")).await.unwrap(), "draft");
        // Queue exhausted: default NO.
        assert!(reasoner.invoke(&request("writer")).await.unwrap().starts_with("NO"));
        assert_eq!(reasoner.calls(), 3);
    }

    #[tokio::test]
    async fn test_scripts_are_per_agent() {
        let reasoner = ScriptedReasoner::new().script("a", [Reply::text("for a")]);

        assert!(reasoner.invoke(&request("b")).await.unwrap().starts_with("NO"));
        assert_eq!(reasoner.remaining("a"), 1);
        assert_eq!(reasoner.invoke(&request("a")).await.unwrap(), "for a");
        assert_eq!(reasoner.requests_for("a").len(), 1);
    }

    #[tokio::test]
    async fn test_failure_modes() {
        let reasoner = ScriptedReasoner::new().script("x", [Reply::fail("down"), Reply::Garbage]);

        assert!(matches!(
            reasoner.invoke(&request("x")).await,
            Err(AgentError::Service(_))
        ));
        let garbage = reasoner.invoke(&request("x")).await.unwrap();
        assert!(crate::persona::parse_verdict(&garbage).is_none());
    }

    #[tokio::test]
    async fn test_hang_sleeps() {
        let reasoner = ScriptedReasoner::new().script("slow", [Reply::hang(Duration::from_secs(30))]);
        let result = tokio::time::timeout(Duration::from_millis(50), reasoner.invoke(&request("slow"))).await;
        assert!(result.is_err());
    }
}
