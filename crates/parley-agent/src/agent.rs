//! Core Agent trait definition.
//!
//! Every voice on the blackboard implements [`Agent`]. The trait is the only
//! seam between the scheduler and the reasoning service, so deterministic
//! fakes can stand in for real model calls in tests.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use parley_board::{ContextWindow, Message};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Kind of agent, used for catalog lookup and quorum counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Acts when the latest message matches its trigger (writer, editor, ...).
    Reactive,
    /// Offers a persona-flavoured opinion (critic, optimist, ...).
    Perspective,
    /// Summarises once enough perspectives have accrued.
    Synthesis,
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reactive => write!(f, "reactive"),
            Self::Perspective => write!(f, "perspective"),
            Self::Synthesis => write!(f, "synthesis"),
        }
    }
}

impl FromStr for AgentRole {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reactive" => Ok(Self::Reactive),
            "perspective" => Ok(Self::Perspective),
            "synthesis" => Ok(Self::Synthesis),
            other => Err(AgentError::Roster(format!("unknown agent role '{}'", other))),
        }
    }
}

/// Outcome of a single decide call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Post this text to the blackboard.
    Act(String),
    /// Stay silent this round.
    Abstain,
}

/// Everything an agent is given for one decision.
#[derive(Debug, Clone)]
pub struct AgentContext {
    /// Scheduling round this decision belongs to.
    pub round: u64,
    /// Router snapshot for the agent.
    pub window: ContextWindow,
}

impl AgentContext {
    /// Creates a context for the given round.
    pub fn new(round: u64, window: ContextWindow) -> Self {
        Self { round, window }
    }

    /// The window rendered one message per line.
    pub fn formatted(&self) -> String {
        self.window.format()
    }
}

/// Core trait for blackboard agents.
///
/// Implementations hold no cursor: the router owns "what has this agent
/// already been offered". `decide` may be slow and may fail; the scheduler
/// wraps it in a timeout and treats any error as abstaining.
///
/// # Example
///
/// ```ignore
/// use parley_agent::{Agent, AgentContext, AgentRole, Decision, Result};
/// use async_trait::async_trait;
///
/// struct Echo;
///
/// #[async_trait]
/// impl Agent for Echo {
///     fn name(&self) -> &str { "echo" }
///     fn role(&self) -> AgentRole { AgentRole::Reactive }
///
///     async fn decide(&self, ctx: &AgentContext) -> Result<Decision> {
///         Ok(match ctx.window.latest() {
///             Some(m) => Decision::Act(m.text().to_string()),
///             None => Decision::Abstain,
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stable name; also the sender name of everything the agent posts.
    fn name(&self) -> &str;

    /// Role of this agent.
    fn role(&self) -> AgentRole;

    /// Decides whether to act on the given context.
    async fn decide(&self, ctx: &AgentContext) -> Result<Decision>;

    /// Follow-up note posted after a substantive accepted output.
    fn completion_note(&self) -> Option<&str> {
        None
    }

    /// Called once the agent's output passed moderation and was appended.
    ///
    /// An `Act` that moderation drops never reaches this hook.
    fn on_committed(&self, _message: &Message) {}
}
