//! Agents for the Parley blackboard.
//!
//! This crate defines the [`Agent`] contract the scheduler drives and the
//! agents that implement it:
//!
//! - [`PersonaAgent`]: reactive and perspective voices. A two-phase decide
//!   asks the reasoning service whether to act, then what to say.
//! - [`SynthesisAgent`]: acts only once a quorum of perspective posts has
//!   accrued since its last synthesis.
//! - [`Moderator`]: not an agent but a filter between a decision and the
//!   blackboard append (rate limits, near-duplicate suppression).
//!
//! Personas are data ([`Persona`], [`catalog`], [`Roster`]). All model access
//! goes through the [`Reasoner`] trait; [`ChatCompletionsClient`] and
//! [`GeminiClient`] are the real implementations and
//! [`testing::ScriptedReasoner`] the deterministic fake.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use parley_agent::{catalog, PersonaAgent};
//! use parley_agent::testing::{Reply, ScriptedReasoner};
//!
//! let reasoner = Arc::new(ScriptedReasoner::new().script("writer", Reply::act("A draft.")));
//! let writer = PersonaAgent::new(catalog::persona("writer").unwrap(), reasoner);
//! ```

pub mod agent;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod gemini;
pub mod moderation;
pub mod persona;
pub mod persona_agent;
pub mod reasoner;
pub mod synthesis;
pub mod testing;

pub use agent::{Agent, AgentContext, AgentRole, Decision};
pub use catalog::{Roster, RosterEntry};
pub use client::ChatCompletionsClient;
pub use config::ModelConfig;
pub use error::{AgentError, Result};
pub use gemini::GeminiClient;
pub use moderation::{ModerationConfig, Moderator, SuppressReason, Verdict};
pub use persona::{looks_complete, Persona};
pub use persona_agent::PersonaAgent;
pub use reasoner::{from_settings, Phase, Reasoner, ReasoningRequest, PROMPT_LOG_TARGET};
pub use synthesis::SynthesisAgent;
