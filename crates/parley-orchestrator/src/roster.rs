//! Turns a roster and process settings into scheduler slots.

use std::sync::Arc;
use std::time::Duration;

use parley_agent::{Agent, AgentRole, PersonaAgent, Reasoner, Roster, SynthesisAgent};
use parley_core::Settings;
use tracing::{debug, warn};

use crate::config::AgentPolicy;
use crate::error::{OrchestratorError, Result};
use crate::scheduler::AgentSlot;

/// Builds one slot per roster entry, in roster order.
///
/// Policies come from the entry's overrides, falling back to `settings`.
/// A synthesis agent counts posts by every perspective agent in the roster
/// and needs a window at least as large as its quorum.
pub fn build_slots(
    roster: &Roster,
    settings: &Settings,
    reasoner: Arc<dyn Reasoner>,
) -> Result<Vec<AgentSlot>> {
    roster.validate()?;
    let personas = roster.personas()?;

    let contributors: Vec<String> = personas
        .iter()
        .filter(|p| p.role == AgentRole::Perspective)
        .map(|p| p.name.clone())
        .collect();

    let quorum = settings.synthesis_quorum.max(1);
    let mut slots = Vec::with_capacity(personas.len());

    for (entry, persona) in roster.entries.iter().zip(personas) {
        let mut window = entry.window_size.unwrap_or(settings.context_window);

        if persona.role == AgentRole::Synthesis {
            if window < quorum {
                if entry.window_size.is_some() {
                    return Err(OrchestratorError::Configuration(format!(
                        "agent '{}' has window {} smaller than quorum {}",
                        persona.name, window, quorum
                    )));
                }
                debug!(agent = %persona.name, window = quorum, "widening synthesis window to quorum");
                window = quorum;
            }
            if contributors.is_empty() {
                warn!(agent = %persona.name, "synthesis agent has no perspective agents to count");
            }
        }

        let mut policy = AgentPolicy::new(window);
        if let Some(exclude_own) = entry.exclude_own {
            policy = policy.with_exclude_own(exclude_own);
        }
        let rate_limit = entry
            .rate_limit_secs
            .map(Duration::from_secs)
            .or(settings.rate_limit);
        if let Some(interval) = rate_limit {
            policy = policy.with_rate_limit(interval);
        }

        let agent: Arc<dyn Agent> = match persona.role {
            AgentRole::Synthesis => Arc::new(
                SynthesisAgent::new(persona, Arc::clone(&reasoner), contributors.iter().cloned())
                    .with_quorum(quorum)
                    .with_word_limit(settings.word_limit),
            ),
            AgentRole::Reactive | AgentRole::Perspective => Arc::new(
                PersonaAgent::new(persona, Arc::clone(&reasoner)).with_word_limit(settings.word_limit),
            ),
        };

        debug!(agent = %agent.name(), role = %agent.role(), ?policy, "agent configured");
        slots.push(AgentSlot::new(agent, policy));
    }

    Ok(slots)
}
