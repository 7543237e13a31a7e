//! Built-in personas and roster loading.
//!
//! A roster is the ordered list of agents for a run. Order matters: it is
//! the evaluation order inside a scheduling round.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::agent::AgentRole;
use crate::error::{AgentError, Result};
use crate::persona::Persona;

/// Names of the built-in rosters.
pub const BUILTIN_ROSTERS: &[&str] = &["content", "brain", "moderation"];

const CONTENT_ROSTER: &[&str] = &["writer", "editor", "grammar"];

/// The content pipeline plus agents that misbehave on purpose.
const MODERATION_ROSTER: &[&str] = &[
    "writer",
    "editor",
    "grammar",
    "moderator",
    "spam",
    "offtopic",
    "verbose",
    "interruptor",
];

const BRAIN_ROSTER: &[&str] = &[
    "critic",
    "opportunist",
    "rationalizer",
    "optimist",
    "pessimist",
    "doer",
    "lazy",
    "procrastinator",
    "consensus",
];

/// Looks up a built-in persona by name.
pub fn persona(name: &str) -> Option<Persona> {
    let persona = match name {
        "writer" => Persona::new(
            "writer",
            AgentRole::Reactive,
            "Create article drafts and written content",
            "You are a skilled writer. Create a well-structured article draft on the \
             requested topic, with an introduction, main points and a conclusion. \
             Keep the tone professional but accessible.",
        )
        .with_trigger("someone requests new written content on a topic")
        .with_completion_note(
            "I've drafted an article, see my previous message. Could someone edit it for style and flow?",
        ),
        "editor" => Persona::new(
            "editor",
            AgentRole::Reactive,
            "Improve writing style, structure, and clarity of text",
            "You are an experienced editor. Find the latest draft in the recent messages \
             and improve its readability, flow and sentence structure while keeping its \
             meaning. The draft is already in the conversation; do not ask for it. \
             Reply with the improved version only.",
        )
        .with_trigger("a draft from another agent has not been edited yet")
        .with_completion_note(
            "I've improved the style and structure, see my previous message. Could someone check grammar and spelling?",
        ),
        "grammar" => Persona::new(
            "grammar",
            AgentRole::Reactive,
            "Fix grammar, spelling, and language errors in text",
            "You are a meticulous grammar checker. Take the latest edited text in the \
             recent messages and correct grammar, spelling and punctuation, preserving \
             meaning and style. Do not ask for the text; reply with the corrected version.",
        )
        .with_trigger("an edited text has not been grammar-checked yet")
        .with_completion_note("Grammar check complete. The article above is ready for publication."),
        "joker" => Persona::new(
            "joker",
            AgentRole::Reactive,
            "Make light-hearted jokes about recent messages when appropriate",
            "You are a witty agent. Make one clean, brief, genuinely clever joke about \
             the recent messages. Avoid sensitive topics. If no good joke comes to mind, \
             keep it very short.",
        )
        .with_trigger("the conversation is light enough for humour"),
        "moderator" => Persona::new(
            "moderator",
            AgentRole::Reactive,
            "Monitor agent behavior and correct excessive or low-value posting",
            "You are a moderator. Post one brief, polite correction in the form \
             \"[agent-name] please [specific guidance]\", for example \"writer please keep \
             responses under 100 words\" or \"editor the content is in message #3 above\".",
        )
        .with_trigger(
            "an agent posts many messages in a row, posts very long or repetitive \
             content, or asks for content that is already available",
        ),
        "spam" => disruptor(
            "spam",
            "Post repetitive or excessive messages",
            "articles about technology or AI, or messages mentioning spam or test",
            "Post a short, repetitive message such as \"This is great! This is great!\" \
             or \"I agree! I agree! I agree!\".",
        ),
        "offtopic" => disruptor(
            "offtopic",
            "Post irrelevant content into focused conversations",
            "a focused discussion about a specific topic",
            "Post one brief, clearly unrelated remark, such as a random fact or what \
             you had for lunch.",
        ),
        "verbose" => disruptor(
            "verbose",
            "Create unnecessarily long and wordy responses",
            "any message you could answer at length",
            "Answer at far greater length than needed, staying loosely relevant. Lean on \
             phrases like \"In my extensive experience and detailed analysis\" and \
             \"Furthermore, additionally, and moreover\".",
        ),
        "interruptor" => disruptor(
            "interruptor",
            "Interrupt ongoing conversations with self-promotion",
            "other agents collaborating on a task",
            "Interrupt with brief self-promotion, such as \"I'm the best agent here, let \
             me handle this!\" or \"Forget what they said, here's what I think.\"",
        ),
        "critic" => perspective(
            "critic",
            "Evaluate weaknesses, find potential errors, and identify risks",
            "You are the Critic. Point out flaws, question assumptions, and name the \
             risks others overlooked. Be constructive and specific.",
            "I've identified potential risks and weaknesses. Consider them before proceeding.",
        ),
        "opportunist" => perspective(
            "opportunist",
            "Find shortcuts, quick wins, and immediate opportunities",
            "You are the Opportunist. Look for the fastest path to results and the \
             simplest move with the biggest payoff right now.",
            "I see quick wins and shortcuts here.",
        ),
        "rationalizer" => perspective(
            "rationalizer",
            "Provide logical justification and reasoning for decisions",
            "You are the Rationalizer. Explain why the choices on the table make sense \
             and connect actions to outcomes with a clear line of reasoning.",
            "I've laid out the reasoning behind this approach.",
        ),
        "optimist" => perspective(
            "optimist",
            "Focus on positive outcomes and possibilities",
            "You are the Optimist. Highlight what could go right and the potential in \
             the situation, staying realistic.",
            "There is real potential here. Focus on these possibilities.",
        ),
        "pessimist" => perspective(
            "pessimist",
            "Predict worst-case scenarios and prepare contingency plans",
            "You are the Pessimist. Predict what could go wrong and propose backup \
             plans for each failure.",
            "I've outlined worst cases and backup plans.",
        ),
        "doer" => perspective(
            "doer",
            "Push for immediate action and concrete next steps",
            "You are the Doer. Turn the discussion into the first concrete step that \
             can be taken today. Progress over perfection.",
            "Enough planning. Here's what to do right now.",
        ),
        "lazy" => perspective(
            "lazy",
            "Conserve energy and find easier alternatives",
            "You are the Lazy one. Question whether all this is necessary and suggest \
             the simplest approach that still works.",
            "This seems like too much work. Here's an easier way.",
        ),
        "procrastinator" => perspective(
            "procrastinator",
            "Find reasons to wait for better timing",
            "You are the Procrastinator. Argue for waiting, preparing more, or picking \
             a better moment.",
            "Maybe we should wait a bit longer.",
        ),
        "consensus" => Persona::new(
            "consensus",
            AgentRole::Synthesis,
            "Synthesize different viewpoints and build consensus",
            "You are the Consensus Builder. Weigh the perspectives in the recent \
             messages, find common ground between opposing views, and give one \
             balanced recommendation.",
        )
        .with_completion_note("After considering all perspectives, that is my recommendation."),
        _ => return None,
    };
    Some(persona)
}

/// Reactive persona that exists to exercise moderation.
fn disruptor(name: &str, goal: &str, trigger: &str, instructions: &str) -> Persona {
    Persona::new(name, AgentRole::Reactive, goal, instructions).with_trigger(trigger)
}

fn perspective(name: &str, goal: &str, instructions: &str, note: &str) -> Persona {
    Persona::new(name, AgentRole::Perspective, goal, instructions)
        .with_trigger("a plan, idea or decision is being discussed")
        .with_completion_note(note)
}

/// One agent in a roster, with optional per-agent policy overrides.
///
/// Fields left out of a roster file are taken from the built-in persona of
/// the same name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RosterEntry {
    /// Agent name.
    pub name: String,
    /// Role.
    #[serde(default)]
    pub role: Option<AgentRole>,
    /// Goal.
    #[serde(default)]
    pub goal: Option<String>,
    /// Trigger description.
    #[serde(default)]
    pub trigger: Option<String>,
    /// Generation instructions.
    #[serde(default)]
    pub instructions: Option<String>,
    /// Completion note.
    #[serde(default)]
    pub completion_note: Option<String>,
    /// Context window size override.
    #[serde(default)]
    pub window_size: Option<usize>,
    /// Self-exclusion override.
    #[serde(default)]
    pub exclude_own: Option<bool>,
    /// Minimum seconds between posts.
    #[serde(default)]
    pub rate_limit_secs: Option<u64>,
}

impl RosterEntry {
    /// Entry for a built-in persona with no overrides.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Resolves the entry into a full persona.
    pub fn persona(&self) -> Result<Persona> {
        let base = persona(&self.name);
        let pick = |field: &Option<String>, fallback: Option<&String>, what: &str| {
            field.clone().or_else(|| fallback.cloned()).ok_or_else(|| {
                AgentError::Roster(format!("agent '{}' has no {}", self.name, what))
            })
        };

        let role = self
            .role
            .or(base.as_ref().map(|p| p.role))
            .ok_or_else(|| AgentError::Roster(format!("agent '{}' has no role", self.name)))?;
        let goal = pick(&self.goal, base.as_ref().map(|p| &p.goal), "goal")?;
        let instructions = pick(
            &self.instructions,
            base.as_ref().map(|p| &p.instructions),
            "instructions",
        )?;

        Ok(Persona {
            name: self.name.clone(),
            role,
            goal,
            trigger: self
                .trigger
                .clone()
                .or_else(|| base.as_ref().and_then(|p| p.trigger.clone())),
            instructions,
            completion_note: self
                .completion_note
                .clone()
                .or_else(|| base.as_ref().and_then(|p| p.completion_note.clone())),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RosterFile {
    List(Vec<RosterEntry>),
    Wrapped { agents: Vec<RosterEntry> },
}

/// An ordered list of agents.
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    /// Roster name (built-in name or file stem).
    pub name: String,
    /// Entries in evaluation order.
    pub entries: Vec<RosterEntry>,
}

impl Roster {
    /// A built-in roster: `content`, `brain` or `moderation`.
    pub fn builtin(name: &str) -> Result<Self> {
        let names = match name {
            "content" => CONTENT_ROSTER,
            "brain" => BRAIN_ROSTER,
            "moderation" => MODERATION_ROSTER,
            other => {
                return Err(AgentError::Roster(format!(
                    "unknown roster '{}' (expected one of: {})",
                    other,
                    BUILTIN_ROSTERS.join(", ")
                )))
            }
        };
        Ok(Self {
            name: name.to_string(),
            entries: names.iter().map(|n| RosterEntry::named(*n)).collect(),
        })
    }

    /// Parses a roster from YAML: either a list of entries or `agents: [...]`.
    pub fn from_yaml(name: impl Into<String>, yaml: &str) -> Result<Self> {
        let entries = match serde_yaml::from_str::<RosterFile>(yaml)? {
            RosterFile::List(entries) => entries,
            RosterFile::Wrapped { agents } => agents,
        };
        let roster = Self {
            name: name.into(),
            entries,
        };
        roster.validate()?;
        Ok(roster)
    }

    /// Loads a roster file.
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "custom".to_string());
        debug!(path = %path.display(), "loading roster file");
        Self::from_yaml(name, &yaml)
    }

    /// Resolves a built-in roster name or a path to a roster file.
    pub fn resolve(name_or_path: &str) -> Result<Self> {
        if BUILTIN_ROSTERS.contains(&name_or_path) {
            Self::builtin(name_or_path)
        } else {
            Self::load(Path::new(name_or_path))
        }
    }

    /// Resolved personas in roster order.
    pub fn personas(&self) -> Result<Vec<Persona>> {
        self.entries.iter().map(RosterEntry::persona).collect()
    }

    /// Checks the roster is non-empty, names are unique and every entry resolves.
    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(AgentError::Roster(format!("roster '{}' is empty", self.name)));
        }
        let mut seen = std::collections::HashSet::new();
        for entry in &self.entries {
            if entry.name.trim().is_empty() {
                return Err(AgentError::Roster("agent with empty name".into()));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(AgentError::Roster(format!("duplicate agent '{}'", entry.name)));
            }
            entry.persona()?;
        }
        Ok(())
    }
}
