//! Persona records and the prompts built from them.
//!
//! A persona is data: new voices are added by writing a catalog entry or a
//! roster file, never by adding a type.

use serde::{Deserialize, Serialize};

use crate::agent::AgentRole;

/// Phrases that mark a reply as a deflection rather than finished work.
const GENERIC_PHRASES: &[&str] = &[
    "please share",
    "please provide",
    "certainly!",
    "i'll help",
    "i will help",
    "send me",
    "give me",
];

/// Replies shorter than this are not considered substantive.
const MIN_SUBSTANTIVE_WORDS: usize = 20;

/// Configuration record for one voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    /// Agent name; also the sender name on the blackboard.
    pub name: String,
    /// Role in the conversation.
    pub role: AgentRole,
    /// One-line goal used in the trigger question.
    pub goal: String,
    /// When the persona should act, if narrower than its goal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    /// Generation instructions.
    pub instructions: String,
    /// Follow-up posted after a substantive reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_note: Option<String>,
}

impl Persona {
    /// Creates a persona with no trigger or completion note.
    pub fn new(
        name: impl Into<String>,
        role: AgentRole,
        goal: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role,
            goal: goal.into(),
            trigger: None,
            instructions: instructions.into(),
            completion_note: None,
        }
    }

    /// Set the trigger description.
    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }

    /// Set the completion note.
    pub fn with_completion_note(mut self, note: impl Into<String>) -> Self {
        self.completion_note = Some(note.into());
        self
    }

    /// Prompt asking whether the persona should act on `context`.
    ///
    /// The answer must begin with `YES` or `NO`.
    pub fn decision_prompt(&self, context: &str) -> String {
        let trigger = self
            .trigger
            .as_deref()
            .map(|t| format!("You usually act when: {}\n", t))
            .unwrap_or_default();

        format!(
            "You are an agent with the following goal: {goal}\n\
             Your agent name is: {name}\n\
             {trigger}\n\
             Recent messages from the blackboard:\n\
             {context}\n\n\
             DECISION RULES:\n\
             1. Check whether any message mentions your agent name ({name}).\n\
             2. If you are mentioned directly, follow what is being asked of you.\n\
             3. If someone tells you not to act, reply, or to stop, answer NO.\n\
             4. If you are asked to do something, consider acting based on your goal.\n\
             5. Otherwise, decide based on whether the messages align with your goal.\n\n\
             Question: Should you act on these messages?\n\
             Answer starting with YES or NO, followed by a brief reason.",
            goal = self.goal,
            name = self.name,
            trigger = trigger,
            context = context,
        )
    }

    /// Prompt asking the persona to produce its contribution.
    pub fn generation_prompt(&self, context: &str, word_limit: usize) -> String {
        format!(
            "{instructions}\n\n\
             IMPORTANT: Keep your response under {word_limit} words.\n\n\
             Context from blackboard:\n\
             {context}\n\n\
             Your response:",
            instructions = self.instructions,
            word_limit = word_limit,
            context = context,
        )
    }
}

/// Parses a trigger answer. `None` when it starts with neither YES nor NO.
pub fn parse_verdict(answer: &str) -> Option<bool> {
    let answer = answer.trim_start().to_ascii_uppercase();
    if answer.starts_with("YES") {
        Some(true)
    } else if answer.starts_with("NO") {
        Some(false)
    } else {
        None
    }
}

/// True if `text` reads like finished work rather than a request for input.
pub fn looks_complete(text: &str) -> bool {
    let lower = text.to_lowercase();
    if GENERIC_PHRASES.iter().any(|p| lower.contains(p)) {
        return false;
    }
    text.split_whitespace().count() >= MIN_SUBSTANTIVE_WORDS
}
