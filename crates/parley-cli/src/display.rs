//! Terminal rendering of blackboard messages.

use std::collections::HashMap;

use chrono::Local;
use crossterm::style::{Color, Stylize};
use crossterm::tty::IsTty;
use parley_board::{Message, Sender};

/// Colours handed out to agents in roster order.
const AGENT_COLORS: [Color; 5] = [
    Color::Cyan,
    Color::Magenta,
    Color::Blue,
    Color::Red,
    Color::DarkCyan,
];

/// Sender colours for one session.
///
/// Agents are coloured by roster position, so a roster always renders the
/// same way. Colour is off when stdout is not a terminal; crossterm also
/// drops colours when `NO_COLOR` is set.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    agents: HashMap<String, Color>,
    enabled: bool,
}

impl Palette {
    /// Palette for the given agents, enabled only on a terminal.
    pub fn for_terminal<S: AsRef<str>>(agents: impl IntoIterator<Item = S>) -> Self {
        Self::colored(agents).with_enabled(std::io::stdout().is_tty())
    }

    /// Palette for the given agents with colour on.
    pub fn colored<S: AsRef<str>>(agents: impl IntoIterator<Item = S>) -> Self {
        let agents = agents
            .into_iter()
            .zip(AGENT_COLORS.iter().cycle())
            .map(|(name, color)| (name.as_ref().to_string(), *color))
            .collect();
        Self { agents, enabled: true }
    }

    /// Palette that never colours.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Turns colour on or off.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Colour used for a sender.
    pub fn color(&self, sender: &Sender) -> Color {
        match sender {
            Sender::User => Color::Green,
            Sender::System => Color::Yellow,
            Sender::Agent(name) => self.agents.get(name).copied().unwrap_or(Color::Grey),
        }
    }

    /// Formats a message as `[HH:MM:SS] sender: text` in local time.
    pub fn format_message(&self, message: &Message) -> String {
        let time = format!("[{}]", message.timestamp().with_timezone(&Local).format("%H:%M:%S"));
        if !self.enabled {
            return format!("{} {}: {}", time, message.sender(), message.text());
        }
        let sender = message.sender().to_string().with(self.color(message.sender())).bold();
        format!("{} {}: {}", time.dim(), sender, message.text())
    }
}

/// Formats the roster listing shown by `/agents`.
pub fn format_agents<R: std::fmt::Display>(agents: &[(String, R)]) -> String {
    agents
        .iter()
        .enumerate()
        .map(|(i, (name, role))| format!("  {}. {} ({})", i + 1, name, role))
        .collect::<Vec<_>>()
        .join("\n")
}
