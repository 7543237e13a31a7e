//! Scheduler and per-agent policy configuration.

use std::time::Duration;

use parley_agent::ModerationConfig;
use parley_board::ContextPolicy;
use parley_core::Settings;

/// Configuration for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Fallback wake-up interval when no append notification arrives.
    pub poll_interval: Duration,
    /// Default timeout for one agent's decide call.
    pub call_timeout: Duration,
    /// Post persona completion notes after substantive output.
    pub completion_notes: bool,
    /// Duplicate-detection tuning for the moderator.
    pub moderation: ModerationConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            call_timeout: Duration::from_secs(60),
            completion_notes: false,
            moderation: ModerationConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the scheduler config from process settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::default()
            .with_call_timeout(settings.reasoning_timeout)
            .with_completion_notes(settings.completion_notes)
            .with_moderation(ModerationConfig {
                history: settings.moderation_history,
                similarity_threshold: settings.moderation_similarity,
            })
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the default call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Enables or disables completion notes.
    pub fn with_completion_notes(mut self, enabled: bool) -> Self {
        self.completion_notes = enabled;
        self
    }

    /// Sets the moderation tuning.
    pub fn with_moderation(mut self, moderation: ModerationConfig) -> Self {
        self.moderation = moderation;
        self
    }
}

/// Per-agent scheduling policy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentPolicy {
    /// Window size and self-exclusion.
    pub context: ContextPolicy,
    /// Decide-call timeout; falls back to [`SchedulerConfig::call_timeout`].
    pub timeout: Option<Duration>,
    /// Minimum interval between accepted posts.
    pub rate_limit: Option<Duration>,
}

impl AgentPolicy {
    /// Creates a policy with the given window size.
    pub fn new(window_size: usize) -> Self {
        Self {
            context: ContextPolicy::new(window_size),
            ..Default::default()
        }
    }

    /// Sets the window size.
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.context = self.context.with_window_size(window_size);
        self
    }

    /// Sets whether the agent's own messages are excluded from its window.
    pub fn with_exclude_own(mut self, exclude_own: bool) -> Self {
        self.context = self.context.with_exclude_own(exclude_own);
        self
    }

    /// Sets the decide-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the rate limit. A zero interval disables it.
    pub fn with_rate_limit(mut self, interval: Duration) -> Self {
        self.rate_limit = (!interval.is_zero()).then_some(interval);
        self
    }
}
