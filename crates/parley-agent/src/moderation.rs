//! Moderation filter applied between a decision and the blackboard append.
//!
//! State is per agent: when it last posted and fingerprints of its recent
//! posts. A suppressed output never reaches the blackboard and leaves the
//! state untouched.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::debug;

/// Moderation tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationConfig {
    /// Recent posts remembered per agent. Zero disables duplicate checks.
    pub history: usize,
    /// Jaccard word similarity at or above which a post is a near-duplicate.
    pub similarity_threshold: f64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            history: 5,
            similarity_threshold: 0.9,
        }
    }
}

/// Why an output was suppressed.
#[derive(Debug, Clone, PartialEq)]
pub enum SuppressReason {
    /// Posted again before the agent's minimum interval elapsed.
    RateLimited {
        /// Time left until the agent may post.
        retry_in: Duration,
    },
    /// Same or nearly the same as one of the agent's recent posts.
    Duplicate,
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited { retry_in } => write!(f, "rate limited (retry in {:?})", retry_in),
            Self::Duplicate => write!(f, "duplicate of a recent post"),
        }
    }
}

/// Moderation outcome for one candidate output.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Post it.
    Allow,
    /// Drop it.
    Suppress(SuppressReason),
}

impl Verdict {
    /// Returns true for [`Verdict::Allow`].
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

#[derive(Debug, Clone)]
struct Fingerprint {
    normalized: String,
    words: HashSet<String>,
}

impl Fingerprint {
    fn of(text: &str) -> Self {
        let mut normalized = normalize(text);
        let words: HashSet<String> = normalized
            .split(' ')
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        if words.is_empty() {
            // Punctuation-only text is compared by its symbols.
            normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        }
        Self { normalized, words }
    }

    fn similarity(&self, other: &Fingerprint) -> f64 {
        if self.words.is_empty() || other.words.is_empty() {
            return if self.normalized == other.normalized { 1.0 } else { 0.0 };
        }
        let shared = self.words.intersection(&other.words).count();
        let total = self.words.union(&other.words).count();
        shared as f64 / total as f64
    }
}

#[derive(Debug, Default)]
struct AgentRecord {
    last_post: Option<Instant>,
    recent: VecDeque<Fingerprint>,
}

/// Stateful per-agent moderation.
#[derive(Debug, Default)]
pub struct Moderator {
    config: ModerationConfig,
    records: Mutex<HashMap<String, AgentRecord>>,
}

impl Moderator {
    /// Creates a moderator with default tuning.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a moderator with the given tuning.
    pub fn with_config(config: ModerationConfig) -> Self {
        Self {
            config,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Checks a candidate and, if allowed, records it as posted at `now`.
    ///
    /// Check and record happen under one lock, so two outputs from the same
    /// agent cannot both pass a rate limit.
    pub fn admit(&self, agent: &str, text: &str, min_interval: Option<Duration>, now: Instant) -> Verdict {
        let fingerprint = Fingerprint::of(text);
        let mut records = self.lock_records();
        let record = records.entry(agent.to_string()).or_default();

        let verdict = self.judge(record, &fingerprint, min_interval, now);
        match &verdict {
            Verdict::Allow => {
                record.last_post = Some(now);
                record.recent.push_back(fingerprint);
                while record.recent.len() > self.config.history {
                    record.recent.pop_front();
                }
            }
            Verdict::Suppress(reason) => {
                debug!(agent = %agent, reason = %reason, "output suppressed");
            }
        }
        verdict
    }

    fn judge(
        &self,
        record: &AgentRecord,
        fingerprint: &Fingerprint,
        min_interval: Option<Duration>,
        now: Instant,
    ) -> Verdict {
        if let (Some(interval), Some(last)) = (min_interval, record.last_post) {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < interval {
                return Verdict::Suppress(SuppressReason::RateLimited {
                    retry_in: interval - elapsed,
                });
            }
        }

        let duplicate = record.recent.iter().any(|seen| {
            seen.normalized == fingerprint.normalized
                || seen.similarity(fingerprint) >= self.config.similarity_threshold
        });
        if duplicate {
            return Verdict::Suppress(SuppressReason::Duplicate);
        }

        Verdict::Allow
    }

    fn lock_records(&self) -> std::sync::MutexGuard<'_, HashMap<String, AgentRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Lowercases, strips punctuation and collapses whitespace.
fn normalize(text: &str) -> String {
    static PUNCTUATION: OnceLock<Regex> = OnceLock::new();
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();

    let punctuation = PUNCTUATION.get_or_init(|| Regex::new(r"[^\w\s]").expect("valid pattern"));
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid pattern"));

    let lower = text.to_lowercase();
    let stripped = punctuation.replace_all(&lower, "");
    whitespace.replace_all(stripped.trim(), " ").into_owned()
}
