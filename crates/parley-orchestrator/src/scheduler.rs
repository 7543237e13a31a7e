//! Scheduler - round evaluation and the dispatch loop.
//!
//! A round:
//! 1. snapshots a context for every agent with unprocessed messages, in
//!    roster order
//! 2. runs the eligible agents' decide calls concurrently, each under its
//!    own timeout, holding no blackboard or router lock
//! 3. applies the results in roster order: moderation, append, the agent's
//!    commit hook, optional completion note
//! 4. advances each evaluated agent's cursor to the id its snapshot was
//!    taken at, whatever the outcome
//!
//! Rounds never overlap. Messages appended while a round is in flight are
//! picked up by the next round.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use parley_agent::{looks_complete, Agent, AgentContext, AgentError, Decision, Moderator, SuppressReason, Verdict};
use parley_board::{MessageId, Router, Sender};
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::config::{AgentPolicy, SchedulerConfig};
use crate::error::{OrchestratorError, Result};

/// An agent together with its scheduling policy.
#[derive(Clone)]
pub struct AgentSlot {
    agent: Arc<dyn Agent>,
    policy: AgentPolicy,
}

impl AgentSlot {
    /// Creates a slot.
    pub fn new(agent: Arc<dyn Agent>, policy: AgentPolicy) -> Self {
        Self { agent, policy }
    }

    /// Agent name.
    pub fn name(&self) -> &str {
        self.agent.name()
    }

    /// The agent.
    pub fn agent(&self) -> &Arc<dyn Agent> {
        &self.agent
    }

    /// The agent's policy.
    pub fn policy(&self) -> &AgentPolicy {
        &self.policy
    }
}

impl fmt::Debug for AgentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentSlot")
            .field("name", &self.name())
            .field("role", &self.agent.role())
            .field("policy", &self.policy)
            .finish()
    }
}

/// What happened to one agent in one round.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    /// Output accepted and appended.
    Acted {
        /// Id of the appended output.
        message_id: MessageId,
        /// Id of the completion note, if one was posted.
        note_id: Option<MessageId>,
    },
    /// The agent chose not to act.
    Abstained,
    /// The agent acted but moderation dropped the output.
    Suppressed(SuppressReason),
    /// The decide call failed or timed out; treated as abstaining.
    Failed {
        /// Error kind (`timeout`, `service_error`, `malformed_decision`, ...).
        kind: &'static str,
        /// Error message.
        error: String,
    },
    /// Only messages the agent may not see were new; no call was made.
    Skipped,
}

/// One agent's line in a round report.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReport {
    /// Agent name.
    pub agent: String,
    /// Blackboard tail the agent was evaluated against.
    pub as_of: MessageId,
    /// Outcome.
    pub outcome: RoundOutcome,
}

/// Result of one scheduling round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundReport {
    /// Round number, starting at 1.
    pub round: u64,
    /// Outcomes of every agent considered, in roster order.
    pub agents: Vec<AgentReport>,
}

impl RoundReport {
    /// True if no agent had anything to consider.
    pub fn is_idle(&self) -> bool {
        self.agents.is_empty()
    }

    /// Outcome for a named agent.
    pub fn outcome(&self, agent: &str) -> Option<&RoundOutcome> {
        self.agents.iter().find(|r| r.agent == agent).map(|r| &r.outcome)
    }

    /// Ids of everything appended in this round, in append order.
    pub fn posted(&self) -> Vec<MessageId> {
        self.agents
            .iter()
            .flat_map(|r| match r.outcome {
                RoundOutcome::Acted { message_id, note_id } => {
                    std::iter::once(message_id).chain(note_id).collect::<Vec<_>>()
                }
                _ => Vec::new(),
            })
            .collect()
    }
}

/// Drives agents against the blackboard.
pub struct Scheduler {
    router: Arc<Router>,
    slots: Vec<AgentSlot>,
    moderator: Moderator,
    config: SchedulerConfig,
    rounds: AtomicU64,
    round_lock: Mutex<()>,
}

impl Scheduler {
    /// Creates a scheduler and registers every agent with the router.
    ///
    /// # Errors
    ///
    /// `Configuration` if the roster is empty or names repeat.
    pub fn new(router: Arc<Router>, slots: Vec<AgentSlot>, config: SchedulerConfig) -> Result<Self> {
        if slots.is_empty() {
            return Err(OrchestratorError::Configuration("no agents configured".into()));
        }
        let mut seen = HashSet::new();
        for slot in &slots {
            if !seen.insert(slot.name().to_string()) {
                return Err(OrchestratorError::Configuration(format!(
                    "duplicate agent name '{}'",
                    slot.name()
                )));
            }
            router.register(slot.name());
        }

        info!(agents = slots.len(), "scheduler created");
        Ok(Self {
            router,
            slots,
            moderator: Moderator::with_config(config.moderation.clone()),
            config,
            rounds: AtomicU64::new(0),
            round_lock: Mutex::new(()),
        })
    }

    /// Agents in evaluation order.
    pub fn slots(&self) -> &[AgentSlot] {
        &self.slots
    }

    /// The router.
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Scheduler configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Number of rounds run so far.
    pub fn rounds(&self) -> u64 {
        self.rounds.load(Ordering::SeqCst)
    }

    /// True if any agent has messages past its cursor.
    pub fn has_work(&self) -> bool {
        self.slots.iter().any(|s| self.router.has_unprocessed(s.name()))
    }

    /// True if no round is running and no agent has pending work.
    pub fn is_idle(&self) -> bool {
        self.round_lock.try_lock().is_ok() && !self.has_work()
    }

    /// Runs one scheduling round.
    ///
    /// # Errors
    ///
    /// Only blackboard faults. Agent failures are reported as
    /// [`RoundOutcome::Failed`].
    pub async fn run_round(&self) -> Result<RoundReport> {
        let _guard = self.round_lock.lock().await;
        let round = self.rounds.fetch_add(1, Ordering::SeqCst) + 1;

        let mut agents = Vec::new();
        let mut eligible = Vec::new();

        for slot in &self.slots {
            let name = slot.name();
            if !self.router.has_unprocessed(name) {
                continue;
            }

            let window = self.router.build_context(name, &slot.policy.context);
            if window.fresh.is_empty() {
                trace!(agent = %name, as_of = window.as_of, "nothing visible is new");
                self.router.mark_processed(name, window.as_of);
                agents.push(AgentReport {
                    agent: name.to_string(),
                    as_of: window.as_of,
                    outcome: RoundOutcome::Skipped,
                });
                continue;
            }

            eligible.push((slot, AgentContext::new(round, window)));
        }

        if eligible.is_empty() {
            if !agents.is_empty() {
                trace!(round, "round had nothing to evaluate");
            }
            return Ok(RoundReport { round, agents });
        }

        debug!(round, eligible = eligible.len(), "round started");

        let decisions = join_all(eligible.iter().map(|(slot, ctx)| {
            let limit = slot.policy.timeout.unwrap_or(self.config.call_timeout);
            async move {
                match timeout(limit, slot.agent.decide(ctx)).await {
                    Ok(result) => result,
                    Err(_) => Err(AgentError::Timeout(limit)),
                }
            }
        }))
        .await;

        for ((slot, ctx), decision) in eligible.iter().zip(decisions) {
            let name = slot.name();
            let as_of = ctx.window.as_of;
            let outcome = self.apply(slot, decision);
            self.router.mark_processed(name, as_of);
            agents.push(AgentReport {
                agent: name.to_string(),
                as_of,
                outcome: outcome?,
            });
        }

        // Restore roster order: skipped agents were pushed first.
        agents.sort_by_key(|r| self.position(&r.agent));

        let report = RoundReport { round, agents };
        debug!(round, posted = report.posted().len(), "round finished");
        Ok(report)
    }

    fn apply(&self, slot: &AgentSlot, decision: parley_agent::Result<Decision>) -> Result<RoundOutcome> {
        let name = slot.name();
        let text = match decision {
            Ok(Decision::Act(text)) => text,
            Ok(Decision::Abstain) => {
                trace!(agent = %name, "abstained");
                return Ok(RoundOutcome::Abstained);
            }
            Err(e) => {
                warn!(agent = %name, kind = e.kind(), error = %e, "decision failed, treating as abstain");
                return Ok(RoundOutcome::Failed {
                    kind: e.kind(),
                    error: e.to_string(),
                });
            }
        };

        if let Verdict::Suppress(reason) =
            self.moderator.admit(name, &text, slot.policy.rate_limit, Instant::now())
        {
            info!(agent = %name, reason = %reason, "output suppressed by moderation");
            return Ok(RoundOutcome::Suppressed(reason));
        }

        let message = self.router.board().append(Sender::agent(name), text)?;
        info!(agent = %name, message_id = message.id(), "agent posted");
        slot.agent.on_committed(&message);

        let mut note_id = None;
        if self.config.completion_notes && looks_complete(message.text()) {
            if let Some(note) = slot.agent.completion_note() {
                let note = self.router.board().append(Sender::agent(name), note)?;
                note_id = Some(note.id());
            }
        }

        Ok(RoundOutcome::Acted {
            message_id: message.id(),
            note_id,
        })
    }

    fn position(&self, agent: &str) -> usize {
        self.slots
            .iter()
            .position(|s| s.name() == agent)
            .unwrap_or(usize::MAX)
    }

    /// Runs rounds until `shutdown` turns true.
    ///
    /// Wakes on every blackboard append, with `poll_interval` as a fallback.
    /// A shutdown request lets the current round finish.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut tail = self.router.board().subscribe();
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!(
            poll_interval_ms = self.config.poll_interval.as_millis(),
            "starting dispatch loop"
        );

        loop {
            if *shutdown.borrow() {
                debug!("dispatch loop received shutdown signal");
                break;
            }

            if self.has_work() {
                let _ = tail.borrow_and_update();
                match self.run_round().await {
                    Ok(report) => trace!(round = report.round, agents = report.agents.len(), "round complete"),
                    Err(e) => {
                        error!(error = %e, "blackboard failure, stopping dispatch loop");
                        break;
                    }
                }
                continue;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("dispatch loop received shutdown signal");
                        break;
                    }
                }
                _ = tail.changed() => {}
                _ = ticker.tick() => {}
            }
        }

        debug!(rounds = self.rounds(), "dispatch loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parley_agent::{AgentRole, ModerationConfig};
    use parley_board::{Blackboard, Message};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// Agent that records what it was shown and replies from a fixed script.
    struct Scripted {
        name: String,
        replies: StdMutex<Vec<parley_agent::Result<Decision>>>,
        seen: StdMutex<Vec<Vec<MessageId>>>,
        committed: StdMutex<Vec<MessageId>>,
        note: Option<String>,
    }

    impl Scripted {
        fn new(name: &str, replies: Vec<parley_agent::Result<Decision>>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                replies: StdMutex::new(replies),
                seen: StdMutex::new(Vec::new()),
                committed: StdMutex::new(Vec::new()),
                note: None,
            })
        }

        fn seen(&self) -> Vec<Vec<MessageId>> {
            self.seen.lock().unwrap().clone()
        }

        fn committed(&self) -> Vec<MessageId> {
            self.committed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Agent for Scripted {
        fn name(&self) -> &str {
            &self.name
        }

        fn role(&self) -> AgentRole {
            AgentRole::Reactive
        }

        async fn decide(&self, ctx: &AgentContext) -> parley_agent::Result<Decision> {
            self.seen
                .lock()
                .unwrap()
                .push(ctx.window.messages.iter().map(|m| m.id()).collect());
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Ok(Decision::Abstain)
            } else {
                replies.remove(0)
            }
        }

        fn completion_note(&self) -> Option<&str> {
            self.note.as_deref()
        }

        fn on_committed(&self, message: &Message) {
            self.committed.lock().unwrap().push(message.id());
        }
    }

    fn scheduler(slots: Vec<AgentSlot>) -> (Arc<Blackboard>, Scheduler) {
        let board = Arc::new(Blackboard::new());
        let router = Arc::new(Router::new(Arc::clone(&board)));
        let scheduler = Scheduler::new(router, slots, SchedulerConfig::default()).unwrap();
        (board, scheduler)
    }

    fn slot(agent: Arc<Scripted>) -> AgentSlot {
        AgentSlot::new(agent, AgentPolicy::new(5))
    }

    #[test]
    fn test_rejects_empty_and_duplicate_rosters() {
        let board = Arc::new(Blackboard::new());
        let router = Arc::new(Router::new(board));
        assert!(matches!(
            Scheduler::new(Arc::clone(&router), vec![], SchedulerConfig::default()),
            Err(OrchestratorError::Configuration(_))
        ));

        let a = Scripted::new("a", vec![]);
        let result = Scheduler::new(router, vec![slot(a.clone()), slot(a)], SchedulerConfig::default());
        assert!(matches!(result, Err(OrchestratorError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_idle_round() {
        let (_board, scheduler) = scheduler(vec![slot(Scripted::new("a", vec![]))]);
        let report = scheduler.run_round().await.unwrap();
        assert!(report.is_idle());
        assert_eq!(report.round, 1);
        assert!(scheduler.is_idle());
    }

    #[tokio::test]
    async fn test_act_appends_and_advances_cursor() {
        let agent = Scripted::new("a", vec![Ok(Decision::Act("hello".into()))]);
        let (board, scheduler) = scheduler(vec![slot(agent.clone())]);
        board.append(Sender::User, "hi").unwrap();

        let report = scheduler.run_round().await.unwrap();
        assert_eq!(
            report.outcome("a"),
            Some(&RoundOutcome::Acted { message_id: 2, note_id: None })
        );
        assert_eq!(board.get(2).unwrap().text(), "hello");
        assert_eq!(scheduler.router().cursor("a"), 1);

        // Own post is new but invisible: skipped without a call.
        let report = scheduler.run_round().await.unwrap();
        assert_eq!(report.outcome("a"), Some(&RoundOutcome::Skipped));
        assert_eq!(agent.seen().len(), 1);
        assert!(!scheduler.has_work());
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let failing = Scripted::new("failing", vec![Err(AgentError::Service("down".into()))]);
        let healthy = Scripted::new("healthy", vec![Ok(Decision::Act("fine".into()))]);
        let (board, scheduler) = scheduler(vec![slot(failing), slot(healthy)]);
        board.append(Sender::User, "go").unwrap();

        let report = scheduler.run_round().await.unwrap();
        assert!(matches!(
            report.outcome("failing"),
            Some(RoundOutcome::Failed { kind: "service_error", .. })
        ));
        assert!(matches!(report.outcome("healthy"), Some(RoundOutcome::Acted { .. })));
        assert_eq!(scheduler.router().cursor("failing"), 1);
        assert_eq!(board.len(), 2);
    }

    #[tokio::test]
    async fn test_report_keeps_roster_order() {
        let first = Scripted::new("first", vec![Ok(Decision::Act("from first".into()))]);
        let second = Scripted::new("second", vec![]);
        let (board, scheduler) = scheduler(vec![slot(first), slot(second)]);
        board.append(Sender::User, "go").unwrap();
        scheduler.run_round().await.unwrap();

        // Round 2: "first" only sees its own post (skipped), "second" is evaluated.
        let report = scheduler.run_round().await.unwrap();
        let names: Vec<_> = report.agents.iter().map(|r| r.agent.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(report.outcome("first"), Some(&RoundOutcome::Skipped));
    }

    #[tokio::test]
    async fn test_completion_note() {
        let long = "word ".repeat(30);
        let agent = Arc::new(Scripted {
            name: "writer".into(),
            replies: StdMutex::new(vec![Ok(Decision::Act(long.clone())), Ok(Decision::Act("short".into()))]),
            seen: StdMutex::new(Vec::new()),
            committed: StdMutex::new(Vec::new()),
            note: Some("please edit this".into()),
        });
        let board = Arc::new(Blackboard::new());
        let router = Arc::new(Router::new(Arc::clone(&board)));
        let config = SchedulerConfig::default().with_completion_notes(true);
        let scheduler = Scheduler::new(router, vec![AgentSlot::new(agent.clone(), AgentPolicy::new(5))], config).unwrap();

        board.append(Sender::User, "write").unwrap();
        let report = scheduler.run_round().await.unwrap();
        assert_eq!(
            report.outcome("writer"),
            Some(&RoundOutcome::Acted { message_id: 2, note_id: Some(3) })
        );
        assert_eq!(report.posted(), vec![2, 3]);
        assert!(board.get(3).unwrap().is_from("writer"));
        // The note is not the agent's output.
        assert_eq!(agent.committed(), vec![2]);

        // Short output: no note.
        board.append(Sender::User, "again").unwrap();
        let report = scheduler.run_round().await.unwrap();
        assert!(matches!(
            report.outcome("writer"),
            Some(RoundOutcome::Acted { note_id: None, .. })
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_suppresses() {
        let agent = Scripted::new(
            "chatty",
            vec![Ok(Decision::Act("one".into())), Ok(Decision::Act("two".into()))],
        );
        let policy = AgentPolicy::new(5).with_rate_limit(Duration::from_secs(3600));
        let (board, scheduler) = scheduler(vec![AgentSlot::new(agent, policy)]);

        board.append(Sender::User, "a").unwrap();
        scheduler.run_round().await.unwrap();
        board.append(Sender::User, "b").unwrap();
        let report = scheduler.run_round().await.unwrap();

        assert!(matches!(
            report.outcome("chatty"),
            Some(RoundOutcome::Suppressed(SuppressReason::RateLimited { .. }))
        ));
        assert!(board.all().iter().all(|m| m.text() != "two"));
        assert_eq!(scheduler.router().cursor("chatty"), 3);
    }

    #[tokio::test]
    async fn test_commit_hook_skips_suppressed_output() {
        let agent = Scripted::new(
            "echo",
            vec![
                Ok(Decision::Act("same words".into())),
                Ok(Decision::Act("Same words!".into())),
                Ok(Decision::Act("new words".into())),
            ],
        );
        let (board, scheduler) = scheduler(vec![slot(Arc::clone(&agent))]);

        for prompt in ["a", "b", "c"] {
            board.append(Sender::User, prompt).unwrap();
            scheduler.run_round().await.unwrap();
        }

        let posted: Vec<_> = board.all().into_iter().filter(|m| m.is_from("echo")).map(|m| m.id()).collect();
        assert_eq!(posted.len(), 2);
        assert_eq!(agent.committed(), posted);
    }

    #[tokio::test]
    async fn test_moderation_tuning_from_config() {
        let agent = Scripted::new(
            "echo",
            vec![Ok(Decision::Act("same words".into())), Ok(Decision::Act("same words".into()))],
        );
        let board = Arc::new(Blackboard::new());
        let router = Arc::new(Router::new(Arc::clone(&board)));
        let config = SchedulerConfig::default().with_moderation(ModerationConfig {
            history: 0,
            ..Default::default()
        });
        let scheduler = Scheduler::new(router, vec![slot(Arc::clone(&agent))], config).unwrap();

        for prompt in ["a", "b"] {
            board.append(Sender::User, prompt).unwrap();
            let report = scheduler.run_round().await.unwrap();
            assert!(matches!(report.outcome("echo"), Some(RoundOutcome::Acted { .. })));
        }
        assert_eq!(agent.committed().len(), 2);
    }

    #[tokio::test]
    async fn test_run_loop_stops_on_shutdown() {
        let agent = Scripted::new("a", vec![Ok(Decision::Act("reply".into()))]);
        let (board, scheduler) = scheduler(vec![slot(agent)]);
        let scheduler = Arc::new(scheduler);
        let (tx, rx) = watch::channel(false);

        let runner = Arc::clone(&scheduler);
        let handle = tokio::spawn(async move { runner.run(rx).await });

        board.append(Sender::User, "hello").unwrap();
        for _ in 0..100 {
            if board.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(board.get(2).unwrap().text(), "reply");

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
