//! Orchestrator - owns the blackboard and the dispatch loop task.

use std::sync::Arc;
use std::time::Duration;

use parley_agent::{AgentRole, Reasoner, Roster};
use parley_board::{Blackboard, Message, MessageId, Router, Sender};
use parley_core::Settings;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::SchedulerConfig;
use crate::error::{OrchestratorError, Result};
use crate::roster::build_slots;
use crate::scheduler::{AgentSlot, Scheduler};

/// Entry point for running a set of agents against one blackboard.
///
/// Ingress is [`Orchestrator::post_user`]; egress is
/// [`Orchestrator::since`]. Between [`start`](Self::start) and
/// [`shutdown`](Self::shutdown) a background task runs scheduling rounds
/// whenever the blackboard grows.
pub struct Orchestrator {
    /// Shared message log.
    board: Arc<Blackboard>,
    /// Round evaluation.
    scheduler: Arc<Scheduler>,
    /// Handle to the dispatch loop task.
    loop_handle: Option<JoinHandle<()>>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver (cloned into the loop).
    shutdown_rx: watch::Receiver<bool>,
    /// Whether the dispatch loop has been started.
    started: bool,
}

impl Orchestrator {
    /// Creates an orchestrator over a fresh blackboard.
    pub fn new(slots: Vec<AgentSlot>, config: SchedulerConfig) -> Result<Self> {
        Self::with_board(Arc::new(Blackboard::new()), slots, config)
    }

    /// Creates an orchestrator over an existing blackboard.
    pub fn with_board(board: Arc<Blackboard>, slots: Vec<AgentSlot>, config: SchedulerConfig) -> Result<Self> {
        let router = Arc::new(Router::new(Arc::clone(&board)));
        let scheduler = Scheduler::new(router, slots, config)?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            board,
            scheduler: Arc::new(scheduler),
            loop_handle: None,
            shutdown_tx,
            shutdown_rx,
            started: false,
        })
    }

    /// Assembles the roster from settings and creates the orchestrator.
    pub fn from_settings(settings: &Settings, roster: &Roster, reasoner: Arc<dyn Reasoner>) -> Result<Self> {
        let slots = build_slots(roster, settings, reasoner)?;
        info!(roster = %roster.name, agents = slots.len(), "roster assembled");
        Self::new(slots, SchedulerConfig::from_settings(settings))
    }

    /// Start the dispatch loop.
    pub async fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(OrchestratorError::AlreadyStarted);
        }

        info!("starting orchestrator");

        let scheduler = Arc::clone(&self.scheduler);
        let shutdown_rx = self.shutdown_rx.clone();
        let handle = tokio::spawn(async move {
            scheduler.run(shutdown_rx).await;
        });

        self.loop_handle = Some(handle);
        self.started = true;

        debug!("orchestrator started");
        Ok(())
    }

    /// Stop the dispatch loop gracefully.
    ///
    /// No new round starts after this is called; a round already running
    /// finishes, bounded by the per-call timeouts.
    pub async fn shutdown(&mut self) -> Result<()> {
        if !self.started {
            return Err(OrchestratorError::NotStarted);
        }

        info!("shutting down orchestrator");

        self.shutdown_tx.send(true).map_err(|e| {
            OrchestratorError::Shutdown(format!("failed to send shutdown signal: {}", e))
        })?;

        if let Some(handle) = self.loop_handle.take() {
            debug!("waiting for dispatch loop to stop");
            handle
                .await
                .map_err(|e| OrchestratorError::Shutdown(format!("dispatch loop panicked: {}", e)))?;
        }

        self.started = false;
        info!(rounds = self.scheduler.rounds(), "orchestrator stopped");
        Ok(())
    }

    /// Appends a user message. This is the only ingress for new work.
    pub fn post_user(&self, text: impl Into<String>) -> Result<Arc<Message>> {
        Ok(self.board.append(Sender::User, text)?)
    }

    /// Messages with id greater than `id`, for display.
    pub fn since(&self, id: MessageId) -> Vec<Arc<Message>> {
        self.board.since(id)
    }

    /// Waits until no round is running and no agent has pending work.
    ///
    /// Returns false if that did not happen within `limit`.
    pub async fn settle(&self, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            if self.scheduler.is_idle() {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Agent names and roles in evaluation order.
    pub fn agents(&self) -> Vec<(String, AgentRole)> {
        self.scheduler
            .slots()
            .iter()
            .map(|s| (s.name().to_string(), s.agent().role()))
            .collect()
    }

    /// The blackboard.
    pub fn board(&self) -> &Arc<Blackboard> {
        &self.board
    }

    /// The scheduler.
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Check if the dispatch loop is running.
    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if self.started {
            let _ = self.shutdown_tx.send(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_agent::testing::{Reply, ScriptedReasoner};

    fn orchestrator(reasoner: Arc<ScriptedReasoner>) -> Orchestrator {
        let settings = Settings::from_lookup(|_| None).unwrap();
        Orchestrator::from_settings(&settings, &Roster::builtin("content").unwrap(), reasoner).unwrap()
    }

    #[tokio::test]
    async fn test_start_stop() {
        let mut orchestrator = orchestrator(Arc::new(ScriptedReasoner::new()));
        assert!(!orchestrator.is_started());

        orchestrator.start().await.unwrap();
        assert!(orchestrator.is_started());

        orchestrator.shutdown().await.unwrap();
        assert!(!orchestrator.is_started());
    }

    #[tokio::test]
    async fn test_double_start() {
        let mut orchestrator = orchestrator(Arc::new(ScriptedReasoner::new()));
        orchestrator.start().await.unwrap();

        let result = orchestrator.start().await;
        assert!(matches!(result, Err(OrchestratorError::AlreadyStarted)));

        orchestrator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_before_start() {
        let mut orchestrator = orchestrator(Arc::new(ScriptedReasoner::new()));
        let result = orchestrator.shutdown().await;
        assert!(matches!(result, Err(OrchestratorError::NotStarted)));
    }

    #[tokio::test]
    async fn test_post_and_drain() {
        let reasoner = Arc::new(ScriptedReasoner::new().script("writer", Reply::act("A short draft.")));
        let mut orchestrator = orchestrator(reasoner);
        orchestrator.start().await.unwrap();

        let posted = orchestrator.post_user("Write a draft about tides").unwrap();
        assert_eq!(posted.id(), 1);
        assert!(orchestrator.settle(Duration::from_secs(2)).await);

        let new = orchestrator.since(1);
        assert_eq!(new.len(), 1);
        assert!(new[0].is_from("writer"));
        assert_eq!(new[0].text(), "A short draft.");
        // Draining is non-destructive.
        assert_eq!(orchestrator.since(1).len(), 1);

        orchestrator.shutdown().await.unwrap();
    }

    #[test]
    fn test_agents_listing() {
        let orchestrator = orchestrator(Arc::new(ScriptedReasoner::new()));
        let agents = orchestrator.agents();
        assert_eq!(agents.len(), 3);
        assert_eq!(agents[0], ("writer".to_string(), AgentRole::Reactive));
    }
}
