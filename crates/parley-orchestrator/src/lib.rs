//! Parley Orchestrator - scheduling rounds over a shared blackboard.
//!
//! This crate provides:
//! - [`Scheduler`]: evaluates agents against the router's view, applies
//!   moderation, appends accepted output, and runs the dispatch loop
//! - [`Orchestrator`]: lifecycle (`start`/`shutdown`), ingress and egress
//! - [`build_slots`]: roster assembly from [`parley_core::Settings`]
//!
//! # Example
//!
//! ```ignore
//! use parley_orchestrator::Orchestrator;
//!
//! let mut orchestrator = Orchestrator::from_settings(&settings, &roster, reasoner)?;
//! orchestrator.start().await?;
//! orchestrator.post_user("Write a draft about tides")?;
//! for message in orchestrator.since(0) {
//!     println!("{}", message);
//! }
//! orchestrator.shutdown().await?;
//! ```

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod roster;
pub mod scheduler;

pub use config::{AgentPolicy, SchedulerConfig};
pub use error::{OrchestratorError, Result};
pub use orchestrator::Orchestrator;
pub use roster::build_slots;
pub use scheduler::{AgentReport, AgentSlot, RoundOutcome, RoundReport, Scheduler};
