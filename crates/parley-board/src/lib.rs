//! Append-only blackboard and per-agent routing for Parley.
//!
//! This crate provides:
//! - [`Blackboard`]: the single ordered, append-only message log shared by
//!   every agent and the user
//! - [`Router`]: per-agent context windows and processed cursors
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use parley_board::{Blackboard, ContextPolicy, Router, Sender};
//!
//! let board = Arc::new(Blackboard::new());
//! let router = Router::new(Arc::clone(&board));
//! router.register("writer");
//!
//! board.append(Sender::User, "Write a draft about otters").unwrap();
//! assert!(router.has_unprocessed("writer"));
//!
//! let window = router.build_context("writer", &ContextPolicy::new(1));
//! assert_eq!(window.messages.len(), 1);
//!
//! router.mark_processed("writer", window.as_of);
//! assert!(!router.has_unprocessed("writer"));
//! ```

pub mod blackboard;
pub mod error;
pub mod message;
pub mod router;

pub use blackboard::Blackboard;
pub use error::{BoardError, Result};
pub use message::{Message, MessageId, Sender};
pub use router::{ContextPolicy, ContextWindow, Router};
