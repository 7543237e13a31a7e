//! Blackboard - the single ordered, append-only message log.
//!
//! Concurrency layout:
//! - `RwLock<Vec<Arc<Message>>>` holds the log. `append` is the only writer;
//!   readers clone `Arc`s out of the lock and work on that snapshot.
//! - `watch::Sender<MessageId>` publishes the tail id. It is updated while
//!   the write lock is held, so subscribers observe tail ids in append order.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;
use tracing::trace;

use crate::error::{BoardError, Result};
use crate::message::{Message, MessageId, Sender};

/// Shared, append-only message log.
///
/// Ids start at 1 and are strictly increasing with no gaps. Id assignment
/// happens under the write lock, which makes it the single point of total
/// ordering for every author.
///
/// # Example
///
/// ```
/// use parley_board::{Blackboard, Sender};
///
/// let board = Blackboard::new();
/// board.append(Sender::User, "hello").unwrap();
/// board.append(Sender::agent("joker"), "hi!").unwrap();
///
/// let recent = board.recent(1);
/// assert_eq!(recent[0].text(), "hi!");
/// assert_eq!(board.since(1).len(), 1);
/// ```
pub struct Blackboard {
    /// Messages in id order; `messages[i].id() == i + 1`.
    messages: RwLock<Vec<Arc<Message>>>,
    /// Tail id broadcast.
    tail: watch::Sender<MessageId>,
}

impl Default for Blackboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Blackboard {
    /// Creates an empty blackboard.
    pub fn new() -> Self {
        let (tail, _) = watch::channel(0);
        Self {
            messages: RwLock::new(Vec::new()),
            tail,
        }
    }

    /// Appends a message, assigning the next id and the current time.
    ///
    /// # Errors
    ///
    /// `BoardError::LockPoisoned` if a previous writer panicked. This is the
    /// only failure mode and is treated as fatal by callers.
    pub fn append(&self, sender: impl Into<Sender>, text: impl Into<String>) -> Result<Arc<Message>> {
        let mut messages = self
            .messages
            .write()
            .map_err(|e| BoardError::LockPoisoned(e.to_string()))?;

        let id = messages.len() as MessageId + 1;
        let message = Arc::new(Message::new(id, sender.into(), text.into()));
        messages.push(Arc::clone(&message));
        self.tail.send_replace(id);

        trace!(message_id = id, sender = %message.sender(), "message appended");
        Ok(message)
    }

    /// Returns the last `n` messages in id order.
    ///
    /// Returns everything when fewer than `n` exist, and nothing for `n == 0`.
    pub fn recent(&self, n: usize) -> Vec<Arc<Message>> {
        self.view(|messages| {
            let start = messages.len().saturating_sub(n);
            messages[start..].to_vec()
        })
    }

    /// Returns all messages with an id strictly greater than `id`.
    ///
    /// Non-destructive: repeated calls with the same id return the same
    /// prefix plus anything appended since.
    pub fn since(&self, id: MessageId) -> Vec<Arc<Message>> {
        self.view(|messages| {
            let start = usize::try_from(id).unwrap_or(usize::MAX).min(messages.len());
            messages[start..].to_vec()
        })
    }

    /// Gets a message by id.
    pub fn get(&self, id: MessageId) -> Option<Arc<Message>> {
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.view(|messages| messages.get(index).cloned())
    }

    /// Returns a snapshot of the whole log.
    pub fn all(&self) -> Vec<Arc<Message>> {
        self.view(|messages| messages.to_vec())
    }

    /// Id of the newest message, or 0 when empty.
    pub fn tail_id(&self) -> MessageId {
        *self.tail.borrow()
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.view(|messages| messages.len())
    }

    /// Returns true if nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribes to tail-id changes.
    ///
    /// The receiver wakes on every append; use it to avoid polling.
    pub fn subscribe(&self) -> watch::Receiver<MessageId> {
        self.tail.subscribe()
    }

    /// Runs `f` against a consistent view of the log.
    ///
    /// Messages are never mutated after push, so a poisoned lock still holds
    /// a valid prefix and reads recover it rather than failing.
    pub(crate) fn view<R>(&self, f: impl FnOnce(&[Arc<Message>]) -> R) -> R {
        let messages = self.messages.read().unwrap_or_else(PoisonError::into_inner);
        f(&messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_append_assigns_sequential_ids() {
        let board = Blackboard::new();
        let m1 = board.append(Sender::User, "one").unwrap();
        let m2 = board.append(Sender::agent("writer"), "two").unwrap();

        assert_eq!(m1.id(), 1);
        assert_eq!(m2.id(), 2);
        assert_eq!(board.tail_id(), 2);
        assert_eq!(board.len(), 2);
    }

    #[test]
    fn test_empty_board() {
        let board = Blackboard::new();
        assert!(board.is_empty());
        assert_eq!(board.tail_id(), 0);
        assert!(board.recent(5).is_empty());
        assert!(board.since(0).is_empty());
        assert!(board.get(1).is_none());
    }

    #[test]
    fn test_recent() {
        let board = Blackboard::new();
        for i in 1..=5 {
            board.append(Sender::User, format!("m{}", i)).unwrap();
        }

        let last_two: Vec<_> = board.recent(2).iter().map(|m| m.id()).collect();
        assert_eq!(last_two, vec![4, 5]);

        assert_eq!(board.recent(50).len(), 5);
        assert!(board.recent(0).is_empty());
    }

    #[test]
    fn test_since() {
        let board = Blackboard::new();
        for i in 1..=4 {
            board.append(Sender::User, format!("m{}", i)).unwrap();
        }

        let ids: Vec<_> = board.since(2).iter().map(|m| m.id()).collect();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(board.since(0).len(), 4);
        assert!(board.since(4).is_empty());
        assert!(board.since(99).is_empty());

        // Non-destructive
        assert_eq!(board.since(2).len(), 2);
    }

    #[test]
    fn test_get() {
        let board = Blackboard::new();
        board.append(Sender::User, "first").unwrap();
        board.append(Sender::System, "second").unwrap();

        assert_eq!(board.get(2).unwrap().text(), "second");
        assert!(board.get(0).is_none());
        assert!(board.get(3).is_none());
    }

    #[tokio::test]
    async fn test_subscribe_sees_tail() {
        let board = Blackboard::new();
        let mut rx = board.subscribe();

        board.append(Sender::User, "wake up").unwrap();

        tokio::time::timeout(Duration::from_secs(1), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);
    }

    #[test]
    fn test_concurrent_appends_are_gapless() {
        let board = Arc::new(Blackboard::new());
        let mut handles = vec![];

        for t in 0..8 {
            let b = Arc::clone(&board);
            handles.push(thread::spawn(move || {
                (0..25)
                    .map(|i| b.append(Sender::agent(format!("a{}", t)), format!("{}", i)).unwrap().id())
                    .collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {}", id);
            }
        }

        assert_eq!(seen.len(), 200);
        let ids: Vec<_> = board.all().iter().map(|m| m.id()).collect();
        assert_eq!(ids, (1..=200).collect::<Vec<_>>());
    }

    #[test]
    fn test_per_writer_order_preserved() {
        let board = Arc::new(Blackboard::new());
        let writers: Vec<_> = (0..4)
            .map(|t| {
                let b = Arc::clone(&board);
                thread::spawn(move || {
                    for i in 0..20 {
                        b.append(Sender::agent(format!("w{}", t)), i.to_string()).unwrap();
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }

        for t in 0..4 {
            let name = format!("w{}", t);
            let texts: Vec<usize> = board
                .all()
                .iter()
                .filter(|m| m.is_from(&name))
                .map(|m| m.text().parse().unwrap())
                .collect();
            assert_eq!(texts, (0..20).collect::<Vec<_>>());
        }
    }
}
