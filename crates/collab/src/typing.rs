//! Typing indicators with automatic expiry.
//!
//! Each typing name owns a timer task. When the timer fires it does not touch
//! the tracker directly; it sends a [`TypingExpired`] event that the owner
//! feeds back through [`TypingTracker::expire`] from the same event loop that
//! handles client messages. Every entry carries a generation number, so an
//! expiry for a timer that has since been replaced or cancelled is ignored.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default silence before a typing indicator lapses.
pub const DEFAULT_TYPING_TIMEOUT: Duration = Duration::from_millis(1000);

/// Timer event for a name whose typing window ran out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypingExpired {
    pub name: String,
    generation: u64,
}

/// What a tracker call did, and therefore what should be broadcast.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypingTransition {
    /// Idle -> Typing: announce `typing`.
    Started,
    /// Typing -> Typing: timer reset, nothing to announce.
    Refreshed,
    /// Typing -> Idle: announce `stop-typing`.
    Stopped,
    /// Nothing changed.
    Unchanged,
}

#[derive(Debug)]
struct TypingEntry {
    generation: u64,
    timer: JoinHandle<()>,
}

impl TypingEntry {
    fn cancel(self) {
        self.timer.abort();
    }
}

/// Tracks who is typing.
#[derive(Debug)]
pub struct TypingTracker {
    timeout: Duration,
    entries: HashMap<String, TypingEntry>,
    next_generation: u64,
    expiry_tx: mpsc::UnboundedSender<TypingExpired>,
}

impl TypingTracker {
    /// Create a tracker and the receiver its expiry events arrive on.
    pub fn new(timeout: Duration) -> (Self, mpsc::UnboundedReceiver<TypingExpired>) {
        let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();
        let tracker = Self {
            timeout,
            entries: HashMap::new(),
            next_generation: 0,
            expiry_tx,
        };
        (tracker, expiry_rx)
    }

    /// `name` signalled that it is typing. Must be called within a tokio
    /// runtime since it schedules the expiry timer.
    pub fn signal(&mut self, name: &str) -> TypingTransition {
        let transition = match self.entries.remove(name) {
            Some(entry) => {
                entry.cancel();
                TypingTransition::Refreshed
            }
            None => TypingTransition::Started,
        };

        let entry = self.schedule(name);
        self.entries.insert(name.to_string(), entry);
        transition
    }

    /// `name` explicitly stopped typing.
    pub fn stop(&mut self, name: &str) -> TypingTransition {
        match self.entries.remove(name) {
            Some(entry) => {
                entry.cancel();
                TypingTransition::Stopped
            }
            None => TypingTransition::Unchanged,
        }
    }

    /// Handle a timer event. Stale events (the entry was refreshed, stopped
    /// or removed after the timer was scheduled) change nothing.
    pub fn expire(&mut self, expired: &TypingExpired) -> TypingTransition {
        match self.entries.get(&expired.name) {
            Some(entry) if entry.generation == expired.generation => {
                self.entries.remove(&expired.name);
                TypingTransition::Stopped
            }
            _ => TypingTransition::Unchanged,
        }
    }

    pub fn is_typing(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Names currently typing, sorted.
    pub fn typing_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    fn schedule(&mut self, name: &str) -> TypingEntry {
        self.next_generation += 1;
        let expired = TypingExpired {
            name: name.to_string(),
            generation: self.next_generation,
        };
        let tx = self.expiry_tx.clone();
        let timeout = self.timeout;

        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(expired);
        });

        TypingEntry {
            generation: self.next_generation,
            timer,
        }
    }
}

impl Drop for TypingTracker {
    fn drop(&mut self) {
        for (_, entry) in self.entries.drain() {
            entry.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(1000);

    #[tokio::test(start_paused = true)]
    async fn test_signal_then_silence_expires_once() {
        let (mut tracker, mut expiry_rx) = TypingTracker::new(WINDOW);

        assert_eq!(tracker.signal("alice"), TypingTransition::Started);
        assert!(tracker.is_typing("alice"));

        let expired = expiry_rx.recv().await.unwrap();
        assert_eq!(expired.name, "alice");
        assert_eq!(tracker.expire(&expired), TypingTransition::Stopped);
        assert!(!tracker.is_typing("alice"));

        // A duplicate delivery changes nothing.
        assert_eq!(tracker.expire(&expired), TypingTransition::Unchanged);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_resets_window() {
        let (mut tracker, mut expiry_rx) = TypingTracker::new(WINDOW);

        tracker.signal("alice");
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert_eq!(tracker.signal("alice"), TypingTransition::Refreshed);
        tokio::time::sleep(Duration::from_millis(800)).await;

        // 1600ms since the first signal, but only 800ms since the refresh.
        assert!(expiry_rx.try_recv().is_err());
        assert!(tracker.is_typing("alice"));

        let start = tokio::time::Instant::now();
        let expired = expiry_rx.recv().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(200));
        assert_eq!(tracker.expire(&expired), TypingTransition::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_timer() {
        let (mut tracker, mut expiry_rx) = TypingTracker::new(WINDOW);

        tracker.signal("alice");
        assert_eq!(tracker.stop("alice"), TypingTransition::Stopped);
        assert_eq!(tracker.stop("alice"), TypingTransition::Unchanged);

        tokio::time::sleep(WINDOW * 2).await;
        assert!(expiry_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_expiry_ignored_after_restart() {
        let (mut tracker, _expiry_rx) = TypingTracker::new(WINDOW);

        tracker.signal("alice");
        let stale = TypingExpired {
            name: "alice".to_string(),
            generation: tracker.entries["alice"].generation,
        };
        tracker.stop("alice");
        tracker.signal("alice");

        assert_eq!(tracker.expire(&stale), TypingTransition::Unchanged);
        assert!(tracker.is_typing("alice"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_names_are_independent() {
        let (mut tracker, mut expiry_rx) = TypingTracker::new(WINDOW);

        tracker.signal("alice");
        tokio::time::sleep(Duration::from_millis(500)).await;
        tracker.signal("bob");
        assert_eq!(tracker.typing_names(), vec!["alice", "bob"]);

        let first = expiry_rx.recv().await.unwrap();
        assert_eq!(first.name, "alice");
        tracker.expire(&first);
        assert_eq!(tracker.typing_names(), vec!["bob"]);

        let second = expiry_rx.recv().await.unwrap();
        assert_eq!(second.name, "bob");
    }
}
