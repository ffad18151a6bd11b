// Change Feed - in-process publish/subscribe of queue mutations

use crate::application::constants::CHANGE_FEED_CAPACITY;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEventKind {
    Joined,
    Called,
    Served,
    Cancelled,
    /// Positions renumbered
    Repositioned,
    /// Estimates rewritten
    WaitTimesUpdated,
}

/// One mutation of a business's queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEvent {
    pub business_id: String,
    /// None when the change touches many entries
    pub entry_id: Option<String>,
    pub kind: QueueEventKind,
}

impl QueueEvent {
    pub fn entry(business_id: &str, entry_id: &str, kind: QueueEventKind) -> Self {
        Self {
            business_id: business_id.to_string(),
            entry_id: Some(entry_id.to_string()),
            kind,
        }
    }

    pub fn business(business_id: &str, kind: QueueEventKind) -> Self {
        Self {
            business_id: business_id.to_string(),
            entry_id: None,
            kind,
        }
    }

    /// Whether this event may change the given entry
    pub fn touches_entry(&self, business_id: Option<&str>, entry_id: &str) -> bool {
        match &self.entry_id {
            Some(id) => id == entry_id,
            None => business_id == Some(self.business_id.as_str()),
        }
    }
}

/// Broadcast bus shared by the engine and its subscriptions
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<QueueEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event; having no listeners is not an error
    pub fn publish(&self, event: QueueEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.tx.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(CHANGE_FEED_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_all_listeners() {
        let feed = ChangeFeed::default();
        let mut a = feed.subscribe();
        let mut b = feed.subscribe();

        feed.publish(QueueEvent::entry("b1", "q-1", QueueEventKind::Joined));

        assert_eq!(a.recv().await.unwrap().kind, QueueEventKind::Joined);
        assert_eq!(b.recv().await.unwrap().entry_id.as_deref(), Some("q-1"));
    }

    #[test]
    fn test_publish_without_listeners_is_silent() {
        let feed = ChangeFeed::default();
        feed.publish(QueueEvent::business("b1", QueueEventKind::Repositioned));
        assert_eq!(feed.listener_count(), 0);
    }

    #[test]
    fn test_touches_entry() {
        let single = QueueEvent::entry("b1", "q-1", QueueEventKind::Called);
        assert!(single.touches_entry(Some("b1"), "q-1"));
        assert!(!single.touches_entry(Some("b1"), "q-2"));

        let bulk = QueueEvent::business("b1", QueueEventKind::WaitTimesUpdated);
        assert!(bulk.touches_entry(Some("b1"), "q-2"));
        assert!(!bulk.touches_entry(Some("b2"), "q-2"));
        assert!(!bulk.touches_entry(None, "q-2"));
    }
}
