//! Broadcast set of connected participants

use std::collections::HashMap;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

use super::protocol::ServerMessage;

pub type ParticipantId = Uuid;

/// Lifecycle of a participant session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantState {
    /// Upgraded, not yet registered
    Connecting,
    /// Registered and receiving broadcasts
    Active,
    /// Removed from the broadcast set
    Closed,
}

/// Outboxes of every `Active` participant.
///
/// Sending never blocks: a participant whose outbox is full or whose task has
/// gone away is evicted on the spot.
#[derive(Debug, Default)]
pub struct Participants {
    outboxes: HashMap<ParticipantId, mpsc::Sender<ServerMessage>>,
}

impl Participants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: ParticipantId, outbox: mpsc::Sender<ServerMessage>) {
        self.outboxes.insert(id, outbox);
    }

    /// Returns `true` if the participant was present.
    pub fn remove(&mut self, id: &ParticipantId) -> bool {
        self.outboxes.remove(id).is_some()
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.outboxes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.outboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outboxes.is_empty()
    }

    /// Queue `message` for a single participant.
    pub fn send_to(&mut self, id: &ParticipantId, message: ServerMessage) -> bool {
        let Some(outbox) = self.outboxes.get(id) else {
            return false;
        };
        match outbox.try_send(message) {
            Ok(()) => true,
            Err(e) => {
                self.evict(id, &e);
                false
            }
        }
    }

    /// Queue `message` for every participant, evicting those that cannot take
    /// it. Returns the evicted ids.
    pub fn broadcast(&mut self, message: &ServerMessage) -> Vec<ParticipantId> {
        let mut evicted = Vec::new();
        self.outboxes.retain(|id, outbox| match outbox.try_send(message.clone()) {
            Ok(()) => true,
            Err(e) => {
                log_eviction(id, &e);
                evicted.push(*id);
                false
            }
        });
        debug!(
            recipients = self.outboxes.len(),
            evicted = evicted.len(),
            "Broadcast queued"
        );
        evicted
    }

    fn evict(&mut self, id: &ParticipantId, error: &TrySendError<ServerMessage>) {
        log_eviction(id, error);
        self.outboxes.remove(id);
    }
}

fn log_eviction(id: &ParticipantId, error: &TrySendError<ServerMessage>) {
    match error {
        TrySendError::Full(_) => warn!(participant = %id, "Outbox full, disconnecting slow participant"),
        TrySendError::Closed(_) => debug!(participant = %id, "Outbox closed, removing participant"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_reaches_everyone() {
        let mut participants = Participants::new();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        participants.register(Uuid::new_v4(), tx_a);
        participants.register(Uuid::new_v4(), tx_b);

        let evicted = participants.broadcast(&ServerMessage::state("hi"));
        assert!(evicted.is_empty());
        assert_eq!(rx_a.try_recv().unwrap(), ServerMessage::state("hi"));
        assert_eq!(rx_b.try_recv().unwrap(), ServerMessage::state("hi"));
    }

    #[test]
    fn test_full_outbox_is_evicted() {
        let mut participants = Participants::new();
        let slow = Uuid::new_v4();
        let (tx, _rx) = mpsc::channel(1);
        participants.register(slow, tx);

        assert!(participants.broadcast(&ServerMessage::state("a")).is_empty());
        assert_eq!(participants.broadcast(&ServerMessage::state("b")), vec![slow]);
        assert!(participants.is_empty());
    }

    #[test]
    fn test_closed_outbox_is_evicted() {
        let mut participants = Participants::new();
        let gone = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(1);
        participants.register(gone, tx);
        drop(rx);

        assert!(!participants.send_to(&gone, ServerMessage::state("x")));
        assert!(!participants.contains(&gone));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut participants = Participants::new();
        let id = Uuid::new_v4();
        let (tx, _rx) = mpsc::channel(1);
        participants.register(id, tx);

        assert!(participants.remove(&id));
        assert!(!participants.remove(&id));
    }
}
