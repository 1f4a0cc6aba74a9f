//! Sync coordinator: the single authoritative replica.
//!
//! Applies participant operations to the document, mints identifiers for thin
//! clients, merges, and fans the rendered text out to every active
//! participant.
//!
//! Lock order is always document, then participants. Fan-out only enqueues
//! into bounded outboxes, so nothing awaits while either lock is held and
//! every participant sees broadcasts in the order edits were applied.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::participants::{ParticipantId, Participants};
use super::protocol::{Operation, ServerMessage};
use crate::config::SyncConfig;
use crate::crdt::{physical_index, Document, Element, Identifier};
use crate::error::OperationError;

/// Document plus the counter this replica mints identifiers from.
struct Replica {
    document: Document,
    counter: i64,
}

impl Replica {
    /// Next identifier under our own site label that is not already taken.
    fn mint(&mut self, site: &str) -> Identifier {
        loop {
            self.counter += 1;
            let id = Identifier::new(site, self.counter);
            if !self.document.contains(&id) {
                return id;
            }
        }
    }
}

/// Read-only view served by the inspection endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSnapshot {
    pub site: String,
    pub text: String,
    /// Physical length, tombstones included
    pub length: usize,
    pub tombstones: usize,
    pub participants: usize,
}

pub struct Coordinator {
    site: String,
    replica: RwLock<Replica>,
    participants: Mutex<Participants>,
    outbox_capacity: usize,
    notify_rejections: bool,
}

impl Coordinator {
    /// Wrap `document` as the authoritative replica.
    pub fn new(document: Document, config: &SyncConfig) -> Self {
        Self {
            site: config.site.clone(),
            replica: RwLock::new(Replica {
                document,
                counter: 0,
            }),
            participants: Mutex::new(Participants::new()),
            outbox_capacity: config.outbox_capacity.max(1),
            notify_rejections: config.notify_rejections,
        }
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    /// Register a participant. The current text is queued as the first
    /// message on the returned receiver.
    pub fn connect(&self) -> (ParticipantId, mpsc::Receiver<ServerMessage>) {
        let id = Uuid::new_v4();
        let (outbox, inbox) = mpsc::channel(self.outbox_capacity);

        let replica = self.read_replica();
        let mut participants = self.lock_participants();
        // Fresh channel with capacity >= 1, so this cannot fail.
        let _ = outbox.try_send(ServerMessage::state(replica.document.render()));
        participants.register(id, outbox);

        info!(participant = %id, participants = participants.len(), "Participant active");
        (id, inbox)
    }

    /// Remove a participant from the broadcast set. Its edits stay.
    pub fn disconnect(&self, id: &ParticipantId) -> bool {
        let mut participants = self.lock_participants();
        let removed = participants.remove(id);
        if removed {
            info!(participant = %id, participants = participants.len(), "Participant closed");
        }
        removed
    }

    pub fn is_active(&self, id: &ParticipantId) -> bool {
        self.lock_participants().contains(id)
    }

    pub fn participant_count(&self) -> usize {
        self.lock_participants().len()
    }

    /// Parse and apply one inbound text frame.
    ///
    /// Rejections are logged and dropped; the originator alone is told about
    /// them when rejection notices are enabled.
    pub fn handle_message(&self, from: &ParticipantId, text: &str) -> Result<String, OperationError> {
        let result = Operation::parse(text).and_then(|op| self.apply(from, op));
        if let Err(e) = &result {
            warn!(participant = %from, error = %e, "Operation rejected");
            if self.notify_rejections {
                self.lock_participants().send_to(
                    from,
                    ServerMessage::Rejected {
                        error: e.to_string(),
                    },
                );
            }
        }
        result
    }

    /// Apply a validated operation, merge, and broadcast the new text to all
    /// active participants, the originator included. Returns the text.
    pub fn apply(&self, from: &ParticipantId, op: Operation) -> Result<String, OperationError> {
        let mut replica = self.write_replica();

        // Evicted or disconnected participants are Closed; their edits are dropped.
        if !self.lock_participants().contains(from) {
            return Err(OperationError::InactiveParticipant(*from));
        }

        match &op {
            Operation::Insert { pos, value, id } => {
                let index = physical_index(*pos, replica.document.len())?;
                let id = match id {
                    Some(id) if replica.document.contains(id) => {
                        return Err(OperationError::DuplicateIdentifier(id.clone()));
                    }
                    Some(id) => id.clone(),
                    None => replica.mint(&self.site),
                };
                debug!(participant = %from, op = op.kind(), pos, id = %id, "Applying operation");
                replica.document.insert(Element::new(id, *value), index)?;
            }
            Operation::Delete { pos } => {
                let index = physical_index(*pos, replica.document.len())?;
                debug!(participant = %from, op = op.kind(), pos, "Applying operation");
                replica.document.delete(index)?;
            }
        }

        replica.document.merge();
        let text = replica.document.render();

        let evicted = self
            .lock_participants()
            .broadcast(&ServerMessage::state(text.clone()));
        if !evicted.is_empty() {
            info!(count = evicted.len(), "Evicted participants during broadcast");
        }

        Ok(text)
    }

    /// Current rendered text.
    pub fn render(&self) -> String {
        self.read_replica().document.render()
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        let replica = self.read_replica();
        let participants = self.lock_participants();
        DocumentSnapshot {
            site: self.site().to_string(),
            text: replica.document.render(),
            length: replica.document.len(),
            tombstones: replica.document.tombstones(),
            participants: participants.len(),
        }
    }

    /// Clone of the document for inspection in tests and tooling.
    pub fn document(&self) -> Document {
        self.read_replica().document.clone()
    }

    // A panic while holding a lock leaves the data structurally intact (every
    // mutation is a single Vec call), so poisoned guards are recovered.
    fn read_replica(&self) -> RwLockReadGuard<'_, Replica> {
        self.replica.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_replica(&self) -> RwLockWriteGuard<'_, Replica> {
        self.replica.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_participants(&self) -> MutexGuard<'_, Participants> {
        self.participants.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocumentError;

    fn coordinator() -> Coordinator {
        Coordinator::new(Document::new(), &SyncConfig::default())
    }

    fn insert(pos: i64, value: char) -> Operation {
        Operation::Insert {
            pos,
            value,
            id: None,
        }
    }

    #[test]
    fn test_minted_counters_increase() {
        let coordinator = coordinator();
        let (me, _rx) = coordinator.connect();

        coordinator.apply(&me, insert(0, 'a')).unwrap();
        coordinator.apply(&me, insert(1, 'b')).unwrap();

        let doc = coordinator.document();
        let ids: Vec<_> = doc.elements().iter().map(|e| e.id.clone()).collect();
        assert_eq!(
            ids,
            vec![Identifier::new("local", 1), Identifier::new("local", 2)]
        );
    }

    #[test]
    fn test_minting_skips_taken_identifiers() {
        let coordinator = coordinator();
        let (me, _rx) = coordinator.connect();

        coordinator
            .apply(
                &me,
                Operation::Insert {
                    pos: 0,
                    value: 'x',
                    id: Some(Identifier::new("local", 1)),
                },
            )
            .unwrap();
        coordinator.apply(&me, insert(1, 'y')).unwrap();

        assert!(coordinator
            .document()
            .contains(&Identifier::new("local", 2)));
    }

    #[test]
    fn test_duplicate_identifier_rejected() {
        let coordinator = coordinator();
        let (me, _rx) = coordinator.connect();
        let id = Identifier::new("B", 1);

        let op = Operation::Insert {
            pos: 0,
            value: 'x',
            id: Some(id.clone()),
        };
        coordinator.apply(&me, op.clone()).unwrap();
        assert_eq!(
            coordinator.apply(&me, op),
            Err(OperationError::DuplicateIdentifier(id))
        );
        assert_eq!(coordinator.document().len(), 1);
    }

    #[test]
    fn test_negative_position_rejected() {
        let coordinator = coordinator();
        let (me, _rx) = coordinator.connect();

        let err = coordinator.apply(&me, Operation::Delete { pos: -1 }).unwrap_err();
        assert_eq!(
            err,
            OperationError::Document(DocumentError::InvalidPosition {
                position: -1,
                length: 0
            })
        );
    }

    #[test]
    fn test_snapshot_counts() {
        let coordinator = coordinator();
        let (me, _rx) = coordinator.connect();
        coordinator.apply(&me, insert(0, 'a')).unwrap();
        coordinator.apply(&me, insert(1, 'b')).unwrap();
        coordinator.apply(&me, Operation::Delete { pos: 0 }).unwrap();

        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot.text, "b");
        assert_eq!(snapshot.length, 2);
        assert_eq!(snapshot.tombstones, 1);
        assert_eq!(snapshot.participants, 1);
        assert_eq!(snapshot.site, "local");
    }

    #[test]
    fn test_disconnected_participant_cannot_edit() {
        let coordinator = coordinator();
        let (me, _rx) = coordinator.connect();
        coordinator.apply(&me, insert(0, 'a')).unwrap();
        coordinator.disconnect(&me);

        assert_eq!(
            coordinator.apply(&me, insert(1, 'b')),
            Err(OperationError::InactiveParticipant(me))
        );
        assert_eq!(coordinator.render(), "a");
    }
}
