//! Participant sessions over WebSocket
//!
//! One task per participant. The task reads operations in arrival order and
//! forwards them to the coordinator, and drains the participant's outbox onto
//! the socket. Socket I/O never happens while the coordinator holds a lock.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};

use super::AppState;
use crate::error::{OperationError, TransportError};
use crate::sync::{Coordinator, ParticipantId, ParticipantState, ServerMessage};

/// GET /ws
pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_session(socket, state.coordinator))
}

/// Drive one participant from upgrade to close.
pub async fn run_session(socket: WebSocket, coordinator: Arc<Coordinator>) {
    debug!(state = ?ParticipantState::Connecting, "WebSocket upgraded");

    let (id, outbox) = coordinator.connect();
    let session = Session {
        id,
        state: ParticipantState::Active,
        coordinator,
    };

    session
        .run(socket, outbox)
        .instrument(info_span!("participant", id = %id))
        .await;
}

struct Session {
    id: ParticipantId,
    state: ParticipantState,
    coordinator: Arc<Coordinator>,
}

impl Session {
    async fn run(mut self, socket: WebSocket, mut outbox: mpsc::Receiver<ServerMessage>) {
        let (mut sink, mut stream) = socket.split();

        let result: Result<(), TransportError> = loop {
            tokio::select! {
                inbound = stream.next() => match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if !self.on_frame(&text) {
                            break Ok(());
                        }
                    }
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                        Ok(text) => {
                            if !self.on_frame(&text) {
                                break Ok(());
                            }
                        }
                        Err(_) => warn!("Dropping non UTF-8 binary frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "Participant closed connection");
                        break Ok(());
                    }
                    // Pings are answered by the WebSocket layer
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(TransportError::Receive(e.to_string())),
                    None => break Ok(()),
                },
                outbound = outbox.recv() => match outbound {
                    Some(message) => {
                        if let Err(e) = send(&mut sink, &message).await {
                            break Err(e);
                        }
                    }
                    None => {
                        info!("Removed from broadcast set, closing");
                        let _ = sink.send(Message::Close(None)).await;
                        break Ok(());
                    }
                },
            }
        };

        if let Err(e) = &result {
            warn!(error = %e, "Transport failure");
        }
        self.close();
    }

    /// Returns false once the participant has been evicted and the session
    /// should stop reading.
    fn on_frame(&self, text: &str) -> bool {
        // Rejections are already logged by the coordinator.
        match self.coordinator.handle_message(&self.id, text) {
            Ok(rendered) => {
                debug!(visible = rendered.chars().count(), "Operation applied");
                true
            }
            Err(OperationError::InactiveParticipant(_)) => {
                info!("Evicted from broadcast set, closing");
                false
            }
            Err(_) => true,
        }
    }

    fn close(&mut self) {
        self.coordinator.disconnect(&self.id);
        self.state = ParticipantState::Closed;
        debug!(state = ?self.state, "Session ended");
    }
}

async fn send(
    sink: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), TransportError> {
    let json = serde_json::to_string(message)?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| TransportError::Send(e.to_string()))
}
