use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::{
    dto::sse::{RoomHandshake, ServerEvent},
    state::SharedState,
};

/// Subscribe to the event stream of a room and announce the new connection on it.
pub fn subscribe_room(state: &SharedState, room_id: &str) -> broadcast::Receiver<ServerEvent> {
    let receiver = state.hubs().subscribe(room_id);
    let handshake = RoomHandshake {
        room_id: room_id.to_string(),
        message: "room stream connected".into(),
        session_status: state
            .store()
            .with_game(room_id, |game| game.session.status),
    };
    match ServerEvent::json(Some("handshake".to_string()), &handshake) {
        Ok(event) => {
            if !state.hubs().send(room_id, event) {
                debug!(room_id = %room_id, "handshake not delivered");
            }
        }
        Err(err) => warn!(room_id = %room_id, error = %err, "failed to serialise handshake"),
    }
    receiver
}

/// Convert a broadcast receiver into an SSE response, forwarding events until the client
/// disconnects or the room hub is dropped.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    room_id: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            let mut event = Event::default().data(payload.data);
                            if let Some(name) = payload.event {
                                event = event.event(name);
                            }

                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(room_id = %room_id, skipped, "room stream lagging");
                            continue;
                        }
                    }
                }
            }
        }

        info!(room_id = %room_id, "room SSE stream disconnected");
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
