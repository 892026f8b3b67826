use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::warn;

use crate::{
    dto::{events::RoomEvent, sse::ServerEvent},
    state::broadcast::RoomBroadcaster,
};

/// Per-room SSE fan-out, implementing the room broadcast boundary.
pub struct RoomHubs {
    hubs: DashMap<String, SseHub>,
    capacity: usize,
}

impl RoomHubs {
    /// Create an empty registry; each room hub buffers up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        Self {
            hubs: DashMap::new(),
            capacity,
        }
    }

    /// Subscribe to a room, creating its hub on first use.
    pub fn subscribe(&self, room_id: &str) -> broadcast::Receiver<ServerEvent> {
        self.hubs
            .entry(room_id.to_string())
            .or_insert_with(|| SseHub::new(self.capacity))
            .subscribe()
    }

    /// Send a raw event to the subscribers of a room. Returns `false` when the room has no hub.
    pub fn send(&self, room_id: &str, event: ServerEvent) -> bool {
        match self.hubs.get(room_id) {
            Some(hub) => {
                hub.broadcast(event);
                true
            }
            None => false,
        }
    }

    /// Drop a room's hub, closing every open stream.
    pub fn remove(&self, room_id: &str) {
        self.hubs.remove(room_id);
    }
}

impl RoomBroadcaster for RoomHubs {
    fn broadcast_to_room(&self, room_id: &str, event: RoomEvent) {
        let Some(hub) = self.hubs.get(room_id) else {
            return;
        };

        match ServerEvent::json(event.name().to_string(), &event) {
            Ok(message) => hub.broadcast(message),
            Err(err) => warn!(
                room_id = %room_id,
                event = event.name(),
                error = %err,
                "failed to serialise room event"
            ),
        }
    }
}

/// Simple broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive every event sent on this hub from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}
