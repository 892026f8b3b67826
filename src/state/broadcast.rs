use std::sync::Mutex;

use crate::dto::events::RoomEvent;

/// Outbound notification boundary. Delivery is fire-and-forget and never fails the caller.
pub trait RoomBroadcaster: Send + Sync {
    /// Deliver `event` to every subscriber of `room_id`.
    fn broadcast_to_room(&self, room_id: &str, event: RoomEvent);
}

/// Broadcaster keeping every event in memory, for assertions.
#[derive(Default)]
pub struct RecordingBroadcaster {
    events: Mutex<Vec<(String, RoomEvent)>>,
}

impl RecordingBroadcaster {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event sent so far, with its room.
    pub fn events(&self) -> Vec<(String, RoomEvent)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Events sent to `room_id`, in order.
    pub fn events_for(&self, room_id: &str) -> Vec<RoomEvent> {
        self.events()
            .into_iter()
            .filter(|(room, _)| room == room_id)
            .map(|(_, event)| event)
            .collect()
    }

    /// Wire names of the events sent to `room_id`, in order.
    pub fn names_for(&self, room_id: &str) -> Vec<&'static str> {
        self.events_for(room_id)
            .iter()
            .map(RoomEvent::name)
            .collect()
    }

    /// Forget every recorded event.
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl RoomBroadcaster for RecordingBroadcaster {
    fn broadcast_to_room(&self, room_id: &str, event: RoomEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push((room_id.to_string(), event));
        }
    }
}
