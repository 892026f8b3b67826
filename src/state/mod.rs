/// Outbound room event boundary.
pub mod broadcast;
/// Runtime game, round and song records.
pub mod game;
mod sse;
/// Song and session state machines.
pub mod state_machine;
/// Authoritative store of active games.
pub mod store;
pub mod timers;

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    config::AppConfig,
    dao::{choices::ChoiceGenerator, content::ContentStore},
};

pub use self::sse::{RoomHubs, SseHub};
use self::{broadcast::RoomBroadcaster, store::GameStateStore, timers::TimerManager};

/// Application state shared across handlers and timer tasks.
pub type SharedState = Arc<AppState>;

/// Capacity of each room's SSE channel.
const ROOM_SSE_CAPACITY: usize = 64;

/// Central application state: collaborators, the authoritative game store and per-room timers.
pub struct AppState {
    config: AppConfig,
    content: Arc<dyn ContentStore>,
    choices: Arc<dyn ChoiceGenerator>,
    hubs: Arc<RoomHubs>,
    broadcaster: Arc<dyn RoomBroadcaster>,
    store: GameStateStore,
    timers: TimerManager,
    room_gates: DashMap<String, Arc<Mutex<()>>>,
}

impl AppState {
    /// Build the state with room events going out through the per-room SSE hubs.
    pub fn new(
        config: AppConfig,
        content: Arc<dyn ContentStore>,
        choices: Arc<dyn ChoiceGenerator>,
    ) -> SharedState {
        let hubs = Arc::new(RoomHubs::new(ROOM_SSE_CAPACITY));
        let broadcaster: Arc<dyn RoomBroadcaster> = hubs.clone();
        Self::build(config, content, choices, hubs, broadcaster)
    }

    /// Build the state with a custom broadcast boundary.
    pub fn with_broadcaster(
        config: AppConfig,
        content: Arc<dyn ContentStore>,
        choices: Arc<dyn ChoiceGenerator>,
        broadcaster: Arc<dyn RoomBroadcaster>,
    ) -> SharedState {
        let hubs = Arc::new(RoomHubs::new(ROOM_SSE_CAPACITY));
        Self::build(config, content, choices, hubs, broadcaster)
    }

    fn build(
        config: AppConfig,
        content: Arc<dyn ContentStore>,
        choices: Arc<dyn ChoiceGenerator>,
        hubs: Arc<RoomHubs>,
        broadcaster: Arc<dyn RoomBroadcaster>,
    ) -> SharedState {
        Arc::new(Self {
            config,
            content,
            choices,
            hubs,
            timers: TimerManager::new(Arc::clone(&broadcaster)),
            broadcaster,
            store: GameStateStore::new(),
            room_gates: DashMap::new(),
        })
    }

    /// Application configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Content collaborator: rooms, players, sessions, songs and scores.
    pub fn content(&self) -> Arc<dyn ContentStore> {
        Arc::clone(&self.content)
    }

    /// Distractor generator used by multiple-choice modes.
    pub fn choices(&self) -> Arc<dyn ChoiceGenerator> {
        Arc::clone(&self.choices)
    }

    /// Per-room SSE hubs backing the event streams.
    pub fn hubs(&self) -> &RoomHubs {
        &self.hubs
    }

    /// Outbound room broadcast boundary.
    pub fn broadcaster(&self) -> &dyn RoomBroadcaster {
        self.broadcaster.as_ref()
    }

    /// Authoritative record of active games.
    pub fn store(&self) -> &GameStateStore {
        &self.store
    }

    /// Per-room countdowns.
    pub fn timers(&self) -> &TimerManager {
        &self.timers
    }

    /// Serialize event handling for a room. Never hold the guard across collaborator I/O.
    pub async fn lock_room(&self, room_id: &str) -> OwnedMutexGuard<()> {
        let gate = self
            .room_gates
            .entry(room_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        gate.lock_owned().await
    }

    /// Forget the gate of a room once nobody else holds a reference to it.
    pub fn release_room_gate(&self, room_id: &str) {
        self.room_gates
            .remove_if(room_id, |_, gate| Arc::strong_count(gate) == 1);
    }

    /// Weak handle for timer callbacks, so pending timers never keep the state alive.
    pub fn downgrade(self: &Arc<Self>) -> Weak<Self> {
        Arc::downgrade(self)
    }
}
