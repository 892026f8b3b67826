use dashmap::DashMap;
use uuid::Uuid;

use crate::state::game::{GameSession, Round};

/// Session and round currently played in a room.
#[derive(Debug, Clone)]
pub struct ActiveGame {
    /// Session the room is playing.
    pub session: GameSession,
    /// Round in progress, or the last one played.
    pub round: Round,
}

/// Authoritative in-memory record of the game running in each room.
///
/// Lookups are keyed by room id, with a secondary session id → room id index. Nothing here
/// blocks or performs I/O. Closures passed to [`GameStateStore::with_game`] and
/// [`GameStateStore::with_game_mut`] run while the room entry is locked and must not call back
/// into the store.
#[derive(Default)]
pub struct GameStateStore {
    games: DashMap<String, ActiveGame>,
    sessions: DashMap<Uuid, String>,
}

impl GameStateStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the game of a room.
    pub fn register_session(&self, room_id: &str, session: GameSession, round: Round) {
        self.sessions.insert(session.id, room_id.to_string());
        let previous = self.games.insert(room_id.to_string(), ActiveGame { session, round });
        if let Some(previous) = previous {
            let replaced = previous.session.id;
            if self
                .sessions
                .get(&replaced)
                .is_some_and(|room| room.as_str() == room_id)
                && !self.games.get(room_id).is_some_and(|game| game.session.id == replaced)
            {
                self.sessions.remove(&replaced);
            }
        }
    }

    /// Snapshot of the round currently played in a room.
    pub fn current_round(&self, room_id: &str) -> Option<Round> {
        self.games.get(room_id).map(|game| game.round.clone())
    }

    /// Replace the current round of a room. Returns `false` when the room has no game.
    pub fn update_round(&self, room_id: &str, round: Round) -> bool {
        match self.games.get_mut(room_id) {
            Some(mut game) => {
                game.round = round;
                true
            }
            None => false,
        }
    }

    /// Snapshot of the session of a room.
    pub fn session(&self, room_id: &str) -> Option<GameSession> {
        self.games.get(room_id).map(|game| game.session.clone())
    }

    /// Replace the session of a room. Returns `false` when the room has no game.
    pub fn update_session(&self, room_id: &str, session: GameSession) -> bool {
        match self.games.get_mut(room_id) {
            Some(mut game) => {
                game.session = session;
                true
            }
            None => false,
        }
    }

    /// Snapshot of the whole game of a room.
    pub fn active_game(&self, room_id: &str) -> Option<ActiveGame> {
        self.games.get(room_id).map(|game| game.clone())
    }

    /// Read the game of a room in place.
    pub fn with_game<T>(&self, room_id: &str, f: impl FnOnce(&ActiveGame) -> T) -> Option<T> {
        self.games.get(room_id).map(|game| f(&game))
    }

    /// Mutate the game of a room in place.
    pub fn with_game_mut<T>(
        &self,
        room_id: &str,
        f: impl FnOnce(&mut ActiveGame) -> T,
    ) -> Option<T> {
        self.games.get_mut(room_id).map(|mut game| f(&mut game))
    }

    /// Forget the game of a room. Removing twice is a no-op.
    pub fn remove_session(&self, room_id: &str) -> Option<ActiveGame> {
        let (_, game) = self.games.remove(room_id)?;
        self.sessions
            .remove_if(&game.session.id, |_, room| room.as_str() == room_id);
        Some(game)
    }

    /// Whether a game is registered for `room_id`.
    pub fn has_active_game(&self, room_id: &str) -> bool {
        self.games.contains_key(room_id)
    }

    /// Number of rooms with a game in progress.
    pub fn active_game_count(&self) -> usize {
        self.games.len()
    }

    /// Room currently hosting `session_id`.
    pub fn room_for_session(&self, session_id: Uuid) -> Option<String> {
        self.sessions.get(&session_id).map(|room| room.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::models::MediaType,
        modes::{GameMode, ModeKind, params::GameplayParams},
        state::game::RoundStatus,
    };

    fn game(session_id: Uuid) -> (GameSession, Round) {
        let session = GameSession::new(session_id, "ABCD", Vec::new());
        let round = Round::pending(
            session_id,
            0,
            GameMode::from_kind(ModeKind::FastBuzz),
            MediaType::Audio,
            GameplayParams::default(),
        );
        (session, round)
    }

    #[test]
    fn register_and_lookup_by_room_and_session() {
        let store = GameStateStore::new();
        let session_id = Uuid::new_v4();
        let (session, round) = game(session_id);
        store.register_session("ABCD", session, round);

        assert!(store.has_active_game("ABCD"));
        assert_eq!(store.room_for_session(session_id).as_deref(), Some("ABCD"));
        assert_eq!(
            store.current_round("ABCD").map(|round| round.status),
            Some(RoundStatus::Pending)
        );
        assert!(store.current_round("WXYZ").is_none());
    }

    #[test]
    fn updates_replace_the_stored_values() {
        let store = GameStateStore::new();
        let (session, mut round) = game(Uuid::new_v4());
        store.register_session("ABCD", session, round.clone());

        round.status = RoundStatus::Active;
        assert!(store.update_round("ABCD", round.clone()));
        assert_eq!(
            store.current_round("ABCD").map(|round| round.status),
            Some(RoundStatus::Active)
        );
        assert!(!store.update_round("WXYZ", round));

        let changed = store.with_game_mut("ABCD", |game| {
            game.round.add_points("p1", 2);
            game.round.scores["p1"]
        });
        assert_eq!(changed, Some(2));
    }

    #[test]
    fn remove_is_idempotent_and_clears_the_index() {
        let store = GameStateStore::new();
        let session_id = Uuid::new_v4();
        let (session, round) = game(session_id);
        store.register_session("ABCD", session, round);

        assert!(store.remove_session("ABCD").is_some());
        assert!(store.remove_session("ABCD").is_none());
        assert!(!store.has_active_game("ABCD"));
        assert!(store.room_for_session(session_id).is_none());
    }

    #[test]
    fn replacing_a_game_drops_the_old_session_index() {
        let store = GameStateStore::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let (session, round) = game(first);
        store.register_session("ABCD", session, round);
        let (session, round) = game(second);
        store.register_session("ABCD", session, round);

        assert!(store.room_for_session(first).is_none());
        assert_eq!(store.room_for_session(second).as_deref(), Some("ABCD"));
    }
}
