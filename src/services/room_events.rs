use std::time::SystemTime;

use tracing::debug;

use crate::{
    dto::{
        events::{
            AnswerResultEvent, ChoicesEvent, GameEndedEvent, PlayerBuzzedEvent, RoomEvent,
            RoundEndedEvent, RoundStartedEvent, ScoreUpdatedEvent, SongEndedEvent,
            SongStartedEvent,
        },
        format_system_time,
    },
    state::{
        SharedState,
        game::{AnswerField, Choice, ChoiceSet, FinalScore, GameSession, Round},
    },
};

/// Broadcast `round:started` once a round's songs are loaded.
pub fn broadcast_round_started(state: &SharedState, session: &GameSession, round: &Round) {
    let payload = RoundStartedEvent {
        session_id: session.id,
        round_index: round.index,
        round_count: session.rounds.len(),
        mode: round.mode.kind(),
        media_type: round.media_type,
        song_count: round.songs.len(),
        params: round.params.clone(),
    };
    send(state, &session.room_id, RoomEvent::RoundStarted(payload));
}

/// Broadcast `song:started` with the content reference and any title choices.
pub fn broadcast_song_started(state: &SharedState, room_id: &str, round: &Round, song_index: usize) {
    let Some(song) = round.songs.get(song_index) else {
        return;
    };
    let payload = SongStartedEvent {
        round_index: round.index,
        song_index,
        song_id: song.song.id.clone(),
        media_type: song.song.media_type,
        content_url: state.config().content_url(&song.song.id),
        duration_secs: round.params.song_duration_secs,
        title_choices: song.title_choices.as_ref().map(ChoiceSet::display_texts),
    };
    send(state, room_id, RoomEvent::SongStarted(payload));
}

/// Broadcast `song:ended`, revealing the ground truth.
pub fn broadcast_song_ended(state: &SharedState, room_id: &str, round: &Round, song_index: usize) {
    let Some(song) = round.songs.get(song_index) else {
        return;
    };
    let found_fields = [AnswerField::Title, AnswerField::Artist]
        .into_iter()
        .filter(|field| song.is_found(*field))
        .collect();
    let payload = SongEndedEvent {
        round_index: round.index,
        song_index,
        song_id: song.song.id.clone(),
        title: song.song.title.clone(),
        artist: song.song.artist.clone(),
        found_fields,
    };
    send(state, room_id, RoomEvent::SongEnded(payload));
}

/// Broadcast the ranking of a finalized round.
pub fn broadcast_round_ended(
    state: &SharedState,
    session: &GameSession,
    round: &Round,
    rankings: Vec<FinalScore>,
    is_last_round: bool,
) {
    let payload = RoundEndedEvent {
        session_id: session.id,
        round_index: round.index,
        rankings,
        is_last_round,
    };
    send(state, &session.room_id, RoomEvent::RoundEnded(payload));
}

/// Broadcast the cumulative ranking of a finished game.
pub fn broadcast_game_ended(state: &SharedState, session: &GameSession, rankings: Vec<FinalScore>) {
    let payload = GameEndedEvent {
        session_id: session.id,
        rankings,
        ended_at: format_system_time(SystemTime::now()),
    };
    send(state, &session.room_id, RoomEvent::GameEnded(payload));
}

/// Broadcast that a player holds the answerer slot.
pub fn broadcast_player_buzzed(
    state: &SharedState,
    room_id: &str,
    payload: PlayerBuzzedEvent,
) {
    send(state, room_id, RoomEvent::PlayerBuzzed(payload));
}

/// Broadcast an answer verdict to every participant.
pub fn broadcast_answer_result(state: &SharedState, room_id: &str, payload: AnswerResultEvent) {
    send(state, room_id, RoomEvent::AnswerResult(payload));
}

/// Expose the artist choices to the player holding the slot.
pub fn broadcast_artist_choices(
    state: &SharedState,
    room_id: &str,
    player_id: &str,
    song_index: usize,
    choices: &[Choice],
) {
    let payload = ChoicesEvent {
        player_id: player_id.to_string(),
        song_index,
        choices: choices
            .iter()
            .map(|choice| choice.display_text.clone())
            .collect(),
    };
    send(state, room_id, RoomEvent::ChoicesArtist(payload));
}

/// Broadcast a player's updated scores.
pub fn broadcast_score_updated(
    state: &SharedState,
    room_id: &str,
    player_id: &str,
    round_score: i32,
    total_score: Option<i32>,
) {
    let payload = ScoreUpdatedEvent {
        player_id: player_id.to_string(),
        round_score,
        total_score,
    };
    send(state, room_id, RoomEvent::ScoreUpdated(payload));
}

fn send(state: &SharedState, room_id: &str, event: RoomEvent) {
    debug!(room_id = %room_id, event = event.name(), "broadcasting room event");
    state.broadcaster().broadcast_to_room(room_id, event);
}
