//! Round and song lifecycle of every room.
//!
//! Every operation takes the room gate for the duration of one event and releases it before
//! awaiting a collaborator; state is re-validated once the gate is taken again.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use futures::future::BoxFuture;
use rand::{rng, seq::SliceRandom};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{RoomStatus, RoundConfigEntity, SongEntity},
        storage::StorageError,
    },
    dto::room::RoundSummary,
    error::ServiceError,
    modes::{GameMode, params::GameplayParams},
    services::{
        room_events::{
            broadcast_game_ended, broadcast_round_ended, broadcast_round_started,
            broadcast_song_ended, broadcast_song_started,
        },
        scoring::{rank_round, rank_rounds},
    },
    state::{
        AppState, SharedState,
        game::{GameSession, Round, RoundSong, RoundStatus},
        state_machine::{SessionEvent, SessionStatus, SongStatus},
        store::ActiveGame,
        timers::{SongTimerContext, TimerCallback},
    },
};

/// How a failed round start is undone.
enum Rollback {
    /// The session was created by this call.
    RemoveSession,
    /// The session existed; put its previous round back.
    RestoreRound(Box<Round>),
}

/// What follows the reveal delay of a song.
enum Continuation {
    NextSong(usize),
    EndRound,
}

/// Start round `round_index` of session `session_id` in `room_id` and play its first song.
///
/// The first call for a room creates the session; later calls reuse it between rounds. When no
/// song can be loaded the room is rolled back to its previous state.
pub async fn start_round(
    state: &SharedState,
    room_id: &str,
    session_id: Uuid,
    round_index: usize,
) -> Result<RoundSummary, ServiceError> {
    let content = state.content();
    content
        .find_room(room_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("room {room_id}")))?;
    let session_config = content
        .find_session_config(session_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("session {session_id}")))?;
    if session_config.room_id != room_id {
        return Err(ServiceError::InvalidInput(format!(
            "session {session_id} belongs to another room"
        )));
    }
    let round_config = session_config
        .rounds
        .get(round_index)
        .cloned()
        .ok_or_else(|| ServiceError::NotFound("round not found".into()))?;

    let mode = GameMode::from_kind(round_config.mode);
    let params = GameplayParams::resolve(
        &round_config.params,
        &mode.rules().default_params(),
        &state.config().defaults,
    );
    let placeholder = Round::pending(
        session_id,
        round_index,
        mode,
        round_config.media_type,
        params,
    );

    let rollback = {
        let _guard = state.lock_room(room_id).await;
        reserve_round(state, room_id, session_config.rounds, placeholder)?
    };

    let loaded = async {
        let songs = load_round_songs(state, &round_config).await?;
        let players = content.list_players(room_id).await?;
        Ok::<_, ServiceError>((songs, players))
    }
    .await;

    let (songs, players) = match loaded {
        Ok(loaded) => loaded,
        Err(err) => {
            let _guard = state.lock_room(room_id).await;
            roll_back(state, room_id, session_id, round_index, rollback);
            warn!(
                room_id = %room_id,
                round_index,
                error = %err,
                "round start failed; rolled back"
            );
            return Err(err);
        }
    };

    let summary = {
        let _guard = state.lock_room(room_id).await;
        let (session, round) = state
            .store()
            .with_game_mut(room_id, |game| {
                let ActiveGame { session, round } = game;
                if session.id != session_id
                    || round.index != round_index
                    || round.status != RoundStatus::Pending
                {
                    return Err(ServiceError::InvalidState(
                        "round was ended while loading".into(),
                    ));
                }

                let mode = round.mode;
                round.songs = songs.into_iter().map(RoundSong::new).collect();
                mode.rules().start_round(round);
                round.status = RoundStatus::Active;
                session.refresh_players(players);
                session.apply(SessionEvent::RoundStarted)?;
                session.current_round_index = Some(round_index);
                Ok::<_, ServiceError>((session.clone(), round.clone()))
            })
            .ok_or_else(|| ServiceError::NoActiveGame(room_id.to_string()))??;

        info!(
            room_id = %room_id,
            session_id = %session_id,
            round_index,
            mode = ?round.mode.kind(),
            songs = round.songs.len(),
            "round started"
        );
        broadcast_round_started(state, &session, &round);

        RoundSummary {
            session_id,
            round_index,
            mode: round.mode.kind(),
            media_type: round.media_type,
            song_count: round.songs.len(),
            params: round.params.clone(),
        }
    };

    update_room_status(state, room_id, RoomStatus::Playing).await;
    start_song(state, room_id, 0).await?;

    Ok(summary)
}

/// Register a new session, or reuse a waiting one, with a pending placeholder round.
fn reserve_round(
    state: &SharedState,
    room_id: &str,
    configured_rounds: Vec<RoundConfigEntity>,
    placeholder: Round,
) -> Result<Rollback, ServiceError> {
    let session_id = placeholder.session_id;
    let round_index = placeholder.index;

    let Some(result) = state.store().with_game_mut(room_id, |game| {
        if game.session.id != session_id {
            return Err(ServiceError::InvalidState(format!(
                "another game is running in room {room_id}"
            )));
        }
        if game.session.status != SessionStatus::Waiting {
            return Err(ServiceError::InvalidState("a round is already in progress".into()));
        }
        if game.round.status == RoundStatus::Pending {
            return Err(ServiceError::InvalidState("a round is already loading".into()));
        }
        if game
            .session
            .finished_rounds
            .iter()
            .any(|round| round.index == round_index)
        {
            return Err(ServiceError::InvalidState(format!(
                "round {round_index} has already been played"
            )));
        }

        let previous = std::mem::replace(&mut game.round, placeholder.clone());
        Ok(Rollback::RestoreRound(Box::new(previous)))
    }) else {
        let session = GameSession::new(session_id, room_id, configured_rounds);
        state.store().register_session(room_id, session, placeholder);
        return Ok(Rollback::RemoveSession);
    };

    result
}

fn roll_back(
    state: &SharedState,
    room_id: &str,
    session_id: Uuid,
    round_index: usize,
    rollback: Rollback,
) {
    let still_reserved = state
        .store()
        .with_game(room_id, |game| {
            game.session.id == session_id
                && game.round.index == round_index
                && game.round.status == RoundStatus::Pending
        })
        .unwrap_or(false);
    if !still_reserved {
        return;
    }

    match rollback {
        Rollback::RemoveSession => {
            state.store().remove_session(room_id);
        }
        Rollback::RestoreRound(previous) => {
            state.store().update_round(room_id, *previous);
        }
    }
}

/// Resolve a round's songs from its id list or metadata filter.
async fn load_round_songs(
    state: &SharedState,
    config: &RoundConfigEntity,
) -> Result<Vec<SongEntity>, ServiceError> {
    let content = state.content();
    let mut songs = if !config.song_ids.is_empty() {
        content.find_songs_by_ids(config.song_ids.clone()).await?
    } else if let Some(filter) = config.filter.clone() {
        let mut filter = filter;
        filter.media_type.get_or_insert(config.media_type);
        content.find_songs_by_filter(filter).await?
    } else {
        return Err(ServiceError::Configuration(
            "round has no song ids and no filter".into(),
        ));
    };

    if config.shuffle {
        songs.shuffle(&mut rng());
    }
    if let Some(limit) = config.song_limit {
        songs.truncate(limit);
    }
    if songs.is_empty() {
        return Err(ServiceError::Configuration(
            "no songs match the round configuration".into(),
        ));
    }

    Ok(songs)
}

/// Prepare and play song `song_index` of the current round.
pub async fn start_song(
    state: &SharedState,
    room_id: &str,
    song_index: usize,
) -> Result<(), ServiceError> {
    let (mut song, round_songs, round) = {
        let _guard = state.lock_room(room_id).await;
        state
            .store()
            .with_game(room_id, |game| {
                let round = &game.round;
                ensure_song_startable(round, song_index)?;
                let round_songs: Vec<SongEntity> =
                    round.songs.iter().map(|song| song.song.clone()).collect();
                let header = Round {
                    songs: Vec::new(),
                    ..round.clone()
                };
                Ok::<_, ServiceError>((round.songs[song_index].clone(), round_songs, header))
            })
            .ok_or_else(|| ServiceError::NoActiveGame(room_id.to_string()))??
    };

    let choices = state.choices();
    round
        .mode
        .rules()
        .start_song(
            &mut song,
            &round_songs,
            round.media_type,
            &round.params,
            choices.as_ref(),
        )
        .await;

    let _guard = state.lock_room(room_id).await;
    let snapshot = state
        .store()
        .with_game_mut(room_id, |game| {
            let current = &mut game.round;
            if current.session_id != round.session_id || current.index != round.index {
                return Err(ServiceError::InvalidState(
                    "round changed while preparing the song".into(),
                ));
            }
            ensure_song_startable(current, song_index)?;

            song.start(Instant::now())?;
            current.songs[song_index] = song;
            current.current_song_index = Some(song_index);
            Ok::<_, ServiceError>(current.clone())
        })
        .ok_or_else(|| ServiceError::NoActiveGame(room_id.to_string()))??;

    let context = snapshot.song_context(song_index);
    state.timers().start_song_timer(
        room_id,
        context,
        Duration::from_secs(snapshot.params.song_duration_secs),
        song_timeout_callback(state, room_id, context),
    );

    info!(
        room_id = %room_id,
        round_index = snapshot.index,
        song_index,
        song_id = %snapshot.songs[song_index].song.id,
        "song started"
    );
    broadcast_song_started(state, room_id, &snapshot, song_index);

    Ok(())
}

fn ensure_song_startable(round: &Round, song_index: usize) -> Result<(), ServiceError> {
    if round.status != RoundStatus::Active {
        return Err(ServiceError::InvalidState("round is not active".into()));
    }
    let song = round
        .songs
        .get(song_index)
        .ok_or_else(|| ServiceError::NotFound(format!("song {song_index}")))?;
    if song.status != SongStatus::Pending {
        return Err(ServiceError::InvalidState(format!(
            "song {song_index} has already been played"
        )));
    }
    if round.current_song().is_some_and(RoundSong::is_live) {
        return Err(ServiceError::InvalidState("another song is playing".into()));
    }
    Ok(())
}

/// End song `song_index` of the current round. Ending a finished song is a no-op.
pub async fn end_song(
    state: &SharedState,
    room_id: &str,
    song_index: usize,
) -> Result<(), ServiceError> {
    let _guard = state.lock_room(room_id).await;
    end_song_locked(state, room_id, song_index).map(|_| ())
}

/// End the song `context` points at, unless the room moved on meanwhile.
pub(crate) async fn end_song_if_current(
    state: &SharedState,
    room_id: &str,
    context: SongTimerContext,
) -> Result<bool, ServiceError> {
    let _guard = state.lock_room(room_id).await;
    let current = state
        .store()
        .with_game(room_id, |game| {
            game.round.status == RoundStatus::Active && game.round.is_current(&context)
        })
        .unwrap_or(false);
    if !current {
        return Ok(false);
    }
    end_song_locked(state, room_id, context.song_index)
}

/// Finish a live song, reveal it and schedule what comes next. Caller holds the room gate.
///
/// Returns `false` when the song was already finished.
pub(crate) fn end_song_locked(
    state: &SharedState,
    room_id: &str,
    song_index: usize,
) -> Result<bool, ServiceError> {
    let snapshot = state
        .store()
        .with_game_mut(room_id, |game| {
            let ActiveGame { session, round } = game;
            let mode = round.mode;
            let song = round
                .songs
                .get_mut(song_index)
                .ok_or_else(|| ServiceError::NotFound(format!("song {song_index}")))?;
            match song.status {
                SongStatus::Finished => return Ok(None),
                SongStatus::Pending => {
                    return Err(ServiceError::InvalidState(format!(
                        "song {song_index} has not started"
                    )));
                }
                SongStatus::Playing | SongStatus::Answering => {}
            }

            mode.rules().end_song(song)?;
            if session.status == SessionStatus::Paused {
                session.apply(SessionEvent::Resume)?;
            }
            Ok::<_, ServiceError>(Some(round.clone()))
        })
        .ok_or_else(|| ServiceError::NoActiveGame(room_id.to_string()))??;

    let Some(round) = snapshot else {
        return Ok(false);
    };

    state.timers().clear_song_timer(room_id);
    state.timers().clear_answer_timer(room_id);

    info!(room_id = %room_id, round_index = round.index, song_index, "song ended");
    broadcast_song_ended(state, room_id, &round, song_index);

    let context = round.song_context(song_index);
    state.timers().schedule_reveal(
        room_id,
        state.config().reveal_delay,
        reveal_callback(state, room_id, context),
    );

    Ok(true)
}

/// Finalize the current round; the game ends with it when it is the last one.
pub async fn end_round(state: &SharedState, room_id: &str) -> Result<(), ServiceError> {
    finish_round(state, room_id, false).await
}

/// Master-triggered termination. Without a game in progress only the room status changes.
pub async fn end_game(state: &SharedState, room_id: &str) -> Result<(), ServiceError> {
    match finish_round(state, room_id, true).await {
        Err(ServiceError::NoActiveGame(_)) => {
            state
                .content()
                .update_room_status(room_id, RoomStatus::Finished)
                .await
                .map_err(|err| match err {
                    StorageError::NotFound(message) => ServiceError::NotFound(message),
                    other => ServiceError::Unavailable(other),
                })?;
            info!(room_id = %room_id, "room finished without an active game");
            Ok(())
        }
        other => other,
    }
}

async fn finish_round(state: &SharedState, room_id: &str, force: bool) -> Result<(), ServiceError> {
    let guard = state.lock_room(room_id).await;
    let ActiveGame {
        mut session,
        mut round,
    } = state
        .store()
        .active_game(room_id)
        .ok_or_else(|| ServiceError::NoActiveGame(room_id.to_string()))?;

    match round.status {
        RoundStatus::Finished if !force => return Ok(()),
        RoundStatus::Pending if !force => {
            return Err(ServiceError::InvalidState("round is still loading".into()));
        }
        _ => {}
    }

    state.timers().clear_all_timers(room_id);

    if let Some(song_index) = round.current_song_index {
        let mode = round.mode;
        if let Some(song) = round.songs.get_mut(song_index).filter(|song| song.is_live()) {
            mode.rules().end_song(song)?;
            broadcast_song_ended(state, room_id, &round, song_index);
        }
    }

    let game_over = force || session.is_last_round(round.index);
    if round.status == RoundStatus::Active {
        round.status = RoundStatus::Finished;
        let rankings = rank_round(&session, &round);
        info!(
            room_id = %room_id,
            round_index = round.index,
            forced = force,
            "round ended"
        );
        broadcast_round_ended(state, &session, &round, rankings, game_over);
        session.finished_rounds.push(round.clone());
    }

    if game_over {
        session.apply(SessionEvent::Finish)?;
        let rankings = rank_rounds(&session, &session.finished_rounds);
        broadcast_game_ended(state, &session, rankings);
        state.store().remove_session(room_id);
        info!(room_id = %room_id, session_id = %session.id, "game ended");
        drop(guard);
        state.release_room_gate(room_id);
        update_room_status(state, room_id, RoomStatus::Finished).await;
    } else {
        session.apply(SessionEvent::RoundFinished)?;
        state.store().register_session(room_id, session, round);
        drop(guard);
        update_room_status(state, room_id, RoomStatus::BetweenRounds).await;
    }

    Ok(())
}

/// Suspend the song countdown of a room, along with the countdown of a player answering.
pub async fn pause_game(state: &SharedState, room_id: &str) -> Result<(), ServiceError> {
    let _guard = state.lock_room(room_id).await;
    let status = state
        .store()
        .with_game(room_id, |game| game.session.status)
        .ok_or_else(|| ServiceError::NoActiveGame(room_id.to_string()))?;
    if status != SessionStatus::Playing {
        return Err(ServiceError::InvalidState(format!(
            "cannot pause a game that is {status:?}"
        )));
    }
    if !state.timers().pause_song_timer(room_id) {
        return Err(ServiceError::InvalidState("no song is playing".into()));
    }
    let answer_paused = state.timers().pause_answer_timer(room_id);

    state
        .store()
        .with_game_mut(room_id, |game| game.session.apply(SessionEvent::Pause))
        .ok_or_else(|| ServiceError::NoActiveGame(room_id.to_string()))??;
    info!(room_id = %room_id, answer_paused, "game paused");
    Ok(())
}

/// Resume the countdowns of a room with the time they had left.
pub async fn resume_game(state: &SharedState, room_id: &str) -> Result<(), ServiceError> {
    let _guard = state.lock_room(room_id).await;
    state
        .store()
        .with_game_mut(room_id, |game| game.session.apply(SessionEvent::Resume))
        .ok_or_else(|| ServiceError::NoActiveGame(room_id.to_string()))??;

    if !state.timers().resume_song_timer(room_id) {
        debug!(room_id = %room_id, "no paused song timer to resume");
    }
    state.timers().resume_answer_timer(room_id);
    info!(room_id = %room_id, "game resumed");
    Ok(())
}

/// Drop everything the engine holds for a room. Idempotent.
pub async fn teardown_room(state: &SharedState, room_id: &str) -> bool {
    let existed = {
        let _guard = state.lock_room(room_id).await;
        state.timers().clear_all_timers(room_id);
        state.store().remove_session(room_id).is_some()
    };
    state.hubs().remove(room_id);
    state.release_room_gate(room_id);
    if existed {
        info!(room_id = %room_id, "room torn down");
    }
    existed
}

async fn update_room_status(state: &SharedState, room_id: &str, status: RoomStatus) {
    if let Err(err) = state.content().update_room_status(room_id, status).await {
        warn!(
            room_id = %room_id,
            status = ?status,
            error = %err,
            "failed to update room status"
        );
    }
}

fn song_timeout_callback(
    state: &SharedState,
    room_id: &str,
    context: SongTimerContext,
) -> TimerCallback {
    let weak = state.downgrade();
    let room_id = room_id.to_string();
    Arc::new(move || song_timeout(weak.clone(), room_id.clone(), context))
}

fn song_timeout(
    state: Weak<AppState>,
    room_id: String,
    context: SongTimerContext,
) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        let Some(state) = state.upgrade() else {
            return;
        };
        match end_song_if_current(&state, &room_id, context).await {
            Ok(true) => info!(
                room_id = %room_id,
                song_index = context.song_index,
                "song timer expired"
            ),
            Ok(false) => debug!(room_id = %room_id, "stale song timer ignored"),
            Err(err) => warn!(room_id = %room_id, error = %err, "failed to end song on timeout"),
        }
    })
}

fn reveal_callback(state: &SharedState, room_id: &str, context: SongTimerContext) -> TimerCallback {
    let weak = state.downgrade();
    let room_id = room_id.to_string();
    Arc::new(move || continue_after_reveal(weak.clone(), room_id.clone(), context))
}

fn continue_after_reveal(
    state: Weak<AppState>,
    room_id: String,
    context: SongTimerContext,
) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        let Some(state) = state.upgrade() else {
            return;
        };

        let next = {
            let _guard = state.lock_room(&room_id).await;
            state
                .store()
                .with_game(&room_id, |game| {
                    let round = &game.round;
                    if round.status != RoundStatus::Active || !round.is_current(&context) {
                        return None;
                    }
                    if round.mode.rules().is_round_complete(round) {
                        return Some(Continuation::EndRound);
                    }
                    Some(
                        round
                            .next_pending_song_index()
                            .map_or(Continuation::EndRound, Continuation::NextSong),
                    )
                })
                .flatten()
        };

        let result = match next {
            Some(Continuation::NextSong(song_index)) => {
                start_song(&state, &room_id, song_index).await
            }
            Some(Continuation::EndRound) => end_round(&state, &room_id).await,
            None => {
                debug!(room_id = %room_id, "stale reveal continuation ignored");
                Ok(())
            }
        };
        if let Err(err) = result {
            warn!(room_id = %room_id, error = %err, "failed to continue after reveal");
        }
    })
}
