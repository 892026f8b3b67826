//! Player inputs: buzzes, answers, answer timeouts and connectivity changes.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use futures::future::BoxFuture;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    dto::{
        events::{AnswerResultEvent, PlayerBuzzedEvent},
        room::{AnswerResponse, BuzzResponse},
    },
    error::ServiceError,
    modes::{AnswerRejection, AnswerSubmission, BuzzOutcome, BuzzRejection, BuzzRequest},
    services::{
        orchestrator::end_song_locked,
        room_events::{
            broadcast_answer_result, broadcast_artist_choices, broadcast_player_buzzed,
            broadcast_score_updated,
        },
    },
    state::{
        AppState, SharedState,
        game::{Answer, Choice, GameSession, RoundStatus, SessionPlayer},
        state_machine::{SessionStatus, SongStatus},
        store::ActiveGame,
        timers::{AnswerTimerContext, SongTimerContext, TimerCallback},
    },
};

/// Buzz accepted by the arbitration policy, with everything needed for its side effects.
struct AcceptedBuzz {
    context: SongTimerContext,
    turn: u64,
    player_name: String,
    displaced: Option<String>,
    followup: Option<Vec<Choice>>,
    answer_timer: Duration,
}

enum BuzzVerdict {
    Accepted(AcceptedBuzz),
    Rejected(BuzzRejection),
}

/// Answer recorded on the current song.
struct RecordedAnswer {
    context: SongTimerContext,
    turn: u64,
    player_name: String,
    is_correct: bool,
    points_awarded: i32,
    locked_out: bool,
    slot_kept: bool,
    slot_released: bool,
    round_score: i32,
    followup: Option<Vec<Choice>>,
    should_end: bool,
    answer_timer: Duration,
}

/// Claim the answerer slot of the song playing in `room_id`.
pub async fn handle_buzz(
    state: &SharedState,
    room_id: &str,
    player_id: &str,
    client_timestamp_ms: i64,
) -> Result<BuzzResponse, ServiceError> {
    let _guard = state.lock_room(room_id).await;
    let window = state.config().buzz_arbitration_window;

    let verdict = state
        .store()
        .with_game_mut(room_id, |game| {
            let ActiveGame { session, round } = game;
            let player = require_contestant(session, player_id)?;
            if !player.connected {
                return Ok(BuzzVerdict::Rejected(BuzzRejection::Disconnected));
            }
            let player_name = player.name.clone();
            if session.status == SessionStatus::Paused {
                return Ok(BuzzVerdict::Rejected(BuzzRejection::GamePaused));
            }
            let Some(song_index) = round
                .current_song_index
                .filter(|_| round.status == RoundStatus::Active)
            else {
                return Ok(BuzzVerdict::Rejected(BuzzRejection::SongNotPlaying));
            };

            let mode = round.mode;
            let context = round.song_context(song_index);
            let answer_timer = Duration::from_secs(round.params.answer_timer_secs);
            let Some(song) = round.songs.get_mut(song_index) else {
                return Ok(BuzzVerdict::Rejected(BuzzRejection::SongNotPlaying));
            };

            let request = BuzzRequest {
                player_id,
                client_timestamp_ms,
                now: Instant::now(),
                window,
            };
            let displaced = match mode.rules().handle_buzz(request, song) {
                BuzzOutcome::Accepted => None,
                BuzzOutcome::Preempted { displaced } => Some(displaced),
                BuzzOutcome::Rejected(reason) => return Ok(BuzzVerdict::Rejected(reason)),
            };

            Ok::<_, ServiceError>(BuzzVerdict::Accepted(AcceptedBuzz {
                context,
                turn: song.turn,
                player_name,
                displaced,
                followup: mode
                    .rules()
                    .buzz_followup_choices(song)
                    .map(|set| set.choices.clone()),
                answer_timer,
            }))
        })
        .ok_or_else(|| ServiceError::NoActiveGame(room_id.to_string()))??;

    let accepted = match verdict {
        BuzzVerdict::Rejected(reason) => {
            debug!(room_id = %room_id, player_id = %player_id, reason = ?reason, "buzz rejected");
            return Ok(BuzzResponse::rejected(reason));
        }
        BuzzVerdict::Accepted(accepted) => accepted,
    };

    start_answer_timer(state, room_id, player_id, &accepted);

    info!(
        room_id = %room_id,
        player_id = %player_id,
        song_index = accepted.context.song_index,
        displaced = ?accepted.displaced,
        "buzz accepted"
    );
    broadcast_player_buzzed(
        state,
        room_id,
        PlayerBuzzedEvent {
            player_id: player_id.to_string(),
            player_name: accepted.player_name.clone(),
            song_index: accepted.context.song_index,
            answer_timer_secs: accepted.answer_timer.as_secs(),
            displaced_player_id: accepted.displaced.clone(),
        },
    );
    if let Some(choices) = &accepted.followup {
        broadcast_artist_choices(
            state,
            room_id,
            player_id,
            accepted.context.song_index,
            choices,
        );
    }

    Ok(BuzzResponse::accepted(accepted.displaced))
}

fn start_answer_timer(state: &SharedState, room_id: &str, player_id: &str, buzz: &AcceptedBuzz) {
    let context = AnswerTimerContext {
        song: buzz.context,
        player_id: player_id.to_string(),
        turn: buzz.turn,
    };
    let callback = answer_timeout_callback(state, room_id, context.clone());
    state
        .timers()
        .start_answer_timer(room_id, context, buzz.answer_timer, callback);
}

/// Judge an answer, record it and apply its consequences.
///
/// Score persistence happens once the room gate is released and never fails the answer.
pub async fn handle_answer(
    state: &SharedState,
    room_id: &str,
    player_id: &str,
    submission: AnswerSubmission,
) -> Result<AnswerResponse, ServiceError> {
    let (recorded, song_ended) = {
        let _guard = state.lock_room(room_id).await;

        let recorded = state
            .store()
            .with_game_mut(room_id, |game| {
                let ActiveGame { session, round } = game;
                let player = require_contestant(session, player_id)?;
                if !player.connected {
                    return Err(ServiceError::InvalidState(format!(
                        "player {player_id} is disconnected"
                    )));
                }
                let player_name = player.name.clone();
                if session.status == SessionStatus::Paused {
                    return Err(ServiceError::InvalidState("game is paused".into()));
                }
                let song_index = round
                    .current_song_index
                    .filter(|_| round.status == RoundStatus::Active)
                    .ok_or(AnswerRejection::SongNotPlaying)?;

                let mode = round.mode;
                let params = round.params.clone();
                let context = round.song_context(song_index);
                let active_player_ids = session.active_player_ids();
                let song = round
                    .songs
                    .get_mut(song_index)
                    .ok_or(AnswerRejection::SongNotPlaying)?;

                let outcome = mode
                    .rules()
                    .handle_answer(player_id, &submission, song, &params)?;

                let time_to_answer_ms = song.elapsed_ms(Instant::now());
                song.record_answer(Answer {
                    player_id: player_id.to_string(),
                    answer_type: submission.answer_type,
                    value: submission.value.clone(),
                    is_correct: outcome.is_correct,
                    points_awarded: outcome.points_awarded,
                    time_to_answer_ms,
                });
                if outcome.lock_out_player {
                    song.lock_out(player_id);
                }
                let followup = outcome
                    .show_followup_choices
                    .then(|| mode.rules().buzz_followup_choices(song))
                    .flatten()
                    .map(|set| set.choices.clone());
                if outcome.release_slot {
                    song.release_slot()?;
                }
                let slot_kept = song.active_player_id.as_deref() == Some(player_id);
                let turn = song.turn;
                let should_end = mode.rules().should_end_song(song, &active_player_ids);
                let round_score = round.add_points(player_id, outcome.points_awarded);

                Ok::<_, ServiceError>(RecordedAnswer {
                    context,
                    turn,
                    player_name,
                    is_correct: outcome.is_correct,
                    points_awarded: outcome.points_awarded,
                    locked_out: outcome.lock_out_player,
                    slot_kept,
                    slot_released: outcome.release_slot,
                    round_score,
                    followup,
                    should_end,
                    answer_timer: Duration::from_secs(params.answer_timer_secs),
                })
            })
            .ok_or_else(|| ServiceError::NoActiveGame(room_id.to_string()))??;

        if recorded.slot_kept {
            // the holder moves on to the next field with a fresh countdown
            let context = AnswerTimerContext {
                song: recorded.context,
                player_id: player_id.to_string(),
                turn: recorded.turn,
            };
            let callback = answer_timeout_callback(state, room_id, context.clone());
            state
                .timers()
                .start_answer_timer(room_id, context, recorded.answer_timer, callback);
        } else if recorded.slot_released {
            state.timers().clear_answer_timer(room_id);
        }

        info!(
            room_id = %room_id,
            player_id = %player_id,
            song_index = recorded.context.song_index,
            correct = recorded.is_correct,
            points = recorded.points_awarded,
            "answer recorded"
        );
        broadcast_answer_result(
            state,
            room_id,
            AnswerResultEvent {
                player_id: player_id.to_string(),
                player_name: recorded.player_name.clone(),
                song_index: recorded.context.song_index,
                answer_type: Some(submission.answer_type),
                value: Some(submission.value.clone()),
                is_correct: recorded.is_correct,
                points_awarded: recorded.points_awarded,
                locked_out: recorded.locked_out,
                timed_out: false,
            },
        );
        if let Some(choices) = &recorded.followup {
            broadcast_artist_choices(
                state,
                room_id,
                player_id,
                recorded.context.song_index,
                choices,
            );
        }

        let song_ended = recorded.should_end
            && end_song_locked(state, room_id, recorded.context.song_index)?;
        (recorded, song_ended)
    };

    if recorded.points_awarded != 0 {
        let total = match state
            .content()
            .add_player_score(player_id, recorded.points_awarded)
            .await
        {
            Ok(total) => Some(total),
            Err(err) => {
                warn!(
                    room_id = %room_id,
                    player_id = %player_id,
                    error = %err,
                    "failed to persist player score"
                );
                None
            }
        };
        broadcast_score_updated(state, room_id, player_id, recorded.round_score, total);
    }

    Ok(AnswerResponse {
        is_correct: recorded.is_correct,
        points_awarded: recorded.points_awarded,
        locked_out: recorded.locked_out,
        song_ended,
    })
}

/// Mark a player as gone. Holding the slot costs them the current song.
pub async fn handle_player_disconnect(
    state: &SharedState,
    room_id: &str,
    player_id: &str,
) -> Result<(), ServiceError> {
    let _guard = state.lock_room(room_id).await;
    let outcome = state
        .store()
        .with_game_mut(room_id, |game| {
            let ActiveGame { session, round } = game;
            let player = session
                .players
                .get_mut(player_id)
                .ok_or_else(|| ServiceError::NotFound(format!("player {player_id}")))?;
            player.connected = false;
            let active_player_ids = session.active_player_ids();

            let Some(song_index) = round
                .current_song_index
                .filter(|_| round.status == RoundStatus::Active)
            else {
                return Ok((false, None));
            };
            let mode = round.mode;
            let Some(song) = round.songs.get_mut(song_index).filter(|song| song.is_live()) else {
                return Ok((false, None));
            };

            let was_answering = song.active_player_id.as_deref() == Some(player_id);
            if was_answering {
                song.lock_out(player_id);
                song.release_slot()?;
            }
            let should_end = mode.rules().should_end_song(song, &active_player_ids);
            Ok::<_, ServiceError>((was_answering, should_end.then_some(song_index)))
        })
        .ok_or_else(|| ServiceError::NoActiveGame(room_id.to_string()))??;

    let (was_answering, end_song_index) = outcome;
    if was_answering {
        state.timers().clear_answer_timer(room_id);
    }
    info!(
        room_id = %room_id,
        player_id = %player_id,
        was_answering,
        "player disconnected"
    );

    if let Some(song_index) = end_song_index {
        end_song_locked(state, room_id, song_index)?;
    }
    Ok(())
}

/// Mark a player as connected again.
pub async fn handle_player_reconnect(
    state: &SharedState,
    room_id: &str,
    player_id: &str,
) -> Result<(), ServiceError> {
    let _guard = state.lock_room(room_id).await;
    state
        .store()
        .with_game_mut(room_id, |game| {
            let player = game
                .session
                .players
                .get_mut(player_id)
                .ok_or_else(|| ServiceError::NotFound(format!("player {player_id}")))?;
            player.connected = true;
            Ok::<_, ServiceError>(())
        })
        .ok_or_else(|| ServiceError::NoActiveGame(room_id.to_string()))??;

    info!(room_id = %room_id, player_id = %player_id, "player reconnected");
    Ok(())
}

/// Contestant of the session; masters never compete.
fn require_contestant<'a>(
    session: &'a GameSession,
    player_id: &str,
) -> Result<&'a SessionPlayer, ServiceError> {
    let player = session
        .players
        .get(player_id)
        .ok_or_else(|| ServiceError::NotFound(format!("player {player_id}")))?;
    if player.is_master {
        return Err(ServiceError::InvalidInput(
            "the master cannot take part in the game".into(),
        ));
    }
    Ok(player)
}

fn answer_timeout_callback(
    state: &SharedState,
    room_id: &str,
    context: AnswerTimerContext,
) -> TimerCallback {
    let weak = state.downgrade();
    let room_id = room_id.to_string();
    Arc::new(move || answer_timeout(weak.clone(), room_id.clone(), context.clone()))
}

fn answer_timeout(
    state: Weak<AppState>,
    room_id: String,
    context: AnswerTimerContext,
) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        let Some(state) = state.upgrade() else {
            return;
        };
        if let Err(err) = expire_answer(&state, &room_id, &context).await {
            warn!(room_id = %room_id, error = %err, "failed to expire answer timer");
        }
    })
}

/// The holder ran out of time: lock them out and hand the song back to the others.
async fn expire_answer(
    state: &SharedState,
    room_id: &str,
    context: &AnswerTimerContext,
) -> Result<(), ServiceError> {
    let _guard = state.lock_room(room_id).await;
    let player_id = context.player_id.as_str();

    let expired = state
        .store()
        .with_game_mut(room_id, |game| {
            let ActiveGame { session, round } = game;
            if round.status != RoundStatus::Active || !round.is_current(&context.song) {
                return Ok(None);
            }
            let mode = round.mode;
            let active_player_ids = session.active_player_ids();
            let player_name = session.player_name(player_id);
            let Some(song) = round.songs.get_mut(context.song.song_index) else {
                return Ok(None);
            };
            if song.status != SongStatus::Answering
                || song.active_player_id.as_deref() != Some(player_id)
                || song.turn != context.turn
            {
                return Ok(None);
            }

            song.lock_out(player_id);
            song.release_slot()?;
            let should_end = mode.rules().should_end_song(song, &active_player_ids);
            Ok::<_, ServiceError>(Some((player_name, should_end)))
        })
        .ok_or_else(|| ServiceError::NoActiveGame(room_id.to_string()))??;

    let Some((player_name, should_end)) = expired else {
        debug!(room_id = %room_id, player_id = %player_id, "stale answer timer ignored");
        return Ok(());
    };

    info!(
        room_id = %room_id,
        player_id = %player_id,
        song_index = context.song.song_index,
        "answer timer expired"
    );
    broadcast_answer_result(
        state,
        room_id,
        AnswerResultEvent {
            player_id: player_id.to_string(),
            player_name,
            song_index: context.song.song_index,
            answer_type: None,
            value: None,
            is_correct: false,
            points_awarded: 0,
            locked_out: true,
            timed_out: true,
        },
    );

    if should_end {
        end_song_locked(state, room_id, context.song.song_index)?;
    }
    Ok(())
}
