use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, post},
};
use axum_valid::Valid;

use crate::{
    dto::room::{
        ActionResponse, AnswerRequest, AnswerResponse, BuzzRequestBody, BuzzResponse,
        RoundSummary, StartRoundRequest,
    },
    error::AppError,
    modes::AnswerSubmission,
    services::{gameplay, orchestrator},
    state::SharedState,
};

/// Routes driving the game of a room.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms/{room_id}/rounds", post(start_round))
        .route("/rooms/{room_id}/rounds/end", post(end_round))
        .route("/rooms/{room_id}/songs/{song_index}/end", post(end_song))
        .route("/rooms/{room_id}/buzz", post(buzz))
        .route("/rooms/{room_id}/answer", post(answer))
        .route("/rooms/{room_id}/pause", post(pause_game))
        .route("/rooms/{room_id}/resume", post(resume_game))
        .route("/rooms/{room_id}/end", post(end_game))
        .route(
            "/rooms/{room_id}/players/{player_id}/disconnect",
            post(player_disconnect),
        )
        .route(
            "/rooms/{room_id}/players/{player_id}/reconnect",
            post(player_reconnect),
        )
        .route("/rooms/{room_id}/game", delete(teardown_room))
}

/// Start a configured round and play its first song.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/rounds",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    request_body = StartRoundRequest,
    responses(
        (status = 200, description = "Round started", body = RoundSummary),
        (status = 400, description = "Round has no usable songs"),
        (status = 404, description = "Room, session or round not found"),
        (status = 409, description = "A round is already running")
    )
)]
pub async fn start_round(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    Valid(Json(payload)): Valid<Json<StartRoundRequest>>,
) -> Result<Json<RoundSummary>, AppError> {
    let summary =
        orchestrator::start_round(&state, &room_id, payload.session_id, payload.round_index)
            .await?;
    Ok(Json(summary))
}

/// Finalize the current round; the game ends with its last round.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/rounds/end",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Round ended", body = ActionResponse),
        (status = 409, description = "No game in progress")
    )
)]
pub async fn end_round(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    orchestrator::end_round(&state, &room_id).await?;
    Ok(Json(ActionResponse::new(&room_id, "round ended")))
}

/// Skip the song being played.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/songs/{song_index}/end",
    tag = "rooms",
    params(
        ("room_id" = String, Path, description = "Room identifier"),
        ("song_index" = usize, Path, description = "Index of the song within the round")
    ),
    responses(
        (status = 200, description = "Song ended", body = ActionResponse),
        (status = 409, description = "Song is not playing")
    )
)]
pub async fn end_song(
    State(state): State<SharedState>,
    Path((room_id, song_index)): Path<(String, usize)>,
) -> Result<Json<ActionResponse>, AppError> {
    orchestrator::end_song(&state, &room_id, song_index).await?;
    Ok(Json(ActionResponse::new(&room_id, "song ended")))
}

/// Claim the answerer slot.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/buzz",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    request_body = BuzzRequestBody,
    responses(
        (status = 200, description = "Buzz processed", body = BuzzResponse),
        (status = 404, description = "Unknown player"),
        (status = 409, description = "No game in progress")
    )
)]
pub async fn buzz(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    Valid(Json(payload)): Valid<Json<BuzzRequestBody>>,
) -> Result<Json<BuzzResponse>, AppError> {
    let response = gameplay::handle_buzz(
        &state,
        &room_id,
        &payload.player_id,
        payload.client_timestamp_ms,
    )
    .await?;
    Ok(Json(response))
}

/// Submit an answer for the song being played.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/answer",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "Answer judged", body = AnswerResponse),
        (status = 400, description = "Answer not allowed for this song"),
        (status = 409, description = "Player cannot answer right now")
    )
)]
pub async fn answer(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    Valid(Json(payload)): Valid<Json<AnswerRequest>>,
) -> Result<Json<AnswerResponse>, AppError> {
    let submission = AnswerSubmission {
        answer_type: payload.answer_type,
        value: payload.value,
    };
    let response =
        gameplay::handle_answer(&state, &room_id, &payload.player_id, submission).await?;
    Ok(Json(response))
}

/// Freeze the song countdown and the countdown of a player answering.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/pause",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Game paused", body = ActionResponse),
        (status = 409, description = "Nothing to pause")
    )
)]
pub async fn pause_game(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    orchestrator::pause_game(&state, &room_id).await?;
    Ok(Json(ActionResponse::new(&room_id, "game paused")))
}

/// Restart the countdowns where they stopped.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/resume",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Game resumed", body = ActionResponse),
        (status = 409, description = "Game is not paused")
    )
)]
pub async fn resume_game(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    orchestrator::resume_game(&state, &room_id).await?;
    Ok(Json(ActionResponse::new(&room_id, "game resumed")))
}

/// Terminate the game of a room.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/end",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Game ended", body = ActionResponse),
        (status = 404, description = "Room not found")
    )
)]
pub async fn end_game(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    orchestrator::end_game(&state, &room_id).await?;
    Ok(Json(ActionResponse::new(&room_id, "game ended")))
}

/// Report a lost player connection.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/players/{player_id}/disconnect",
    tag = "players",
    params(
        ("room_id" = String, Path, description = "Room identifier"),
        ("player_id" = String, Path, description = "Player identifier")
    ),
    responses(
        (status = 200, description = "Disconnect handled", body = ActionResponse),
        (status = 404, description = "Unknown player")
    )
)]
pub async fn player_disconnect(
    State(state): State<SharedState>,
    Path((room_id, player_id)): Path<(String, String)>,
) -> Result<Json<ActionResponse>, AppError> {
    gameplay::handle_player_disconnect(&state, &room_id, &player_id).await?;
    Ok(Json(ActionResponse::new(&room_id, "player disconnected")))
}

/// Report a restored player connection.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/players/{player_id}/reconnect",
    tag = "players",
    params(
        ("room_id" = String, Path, description = "Room identifier"),
        ("player_id" = String, Path, description = "Player identifier")
    ),
    responses(
        (status = 200, description = "Reconnect handled", body = ActionResponse),
        (status = 404, description = "Unknown player")
    )
)]
pub async fn player_reconnect(
    State(state): State<SharedState>,
    Path((room_id, player_id)): Path<(String, String)>,
) -> Result<Json<ActionResponse>, AppError> {
    gameplay::handle_player_reconnect(&state, &room_id, &player_id).await?;
    Ok(Json(ActionResponse::new(&room_id, "player reconnected")))
}

/// Drop every runtime resource of a room.
#[utoipa::path(
    delete,
    path = "/rooms/{room_id}/game",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    responses((status = 200, description = "Room torn down", body = ActionResponse))
)]
pub async fn teardown_room(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
) -> Json<ActionResponse> {
    let message = if orchestrator::teardown_room(&state, &room_id).await {
        "room torn down"
    } else {
        "room had no game"
    };
    Json(ActionResponse::new(&room_id, message))
}
