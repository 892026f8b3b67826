//! DTO definitions used by the room REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::MediaType,
    dto::validation::validate_identifier,
    modes::{BuzzRejection, ModeKind, params::GameplayParams},
    state::game::AnswerType,
};

/// Request to start a configured round of a session.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StartRoundRequest {
    /// Session whose round to start.
    pub session_id: Uuid,
    /// Zero-based index of the round in the session.
    #[validate(range(max = 255))]
    pub round_index: usize,
}

/// A player claims the right to answer.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BuzzRequestBody {
    /// Buzzing player.
    #[validate(custom(function = "validate_identifier"))]
    pub player_id: String,
    /// Client clock at the time of the buzz, in milliseconds.
    pub client_timestamp_ms: i64,
}

/// A player submits an answer.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AnswerRequest {
    /// Answering player.
    #[validate(custom(function = "validate_identifier"))]
    pub player_id: String,
    /// Field(s) the answer targets.
    pub answer_type: AnswerType,
    /// Answer text or chosen option.
    #[validate(length(min = 1, max = 256))]
    pub value: String,
}

/// Round as started by the orchestrator.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundSummary {
    /// Session the round belongs to.
    pub session_id: Uuid,
    /// Position of the round in its session.
    pub round_index: usize,
    /// Rule set of the round.
    pub mode: ModeKind,
    /// Kind of content played.
    pub media_type: MediaType,
    /// Songs selected for the round.
    pub song_count: usize,
    /// Resolved gameplay parameters.
    pub params: GameplayParams,
}

/// Outcome of a buzz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BuzzResponse {
    /// Whether the player now holds the slot.
    pub accepted: bool,
    /// Why the buzz had no effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<BuzzRejection>,
    /// Player who lost the slot to this buzz.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub displaced_player_id: Option<String>,
}

impl BuzzResponse {
    /// Buzz that took the slot.
    pub fn accepted(displaced_player_id: Option<String>) -> Self {
        Self {
            accepted: true,
            rejection: None,
            displaced_player_id,
        }
    }

    /// Buzz that had no effect.
    pub fn rejected(reason: BuzzRejection) -> Self {
        Self {
            accepted: false,
            rejection: Some(reason),
            displaced_player_id: None,
        }
    }
}

/// Verdict returned to the answering player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AnswerResponse {
    /// Whether the answer matched.
    pub is_correct: bool,
    /// Points added to the round score.
    pub points_awarded: i32,
    /// The player may not buzz again on this song.
    pub locked_out: bool,
    /// Whether the answer resolved the song.
    pub song_ended: bool,
}

/// Generic acknowledgement for master actions.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Room the action targeted.
    pub room_id: String,
    /// Human-readable outcome.
    pub message: String,
}

impl ActionResponse {
    /// Acknowledge an action on `room_id`.
    pub fn new(room_id: &str, message: impl Into<String>) -> Self {
        Self {
            room_id: room_id.to_string(),
            message: message.into(),
        }
    }
}
