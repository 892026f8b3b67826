use serde::Serialize;
use uuid::Uuid;

use crate::{
    dao::models::MediaType,
    modes::{ModeKind, params::GameplayParams},
    state::game::{AnswerField, AnswerType, FinalScore},
};

/// Domain events fanned out to every client of a room.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum RoomEvent {
    /// First event of a song.
    #[serde(rename = "song:started")]
    SongStarted(SongStartedEvent),
    /// Song finished, ground truth revealed.
    #[serde(rename = "song:ended")]
    SongEnded(SongEndedEvent),
    /// Round loaded and about to play its first song.
    #[serde(rename = "round:started")]
    RoundStarted(RoundStartedEvent),
    /// Round finalized with its rankings.
    #[serde(rename = "round:ended")]
    RoundEnded(RoundEndedEvent),
    /// Game over with cumulative rankings.
    #[serde(rename = "game:ended")]
    GameEnded(GameEndedEvent),
    /// Somebody holds the answerer slot.
    #[serde(rename = "player:buzzed")]
    PlayerBuzzed(PlayerBuzzedEvent),
    /// Verdict of an answer or an answer timeout.
    #[serde(rename = "answer:result")]
    AnswerResult(AnswerResultEvent),
    /// Artist choices for the answering player.
    #[serde(rename = "choices:artist")]
    ChoicesArtist(ChoicesEvent),
    /// Round and persistent score of a player changed.
    #[serde(rename = "score:updated")]
    ScoreUpdated(ScoreUpdatedEvent),
    /// Song countdown tick.
    #[serde(rename = "timer:song")]
    TimerSong(SongTimerEvent),
    /// Answer countdown tick.
    #[serde(rename = "timer:answer")]
    TimerAnswer(AnswerTimerEvent),
    /// Song countdown frozen.
    #[serde(rename = "game:paused")]
    GamePaused(PauseEvent),
    /// Song countdown restarted.
    #[serde(rename = "game:resumed")]
    GameResumed(PauseEvent),
}

impl RoomEvent {
    /// Wire name of the event, also used as the SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            RoomEvent::SongStarted(_) => "song:started",
            RoomEvent::SongEnded(_) => "song:ended",
            RoomEvent::RoundStarted(_) => "round:started",
            RoomEvent::RoundEnded(_) => "round:ended",
            RoomEvent::GameEnded(_) => "game:ended",
            RoomEvent::PlayerBuzzed(_) => "player:buzzed",
            RoomEvent::AnswerResult(_) => "answer:result",
            RoomEvent::ChoicesArtist(_) => "choices:artist",
            RoomEvent::ScoreUpdated(_) => "score:updated",
            RoomEvent::TimerSong(_) => "timer:song",
            RoomEvent::TimerAnswer(_) => "timer:answer",
            RoomEvent::GamePaused(_) => "game:paused",
            RoomEvent::GameResumed(_) => "game:resumed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// A song started playing.
pub struct SongStartedEvent {
    /// Round the song belongs to.
    pub round_index: usize,
    /// Position of the song in its round.
    pub song_index: usize,
    /// Catalogue identifier.
    pub song_id: String,
    /// Kind of content to render.
    pub media_type: MediaType,
    /// Where clients fetch the content from.
    pub content_url: String,
    /// Length of the song countdown.
    pub duration_secs: u64,
    /// Title choices, for multiple-choice modes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_choices: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// A song ended; reveals the ground truth.
pub struct SongEndedEvent {
    /// Round the song belongs to.
    pub round_index: usize,
    /// Position of the song in its round.
    pub song_index: usize,
    /// Catalogue identifier.
    pub song_id: String,
    /// Ground-truth title.
    pub title: String,
    /// Ground-truth artist.
    pub artist: String,
    /// Fields somebody found before the song ended.
    pub found_fields: Vec<AnswerField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// A round finished loading.
pub struct RoundStartedEvent {
    /// Session the round belongs to.
    pub session_id: Uuid,
    /// Position of the round in its session.
    pub round_index: usize,
    /// Number of rounds in the session.
    pub round_count: usize,
    /// Rule set of the round.
    pub mode: ModeKind,
    /// Kind of content played.
    pub media_type: MediaType,
    /// Songs selected for the round.
    pub song_count: usize,
    /// Resolved gameplay parameters.
    pub params: GameplayParams,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// A round was finalized.
pub struct RoundEndedEvent {
    /// Session the round belongs to.
    pub session_id: Uuid,
    /// Position of the round in its session.
    pub round_index: usize,
    /// Round scores, best first.
    pub rankings: Vec<FinalScore>,
    /// Whether the game ends with this round.
    pub is_last_round: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// The game is over; rankings are cumulative over every finished round.
pub struct GameEndedEvent {
    /// Finished session.
    pub session_id: Uuid,
    /// Scores summed over every finished round, best first.
    pub rankings: Vec<FinalScore>,
    /// RFC 3339 timestamp.
    pub ended_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// A player took the answerer slot.
pub struct PlayerBuzzedEvent {
    /// Slot holder.
    pub player_id: String,
    /// Display name of the holder.
    pub player_name: String,
    /// Song being answered.
    pub song_index: usize,
    /// Time the holder has to answer.
    pub answer_timer_secs: u64,
    /// Player who lost the slot to an earlier-stamped buzz.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub displaced_player_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Verdict of an answer, or of an answer timeout.
pub struct AnswerResultEvent {
    /// Player the verdict is about.
    pub player_id: String,
    /// Display name of the player.
    pub player_name: String,
    /// Song being answered.
    pub song_index: usize,
    /// Absent for timeouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_type: Option<AnswerType>,
    /// Submitted text; absent for timeouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Whether the answer matched.
    pub is_correct: bool,
    /// Points added to the round score, negative for penalties.
    pub points_awarded: i32,
    /// The player may not buzz again on this song.
    pub locked_out: bool,
    /// The answer timer ran out.
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Second-phase choices exposed to the answering player.
pub struct ChoicesEvent {
    /// Player the choices are meant for.
    pub player_id: String,
    /// Song being answered.
    pub song_index: usize,
    /// Shuffled choices, exactly one of them right.
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Score change of a player.
pub struct ScoreUpdatedEvent {
    /// Player whose score changed.
    pub player_id: String,
    /// Score within the current round.
    pub round_score: i32,
    /// Persistent total; absent when the update could not be stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_score: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Remaining time of the song countdown, sent every second.
pub struct SongTimerEvent {
    /// Round the song belongs to.
    pub round_index: usize,
    /// Song being played.
    pub song_index: usize,
    /// Whole seconds left, rounded up.
    pub remaining_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Remaining time of the answer countdown, sent every second.
pub struct AnswerTimerEvent {
    /// Slot holder.
    pub player_id: String,
    /// Song being answered.
    pub song_index: usize,
    /// Whole seconds left, rounded up.
    pub remaining_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Song countdown frozen or restarted by the master.
pub struct PauseEvent {
    /// Round the song belongs to.
    pub round_index: usize,
    /// Song whose countdown changed.
    pub song_index: usize,
    /// Whole seconds left on the countdown.
    pub remaining_secs: u64,
}
