//! Gameplay rule sets. Each round runs under exactly one [`GameMode`], chosen at round start.

/// Buzz, then pick the title and the artist among choices.
pub mod buzz_choice;
/// Choice set generation.
pub mod choices;
pub mod common;
/// Buzz, then type the answer.
pub mod fast_buzz;
pub mod matching;
pub mod params;
/// Everyone types, no buzzer.
pub mod typed_answer;

use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use utoipa::ToSchema;

use crate::{
    dao::{choices::ChoiceGenerator, models::MediaType, models::SongEntity},
    state::{
        game::{AnswerField, AnswerType, ChoiceSet, Round, RoundSong},
        state_machine::InvalidSongTransition,
    },
};

use self::{
    buzz_choice::BuzzChoice,
    fast_buzz::FastBuzz,
    params::{GameplayParams, ParamOverrides},
    typed_answer::TypedAnswer,
};

/// Serialised identifier of a mode, as found in round configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    /// Buzz, then answer in free text.
    FastBuzz,
    /// Buzz, then pick among generated choices.
    BuzzChoice,
    /// No buzzer; everyone types answers while the song plays.
    TypedAnswer,
}

/// Closed set of rule sets, resolved once per round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    /// See [`FastBuzz`].
    FastBuzz(FastBuzz),
    /// See [`BuzzChoice`].
    BuzzChoice(BuzzChoice),
    /// See [`TypedAnswer`].
    TypedAnswer(TypedAnswer),
}

impl GameMode {
    /// Rule set implementing `kind`.
    pub fn from_kind(kind: ModeKind) -> Self {
        match kind {
            ModeKind::FastBuzz => GameMode::FastBuzz(FastBuzz),
            ModeKind::BuzzChoice => GameMode::BuzzChoice(BuzzChoice),
            ModeKind::TypedAnswer => GameMode::TypedAnswer(TypedAnswer),
        }
    }

    /// Serialised identifier of the mode.
    pub fn kind(&self) -> ModeKind {
        self.rules().kind()
    }

    /// Borrow the rule set.
    pub fn rules(&self) -> &dyn ModeRules {
        match self {
            GameMode::FastBuzz(rules) => rules,
            GameMode::BuzzChoice(rules) => rules,
            GameMode::TypedAnswer(rules) => rules,
        }
    }
}

impl From<ModeKind> for GameMode {
    fn from(value: ModeKind) -> Self {
        GameMode::from_kind(value)
    }
}

/// A buzz as seen by the arbitration policy.
#[derive(Debug, Clone, Copy)]
pub struct BuzzRequest<'a> {
    /// Buzzing player.
    pub player_id: &'a str,
    /// Timestamp reported by the client, in milliseconds.
    pub client_timestamp_ms: i64,
    /// Server time at which the buzz is processed.
    pub now: Instant,
    /// How long after an acceptance an earlier-stamped buzz may still take the slot.
    pub window: Duration,
}

/// Verdict of the arbitration policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuzzOutcome {
    /// The player now holds the answerer slot.
    Accepted,
    /// The player took the slot from `displaced`, whose buzz carried a later timestamp.
    Preempted {
        /// Player who lost the slot.
        displaced: String,
    },
    /// The buzz had no effect.
    Rejected(BuzzRejection),
}

/// Reason a buzz was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BuzzRejection {
    /// The song is not playing.
    SongNotPlaying,
    /// The player is locked out of this song.
    LockedOut,
    /// Another player holds the slot and cannot be displaced.
    SlotTaken,
    /// The player already holds the slot.
    AlreadyAnswering,
    /// The round's mode has no buzzer.
    BuzzingDisabled,
    /// The master paused the game.
    GamePaused,
    /// The player is marked as disconnected.
    Disconnected,
}

/// An answer as submitted by a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSubmission {
    /// Field(s) the answer targets.
    pub answer_type: AnswerType,
    /// Raw submitted text.
    pub value: String,
}

/// Verdict of a mode on a submitted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    /// Whether the answer matched the ground truth.
    pub is_correct: bool,
    /// Points to add, negative under a penalty.
    pub points_awarded: i32,
    /// A second-phase choice set should now be exposed.
    pub show_followup_choices: bool,
    /// The player may not interact with this song anymore.
    pub lock_out_player: bool,
    /// The answerer slot is handed back to the song.
    pub release_slot: bool,
    /// Fields the answer found.
    pub fields_found: Vec<AnswerField>,
}

/// Reason an answer was refused without being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AnswerRejection {
    /// No song is accepting answers.
    #[error("song is not accepting answers")]
    SongNotPlaying,
    /// The player does not hold the slot.
    #[error("player does not hold the answerer slot")]
    NotAnswerer,
    /// The player is locked out of the song.
    #[error("player is locked out of this song")]
    LockedOut,
    /// Somebody already found that field.
    #[error("{0:?} has already been found")]
    FieldAlreadyFound(AnswerField),
    /// The mode has no use for that answer type.
    #[error("answer type {0:?} is not supported by this mode")]
    UnsupportedAnswerType(AnswerType),
    /// No choice set was generated for that field.
    #[error("no choices have been offered for {0:?} yet")]
    ChoicesNotOffered(AnswerField),
}

/// Contract every gameplay mode implements.
///
/// Rules only decide; the orchestrator owns timers, scores and broadcasts, and is the only
/// caller allowed to finish a song through [`ModeRules::end_song`].
pub trait ModeRules: Send + Sync {
    /// Mode this rule set implements.
    fn kind(&self) -> ModeKind;

    /// Mode-level overrides of the system defaults.
    fn default_params(&self) -> ParamOverrides;

    /// Hook run once the round's songs are loaded.
    fn start_round(&self, _round: &mut Round) {}

    /// Prepare a song before it starts playing, e.g. generate its choice sets.
    fn start_song<'a>(
        &'a self,
        song: &'a mut RoundSong,
        round_songs: &'a [SongEntity],
        media_type: MediaType,
        params: &'a GameplayParams,
        choices: &'a dyn ChoiceGenerator,
    ) -> BoxFuture<'a, ()>;

    /// Song playing, player not locked out, and nobody holding the slot.
    fn can_buzz(&self, player_id: &str, song: &RoundSong) -> bool;

    /// Arbitrate a buzz against the current slot holder.
    fn handle_buzz(&self, request: BuzzRequest<'_>, song: &mut RoundSong) -> BuzzOutcome;

    /// Validate an answer without mutating the song; the orchestrator records the outcome.
    fn handle_answer(
        &self,
        player_id: &str,
        submission: &AnswerSubmission,
        song: &RoundSong,
        params: &GameplayParams,
    ) -> Result<AnswerOutcome, AnswerRejection>;

    /// Choice set to expose to whoever holds the slot, if any.
    fn buzz_followup_choices<'s>(&self, _song: &'s RoundSong) -> Option<&'s ChoiceSet> {
        None
    }

    /// Whether the song is resolved and should end.
    fn should_end_song(&self, song: &RoundSong, active_player_ids: &[String]) -> bool {
        common::should_end_song(song, active_player_ids)
    }

    /// Move the song to its finished state.
    fn end_song(&self, song: &mut RoundSong) -> Result<(), InvalidSongTransition> {
        common::end_song(song)
    }

    /// Whether every song of the round has finished.
    fn is_round_complete(&self, round: &Round) -> bool {
        common::is_round_complete(round)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_round_trip_through_game_mode() {
        for kind in [ModeKind::FastBuzz, ModeKind::BuzzChoice, ModeKind::TypedAnswer] {
            assert_eq!(GameMode::from(kind).kind(), kind);
        }
    }

    #[test]
    fn kinds_use_snake_case() {
        let kind: ModeKind = serde_json::from_str("\"buzz_choice\"").unwrap();
        assert_eq!(kind, ModeKind::BuzzChoice);
    }
}
