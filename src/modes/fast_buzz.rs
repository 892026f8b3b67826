use futures::future::BoxFuture;

use crate::{
    dao::{
        choices::ChoiceGenerator,
        models::{MediaType, SongEntity},
    },
    modes::{
        AnswerOutcome, AnswerRejection, AnswerSubmission, BuzzOutcome, BuzzRequest, ModeKind,
        ModeRules, common,
        params::{GameplayParams, ParamOverrides},
    },
    state::game::RoundSong,
};

/// Buzz first, then answer in free text. Wrong answers lock the player out of the song.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FastBuzz;

impl ModeRules for FastBuzz {
    fn kind(&self) -> ModeKind {
        ModeKind::FastBuzz
    }

    fn default_params(&self) -> ParamOverrides {
        ParamOverrides {
            song_duration_secs: Some(20),
            answer_timer_secs: Some(8),
            ..ParamOverrides::default()
        }
    }

    fn start_song<'a>(
        &'a self,
        _song: &'a mut RoundSong,
        _round_songs: &'a [SongEntity],
        _media_type: MediaType,
        _params: &'a GameplayParams,
        _choices: &'a dyn ChoiceGenerator,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }

    fn can_buzz(&self, player_id: &str, song: &RoundSong) -> bool {
        common::can_buzz(player_id, song)
    }

    fn handle_buzz(&self, request: BuzzRequest<'_>, song: &mut RoundSong) -> BuzzOutcome {
        common::arbitrate_buzz(request, song)
    }

    fn handle_answer(
        &self,
        player_id: &str,
        submission: &AnswerSubmission,
        song: &RoundSong,
        params: &GameplayParams,
    ) -> Result<AnswerOutcome, AnswerRejection> {
        common::require_answerer(player_id, song)?;
        common::ensure_unfound(song, submission.answer_type)?;

        let fields =
            common::match_free_text(submission.answer_type, &submission.value, song, params);
        if fields.is_empty() {
            return Ok(common::wrong(params));
        }

        Ok(common::correct(fields, params))
    }
}
