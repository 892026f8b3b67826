use futures::future::BoxFuture;

use crate::{
    dao::{
        choices::ChoiceGenerator,
        models::{MediaType, SongEntity},
    },
    modes::{
        AnswerOutcome, AnswerRejection, AnswerSubmission, BuzzOutcome, BuzzRejection, BuzzRequest,
        ModeKind, ModeRules, common,
        params::{GameplayParams, ParamOverrides},
    },
    state::{game::RoundSong, state_machine::SongStatus},
};

/// Buzzer-less mode: every eligible player types answers while the song plays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypedAnswer;

impl ModeRules for TypedAnswer {
    fn kind(&self) -> ModeKind {
        ModeKind::TypedAnswer
    }

    fn default_params(&self) -> ParamOverrides {
        ParamOverrides {
            song_duration_secs: Some(30),
            fuzzy_threshold: Some(0.8),
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

    fn can_buzz(&self, _player_id: &str, _song: &RoundSong) -> bool {
        false
    }

    fn handle_buzz(&self, _request: BuzzRequest<'_>, _song: &mut RoundSong) -> BuzzOutcome {
        BuzzOutcome::Rejected(BuzzRejection::BuzzingDisabled)
    }

    fn handle_answer(
        &self,
        player_id: &str,
        submission: &AnswerSubmission,
        song: &RoundSong,
        params: &GameplayParams,
    ) -> Result<AnswerOutcome, AnswerRejection> {
        if song.status != SongStatus::Playing {
            return Err(AnswerRejection::SongNotPlaying);
        }
        if song.is_locked_out(player_id) {
            return Err(AnswerRejection::LockedOut);
        }
        common::ensure_unfound(song, submission.answer_type)?;

        let fields =
            common::match_free_text(submission.answer_type, &submission.value, song, params);
        if fields.is_empty() {
            return Ok(common::wrong(params));
        }

        Ok(common::correct(fields, params))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;
    use crate::{
        modes::common::test_support::playing_song,
        state::game::{Answer, AnswerField, AnswerType},
    };

    fn typed(answer_type: AnswerType, value: &str) -> AnswerSubmission {
        AnswerSubmission {
            answer_type,
            value: value.into(),
        }
    }

    #[test]
    fn buzzing_is_disabled() {
        let mut song = playing_song();
        assert!(!TypedAnswer.can_buzz("a", &song));
        let outcome = TypedAnswer.handle_buzz(
            BuzzRequest {
                player_id: "a",
                client_timestamp_ms: 0,
                now: Instant::now(),
                window: Duration::ZERO,
            },
            &mut song,
        );
        assert_eq!(outcome, BuzzOutcome::Rejected(BuzzRejection::BuzzingDisabled));
        assert_eq!(song.status, SongStatus::Playing);
    }

    #[test]
    fn anyone_may_answer_while_playing() {
        let song = playing_song();
        let params = GameplayParams::default();
        for player in ["a", "b"] {
            let outcome = TypedAnswer
                .handle_answer(player, &typed(AnswerType::Artist, "daft punk"), &song, &params)
                .unwrap();
            assert!(outcome.is_correct);
        }
    }

    #[test]
    fn found_fields_and_lockouts_are_refused() {
        let mut song = playing_song();
        song.record_answer(Answer {
            player_id: "a".into(),
            answer_type: AnswerType::Title,
            value: "One More Time".into(),
            is_correct: true,
            points_awarded: 1,
            time_to_answer_ms: 500,
        });
        song.lock_out("b");
        let params = GameplayParams::default();

        assert_eq!(
            TypedAnswer.handle_answer("c", &typed(AnswerType::Title, "One More Time"), &song, &params),
            Err(AnswerRejection::FieldAlreadyFound(AnswerField::Title))
        );
        assert_eq!(
            TypedAnswer.handle_answer("b", &typed(AnswerType::Artist, "Daft Punk"), &song, &params),
            Err(AnswerRejection::LockedOut)
        );
    }

    #[test]
    fn wrong_answer_locks_out() {
        let song = playing_song();
        let outcome = TypedAnswer
            .handle_answer(
                "a",
                &typed(AnswerType::Title, "Da Funk"),
                &song,
                &GameplayParams::default(),
            )
            .unwrap();
        assert!(!outcome.is_correct);
        assert!(outcome.lock_out_player);
    }
}
