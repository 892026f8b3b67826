use futures::future::BoxFuture;
use tracing::warn;

use crate::{
    dao::{
        choices::{ChoiceGenerator, DistractorRequest},
        models::{MediaType, SongEntity},
    },
    modes::{
        AnswerOutcome, AnswerRejection, AnswerSubmission, BuzzOutcome, BuzzRequest, ModeKind,
        ModeRules,
        choices::build_choice_set,
        common,
        matching::exact_matches,
        params::{GameplayParams, ParamOverrides},
    },
    state::game::{AnswerField, AnswerType, ChoiceSet, RoundSong},
};

/// Buzz, then pick the title among generated choices; finding it unlocks artist choices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuzzChoice;

impl ModeRules for BuzzChoice {
    fn kind(&self) -> ModeKind {
        ModeKind::BuzzChoice
    }

    fn default_params(&self) -> ParamOverrides {
        ParamOverrides {
            answer_timer_secs: Some(6),
            choice_count: Some(4),
            ..ParamOverrides::default()
        }
    }

    fn start_song<'a>(
        &'a self,
        song: &'a mut RoundSong,
        round_songs: &'a [SongEntity],
        media_type: MediaType,
        params: &'a GameplayParams,
        choices: &'a dyn ChoiceGenerator,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let count = params.choice_count;
            let mut sets = Vec::with_capacity(2);

            for field in [AnswerField::Title, AnswerField::Artist] {
                let correct = field.value_of(&song.song).to_string();
                let round_pool = round_songs
                    .iter()
                    .filter(|other| other.id != song.song.id)
                    .map(|other| field.value_of(other).to_string())
                    .collect();
                let request = DistractorRequest {
                    field,
                    correct: correct.clone(),
                    media_type,
                    round_pool,
                    wanted: count.saturating_sub(1),
                };

                let distractors = match choices.distractors(request).await {
                    Ok(values) => values,
                    Err(err) => {
                        warn!(
                            song_id = %song.song.id,
                            field = field.label(),
                            error = %err,
                            "distractor generation failed; using placeholders"
                        );
                        Vec::new()
                    }
                };
                sets.push(build_choice_set(field, &correct, distractors, count));
            }

            let mut sets = sets.into_iter();
            song.title_choices = sets.next();
            song.artist_choices = sets.next();
        })
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

        let field = match submission.answer_type {
            AnswerType::Title => AnswerField::Title,
            AnswerType::Artist => AnswerField::Artist,
            AnswerType::Both => {
                return Err(AnswerRejection::UnsupportedAnswerType(AnswerType::Both));
            }
        };
        common::ensure_unfound(song, submission.answer_type)?;
        if field == AnswerField::Artist && !song.is_found(AnswerField::Title) {
            return Err(AnswerRejection::ChoicesNotOffered(AnswerField::Artist));
        }

        let expected = song
            .choices_for(field)
            .and_then(ChoiceSet::correct)
            .map(|choice| choice.display_text.as_str())
            .unwrap_or_else(|| field.value_of(&song.song));
        if !exact_matches(&submission.value, expected) {
            return Ok(common::wrong(params));
        }

        let mut outcome = common::correct(vec![field], params);
        if field == AnswerField::Title && !song.is_found(AnswerField::Artist) {
            outcome.show_followup_choices = true;
            outcome.release_slot = false;
        }
        Ok(outcome)
    }

    fn buzz_followup_choices<'s>(&self, song: &'s RoundSong) -> Option<&'s ChoiceSet> {
        if song.is_found(AnswerField::Title) && !song.is_found(AnswerField::Artist) {
            song.artist_choices.as_ref()
        } else {
            None
        }
    }
}
