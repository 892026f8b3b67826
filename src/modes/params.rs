//! Gameplay parameters and their round → mode → system resolution chain.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Fully resolved gameplay parameters of a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct GameplayParams {
    /// Length of the song countdown.
    pub song_duration_secs: u64,
    /// Time a buzzing player has to answer.
    pub answer_timer_secs: u64,
    /// Points for finding the title.
    pub points_title: i32,
    /// Points for finding the artist.
    pub points_artist: i32,
    /// Points removed on a wrong answer; `0` disables the penalty.
    pub wrong_answer_penalty: i32,
    /// Minimum normalised similarity for a typed answer to count, in `[0, 1]`.
    pub fuzzy_threshold: f64,
    /// Number of entries of each multiple-choice set.
    pub choice_count: usize,
}

impl Default for GameplayParams {
    fn default() -> Self {
        Self {
            song_duration_secs: 30,
            answer_timer_secs: 10,
            points_title: 1,
            points_artist: 1,
            wrong_answer_penalty: 0,
            fuzzy_threshold: 0.8,
            choice_count: 4,
        }
    }
}

/// Partial parameters; every `None` falls through to the next level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ParamOverrides {
    /// Song countdown length.
    pub song_duration_secs: Option<u64>,
    /// Time a slot holder has to answer.
    pub answer_timer_secs: Option<u64>,
    /// Points for a correct title.
    pub points_title: Option<i32>,
    /// Points for a correct artist.
    pub points_artist: Option<i32>,
    /// Points removed for a wrong answer.
    pub wrong_answer_penalty: Option<i32>,
    /// Minimum similarity accepted by fuzzy matching, between 0 and 1.
    pub fuzzy_threshold: Option<f64>,
    /// Size of each choice set.
    pub choice_count: Option<usize>,
}

impl GameplayParams {
    /// Resolve each field from the round overrides, then the mode defaults, then `system`.
    pub fn resolve(round: &ParamOverrides, mode: &ParamOverrides, system: &GameplayParams) -> Self {
        macro_rules! pick {
            ($field:ident) => {
                round.$field.or(mode.$field).unwrap_or(system.$field)
            };
        }

        Self {
            song_duration_secs: pick!(song_duration_secs),
            answer_timer_secs: pick!(answer_timer_secs),
            points_title: pick!(points_title),
            points_artist: pick!(points_artist),
            wrong_answer_penalty: pick!(wrong_answer_penalty),
            fuzzy_threshold: pick!(fuzzy_threshold).clamp(0.0, 1.0),
            choice_count: pick!(choice_count).max(1),
        }
    }

    /// Points lost for a wrong answer, as a non-positive delta.
    pub fn penalty(&self) -> i32 {
        -self.wrong_answer_penalty.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_overrides_beat_mode_which_beats_system() {
        let round = ParamOverrides {
            song_duration_secs: Some(15),
            ..ParamOverrides::default()
        };
        let mode = ParamOverrides {
            song_duration_secs: Some(20),
            answer_timer_secs: Some(8),
            ..ParamOverrides::default()
        };
        let system = GameplayParams {
            points_title: 2,
            ..GameplayParams::default()
        };

        let params = GameplayParams::resolve(&round, &mode, &system);
        assert_eq!(params.song_duration_secs, 15);
        assert_eq!(params.answer_timer_secs, 8);
        assert_eq!(params.points_title, 2);
        assert_eq!(params.points_artist, 1);
    }

    #[test]
    fn resolution_clamps_degenerate_values() {
        let round = ParamOverrides {
            fuzzy_threshold: Some(1.7),
            choice_count: Some(0),
            ..ParamOverrides::default()
        };
        let params =
            GameplayParams::resolve(&round, &ParamOverrides::default(), &GameplayParams::default());
        assert_eq!(params.fuzzy_threshold, 1.0);
        assert_eq!(params.choice_count, 1);
    }

    #[test]
    fn penalty_is_never_a_bonus() {
        let mut params = GameplayParams::default();
        assert_eq!(params.penalty(), 0);
        params.wrong_answer_penalty = 2;
        assert_eq!(params.penalty(), -2);
        params.wrong_answer_penalty = -3;
        assert_eq!(params.penalty(), -3);
    }
}
