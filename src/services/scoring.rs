use std::cmp::Reverse;

use indexmap::IndexMap;

use crate::state::game::{Answer, FinalScore, GameSession, Round};

#[derive(Default)]
struct Tally {
    correct: u32,
    wrong: u32,
    total: i32,
    answer_time_ms: u64,
    answers: u64,
}

/// Rank the contestants of a session from one round's answer log.
pub fn rank_round(session: &GameSession, round: &Round) -> Vec<FinalScore> {
    rank(session, round.answers())
}

/// Rank the contestants of a session over several rounds.
pub fn rank_rounds<'a>(
    session: &GameSession,
    rounds: impl IntoIterator<Item = &'a Round>,
) -> Vec<FinalScore> {
    rank(session, rounds.into_iter().flat_map(Round::answers))
}

/// Aggregate answers per non-master player, then sort by score desc and mean answer time asc.
///
/// Ties on both keys keep the session's player order, so ranks are always `1..=n` without gaps.
fn rank<'a>(session: &GameSession, answers: impl Iterator<Item = &'a Answer>) -> Vec<FinalScore> {
    let mut tallies: IndexMap<&str, Tally> = session
        .contestants()
        .into_iter()
        .map(|player| (player.id.as_str(), Tally::default()))
        .collect();

    for answer in answers {
        let Some(tally) = tallies.get_mut(answer.player_id.as_str()) else {
            continue;
        };
        if answer.is_correct {
            tally.correct += 1;
        } else {
            tally.wrong += 1;
        }
        tally.total += answer.points_awarded;
        tally.answer_time_ms += answer.time_to_answer_ms;
        tally.answers += 1;
    }

    let mut scores: Vec<FinalScore> = tallies
        .into_iter()
        .map(|(player_id, tally)| FinalScore {
            player_id: player_id.to_string(),
            player_name: session.player_name(player_id),
            correct_answers: tally.correct,
            wrong_answers: tally.wrong,
            total_score: tally.total,
            average_answer_time_ms: (tally.answers > 0)
                .then(|| tally.answer_time_ms / tally.answers),
            rank: 0,
        })
        .collect();

    scores.sort_by_key(|score| {
        (
            Reverse(score.total_score),
            score.average_answer_time_ms.unwrap_or(u64::MAX),
        )
    });
    for (position, score) in scores.iter_mut().enumerate() {
        score.rank = position + 1;
    }

    scores
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::{
        dao::models::{MediaType, PlayerEntity},
        modes::{GameMode, ModeKind, params::GameplayParams},
        modes::common::test_support::song_entity,
        state::game::{AnswerType, RoundSong},
    };

    fn session(players: &[(&str, bool)]) -> GameSession {
        let mut session = GameSession::new(Uuid::nil(), "ABCD", Vec::new());
        session.refresh_players(
            players
                .iter()
                .map(|(id, is_master)| PlayerEntity {
                    id: (*id).into(),
                    room_id: "ABCD".into(),
                    name: id.to_uppercase(),
                    is_master: *is_master,
                    score: 0,
                })
                .collect(),
        );
        session
    }

    fn answer(player_id: &str, is_correct: bool, points: i32, time_ms: u64) -> Answer {
        Answer {
            player_id: player_id.into(),
            answer_type: AnswerType::Title,
            value: String::new(),
            is_correct,
            points_awarded: points,
            time_to_answer_ms: time_ms,
        }
    }

    fn round(answers: Vec<Answer>) -> Round {
        let mut round = Round::pending(
            Uuid::nil(),
            0,
            GameMode::from_kind(ModeKind::FastBuzz),
            MediaType::Audio,
            GameplayParams::default(),
        );
        let mut song = RoundSong::new(song_entity("s1", "T", "A"));
        song.answers = answers;
        round.songs.push(song);
        round
    }

    #[test]
    fn ranks_by_score_then_speed_without_gaps() {
        let session = session(&[("master", true), ("a", false), ("b", false), ("c", false)]);
        let round = round(vec![
            answer("a", true, 1, 4_000),
            answer("b", true, 1, 2_000),
            answer("c", true, 2, 9_000),
            answer("master", true, 5, 100),
        ]);

        let ranking = rank_round(&session, &round);
        let order: Vec<_> = ranking
            .iter()
            .map(|score| (score.player_id.as_str(), score.rank))
            .collect();
        assert_eq!(order, vec![("c", 1), ("b", 2), ("a", 3)]);
        assert_eq!(ranking[0].player_name, "C");
    }

    #[test]
    fn penalties_can_make_scores_negative() {
        let session = session(&[("a", false), ("b", false)]);
        let round = round(vec![
            answer("a", false, -1, 1_000),
            answer("a", false, -1, 3_000),
        ]);

        let ranking = rank_round(&session, &round);
        assert_eq!(ranking[0].player_id, "b");
        assert_eq!(ranking[0].average_answer_time_ms, None);
        assert_eq!(ranking[1].total_score, -2);
        assert_eq!(ranking[1].wrong_answers, 2);
        assert_eq!(ranking[1].average_answer_time_ms, Some(2_000));
    }

    #[test]
    fn full_ties_keep_join_order_and_distinct_ranks() {
        let session = session(&[("a", false), ("b", false), ("c", false)]);
        let ranking = rank_round(&session, &round(Vec::new()));
        let ranks: Vec<_> = ranking.iter().map(|score| score.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(ranking[0].player_id, "a");
    }

    #[test]
    fn cumulative_ranking_sums_rounds() {
        let session = session(&[("a", false), ("b", false)]);
        let first = round(vec![answer("a", true, 2, 1_000)]);
        let second = round(vec![answer("b", true, 1, 500), answer("b", true, 2, 500)]);

        let ranking = rank_rounds(&session, [&first, &second]);
        assert_eq!(ranking[0].player_id, "b");
        assert_eq!(ranking[0].total_score, 3);
        assert_eq!(ranking[0].correct_answers, 2);
        assert_eq!(ranking[1].total_score, 2);
    }
}
