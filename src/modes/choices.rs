use std::collections::HashSet;

use rand::{Rng, rng, seq::SliceRandom};
use tracing::debug;

use crate::state::game::{AnswerField, Choice, ChoiceSet};

/// Build a choice set of exactly `count` entries with a fresh thread-local rng.
pub fn build_choice_set(
    field: AnswerField,
    correct: &str,
    distractors: Vec<String>,
    count: usize,
) -> ChoiceSet {
    build_choice_set_with(&mut rng(), field, correct, distractors, count)
}

/// Build a choice set of exactly `count` entries (at least one), always containing `correct`.
///
/// Display texts are unique case-insensitively. Missing distractors are replaced with
/// `"<Field> #n"` placeholders.
pub fn build_choice_set_with<R: Rng + ?Sized>(
    rng: &mut R,
    field: AnswerField,
    correct: &str,
    distractors: Vec<String>,
    count: usize,
) -> ChoiceSet {
    let count = count.max(1);
    let correct = correct.trim().to_string();
    let mut seen = HashSet::from([correct.to_lowercase()]);

    let mut choices = vec![Choice {
        display_text: correct,
        is_correct: true,
    }];

    for distractor in distractors {
        if choices.len() == count {
            break;
        }
        let distractor = distractor.trim();
        if distractor.is_empty() || !seen.insert(distractor.to_lowercase()) {
            continue;
        }
        choices.push(Choice {
            display_text: distractor.to_string(),
            is_correct: false,
        });
    }

    if choices.len() < count {
        debug!(
            field = field.label(),
            missing = count - choices.len(),
            "not enough distractors; filling with placeholders"
        );
    }

    let mut n = 1;
    while choices.len() < count {
        let placeholder = format!("{} #{n}", field.label());
        n += 1;
        if seen.insert(placeholder.to_lowercase()) {
            choices.push(Choice {
                display_text: placeholder,
                is_correct: false,
            });
        }
    }

    choices.shuffle(rng);
    ChoiceSet { field, choices }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn assert_well_formed(set: &ChoiceSet, count: usize, correct: &str) {
        assert_eq!(set.choices.len(), count);
        assert_eq!(
            set.choices.iter().filter(|choice| choice.is_correct).count(),
            1
        );
        assert_eq!(set.correct().unwrap().display_text, correct);
        let unique: HashSet<_> = set
            .choices
            .iter()
            .map(|choice| choice.display_text.to_lowercase())
            .collect();
        assert_eq!(unique.len(), count);
    }

    #[test]
    fn fills_shortfall_with_placeholders() {
        let set = build_choice_set(AnswerField::Artist, "Air", vec!["Justice".into()], 4);
        assert_well_formed(&set, 4, "Air");
        assert!(set.display_texts().contains(&"Artist #1".to_string()));
        assert!(set.display_texts().contains(&"Artist #2".to_string()));
    }

    #[test]
    fn drops_duplicates_and_the_correct_value() {
        let set = build_choice_set(
            AnswerField::Title,
            "Sexy Boy",
            vec![
                "sexy boy".into(),
                "Kelly Watch the Stars".into(),
                "KELLY WATCH THE STARS".into(),
                "".into(),
            ],
            3,
        );
        assert_well_formed(&set, 3, "Sexy Boy");
        assert!(set.display_texts().contains(&"Title #1".to_string()));
    }

    #[test]
    fn placeholders_never_collide_with_real_values() {
        let set = build_choice_set(
            AnswerField::Title,
            "Title #1",
            vec!["title #2".into()],
            4,
        );
        assert_well_formed(&set, 4, "Title #1");
        let texts = set.display_texts();
        assert!(texts.contains(&"Title #3".to_string()));
        assert!(texts.contains(&"Title #4".to_string()));
    }

    #[test]
    fn truncates_extra_distractors() {
        let distractors = (0..10).map(|i| format!("Song {i}")).collect();
        let set = build_choice_set(AnswerField::Title, "Answer", distractors, 4);
        assert_well_formed(&set, 4, "Answer");
    }

    #[test]
    fn empty_pool_and_zero_count_still_yield_the_correct_choice() {
        let mut rng = StdRng::seed_from_u64(7);
        let set = build_choice_set_with(&mut rng, AnswerField::Artist, "Air", Vec::new(), 0);
        assert_well_formed(&set, 1, "Air");
    }
}
