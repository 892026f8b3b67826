use std::{collections::HashSet, sync::Arc};

use futures::future::BoxFuture;
use rand::{rng, seq::SliceRandom};

use crate::{
    dao::{content::ContentStore, models::MediaType, storage::StorageResult},
    state::game::AnswerField,
};

/// Input of a distractor-generation call.
#[derive(Debug, Clone)]
pub struct DistractorRequest {
    /// Field the distractors are for.
    pub field: AnswerField,
    /// Ground-truth value; never returned as a distractor.
    pub correct: String,
    /// Kind of content of the round.
    pub media_type: MediaType,
    /// Values of the same field taken from the round's other songs.
    pub round_pool: Vec<String>,
    /// Number of distractors wanted.
    pub wanted: usize,
}

/// Collaborator producing wrong-but-plausible choices for multiple-choice modes.
///
/// Implementations may return fewer values than requested; callers fill any gap.
pub trait ChoiceGenerator: Send + Sync {
    /// Up to `request.wanted` wrong values for the requested field.
    fn distractors(&self, request: DistractorRequest) -> BoxFuture<'static, StorageResult<Vec<String>>>;
}

/// Default generator drawing from the round's songs first, then from the wider catalogue.
pub struct CatalogChoiceGenerator {
    content: Arc<dyn ContentStore>,
}

/// Extra catalogue values requested per wanted distractor, to survive de-duplication.
const CATALOGUE_OVERSAMPLING: usize = 4;

impl CatalogChoiceGenerator {
    /// Build a generator backed by `content`.
    pub fn new(content: Arc<dyn ContentStore>) -> Self {
        Self { content }
    }
}

impl ChoiceGenerator for CatalogChoiceGenerator {
    fn distractors(&self, request: DistractorRequest) -> BoxFuture<'static, StorageResult<Vec<String>>> {
        let content = Arc::clone(&self.content);
        Box::pin(async move {
            let DistractorRequest {
                field,
                correct,
                media_type,
                round_pool,
                wanted,
            } = request;

            let mut picked = pick_distinct(&correct, round_pool, wanted, &HashSet::new());
            if picked.len() < wanted {
                let missing = wanted - picked.len();
                let catalogue = content
                    .sample_field_values(field, media_type, missing * CATALOGUE_OVERSAMPLING)
                    .await?;
                let taken = picked.iter().map(|value| value.to_lowercase()).collect();
                picked.extend(pick_distinct(&correct, catalogue, missing, &taken));
            }

            Ok(picked)
        })
    }
}

/// Shuffle `candidates` and keep up to `wanted` values distinct from `correct` and `taken`.
fn pick_distinct(
    correct: &str,
    mut candidates: Vec<String>,
    wanted: usize,
    taken: &HashSet<String>,
) -> Vec<String> {
    candidates.shuffle(&mut rng());
    let mut seen = taken.clone();
    seen.insert(correct.trim().to_lowercase());

    candidates
        .into_iter()
        .map(|candidate| candidate.trim().to_string())
        .filter(|candidate| !candidate.is_empty())
        .filter(|candidate| seen.insert(candidate.to_lowercase()))
        .take(wanted)
        .collect()
}
