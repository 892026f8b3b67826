//! Behaviour shared by the buzzer-based modes.

use tracing::debug;

use crate::{
    modes::{
        AnswerOutcome, AnswerRejection, BuzzOutcome, BuzzRejection, BuzzRequest,
        matching::{fuzzy_matches, split_combined},
        params::GameplayParams,
    },
    state::{
        game::{AnswerField, AnswerType, Round, RoundSong},
        state_machine::{InvalidSongTransition, SongEvent, SongStatus},
    },
};

/// Playing, not locked out, and the slot is free.
pub fn can_buzz(player_id: &str, song: &RoundSong) -> bool {
    song.status == SongStatus::Playing
        && !song.is_locked_out(player_id)
        && song.active_player_id.is_none()
}

/// Timestamp-ordered buzz arbitration.
///
/// A free slot goes to the first eligible buzz. A held slot changes hands only when the holder
/// has not answered yet, was accepted no longer than `request.window` ago, and carries a strictly
/// later client timestamp than the newcomer.
pub fn arbitrate_buzz(request: BuzzRequest<'_>, song: &mut RoundSong) -> BuzzOutcome {
    let player_id = request.player_id;
    if !song.is_live() {
        return BuzzOutcome::Rejected(BuzzRejection::SongNotPlaying);
    }
    if song.is_locked_out(player_id) {
        return BuzzOutcome::Rejected(BuzzRejection::LockedOut);
    }

    let holder = song.active_player_id.clone();
    if holder.as_deref() == Some(player_id) {
        return BuzzOutcome::Rejected(BuzzRejection::AlreadyAnswering);
    }

    song.buzz_timestamps
        .insert(player_id.to_string(), request.client_timestamp_ms);

    let Some(holder) = holder else {
        if song.apply(SongEvent::BuzzAccepted).is_err() {
            return BuzzOutcome::Rejected(BuzzRejection::SongNotPlaying);
        }
        song.assign_slot(player_id, request.now);
        return BuzzOutcome::Accepted;
    };

    if !may_preempt(&request, &holder, song) {
        debug!(
            player_id = %player_id,
            holder = %holder,
            "buzz rejected; slot already held"
        );
        return BuzzOutcome::Rejected(BuzzRejection::SlotTaken);
    }

    if song.apply(SongEvent::BuzzAccepted).is_err() {
        return BuzzOutcome::Rejected(BuzzRejection::SongNotPlaying);
    }
    song.assign_slot(player_id, request.now);
    BuzzOutcome::Preempted { displaced: holder }
}

fn may_preempt(request: &BuzzRequest<'_>, holder: &str, song: &RoundSong) -> bool {
    if song.turn_answered {
        return false;
    }

    let within_window = song
        .active_since
        .is_some_and(|since| request.now.saturating_duration_since(since) <= request.window);
    let earlier = song
        .buzz_timestamps
        .get(holder)
        .is_some_and(|held| request.client_timestamp_ms < *held);

    within_window && earlier
}

/// The holder of the slot is the only one allowed to answer.
pub fn require_answerer(player_id: &str, song: &RoundSong) -> Result<(), AnswerRejection> {
    if !song.is_live() {
        return Err(AnswerRejection::SongNotPlaying);
    }
    if song.status != SongStatus::Answering || song.active_player_id.as_deref() != Some(player_id)
    {
        return Err(AnswerRejection::NotAnswerer);
    }
    Ok(())
}

/// Refuse answers targeting a field somebody already found.
pub fn ensure_unfound(song: &RoundSong, answer_type: AnswerType) -> Result<(), AnswerRejection> {
    match answer_type
        .fields()
        .iter()
        .find(|field| song.is_found(**field))
    {
        Some(field) => Err(AnswerRejection::FieldAlreadyFound(*field)),
        None => Ok(()),
    }
}

/// Points earned by finding `fields`.
pub fn points_for(fields: &[AnswerField], params: &GameplayParams) -> i32 {
    fields
        .iter()
        .map(|field| match field {
            AnswerField::Title => params.points_title,
            AnswerField::Artist => params.points_artist,
        })
        .sum()
}

/// Fuzzy-match a free-text answer, returning the fields it found (empty when wrong).
pub fn match_free_text(
    answer_type: AnswerType,
    value: &str,
    song: &RoundSong,
    params: &GameplayParams,
) -> Vec<AnswerField> {
    let threshold = params.fuzzy_threshold;
    let matches = |field: AnswerField, submitted: &str| {
        fuzzy_matches(submitted, field.value_of(&song.song), threshold)
    };

    match answer_type {
        AnswerType::Title | AnswerType::Artist => {
            let field = answer_type.fields()[0];
            if matches(field, value) {
                vec![field]
            } else {
                Vec::new()
            }
        }
        AnswerType::Both => match split_combined(value) {
            Some((title, artist))
                if matches(AnswerField::Title, title) && matches(AnswerField::Artist, artist) =>
            {
                vec![AnswerField::Title, AnswerField::Artist]
            }
            _ => Vec::new(),
        },
    }
}

/// Correct-answer outcome for `fields`.
pub fn correct(fields: Vec<AnswerField>, params: &GameplayParams) -> AnswerOutcome {
    AnswerOutcome {
        is_correct: true,
        points_awarded: points_for(&fields, params),
        show_followup_choices: false,
        lock_out_player: false,
        release_slot: true,
        fields_found: fields,
    }
}

/// Wrong-answer outcome: penalty, lockout, slot released.
pub fn wrong(params: &GameplayParams) -> AnswerOutcome {
    AnswerOutcome {
        is_correct: false,
        points_awarded: params.penalty(),
        show_followup_choices: false,
        lock_out_player: true,
        release_slot: true,
        fields_found: Vec::new(),
    }
}

/// Finished, resolved, or every active player locked out.
pub fn should_end_song(song: &RoundSong, active_player_ids: &[String]) -> bool {
    song.status == SongStatus::Finished
        || song.is_resolved()
        || (!active_player_ids.is_empty()
            && active_player_ids
                .iter()
                .all(|player_id| song.is_locked_out(player_id)))
}

/// Move a live song to finished and clear the slot. Already finished songs are left untouched.
pub fn end_song(song: &mut RoundSong) -> Result<(), InvalidSongTransition> {
    if song.status == SongStatus::Finished {
        return Ok(());
    }
    song.apply(SongEvent::Finish)?;
    song.active_player_id = None;
    song.active_since = None;
    Ok(())
}

/// Every song of the round is finished.
pub fn is_round_complete(round: &Round) -> bool {
    round
        .songs
        .iter()
        .all(|song| song.status == SongStatus::Finished)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{
        dao::models::{MediaType, SongEntity},
        state::game::RoundSong,
    };
    use tokio::time::Instant;

    pub fn song_entity(id: &str, title: &str, artist: &str) -> SongEntity {
        SongEntity {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            media_type: MediaType::Audio,
            genre: None,
            year: None,
        }
    }

    pub fn playing_song() -> RoundSong {
        let mut song = RoundSong::new(song_entity("s1", "One More Time", "Daft Punk"));
        song.start(Instant::now()).unwrap();
        song
    }
}
