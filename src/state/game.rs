use std::{collections::HashMap, time::SystemTime};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{MediaType, PlayerEntity, RoundConfigEntity, SongEntity},
    modes::{GameMode, params::GameplayParams},
    state::{
        state_machine::{
            InvalidSessionTransition, InvalidSongTransition, SessionEvent, SessionStatus,
            SongEvent, SongStatus,
        },
        timers::SongTimerContext,
    },
};

/// Lifecycle of a round inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    /// Songs are still being loaded.
    Pending,
    /// Songs are being played.
    Active,
    /// Scores have been computed; the round is frozen.
    Finished,
}

/// Which part of an item a player is answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    /// The song title.
    Title,
    /// The performing artist.
    Artist,
    /// Title and artist in a single submission.
    Both,
}

/// A single field of ground truth that can be found on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnswerField {
    /// The song title.
    Title,
    /// The performing artist.
    Artist,
}

impl AnswerType {
    /// Fields covered by an answer of this type.
    pub fn fields(self) -> &'static [AnswerField] {
        match self {
            AnswerType::Title => &[AnswerField::Title],
            AnswerType::Artist => &[AnswerField::Artist],
            AnswerType::Both => &[AnswerField::Title, AnswerField::Artist],
        }
    }
}

impl From<AnswerField> for AnswerType {
    fn from(value: AnswerField) -> Self {
        match value {
            AnswerField::Title => AnswerType::Title,
            AnswerField::Artist => AnswerType::Artist,
        }
    }
}

impl AnswerField {
    /// Human readable label, also used to name placeholder choices.
    pub fn label(self) -> &'static str {
        match self {
            AnswerField::Title => "Title",
            AnswerField::Artist => "Artist",
        }
    }

    /// Ground-truth value of this field for `song`.
    pub fn value_of(self, song: &SongEntity) -> &str {
        match self {
            AnswerField::Title => &song.title,
            AnswerField::Artist => &song.artist,
        }
    }
}

/// Immutable record of a submitted answer.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Answer {
    /// Player who submitted the answer.
    pub player_id: String,
    /// Which field(s) the answer targets.
    pub answer_type: AnswerType,
    /// Raw submitted value.
    pub value: String,
    /// Verdict.
    pub is_correct: bool,
    /// Points awarded, negative under a wrong-answer penalty.
    pub points_awarded: i32,
    /// Milliseconds between the song start and the submission.
    pub time_to_answer_ms: u64,
}

/// One entry of a multiple-choice set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// Text shown to players.
    pub display_text: String,
    /// Whether this entry is the ground truth.
    pub is_correct: bool,
}

/// Fixed-size set of choices for one field of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceSet {
    /// Field the choices are about.
    pub field: AnswerField,
    /// Shuffled entries, exactly one of which is correct.
    pub choices: Vec<Choice>,
}

impl ChoiceSet {
    /// Texts to publish to clients, without revealing the correct entry.
    pub fn display_texts(&self) -> Vec<String> {
        self.choices
            .iter()
            .map(|choice| choice.display_text.clone())
            .collect()
    }

    /// The correct entry, if the set is well formed.
    pub fn correct(&self) -> Option<&Choice> {
        self.choices.iter().find(|choice| choice.is_correct)
    }
}

/// Runtime state of one quiz item within a round.
#[derive(Debug, Clone)]
pub struct RoundSong {
    /// Ground truth and content reference.
    pub song: SongEntity,
    /// Position in the song-level state machine.
    pub status: SongStatus,
    /// Player currently holding the answerer slot.
    pub active_player_id: Option<String>,
    /// Server time at which the current holder was accepted.
    pub active_since: Option<Instant>,
    /// Incremented on every accepted buzz; answer timers carry it to detect staleness.
    pub turn: u64,
    /// Whether the holder already submitted an answer during this turn.
    pub turn_answered: bool,
    /// Players who may never buzz or answer on this item again.
    pub locked_out_player_ids: IndexSet<String>,
    /// Append-only answer log.
    pub answers: Vec<Answer>,
    /// Title choices for multiple-choice modes.
    pub title_choices: Option<ChoiceSet>,
    /// Artist choices for multiple-choice modes.
    pub artist_choices: Option<ChoiceSet>,
    /// Client-reported buzz timestamps (milliseconds), used for arbitration.
    pub buzz_timestamps: HashMap<String, i64>,
    /// Server time at which the song started playing.
    pub started_at: Option<Instant>,
}

impl RoundSong {
    /// Wrap a catalogue song into a pending round item.
    pub fn new(song: SongEntity) -> Self {
        Self {
            song,
            status: SongStatus::Pending,
            active_player_id: None,
            active_since: None,
            turn: 0,
            turn_answered: false,
            locked_out_player_ids: IndexSet::new(),
            answers: Vec::new(),
            title_choices: None,
            artist_choices: None,
            buzz_timestamps: HashMap::new(),
            started_at: None,
        }
    }

    /// Apply a song-level state machine event.
    pub fn apply(&mut self, event: SongEvent) -> Result<SongStatus, InvalidSongTransition> {
        self.status = self.status.transition(event)?;
        Ok(self.status)
    }

    /// Move the item from pending to playing.
    pub fn start(&mut self, now: Instant) -> Result<(), InvalidSongTransition> {
        self.apply(SongEvent::Start)?;
        self.started_at = Some(now);
        Ok(())
    }

    /// Whether the item is currently playing or being answered.
    pub fn is_live(&self) -> bool {
        matches!(self.status, SongStatus::Playing | SongStatus::Answering)
    }

    /// Whether some recorded answer found `field`.
    pub fn is_found(&self, field: AnswerField) -> bool {
        self.answers
            .iter()
            .any(|answer| answer.is_correct && answer.answer_type.fields().contains(&field))
    }

    /// Whether every field of the item has been found.
    pub fn is_resolved(&self) -> bool {
        self.is_found(AnswerField::Title) && self.is_found(AnswerField::Artist)
    }

    /// Whether `player_id` may no longer interact with this item.
    pub fn is_locked_out(&self, player_id: &str) -> bool {
        self.locked_out_player_ids.contains(player_id)
    }

    /// Give the answerer slot to `player_id`, starting a new turn.
    pub fn assign_slot(&mut self, player_id: &str, now: Instant) {
        self.active_player_id = Some(player_id.to_string());
        self.active_since = Some(now);
        self.turn += 1;
        self.turn_answered = false;
    }

    /// Release the answerer slot and return to playing.
    pub fn release_slot(&mut self) -> Result<(), InvalidSongTransition> {
        self.active_player_id = None;
        self.active_since = None;
        if self.status == SongStatus::Answering {
            self.apply(SongEvent::SlotReleased)?;
        }
        Ok(())
    }

    /// Lock a player out of this item. Returns `false` if they already were.
    pub fn lock_out(&mut self, player_id: &str) -> bool {
        self.locked_out_player_ids.insert(player_id.to_string())
    }

    /// Append an answer to the log.
    pub fn record_answer(&mut self, answer: Answer) {
        if self.active_player_id.as_deref() == Some(answer.player_id.as_str()) {
            self.turn_answered = true;
        }
        self.answers.push(answer);
    }

    /// Milliseconds elapsed since the song started playing.
    pub fn elapsed_ms(&self, now: Instant) -> u64 {
        self.started_at
            .map(|started| now.saturating_duration_since(started).as_millis() as u64)
            .unwrap_or_default()
    }

    /// Choice set for `field`, if one was generated.
    pub fn choices_for(&self, field: AnswerField) -> Option<&ChoiceSet> {
        match field {
            AnswerField::Title => self.title_choices.as_ref(),
            AnswerField::Artist => self.artist_choices.as_ref(),
        }
    }
}

/// Runtime state of a round.
#[derive(Debug, Clone)]
pub struct Round {
    /// Session that owns the round.
    pub session_id: Uuid,
    /// Zero-based position within the session.
    pub index: usize,
    /// Rule set selected for the whole round.
    pub mode: GameMode,
    /// Kind of content played.
    pub media_type: MediaType,
    /// Fully resolved gameplay parameters.
    pub params: GameplayParams,
    /// Lifecycle status.
    pub status: RoundStatus,
    /// Ordered quiz items.
    pub songs: Vec<RoundSong>,
    /// Index of the item currently (or last) played.
    pub current_song_index: Option<usize>,
    /// Running score per player for this round.
    pub scores: IndexMap<String, i32>,
}

impl Round {
    /// Build a pending round without songs, used while songs are being loaded.
    pub fn pending(
        session_id: Uuid,
        index: usize,
        mode: GameMode,
        media_type: MediaType,
        params: GameplayParams,
    ) -> Self {
        Self {
            session_id,
            index,
            mode,
            media_type,
            params,
            status: RoundStatus::Pending,
            songs: Vec::new(),
            current_song_index: None,
            scores: IndexMap::new(),
        }
    }

    /// Timer context identifying the song at `song_index`.
    pub fn song_context(&self, song_index: usize) -> SongTimerContext {
        SongTimerContext {
            session_id: self.session_id,
            round_index: self.index,
            song_index,
        }
    }

    /// Whether `context` still points at this round's current song.
    pub fn is_current(&self, context: &SongTimerContext) -> bool {
        self.session_id == context.session_id
            && self.index == context.round_index
            && self.current_song_index == Some(context.song_index)
    }

    /// The item currently (or last) played.
    pub fn current_song(&self) -> Option<&RoundSong> {
        self.current_song_index
            .and_then(|index| self.songs.get(index))
    }

    /// First item that has not been played yet.
    pub fn next_pending_song_index(&self) -> Option<usize> {
        self.songs
            .iter()
            .position(|song| song.status == SongStatus::Pending)
    }

    /// Accumulate points for a player.
    pub fn add_points(&mut self, player_id: &str, points: i32) -> i32 {
        let score = self.scores.entry(player_id.to_string()).or_insert(0);
        *score += points;
        *score
    }

    /// Every answer recorded across the round's songs.
    pub fn answers(&self) -> impl Iterator<Item = &Answer> {
        self.songs.iter().flat_map(|song| song.answers.iter())
    }
}

/// Player as cached by the session for the duration of a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlayer {
    /// Player identifier.
    pub id: String,
    /// Display name shown to other participants.
    pub name: String,
    /// The master drives the game and never competes.
    pub is_master: bool,
    /// Cleared on disconnect.
    pub connected: bool,
}

impl From<PlayerEntity> for SessionPlayer {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            is_master: value.is_master,
            connected: true,
        }
    }
}

/// One game in a room: an ordered list of round configurations and the rounds played so far.
#[derive(Debug, Clone)]
pub struct GameSession {
    /// Session identifier, as configured by the content collaborator.
    pub id: Uuid,
    /// Room hosting the game.
    pub room_id: String,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Configured rounds, in play order.
    pub rounds: Vec<RoundConfigEntity>,
    /// Index of the round currently (or last) played.
    pub current_round_index: Option<usize>,
    /// Players cached at the last round start, keyed by id.
    pub players: IndexMap<String, SessionPlayer>,
    /// Rounds already finalized, kept for the cumulative ranking.
    pub finished_rounds: Vec<Round>,
    /// Creation time.
    pub created_at: SystemTime,
}

impl GameSession {
    /// Create a waiting session.
    pub fn new(id: Uuid, room_id: &str, rounds: Vec<RoundConfigEntity>) -> Self {
        Self {
            id,
            room_id: room_id.to_string(),
            status: SessionStatus::Waiting,
            rounds,
            current_round_index: None,
            players: IndexMap::new(),
            finished_rounds: Vec::new(),
            created_at: SystemTime::now(),
        }
    }

    /// Apply a session-level state machine event.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionStatus, InvalidSessionTransition> {
        self.status = self.status.transition(event)?;
        Ok(self.status)
    }

    /// Replace the player cache, keeping the connection flag of known players.
    pub fn refresh_players(&mut self, players: Vec<PlayerEntity>) {
        let previous = std::mem::take(&mut self.players);
        self.players = players
            .into_iter()
            .map(|entity| {
                let mut player = SessionPlayer::from(entity);
                if let Some(known) = previous.get(&player.id) {
                    player.connected = known.connected;
                }
                (player.id.clone(), player)
            })
            .collect();
    }

    /// Display name of a player, falling back to the id.
    pub fn player_name(&self, player_id: &str) -> String {
        self.players
            .get(player_id)
            .map(|player| player.name.clone())
            .unwrap_or_else(|| player_id.to_string())
    }

    /// Non-master players, in join order.
    pub fn contestants(&self) -> Vec<&SessionPlayer> {
        self.players
            .values()
            .filter(|player| !player.is_master)
            .collect()
    }

    /// Identifiers of connected non-master players.
    pub fn active_player_ids(&self) -> Vec<String> {
        self.players
            .values()
            .filter(|player| !player.is_master && player.connected)
            .map(|player| player.id.clone())
            .collect()
    }

    /// Whether `round_index` is the last configured round.
    pub fn is_last_round(&self, round_index: usize) -> bool {
        round_index + 1 >= self.rounds.len()
    }
}

/// Derived end-of-round (or end-of-game) standing of a player.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FinalScore {
    /// Player identifier.
    pub player_id: String,
    /// Display name.
    pub player_name: String,
    /// Number of correct answers.
    pub correct_answers: u32,
    /// Number of wrong answers.
    pub wrong_answers: u32,
    /// Sum of awarded points, possibly negative.
    pub total_score: i32,
    /// Mean time-to-answer in milliseconds; absent when the player never answered.
    pub average_answer_time_ms: Option<u64>,
    /// 1-based position, unique per player.
    pub rank: usize,
}
