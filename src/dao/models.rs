use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::modes::{ModeKind, params::ParamOverrides};

/// Room lifecycle as tracked by the content collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// Players are gathering.
    Lobby,
    /// A round is being played.
    Playing,
    /// A round finished and the next one has not started yet.
    BetweenRounds,
    /// The game is over.
    Finished,
}

/// Kind of content an item carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    /// Audio clip.
    Audio,
    /// Still image.
    Image,
    /// Video clip.
    Video,
    /// Plain text prompt.
    Text,
}

/// Room known to the content collaborator, identified by its join code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomEntity {
    /// Join code.
    pub id: String,
    /// Current lifecycle status.
    pub status: RoomStatus,
}

/// Player registered in a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Stable identifier.
    pub id: String,
    /// Room the player joined.
    pub room_id: String,
    /// Display name.
    pub name: String,
    /// The master device configures and drives the game.
    #[serde(default)]
    pub is_master: bool,
    /// Persistent score across games.
    #[serde(default)]
    pub score: i32,
}

/// Quiz item stored in the catalogue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SongEntity {
    /// Stable identifier, also used to build content-reference URLs.
    pub id: String,
    /// Ground-truth title.
    pub title: String,
    /// Ground-truth artist.
    pub artist: String,
    /// Kind of content.
    pub media_type: MediaType,
    /// Genre used by filters.
    #[serde(default)]
    pub genre: Option<String>,
    /// Release year used by filters.
    #[serde(default)]
    pub year: Option<u16>,
}

/// Metadata filter used to select a round's songs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SongFilter {
    /// Restrict to one kind of content.
    #[serde(default)]
    pub media_type: Option<MediaType>,
    /// Accepted genres; empty accepts any.
    #[serde(default)]
    pub genres: Vec<String>,
    /// Exact artist, compared case-insensitively.
    #[serde(default)]
    pub artist: Option<String>,
    /// Earliest release year, inclusive.
    #[serde(default)]
    pub year_from: Option<u16>,
    /// Latest release year, inclusive.
    #[serde(default)]
    pub year_to: Option<u16>,
}

impl SongFilter {
    /// Whether `song` satisfies every constraint of the filter.
    pub fn matches(&self, song: &SongEntity) -> bool {
        if self.media_type.is_some_and(|media| media != song.media_type) {
            return false;
        }

        if !self.genres.is_empty() {
            let Some(genre) = song.genre.as_deref() else {
                return false;
            };
            if !self
                .genres
                .iter()
                .any(|wanted| wanted.eq_ignore_ascii_case(genre))
            {
                return false;
            }
        }

        if let Some(artist) = self.artist.as_deref() {
            if !artist.eq_ignore_ascii_case(&song.artist) {
                return false;
            }
        }

        match song.year {
            Some(year) => {
                self.year_from.is_none_or(|from| year >= from)
                    && self.year_to.is_none_or(|to| year <= to)
            }
            None => self.year_from.is_none() && self.year_to.is_none(),
        }
    }
}

/// Configuration of one round of a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundConfigEntity {
    /// Rule set for the round.
    pub mode: ModeKind,
    /// Kind of content played.
    pub media_type: MediaType,
    /// Round-level parameter overrides.
    #[serde(default)]
    pub params: ParamOverrides,
    /// Explicit song selection; takes precedence over `filter`.
    #[serde(default)]
    pub song_ids: Vec<String>,
    /// Metadata-based song selection.
    #[serde(default)]
    pub filter: Option<SongFilter>,
    /// Maximum number of songs played.
    #[serde(default)]
    pub song_limit: Option<usize>,
    /// Shuffle the selected songs before playing.
    #[serde(default)]
    pub shuffle: bool,
}

/// Configuration of a whole game, prepared by the master before starting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfigEntity {
    /// Session identifier.
    pub id: Uuid,
    /// Room the session is meant for.
    pub room_id: String,
    /// Rounds, in play order.
    pub rounds: Vec<RoundConfigEntity>,
}
