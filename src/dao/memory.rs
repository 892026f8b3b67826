//! In-memory content collaborator seeded from a JSON catalog.

use std::{
    fs, io,
    io::ErrorKind,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::future::BoxFuture;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        content::ContentStore,
        models::{
            MediaType, PlayerEntity, RoomEntity, RoomStatus, SessionConfigEntity, SongEntity,
            SongFilter,
        },
        storage::{StorageError, StorageResult},
    },
    state::game::AnswerField,
};

/// Whole content snapshot held by [`InMemoryContentStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Known rooms.
    #[serde(default)]
    pub rooms: Vec<RoomEntity>,
    /// Players of every room.
    #[serde(default)]
    pub players: Vec<PlayerEntity>,
    /// Configured sessions.
    #[serde(default)]
    pub sessions: Vec<SessionConfigEntity>,
    /// Song catalogue.
    #[serde(default)]
    pub songs: Vec<SongEntity>,
}

impl Catalog {
    /// Read a catalog from `path`, falling back to an empty one when the file is missing or invalid.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Catalog>(&contents) {
                Ok(catalog) => {
                    info!(
                        path = %path.display(),
                        rooms = catalog.rooms.len(),
                        songs = catalog.songs.len(),
                        "loaded content catalog"
                    );
                    catalog
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse catalog; starting empty"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "catalog file not found; starting empty");
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read catalog; starting empty"
                );
                Self::default()
            }
        }
    }
}

/// [`ContentStore`] keeping everything behind a single async lock.
pub struct InMemoryContentStore {
    catalog: Arc<RwLock<Catalog>>,
    fail_score_updates: Arc<AtomicBool>,
}

impl InMemoryContentStore {
    /// Serve `catalog` from memory.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(RwLock::new(catalog)),
            fail_score_updates: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every subsequent score update fail with [`StorageError::Unavailable`].
    pub fn fail_score_updates(&self, fail: bool) {
        self.fail_score_updates.store(fail, Ordering::SeqCst);
    }

    /// Current status of a room, if it exists.
    pub async fn room_status(&self, room_id: &str) -> Option<RoomStatus> {
        let catalog = self.catalog.read().await;
        catalog
            .rooms
            .iter()
            .find(|room| room.id == room_id)
            .map(|room| room.status)
    }

    /// Persistent score of a player, if it exists.
    pub async fn player_score(&self, player_id: &str) -> Option<i32> {
        let catalog = self.catalog.read().await;
        catalog
            .players
            .iter()
            .find(|player| player.id == player_id)
            .map(|player| player.score)
    }
}

impl ContentStore for InMemoryContentStore {
    fn find_room(&self, room_id: &str) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let catalog = Arc::clone(&self.catalog);
        let room_id = room_id.to_string();
        Box::pin(async move {
            let catalog = catalog.read().await;
            Ok(catalog.rooms.iter().find(|room| room.id == room_id).cloned())
        })
    }

    fn update_room_status(
        &self,
        room_id: &str,
        status: RoomStatus,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let catalog = Arc::clone(&self.catalog);
        let room_id = room_id.to_string();
        Box::pin(async move {
            let mut catalog = catalog.write().await;
            let room = catalog
                .rooms
                .iter_mut()
                .find(|room| room.id == room_id)
                .ok_or_else(|| StorageError::NotFound(format!("room {room_id}")))?;
            room.status = status;
            Ok(())
        })
    }

    fn find_session_config(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SessionConfigEntity>>> {
        let catalog = Arc::clone(&self.catalog);
        Box::pin(async move {
            let catalog = catalog.read().await;
            Ok(catalog
                .sessions
                .iter()
                .find(|session| session.id == session_id)
                .cloned())
        })
    }

    fn list_players(&self, room_id: &str) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let catalog = Arc::clone(&self.catalog);
        let room_id = room_id.to_string();
        Box::pin(async move {
            let catalog = catalog.read().await;
            Ok(catalog
                .players
                .iter()
                .filter(|player| player.room_id == room_id)
                .cloned()
                .collect())
        })
    }

    fn add_player_score(
        &self,
        player_id: &str,
        delta: i32,
    ) -> BoxFuture<'static, StorageResult<i32>> {
        let catalog = Arc::clone(&self.catalog);
        let fail = Arc::clone(&self.fail_score_updates);
        let player_id = player_id.to_string();
        Box::pin(async move {
            if fail.load(Ordering::SeqCst) {
                return Err(StorageError::unavailable(
                    "score updates disabled".into(),
                    io::Error::other("simulated outage"),
                ));
            }

            let mut catalog = catalog.write().await;
            let player = catalog
                .players
                .iter_mut()
                .find(|player| player.id == player_id)
                .ok_or_else(|| StorageError::NotFound(format!("player {player_id}")))?;
            player.score += delta;
            Ok(player.score)
        })
    }

    fn find_songs_by_ids(
        &self,
        ids: Vec<String>,
    ) -> BoxFuture<'static, StorageResult<Vec<SongEntity>>> {
        let catalog = Arc::clone(&self.catalog);
        Box::pin(async move {
            let catalog = catalog.read().await;
            Ok(ids
                .iter()
                .filter_map(|id| catalog.songs.iter().find(|song| &song.id == id))
                .cloned()
                .collect())
        })
    }

    fn find_songs_by_filter(
        &self,
        filter: SongFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<SongEntity>>> {
        let catalog = Arc::clone(&self.catalog);
        Box::pin(async move {
            let catalog = catalog.read().await;
            Ok(catalog
                .songs
                .iter()
                .filter(|song| filter.matches(song))
                .cloned()
                .collect())
        })
    }

    fn sample_field_values(
        &self,
        field: AnswerField,
        media_type: MediaType,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<String>>> {
        let catalog = Arc::clone(&self.catalog);
        Box::pin(async move {
            let catalog = catalog.read().await;
            let values: IndexSet<&str> = catalog
                .songs
                .iter()
                .filter(|song| song.media_type == media_type)
                .map(|song| field.value_of(song))
                .collect();
            Ok(values
                .into_iter()
                .take(limit)
                .map(str::to_string)
                .collect())
        })
    }
}
