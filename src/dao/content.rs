use futures::future::BoxFuture;
use uuid::Uuid;

use crate::{
    dao::{
        models::{
            MediaType, PlayerEntity, RoomEntity, RoomStatus, SessionConfigEntity, SongEntity,
            SongFilter,
        },
        storage::StorageResult,
    },
    state::game::AnswerField,
};

/// Abstraction over the content collaborator owning rooms, players, sessions, and songs.
pub trait ContentStore: Send + Sync {
    /// Room by identifier.
    fn find_room(&self, room_id: &str) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;
    /// Record the lifecycle status of a room.
    fn update_room_status(
        &self,
        room_id: &str,
        status: RoomStatus,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Session configuration by identifier.
    fn find_session_config(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SessionConfigEntity>>>;
    /// Players of a room, master included.
    fn list_players(&self, room_id: &str) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    /// Add `delta` to a player's persistent score and return the new total.
    fn add_player_score(&self, player_id: &str, delta: i32)
    -> BoxFuture<'static, StorageResult<i32>>;
    /// Songs in the order of `ids`; unknown ids are skipped.
    fn find_songs_by_ids(
        &self,
        ids: Vec<String>,
    ) -> BoxFuture<'static, StorageResult<Vec<SongEntity>>>;
    /// Songs satisfying `filter`, in catalogue order.
    fn find_songs_by_filter(
        &self,
        filter: SongFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<SongEntity>>>;
    /// Distinct catalogue values of `field` for songs of `media_type`, at most `limit` of them.
    fn sample_field_values(
        &self,
        field: AnswerField,
        media_type: MediaType,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<String>>>;
}
