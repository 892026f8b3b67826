use std::{sync::Arc, time::Duration};

use quiz_engine::{
    config::AppConfig,
    dao::{
        choices::{CatalogChoiceGenerator, ChoiceGenerator},
        content::ContentStore,
        memory::{Catalog, InMemoryContentStore},
        models::{
            MediaType, PlayerEntity, RoomEntity, RoomStatus, RoundConfigEntity,
            SessionConfigEntity, SongEntity, SongFilter,
        },
    },
    dto::events::RoomEvent,
    error::ServiceError,
    modes::{AnswerSubmission, BuzzRejection, ModeKind, params::ParamOverrides},
    services::{gameplay, orchestrator},
    state::{
        AppState, SharedState,
        broadcast::RecordingBroadcaster,
        game::{AnswerField, AnswerType, RoundStatus},
        state_machine::{SessionStatus, SongStatus},
    },
};
use tokio::time::sleep;
use uuid::Uuid;

const ROOM: &str = "ABCD";

struct Harness {
    state: SharedState,
    content: Arc<InMemoryContentStore>,
    events: Arc<RecordingBroadcaster>,
}

impl Harness {
    fn new(rounds: Vec<RoundConfigEntity>) -> Self {
        let content = Arc::new(InMemoryContentStore::new(catalog(rounds)));
        let events = Arc::new(RecordingBroadcaster::new());
        let store: Arc<dyn ContentStore> = content.clone();
        let choices: Arc<dyn ChoiceGenerator> =
            Arc::new(CatalogChoiceGenerator::new(Arc::clone(&store)));
        let state = AppState::with_broadcaster(AppConfig::default(), store, choices, events.clone());
        Self {
            state,
            content,
            events,
        }
    }

    async fn start(&self, round_index: usize) -> Result<(), ServiceError> {
        orchestrator::start_round(&self.state, ROOM, session_id(), round_index)
            .await
            .map(|_| ())
    }

    async fn buzz(&self, player_id: &str, client_timestamp_ms: i64) -> quiz_engine::dto::room::BuzzResponse {
        gameplay::handle_buzz(&self.state, ROOM, player_id, client_timestamp_ms)
            .await
            .unwrap()
    }

    async fn answer(
        &self,
        player_id: &str,
        answer_type: AnswerType,
        value: &str,
    ) -> quiz_engine::dto::room::AnswerResponse {
        let submission = AnswerSubmission {
            answer_type,
            value: value.into(),
        };
        gameplay::handle_answer(&self.state, ROOM, player_id, submission)
            .await
            .unwrap()
    }

    /// Event names without countdown ticks.
    fn lifecycle(&self) -> Vec<&'static str> {
        self.events
            .names_for(ROOM)
            .into_iter()
            .filter(|name| !name.starts_with("timer:"))
            .collect()
    }

    fn count(&self, name: &str) -> usize {
        self.events
            .names_for(ROOM)
            .into_iter()
            .filter(|event| *event == name)
            .count()
    }

    fn song_status(&self, song_index: usize) -> SongStatus {
        self.state.store().current_round(ROOM).unwrap().songs[song_index].status
    }

    fn session_status(&self) -> Option<SessionStatus> {
        self.state.store().session(ROOM).map(|session| session.status)
    }
}

fn session_id() -> Uuid {
    Uuid::from_u128(0x6f1c_2a5e)
}

fn song(id: &str, title: &str, artist: &str, genre: &str) -> SongEntity {
    SongEntity {
        id: id.into(),
        title: title.into(),
        artist: artist.into(),
        media_type: MediaType::Audio,
        genre: Some(genre.into()),
        year: None,
    }
}

fn player(id: &str, name: &str, is_master: bool) -> PlayerEntity {
    PlayerEntity {
        id: id.into(),
        room_id: ROOM.into(),
        name: name.into(),
        is_master,
        score: 0,
    }
}

fn catalog(rounds: Vec<RoundConfigEntity>) -> Catalog {
    Catalog {
        rooms: vec![RoomEntity {
            id: ROOM.into(),
            status: RoomStatus::Lobby,
        }],
        players: vec![
            player("master", "Host", true),
            player("alice", "Alice", false),
            player("bob", "Bob", false),
        ],
        sessions: vec![SessionConfigEntity {
            id: session_id(),
            room_id: ROOM.into(),
            rounds,
        }],
        songs: vec![
            song("s1", "One More Time", "Daft Punk", "electro"),
            song("s2", "Sexy Boy", "Air", "electro"),
            song("s3", "Song 2", "Blur", "rock"),
            song("s4", "Smells Like Teen Spirit", "Nirvana", "rock"),
            song("s5", "Heart of Glass", "Blondie", "pop"),
        ],
    }
}

fn round(mode: ModeKind, song_ids: &[&str], song_secs: u64, answer_secs: u64) -> RoundConfigEntity {
    RoundConfigEntity {
        mode,
        media_type: MediaType::Audio,
        params: ParamOverrides {
            song_duration_secs: Some(song_secs),
            answer_timer_secs: Some(answer_secs),
            ..ParamOverrides::default()
        },
        song_ids: song_ids.iter().map(|id| id.to_string()).collect(),
        filter: None,
        song_limit: None,
        shuffle: false,
    }
}

#[tokio::test(start_paused = true)]
async fn title_then_artist_resolves_a_buzz_choice_song() {
    let harness = Harness::new(vec![round(ModeKind::BuzzChoice, &["s1", "s2"], 15, 5)]);
    let summary = orchestrator::start_round(&harness.state, ROOM, session_id(), 0)
        .await
        .unwrap();
    assert_eq!(summary.song_count, 2);
    assert_eq!(summary.params.song_duration_secs, 15);
    assert_eq!(summary.params.answer_timer_secs, 5);
    assert_eq!(harness.content.room_status(ROOM).await, Some(RoomStatus::Playing));

    let started = harness
        .events
        .events_for(ROOM)
        .into_iter()
        .find_map(|event| match event {
            RoomEvent::SongStarted(payload) => Some(payload),
            _ => None,
        })
        .unwrap();
    let title_choices = started.title_choices.unwrap();
    assert_eq!(title_choices.len(), 4);
    assert!(title_choices.contains(&"One More Time".to_string()));
    assert_eq!(started.content_url, "/media/s1");

    sleep(Duration::from_secs(1)).await;
    assert!(harness.buzz("alice", 1_000).await.accepted);
    assert_eq!(harness.song_status(0), SongStatus::Answering);

    sleep(Duration::from_secs(1)).await;
    let title = harness.answer("alice", AnswerType::Title, "One More Time").await;
    assert!(title.is_correct);
    assert_eq!(title.points_awarded, 1);
    assert!(!title.song_ended);

    let artist_choices = harness
        .events
        .events_for(ROOM)
        .into_iter()
        .find_map(|event| match event {
            RoomEvent::ChoicesArtist(payload) => Some(payload),
            _ => None,
        })
        .unwrap();
    assert_eq!(artist_choices.player_id, "alice");
    assert_eq!(artist_choices.choices.len(), 4);
    assert!(artist_choices.choices.contains(&"Daft Punk".to_string()));

    sleep(Duration::from_secs(1)).await;
    let artist = harness.answer("alice", AnswerType::Artist, "Daft Punk").await;
    assert!(artist.is_correct);
    assert_eq!(artist.points_awarded, 1);
    assert!(artist.song_ended);
    assert_eq!(harness.song_status(0), SongStatus::Finished);

    assert_eq!(
        harness.lifecycle(),
        vec![
            "round:started",
            "song:started",
            "player:buzzed",
            "answer:result",
            "choices:artist",
            "score:updated",
            "answer:result",
            "song:ended",
            "score:updated",
        ]
    );
    let ended = harness
        .events
        .events_for(ROOM)
        .into_iter()
        .find_map(|event| match event {
            RoomEvent::SongEnded(payload) => Some(payload),
            _ => None,
        })
        .unwrap();
    assert_eq!(ended.found_fields, vec![AnswerField::Title, AnswerField::Artist]);
    assert_eq!(harness.content.player_score("alice").await, Some(2));

    sleep(Duration::from_millis(5_500)).await;
    let round = harness.state.store().current_round(ROOM).unwrap();
    assert_eq!(round.current_song_index, Some(1));
    assert_eq!(round.songs[1].status, SongStatus::Playing);
}

#[tokio::test(start_paused = true)]
async fn wrong_answer_locks_out_and_frees_the_slot() {
    let harness = Harness::new(vec![round(ModeKind::FastBuzz, &["s1", "s2"], 15, 5)]);
    harness.start(0).await.unwrap();

    assert!(harness.buzz("alice", 1_000).await.accepted);
    let verdict = harness.answer("alice", AnswerType::Title, "Around the World").await;
    assert!(!verdict.is_correct);
    assert!(verdict.locked_out);
    assert!(!verdict.song_ended);

    let round = harness.state.store().current_round(ROOM).unwrap();
    assert_eq!(round.songs[0].status, SongStatus::Playing);
    assert!(round.songs[0].is_locked_out("alice"));
    assert!(round.songs[0].active_player_id.is_none());

    let again = harness.buzz("alice", 2_000).await;
    assert_eq!(again.rejection, Some(BuzzRejection::LockedOut));
    assert!(harness.buzz("bob", 2_500).await.accepted);
}

#[tokio::test(start_paused = true)]
async fn song_ends_once_every_player_is_locked_out() {
    let harness = Harness::new(vec![round(ModeKind::FastBuzz, &["s1", "s2"], 15, 5)]);
    harness.start(0).await.unwrap();

    harness.buzz("alice", 1_000).await;
    assert!(!harness.answer("alice", AnswerType::Title, "Nope").await.song_ended);
    harness.buzz("bob", 1_200).await;
    let last = harness.answer("bob", AnswerType::Artist, "Nobody").await;
    assert!(last.song_ended);

    assert_eq!(harness.song_status(0), SongStatus::Finished);
    assert_eq!(harness.count("song:ended"), 1);
    assert!(harness.state.timers().song_timer_remaining(ROOM).is_none());
    assert!(harness.state.timers().has_pending_reveal(ROOM));
}

#[tokio::test(start_paused = true)]
async fn answer_timeout_locks_out_and_releases_the_slot() {
    let harness = Harness::new(vec![round(ModeKind::FastBuzz, &["s1", "s2"], 15, 5)]);
    harness.start(0).await.unwrap();

    harness.buzz("alice", 1_000).await;
    sleep(Duration::from_millis(5_500)).await;

    let timed_out = harness
        .events
        .events_for(ROOM)
        .into_iter()
        .find_map(|event| match event {
            RoomEvent::AnswerResult(payload) if payload.timed_out => Some(payload),
            _ => None,
        })
        .unwrap();
    assert_eq!(timed_out.player_id, "alice");
    assert_eq!(timed_out.player_name, "Alice");
    assert!(timed_out.locked_out);

    let round = harness.state.store().current_round(ROOM).unwrap();
    assert_eq!(round.songs[0].status, SongStatus::Playing);
    assert!(round.songs[0].is_locked_out("alice"));
    assert!(harness.state.timers().answer_timer_player(ROOM).is_none());

    let ticks = harness.count("timer:answer");
    assert_eq!(ticks, 5);
    sleep(Duration::from_secs(3)).await;
    assert_eq!(harness.count("timer:answer"), ticks);
    assert!(harness.buzz("bob", 7_000).await.accepted);
}

#[tokio::test(start_paused = true)]
async fn pause_and_resume_keep_the_remaining_song_time() {
    let harness = Harness::new(vec![round(ModeKind::FastBuzz, &["s1", "s2"], 15, 5)]);
    harness.start(0).await.unwrap();

    sleep(Duration::from_secs(6)).await;
    orchestrator::pause_game(&harness.state, ROOM).await.unwrap();
    assert_eq!(harness.session_status(), Some(SessionStatus::Paused));
    assert_eq!(
        harness.state.timers().song_timer_remaining(ROOM),
        Some(Duration::from_secs(9))
    );
    assert!(matches!(
        orchestrator::pause_game(&harness.state, ROOM).await,
        Err(ServiceError::InvalidState(_))
    ));

    let paused = harness.buzz("alice", 6_000).await;
    assert_eq!(paused.rejection, Some(BuzzRejection::GamePaused));

    sleep(Duration::from_secs(60)).await;
    assert_eq!(harness.song_status(0), SongStatus::Playing);

    harness.events.clear();
    orchestrator::resume_game(&harness.state, ROOM).await.unwrap();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(harness.session_status(), Some(SessionStatus::Playing));

    let events = harness.events.events_for(ROOM);
    assert!(matches!(
        events.first(),
        Some(RoomEvent::GameResumed(resumed)) if resumed.remaining_secs == 9
    ));
    let first_tick = events.iter().find_map(|event| match event {
        RoomEvent::TimerSong(tick) => Some(tick.remaining_secs),
        _ => None,
    });
    assert_eq!(first_tick, Some(9));

    sleep(Duration::from_secs(9)).await;
    assert_eq!(harness.song_status(0), SongStatus::Finished);
    assert_eq!(harness.count("song:ended"), 1);
}

#[tokio::test(start_paused = true)]
async fn pause_freezes_the_answer_countdown_of_the_holder() {
    let harness = Harness::new(vec![round(ModeKind::FastBuzz, &["s1", "s2"], 15, 5)]);
    harness.start(0).await.unwrap();

    assert!(harness.buzz("alice", 1_000).await.accepted);
    sleep(Duration::from_secs(2)).await;
    orchestrator::pause_game(&harness.state, ROOM).await.unwrap();
    assert_eq!(
        harness.state.timers().answer_timer_remaining(ROOM),
        Some(Duration::from_secs(3))
    );
    assert!(matches!(
        gameplay::handle_answer(
            &harness.state,
            ROOM,
            "alice",
            AnswerSubmission {
                answer_type: AnswerType::Title,
                value: "One More Time".into(),
            },
        )
        .await,
        Err(ServiceError::InvalidState(_))
    ));

    sleep(Duration::from_secs(6)).await;
    let round = harness.state.store().current_round(ROOM).unwrap();
    assert!(!round.songs[0].is_locked_out("alice"));
    assert_eq!(round.songs[0].active_player_id.as_deref(), Some("alice"));
    assert_eq!(round.songs[0].status, SongStatus::Answering);
    assert_eq!(
        harness.state.timers().answer_timer_player(ROOM).as_deref(),
        Some("alice")
    );

    orchestrator::resume_game(&harness.state, ROOM).await.unwrap();
    sleep(Duration::from_secs(2)).await;
    let verdict = harness.answer("alice", AnswerType::Title, "One More Time").await;
    assert!(verdict.is_correct);
    assert!(!verdict.locked_out);
}

#[tokio::test(start_paused = true)]
async fn disconnected_players_cannot_buzz() {
    let harness = Harness::new(vec![round(ModeKind::FastBuzz, &["s1", "s2"], 15, 5)]);
    harness.start(0).await.unwrap();

    gameplay::handle_player_disconnect(&harness.state, ROOM, "alice")
        .await
        .unwrap();
    let rejected = harness.buzz("alice", 1_000).await;
    assert!(!rejected.accepted);
    assert_eq!(rejected.rejection, Some(BuzzRejection::Disconnected));
    let round = harness.state.store().current_round(ROOM).unwrap();
    assert!(round.songs[0].active_player_id.is_none());
    assert!(harness.state.timers().answer_timer_player(ROOM).is_none());

    gameplay::handle_player_reconnect(&harness.state, ROOM, "alice")
        .await
        .unwrap();
    assert!(harness.buzz("alice", 1_200).await.accepted);
}

#[tokio::test(start_paused = true)]
async fn disconnected_players_cannot_type_answers() {
    let harness = Harness::new(vec![round(ModeKind::TypedAnswer, &["s1", "s2"], 15, 5)]);
    harness.start(0).await.unwrap();

    gameplay::handle_player_disconnect(&harness.state, ROOM, "bob")
        .await
        .unwrap();
    assert!(matches!(
        gameplay::handle_answer(
            &harness.state,
            ROOM,
            "bob",
            AnswerSubmission {
                answer_type: AnswerType::Title,
                value: "One More Time".into(),
            },
        )
        .await,
        Err(ServiceError::InvalidState(_))
    ));
    let round = harness.state.store().current_round(ROOM).unwrap();
    assert!(round.songs[0].answers.is_empty());
    assert_eq!(harness.count("answer:result"), 0);
}

#[tokio::test(start_paused = true)]
async fn zero_matching_songs_roll_back_the_session() {
    let mut empty_filter = round(ModeKind::FastBuzz, &[], 15, 5);
    empty_filter.filter = Some(SongFilter {
        genres: vec!["jazz".into()],
        ..SongFilter::default()
    });
    let no_source = round(ModeKind::FastBuzz, &[], 15, 5);
    let harness = Harness::new(vec![empty_filter, no_source]);

    for round_index in [0, 1] {
        assert!(matches!(
            harness.start(round_index).await,
            Err(ServiceError::Configuration(_))
        ));
        assert!(!harness.state.store().has_active_game(ROOM));
        assert!(harness.state.store().room_for_session(session_id()).is_none());
    }
    assert!(matches!(harness.start(7).await, Err(ServiceError::NotFound(_))));

    assert!(harness.events.events_for(ROOM).is_empty());
    assert_eq!(harness.content.room_status(ROOM).await, Some(RoomStatus::Lobby));
}

#[tokio::test(start_paused = true)]
async fn filters_respect_limits_and_the_round_media_type() {
    let mut config = round(ModeKind::TypedAnswer, &[], 15, 5);
    config.filter = Some(SongFilter {
        genres: vec!["electro".into(), "rock".into()],
        ..SongFilter::default()
    });
    config.song_limit = Some(3);
    config.shuffle = true;
    let harness = Harness::new(vec![config]);

    let summary = orchestrator::start_round(&harness.state, ROOM, session_id(), 0)
        .await
        .unwrap();
    assert_eq!(summary.song_count, 3);
    let round = harness.state.store().current_round(ROOM).unwrap();
    assert!(round
        .songs
        .iter()
        .all(|song| ["s1", "s2", "s3", "s4"].contains(&song.song.id.as_str())));
}

#[tokio::test(start_paused = true)]
async fn end_game_is_idempotent_and_silences_timers() {
    let harness = Harness::new(vec![
        round(ModeKind::FastBuzz, &["s1", "s2"], 15, 5),
        round(ModeKind::FastBuzz, &["s3"], 15, 5),
    ]);
    harness.start(0).await.unwrap();
    harness.buzz("alice", 500).await;

    orchestrator::end_game(&harness.state, ROOM).await.unwrap();
    assert!(!harness.state.store().has_active_game(ROOM));
    assert_eq!(harness.content.room_status(ROOM).await, Some(RoomStatus::Finished));

    let lifecycle = harness.lifecycle();
    let tail = &lifecycle[lifecycle.len() - 3..];
    assert_eq!(tail, ["song:ended", "round:ended", "game:ended"]);
    let last_round = harness
        .events
        .events_for(ROOM)
        .into_iter()
        .find_map(|event| match event {
            RoomEvent::RoundEnded(payload) => Some(payload),
            _ => None,
        })
        .unwrap();
    assert!(last_round.is_last_round);

    let before = harness.events.events_for(ROOM).len();
    orchestrator::end_game(&harness.state, ROOM).await.unwrap();
    sleep(Duration::from_secs(30)).await;
    assert_eq!(harness.events.events_for(ROOM).len(), before);
    assert_eq!(harness.count("game:ended"), 1);

    assert!(matches!(
        gameplay::handle_buzz(&harness.state, ROOM, "alice", 1_000).await,
        Err(ServiceError::NoActiveGame(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn disconnect_of_the_answerer_releases_the_song() {
    let harness = Harness::new(vec![round(ModeKind::FastBuzz, &["s1", "s2"], 15, 5)]);
    harness.start(0).await.unwrap();

    harness.buzz("alice", 1_000).await;
    gameplay::handle_player_disconnect(&harness.state, ROOM, "alice")
        .await
        .unwrap();

    let round = harness.state.store().current_round(ROOM).unwrap();
    assert_eq!(round.songs[0].status, SongStatus::Playing);
    assert!(round.songs[0].is_locked_out("alice"));
    assert!(harness.state.timers().answer_timer_player(ROOM).is_none());

    assert!(harness.buzz("bob", 1_500).await.accepted);
    let verdict = harness.answer("bob", AnswerType::Title, "Wrong").await;
    assert!(verdict.song_ended);

    gameplay::handle_player_reconnect(&harness.state, ROOM, "alice")
        .await
        .unwrap();
    let session = harness.state.store().session(ROOM).unwrap();
    assert!(session.players["alice"].connected);
    assert!(matches!(
        gameplay::handle_player_disconnect(&harness.state, ROOM, "ghost").await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn earlier_stamped_buzz_preempts_only_within_the_window() {
    let harness = Harness::new(vec![round(ModeKind::FastBuzz, &["s1", "s2"], 15, 5)]);
    harness.start(0).await.unwrap();

    assert!(harness.buzz("alice", 2_000).await.accepted);
    sleep(Duration::from_millis(100)).await;
    let preempting = harness.buzz("bob", 1_500).await;
    assert!(preempting.accepted);
    assert_eq!(preempting.displaced_player_id.as_deref(), Some("alice"));
    assert_eq!(
        harness.state.timers().answer_timer_player(ROOM).as_deref(),
        Some("bob")
    );

    sleep(Duration::from_millis(300)).await;
    let late = harness.buzz("alice", 1_000).await;
    assert_eq!(late.rejection, Some(BuzzRejection::SlotTaken));

    let round = harness.state.store().current_round(ROOM).unwrap();
    assert!(!round.songs[0].is_locked_out("alice"));
    assert_eq!(round.songs[0].active_player_id.as_deref(), Some("bob"));
}

#[tokio::test(start_paused = true)]
async fn rounds_chain_until_the_last_one_ends_the_game() {
    let harness = Harness::new(vec![
        round(ModeKind::FastBuzz, &["s1"], 10, 5),
        round(ModeKind::FastBuzz, &["s4"], 10, 5),
    ]);
    harness.start(0).await.unwrap();

    harness.buzz("alice", 1_000).await;
    let both = harness
        .answer("alice", AnswerType::Both, "one more time - daft punk")
        .await;
    assert!(both.is_correct);
    assert_eq!(both.points_awarded, 2);
    assert!(both.song_ended);

    sleep(Duration::from_millis(5_500)).await;
    assert_eq!(harness.count("round:ended"), 1);
    assert_eq!(harness.count("game:ended"), 0);
    assert_eq!(harness.session_status(), Some(SessionStatus::Waiting));
    assert_eq!(
        harness.content.room_status(ROOM).await,
        Some(RoomStatus::BetweenRounds)
    );
    assert_eq!(
        harness.state.store().current_round(ROOM).map(|round| round.status),
        Some(RoundStatus::Finished)
    );

    assert!(matches!(harness.start(0).await, Err(ServiceError::InvalidState(_))));
    harness.start(1).await.unwrap();
    assert_eq!(harness.session_status(), Some(SessionStatus::Playing));

    sleep(Duration::from_millis(10_500)).await;
    assert_eq!(harness.count("song:ended"), 2);
    sleep(Duration::from_millis(5_500)).await;

    assert_eq!(harness.count("round:ended"), 2);
    assert_eq!(harness.count("game:ended"), 1);
    assert!(!harness.state.store().has_active_game(ROOM));
    assert_eq!(harness.content.room_status(ROOM).await, Some(RoomStatus::Finished));

    let rankings = harness
        .events
        .events_for(ROOM)
        .into_iter()
        .find_map(|event| match event {
            RoomEvent::GameEnded(payload) => Some(payload.rankings),
            _ => None,
        })
        .unwrap();
    assert_eq!(rankings.len(), 2);
    assert_eq!(rankings[0].player_id, "alice");
    assert_eq!(rankings[0].total_score, 2);
    assert_eq!(rankings[0].rank, 1);
    assert_eq!(rankings[1].player_id, "bob");
    assert_eq!(rankings[1].rank, 2);
}

#[tokio::test(start_paused = true)]
async fn score_persistence_failure_keeps_the_game_going() {
    let harness = Harness::new(vec![round(ModeKind::FastBuzz, &["s1", "s2"], 15, 5)]);
    harness.start(0).await.unwrap();
    harness.content.fail_score_updates(true);

    harness.buzz("alice", 1_000).await;
    let verdict = harness
        .answer("alice", AnswerType::Title, "One More Time")
        .await;
    assert!(verdict.is_correct);

    let update = harness
        .events
        .events_for(ROOM)
        .into_iter()
        .find_map(|event| match event {
            RoomEvent::ScoreUpdated(payload) => Some(payload),
            _ => None,
        })
        .unwrap();
    assert_eq!(update.round_score, 1);
    assert_eq!(update.total_score, None);
    assert_eq!(harness.content.player_score("alice").await, Some(0));

    let round = harness.state.store().current_round(ROOM).unwrap();
    assert_eq!(round.scores["alice"], 1);
    assert_eq!(round.songs[0].status, SongStatus::Playing);
}

#[tokio::test(start_paused = true)]
async fn typed_answers_need_no_buzzer() {
    let harness = Harness::new(vec![round(ModeKind::TypedAnswer, &["s1", "s2"], 15, 5)]);
    harness.start(0).await.unwrap();

    let buzz = harness.buzz("alice", 1_000).await;
    assert_eq!(buzz.rejection, Some(BuzzRejection::BuzzingDisabled));

    let title = harness.answer("alice", AnswerType::Title, "one more tyme").await;
    assert!(title.is_correct);
    assert!(!title.song_ended);

    assert!(matches!(
        gameplay::handle_answer(
            &harness.state,
            ROOM,
            "bob",
            AnswerSubmission {
                answer_type: AnswerType::Title,
                value: "One More Time".into(),
            },
        )
        .await,
        Err(ServiceError::InvalidInput(_))
    ));

    let artist = harness.answer("bob", AnswerType::Artist, "daft punk").await;
    assert!(artist.is_correct);
    assert!(artist.song_ended);
}

#[tokio::test(start_paused = true)]
async fn masters_and_strangers_cannot_play() {
    let harness = Harness::new(vec![round(ModeKind::FastBuzz, &["s1"], 15, 5)]);
    assert!(matches!(
        gameplay::handle_buzz(&harness.state, ROOM, "alice", 0).await,
        Err(ServiceError::NoActiveGame(_))
    ));

    harness.start(0).await.unwrap();
    assert!(matches!(
        gameplay::handle_buzz(&harness.state, ROOM, "master", 0).await,
        Err(ServiceError::InvalidInput(_))
    ));
    assert!(matches!(
        gameplay::handle_buzz(&harness.state, ROOM, "ghost", 0).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn teardown_cancels_timers_and_forgets_the_room() {
    let harness = Harness::new(vec![round(ModeKind::FastBuzz, &["s1", "s2"], 15, 5)]);
    harness.start(0).await.unwrap();
    harness.buzz("alice", 1_000).await;

    assert!(orchestrator::teardown_room(&harness.state, ROOM).await);
    assert!(!harness.state.store().has_active_game(ROOM));
    assert!(harness.state.timers().song_timer_remaining(ROOM).is_none());
    assert!(harness.state.timers().answer_timer_player(ROOM).is_none());

    let before = harness.events.events_for(ROOM).len();
    sleep(Duration::from_secs(30)).await;
    assert_eq!(harness.events.events_for(ROOM).len(), before);
    assert!(!orchestrator::teardown_room(&harness.state, ROOM).await);
}
