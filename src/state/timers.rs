//! Per-room countdowns: one song timer, one answer timer and one reveal continuation at most.
//!
//! Every timer is a tokio task. Expiry removes the timer from its slot only if the slot still
//! holds that same timer, then runs the callback as a detached task so a callback tearing the
//! room down never aborts itself. Callbacks must re-check that their context is still current.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval, sleep_until},
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    dto::events::{AnswerTimerEvent, PauseEvent, RoomEvent, SongTimerEvent},
    state::broadcast::RoomBroadcaster,
};

/// Work run when a timer expires.
pub type TimerCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

type Ticker = Box<dyn FnMut(u64) + Send>;

const TICK: Duration = Duration::from_secs(1);

/// Identifies the song a song timer was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SongTimerContext {
    /// Session the song belongs to.
    pub session_id: Uuid,
    /// Round the song belongs to.
    pub round_index: usize,
    /// Position of the song in its round.
    pub song_index: usize,
}

/// Identifies the answering turn an answer timer was started for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerTimerContext {
    /// Song being answered.
    pub song: SongTimerContext,
    /// Slot holder.
    pub player_id: String,
    /// Turn of the song at the time the slot was assigned.
    pub turn: u64,
}

struct RunningTimer {
    id: u64,
    deadline: Instant,
    handle: JoinHandle<()>,
}

impl RunningTimer {
    fn cancel(self) {
        self.handle.abort();
    }

    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

enum SongTimer {
    Running {
        timer: RunningTimer,
        context: SongTimerContext,
        on_expire: TimerCallback,
    },
    Paused {
        remaining: Duration,
        context: SongTimerContext,
        on_expire: TimerCallback,
    },
}

impl SongTimer {
    fn cancel(self) {
        if let SongTimer::Running { timer, .. } = self {
            timer.cancel();
        }
    }

    fn context(&self) -> SongTimerContext {
        match self {
            SongTimer::Running { context, .. } | SongTimer::Paused { context, .. } => *context,
        }
    }
}

enum AnswerTimer {
    Running {
        timer: RunningTimer,
        context: AnswerTimerContext,
        on_expire: TimerCallback,
    },
    Paused {
        remaining: Duration,
        context: AnswerTimerContext,
        on_expire: TimerCallback,
    },
}

impl AnswerTimer {
    fn cancel(self) {
        if let AnswerTimer::Running { timer, .. } = self {
            timer.cancel();
        }
    }

    fn context(&self) -> &AnswerTimerContext {
        match self {
            AnswerTimer::Running { context, .. } | AnswerTimer::Paused { context, .. } => context,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Slot {
    Song,
    Answer,
    Reveal,
}

#[derive(Default)]
struct RoomTimers {
    song: Option<SongTimer>,
    answer: Option<AnswerTimer>,
    reveal: Option<RunningTimer>,
}

impl RoomTimers {
    /// Free `slot` if it still holds timer `id`.
    fn take_expired(&mut self, slot: Slot, id: u64) -> bool {
        match slot {
            Slot::Song => {
                let current = matches!(
                    &self.song,
                    Some(SongTimer::Running { timer, .. }) if timer.id == id
                );
                if current {
                    self.song = None;
                }
                current
            }
            Slot::Answer => {
                let current = matches!(
                    &self.answer,
                    Some(AnswerTimer::Running { timer, .. }) if timer.id == id
                );
                if current {
                    self.answer = None;
                }
                current
            }
            Slot::Reveal => {
                let current = self.reveal.as_ref().is_some_and(|timer| timer.id == id);
                if current {
                    self.reveal = None;
                }
                current
            }
        }
    }

    fn cancel_all(&mut self) {
        if let Some(song) = self.song.take() {
            song.cancel();
        }
        if let Some(answer) = self.answer.take() {
            answer.cancel();
        }
        if let Some(reveal) = self.reveal.take() {
            reveal.cancel();
        }
    }
}

/// Countdown scheduler keyed by room.
pub struct TimerManager {
    rooms: Arc<DashMap<String, RoomTimers>>,
    next_id: AtomicU64,
    broadcaster: Arc<dyn RoomBroadcaster>,
}

impl TimerManager {
    /// Create a manager broadcasting countdown progress through `broadcaster`.
    pub fn new(broadcaster: Arc<dyn RoomBroadcaster>) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
            broadcaster,
        }
    }

    /// Start the song countdown of a room, replacing any previous one.
    pub fn start_song_timer(
        &self,
        room_id: &str,
        context: SongTimerContext,
        duration: Duration,
        on_expire: TimerCallback,
    ) {
        let mut timers = self.rooms.entry(room_id.to_string()).or_default();
        if let Some(previous) = timers.song.take() {
            previous.cancel();
        }
        let timer = self.spawn_song(room_id, context, duration, Arc::clone(&on_expire));
        timers.song = Some(SongTimer::Running {
            timer,
            context,
            on_expire,
        });
    }

    /// Freeze the song countdown. Returns `false` when no countdown is running.
    pub fn pause_song_timer(&self, room_id: &str) -> bool {
        let event = {
            let Some(mut timers) = self.rooms.get_mut(room_id) else {
                return false;
            };
            match timers.song.take() {
                Some(SongTimer::Running {
                    timer,
                    context,
                    on_expire,
                }) => {
                    let remaining = timer.remaining();
                    timer.cancel();
                    timers.song = Some(SongTimer::Paused {
                        remaining,
                        context,
                        on_expire,
                    });
                    pause_event(context, remaining)
                }
                other => {
                    timers.song = other;
                    return false;
                }
            }
        };

        debug!(room_id = %room_id, remaining_secs = event.remaining_secs, "song timer paused");
        self.broadcaster
            .broadcast_to_room(room_id, RoomEvent::GamePaused(event));
        true
    }

    /// Restart a paused song countdown with the time it had left. Returns `false` when not paused.
    pub fn resume_song_timer(&self, room_id: &str) -> bool {
        let event = {
            let Some(mut timers) = self.rooms.get_mut(room_id) else {
                return false;
            };
            let (remaining, context, on_expire) = match timers.song.take() {
                Some(SongTimer::Paused {
                    remaining,
                    context,
                    on_expire,
                }) => (remaining, context, on_expire),
                other => {
                    timers.song = other;
                    return false;
                }
            };
            let timer = self.spawn_song(room_id, context, remaining, Arc::clone(&on_expire));
            timers.song = Some(SongTimer::Running {
                timer,
                context,
                on_expire,
            });
            pause_event(context, remaining)
        };

        debug!(room_id = %room_id, remaining_secs = event.remaining_secs, "song timer resumed");
        self.broadcaster
            .broadcast_to_room(room_id, RoomEvent::GameResumed(event));
        true
    }

    /// Start the answer countdown of a room, replacing any previous one.
    pub fn start_answer_timer(
        &self,
        room_id: &str,
        context: AnswerTimerContext,
        duration: Duration,
        on_expire: TimerCallback,
    ) {
        let mut timers = self.rooms.entry(room_id.to_string()).or_default();
        if let Some(previous) = timers.answer.take() {
            previous.cancel();
        }
        let timer = self.spawn_answer(room_id, &context, duration, Arc::clone(&on_expire));
        timers.answer = Some(AnswerTimer::Running {
            timer,
            context,
            on_expire,
        });
    }

    /// Freeze the answer countdown. Returns `false` when no countdown is running.
    pub fn pause_answer_timer(&self, room_id: &str) -> bool {
        let Some(mut timers) = self.rooms.get_mut(room_id) else {
            return false;
        };
        match timers.answer.take() {
            Some(AnswerTimer::Running {
                timer,
                context,
                on_expire,
            }) => {
                let remaining = timer.remaining();
                timer.cancel();
                debug!(
                    room_id = %room_id,
                    player_id = %context.player_id,
                    remaining_ms = remaining.as_millis() as u64,
                    "answer timer paused"
                );
                timers.answer = Some(AnswerTimer::Paused {
                    remaining,
                    context,
                    on_expire,
                });
                true
            }
            other => {
                timers.answer = other;
                false
            }
        }
    }

    /// Restart a paused answer countdown with the time it had left. Returns `false` when not paused.
    pub fn resume_answer_timer(&self, room_id: &str) -> bool {
        let Some(mut timers) = self.rooms.get_mut(room_id) else {
            return false;
        };
        match timers.answer.take() {
            Some(AnswerTimer::Paused {
                remaining,
                context,
                on_expire,
            }) => {
                let timer = self.spawn_answer(room_id, &context, remaining, Arc::clone(&on_expire));
                debug!(room_id = %room_id, player_id = %context.player_id, "answer timer resumed");
                timers.answer = Some(AnswerTimer::Running {
                    timer,
                    context,
                    on_expire,
                });
                true
            }
            other => {
                timers.answer = other;
                false
            }
        }
    }

    /// Schedule the post-song continuation, replacing any previous one.
    pub fn schedule_reveal(&self, room_id: &str, delay: Duration, on_expire: TimerCallback) {
        let mut timers = self.rooms.entry(room_id.to_string()).or_default();
        if let Some(previous) = timers.reveal.take() {
            previous.cancel();
        }
        let timer = self.spawn(room_id, Slot::Reveal, delay, None, on_expire);
        timers.reveal = Some(timer);
    }

    /// Cancel the song countdown, running or paused.
    pub fn clear_song_timer(&self, room_id: &str) {
        if let Some(mut timers) = self.rooms.get_mut(room_id) {
            if let Some(song) = timers.song.take() {
                song.cancel();
            }
        }
    }

    /// Cancel the answer countdown, running or paused.
    pub fn clear_answer_timer(&self, room_id: &str) {
        if let Some(mut timers) = self.rooms.get_mut(room_id) {
            if let Some(answer) = timers.answer.take() {
                answer.cancel();
            }
        }
    }

    /// Cancel every timer of a room, including a pending reveal continuation.
    pub fn clear_all_timers(&self, room_id: &str) {
        if let Some((_, mut timers)) = self.rooms.remove(room_id) {
            timers.cancel_all();
        }
    }

    /// Time left on the song countdown, frozen while paused.
    pub fn song_timer_remaining(&self, room_id: &str) -> Option<Duration> {
        let timers = self.rooms.get(room_id)?;
        match timers.song.as_ref()? {
            SongTimer::Running { timer, .. } => Some(timer.remaining()),
            SongTimer::Paused { remaining, .. } => Some(*remaining),
        }
    }

    /// Whether the song countdown is frozen.
    pub fn is_song_timer_paused(&self, room_id: &str) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|timers| matches!(timers.song, Some(SongTimer::Paused { .. })))
    }

    /// Song the current song countdown belongs to.
    pub fn song_timer_context(&self, room_id: &str) -> Option<SongTimerContext> {
        let timers = self.rooms.get(room_id)?;
        timers.song.as_ref().map(SongTimer::context)
    }

    /// Player the live answer countdown belongs to.
    pub fn answer_timer_player(&self, room_id: &str) -> Option<String> {
        let timers = self.rooms.get(room_id)?;
        timers
            .answer
            .as_ref()
            .map(|answer| answer.context().player_id.clone())
    }

    /// Time left on the answer countdown, frozen while paused.
    pub fn answer_timer_remaining(&self, room_id: &str) -> Option<Duration> {
        let timers = self.rooms.get(room_id)?;
        match timers.answer.as_ref()? {
            AnswerTimer::Running { timer, .. } => Some(timer.remaining()),
            AnswerTimer::Paused { remaining, .. } => Some(*remaining),
        }
    }

    /// Whether a post-song continuation is scheduled.
    pub fn has_pending_reveal(&self, room_id: &str) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|timers| timers.reveal.is_some())
    }

    fn spawn_song(
        &self,
        room_id: &str,
        context: SongTimerContext,
        duration: Duration,
        on_expire: TimerCallback,
    ) -> RunningTimer {
        let broadcaster = Arc::clone(&self.broadcaster);
        let room = room_id.to_string();
        let ticker: Ticker = Box::new(move |remaining_secs| {
            broadcaster.broadcast_to_room(
                &room,
                RoomEvent::TimerSong(SongTimerEvent {
                    round_index: context.round_index,
                    song_index: context.song_index,
                    remaining_secs,
                }),
            );
        });
        self.spawn(room_id, Slot::Song, duration, Some(ticker), on_expire)
    }

    fn spawn_answer(
        &self,
        room_id: &str,
        context: &AnswerTimerContext,
        duration: Duration,
        on_expire: TimerCallback,
    ) -> RunningTimer {
        let broadcaster = Arc::clone(&self.broadcaster);
        let room = room_id.to_string();
        let player_id = context.player_id.clone();
        let song_index = context.song.song_index;
        let ticker: Ticker = Box::new(move |remaining_secs| {
            broadcaster.broadcast_to_room(
                &room,
                RoomEvent::TimerAnswer(AnswerTimerEvent {
                    player_id: player_id.clone(),
                    song_index,
                    remaining_secs,
                }),
            );
        });
        self.spawn(room_id, Slot::Answer, duration, Some(ticker), on_expire)
    }

    /// Spawn the task backing a timer. Callers hold the room entry while storing the result.
    fn spawn(
        &self,
        room_id: &str,
        slot: Slot,
        duration: Duration,
        ticker: Option<Ticker>,
        on_expire: TimerCallback,
    ) -> RunningTimer {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + duration;
        let rooms = Arc::clone(&self.rooms);
        let room = room_id.to_string();

        let handle = tokio::spawn(async move {
            countdown(deadline, ticker).await;

            let expired = rooms
                .get_mut(&room)
                .is_some_and(|mut timers| timers.take_expired(slot, id));
            if expired {
                debug!(room_id = %room, timer = ?slot, "timer expired");
                tokio::spawn(on_expire());
            }
        });

        RunningTimer {
            id,
            deadline,
            handle,
        }
    }
}

/// Wait for `deadline`, reporting whole seconds left once per second starting immediately.
async fn countdown(deadline: Instant, mut ticker: Option<Ticker>) {
    let expiry = sleep_until(deadline);
    tokio::pin!(expiry);
    let mut ticks = interval(TICK);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut expiry => return,
            _ = ticks.tick() => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return;
                }
                if let Some(ticker) = ticker.as_mut() {
                    ticker(whole_seconds(remaining));
                }
            }
        }
    }
}

fn whole_seconds(duration: Duration) -> u64 {
    duration.as_millis().div_ceil(1000) as u64
}

fn pause_event(context: SongTimerContext, remaining: Duration) -> PauseEvent {
    PauseEvent {
        round_index: context.round_index,
        song_index: context.song_index,
        remaining_secs: whole_seconds(remaining),
    }
}
