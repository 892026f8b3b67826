use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Song-level phases shared by every mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SongStatus {
    /// Not played yet.
    Pending,
    /// Playing, buzzers open.
    Playing,
    /// A player holds the answerer slot.
    Answering,
    /// Resolved, timed out, or force-ended. Terminal.
    Finished,
}

/// Events that move a song through its phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SongEvent {
    /// The orchestrator starts the song.
    Start,
    /// A buzz was accepted (or preempted the current holder).
    BuzzAccepted,
    /// The holder answered wrong, timed out, disconnected, or handed the slot back.
    SlotReleased,
    /// The orchestrator ends the song.
    Finish,
}

/// Game-session phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, or between two rounds.
    Waiting,
    /// A round is being played.
    Playing,
    /// The master suspended the song countdown.
    Paused,
    /// Game over. Terminal.
    Finished,
}

/// Events that move a session through its phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A round finished loading and starts playing.
    RoundStarted,
    /// The master pauses gameplay.
    Pause,
    /// The master resumes gameplay.
    Resume,
    /// The current round was finalized and more rounds remain.
    RoundFinished,
    /// The game is over.
    Finish,
}

/// Error returned when a song event cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid song transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidSongTransition {
    /// Phase the song was in.
    pub from: SongStatus,
    /// Rejected event.
    pub event: SongEvent,
}

/// Error returned when a session event cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid session transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidSessionTransition {
    /// Phase the session was in.
    pub from: SessionStatus,
    /// Rejected event.
    pub event: SessionEvent,
}

impl SongStatus {
    /// Compute the next phase if `event` is valid from the current one.
    pub fn transition(self, event: SongEvent) -> Result<SongStatus, InvalidSongTransition> {
        let next = match (self, event) {
            (SongStatus::Pending, SongEvent::Start) => SongStatus::Playing,
            (SongStatus::Playing, SongEvent::BuzzAccepted) => SongStatus::Answering,
            // A preempting buzz hands the slot over without leaving answering.
            (SongStatus::Answering, SongEvent::BuzzAccepted) => SongStatus::Answering,
            (SongStatus::Answering, SongEvent::SlotReleased) => SongStatus::Playing,
            (SongStatus::Playing | SongStatus::Answering, SongEvent::Finish) => {
                SongStatus::Finished
            }
            (from, event) => return Err(InvalidSongTransition { from, event }),
        };

        Ok(next)
    }
}

impl SessionStatus {
    /// Compute the next phase if `event` is valid from the current one.
    pub fn transition(
        self,
        event: SessionEvent,
    ) -> Result<SessionStatus, InvalidSessionTransition> {
        let next = match (self, event) {
            (SessionStatus::Waiting, SessionEvent::RoundStarted) => SessionStatus::Playing,
            (SessionStatus::Playing, SessionEvent::Pause) => SessionStatus::Paused,
            (SessionStatus::Paused, SessionEvent::Resume) => SessionStatus::Playing,
            (SessionStatus::Playing | SessionStatus::Paused, SessionEvent::RoundFinished) => {
                SessionStatus::Waiting
            }
            (
                SessionStatus::Waiting | SessionStatus::Playing | SessionStatus::Paused,
                SessionEvent::Finish,
            ) => SessionStatus::Finished,
            (from, event) => return Err(InvalidSessionTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn song_happy_path_with_wrong_answer() {
        let mut status = SongStatus::Pending;
        for (event, expected) in [
            (SongEvent::Start, SongStatus::Playing),
            (SongEvent::BuzzAccepted, SongStatus::Answering),
            (SongEvent::SlotReleased, SongStatus::Playing),
            (SongEvent::BuzzAccepted, SongStatus::Answering),
            (SongEvent::Finish, SongStatus::Finished),
        ] {
            status = status.transition(event).unwrap();
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn preemption_keeps_song_answering() {
        assert_eq!(
            SongStatus::Answering.transition(SongEvent::BuzzAccepted),
            Ok(SongStatus::Answering)
        );
    }

    #[test]
    fn finished_song_is_terminal() {
        for event in [
            SongEvent::Start,
            SongEvent::BuzzAccepted,
            SongEvent::SlotReleased,
            SongEvent::Finish,
        ] {
            let err = SongStatus::Finished.transition(event).unwrap_err();
            assert_eq!(err.from, SongStatus::Finished);
            assert_eq!(err.event, event);
        }
    }

    #[test]
    fn pending_song_cannot_be_buzzed_or_finished() {
        assert!(SongStatus::Pending.transition(SongEvent::BuzzAccepted).is_err());
        assert!(SongStatus::Pending.transition(SongEvent::Finish).is_err());
    }

    #[test]
    fn session_round_cycle() {
        let mut status = SessionStatus::Waiting;
        status = status.transition(SessionEvent::RoundStarted).unwrap();
        assert_eq!(status, SessionStatus::Playing);
        status = status.transition(SessionEvent::Pause).unwrap();
        assert_eq!(status, SessionStatus::Paused);
        status = status.transition(SessionEvent::Resume).unwrap();
        assert_eq!(status, SessionStatus::Playing);
        status = status.transition(SessionEvent::RoundFinished).unwrap();
        assert_eq!(status, SessionStatus::Waiting);
        status = status.transition(SessionEvent::Finish).unwrap();
        assert_eq!(status, SessionStatus::Finished);
    }

    #[test]
    fn invalid_session_transition_returns_error() {
        let err = SessionStatus::Waiting
            .transition(SessionEvent::Pause)
            .unwrap_err();
        assert_eq!(err.from, SessionStatus::Waiting);
        assert_eq!(err.event, SessionEvent::Pause);
        assert!(SessionStatus::Finished.transition(SessionEvent::Finish).is_err());
        assert!(
            SessionStatus::Paused
                .transition(SessionEvent::Pause)
                .is_err()
        );
    }
}
