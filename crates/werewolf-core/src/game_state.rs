use std::collections::VecDeque;

use crate::protocol::{
    ClientEvent, Phase, Player, PlayerId, Role, RoomCode, ServerEvent, Winner,
};
use crate::room::RoomModel;
use crate::submission::{self, SelectError, SubmissionGuard};
use crate::timer::Countdown;

/// Maximum number of entries kept in [`ClientGameState::events`].
const EVENT_LOG_CAPACITY: usize = 100;

/// Semantic category for log entries. The UI layer decides how to style each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    System,
    Phase,
    Action,
    Winner,
    Error,
    Info,
}

/// A structured entry in the room's event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// A snapshot was adopted (fresh info or reconnection).
    Synced { reconnected: bool },
    /// The roster changed size.
    RosterChanged { connected: usize },
    /// The host started the game; waiting for the first timer.
    GameStarting,
    /// A new phase began.
    PhaseStarted { phase: Phase, day_count: u32 },
    /// The local player's action left the client.
    ActionSent { target: PlayerId, role: Role },
    /// Private result of a seer investigation.
    SeerVision { message: String },
    /// The game ended.
    GameOver { winner: Winner },
    /// Error surfaced by the server.
    ServerError { message: String },
    /// Transport went away.
    Disconnected,
    /// Generic text message (used by the UI layer for local feedback).
    Text { text: String, category: LogCategory },
}

impl GameEvent {
    /// Semantic category for styling purposes.
    pub fn category(&self) -> LogCategory {
        match self {
            Self::Synced { .. } | Self::GameStarting => LogCategory::System,
            Self::RosterChanged { .. } => LogCategory::Info,
            Self::PhaseStarted { .. } => LogCategory::Phase,
            Self::ActionSent { .. } | Self::SeerVision { .. } => LogCategory::Action,
            Self::GameOver { .. } => LogCategory::Winner,
            Self::ServerError { .. } | Self::Disconnected => LogCategory::Error,
            Self::Text { category, .. } => *category,
        }
    }
}

/// Describes what changed after applying a server event or local action.
///
/// Frontends can inspect these flags to decide what to re-render. All flags
/// default to `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateChanged {
    /// Roster or local player changed.
    pub players: bool,
    /// Phase or day count changed.
    pub phase: bool,
    /// Countdown was overwritten by an authoritative value.
    pub timer: bool,
    /// Submission state (selection or sent flag) changed.
    pub submission: bool,
    /// A new entry was appended to the event log.
    pub log: bool,
}

impl StateChanged {
    /// Returns `true` if any flag is set.
    pub fn any(self) -> bool {
        self.players || self.phase || self.timer || self.submission || self.log
    }

    fn merge(self, other: StateChanged) -> StateChanged {
        StateChanged {
            players: self.players || other.players,
            phase: self.phase || other.phase,
            timer: self.timer || other.timer,
            submission: self.submission || other.submission,
            log: self.log || other.log,
        }
    }
}

/// Everything a room-scoped screen tracks: the room model, the countdown and
/// the submission guard, kept consistent with each other.
#[derive(Debug, Clone)]
pub struct ClientGameState {
    pub room: RoomModel,
    pub timer: Countdown,
    pub submission: SubmissionGuard,
    /// Structured log, newest last.
    pub events: VecDeque<GameEvent>,
    /// Latest seer investigation result for this phase.
    pub seer_message: Option<String>,
    /// Set between `start-game-success` and the first timer push.
    pub awaiting_timer: bool,
}

impl ClientGameState {
    pub fn new(room_code: RoomCode) -> Self {
        Self {
            room: RoomModel::new(room_code),
            timer: Countdown::new(),
            submission: SubmissionGuard::new(),
            events: VecDeque::new(),
            seer_message: None,
            awaiting_timer: false,
        }
    }

    pub fn room_code(&self) -> &RoomCode {
        &self.room.room_code
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.room.current_player.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.room.current_phase
    }

    /// Append a log entry, keeping only the last [`EVENT_LOG_CAPACITY`].
    pub fn add_event(&mut self, event: GameEvent) {
        self.events.push_back(event);
        if self.events.len() > EVENT_LOG_CAPACITY {
            self.events.pop_front();
        }
    }

    /// Convenience: append a [`GameEvent::Text`] for ad-hoc messages.
    pub fn add_message(&mut self, text: String, category: LogCategory) {
        self.add_event(GameEvent::Text { text, category });
    }

    /// Apply a server event.
    ///
    /// Phase boundaries always apply the new phase, then the new countdown,
    /// then the submission reset, in that order.
    pub fn apply_server_event(&mut self, event: &ServerEvent) -> StateChanged {
        let mut changed = StateChanged::default();

        match event {
            ServerEvent::GetRoomInfoSuccess(info) => {
                changed = self.room.apply(event);
                let seconds = info.time_left.or_else(|| {
                    info.settings.duration_of(info.current_phase)
                });
                self.timer.sync(info.current_phase, seconds.unwrap_or(0));
                changed.timer = true;
                self.settle_start(info.current_phase);
                self.log(GameEvent::Synced { reconnected: false }, &mut changed);
            }
            ServerEvent::ReconnectionSuccess(info) => {
                changed = self.room.apply(event);
                self.timer
                    .sync(info.current_phase, info.time_left.unwrap_or(0));
                changed.timer = true;
                self.settle_start(info.current_phase);
                self.log(GameEvent::Synced { reconnected: true }, &mut changed);
            }
            ServerEvent::RoomUpdated(update) => {
                let before = self.room.players.len();
                changed = self.room.apply(event);
                if before != update.players.len() {
                    let connected = self.room.connected_players().count();
                    self.log(GameEvent::RosterChanged { connected }, &mut changed);
                }
            }
            ServerEvent::PhaseChanged(change) => {
                changed = self.room.apply(event);
                self.timer.sync(change.new_phase, change.time_left);
                changed.timer = true;
                self.awaiting_timer = false;
                changed = changed.merge(self.begin_phase());
            }
            ServerEvent::GameTimerStarted {
                current_phase,
                time_left,
                day_count,
            } => {
                let transition = self.is_transition(*current_phase, *day_count);
                changed = self.room.apply(event);
                self.timer.sync(*current_phase, *time_left);
                changed.timer = true;
                self.awaiting_timer = false;
                if transition {
                    changed = changed.merge(self.begin_phase());
                }
            }
            ServerEvent::TimerUpdate {
                time_left,
                current_phase,
            } => {
                match self
                    .timer
                    .accept_update(self.room.current_phase, *current_phase, *time_left)
                {
                    Ok(()) => changed.timer = true,
                    Err(stale) => tracing::debug!(%stale, "discarding timer update"),
                }
            }
            ServerEvent::SeerMessage { message } => {
                self.seer_message = Some(message.clone());
                self.log(
                    GameEvent::SeerVision {
                        message: message.clone(),
                    },
                    &mut changed,
                );
            }
            ServerEvent::GameOver(results) => {
                changed = self.room.apply(event);
                self.timer.stop(Phase::GameOver);
                changed.timer = true;
                self.log(
                    GameEvent::GameOver {
                        winner: results.winner,
                    },
                    &mut changed,
                );
            }
            ServerEvent::StartGameSuccess { .. } => {
                // A late duplicate must not re-arm the wait once phases run.
                if self.room.current_phase == Phase::Lobby && !self.awaiting_timer {
                    self.awaiting_timer = true;
                    self.log(GameEvent::GameStarting, &mut changed);
                }
            }
            ServerEvent::StartGameFailed(failure)
            | ServerEvent::JoinRoomFailed(failure)
            | ServerEvent::GetRoomInfoFailure(failure)
            | ServerEvent::ReconnectionFailed(failure) => {
                self.log(
                    GameEvent::ServerError {
                        message: failure.message.clone(),
                    },
                    &mut changed,
                );
            }
            ServerEvent::RoomCreated { .. } | ServerEvent::RoomJoined { .. } => {
                // Handled by the entry flows, not room state.
            }
        }

        changed
    }

    /// One local second elapsed.
    pub fn tick(&mut self) -> bool {
        self.timer.tick()
    }

    /// Whether the local player may still act in the current phase.
    pub fn can_submit(&self) -> bool {
        self.current_player()
            .is_some_and(|me| self.submission.can_submit(me, self.phase()))
    }

    /// Targets the local player may pick right now.
    pub fn eligible_targets(&self) -> Vec<&Player> {
        match self.current_player() {
            Some(me) => submission::eligible_targets(me, self.phase(), &self.room.players),
            None => Vec::new(),
        }
    }

    /// Select a target for this phase's action.
    pub fn select_target(&mut self, target: &PlayerId) -> Result<(), SelectError> {
        let Some(me) = self.room.current_player.as_ref() else {
            return Err(SelectError::NoAction);
        };
        self.submission
            .select(me, self.room.current_phase, &self.room.players, target)
    }

    /// Produce this phase's single outbound action, if allowed.
    ///
    /// `has_submitted` is set before this returns; the caller must emit the
    /// event it receives.
    pub fn submit(&mut self) -> Option<ClientEvent> {
        let me = self.room.current_player.as_ref()?;
        let event = self.submission.submit(
            &self.room.room_code,
            me,
            self.room.current_phase,
            &self.room.players,
        )?;
        if let ClientEvent::SubmitVote {
            target_player_id,
            current_player_role,
            ..
        } = &event
        {
            self.add_event(GameEvent::ActionSent {
                target: target_player_id.clone(),
                role: *current_player_role,
            });
        }
        Some(event)
    }

    fn is_transition(&self, phase: Phase, day_count: u32) -> bool {
        self.room.current_phase != phase || self.room.day_count != day_count
    }

    /// A snapshot showing a running game means the start timer was missed.
    fn settle_start(&mut self, phase: Phase) {
        if matches!(phase, Phase::Night | Phase::Day) {
            self.awaiting_timer = false;
        }
    }

    /// Phase-scoped resets. Runs after phase and countdown are in place.
    fn begin_phase(&mut self) -> StateChanged {
        self.submission.reset();
        self.seer_message = None;
        let mut changed = StateChanged {
            submission: true,
            ..StateChanged::default()
        };
        self.log(
            GameEvent::PhaseStarted {
                phase: self.room.current_phase,
                day_count: self.room.day_count,
            },
            &mut changed,
        );
        changed
    }

    fn log(&mut self, event: GameEvent, changed: &mut StateChanged) {
        self.add_event(event);
        changed.log = true;
    }
}
