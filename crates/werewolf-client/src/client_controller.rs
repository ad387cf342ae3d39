//! Room-scoped screen controller.
//!
//! Owns one screen's subscription on the shared [`NetClient`], its
//! [`Reconnector`] and its [`ClientGameState`]. Frontends:
//!
//! 1. [`mount`](ClientController::mount) a controller for the lobby or the
//!    game screen. It subscribes, then sends its opening request.
//! 2. Call [`recv`](ClientController::recv) or
//!    [`try_recv`](ClientController::try_recv) and re-render according to the
//!    returned [`PollResult`].
//! 3. Call [`tick`](ClientController::tick) once a second while the countdown
//!    runs, and the action methods on user input.
//!
//! Dropping the controller drops the subscription.

use std::sync::Arc;

use tokio::sync::mpsc::error::TryRecvError;
use werewolf_core::game_state::{ClientGameState, GameEvent, LogCategory, StateChanged};
use werewolf_core::protocol::{ClientEvent, EventKind, Phase, PlayerId, RoomCode, ServerEvent};
use werewolf_core::submission::SelectError;

use crate::error::ClientError;
use crate::identity::{Identity, SessionStore};
use crate::net_client::{NetClient, Subscription};
use crate::reconnect::{MountPolicy, ReconnectState, ReconnectStep, Reconnector};

/// Where the app should be showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    JoinGame,
    Lobby(RoomCode),
    Game(RoomCode),
    GameOver,
}

/// The two room-scoped screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Lobby,
    Game,
}

const LOBBY_EVENTS: &[EventKind] = &[
    EventKind::GetRoomInfoSuccess,
    EventKind::GetRoomInfoFailure,
    EventKind::ReconnectionSuccess,
    EventKind::ReconnectionFailed,
    EventKind::RoomUpdated,
    EventKind::StartGameSuccess,
    EventKind::StartGameFailed,
];

const GAME_EVENTS: &[EventKind] = &[
    EventKind::GetRoomInfoSuccess,
    EventKind::GetRoomInfoFailure,
    EventKind::ReconnectionSuccess,
    EventKind::ReconnectionFailed,
    EventKind::RoomUpdated,
    EventKind::StartGameSuccess,
    EventKind::GameTimerStarted,
    EventKind::TimerUpdate,
    EventKind::PhaseChanged,
    EventKind::SeerMessage,
    EventKind::GameOver,
];

impl Screen {
    pub fn events(self) -> &'static [EventKind] {
        match self {
            Screen::Lobby => LOBBY_EVENTS,
            Screen::Game => GAME_EVENTS,
        }
    }

    fn policy(self) -> MountPolicy {
        match self {
            Screen::Lobby => MountPolicy::ReconnectFirst,
            Screen::Game => MountPolicy::FreshInfoFirst,
        }
    }
}

/// Outcome of processing one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult {
    /// The event was applied; the flags say what changed.
    Updated(StateChanged),
    /// The screen is done; show this route next.
    Navigate(Route),
    /// The connection is gone.
    Disconnected,
    /// Nothing was waiting.
    Empty,
}

pub struct ClientController {
    net: NetClient,
    store: Arc<dyn SessionStore>,
    subscription: Subscription,
    reconnector: Reconnector,
    screen: Screen,
    /// Navigation decided at mount time, reported by the next poll.
    pending: Option<Route>,
    pub state: ClientGameState,
}

impl ClientController {
    /// Subscribe to `screen`'s events and send the opening request.
    pub fn mount(
        net: NetClient,
        store: Arc<dyn SessionStore>,
        screen: Screen,
        room_code: RoomCode,
    ) -> Self {
        let subscription = net.subscribe(screen.events());
        let mut reconnector = Reconnector::new(room_code.clone(), screen.policy());
        let mut state = ClientGameState::new(room_code);

        let pending = match reconnector.start(store.as_ref()) {
            ReconnectStep::Emit(event) => {
                net.emit(event);
                None
            }
            ReconnectStep::Redirect { reason } => {
                state.add_event(GameEvent::ServerError { message: reason });
                Some(Route::JoinGame)
            }
            ReconnectStep::Adopt | ReconnectStep::Ignore => None,
        };
        tracing::debug!(?screen, room = %state.room_code(), "screen mounted");

        Self {
            net,
            store,
            subscription,
            reconnector,
            screen,
            pending,
            state,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn room_code(&self) -> &RoomCode {
        self.state.room_code()
    }

    pub fn reconnect_state(&self) -> ReconnectState {
        self.reconnector.state()
    }

    /// Process the next event if one is queued.
    pub fn try_recv(&mut self) -> PollResult {
        if let Some(route) = self.pending.take() {
            return PollResult::Navigate(route);
        }
        match self.subscription.try_recv() {
            Ok(event) => self.handle_server_event(event),
            Err(TryRecvError::Empty) => PollResult::Empty,
            Err(TryRecvError::Disconnected) => self.disconnected(),
        }
    }

    /// Await and process the next event. Cancel-safe, for use in
    /// `tokio::select!`.
    pub async fn recv(&mut self) -> PollResult {
        if let Some(route) = self.pending.take() {
            return PollResult::Navigate(route);
        }
        match self.subscription.recv().await {
            Some(event) => self.handle_server_event(event),
            None => self.disconnected(),
        }
    }

    /// One local second elapsed.
    pub fn tick(&mut self) -> bool {
        self.state.tick()
    }

    pub fn is_ticking(&self) -> bool {
        self.state.timer.is_running()
    }

    pub fn select_target(&mut self, target: &PlayerId) -> Result<(), SelectError> {
        self.state.select_target(target)
    }

    /// Send this phase's action. Returns `false` when nothing was sent.
    pub fn submit(&mut self) -> bool {
        match self.state.submit() {
            Some(event) => {
                self.net.emit(event);
                true
            }
            None => false,
        }
    }

    /// Host-only request to leave the lobby.
    pub fn start_game(&mut self) -> Result<(), ClientError> {
        if !self.state.room.is_host() {
            return Err(ClientError::NotHost);
        }
        self.net.emit(ClientEvent::StartGame {
            room_code: self.room_code().clone(),
        });
        Ok(())
    }

    /// Set when arriving from the lobby after `start-game-success`.
    pub fn expect_timer(&mut self) {
        if self.state.phase() == Phase::Lobby {
            self.state.awaiting_timer = true;
        }
    }

    /// Abandon the room: forget the identity and go home.
    pub fn leave(self) -> Route {
        tracing::info!(room = %self.room_code(), "leaving room");
        self.store.clear();
        Route::Home
    }

    /// Log local feedback next to the server's events.
    pub fn add_message(&mut self, text: String, category: LogCategory) {
        self.state.add_message(text, category);
    }

    // -- private -----------------------------------------------------------

    fn handle_server_event(&mut self, event: ServerEvent) -> PollResult {
        match self.reconnector.handle(&event, self.store.as_ref()) {
            ReconnectStep::Emit(request) => {
                self.net.emit(request);
                return PollResult::Updated(StateChanged::default());
            }
            ReconnectStep::Redirect { reason } => {
                self.state.add_event(GameEvent::ServerError { message: reason });
                return PollResult::Navigate(Route::JoinGame);
            }
            ReconnectStep::Adopt => {
                let changed = self.state.apply_server_event(&event);
                return self.adopted(changed);
            }
            ReconnectStep::Ignore => {}
        }
        if self.reconnector.state() == ReconnectState::Redirected {
            return PollResult::Empty;
        }

        let changed = self.state.apply_server_event(&event);
        match (self.screen, event) {
            (Screen::Lobby, ServerEvent::StartGameSuccess { .. }) => {
                PollResult::Navigate(Route::Game(self.room_code().clone()))
            }
            (Screen::Game, ServerEvent::GameOver(results)) => {
                self.store.clear();
                self.store.stash_results(&results);
                PollResult::Navigate(Route::GameOver)
            }
            _ => PollResult::Updated(changed),
        }
    }

    /// A snapshot was adopted: persist who we are, and leave the lobby if the
    /// game is already running.
    fn adopted(&mut self, changed: StateChanged) -> PollResult {
        if let Some(me) = self.state.current_player() {
            let identity = Identity::new(me.name.clone(), self.room_code().clone());
            self.store.save(&identity);
        }
        if self.screen == Screen::Lobby && matches!(self.state.phase(), Phase::Night | Phase::Day) {
            return PollResult::Navigate(Route::Game(self.room_code().clone()));
        }
        PollResult::Updated(changed)
    }

    fn disconnected(&mut self) -> PollResult {
        self.state.add_event(GameEvent::Disconnected);
        PollResult::Disconnected
    }
}
