//! Identity recovery for a room-scoped screen.
//!
//! ```text
//! NoSession ─start─▶ AttemptingReconnect ─success─▶ Active
//!    │                   │           │ failure (game screen)
//!    │                   │           ▼
//!    │                   │       Redirected
//!    │  failure (lobby)  │           ▲ other failure
//!    │                   ▼           │
//!    └─start─▶ FallbackFreshInfo ─success─▶ Active
//!                    │ "player not found" + identity (once)
//!                    └──────────────▶ AttemptingReconnect
//! ```
//!
//! Either snapshot event activates the session from either pending state.
//! Dropping back to fresh info and redirecting both clear the persisted
//! identity.

use werewolf_core::protocol::{ClientEvent, Failure, RoomCode, ServerEvent};

use crate::identity::{Identity, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectState {
    NoSession,
    AttemptingReconnect,
    FallbackFreshInfo,
    Active,
    Redirected,
}

/// How a screen opens its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountPolicy {
    /// Reconnect with a saved identity for this room, otherwise fetch fresh
    /// room info. A failed reconnect falls back to fresh room info. Used by
    /// the lobby.
    ReconnectFirst,
    /// Require a saved identity for this room and fetch fresh room info,
    /// reconnecting only if the server no longer knows this connection.
    /// Used by the game screen.
    FreshInfoFirst,
}

/// What the screen should do after an event was fed to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconnectStep {
    /// Send this event to the server.
    Emit(ClientEvent),
    /// The event carries the snapshot to adopt; the session is now active.
    Adopt,
    /// Give up and leave for the join screen.
    Redirect { reason: String },
    /// Not an identity event, or not one expected in the current state.
    Ignore,
}

#[derive(Debug, Clone)]
pub struct Reconnector {
    room_code: RoomCode,
    policy: MountPolicy,
    state: ReconnectState,
    retried: bool,
}

impl Reconnector {
    pub fn new(room_code: RoomCode, policy: MountPolicy) -> Self {
        Self {
            room_code,
            policy,
            state: ReconnectState::NoSession,
            retried: false,
        }
    }

    pub fn state(&self) -> ReconnectState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ReconnectState::Active
    }

    /// Decide the first request of a screen mount.
    ///
    /// An identity for a different room is stale and gets discarded. Returns
    /// either [`ReconnectStep::Emit`] or [`ReconnectStep::Redirect`].
    pub fn start(&mut self, store: &dyn SessionStore) -> ReconnectStep {
        let saved = match store.load() {
            Some(identity) if identity.room_code == self.room_code => Some(identity),
            Some(stale) => {
                tracing::info!(saved = %stale.room_code, room = %self.room_code, "discarding identity for another room");
                store.clear();
                None
            }
            None => None,
        };

        match (self.policy, saved) {
            (MountPolicy::ReconnectFirst, Some(identity)) => {
                tracing::info!(room = %self.room_code, name = %identity.display_name, "reconnecting with saved identity");
                ReconnectStep::Emit(self.reconnect_with(identity))
            }
            (MountPolicy::ReconnectFirst, None) | (MountPolicy::FreshInfoFirst, Some(_)) => {
                ReconnectStep::Emit(self.fetch_fresh_info())
            }
            (MountPolicy::FreshInfoFirst, None) => {
                self.transition(ReconnectState::Redirected);
                ReconnectStep::Redirect {
                    reason: "No saved session for this room".to_string(),
                }
            }
        }
    }

    /// Feed one inbound event.
    pub fn handle(&mut self, event: &ServerEvent, store: &dyn SessionStore) -> ReconnectStep {
        let pending = matches!(
            self.state,
            ReconnectState::AttemptingReconnect | ReconnectState::FallbackFreshInfo
        );
        match (self.state, event) {
            (_, ServerEvent::ReconnectionSuccess(_) | ServerEvent::GetRoomInfoSuccess(_))
                if pending =>
            {
                self.transition(ReconnectState::Active);
                ReconnectStep::Adopt
            }
            (ReconnectState::AttemptingReconnect, ServerEvent::ReconnectionFailed(failure)) => {
                match self.policy {
                    MountPolicy::ReconnectFirst => {
                        tracing::info!(room = %self.room_code, reason = %failure.message, "reconnect failed; fetching fresh room info");
                        store.clear();
                        self.retried = true;
                        ReconnectStep::Emit(self.fetch_fresh_info())
                    }
                    MountPolicy::FreshInfoFirst => self.redirect(failure, store),
                }
            }
            (ReconnectState::FallbackFreshInfo, ServerEvent::GetRoomInfoFailure(failure)) => {
                if failure.is_player_not_found() && !self.retried {
                    match store.load() {
                        Some(identity) if identity.room_code == self.room_code => {
                            self.retried = true;
                            tracing::info!(room = %self.room_code, "player not found; retrying as reconnect");
                            return ReconnectStep::Emit(self.reconnect_with(identity));
                        }
                        _ => {}
                    }
                }
                self.redirect(failure, store)
            }
            _ => ReconnectStep::Ignore,
        }
    }

    fn reconnect_with(&mut self, identity: Identity) -> ClientEvent {
        self.transition(ReconnectState::AttemptingReconnect);
        ClientEvent::ReconnectToRoom {
            user_name: identity.display_name,
            room_code: self.room_code.clone(),
        }
    }

    fn fetch_fresh_info(&mut self) -> ClientEvent {
        self.transition(ReconnectState::FallbackFreshInfo);
        ClientEvent::GetRoomInfo {
            room_code: self.room_code.clone(),
        }
    }

    fn redirect(&mut self, failure: &Failure, store: &dyn SessionStore) -> ReconnectStep {
        tracing::info!(room = %self.room_code, reason = %failure.message, "session lost; redirecting");
        store.clear();
        self.transition(ReconnectState::Redirected);
        ReconnectStep::Redirect {
            reason: failure.message.clone(),
        }
    }

    fn transition(&mut self, next: ReconnectState) {
        tracing::debug!(room = %self.room_code, from = ?self.state, to = ?next, "reconnect state");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MemoryStore;
    use werewolf_core::protocol::{
        FailureCode, GameSettings, GameState, Phase, Player, ReconnectionInfo, Role, RoomInfo,
    };

    fn code() -> RoomCode {
        RoomCode::parse("ABC123").unwrap()
    }

    fn alice() -> Identity {
        Identity::new("alice", code())
    }

    fn player() -> Player {
        Player {
            id: "alice".into(),
            name: "alice".into(),
            role: Role::Seer,
            is_alive: true,
            connected: true,
            is_host: false,
        }
    }

    fn reconnected() -> ServerEvent {
        ServerEvent::ReconnectionSuccess(ReconnectionInfo {
            player: player(),
            players: vec![player()],
            current_phase: Phase::Night,
            time_left: Some(30),
            settings: None,
            room_code: Some(code()),
        })
    }

    fn room_info() -> ServerEvent {
        ServerEvent::GetRoomInfoSuccess(RoomInfo {
            current_player: Some(player()),
            players: vec![player()],
            settings: GameSettings::from_minutes([(Role::Werewolf, 1), (Role::Villager, 2)], 5, 2)
                .unwrap(),
            game_state: GameState::Waiting,
            current_phase: Phase::Lobby,
            time_left: None,
        })
    }

    fn info_failed(message: &str) -> ServerEvent {
        ServerEvent::GetRoomInfoFailure(Failure::new(message))
    }

    fn emitted(step: ReconnectStep) -> ClientEvent {
        match step {
            ReconnectStep::Emit(event) => event,
            other => panic!("expected an emit, got {other:?}"),
        }
    }

    fn reconnect_event() -> ClientEvent {
        ClientEvent::ReconnectToRoom {
            user_name: "alice".into(),
            room_code: code(),
        }
    }

    #[test]
    fn lobby_with_saved_identity_reconnects() {
        let store = MemoryStore::with_identity(alice());
        let mut machine = Reconnector::new(code(), MountPolicy::ReconnectFirst);
        assert_eq!(machine.state(), ReconnectState::NoSession);
        assert_eq!(emitted(machine.start(&store)), reconnect_event());
        assert_eq!(machine.state(), ReconnectState::AttemptingReconnect);
        assert_eq!(machine.handle(&reconnected(), &store), ReconnectStep::Adopt);
        assert!(machine.is_active());
        assert_eq!(store.load(), Some(alice()));
    }

    #[test]
    fn lobby_without_identity_fetches_fresh_info() {
        let store = MemoryStore::new();
        let mut machine = Reconnector::new(code(), MountPolicy::ReconnectFirst);
        assert_eq!(
            emitted(machine.start(&store)),
            ClientEvent::GetRoomInfo { room_code: code() }
        );
        assert_eq!(machine.state(), ReconnectState::FallbackFreshInfo);
        assert_eq!(machine.handle(&room_info(), &store), ReconnectStep::Adopt);
        assert!(machine.is_active());
    }

    #[test]
    fn identity_for_another_room_is_discarded() {
        let store = MemoryStore::with_identity(Identity::new(
            "alice",
            RoomCode::parse("ZZZ999").unwrap(),
        ));
        let mut machine = Reconnector::new(code(), MountPolicy::ReconnectFirst);
        assert_eq!(
            emitted(machine.start(&store)),
            ClientEvent::GetRoomInfo { room_code: code() }
        );
        assert_eq!(store.load(), None);
    }

    #[test]
    fn game_screen_without_identity_redirects() {
        let store = MemoryStore::with_identity(Identity::new(
            "alice",
            RoomCode::parse("ZZZ999").unwrap(),
        ));
        let mut machine = Reconnector::new(code(), MountPolicy::FreshInfoFirst);
        assert!(matches!(
            machine.start(&store),
            ReconnectStep::Redirect { .. }
        ));
        assert_eq!(machine.state(), ReconnectState::Redirected);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn lobby_failed_reconnect_falls_back_to_fresh_info() {
        let store = MemoryStore::with_identity(alice());
        let mut machine = Reconnector::new(code(), MountPolicy::ReconnectFirst);
        machine.start(&store);
        let step = machine.handle(
            &ServerEvent::ReconnectionFailed(Failure::new("Player not found in room")),
            &store,
        );
        assert_eq!(
            step,
            ReconnectStep::Emit(ClientEvent::GetRoomInfo { room_code: code() })
        );
        assert_eq!(machine.state(), ReconnectState::FallbackFreshInfo);
        assert_eq!(store.load(), None);

        // Without an identity the next failure ends the session.
        let step = machine.handle(&info_failed("Player not found"), &store);
        assert!(matches!(step, ReconnectStep::Redirect { .. }));
        assert_eq!(machine.state(), ReconnectState::Redirected);
    }

    #[test]
    fn game_screen_failed_reconnect_redirects_and_clears() {
        let store = MemoryStore::with_identity(alice());
        let mut machine = Reconnector::new(code(), MountPolicy::FreshInfoFirst);
        machine.start(&store);
        machine.handle(&info_failed("Player not found"), &store);
        let step = machine.handle(
            &ServerEvent::ReconnectionFailed(Failure::new("Room not found")),
            &store,
        );
        assert_eq!(
            step,
            ReconnectStep::Redirect {
                reason: "Room not found".into()
            }
        );
        assert_eq!(machine.state(), ReconnectState::Redirected);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn player_not_found_retries_exactly_once() {
        let store = MemoryStore::with_identity(alice());
        let mut machine = Reconnector::new(code(), MountPolicy::FreshInfoFirst);
        assert_eq!(
            emitted(machine.start(&store)),
            ClientEvent::GetRoomInfo { room_code: code() }
        );

        let step = machine.handle(&info_failed("Player not found"), &store);
        assert_eq!(step, ReconnectStep::Emit(reconnect_event()));
        assert_eq!(machine.state(), ReconnectState::AttemptingReconnect);
        assert_eq!(machine.handle(&reconnected(), &store), ReconnectStep::Adopt);
    }

    #[test]
    fn player_not_found_without_identity_redirects() {
        let store = MemoryStore::new();
        let mut machine = Reconnector::new(code(), MountPolicy::ReconnectFirst);
        machine.start(&store);
        assert!(matches!(
            machine.handle(&info_failed("Player not found"), &store),
            ReconnectStep::Redirect { .. }
        ));
    }

    #[test]
    fn other_info_failure_redirects() {
        let store = MemoryStore::with_identity(alice());
        let mut machine = Reconnector::new(code(), MountPolicy::FreshInfoFirst);
        machine.start(&store);
        assert!(matches!(
            machine.handle(&info_failed("Room not found"), &store),
            ReconnectStep::Redirect { .. }
        ));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn structured_code_overrides_message() {
        let store = MemoryStore::with_identity(alice());
        let mut machine = Reconnector::new(code(), MountPolicy::FreshInfoFirst);
        machine.start(&store);
        let failure =
            Failure::new("Spieler nicht gefunden").with_code(FailureCode::PlayerNotFound);
        assert_eq!(
            machine.handle(&ServerEvent::GetRoomInfoFailure(failure), &store),
            ReconnectStep::Emit(reconnect_event())
        );
    }

    #[test]
    fn second_player_not_found_does_not_loop() {
        let store = MemoryStore::with_identity(alice());
        let mut machine = Reconnector::new(code(), MountPolicy::FreshInfoFirst);
        machine.start(&store);
        machine.handle(&info_failed("Player not found"), &store);
        let step = machine.handle(
            &ServerEvent::ReconnectionFailed(Failure::new("Player not found")),
            &store,
        );
        assert!(matches!(step, ReconnectStep::Redirect { .. }));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn either_snapshot_activates_a_pending_session() {
        let store = MemoryStore::new();
        let mut machine = Reconnector::new(code(), MountPolicy::ReconnectFirst);
        machine.start(&store);
        assert_eq!(machine.state(), ReconnectState::FallbackFreshInfo);
        assert_eq!(machine.handle(&reconnected(), &store), ReconnectStep::Adopt);
        assert!(machine.is_active());

        let store = MemoryStore::with_identity(alice());
        let mut machine = Reconnector::new(code(), MountPolicy::ReconnectFirst);
        machine.start(&store);
        assert_eq!(machine.state(), ReconnectState::AttemptingReconnect);
        assert_eq!(machine.handle(&room_info(), &store), ReconnectStep::Adopt);
        assert!(machine.is_active());

        // Once active, later snapshots and failures leave the session alone.
        assert_eq!(machine.handle(&room_info(), &store), ReconnectStep::Ignore);
        assert_eq!(
            machine.handle(&info_failed("Room not found"), &store),
            ReconnectStep::Ignore
        );
        assert!(machine.is_active());
    }

    #[test]
    fn unrelated_events_are_ignored() {
        let store = MemoryStore::new();
        let mut machine = Reconnector::new(code(), MountPolicy::ReconnectFirst);
        machine.start(&store);
        assert_eq!(
            machine.handle(
                &ServerEvent::SeerMessage {
                    message: "x".into()
                },
                &store
            ),
            ReconnectStep::Ignore
        );
        assert_eq!(machine.state(), ReconnectState::FallbackFreshInfo);
    }
}
