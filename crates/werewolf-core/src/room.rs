//! Local room model and the reducer that folds server snapshots into it.
//!
//! The model is only ever mutated by incoming server events. Updates are
//! last-write-wins per field group: a roster payload replaces the roster, but
//! the local player's record is merged field by field so that a stale or
//! partial roster cannot clobber what a newer event already established.

use crate::game_state::StateChanged;
use crate::protocol::{
    GameSettings, GameState, Phase, PhaseChange, Player, PlayerId, PlayerPatch, ReconnectionInfo,
    RoomCode, RoomInfo, RoomUpdate, ServerEvent,
};

/// Client-side view of one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomModel {
    pub room_code: RoomCode,
    /// Roster in server order, unique by id.
    pub players: Vec<Player>,
    /// The local player. `None` until the first snapshot is adopted.
    pub current_player: Option<Player>,
    pub host_id: Option<PlayerId>,
    pub settings: Option<GameSettings>,
    pub current_phase: Phase,
    pub game_state: GameState,
    pub day_count: u32,
}

impl RoomModel {
    /// Empty model for a freshly mounted room screen.
    pub fn new(room_code: RoomCode) -> Self {
        Self {
            room_code,
            players: Vec::new(),
            current_player: None,
            host_id: None,
            settings: None,
            current_phase: Phase::Lobby,
            game_state: GameState::Waiting,
            day_count: 0,
        }
    }

    /// Look up a roster entry by id.
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    /// Players currently connected, in roster order.
    pub fn connected_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.connected)
    }

    /// Players who have been eliminated.
    pub fn dead_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| !p.is_alive)
    }

    pub fn is_host(&self) -> bool {
        self.current_player.as_ref().is_some_and(|p| p.is_host)
    }

    /// Fold one server event into the model.
    ///
    /// Events that carry no room data are ignored and report no change.
    pub fn apply(&mut self, event: &ServerEvent) -> StateChanged {
        match event {
            ServerEvent::GetRoomInfoSuccess(info) => self.replace_snapshot(info),
            ServerEvent::ReconnectionSuccess(info) => self.adopt_reconnection(info),
            ServerEvent::RoomUpdated(update) => self.apply_room_update(update),
            ServerEvent::PhaseChanged(change) => self.apply_phase_change(change),
            ServerEvent::GameTimerStarted {
                current_phase,
                day_count,
                ..
            } => self.set_phase(*current_phase, *day_count),
            ServerEvent::GameOver(results) => {
                self.merge_roster(&results.players);
                let mut changed = self.set_phase(Phase::GameOver, results.day_count);
                changed.players = true;
                changed
            }
            _ => StateChanged::default(),
        }
    }

    /// `get-room-info-success`: replace everything the snapshot carries.
    pub fn replace_snapshot(&mut self, info: &RoomInfo) -> StateChanged {
        self.players = info.players.clone();
        self.host_id = self
            .players
            .iter()
            .find(|p| p.is_host)
            .map(|p| p.id.clone());
        self.settings = Some(info.settings.clone());
        self.current_player = info.current_player.clone();
        self.game_state = info.game_state;
        let phase_changed = self.current_phase != info.current_phase;
        self.current_phase = info.current_phase;
        self.write_back_current_player();
        StateChanged {
            players: true,
            phase: phase_changed,
            ..StateChanged::default()
        }
    }

    /// `reconnection-success`: adopt the returned player exactly.
    pub fn adopt_reconnection(&mut self, info: &ReconnectionInfo) -> StateChanged {
        self.players = info.players.clone();
        self.current_player = Some(info.player.clone());
        if let Some(host) = self.players.iter().find(|p| p.is_host) {
            self.host_id = Some(host.id.clone());
        }
        if let Some(settings) = &info.settings {
            self.settings = Some(settings.clone());
        }
        let phase_changed = self.current_phase != info.current_phase;
        self.current_phase = info.current_phase;
        self.write_back_current_player();
        StateChanged {
            players: true,
            phase: phase_changed,
            ..StateChanged::default()
        }
    }

    /// `room-updated`: new roster and host.
    ///
    /// The local player's name and connection flag follow the roster and its
    /// host flag follows `host_id`; role and liveness are owned by phase
    /// events and are kept as they were.
    pub fn apply_room_update(&mut self, update: &RoomUpdate) -> StateChanged {
        self.players = update.players.clone();
        for player in &mut self.players {
            player.is_host = player.id == update.host_id;
        }
        self.host_id = Some(update.host_id.clone());
        self.game_state = update.game_state;

        if let Some(current) = self.current_player.as_mut() {
            if let Some(entry) = update.players.iter().find(|p| p.id == current.id) {
                current.name = entry.name.clone();
                current.connected = entry.connected;
            }
            current.is_host = current.id == update.host_id;
        }
        self.write_back_current_player();
        StateChanged {
            players: true,
            ..StateChanged::default()
        }
    }

    /// `phase-changed`: new roster, phase and day count.
    ///
    /// Roster entries are merged over the previous ones so fields the payload
    /// omits survive, and the local player is merged rather than replaced.
    pub fn apply_phase_change(&mut self, change: &PhaseChange) -> StateChanged {
        let previous = std::mem::take(&mut self.players);
        self.players = change
            .players
            .iter()
            .map(|patch| match previous.iter().find(|p| p.id == patch.id) {
                Some(known) => {
                    let mut merged = known.clone();
                    merged.merge(patch);
                    merged
                }
                None => Player::from_patch(patch),
            })
            .collect();
        if let Some(current) = self.current_player.as_mut()
            && let Some(patch) = change.players.iter().find(|p| p.id == current.id)
        {
            current.merge(patch);
        }
        self.write_back_current_player();

        let mut changed = self.set_phase(change.new_phase, change.day_count);
        changed.players = true;
        changed
    }

    /// Set phase and day count, reporting whether either moved.
    pub fn set_phase(&mut self, phase: Phase, day_count: u32) -> StateChanged {
        let moved = self.current_phase != phase || self.day_count != day_count;
        self.current_phase = phase;
        self.day_count = day_count;
        StateChanged {
            phase: moved,
            ..StateChanged::default()
        }
    }

    /// Merge a partial roster into the existing entries without dropping
    /// players the payload does not mention.
    fn merge_roster(&mut self, patches: &[PlayerPatch]) {
        for patch in patches {
            match self.players.iter_mut().find(|p| p.id == patch.id) {
                Some(player) => player.merge(patch),
                None => self.players.push(Player::from_patch(patch)),
            }
        }
        if let Some(current) = self.current_player.as_mut()
            && let Some(patch) = patches.iter().find(|p| p.id == current.id)
        {
            current.merge(patch);
        }
        self.write_back_current_player();
    }

    /// Keep the roster entry for the local player identical to
    /// `current_player`.
    fn write_back_current_player(&mut self) {
        let Some(current) = &self.current_player else {
            return;
        };
        if let Some(entry) = self.players.iter_mut().find(|p| p.id == current.id) {
            *entry = current.clone();
        }
    }
}

/// Pure form of [`RoomModel::apply`].
pub fn reduce(mut room: RoomModel, event: &ServerEvent) -> RoomModel {
    room.apply(event);
    room
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{GameResults, Role, Winner};

    fn code() -> RoomCode {
        RoomCode::parse("ABC123").unwrap()
    }

    fn player(id: &str, role: Role, is_host: bool) -> Player {
        Player {
            id: id.into(),
            name: id.to_string(),
            role,
            is_alive: true,
            connected: true,
            is_host,
        }
    }

    fn settings() -> GameSettings {
        GameSettings::from_minutes([(Role::Werewolf, 1), (Role::Villager, 2)], 5, 2).unwrap()
    }

    fn lobby_with(current: &str) -> RoomModel {
        let players = vec![
            player("alice", Role::Waiting, true),
            player("bob", Role::Waiting, false),
            player("carol", Role::Waiting, false),
        ];
        let current_player = players.iter().find(|p| p.id.as_str() == current).cloned();
        let mut room = RoomModel::new(code());
        room.apply(&ServerEvent::GetRoomInfoSuccess(RoomInfo {
            current_player,
            players,
            settings: settings(),
            game_state: GameState::Waiting,
            current_phase: Phase::Lobby,
            time_left: None,
        }));
        room
    }

    fn patch(id: &str) -> PlayerPatch {
        PlayerPatch {
            id: id.into(),
            name: None,
            role: None,
            is_alive: None,
            connected: None,
            is_host: None,
        }
    }

    fn update(players: Vec<Player>, host: &str) -> ServerEvent {
        ServerEvent::RoomUpdated(RoomUpdate {
            players,
            host_id: host.into(),
            game_state: GameState::Waiting,
            current_phase: Some(Phase::Lobby),
        })
    }

    #[test]
    fn snapshot_replaces_everything() {
        let room = lobby_with("bob");
        assert_eq!(room.players.len(), 3);
        assert_eq!(room.current_player.as_ref().unwrap().id.as_str(), "bob");
        assert_eq!(room.host_id, Some("alice".into()));
        assert_eq!(room.settings, Some(settings()));
        assert!(!room.is_host());
    }

    #[test]
    fn host_flag_follows_last_room_update() {
        let mut room = lobby_with("bob");
        let roster = room.players.clone();
        let hosts = ["alice", "bob", "carol", "bob", "alice"];
        for host in hosts {
            room.apply(&update(roster.clone(), host));
            let current = room.current_player.as_ref().unwrap();
            assert_eq!(current.is_host, current.id.as_str() == host);
            assert_eq!(room.player(&current.id), Some(current));
        }
        assert_eq!(room.host_id, Some("alice".into()));
        assert_eq!(room.players.iter().filter(|p| p.is_host).count(), 1);
    }

    #[test]
    fn room_update_keeps_role_and_liveness_of_current_player() {
        let mut room = lobby_with("bob");
        room.current_player.as_mut().unwrap().role = Role::Seer;
        // Roster still carries the lobby placeholder.
        let mut roster = room.players.clone();
        for p in &mut roster {
            p.role = Role::Waiting;
        }
        roster[1].connected = false;
        room.apply(&update(roster, "alice"));

        let current = room.current_player.as_ref().unwrap();
        assert_eq!(current.role, Role::Seer);
        assert!(!current.connected);
        assert_eq!(room.player(&"bob".into()).unwrap().role, Role::Seer);
        assert_eq!(room.connected_players().count(), 2);
    }

    #[test]
    fn phase_change_merges_over_current_player() {
        let mut room = lobby_with("bob");
        room.current_player.as_mut().unwrap().role = Role::Seer;
        let mut bob = patch("bob");
        bob.is_alive = Some(false);
        let change = PhaseChange {
            new_phase: Phase::Day,
            time_left: 300,
            day_count: 1,
            players: vec![patch("alice"), bob, patch("carol")],
        };
        let changed = room.apply(&ServerEvent::PhaseChanged(change));

        assert!(changed.phase && changed.players);
        let current = room.current_player.as_ref().unwrap();
        assert_eq!(current.role, Role::Seer);
        assert!(!current.is_alive);
        assert_eq!(current.name, "bob");
        assert_eq!(room.player(&"bob".into()), Some(current));
        assert_eq!(room.current_phase, Phase::Day);
        assert_eq!(room.day_count, 1);
        assert_eq!(room.dead_players().count(), 1);
        assert!(room.player(&"alice".into()).unwrap().is_host);
    }

    #[test]
    fn phase_change_drops_departed_players_and_adds_new_ones() {
        let mut room = lobby_with("alice");
        let mut dave = patch("dave");
        dave.name = Some("Dave".into());
        room.apply_phase_change(&PhaseChange {
            new_phase: Phase::Night,
            time_left: 120,
            day_count: 0,
            players: vec![patch("alice"), dave],
        });
        let ids: Vec<_> = room.players.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["alice", "dave"]);
        assert_eq!(room.player(&"dave".into()).unwrap().name, "Dave");
    }

    #[test]
    fn duplicate_delivery_is_harmless() {
        let mut room = lobby_with("bob");
        let mut bob = patch("bob");
        bob.role = Some(Role::Werewolf);
        let event = ServerEvent::PhaseChanged(PhaseChange {
            new_phase: Phase::Night,
            time_left: 120,
            day_count: 0,
            players: vec![patch("alice"), bob, patch("carol")],
        });
        let once = reduce(room.clone(), &event);
        let twice = reduce(once.clone(), &event);
        assert_eq!(once, twice);
        room.apply(&event);
        assert_eq!(room, once);
    }

    #[test]
    fn reconnection_adopts_player_exactly() {
        let mut room = RoomModel::new(code());
        let mut me = player("bob", Role::Doctor, false);
        me.connected = true;
        let mut roster_me = me.clone();
        roster_me.role = Role::Waiting;
        let info = ReconnectionInfo {
            player: me.clone(),
            players: vec![player("alice", Role::Waiting, true), roster_me],
            current_phase: Phase::Night,
            time_left: Some(42),
            settings: None,
            room_code: Some(code()),
        };
        room.apply(&ServerEvent::ReconnectionSuccess(info));
        assert_eq!(room.current_player, Some(me.clone()));
        assert_eq!(room.player(&me.id), Some(&me));
        assert_eq!(room.current_phase, Phase::Night);
        assert_eq!(room.host_id, Some("alice".into()));
    }

    #[test]
    fn game_over_merges_final_roles() {
        let mut room = lobby_with("bob");
        let mut alice = patch("alice");
        alice.role = Some(Role::Werewolf);
        alice.is_alive = Some(false);
        let changed = room.apply(&ServerEvent::GameOver(GameResults {
            winner: Winner::Villagers,
            players: vec![alice],
            day_count: 3,
        }));
        assert!(changed.phase);
        assert_eq!(room.current_phase, Phase::GameOver);
        assert_eq!(room.day_count, 3);
        let alice = room.player(&"alice".into()).unwrap();
        assert_eq!(alice.role, Role::Werewolf);
        assert!(alice.connected);
        assert_eq!(room.players.len(), 3);
    }

    #[test]
    fn unrelated_events_change_nothing() {
        let mut room = lobby_with("bob");
        let before = room.clone();
        let changed = room.apply(&ServerEvent::SeerMessage {
            message: "carol is a villager".into(),
        });
        assert!(!changed.any());
        assert_eq!(room, before);
    }
}
