//! Wire protocol shared with the authoritative game server.
//!
//! Every frame is a JSON object of the form
//! `{"event": "<kebab-case name>", "data": { ...camelCase payload... }}`.
//! [`ClientEvent`] covers everything this client emits and [`ServerEvent`]
//! everything it reacts to.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of characters in a room code.
pub const ROOM_CODE_LEN: usize = 6;

/// Failure message the server uses when it cannot find the session's player.
pub const PLAYER_NOT_FOUND: &str = "Player not found";

/// Validation errors raised before anything is sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Please enter your name")]
    EmptyName,

    #[error("Room code must be exactly 6 characters")]
    RoomCodeLength,

    #[error("Room code must be alphanumeric")]
    RoomCodeCharset,

    #[error("A game needs at least one werewolf")]
    MissingWerewolf,

    #[error("Please select at least one additional character")]
    MissingSupportingRole,

    #[error("The {0} role cannot be dealt")]
    PlaceholderRole(Role),

    #[error("Phase durations must be at least one minute")]
    InvalidDuration,
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Short alphanumeric room identifier, always stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Validate and normalise user input (`" a1b2c3 "` becomes `A1B2C3`).
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let code = raw.trim().to_ascii_uppercase();
        if code.chars().count() != ROOM_CODE_LEN {
            return Err(ProtocolError::RoomCodeLength);
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ProtocolError::RoomCodeCharset);
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque player identifier. The server derives it from the display name, so
/// it stays stable across reconnects within one room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trim and validate a display name.
pub fn validate_display_name(name: &str) -> Result<String, ProtocolError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::EmptyName);
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Game vocabulary
// ---------------------------------------------------------------------------

/// Character roles. `Waiting` is the placeholder before roles are dealt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Villager,
    Werewolf,
    Seer,
    Doctor,
    Witch,
    Drunk,
    #[default]
    Waiting,
}

impl Role {
    /// Every role a host can put into a game.
    pub const DEALABLE: [Role; 6] = [
        Role::Werewolf,
        Role::Villager,
        Role::Seer,
        Role::Doctor,
        Role::Witch,
        Role::Drunk,
    ];

    /// Whether this role acts during the night phase.
    pub fn has_night_action(self) -> bool {
        matches!(self, Role::Werewolf | Role::Doctor | Role::Seer | Role::Witch)
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Villager => "villager",
            Role::Werewolf => "werewolf",
            Role::Seer => "seer",
            Role::Doctor => "doctor",
            Role::Witch => "witch",
            Role::Drunk => "drunk",
            Role::Waiting => "waiting",
        }
    }

    /// Prompt shown to the player at night.
    pub fn night_prompt(self) -> &'static str {
        match self {
            Role::Werewolf => "Choose a player to eliminate",
            Role::Doctor => "Choose a player to protect",
            Role::Seer => "Choose a player to investigate",
            Role::Witch => "Choose a player to use potion on",
            _ => "Sleep peacefully",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::DEALABLE
            .into_iter()
            .chain([Role::Waiting])
            .find(|role| role.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown role '{s}'"))
    }
}

/// Game phase; governs which actions are legal and which timer runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Lobby,
    Night,
    Day,
    GameOver,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Lobby => "Lobby",
            Phase::Night => "Night",
            Phase::Day => "Day",
            Phase::GameOver => "Game over",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarse room lifecycle reported by the server alongside snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    #[default]
    Waiting,
    Starting,
    InProgress,
    Finished,
}

fn default_true() -> bool {
    true
}

/// One seat in the room roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_true")]
    pub is_alive: bool,
    #[serde(default = "default_true")]
    pub connected: bool,
    #[serde(default)]
    pub is_host: bool,
}

impl Player {
    /// Build a roster entry from a partial payload, filling unknown fields
    /// with lobby defaults.
    pub fn from_patch(patch: &PlayerPatch) -> Self {
        let mut player = Self {
            id: patch.id.clone(),
            name: patch.id.to_string(),
            role: Role::Waiting,
            is_alive: true,
            connected: true,
            is_host: false,
        };
        player.merge(patch);
        player
    }

    /// Overwrite every field the patch carries; leave the rest untouched.
    pub fn merge(&mut self, patch: &PlayerPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(is_alive) = patch.is_alive {
            self.is_alive = is_alive;
        }
        if let Some(connected) = patch.connected {
            self.connected = connected;
        }
        if let Some(is_host) = patch.is_host {
            self.is_host = is_host;
        }
    }
}

/// Roster entry whose fields may be omitted by the sender.
///
/// Used wherever the server ships a roster that should be merged over what
/// the client already knows rather than replace it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPatch {
    pub id: PlayerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_alive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_host: Option<bool>,
}

impl PlayerPatch {
    /// Name to display, falling back to the id when the payload omitted it.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }
}

impl From<&Player> for PlayerPatch {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            name: Some(player.name.clone()),
            role: Some(player.role),
            is_alive: Some(player.is_alive),
            connected: Some(player.connected),
            is_host: Some(player.is_host),
        }
    }
}

/// Host-chosen game configuration. Durations are in seconds on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub roles: BTreeMap<Role, u32>,
    pub day_time: u32,
    pub night_time: u32,
}

impl GameSettings {
    /// Build settings from role counts and phase lengths given in minutes.
    ///
    /// Roles with a zero count are dropped. A game needs a werewolf plus at
    /// least one other dealt role.
    pub fn from_minutes(
        roles: impl IntoIterator<Item = (Role, u32)>,
        day_minutes: u32,
        night_minutes: u32,
    ) -> Result<Self, ProtocolError> {
        let mut counts = BTreeMap::new();
        for (role, count) in roles {
            if role == Role::Waiting {
                return Err(ProtocolError::PlaceholderRole(role));
            }
            if count > 0 {
                *counts.entry(role).or_insert(0) += count;
            }
        }
        if !counts.contains_key(&Role::Werewolf) {
            return Err(ProtocolError::MissingWerewolf);
        }
        if counts.len() < 2 {
            return Err(ProtocolError::MissingSupportingRole);
        }
        if day_minutes == 0 || night_minutes == 0 {
            return Err(ProtocolError::InvalidDuration);
        }
        Ok(Self {
            roles: counts,
            day_time: day_minutes * 60,
            night_time: night_minutes * 60,
        })
    }

    /// Total number of seats the configured roles fill.
    pub fn seat_count(&self) -> u32 {
        self.roles.values().sum()
    }

    /// Configured length of a phase in seconds, if the phase is timed.
    pub fn duration_of(&self, phase: Phase) -> Option<u32> {
        match phase {
            Phase::Day => Some(self.day_time),
            Phase::Night => Some(self.night_time),
            Phase::Lobby | Phase::GameOver => None,
        }
    }
}

/// Winning side reported at game over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Werewolves,
    Villagers,
}

impl Winner {
    pub fn headline(self) -> &'static str {
        match self {
            Winner::Werewolves => "WEREWOLVES WIN!",
            Winner::Villagers => "VILLAGERS WIN!",
        }
    }
}

/// Final tally shown on the results screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResults {
    pub winner: Winner,
    pub players: Vec<PlayerPatch>,
    #[serde(default)]
    pub day_count: u32,
}

impl GameResults {
    /// Split the final roster into (werewolves, everyone else).
    pub fn teams(&self) -> (Vec<&PlayerPatch>, Vec<&PlayerPatch>) {
        self.players
            .iter()
            .partition(|p| p.role == Some(Role::Werewolf))
    }
}

// ---------------------------------------------------------------------------
// Failure payloads
// ---------------------------------------------------------------------------

/// Structured failure reason. Older servers omit it and only send a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCode {
    PlayerNotFound,
    RoomNotFound,
    JoinRejected,
    #[serde(other)]
    Other,
}

/// Payload of every `*-failed` / `*-failure` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<FailureCode>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: FailureCode) -> Self {
        self.code = Some(code);
        self
    }

    /// True when the server could not find this session's player.
    ///
    /// The structured code takes precedence; without one, only the exact
    /// legacy message qualifies.
    pub fn is_player_not_found(&self) -> bool {
        match self.code {
            Some(code) => code == FailureCode::PlayerNotFound,
            None => self.message == PLAYER_NOT_FOUND,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot payloads
// ---------------------------------------------------------------------------

/// Full room snapshot answering `get-room-info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    #[serde(default)]
    pub current_player: Option<Player>,
    pub players: Vec<Player>,
    pub settings: GameSettings,
    #[serde(default)]
    pub game_state: GameState,
    #[serde(default)]
    pub current_phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_left: Option<u32>,
}

/// Snapshot answering a successful `reconnect-to-room`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectionInfo {
    pub player: Player,
    pub players: Vec<Player>,
    #[serde(default)]
    pub current_phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_left: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<GameSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_code: Option<RoomCode>,
}

/// Roster/host delta broadcast whenever someone joins, leaves or reconnects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUpdate {
    pub players: Vec<Player>,
    pub host_id: PlayerId,
    #[serde(default)]
    pub game_state: GameState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_phase: Option<Phase>,
}

/// Authoritative phase boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseChange {
    pub new_phase: Phase,
    pub time_left: u32,
    #[serde(default)]
    pub day_count: u32,
    pub players: Vec<PlayerPatch>,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    CreateRoom {
        user_name: String,
        game_settings: GameSettings,
    },
    JoinRoom {
        user_name: String,
        room_code: RoomCode,
    },
    GetRoomInfo {
        room_code: RoomCode,
    },
    ReconnectToRoom {
        user_name: String,
        room_code: RoomCode,
    },
    StartGame {
        room_code: RoomCode,
    },
    SubmitVote {
        room_code: RoomCode,
        target_player_id: PlayerId,
        current_player_id: PlayerId,
        current_player_role: Role,
    },
}

impl ClientEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::CreateRoom { .. } => "create-room",
            ClientEvent::JoinRoom { .. } => "join-room",
            ClientEvent::GetRoomInfo { .. } => "get-room-info",
            ClientEvent::ReconnectToRoom { .. } => "reconnect-to-room",
            ClientEvent::StartGame { .. } => "start-game",
            ClientEvent::SubmitVote { .. } => "submit-vote",
        }
    }

    /// Serialize into a single text frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Events pushed from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    RoomCreated {
        room_code: RoomCode,
    },
    RoomJoined {
        room_code: RoomCode,
    },
    JoinRoomFailed(Failure),
    GetRoomInfoSuccess(RoomInfo),
    #[serde(alias = "get-room-info-failed")]
    GetRoomInfoFailure(Failure),
    ReconnectionSuccess(ReconnectionInfo),
    ReconnectionFailed(Failure),
    RoomUpdated(RoomUpdate),
    StartGameSuccess {
        #[serde(default)]
        message: String,
        room_code: RoomCode,
    },
    StartGameFailed(Failure),
    GameTimerStarted {
        current_phase: Phase,
        time_left: u32,
        #[serde(default)]
        day_count: u32,
    },
    TimerUpdate {
        time_left: u32,
        current_phase: Phase,
    },
    PhaseChanged(PhaseChange),
    SeerMessage {
        message: String,
    },
    GameOver(GameResults),
}

/// Payload-free discriminant of [`ServerEvent`], used for subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    RoomCreated,
    RoomJoined,
    JoinRoomFailed,
    GetRoomInfoSuccess,
    GetRoomInfoFailure,
    ReconnectionSuccess,
    ReconnectionFailed,
    RoomUpdated,
    StartGameSuccess,
    StartGameFailed,
    GameTimerStarted,
    TimerUpdate,
    PhaseChanged,
    SeerMessage,
    GameOver,
}

impl EventKind {
    /// Wire name of the event.
    pub fn name(self) -> &'static str {
        match self {
            EventKind::RoomCreated => "room-created",
            EventKind::RoomJoined => "room-joined",
            EventKind::JoinRoomFailed => "join-room-failed",
            EventKind::GetRoomInfoSuccess => "get-room-info-success",
            EventKind::GetRoomInfoFailure => "get-room-info-failure",
            EventKind::ReconnectionSuccess => "reconnection-success",
            EventKind::ReconnectionFailed => "reconnection-failed",
            EventKind::RoomUpdated => "room-updated",
            EventKind::StartGameSuccess => "start-game-success",
            EventKind::StartGameFailed => "start-game-failed",
            EventKind::GameTimerStarted => "game-timer-started",
            EventKind::TimerUpdate => "timer-update",
            EventKind::PhaseChanged => "phase-changed",
            EventKind::SeerMessage => "seer-message",
            EventKind::GameOver => "game-over",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ServerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ServerEvent::RoomCreated { .. } => EventKind::RoomCreated,
            ServerEvent::RoomJoined { .. } => EventKind::RoomJoined,
            ServerEvent::JoinRoomFailed(_) => EventKind::JoinRoomFailed,
            ServerEvent::GetRoomInfoSuccess(_) => EventKind::GetRoomInfoSuccess,
            ServerEvent::GetRoomInfoFailure(_) => EventKind::GetRoomInfoFailure,
            ServerEvent::ReconnectionSuccess(_) => EventKind::ReconnectionSuccess,
            ServerEvent::ReconnectionFailed(_) => EventKind::ReconnectionFailed,
            ServerEvent::RoomUpdated(_) => EventKind::RoomUpdated,
            ServerEvent::StartGameSuccess { .. } => EventKind::StartGameSuccess,
            ServerEvent::StartGameFailed(_) => EventKind::StartGameFailed,
            ServerEvent::GameTimerStarted { .. } => EventKind::GameTimerStarted,
            ServerEvent::TimerUpdate { .. } => EventKind::TimerUpdate,
            ServerEvent::PhaseChanged(_) => EventKind::PhaseChanged,
            ServerEvent::SeerMessage { .. } => EventKind::SeerMessage,
            ServerEvent::GameOver(_) => EventKind::GameOver,
        }
    }
}

/// Try to deserialize a raw text frame as a [`ServerEvent`].
///
/// Returns `None` for empty input, unknown event names or malformed payloads.
pub fn parse_server_frame(frame: &str) -> Option<ServerEvent> {
    let trimmed = frame.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<ServerEvent>(trimmed) {
        Ok(event) => Some(event),
        Err(err) => {
            tracing::warn!(error = %err, "discarding unparsable server frame");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn room_codes_are_normalised() {
        assert_eq!(RoomCode::parse(" a1b2c3 ").unwrap().as_str(), "A1B2C3");
        assert_eq!(RoomCode::parse("ABC12"), Err(ProtocolError::RoomCodeLength));
        assert_eq!(RoomCode::parse("ABC1234"), Err(ProtocolError::RoomCodeLength));
        assert_eq!(RoomCode::parse("AB-123"), Err(ProtocolError::RoomCodeCharset));
    }

    #[test]
    fn display_names_are_trimmed() {
        assert_eq!(validate_display_name("  alice ").unwrap(), "alice");
        assert_eq!(validate_display_name("   "), Err(ProtocolError::EmptyName));
    }

    #[test]
    fn settings_from_minutes() {
        let settings =
            GameSettings::from_minutes([(Role::Werewolf, 1), (Role::Villager, 2)], 5, 2).unwrap();
        assert_eq!(settings.day_time, 300);
        assert_eq!(settings.night_time, 120);
        assert_eq!(settings.seat_count(), 3);
        assert_eq!(settings.duration_of(Phase::Night), Some(120));
        assert_eq!(settings.duration_of(Phase::Lobby), None);
    }

    #[test]
    fn settings_need_werewolf_and_company() {
        assert_eq!(
            GameSettings::from_minutes([(Role::Villager, 3)], 5, 2),
            Err(ProtocolError::MissingWerewolf)
        );
        assert_eq!(
            GameSettings::from_minutes([(Role::Werewolf, 2), (Role::Seer, 0)], 5, 2),
            Err(ProtocolError::MissingSupportingRole)
        );
        assert_eq!(
            GameSettings::from_minutes([(Role::Werewolf, 1), (Role::Waiting, 1)], 5, 2),
            Err(ProtocolError::PlaceholderRole(Role::Waiting))
        );
        assert_eq!(
            GameSettings::from_minutes([(Role::Werewolf, 1), (Role::Seer, 1)], 0, 2),
            Err(ProtocolError::InvalidDuration)
        );
    }

    #[test]
    fn create_room_wire_shape() {
        let settings =
            GameSettings::from_minutes([(Role::Werewolf, 1), (Role::Villager, 2)], 5, 2).unwrap();
        let event = ClientEvent::CreateRoom {
            user_name: "host".into(),
            game_settings: settings,
        };
        let value: serde_json::Value = serde_json::from_str(&event.to_frame().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "create-room",
                "data": {
                    "userName": "host",
                    "gameSettings": {
                        "roles": { "villager": 2, "werewolf": 1 },
                        "dayTime": 300,
                        "nightTime": 120
                    }
                }
            })
        );
    }

    #[test]
    fn submit_vote_wire_shape() {
        let event = ClientEvent::SubmitVote {
            room_code: RoomCode::parse("ABC123").unwrap(),
            target_player_id: "bob".into(),
            current_player_id: "alice".into(),
            current_player_role: Role::Seer,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "submit-vote",
                "data": {
                    "roomCode": "ABC123",
                    "targetPlayerId": "bob",
                    "currentPlayerId": "alice",
                    "currentPlayerRole": "seer"
                }
            })
        );
    }

    #[test]
    fn parses_phase_changed_with_partial_roster() {
        let frame = r#"{"event":"phase-changed","data":{"newPhase":"day","timeLeft":300,"dayCount":1,
            "players":[{"id":"alice","isAlive":false},{"id":"bob","name":"bob","role":"seer"}]}}"#;
        let Some(ServerEvent::PhaseChanged(change)) = parse_server_frame(frame) else {
            panic!("expected phase-changed");
        };
        assert_eq!(change.new_phase, Phase::Day);
        assert_eq!(change.players[0].is_alive, Some(false));
        assert_eq!(change.players[0].name, None);
        assert_eq!(change.players[1].role, Some(Role::Seer));
    }

    #[test]
    fn parses_room_info_snapshot() {
        let frame = json!({
            "event": "get-room-info-success",
            "data": {
                "currentPlayer": { "id": "alice", "name": "alice", "role": "waiting",
                                   "isAlive": true, "connected": true, "isHost": true },
                "players": [{ "id": "alice", "name": "alice", "role": "waiting",
                              "isAlive": true, "connected": true, "isHost": true }],
                "settings": { "roles": { "werewolf": 1, "villager": 2 }, "dayTime": 300, "nightTime": 120 },
                "gameState": "waiting",
                "currentPhase": "lobby"
            }
        })
        .to_string();
        let event = parse_server_frame(&frame).unwrap();
        assert_eq!(event.kind(), EventKind::GetRoomInfoSuccess);
        let ServerEvent::GetRoomInfoSuccess(info) = event else {
            unreachable!()
        };
        assert_eq!(info.time_left, None);
        assert_eq!(info.settings.roles[&Role::Werewolf], 1);
        assert!(info.current_player.unwrap().is_host);
    }

    #[test]
    fn legacy_failure_event_name_is_accepted() {
        let frame = r#"{"event":"get-room-info-failed","data":{"message":"Room not found"}}"#;
        assert_eq!(
            parse_server_frame(frame),
            Some(ServerEvent::GetRoomInfoFailure(Failure::new("Room not found")))
        );
    }

    #[test]
    fn player_not_found_dispatch() {
        assert!(Failure::new(PLAYER_NOT_FOUND).is_player_not_found());
        assert!(!Failure::new("player not found").is_player_not_found());
        assert!(!Failure::new("Room not found").is_player_not_found());
        assert!(
            Failure::new("whatever")
                .with_code(FailureCode::PlayerNotFound)
                .is_player_not_found()
        );
        // A structured code overrides the message text.
        assert!(
            !Failure::new(PLAYER_NOT_FOUND)
                .with_code(FailureCode::RoomNotFound)
                .is_player_not_found()
        );
        let parsed: Failure =
            serde_json::from_str(r#"{"message":"x","code":"SOMETHING_NEW"}"#).unwrap();
        assert_eq!(parsed.code, Some(FailureCode::Other));
    }

    #[test]
    fn garbage_frames_are_ignored() {
        assert_eq!(parse_server_frame("   "), None);
        assert_eq!(parse_server_frame("not json"), None);
        assert_eq!(parse_server_frame(r#"{"event":"mystery","data":{}}"#), None);
    }

    #[test]
    fn merge_only_touches_present_fields() {
        let mut player = Player::from_patch(&PlayerPatch {
            id: "carol".into(),
            name: None,
            role: Some(Role::Doctor),
            is_alive: None,
            connected: None,
            is_host: Some(true),
        });
        assert_eq!(player.name, "carol");
        assert!(player.is_alive);

        player.merge(&PlayerPatch {
            id: "carol".into(),
            name: None,
            role: None,
            is_alive: Some(false),
            connected: None,
            is_host: None,
        });
        assert_eq!(player.role, Role::Doctor);
        assert!(player.is_host);
        assert!(!player.is_alive);
    }

    #[test]
    fn role_parsing() {
        assert_eq!("Werewolf".parse::<Role>(), Ok(Role::Werewolf));
        assert!("mayor".parse::<Role>().is_err());
        assert!(Role::Seer.has_night_action());
        assert!(!Role::Drunk.has_night_action());
        assert!(!Role::Villager.has_night_action());
    }
}
