//! Create and join flows used before any room screen exists.
//!
//! Both validate input locally, subscribe to the answer before emitting the
//! request, and wait a bounded time for the server. A rejected join leaves
//! the user on the entry screen with the server's message.

use std::time::Duration;

use werewolf_core::protocol::{
    ClientEvent, EventKind, GameSettings, RoomCode, ServerEvent, validate_display_name,
};

use crate::error::ClientError;
use crate::net_client::{NetClient, Subscription};

/// Ask the server for a new room and return its code.
pub async fn create_room(
    net: &NetClient,
    name: &str,
    settings: GameSettings,
    timeout: Duration,
) -> Result<RoomCode, ClientError> {
    let user_name = validate_display_name(name)?;
    let mut answers = net.subscribe(&[EventKind::RoomCreated]);
    net.emit(ClientEvent::CreateRoom {
        user_name,
        game_settings: settings,
    });

    match await_answer(&mut answers, EventKind::RoomCreated, timeout).await? {
        ServerEvent::RoomCreated { room_code } => {
            tracing::info!(room = %room_code, "room created");
            Ok(room_code)
        }
        other => Err(unexpected(other)),
    }
}

/// Join an existing room by its (user-typed) code.
pub async fn join_room(
    net: &NetClient,
    name: &str,
    code: &str,
    timeout: Duration,
) -> Result<RoomCode, ClientError> {
    let user_name = validate_display_name(name)?;
    let room_code = RoomCode::parse(code)?;
    let mut answers = net.subscribe(&[EventKind::RoomJoined, EventKind::JoinRoomFailed]);
    net.emit(ClientEvent::JoinRoom {
        user_name,
        room_code,
    });

    match await_answer(&mut answers, EventKind::RoomJoined, timeout).await? {
        ServerEvent::RoomJoined { room_code } => {
            tracing::info!(room = %room_code, "joined room");
            Ok(room_code)
        }
        ServerEvent::JoinRoomFailed(failure) => {
            tracing::info!(reason = %failure.message, "join rejected");
            Err(ClientError::Rejected(failure.message))
        }
        other => Err(unexpected(other)),
    }
}

async fn await_answer(
    answers: &mut Subscription,
    waiting_for: EventKind,
    timeout: Duration,
) -> Result<ServerEvent, ClientError> {
    match tokio::time::timeout(timeout, answers.recv()).await {
        Ok(Some(event)) => Ok(event),
        Ok(None) => Err(ClientError::Disconnected),
        Err(_) => Err(ClientError::Timeout {
            waiting_for,
            after: timeout,
        }),
    }
}

fn unexpected(event: ServerEvent) -> ClientError {
    ClientError::Rejected(format!("unexpected {} from server", event.kind()))
}
