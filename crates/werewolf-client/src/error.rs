use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use werewolf_core::protocol::{EventKind, ProtocolError};
use werewolf_core::transport::TransportError;

/// Failures of the on-disk identity and result records.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Invalid(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a failure event.
    #[error("{0}")]
    Rejected(String),

    #[error("no {waiting_for} from the server within {}s", .after.as_secs())]
    Timeout {
        waiting_for: EventKind,
        after: Duration,
    },

    #[error("disconnected from the server")]
    Disconnected,

    #[error("the transport is already connected")]
    AlreadyConnected,

    #[error("Only the host can start the game")]
    NotHost,
}
