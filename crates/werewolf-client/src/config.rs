use std::path::PathBuf;
use std::time::Duration;

use crate::identity::FileStore;

/// Local countdown step.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// How long entry flows wait for the server to answer.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolved client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// WebSocket endpoint, always ending in `/ws`.
    pub ws_url: String,
    /// Directory holding the persisted identity and results.
    pub data_dir: PathBuf,
    pub tick: Duration,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(server: &str, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            ws_url: normalise_ws_url(server),
            data_dir: data_dir.into(),
            tick: DEFAULT_TICK,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn store(&self) -> FileStore {
        FileStore::new(&self.data_dir)
    }
}

/// Turn whatever the user typed into a WebSocket URL ending in `/ws`.
///
/// `http(s)://` becomes `ws(s)://` and a bare `host:port` gets `ws://`.
pub fn normalise_ws_url(server: &str) -> String {
    let server = server.trim();
    let with_scheme = if let Some(rest) = server.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = server.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if server.starts_with("ws://") || server.starts_with("wss://") {
        server.to_string()
    } else {
        format!("ws://{server}")
    };

    if with_scheme.ends_with("/ws") {
        with_scheme
    } else {
        format!("{}/ws", with_scheme.trim_end_matches('/'))
    }
}
