pub mod game_state;
pub mod protocol;
pub mod room;
pub mod submission;
pub mod timer;
pub mod transport;

#[cfg(feature = "native")]
pub mod ws_transport;
