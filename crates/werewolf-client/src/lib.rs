pub mod app;
pub mod client_controller;
pub mod config;
pub mod entry;
pub mod error;
pub mod identity;
pub mod net_client;
pub mod reconnect;
