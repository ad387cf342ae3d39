//! Wires networking, persistence and the text frontend together.
//!
//! The first intent comes from the command line; everything after that is
//! read from stdin by [`input::read_intents`].

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use werewolf_client::app::{App, Intent};
use werewolf_client::client_controller::Route;
use werewolf_client::config::ClientConfig;
use werewolf_client::identity::SessionStore;
use werewolf_client::net_client::NetClient;

use crate::input;
use crate::render::TextView;
use crate::{Cli, Command};

/// Connect to the server and run the app until the user quits.
pub async fn start_client(cli: Cli) -> anyhow::Result<()> {
    let config = ClientConfig::new(&cli.server, &cli.data_dir);
    let store: Arc<dyn SessionStore> = Arc::new(config.store());

    let net = NetClient::new();
    net.connect_ws(&config.ws_url)
        .await
        .with_context(|| format!("could not reach {}", config.ws_url))?;
    tracing::info!(url = %config.ws_url, "connected");

    let (tx, rx) = mpsc::unbounded_channel();
    let first = match cli.command {
        Command::Create {
            name,
            roles,
            day,
            night,
        } => {
            let settings = input::settings_from(roles, day, night)
                .map_err(anyhow::Error::msg)
                .context("invalid game settings")?;
            Some(Intent::Create { name, settings })
        }
        Command::Join { name, room } => Some(Intent::Join {
            name,
            room_code: room,
        }),
        Command::Resume => None,
    };

    let app = App::new(net, store, config, TextView::stdout());
    let start = match first {
        Some(intent) => {
            // Queued before stdin so it is handled first.
            let _ = tx.send(intent);
            Route::JoinGame
        }
        None => app.resume_route(),
    };

    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || input::read_intents(tx))
        .context("could not start the input thread")?;
    app.run(start, rx).await;
    Ok(())
}
