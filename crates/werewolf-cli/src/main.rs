use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use werewolf_core::protocol::Role;

mod client;
mod input;
mod render;

#[derive(Parser)]
#[command(name = "werewolf")]
#[command(about = "Play werewolf against a game server from the terminal", long_about = None)]
struct Cli {
    /// Game server URL (`/ws` is appended if missing)
    #[arg(short, long, env = "WEREWOLF_SERVER", default_value = "ws://127.0.0.1:3001")]
    server: String,

    /// Directory for the saved session and last game result
    #[arg(short, long, env = "WEREWOLF_DATA_DIR", default_value = ".werewolf")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a room and become its host
    Create {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role count, e.g. `--role werewolf=1 --role seer=1`
        #[arg(short, long = "role", value_parser = input::parse_role_count)]
        roles: Vec<(Role, u32)>,

        /// Day length in minutes
        #[arg(long, default_value_t = 5)]
        day: u32,

        /// Night length in minutes
        #[arg(long, default_value_t = 2)]
        night: u32,
    },
    /// Join an existing room by code
    Join {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        room: String,
    },
    /// Rejoin the room from the saved session
    Resume,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Game output goes to stdout; logs stay on stderr (respects RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    client::start_client(cli).await
}
