//! Plain-text frontend.
//!
//! Writes one block per route change or state change. Countdown ticks are
//! throttled so the terminal is not flooded once a second.

use std::io::{self, Write};

use werewolf_client::app::View;
use werewolf_client::client_controller::Route;
use werewolf_core::game_state::{ClientGameState, GameEvent, LogCategory, StateChanged};
use werewolf_core::protocol::{GameResults, Phase, Player, PlayerPatch, Role};
use werewolf_core::timer::format_clock;

/// Countdown values printed every second instead of every [`TICK_EVERY`].
const FINAL_SECONDS: u32 = 5;
const TICK_EVERY: u32 = 15;

pub struct TextView<W: Write> {
    out: W,
}

impl TextView<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TextView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn write_block(&mut self, lines: &[String]) {
        let result = lines
            .iter()
            .try_for_each(|line| writeln!(self.out, "{line}"))
            .and_then(|()| self.out.flush());
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to write to terminal");
        }
    }
}

impl<W: Write> View for TextView<W> {
    fn show_route(&mut self, route: &Route, results: Option<&GameResults>) {
        let mut lines = vec![String::new()];
        match route {
            Route::Home => lines.push("== Home ==  (create <name> | join <name> <code> | quit)".into()),
            Route::JoinGame => lines.push("== Join a game ==  (join <name> <code>)".into()),
            Route::Lobby(code) => lines.push(format!("== Lobby {code} ==  (start | leave)")),
            Route::Game(code) => {
                lines.push(format!("== Game {code} ==  (select <player> | submit | leave)"))
            }
            Route::GameOver => {
                lines.push("== Game over ==  (ok)".into());
                match results {
                    Some(results) => lines.extend(results_lines(results)),
                    None => lines.push("No results available.".into()),
                }
            }
        }
        self.write_block(&lines);
    }

    fn show_room(&mut self, state: &ClientGameState, changed: StateChanged) {
        let mut lines = Vec::new();
        if changed.phase || changed.timer {
            lines.push(phase_line(state));
        }
        if changed.players {
            lines.extend(roster_lines(state));
        }
        if changed.phase || changed.players || changed.submission {
            lines.extend(action_lines(state));
        }
        if changed.log
            && let Some(event) = state.events.back()
        {
            lines.push(format!("{} {}", marker(event.category()), describe(event)));
        }
        if !lines.is_empty() {
            self.write_block(&lines);
        }
    }

    fn show_tick(&mut self, state: &ClientGameState) {
        let seconds = state.timer.seconds_remaining();
        if seconds <= FINAL_SECONDS || seconds % TICK_EVERY == 0 {
            self.write_block(&[format!("  {} left", format_clock(seconds))]);
        }
    }

    fn show_notice(&mut self, message: &str) {
        self.write_block(&[format!("! {message}")]);
    }
}

fn phase_line(state: &ClientGameState) -> String {
    match state.phase() {
        Phase::Lobby if state.awaiting_timer => "Lobby - game starting...".into(),
        Phase::Night | Phase::Day => format!(
            "{} {} - {}",
            state.phase(),
            state.room.day_count,
            format_clock(state.timer.seconds_remaining())
        ),
        phase => phase.to_string(),
    }
}

fn roster_lines(state: &ClientGameState) -> Vec<String> {
    let me = state.current_player().map(|p| &p.id);
    let mut lines = vec![format!(
        "Players ({}/{}):",
        state.room.connected_players().count(),
        state
            .room
            .settings
            .as_ref()
            .map_or(state.room.players.len() as u32, |s| s.seat_count())
    )];
    lines.extend(state.room.players.iter().map(|p| player_line(p, Some(&p.id) == me)));
    lines
}

fn player_line(player: &Player, is_me: bool) -> String {
    let mut line = format!("  {} [{}]", player.name, player.id);
    if is_me {
        line.push_str(" (you)");
    }
    if player.is_host {
        line.push_str(" (host)");
    }
    if !player.is_alive {
        line.push_str(" (dead)");
    }
    if !player.connected {
        line.push_str(" (away)");
    }
    line
}

fn action_lines(state: &ClientGameState) -> Vec<String> {
    let mut lines = Vec::new();
    let Some(me) = state.current_player() else {
        return lines;
    };
    if me.role != Role::Waiting {
        lines.push(format!("You are the {}.", me.role));
    }
    match state.phase() {
        Phase::Night => lines.push(me.role.night_prompt().to_string()),
        Phase::Day if me.is_alive => lines.push("Vote for a player to eliminate".into()),
        _ => {}
    }
    if state.submission.has_submitted() {
        lines.push("Action sent. Waiting for the others.".into());
    } else if state.can_submit() {
        let targets: Vec<String> = state
            .eligible_targets()
            .iter()
            .map(|p| p.id.to_string())
            .collect();
        lines.push(format!("Targets: {}", targets.join(", ")));
        if let Some(selected) = state.submission.selected() {
            lines.push(format!("Selected: {selected}"));
        }
    }
    if let Some(vision) = &state.seer_message {
        lines.push(format!("Vision: {vision}"));
    }
    lines
}

fn results_lines(results: &GameResults) -> Vec<String> {
    let (wolves, villagers) = results.teams();
    let names = |team: Vec<&PlayerPatch>| {
        team.iter()
            .map(|p| p.display_name())
            .collect::<Vec<_>>()
            .join(", ")
    };
    vec![
        results.winner.headline().to_string(),
        format!("Days survived: {}", results.day_count),
        format!("Werewolves: {}", names(wolves)),
        format!("Villagers: {}", names(villagers)),
    ]
}

fn marker(category: LogCategory) -> char {
    match category {
        LogCategory::Error => '!',
        LogCategory::Phase => '>',
        _ => '*',
    }
}

fn describe(event: &GameEvent) -> String {
    match event {
        GameEvent::Synced { reconnected: true } => "Reconnected to the room".into(),
        GameEvent::Synced { reconnected: false } => "Room loaded".into(),
        GameEvent::RosterChanged { connected } => format!("{connected} players in the room"),
        GameEvent::GameStarting => "The game is starting".into(),
        GameEvent::PhaseStarted { phase, day_count } => format!("{phase} {day_count} begins"),
        GameEvent::ActionSent { target, role } => format!("You ({role}) chose {target}"),
        GameEvent::SeerVision { message } => message.clone(),
        GameEvent::GameOver { winner } => winner.headline().to_string(),
        GameEvent::ServerError { message } => format!("Error: {message}"),
        GameEvent::Disconnected => "Disconnected".into(),
        GameEvent::Text { text, .. } => text.clone(),
    }
}
