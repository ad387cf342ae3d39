//! Line-based user input.
//!
//! Each stdin line becomes one [`Intent`]:
//!
//! | line                         | intent          |
//! |------------------------------|-----------------|
//! | `create <name> [role=n ...]` | create a room   |
//! | `join <name> <code>`         | join a room     |
//! | `select <player>` / `s`      | pick a target   |
//! | `submit` / `vote`            | send the action |
//! | `start`                      | host starts     |
//! | `leave`                      | leave the room  |
//! | `ok`                         | dismiss results |
//! | `quit` / `q`                 | exit            |

use std::io::BufRead;

use tokio::sync::mpsc;
use werewolf_client::app::Intent;
use werewolf_core::protocol::{GameSettings, PlayerId, Role};

/// Default room when `create` lists no roles.
pub const DEFAULT_ROLES: [(Role, u32); 3] = [(Role::Werewolf, 1), (Role::Seer, 1), (Role::Villager, 2)];
pub const DEFAULT_DAY_MINUTES: u32 = 5;
pub const DEFAULT_NIGHT_MINUTES: u32 = 2;

/// Parse `role=count`, e.g. `werewolf=2`.
pub fn parse_role_count(raw: &str) -> Result<(Role, u32), String> {
    let (role, count) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ROLE=COUNT, got `{raw}`"))?;
    let role: Role = role.trim().parse()?;
    let count = count
        .trim()
        .parse()
        .map_err(|_| format!("invalid count in `{raw}`"))?;
    Ok((role, count))
}

/// Build settings, falling back to [`DEFAULT_ROLES`] when none are given.
pub fn settings_from(
    roles: Vec<(Role, u32)>,
    day: u32,
    night: u32,
) -> Result<GameSettings, String> {
    let roles = if roles.is_empty() {
        DEFAULT_ROLES.to_vec()
    } else {
        roles
    };
    GameSettings::from_minutes(roles, day, night).map_err(|e| e.to_string())
}

/// Parse one input line. `Ok(None)` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<Intent>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let intent = match (command.to_ascii_lowercase().as_str(), rest.as_slice()) {
        ("create", [name, roles @ ..]) => {
            let roles = roles
                .iter()
                .map(|r| parse_role_count(r))
                .collect::<Result<Vec<_>, _>>()?;
            Intent::Create {
                name: name.to_string(),
                settings: settings_from(roles, DEFAULT_DAY_MINUTES, DEFAULT_NIGHT_MINUTES)?,
            }
        }
        ("join", [name, code]) => Intent::Join {
            name: name.to_string(),
            room_code: code.to_string(),
        },
        ("select" | "s", [player]) => Intent::Select(PlayerId::new(*player)),
        ("submit" | "vote", []) => Intent::Submit,
        ("start", []) => Intent::StartGame,
        ("leave", []) => Intent::Leave,
        ("ok", []) => Intent::Acknowledge,
        ("quit" | "q" | "exit", []) => Intent::Quit,
        _ => return Err(format!("unknown command `{}`", line.trim())),
    };
    Ok(Some(intent))
}

/// Forward stdin lines as intents until stdin closes or the app stops.
///
/// Blocking; run it on its own thread so a pending read never holds up
/// runtime shutdown.
pub fn read_intents(tx: mpsc::UnboundedSender<Intent>) {
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stdin");
                break;
            }
        };
        match parse_line(&line) {
            Ok(Some(intent)) => {
                if tx.send(intent).is_err() {
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => println!("! {e}"),
        }
    }
    let _ = tx.send(Intent::Quit);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_counts() {
        assert_eq!(parse_role_count("werewolf=2"), Ok((Role::Werewolf, 2)));
        assert_eq!(parse_role_count(" seer = 1 "), Ok((Role::Seer, 1)));
        assert!(parse_role_count("seer").is_err());
        assert!(parse_role_count("seer=x").is_err());
        assert!(parse_role_count("vampire=1").is_err());
    }

    #[test]
    fn commands() {
        assert_eq!(parse_line("   "), Ok(None));
        assert_eq!(
            parse_line("s bob"),
            Ok(Some(Intent::Select(PlayerId::new("bob"))))
        );
        assert_eq!(parse_line("VOTE"), Ok(Some(Intent::Submit)));
        assert_eq!(
            parse_line("join bob abc123"),
            Ok(Some(Intent::Join {
                name: "bob".into(),
                room_code: "abc123".into()
            }))
        );
        assert_eq!(parse_line("q"), Ok(Some(Intent::Quit)));
        assert!(parse_line("dance").is_err());
        assert!(parse_line("submit now").is_err());
    }

    #[test]
    fn create_uses_defaults_or_given_roles() {
        let Ok(Some(Intent::Create { name, settings })) = parse_line("create alice") else {
            panic!("expected create");
        };
        assert_eq!(name, "alice");
        assert_eq!(settings.seat_count(), 4);
        assert_eq!(settings.day_time, 300);

        let Ok(Some(Intent::Create { settings, .. })) =
            parse_line("create alice werewolf=1 villager=2")
        else {
            panic!("expected create");
        };
        assert_eq!(settings.roles.get(&Role::Villager), Some(&2));
        assert_eq!(settings.seat_count(), 3);

        assert!(parse_line("create alice villager=3").is_err());
    }
}
