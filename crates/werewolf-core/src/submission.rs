//! At-most-one vote or night action per player per phase.
//!
//! The authoritative tally happens on the server; this guard only makes sure
//! the client never sends a second action for the same phase, however many
//! times the UI asks.

use thiserror::Error;

use crate::protocol::{ClientEvent, Phase, Player, PlayerId, Role, RoomCode};

/// Phase-scoped submission record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionState {
    pub has_submitted: bool,
    pub selected_target_id: Option<PlayerId>,
}

/// Why a target could not be selected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("You already acted this phase")]
    AlreadySubmitted,

    #[error("You have no action during this phase")]
    NoAction,

    #[error("{0} cannot be targeted")]
    IneligibleTarget(PlayerId),
}

/// Whether `actor`'s role gives them an action in `phase`, ignoring whether
/// they already used it.
pub fn has_action(actor: &Player, phase: Phase) -> bool {
    if !actor.is_alive {
        return false;
    }
    match phase {
        Phase::Day => true,
        Phase::Night => actor.role.has_night_action(),
        Phase::Lobby | Phase::GameOver => false,
    }
}

/// Players `actor` may pick as a target in `phase`.
pub fn eligible_targets<'a>(actor: &Player, phase: Phase, players: &'a [Player]) -> Vec<&'a Player> {
    if !has_action(actor, phase) {
        return Vec::new();
    }
    let living = players.iter().filter(|p| p.is_alive);
    match (phase, actor.role) {
        (Phase::Night, Role::Werewolf) => living.filter(|p| p.role != Role::Werewolf).collect(),
        (Phase::Night, Role::Doctor | Role::Witch) => living.collect(),
        (Phase::Night, Role::Seer) | (Phase::Day, _) => living.filter(|p| p.id != actor.id).collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionGuard {
    state: SubmissionState,
}

impl SubmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn has_submitted(&self) -> bool {
        self.state.has_submitted
    }

    pub fn selected(&self) -> Option<&PlayerId> {
        self.state.selected_target_id.as_ref()
    }

    pub fn can_submit(&self, actor: &Player, phase: Phase) -> bool {
        !self.state.has_submitted && has_action(actor, phase)
    }

    /// Choose a target for the pending action.
    pub fn select(
        &mut self,
        actor: &Player,
        phase: Phase,
        players: &[Player],
        target: &PlayerId,
    ) -> Result<(), SelectError> {
        if self.state.has_submitted {
            return Err(SelectError::AlreadySubmitted);
        }
        if !has_action(actor, phase) {
            return Err(SelectError::NoAction);
        }
        if !eligible_targets(actor, phase, players)
            .iter()
            .any(|p| &p.id == target)
        {
            return Err(SelectError::IneligibleTarget(target.clone()));
        }
        self.state.selected_target_id = Some(target.clone());
        Ok(())
    }

    /// Build the single outbound action for this phase.
    ///
    /// Marks the phase as submitted before returning, so the caller must send
    /// what it gets. Returns `None` without side effects when the action is
    /// not allowed, no eligible target is selected, or it was already sent.
    pub fn submit(
        &mut self,
        room_code: &RoomCode,
        actor: &Player,
        phase: Phase,
        players: &[Player],
    ) -> Option<ClientEvent> {
        if !self.can_submit(actor, phase) {
            tracing::debug!(
                submitted = self.state.has_submitted,
                %phase,
                "submission ignored"
            );
            return None;
        }
        let target = self.state.selected_target_id.clone()?;
        if !eligible_targets(actor, phase, players)
            .iter()
            .any(|p| p.id == target)
        {
            tracing::debug!(%target, "selected target no longer eligible");
            self.state.selected_target_id = None;
            return None;
        }
        self.state.has_submitted = true;
        Some(ClientEvent::SubmitVote {
            room_code: room_code.clone(),
            target_player_id: target,
            current_player_id: actor.id.clone(),
            current_player_role: actor.role,
        })
    }

    /// Clear for a new phase.
    pub fn reset(&mut self) {
        self.state = SubmissionState::default();
    }
}
