use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The record linking one participant to one hackathon.
///
/// There is at most one registration per (participant, hackathon) pair.
///
/// # Lifecycle
/// A registration starts either unattached (`team_id` is `None`) or directly
/// attached through a team registration. An unattached registration becomes
/// attached once the team lead approves the join request. Nothing moves a
/// registration back out of a team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registration {
    pub id: u64,
    pub participant_id: u64,
    pub hackathon_id: u64,
    pub team_id: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    pub fn state(&self) -> RegistrationState {
        match self.team_id {
            Some(team_id) => RegistrationState::Attached { team_id },
            None => RegistrationState::Unattached,
        }
    }
}

/// Where a registration sits in its lifecycle.
///
/// - `Unattached`: Registered for the hackathon, not part of any team yet
/// - `Attached`: Member of a team (terminal)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum RegistrationState {
    Unattached,
    Attached { team_id: u64 },
}

/// Input for registering a participant without a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterIndividualInput {
    pub participant_id: u64,
    pub hackathon_id: u64,
}

/// Input for registering a participant straight into an existing team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterToTeamInput {
    pub participant_id: u64,
    pub hackathon_id: u64,
    pub team_id: u64,
}

/// Input for a team lead approving a participant's join request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveTeamJoinInput {
    pub team_lead_id: u64,
    pub participant_id: u64,
    pub team_id: u64,
}
