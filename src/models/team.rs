use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A team competing in a single hackathon.
///
/// Every team has exactly one lead. The lead is the only participant allowed
/// to approve join requests and to hand leadership to someone else.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Team {
    pub id: u64,
    pub name: String,
    pub hackathon_id: u64,
    /// Participant id of the current lead.
    pub lead_id: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTeamInput {
    pub name: String,
    pub hackathon_id: u64,
    pub lead_id: u64,
}

/// Input for handing team leadership to another participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferLeadInput {
    /// Participant id of whoever is asking for the transfer. Must be the
    /// current lead.
    pub caller_id: u64,
    pub new_lead_id: u64,
}
