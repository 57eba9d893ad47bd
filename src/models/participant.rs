use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A person who can register for hackathons.
///
/// Participants are onboarded outside the registry and are only referenced
/// here. `external_id` is the user id returned by the identity provider, which
/// lets the gateway map a verified bearer token onto a participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub id: u64,
    pub external_id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateParticipantInput {
    pub external_id: String,
    pub name: String,
    pub email: String,
}
