use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A hackathon event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hackathon {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new hackathon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHackathonInput {
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}
