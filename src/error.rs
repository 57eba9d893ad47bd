use thiserror::Error;

/// Failures raised by the entity store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("Unique constraint violated")]
    Conflict,

    /// A foreign key pointed at a record that does not exist.
    #[error("Referenced record does not exist")]
    MissingReference,

    #[error("Database error: {0}")]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref failure, _) = err {
            match failure.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => return Self::Conflict,
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return Self::MissingReference,
                _ => {}
            }
        }
        Self::Sqlite(err)
    }
}

/// Errors returned by the registration engine and the team authority manager.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Participant {participant_id} is already registered for hackathon {hackathon_id}")]
    DuplicateRegistration {
        participant_id: u64,
        hackathon_id: u64,
    },

    #[error("Team {team_id} not found")]
    TeamNotFound { team_id: u64 },

    #[error("Participant {actor_id} is not the lead of team {team_id}")]
    NotAuthorized { actor_id: u64, team_id: u64 },

    #[error("No pending registration for participant {participant_id} in hackathon {hackathon_id}")]
    PendingRegistrationNotFound {
        participant_id: u64,
        hackathon_id: u64,
    },

    #[error("Participant {participant_id} is not registered for hackathon {hackathon_id}")]
    InvalidLead {
        participant_id: u64,
        hackathon_id: u64,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RegistryError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Largest id the store can hold. SQLite rowids are signed 64-bit.
pub const MAX_ID: u64 = i64::MAX as u64;

/// Reject ids the store could never have assigned: zero, and anything past
/// [`MAX_ID`].
pub(crate) fn require_id(field: &str, id: u64) -> Result<(), RegistryError> {
    if id == 0 {
        return Err(RegistryError::validation(format!("{field} is required")));
    }
    if id > MAX_ID {
        return Err(RegistryError::validation(format!("{field} is out of range")));
    }
    Ok(())
}
