//! Registration engine: admits participants into a hackathon, on their own or
//! into a team, and attaches pending registrations once a team lead approves.
//!
//! The engine is the only writer of registration records. Every mutating
//! operation runs as a single [`Database::atomically`] unit, and the store's
//! unique index on (participant, hackathon) turns a lost race into
//! [`RegistryError::DuplicateRegistration`] instead of a second row.

use chrono::Utc;

use crate::db::{Database, StoreTx};
use crate::error::{require_id, RegistryError, StoreError};
use crate::models::{Registration, RegistrationState};
use crate::team::ensure_lead;

#[derive(Clone)]
pub struct RegistrationEngine {
    store: Database,
}

impl RegistrationEngine {
    pub fn new(store: Database) -> Self {
        Self { store }
    }

    /// Register a participant for a hackathon without a team.
    pub fn register_individual(
        &self,
        participant_id: u64,
        hackathon_id: u64,
    ) -> Result<Registration, RegistryError> {
        require_id("participant_id", participant_id)?;
        require_id("hackathon_id", hackathon_id)?;

        let registration = self
            .store
            .atomically(|tx| insert_registration(tx, participant_id, hackathon_id, None))?;

        tracing::info!(
            registration_id = registration.id,
            participant_id,
            hackathon_id,
            "Registered participant individually"
        );
        Ok(registration)
    }

    /// Register a participant directly into a team of the given hackathon.
    ///
    /// The team check comes first, so a team from another hackathon is
    /// reported as [`RegistryError::TeamNotFound`] even for a participant who
    /// is already registered.
    pub fn register_to_team(
        &self,
        participant_id: u64,
        hackathon_id: u64,
        team_id: u64,
    ) -> Result<Registration, RegistryError> {
        require_id("participant_id", participant_id)?;
        require_id("hackathon_id", hackathon_id)?;
        require_id("team_id", team_id)?;

        let registration = self.store.atomically(|tx| -> Result<_, RegistryError> {
            match tx.get_team(team_id)? {
                Some(team) if team.hackathon_id == hackathon_id => {}
                _ => return Err(RegistryError::TeamNotFound { team_id }),
            }
            insert_registration(tx, participant_id, hackathon_id, Some(team_id))
        })?;

        tracing::info!(
            registration_id = registration.id,
            participant_id,
            hackathon_id,
            team_id,
            "Registered participant into team"
        );
        Ok(registration)
    }

    /// Attach a participant's pending registration to a team.
    ///
    /// Only the team's current lead may approve. Approving a participant who
    /// is already in this team returns their registration unchanged.
    pub fn approve_team_join(
        &self,
        team_lead_id: u64,
        participant_id: u64,
        team_id: u64,
    ) -> Result<Registration, RegistryError> {
        require_id("team_lead_id", team_lead_id)?;
        require_id("participant_id", participant_id)?;
        require_id("team_id", team_id)?;

        let registration = self.store.atomically(|tx| -> Result<_, RegistryError> {
            let team = tx
                .get_team(team_id)?
                .ok_or(RegistryError::TeamNotFound { team_id })?;
            ensure_lead(&team, team_lead_id)?;

            let pending = RegistryError::PendingRegistrationNotFound {
                participant_id,
                hackathon_id: team.hackathon_id,
            };
            let Some(registration) =
                tx.get_registration_by_participant(participant_id, team.hackathon_id)?
            else {
                return Err(pending);
            };

            match registration.state() {
                RegistrationState::Attached { team_id: current } if current == team.id => {
                    Ok(registration)
                }
                RegistrationState::Attached { .. } => Err(pending),
                RegistrationState::Unattached => {
                    let now = Utc::now();
                    if !tx.attach_registration(registration.id, team.id, now)? {
                        return Err(pending);
                    }
                    Ok(Registration {
                        team_id: Some(team.id),
                        updated_at: now,
                        ..registration
                    })
                }
            }
        })?;

        tracing::info!(
            registration_id = registration.id,
            participant_id,
            team_id,
            "Approved team join"
        );
        Ok(registration)
    }

    pub fn get_by_participant(
        &self,
        participant_id: u64,
        hackathon_id: u64,
    ) -> Result<Option<Registration>, RegistryError> {
        Ok(self
            .store
            .get_registration_by_participant(participant_id, hackathon_id)?)
    }

    pub fn list_by_hackathon(&self, hackathon_id: u64) -> Result<Vec<Registration>, RegistryError> {
        Ok(self.store.get_registrations_by_hackathon(hackathon_id)?)
    }

    pub fn list_all(&self) -> Result<Vec<Registration>, RegistryError> {
        Ok(self.store.get_all_registrations()?)
    }

    pub fn get_by_id(&self, id: u64) -> Result<Option<Registration>, RegistryError> {
        Ok(self.store.get_registration(id)?)
    }

    /// Remove a registration. Returns `false` if it did not exist.
    pub fn delete(&self, id: u64) -> Result<bool, RegistryError> {
        let deleted = self.store.delete_registration(id)?;
        if deleted {
            tracing::info!(registration_id = id, "Deleted registration");
        }
        Ok(deleted)
    }
}

fn insert_registration(
    tx: &StoreTx<'_>,
    participant_id: u64,
    hackathon_id: u64,
    team_id: Option<u64>,
) -> Result<Registration, RegistryError> {
    tx.insert_registration(participant_id, hackathon_id, team_id)
        .map_err(|e| match e {
            StoreError::Conflict => RegistryError::DuplicateRegistration {
                participant_id,
                hackathon_id,
            },
            StoreError::MissingReference => RegistryError::validation(format!(
                "participant {participant_id} or hackathon {hackathon_id} does not exist"
            )),
            other => RegistryError::Store(other),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;
    use chrono::Duration;

    fn seeded() -> (RegistrationEngine, Database, u64, u64) {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        let participant = db
            .create_participant(CreateParticipantInput {
                external_id: "kc-1".to_string(),
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            })
            .unwrap();
        let now = Utc::now();
        let hackathon = db
            .create_hackathon(CreateHackathonInput {
                title: "Spring Jam".to_string(),
                description: None,
                starts_at: now,
                ends_at: now + Duration::days(2),
            })
            .unwrap();
        (RegistrationEngine::new(db.clone()), db, participant.id, hackathon.id)
    }

    #[test]
    fn test_zero_ids_are_rejected_before_touching_the_store() {
        let (engine, db, _, hackathon_id) = seeded();
        let err = engine.register_individual(0, hackathon_id).unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
        assert!(db.get_all_registrations().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_hackathon_is_a_validation_error() {
        let (engine, _, participant_id, _) = seeded();
        let err = engine.register_individual(participant_id, 999).unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    #[test]
    fn test_new_individual_registration_is_unattached() {
        let (engine, _, participant_id, hackathon_id) = seeded();
        let registration = engine
            .register_individual(participant_id, hackathon_id)
            .unwrap();
        assert_eq!(registration.state(), RegistrationState::Unattached);
    }
}
