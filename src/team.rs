//! Team authority: who may change a team's composition, and handing that
//! authority to someone else.

use chrono::Utc;

use crate::db::Database;
use crate::error::{require_id, RegistryError};
use crate::models::{CreateTeamInput, Team};

/// Fail unless `actor_id` is the team's current lead.
pub(crate) fn ensure_lead(team: &Team, actor_id: u64) -> Result<(), RegistryError> {
    if team.lead_id != actor_id {
        return Err(RegistryError::NotAuthorized {
            actor_id,
            team_id: team.id,
        });
    }
    Ok(())
}

#[derive(Clone)]
pub struct TeamAuthority {
    store: Database,
}

impl TeamAuthority {
    pub fn new(store: Database) -> Self {
        Self { store }
    }

    /// Create a team led by `input.lead_id`.
    ///
    /// The lead must already hold a registration for the hackathon. Their
    /// registration is left as it is; joining the team still goes through
    /// approval.
    pub fn create_team(&self, input: CreateTeamInput) -> Result<Team, RegistryError> {
        require_id("hackathon_id", input.hackathon_id)?;
        require_id("lead_id", input.lead_id)?;
        let name = input.name.trim();
        if name.is_empty() {
            return Err(RegistryError::validation("name is required"));
        }
        let input = CreateTeamInput {
            name: name.to_string(),
            ..input
        };

        let team = self.store.atomically(|tx| -> Result<_, RegistryError> {
            if tx
                .get_registration_by_participant(input.lead_id, input.hackathon_id)?
                .is_none()
            {
                return Err(RegistryError::InvalidLead {
                    participant_id: input.lead_id,
                    hackathon_id: input.hackathon_id,
                });
            }
            Ok(tx.insert_team(input)?)
        })?;

        tracing::info!(
            team_id = team.id,
            hackathon_id = team.hackathon_id,
            lead_id = team.lead_id,
            "Created team"
        );
        Ok(team)
    }

    /// Teams in creation order, optionally limited to one hackathon.
    pub fn list_teams(&self, hackathon_id: Option<u64>) -> Result<Vec<Team>, RegistryError> {
        Ok(self.store.get_teams(hackathon_id)?)
    }

    pub fn get_team(&self, team_id: u64) -> Result<Option<Team>, RegistryError> {
        Ok(self.store.get_team(team_id)?)
    }

    /// Whether `actor_id` currently leads the team. Unknown teams have no lead.
    pub fn is_lead(&self, team_id: u64, actor_id: u64) -> Result<bool, RegistryError> {
        Ok(self
            .store
            .get_team(team_id)?
            .is_some_and(|team| ensure_lead(&team, actor_id).is_ok()))
    }

    /// Make `new_lead_id` the lead of the team.
    ///
    /// The caller must be the current lead, and the new lead must hold a
    /// registration for the team's hackathon.
    pub fn transfer_lead(
        &self,
        caller_id: u64,
        team_id: u64,
        new_lead_id: u64,
    ) -> Result<Team, RegistryError> {
        require_id("caller_id", caller_id)?;
        require_id("team_id", team_id)?;
        require_id("new_lead_id", new_lead_id)?;

        let team = self.store.atomically(|tx| -> Result<_, RegistryError> {
            let team = tx
                .get_team(team_id)?
                .ok_or(RegistryError::TeamNotFound { team_id })?;
            ensure_lead(&team, caller_id)?;

            if tx
                .get_registration_by_participant(new_lead_id, team.hackathon_id)?
                .is_none()
            {
                return Err(RegistryError::InvalidLead {
                    participant_id: new_lead_id,
                    hackathon_id: team.hackathon_id,
                });
            }

            if team.lead_id == new_lead_id {
                return Ok(team);
            }

            let now = Utc::now();
            tx.update_team_lead(team.id, new_lead_id, now)?;
            Ok(Team {
                lead_id: new_lead_id,
                updated_at: now,
                ..team
            })
        })?;

        tracing::info!(
            team_id,
            previous_lead = caller_id,
            new_lead = team.lead_id,
            "Transferred team lead"
        );
        Ok(team)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(lead_id: u64) -> Team {
        let now = Utc::now();
        Team {
            id: 5,
            name: "Rustaceans".to_string(),
            hackathon_id: 100,
            lead_id,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_lead_passes_authority_check() {
        assert!(ensure_lead(&team(3), 3).is_ok());
    }

    #[test]
    fn test_non_lead_fails_authority_check() {
        let err = ensure_lead(&team(3), 7).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::NotAuthorized {
                actor_id: 7,
                team_id: 5
            }
        ));
    }
}
