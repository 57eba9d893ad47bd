use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use serde::Deserialize;

use super::{json::Json, AppState, Caller};
use crate::error::RegistryError;
use crate::models::*;

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
/// The full error is logged server-side for debugging, but clients only
/// see a generic message to avoid leaking internal details.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

/// Map a registry error onto a status code. Business-rule failures are safe
/// to show to the caller; store failures are not.
fn registry_error(e: RegistryError) -> (StatusCode, String) {
    let status = match &e {
        RegistryError::Validation(_)
        | RegistryError::DuplicateRegistration { .. }
        | RegistryError::TeamNotFound { .. }
        | RegistryError::InvalidLead { .. } => StatusCode::BAD_REQUEST,
        RegistryError::NotAuthorized { .. } => StatusCode::FORBIDDEN,
        RegistryError::PendingRegistrationNotFound { .. } => StatusCode::NOT_FOUND,
        RegistryError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        return internal_error(e);
    }
    tracing::warn!("Request rejected: {}", e);
    (status, e.to_string())
}

/// When the request carries a verified identity, the claimed actor id must
/// belong to that identity's participant.
fn ensure_caller_is(state: &AppState, caller: &Caller, claimed_id: u64) -> ApiResult<()> {
    let Some(identity) = &caller.0 else {
        return Ok(());
    };

    let participant = state
        .db
        .get_participant_by_external_id(&identity.user_id)
        .map_err(internal_error)?;

    match participant {
        Some(p) if p.id == claimed_id => Ok(()),
        _ => {
            tracing::warn!(
                user_id = %identity.user_id,
                claimed_id,
                "Authenticated user does not match acting participant"
            );
            Err((
                StatusCode::FORBIDDEN,
                "Authenticated user does not match acting participant".to_string(),
            ))
        }
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Ready once the store answers a query.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.ping() {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ready" })),
        ),
        Err(e) => {
            tracing::error!("Readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "unavailable" })),
            )
        }
    }
}

// ============================================================
// Registrations
// ============================================================

pub async fn register_individual(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(input): Json<RegisterIndividualInput>,
) -> ApiResult<(StatusCode, Json<Registration>)> {
    ensure_caller_is(&state, &caller, input.participant_id)?;

    state
        .registrations
        .register_individual(input.participant_id, input.hackathon_id)
        .map(|r| (StatusCode::CREATED, Json(r)))
        .map_err(registry_error)
}

pub async fn register_to_team(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(input): Json<RegisterToTeamInput>,
) -> ApiResult<(StatusCode, Json<Registration>)> {
    ensure_caller_is(&state, &caller, input.participant_id)?;

    state
        .registrations
        .register_to_team(input.participant_id, input.hackathon_id, input.team_id)
        .map(|r| (StatusCode::CREATED, Json(r)))
        .map_err(registry_error)
}

pub async fn approve_team_join(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(input): Json<ApproveTeamJoinInput>,
) -> ApiResult<Json<Registration>> {
    ensure_caller_is(&state, &caller, input.team_lead_id)?;

    state
        .registrations
        .approve_team_join(input.team_lead_id, input.participant_id, input.team_id)
        .map(Json)
        .map_err(registry_error)
}

pub async fn list_registrations(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Registration>>> {
    state
        .registrations
        .list_all()
        .map(Json)
        .map_err(registry_error)
}

pub async fn get_registration(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Registration>> {
    state
        .registrations
        .get_by_id(id)
        .map_err(registry_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Registration not found".to_string()))
}

pub async fn delete_registration(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    if state.registrations.delete(id).map_err(registry_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Registration not found".to_string()))
    }
}

pub async fn list_hackathon_registrations(
    State(state): State<AppState>,
    Path(hackathon_id): Path<u64>,
) -> ApiResult<Json<Vec<Registration>>> {
    state
        .registrations
        .list_by_hackathon(hackathon_id)
        .map(Json)
        .map_err(registry_error)
}

pub async fn get_participant_registration(
    State(state): State<AppState>,
    Path((hackathon_id, participant_id)): Path<(u64, u64)>,
) -> ApiResult<Json<Registration>> {
    state
        .registrations
        .get_by_participant(participant_id, hackathon_id)
        .map_err(registry_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Registration not found".to_string()))
}

// ============================================================
// Teams
// ============================================================

/// Query parameters for listing teams.
#[derive(Debug, Deserialize)]
pub struct ListTeamsQuery {
    pub hackathon_id: Option<u64>,
}

pub async fn create_team(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(input): Json<CreateTeamInput>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    ensure_caller_is(&state, &caller, input.lead_id)?;

    state
        .teams
        .create_team(input)
        .map(|t| (StatusCode::CREATED, Json(t)))
        .map_err(registry_error)
}

pub async fn list_teams(
    State(state): State<AppState>,
    Query(query): Query<ListTeamsQuery>,
) -> ApiResult<Json<Vec<Team>>> {
    state
        .teams
        .list_teams(query.hackathon_id)
        .map(Json)
        .map_err(registry_error)
}

pub async fn get_team(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Team>> {
    state
        .teams
        .get_team(id)
        .map_err(registry_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Team not found".to_string()))
}

pub async fn transfer_lead(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(team_id): Path<u64>,
    Json(input): Json<TransferLeadInput>,
) -> ApiResult<Json<Team>> {
    ensure_caller_is(&state, &caller, input.caller_id)?;

    state
        .teams
        .transfer_lead(input.caller_id, team_id, input.new_lead_id)
        .map(Json)
        .map_err(registry_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn duplicate_registration_is_a_bad_request() {
        let (status, body) = registry_error(RegistryError::DuplicateRegistration {
            participant_id: 7,
            hackathon_id: 100,
        });
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("already registered"));
    }

    #[test]
    fn authority_failures_are_forbidden() {
        let (status, _) = registry_error(RegistryError::NotAuthorized {
            actor_id: 7,
            team_id: 5,
        });
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn missing_pending_registration_is_not_found() {
        let (status, _) = registry_error(RegistryError::PendingRegistrationNotFound {
            participant_id: 7,
            hackathon_id: 100,
        });
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_failures_hide_details() {
        let (status, body) = registry_error(RegistryError::Store(StoreError::Sqlite(
            rusqlite::Error::InvalidQuery,
        )));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Internal server error");
    }
}
