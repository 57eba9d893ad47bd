mod handlers;
mod json;
mod middleware;

pub use middleware::{Caller, IdentityVerifier, RemoteVerifier, SecurityConfig, VerifiedIdentity};

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::db::Database;
use crate::registration::RegistrationEngine;
use crate::team::TeamAuthority;

/// Shared handler state. Every component holds a clone of the same store handle.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub registrations: RegistrationEngine,
    pub teams: TeamAuthority,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            registrations: RegistrationEngine::new(db.clone()),
            teams: TeamAuthority::new(db.clone()),
            db,
        }
    }
}

pub fn create_router(db: Database) -> Router {
    create_router_with_config(db, SecurityConfig::disabled())
}

pub fn create_router_with_config(db: Database, config: SecurityConfig) -> Router {
    let protected = Router::new()
        // Registrations
        .route("/registrations", get(handlers::list_registrations))
        .route("/registrations/individual", post(handlers::register_individual))
        .route("/registrations/team", post(handlers::register_to_team))
        .route("/registrations/approve", post(handlers::approve_team_join))
        .route("/registrations/{id}", get(handlers::get_registration))
        .route("/registrations/{id}", delete(handlers::delete_registration))
        // Registrations scoped to a hackathon
        .route(
            "/hackathons/{id}/registrations",
            get(handlers::list_hackathon_registrations),
        )
        .route(
            "/hackathons/{id}/participants/{participant_id}/registration",
            get(handlers::get_participant_registration),
        )
        // Teams
        .route("/teams", post(handlers::create_team))
        .route("/teams", get(handlers::list_teams))
        .route("/teams/{id}", get(handlers::get_team))
        .route("/teams/{id}/lead", patch(handlers::transfer_lead))
        .route_layer(from_fn_with_state(
            config.clone(),
            middleware::auth_middleware,
        ));

    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .merge(protected);

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config)),
        )
        .with_state(AppState::new(db))
}

fn cors_layer(config: &SecurityConfig) -> CorsLayer {
    match &config.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    }
}
