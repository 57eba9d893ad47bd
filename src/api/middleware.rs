//! Security middleware: bearer-token identity verification and CORS settings.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};

/// The user behind a verified bearer token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    /// User id issued by the identity provider. Matches `Participant::external_id`.
    pub user_id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Request extension set by [`auth_middleware`] on every protected route.
///
/// `None` means identity verification is disabled and handlers trust the ids
/// in the request body.
#[derive(Clone, Debug)]
pub struct Caller(pub Option<VerifiedIdentity>);

/// Turns bearer tokens into verified identities.
#[derive(Clone, Debug)]
pub enum IdentityVerifier {
    /// Ask an external verification service.
    Remote(RemoteVerifier),
    /// Fixed token table, for local development.
    Static(Arc<HashMap<String, VerifiedIdentity>>),
}

impl IdentityVerifier {
    /// Resolve a token. `Ok(None)` means the token was rejected.
    pub async fn verify(&self, token: &str) -> anyhow::Result<Option<VerifiedIdentity>> {
        match self {
            Self::Remote(remote) => remote.verify(token).await,
            Self::Static(tokens) => Ok(tokens.get(token).cloned()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RemoteVerifier {
    client: reqwest::Client,
    verify_url: String,
}

#[derive(Deserialize)]
struct VerifyResponse {
    valid: bool,
    #[serde(default)]
    user_id: String,
    email: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
}

impl RemoteVerifier {
    pub fn new(verify_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            verify_url: verify_url.into(),
        }
    }

    async fn verify(&self, token: &str) -> anyhow::Result<Option<VerifiedIdentity>> {
        let response = self
            .client
            .post(&self.verify_url)
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            tracing::debug!("Identity service rejected token: {}", response.status());
            return Ok(None);
        }

        let body: VerifyResponse = response.json().await?;
        if !body.valid || body.user_id.is_empty() {
            return Ok(None);
        }

        Ok(Some(VerifiedIdentity {
            user_id: body.user_id,
            email: body.email,
            roles: body.roles,
        }))
    }
}

/// Security configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct SecurityConfig {
    /// Identity verifier (from HACKREG_IDENTITY_URL or HACKREG_DEV_TOKENS)
    pub identity: Option<IdentityVerifier>,
    /// Allowed CORS origins (from HACKREG_CORS_ORIGINS, comma-separated)
    pub cors_origins: Option<Vec<String>>,
}

impl SecurityConfig {
    /// Load security configuration from environment variables.
    ///
    /// A remote verifier wins over dev tokens when both are set.
    pub fn from_env() -> Self {
        let identity = match std::env::var("HACKREG_IDENTITY_URL") {
            Ok(url) => Some(IdentityVerifier::Remote(RemoteVerifier::new(url))),
            Err(_) => std::env::var("HACKREG_DEV_TOKENS")
                .ok()
                .map(|s| IdentityVerifier::Static(Arc::new(parse_dev_tokens(&s)))),
        };

        let cors_origins = std::env::var("HACKREG_CORS_ORIGINS")
            .ok()
            .map(|s| s.split(',').map(|s| s.trim().to_string()).collect());

        Self {
            identity,
            cors_origins,
        }
    }

    /// Create a config with no authentication (for local development/testing).
    pub fn disabled() -> Self {
        Self {
            identity: None,
            cors_origins: None,
        }
    }

    /// Create a config that accepts a fixed set of `(token, user_id)` pairs.
    pub fn with_static_tokens<I, T, U>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (T, U)>,
        T: Into<String>,
        U: Into<String>,
    {
        let table = tokens
            .into_iter()
            .map(|(token, user_id)| (token.into(), identity_for(user_id.into())))
            .collect();
        Self {
            identity: Some(IdentityVerifier::Static(Arc::new(table))),
            cors_origins: None,
        }
    }

    /// Create a config with specific CORS origins.
    pub fn with_cors_origins(origins: Vec<String>) -> Self {
        Self {
            identity: None,
            cors_origins: Some(origins),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn identity_for(user_id: String) -> VerifiedIdentity {
    VerifiedIdentity {
        user_id,
        email: None,
        roles: Vec::new(),
    }
}

/// Parse `token=user_id` pairs separated by commas. Malformed entries are skipped.
fn parse_dev_tokens(raw: &str) -> HashMap<String, VerifiedIdentity> {
    raw.split(',')
        .filter_map(|pair| {
            let (token, user_id) = pair.split_once('=')?;
            let (token, user_id) = (token.trim(), user_id.trim());
            if token.is_empty() || user_id.is_empty() {
                return None;
            }
            Some((token.to_string(), identity_for(user_id.to_string())))
        })
        .collect()
}

/// Authentication middleware that verifies the bearer token.
pub async fn auth_middleware(
    State(config): State<SecurityConfig>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(verifier) = &config.identity else {
        request.extensions_mut().insert(Caller(None));
        return Ok(next.run(request).await);
    };

    let token = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(header) => match header.strip_prefix("Bearer ") {
            Some(token) => token.to_string(),
            None => {
                tracing::warn!("Invalid Authorization header format");
                return Err(StatusCode::UNAUTHORIZED);
            }
        },
        None => {
            tracing::warn!("Missing Authorization header");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    match verifier.verify(&token).await {
        Ok(Some(identity)) => {
            request.extensions_mut().insert(Caller(Some(identity)));
            Ok(next.run(request).await)
        }
        Ok(None) => {
            tracing::warn!("Invalid bearer token provided");
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(e) => {
            tracing::error!("Identity verification failed: {}", e);
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
