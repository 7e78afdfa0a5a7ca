//! Client-credentials login against the identity issuer.
//!
//! Every request to the flow controller builds its own session; there is no
//! pooling or reuse across requests. The issuer's token endpoint is located
//! through OIDC discovery on each login.

use crate::state::AppState;
use base64::Engine as _;
use log::{debug, error, warn};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while establishing a requestor session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("issuer discovery failed: {0}")]
    Discovery(String),
    #[error("login rejected by issuer: HTTP {status}: {body}")]
    LoginRejected { status: u16, body: String },
    #[error("malformed token response: {0}")]
    MalformedToken(String),
    #[error("issuer returned a {actual} token where a Bearer token is required")]
    NotBearer { actual: String },
}

/// An authenticated requestor session. Valid for the duration of one
/// request-handling flow.
#[derive(Debug, Clone)]
pub struct Session {
    /// WebID of the authenticated requestor
    pub web_id: String,
    /// Raw access token presented to downstream services
    pub access_token: String,
    /// Token type as reported by the issuer (normally "Bearer")
    pub token_type: String,
}

impl Session {
    /// Authorization header value for requests made on behalf of this session
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

#[derive(Debug, Deserialize)]
struct OidcConfiguration {
    token_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: String,
}

/// Performs client-credentials logins against the configured identity issuer
pub struct SessionProvider {
    http: Client,
    issuer: String,
    client_id: String,
    client_secret: String,
}

impl SessionProvider {
    pub fn new(state: &AppState) -> Self {
        Self {
            http: state.http.clone(),
            issuer: state.config.oidc_issuer.clone(),
            client_id: state.config.client_id.clone(),
            client_secret: state.config.client_secret.clone(),
        }
    }

    /// Authenticate the requestor with its client credentials
    pub async fn login(&self) -> Result<Session, SessionError> {
        let token_endpoint = self.discover_token_endpoint().await?;
        debug!("logging in at {}", token_endpoint);

        let response = self
            .http
            .post(&token_endpoint)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", "webid"),
            ])
            .send()
            .await
            .map_err(SessionError::Http)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!("issuer rejected login for '{}': HTTP {}", self.client_id, status);
            return Err(SessionError::LoginRejected { status, body });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SessionError::MalformedToken(format!("JSON parse error: {e}")))?;

        let web_id = web_id_from_access_token(&token.access_token)?;
        debug!("authenticated requestor {}", web_id);

        Ok(Session {
            web_id,
            access_token: token.access_token,
            token_type: token.token_type,
        })
    }

    /// Authenticate and require a Bearer token. The grant-backed resource
    /// fetch is only valid with a Bearer token, so the callback flow must
    /// refuse any other token type.
    pub async fn login_bearer(&self) -> Result<Session, SessionError> {
        let session = self.login().await?;
        if !session.token_type.eq_ignore_ascii_case("bearer") {
            warn!(
                "issuer returned token type '{}' instead of Bearer",
                session.token_type
            );
            return Err(SessionError::NotBearer {
                actual: session.token_type,
            });
        }
        Ok(session)
    }

    async fn discover_token_endpoint(&self) -> Result<String, SessionError> {
        let url = format!(
            "{}/.well-known/openid-configuration",
            self.issuer.trim_end_matches('/')
        );

        let response = self.http.get(&url).send().await.map_err(SessionError::Http)?;

        if !response.status().is_success() {
            return Err(SessionError::Discovery(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let configuration: OidcConfiguration = response
            .json()
            .await
            .map_err(|e| SessionError::Discovery(format!("invalid discovery document: {e}")))?;

        Ok(configuration.token_endpoint)
    }
}

/// Pull the requestor's WebID out of the access token. The token is a JWT
/// whose payload carries a `webid` claim; `sub` is used when absent.
fn web_id_from_access_token(access_token: &str) -> Result<String, SessionError> {
    let payload_segment = access_token
        .split('.')
        .nth(1)
        .ok_or_else(|| SessionError::MalformedToken("access token is not a JWT".to_string()))?;

    let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload_segment)
        .map_err(|e| SessionError::MalformedToken(format!("invalid JWT payload encoding: {e}")))?;

    let claims: serde_json::Value = serde_json::from_slice(&payload)
        .map_err(|e| SessionError::MalformedToken(format!("invalid JWT payload JSON: {e}")))?;

    claims
        .get("webid")
        .or_else(|| claims.get("sub"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            SessionError::MalformedToken("access token carries no webid or sub claim".to_string())
        })
}
