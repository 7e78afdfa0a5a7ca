//! Client for the external access-grant service: issues access requests,
//! derives the consent-management UI location, and resolves grant references
//! into verified grant documents. All credential semantics (signing,
//! verification, revocation) belong to the service itself.

use crate::session::Session;
use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Query parameter carrying the issued request's URL on the consent UI link
pub const REQUEST_VC_URL_PARAM: &str = "requestVcUrl";
/// Query parameter carrying this server's callback URL on the consent UI link
pub const REDIRECT_URL_PARAM: &str = "redirectUrl";
/// Query parameter the consent UI uses to pass the grant reference back
pub const GRANT_VC_URL_PARAM: &str = "accessGrantUrl";
/// Legacy spelling of the grant-reference parameter, still emitted by older
/// consent UIs
pub const LEGACY_GRANT_VC_URL_PARAM: &str = "signedVcUrl";

/// Errors that can occur during access-grant service operations
#[derive(Debug, Error)]
pub enum GrantError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("access-grant service error: {0}")]
    Api(String),
    #[error("malformed grant document: {0}")]
    Malformed(String),
    #[error("grant expired at {0}")]
    Expired(String),
}

/// Requested access modes. Only read access is ever requested by this demo,
/// but the wire shape carries all three flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessModes {
    pub read: bool,
    pub write: bool,
    pub append: bool,
}

impl AccessModes {
    pub fn read_only() -> Self {
        Self {
            read: true,
            write: false,
            append: false,
        }
    }
}

/// Body of an access request submitted to the service's issue endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequestBody {
    pub access: AccessModes,
    pub purpose: Vec<String>,
    pub requestor: String,
    pub resource_owner: String,
    pub resources: Vec<String>,
    pub expiration_date: String,
}

/// The issued access request as returned by the service. `id` is the URL the
/// consent UI loads to display the request.
#[derive(Debug, Clone, Deserialize)]
pub struct IssuedAccessRequest {
    pub id: String,
}

/// A resolved, verified access grant. The consented resource list lives in
/// the credential subject; everything else is kept as-is so the full
/// document can be re-serialized for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub credential_subject: CredentialSubject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSubject {
    #[serde(default)]
    pub id: String,
    pub provided_consent: ProvidedConsent,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvidedConsent {
    #[serde(default)]
    pub for_personal_data: Vec<String>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

impl AccessGrant {
    /// First resource the grant consents to. Only the first element is
    /// consumed by this demo; a multi-resource grant would need a richer UI.
    pub fn target_resource(&self) -> Option<&str> {
        self.credential_subject
            .provided_consent
            .for_personal_data
            .first()
            .map(|s| s.as_str())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VcConfiguration {
    #[serde(default)]
    access_management_ui: Option<String>,
}

/// Access-grant service client
#[derive(Clone)]
pub struct AccessGrantClient {
    http: Client,
    base_url: String,
}

impl AccessGrantClient {
    pub fn new(http: Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    /// Issue an access request on behalf of the authenticated requestor
    pub async fn issue_access_request(
        &self,
        session: &Session,
        body: &AccessRequestBody,
    ) -> Result<IssuedAccessRequest, GrantError> {
        let url = format!("{}/issue", self.base_url.trim_end_matches('/'));
        debug!(
            "issuing access request for {} on behalf of {}",
            body.resources.join(", "),
            body.requestor
        );

        let response = self
            .http
            .post(&url)
            .header("authorization", session.authorization())
            .json(body)
            .send()
            .await
            .map_err(GrantError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("access request issuance failed: HTTP {}: {}", status, error_text);
            return Err(GrantError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let issued: IssuedAccessRequest = response
            .json()
            .await
            .map_err(|e| GrantError::Malformed(format!("JSON parse error: {e}")))?;

        debug!("issued access request {}", issued.id);
        Ok(issued)
    }

    /// Build the consent-UI URL for an issued request. Uses the UI the
    /// service advertises in its well-known configuration when present,
    /// otherwise the configured fallback.
    pub async fn manage_access_redirect(
        &self,
        request: &IssuedAccessRequest,
        callback_url: &Url,
        fallback_ui: &str,
    ) -> Result<Url, GrantError> {
        let ui = match self.advertised_consent_ui().await {
            Some(ui) => ui,
            None => {
                debug!("no advertised consent UI, falling back to {}", fallback_ui);
                fallback_ui.to_string()
            }
        };

        let mut url = Url::parse(&ui)
            .map_err(|e| GrantError::Malformed(format!("invalid consent UI URL '{ui}': {e}")))?;
        url.query_pairs_mut()
            .append_pair(REQUEST_VC_URL_PARAM, &request.id)
            .append_pair(REDIRECT_URL_PARAM, callback_url.as_str());

        Ok(url)
    }

    /// Resolve a grant reference into a verified grant document. The service
    /// performs signature verification; the expiration is checked here as
    /// well so a stale reference never reaches the fetch step.
    pub async fn get_access_grant(
        &self,
        session: &Session,
        grant_url: &str,
    ) -> Result<AccessGrant, GrantError> {
        debug!("resolving access grant {}", grant_url);

        let response = self
            .http
            .get(grant_url)
            .header("authorization", session.authorization())
            .send()
            .await
            .map_err(GrantError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("grant resolution failed: HTTP {}: {}", status, error_text);
            return Err(GrantError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let grant: AccessGrant = response
            .json()
            .await
            .map_err(|e| GrantError::Malformed(format!("JSON parse error: {e}")))?;

        if let Some(expiration) = &grant.expiration_date {
            let expires = DateTime::parse_from_rfc3339(expiration)
                .map_err(|e| GrantError::Malformed(format!("invalid expirationDate: {e}")))?;
            if expires < Utc::now() {
                return Err(GrantError::Expired(expiration.clone()));
            }
        }

        Ok(grant)
    }

    async fn advertised_consent_ui(&self) -> Option<String> {
        let url = format!(
            "{}/.well-known/vc-configuration",
            self.base_url.trim_end_matches('/')
        );

        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("consent UI discovery failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("consent UI discovery returned HTTP {}", response.status());
            return None;
        }

        match response.json::<VcConfiguration>().await {
            Ok(configuration) => configuration.access_management_ui,
            Err(e) => {
                warn!("invalid vc-configuration document: {}", e);
                None
            }
        }
    }
}
