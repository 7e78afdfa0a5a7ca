use crate::api::REDIRECT_PATH;
use config::{Config as ConfigCrate, ConfigError};
use serde::Deserialize;
use url::Url;

fn default_app_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_expiration_offset_secs() -> i64 {
    1800
}

fn default_purposes() -> String {
    "https://w3c.github.io/dpv/dpv/#UserInterfacePersonalisation,\
     https://w3c.github.io/dpv/dpv/#OptimiseUserInterface"
        .to_string()
}

fn default_fallback_consent_ui() -> String {
    "https://podbrowser.inrupt.com/privacy/access/requests/".to_string()
}

/// Main configuration structure for the requestor demo server
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Public base URL of this server, used to compute the consent callback URL
    #[serde(default = "default_app_url")]
    pub app_url: String,

    /// Client identifier the requestor authenticates with
    #[serde(default)]
    pub client_id: String,

    /// Client secret the requestor authenticates with
    #[serde(default)]
    pub client_secret: String,

    /// Base URL of the identity issuer
    #[serde(default)]
    pub oidc_issuer: String,

    /// Base URL of the access-grant service
    #[serde(default)]
    pub access_service_url: String,

    /// The port the server will listen on (default: 3001)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Validity window for issued access requests, in seconds (default: 1800)
    #[serde(default = "default_expiration_offset_secs")]
    pub expiration_offset_secs: i64,

    /// Comma-separated purpose URIs attached to every access request
    #[serde(default = "default_purposes")]
    pub purposes: String,

    /// Consent-management UI used when the access-grant service does not
    /// advertise one of its own
    #[serde(default = "default_fallback_consent_ui")]
    pub fallback_consent_ui: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_url: default_app_url(),
            client_id: "".to_string(),
            client_secret: "".to_string(),
            oidc_issuer: "".to_string(),
            access_service_url: "".to_string(),
            port: default_port(),
            expiration_offset_secs: default_expiration_offset_secs(),
            purposes: default_purposes(),
            fallback_consent_ui: default_fallback_consent_ui(),
        }
    }
}

impl AppConfig {
    /// Creates a new config instance from `REQUESTOR_`-prefixed environment variables
    pub fn new() -> Result<Self, String> {
        ConfigCrate::builder()
            .add_source(config::Environment::with_prefix("REQUESTOR").prefix_separator("_"))
            .build()
            .map_err(|e: ConfigError| e.to_string())?
            .try_deserialize()
            .map_err(|e| e.to_string())
    }

    /// Purpose URIs as a vector
    pub fn purpose_uris(&self) -> Vec<String> {
        self.purposes
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Full callback URL advertised to the consent UI (`app_url` + the redirect path)
    pub fn callback_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.app_url)?.join(REDIRECT_PATH)
    }

    #[cfg(test)]
    pub fn for_test_with_mocks(
        issuer_mock: &wiremock::MockServer,
        access_mock: &wiremock::MockServer,
    ) -> Self {
        Self {
            app_url: "http://demo.example".to_string(),
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
            oidc_issuer: issuer_mock.uri(),
            access_service_url: access_mock.uri(),
            port: 0, // Let the OS choose a port
            expiration_offset_secs: 1800,
            purposes: "https://purpose.example/one,https://purpose.example/two".to_string(),
            fallback_consent_ui: "https://consent.example/requests/".to_string(),
        }
    }
}
