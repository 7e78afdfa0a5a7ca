use crate::config::AppConfig;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub http: Client,
    /// Expiration timestamp attached to every issued access request.
    /// Computed once at startup: every grant derived from a request issued by
    /// this process shares the same validity cutoff. A long-running server
    /// will issue increasingly stale expirations.
    pub expiration_date: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let expiration_date = Utc::now() + Duration::seconds(config.expiration_offset_secs);
        Self {
            config: Arc::new(config),
            http: Self::create_http_client(),
            expiration_date,
        }
    }

    /// Shared outbound HTTP client. This is transport-level connection
    /// pooling only; authentication sessions are still built per request.
    fn create_http_client() -> Client {
        Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("Failed to create HTTP client")
    }

    /// The process-wide expiration as an RFC 3339 string, the form it takes
    /// on the wire and in rendered pages
    pub fn expiration_rfc3339(&self) -> String {
        self.expiration_date
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}
