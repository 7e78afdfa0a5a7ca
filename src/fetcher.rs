//! Grant-backed resource fetch. Denial is an expected business outcome of
//! the consent flow and is reported as its own variant, distinct from
//! transport or server faults.

use crate::session::Session;
use log::debug;
use reqwest::Client;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchFault {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("resource server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Outcome of a grant-backed fetch
#[derive(Debug)]
pub enum FetchOutcome {
    /// The resource was readable under the grant
    Fetched(String),
    /// The resource server refused access (401/403) - the expected result
    /// when consent was denied or the grant does not cover the resource
    Denied,
    /// Anything else: transport errors, server errors, unreadable bodies
    Fault(FetchFault),
}

/// Fetch the target resource with the session's bearer token
pub async fn fetch_resource(http: &Client, session: &Session, resource: &str) -> FetchOutcome {
    debug!("fetching {}", resource);

    let response = match http
        .get(resource)
        .header("authorization", session.authorization())
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => return FetchOutcome::Fault(FetchFault::Http(e)),
    };

    let status = response.status();
    if status == http::StatusCode::UNAUTHORIZED || status == http::StatusCode::FORBIDDEN {
        return FetchOutcome::Denied;
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return FetchOutcome::Fault(FetchFault::Status {
            status: status.as_u16(),
            body,
        });
    }

    match response.text().await {
        Ok(content) => FetchOutcome::Fetched(content),
        Err(e) => FetchOutcome::Fault(FetchFault::Http(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_session, TestFixture};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_success() {
        let fixture = TestFixture::new().await;
        let session = test_session();

        Mock::given(method("GET"))
            .and(path("/private/notes.txt"))
            .and(header("authorization", session.authorization().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string("secret notes"))
            .mount(&fixture.resource_mock)
            .await;

        let resource = format!("{}/private/notes.txt", fixture.resource_mock.uri());
        let outcome = fetch_resource(&fixture.state.http, &session, &resource).await;
        match outcome {
            FetchOutcome::Fetched(content) => assert_eq!(content, "secret notes"),
            other => panic!("expected Fetched, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_denied_on_forbidden() {
        let fixture = TestFixture::new().await;
        let session = test_session();

        Mock::given(method("GET"))
            .and(path("/private/notes.txt"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&fixture.resource_mock)
            .await;

        let resource = format!("{}/private/notes.txt", fixture.resource_mock.uri());
        let outcome = fetch_resource(&fixture.state.http, &session, &resource).await;
        assert!(matches!(outcome, FetchOutcome::Denied));
    }

    #[tokio::test]
    async fn test_fetch_denied_on_unauthorized() {
        let fixture = TestFixture::new().await;
        let session = test_session();

        Mock::given(method("GET"))
            .and(path("/private/notes.txt"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&fixture.resource_mock)
            .await;

        let resource = format!("{}/private/notes.txt", fixture.resource_mock.uri());
        let outcome = fetch_resource(&fixture.state.http, &session, &resource).await;
        assert!(matches!(outcome, FetchOutcome::Denied));
    }

    #[tokio::test]
    async fn test_fetch_fault_on_server_error() {
        let fixture = TestFixture::new().await;
        let session = test_session();

        Mock::given(method("GET"))
            .and(path("/private/notes.txt"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&fixture.resource_mock)
            .await;

        let resource = format!("{}/private/notes.txt", fixture.resource_mock.uri());
        let outcome = fetch_resource(&fixture.state.http, &session, &resource).await;
        assert!(matches!(
            outcome,
            FetchOutcome::Fault(FetchFault::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_fault_on_unreachable_server() {
        let fixture = TestFixture::new().await;
        let session = test_session();

        // Nothing listens on this port
        let outcome =
            fetch_resource(&fixture.state.http, &session, "http://127.0.0.1:1/notes.txt").await;
        assert!(matches!(outcome, FetchOutcome::Fault(FetchFault::Http(_))));
    }
}
