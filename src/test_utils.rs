use crate::config::AppConfig;
use crate::create_app;
use crate::grants::AccessGrantClient;
use crate::session::Session;
use crate::state::AppState;
use axum::body::Body;
use axum::Router;
use base64::Engine as _;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use log::LevelFilter;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Test fixture wiring the router against mock servers for all three
/// external collaborators: the identity issuer, the access-grant service,
/// and the resource server.
pub struct TestFixture {
    /// The application router
    pub app: Router,
    /// Configuration pointing at the mock servers
    pub config: AppConfig,
    /// Application state behind the router
    pub state: AppState,
    /// Mock identity issuer
    pub issuer_mock: MockServer,
    /// Mock access-grant service
    pub access_mock: MockServer,
    /// Mock resource server
    pub resource_mock: MockServer,
}

impl TestFixture {
    /// WebID carried by the test access token
    pub const REQUESTOR_WEB_ID: &'static str = "https://requestor.example/profile#me";

    pub async fn new() -> Self {
        // Initialize test logger
        let _ = env_logger::builder()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .try_init();

        let issuer_mock = MockServer::start().await;
        let access_mock = MockServer::start().await;
        let resource_mock = MockServer::start().await;

        let config = AppConfig::for_test_with_mocks(&issuer_mock, &access_mock);
        let state = AppState::new(config.clone());
        let app = create_app(state.clone());

        Self {
            app,
            config,
            state,
            issuer_mock,
            access_mock,
            resource_mock,
        }
    }

    /// Mounts the issuer's OIDC discovery document
    pub async fn mock_discovery(&self) {
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "issuer": self.issuer_mock.uri(),
                "token_endpoint": format!("{}/token", self.issuer_mock.uri()),
            })))
            .mount(&self.issuer_mock)
            .await;
    }

    /// Mounts discovery plus a token endpoint that accepts any
    /// client-credentials login with a Bearer token
    pub async fn mock_login(&self) {
        self.mock_discovery().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": test_access_token(Self::REQUESTOR_WEB_ID),
                "token_type": "Bearer",
                "expires_in": 600,
            })))
            .mount(&self.issuer_mock)
            .await;
    }

    /// Access-grant client pointed at the mock service
    pub fn grant_client(&self) -> AccessGrantClient {
        AccessGrantClient::new(self.state.http.clone(), self.access_mock.uri())
    }

    pub async fn get(&self, uri: impl AsRef<str>) -> TestResponse {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri.as_ref())
            .body(Body::empty())
            .expect("Failed to build request");

        self.send(request).await
    }

    pub async fn post_form(&self, uri: impl AsRef<str>, body: &str) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri.as_ref())
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&body).to_string(),
        }
    }
}

/// An unsigned JWT carrying `web_id` as its `webid` claim, shaped like the
/// access tokens the issuer hands out
pub fn test_access_token(web_id: &str) -> String {
    let encode = |value: &serde_json::Value| {
        base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(serde_json::to_vec(value).expect("Failed to serialize JWT segment"))
    };
    let header = encode(&serde_json::json!({ "alg": "none", "typ": "JWT" }));
    let payload = encode(&serde_json::json!({
        "webid": web_id,
        "sub": web_id,
        "iss": "https://issuer.example",
    }));
    format!("{header}.{payload}.sig")
}

/// A ready-made bearer session for tests that exercise collaborator clients
/// directly, without going through a login
pub fn test_session() -> Session {
    Session {
        web_id: TestFixture::REQUESTOR_WEB_ID.to_string(),
        access_token: test_access_token(TestFixture::REQUESTOR_WEB_ID),
        token_type: "Bearer".to_string(),
    }
}

/// Response from a test request
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body as text
    pub body: String,
}

impl TestResponse {
    /// Asserts that the response has the expected status code
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "Expected status {} but got {} with body: {}",
            expected, self.status, self.body
        );
        self
    }

    /// Asserts that the response status is OK (200)
    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    /// A response header as text, if present
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    }
}
