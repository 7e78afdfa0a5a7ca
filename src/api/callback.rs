use crate::api::escape_html;
use crate::errors::ApiError;
use crate::fetcher::{fetch_resource, FetchOutcome};
use crate::grants::{AccessGrantClient, GRANT_VC_URL_PARAM, LEGACY_GRANT_VC_URL_PARAM};
use crate::session::SessionProvider;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::response::Html;
use log::{error, info};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(rename = "accessGrantUrl")]
    access_grant_url: Option<String>,
    #[serde(rename = "signedVcUrl")]
    signed_vc_url: Option<String>,
}

impl CallbackQuery {
    /// The grant reference, under either the current or the legacy
    /// parameter name
    fn grant_reference(&self) -> Option<&str> {
        self.access_grant_url
            .as_deref()
            .or(self.signed_vc_url.as_deref())
    }
}

/// GET /redirect - the consent UI sends the resource owner back here with a
/// reference to the signed grant. Resolve it, attempt the grant-backed
/// fetch, and render the result. A refused fetch is an expected outcome and
/// still renders the page; resolution failures do not.
pub async fn redirect(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Html<String>, ApiError> {
    let Some(grant_url) = query.grant_reference() else {
        return Err(ApiError::bad_request(format!(
            "missing {GRANT_VC_URL_PARAM} (or legacy {LEGACY_GRANT_VC_URL_PARAM}) query parameter"
        )));
    };

    // Bearer token type is mandatory for the grant-backed fetch to be valid
    let session = SessionProvider::new(&state)
        .login_bearer()
        .await
        .map_err(|e| {
            error!("requestor login failed: {}", e);
            ApiError::bad_gateway(format!("requestor login failed: {e}"))
        })?;

    let grants = AccessGrantClient::new(state.http.clone(), state.config.access_service_url.clone());
    let grant = grants
        .get_access_grant(&session, grant_url)
        .await
        .map_err(|e| {
            error!("failed to resolve access grant {}: {}", grant_url, e);
            ApiError::bad_gateway(format!("failed to resolve access grant: {e}"))
        })?;

    let Some(target_resource) = grant.target_resource() else {
        error!("access grant {} names no resource", grant_url);
        return Err(ApiError::bad_gateway("access grant names no resource"));
    };
    let target_resource = target_resource.to_string();

    let content = match fetch_resource(&state.http, &session, &target_resource).await {
        FetchOutcome::Fetched(text) => Some(text),
        FetchOutcome::Denied => {
            info!("access to {} was denied", target_resource);
            None
        }
        FetchOutcome::Fault(e) => {
            error!("failed to fetch {}: {}", target_resource, e);
            None
        }
    };

    let grant_json = serde_json::to_string_pretty(&grant)
        .map_err(|e| ApiError::internal(format!("failed to serialize grant: {e}")))?;

    Ok(Html(render_result(
        &grant_json,
        content.as_deref(),
        &target_resource,
    )))
}

fn render_result(grant_json: &str, content: Option<&str>, resource_url: &str) -> String {
    let content_html = match content {
        Some(text) => format!("<pre>{}</pre>", escape_html(text)),
        None => "<p><em>No content was fetched (access denied or unavailable).</em></p>"
            .to_string(),
    };

    format!(
        r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Access grant result</title>
  <style>
    body {{ font-family: system-ui, sans-serif; max-width: 720px; margin: 8vh auto; padding: 24px; }}
    pre {{ background: #f8f9fa; padding: 12px; border-radius: 4px; overflow-x: auto; }}
  </style>
</head>
<body>
  <h1>Access grant result</h1>
  <h2>Resource</h2>
  <p><a href="{resource}">{resource}</a></p>
  <h2>Content</h2>
  {content_html}
  <h2>Access grant</h2>
  <pre>{grant_json}</pre>
</body>
</html>"#,
        resource = escape_html(resource_url),
        content_html = content_html,
        grant_json = escape_html(grant_json),
    )
}
