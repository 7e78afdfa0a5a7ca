use crate::errors::ApiError;
use crate::grants::{AccessGrantClient, AccessModes, AccessRequestBody};
use crate::session::SessionProvider;
use crate::state::AppState;
use axum::extract::{Form, State};
use axum::response::Redirect;
use log::{error, info};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RequestForm {
    pub owner: String,
    pub resource: String,
}

/// POST /request - authenticate the requestor, issue a read-only access
/// request for the submitted resource, and redirect to the consent UI.
pub async fn submit(
    State(state): State<AppState>,
    Form(form): Form<RequestForm>,
) -> Result<Redirect, ApiError> {
    let session = SessionProvider::new(&state).login().await.map_err(|e| {
        error!("requestor login failed: {}", e);
        ApiError::bad_gateway(format!("requestor login failed: {e}"))
    })?;

    let body = AccessRequestBody {
        access: AccessModes::read_only(),
        purpose: state.config.purpose_uris(),
        requestor: session.web_id.clone(),
        resource_owner: form.owner,
        resources: vec![form.resource],
        expiration_date: state.expiration_rfc3339(),
    };

    let grants = AccessGrantClient::new(state.http.clone(), state.config.access_service_url.clone());
    let issued = grants
        .issue_access_request(&session, &body)
        .await
        .map_err(|e| {
            error!("access request issuance failed: {}", e);
            ApiError::bad_gateway(format!("access request issuance failed: {e}"))
        })?;

    let callback_url = state.config.callback_url().map_err(|e| {
        error!("invalid app_url in configuration: {}", e);
        ApiError::internal(format!("invalid app_url in configuration: {e}"))
    })?;

    let target = grants
        .manage_access_redirect(&issued, &callback_url, &state.config.fallback_consent_ui)
        .await
        .map_err(|e| {
            error!("failed to build consent UI redirect: {}", e);
            ApiError::bad_gateway(format!("failed to build consent UI redirect: {e}"))
        })?;

    info!("redirecting to {}", target);
    Ok(Redirect::to(target.as_str()))
}
