pub(crate) mod callback;
pub(crate) mod home;
pub(crate) mod request;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

/// Path the consent UI redirects back to. Must stay in sync with the
/// callback URL advertised at issuance time (`AppConfig::callback_url`).
pub const REDIRECT_PATH: &str = "/redirect";

/// Combines all routes into a single router
pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .route("/request", post(request::submit))
        .route(REDIRECT_PATH, get(callback::redirect))
}

/// Minimal HTML escaping for values interpolated into rendered pages
pub(crate) fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
