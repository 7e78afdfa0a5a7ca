use crate::api::escape_html;
use crate::state::AppState;
use axum::extract::State;
use axum::response::Html;

/// GET / - the access-request form, pre-filled with the process-wide
/// expiration timestamp. No side effects.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let expiration = escape_html(&state.expiration_rfc3339());

    Html(format!(
        r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Request access to a resource</title>
  <style>
    body {{ font-family: system-ui, sans-serif; max-width: 560px; margin: 8vh auto; padding: 24px; }}
    .form-group {{ margin-bottom: 15px; }}
    label {{ display: block; margin-bottom: 5px; }}
    input {{ width: 100%; padding: 8px; border: 1px solid #ddd; border-radius: 4px; }}
    button {{ background: #111; color: #fff; padding: 10px 20px; border: none; border-radius: 4px; cursor: pointer; }}
  </style>
</head>
<body>
  <h1>Request access to a resource</h1>
  <form method="post" action="/request">
    <div class="form-group">
      <label for="owner">Resource owner (WebID):</label>
      <input type="text" id="owner" name="owner" required />
    </div>
    <div class="form-group">
      <label for="resource">Resource URL:</label>
      <input type="text" id="resource" name="resource" required />
    </div>
    <div class="form-group">
      <label for="expiration">Request valid until:</label>
      <input type="text" id="expiration" name="expiration" value="{expiration}" readonly />
    </div>
    <button type="submit">Request access</button>
  </form>
</body>
</html>"#
    ))
}
