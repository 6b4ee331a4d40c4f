use crate::handlers::oauth::exchange::exchange_code;
use crate::handlers::page::{escape_html, render_page, script_json};
use crate::models::AppState;
use crate::models::oauth::MESSAGE_SOURCE;
use crate::relay::params::parse_query;
use axum::{
    extract::{RawQuery, State},
    response::{Html, IntoResponse},
};
use serde::Serialize;
use tower_sessions::Session;
use tracing::{error, warn};

/// Opener side of the handshake: opens the popup, waits for its message and
/// posts the code to `/oauth/exchange`.
const OPENER_SCRIPT: &str = r#"
(function () {
    var cfg = JSON.parse(document.getElementById('opener-config').textContent);
    var result = document.getElementById('result');

    window.addEventListener('message', function (event) {
        if (!event.data || event.data.source !== cfg.source) {
            return;
        }
        if (cfg.popup_origin && event.origin !== cfg.popup_origin) {
            return;
        }
        if (!event.data.success) {
            result.textContent = 'Sign-in failed: ' + event.data.error +
                (event.data.error_description ? ' (' + event.data.error_description + ')' : '');
            return;
        }
        result.textContent = 'Finishing sign-in…';
        fetch('/oauth/exchange', {
            method: 'POST',
            credentials: 'same-origin',
            headers: { 'Content-Type': 'application/json' },
            body: JSON.stringify({ code: event.data.code, state: event.data.state })
        }).then(function (response) {
            return response.json().then(function (body) {
                result.textContent = response.ok ? 'Signed in.' : 'Sign-in failed: ' + body.message;
            });
        }).catch(function (e) {
            result.textContent = 'Sign-in failed: ' + e;
        });
    });

    document.getElementById('sign-in').addEventListener('click', function () {
        window.open('/oauth/authorize', 'oauth_popup', 'width=600,height=720');
    });
})();
"#;

#[derive(Debug, Serialize)]
struct OpenerConfig<'a> {
    source: &'a str,
    popup_origin: Option<String>,
}

/// Landing page of the web app. Doubles as the target of the web-redirect
/// fallback, which arrives with `oauth_code`/`oauth_state` or `oauth_error`.
pub async fn landing_handler(
    State(app_state): State<AppState>,
    session: Session,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let params = parse_query(query.as_deref().unwrap_or_default());
    let param = |key: &str| params.get(key).map(String::as_str).filter(|v| !v.is_empty());

    if let Some(error) = param("oauth_error") {
        warn!(error, "web redirect carried a provider error");
        let detail = match param("oauth_error_description") {
            Some(description) => format!("{}: {}", error, description),
            None => error.to_string(),
        };
        return result_page("Sign-in failed", &detail);
    }

    if let (Some(code), Some(state)) = (param("oauth_code"), param("oauth_state")) {
        return match exchange_code(&app_state, &session, code, state).await {
            Ok(_) => result_page("Signed in", "You can continue in the application."),
            Err(e) => {
                error!("Code exchange after web redirect failed: {}", e);
                result_page("Sign-in failed", &e.to_string())
            }
        };
    }

    sign_in_page(&app_state)
}

fn result_page(title: &str, detail: &str) -> Html<String> {
    let body = format!(
        r#"<div class="container">
        <h1>{}</h1>
        <p class="detail">{}</p>
        <p><a href="/">Back</a></p>
    </div>"#,
        escape_html(title),
        escape_html(detail),
    );
    render_page(title, &body, None)
}

fn sign_in_page(app_state: &AppState) -> Html<String> {
    let opener_config = OpenerConfig {
        source: MESSAGE_SOURCE,
        popup_origin: Some(
            app_state
                .config
                .redirect_url
                .origin()
                .ascii_serialization(),
        )
        .filter(|origin| origin != "null"),
    };

    let config_json = match script_json(&opener_config) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize opener config: {:?}", e);
            return result_page("Error", "The sign-in page could not be prepared.");
        }
    };

    let body = format!(
        r#"<div class="container">
        <h1>Connect your marketplace account</h1>
        <p><button id="sign-in" type="button">Sign in</button></p>
        <p id="result" class="detail"></p>
    </div>
    <script id="opener-config" type="application/json">{}</script>"#,
        config_json
    );

    render_page("Sign in", &body, Some(OPENER_SCRIPT))
}
