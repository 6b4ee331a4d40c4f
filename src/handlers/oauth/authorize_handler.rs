use crate::error::AuthError;
use crate::models::AppState;
use crate::models::oauth::{OAUTH_SESSION_KEY, OAuthSessionData};
use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
};
use oauth2::{CsrfToken, PkceCodeChallenge};
use tower_sessions::Session;
use tracing::{debug, info};
use url::Url;

/// Starts a sign-in: remembers a fresh `state` and PKCE verifier in the
/// session and sends the popup to the provider's authorize page.
pub async fn authorize_handler(
    State(app_state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, AuthError> {
    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
    let csrf_token = CsrfToken::new_random();

    let url = authorize_url(&app_state, csrf_token.secret(), pkce_challenge.as_str());

    let session_data = OAuthSessionData {
        pkce_verifier_secret: Some(pkce_verifier.secret().to_string()),
        csrf_token_secret: Some(csrf_token.secret().to_string()),
    };

    session.insert(OAUTH_SESSION_KEY, session_data).await?;
    session.save().await?;

    debug!(session_id = ?session.id(), "pending sign-in stored in session");
    info!(provider = url.host_str().unwrap_or_default(), "redirecting popup to provider");

    Ok(Redirect::to(url.as_str()))
}

fn authorize_url(app_state: &AppState, state: &str, code_challenge: &str) -> Url {
    let config = &app_state.config;
    let mut url = config.authorize_url.clone();

    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("client_id", &config.client_id)
            .append_pair("redirect_uri", config.redirect_url.as_str())
            .append_pair("response_type", "code")
            .append_pair("state", state)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256");
        if !config.scopes.is_empty() {
            pairs.append_pair("scope", &config.scopes.join(" "));
        }
    }

    url
}
