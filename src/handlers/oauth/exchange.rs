use crate::error::AuthError;
use crate::models::AppState;
use crate::models::oauth::{ACCESS_TOKEN_KEY, OAUTH_SESSION_KEY, OAuthSessionData, TokenResponse};
use crate::relay::code_prefix;
use oauth2::PkceCodeVerifier;
use tower_sessions::Session;
use tracing::{info, warn};

/// Trades a relayed authorization code for tokens.
///
/// The pending sign-in is taken out of the session first, so a `state` can be
/// redeemed at most once whatever the outcome.
pub async fn exchange_code(
    app_state: &AppState,
    session: &Session,
    code: &str,
    state: &str,
) -> Result<TokenResponse, AuthError> {
    let oauth_data = session
        .remove::<OAuthSessionData>(OAUTH_SESSION_KEY)
        .await?
        .ok_or(AuthError::MissingSession)?;

    let (Some(pkce_verifier_secret), Some(original_csrf_secret)) =
        (oauth_data.pkce_verifier_secret, oauth_data.csrf_token_secret)
    else {
        warn!("pending sign-in is missing its PKCE verifier or state");
        return Err(AuthError::MissingSession);
    };

    if original_csrf_secret != state {
        warn!("state mismatch on code exchange");
        return Err(AuthError::StateMismatch);
    }

    let pkce_verifier = PkceCodeVerifier::new(pkce_verifier_secret);
    let config = &app_state.config;

    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("code", code),
        ("code_verifier", pkce_verifier.secret().as_str()),
        ("grant_type", "authorization_code"),
        ("redirect_uri", config.redirect_url.as_str()),
    ];

    let response = app_state
        .http
        .post(config.token_url.clone())
        .form(&params)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Could not read error body".to_string());
        warn!(%status, "token endpoint rejected the code");
        return Err(AuthError::Provider {
            status: status.as_u16(),
            body,
        });
    }

    let token_data = response
        .json::<TokenResponse>()
        .await
        .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

    session
        .insert(ACCESS_TOKEN_KEY, token_data.access_token.clone())
        .await?;

    info!(
        code_prefix = %code_prefix(Some(code)),
        has_refresh_token = token_data.refresh_token.is_some(),
        expires_in = token_data.expires_in,
        "authorization code exchanged"
    );

    Ok(token_data)
}
