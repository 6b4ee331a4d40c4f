use crate::error::AuthError;
use crate::handlers::oauth::exchange::exchange_code;
use crate::models::AppState;
use crate::models::oauth::ExchangeParams;
use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tower_sessions::Session;

#[derive(Debug, Serialize)]
pub struct ExchangeResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

/// Called by the opener once the popup has relayed `{code, state}`.
pub async fn exchange_handler(
    State(app_state): State<AppState>,
    session: Session,
    Json(params): Json<ExchangeParams>,
) -> Result<impl IntoResponse, AuthError> {
    let token_data = exchange_code(&app_state, &session, &params.code, &params.state).await?;

    Ok(Json(ExchangeResponse {
        authenticated: true,
        token_type: token_data.token_type,
        expires_in: token_data.expires_in,
    }))
}
