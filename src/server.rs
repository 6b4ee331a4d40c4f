use crate::handlers::{authorize_handler, callback_handler, exchange_handler, landing_handler};
use crate::models::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use time::Duration;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

pub fn create_app(app_state: AppState) -> Router {
    let session_store = MemoryStore::default();
    let session_expiry = Expiry::OnInactivity(Duration::hours(6));
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(app_state.config.secure_cookie)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(session_expiry);

    Router::new()
        .route("/", get(landing_handler))
        .route("/oauth/authorize", get(authorize_handler))
        .route("/oauth/callback", get(callback_handler))
        .route("/oauth/exchange", post(exchange_handler))
        .layer(session_layer)
        .with_state(app_state)
}
