use oauth_popup_relay::logging;
use oauth_popup_relay::models::{AppConfig, AppState};
use oauth_popup_relay::server::create_app;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let app_config = AppConfig::from_env()?;
    logging::init_subscriber(&app_config)?;

    let listen_addr = app_config.listen_addr.clone();
    let app = create_app(AppState::new(app_config));

    info!("listening on http://{}", listen_addr);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
