use crate::error::ConfigError;
use crate::relay::{EnabledChannels, Handshake, RelayConfig, RelayConfigError, RelayTimings};
use url::Url;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:10000";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: Url,
    pub authorize_url: Url,
    pub token_url: Url,
    pub scopes: Vec<String>,
    pub listen_addr: String,
    pub log_level: String,
    pub secure_cookie: bool,
    pub relay: RelayConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        use dotenvy::dotenv;
        use std::env;

        dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let client_id = required("OAUTH_CLIENT_ID")?;
        let client_secret = required("OAUTH_CLIENT_SECRET")?;
        let redirect_url = parse_url("OAUTH_REDIRECT_URL", &required("OAUTH_REDIRECT_URL")?)?;
        let authorize_url = parse_url("OAUTH_AUTHORIZE_URL", &required("OAUTH_AUTHORIZE_URL")?)?;
        let token_url = parse_url("OAUTH_TOKEN_URL", &required("OAUTH_TOKEN_URL")?)?;

        let scopes = get("OAUTH_SCOPES")
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        let app_origin = required("APP_ORIGIN")?;
        let deep_link_scheme = get("APP_DEEP_LINK_SCHEME");

        let channels = match get("RELAY_CHANNELS") {
            Some(list) => list
                .parse::<EnabledChannels>()
                .map_err(|e| ConfigError::invalid("RELAY_CHANNELS", e.to_string()))?,
            None => EnabledChannels::default(),
        };

        let mut timings = RelayTimings::default();
        if let Some(ms) = parse_millis("RELAY_CLOSE_DELAY_MS", get("RELAY_CLOSE_DELAY_MS"))? {
            timings = timings.with_relay_close_millis(ms);
        }
        if let Some(ms) = parse_millis("DEEP_LINK_FALLBACK_MS", get("DEEP_LINK_FALLBACK_MS"))? {
            timings = timings.with_deep_link_fallback_millis(ms);
        }
        if let Some(ms) = parse_millis("ERROR_CLOSE_DELAY_MS", get("ERROR_CLOSE_DELAY_MS"))? {
            timings = timings.with_error_close_millis(ms);
        }

        let relay = RelayConfig::new(&app_origin, deep_link_scheme.as_deref())
            .map_err(|err| match err {
                RelayConfigError::AppOrigin(_) => ConfigError::invalid("APP_ORIGIN", err.to_string()),
                RelayConfigError::DeepLinkScheme(_) => {
                    ConfigError::invalid("APP_DEEP_LINK_SCHEME", err.to_string())
                }
            })?
            .with_channels(channels)
            .with_timings(timings);

        let secure_cookie = match get("SESSION_SECURE_COOKIE").as_deref() {
            None => false,
            Some("true" | "1") => true,
            Some("false" | "0") => false,
            Some(other) => {
                return Err(ConfigError::invalid(
                    "SESSION_SECURE_COOKIE",
                    format!("expected true or false, got `{}`", other),
                ));
            }
        };

        Ok(Self {
            client_id,
            client_secret,
            redirect_url,
            authorize_url,
            token_url,
            scopes,
            listen_addr: get("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            secure_cookie,
            relay,
        })
    }
}

fn parse_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::invalid(key, e.to_string()))
}

fn parse_millis(key: &'static str, value: Option<String>) -> Result<Option<u64>, ConfigError> {
    value
        .map(|v| {
            v.parse::<u64>()
                .map_err(|e| ConfigError::invalid(key, format!("`{}`: {}", v, e)))
        })
        .transpose()
}

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub handshake: Handshake,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            handshake: Handshake::new(config.relay.clone()),
            config,
            http: reqwest::Client::new(),
        }
    }
}
