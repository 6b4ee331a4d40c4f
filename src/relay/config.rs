use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const DEFAULT_RELAY_CLOSE_DELAY: Duration = Duration::from_millis(2500);
pub const DEFAULT_DEEP_LINK_FALLBACK: Duration = Duration::from_millis(2000);

/// Auto-close after a successful opener relay stays within this window so the
/// user can read the confirmation.
pub const RELAY_CLOSE_DELAY_RANGE: (u64, u64) = (2000, 3000);
/// Error pages stay up longer than confirmations.
pub const ERROR_CLOSE_DELAY_RANGE: (u64, u64) = (3000, 5000);
/// A deep link gets at least a second to hand over to the native app before
/// the web redirect replaces the page.
pub const DEEP_LINK_FALLBACK_RANGE: (u64, u64) = (1000, 5000);

/// Schemes browsers treat specially, or that would run in the page itself.
/// None of them can name a native app.
const RESERVED_SCHEMES: &[&str] = &[
    "http",
    "https",
    "ws",
    "wss",
    "ftp",
    "file",
    "javascript",
    "data",
    "blob",
    "about",
    "vbscript",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown channel `{0}`")]
pub struct UnknownChannel(pub String);

/// Which fallback channels may be tried. Their order is fixed: opener, deep
/// link, web redirect, then manual display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnabledChannels {
    pub opener: bool,
    pub deep_link: bool,
    pub web_redirect: bool,
}

impl Default for EnabledChannels {
    fn default() -> Self {
        Self {
            opener: true,
            deep_link: true,
            web_redirect: true,
        }
    }
}

impl FromStr for EnabledChannels {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut channels = EnabledChannels {
            opener: false,
            deep_link: false,
            web_redirect: false,
        };

        for name in s.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            match name {
                "opener" => channels.opener = true,
                "deep_link" => channels.deep_link = true,
                "web_redirect" => channels.web_redirect = true,
                other => return Err(UnknownChannel(other.to_string())),
            }
        }

        Ok(channels)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayTimings {
    pub relay_close_delay: Duration,
    pub deep_link_fallback: Duration,
    pub error_close_delay: Option<Duration>,
}

impl Default for RelayTimings {
    fn default() -> Self {
        Self {
            relay_close_delay: DEFAULT_RELAY_CLOSE_DELAY,
            deep_link_fallback: DEFAULT_DEEP_LINK_FALLBACK,
            error_close_delay: None,
        }
    }
}

impl RelayTimings {
    pub fn with_relay_close_millis(mut self, millis: u64) -> Self {
        let (min, max) = RELAY_CLOSE_DELAY_RANGE;
        self.relay_close_delay = Duration::from_millis(millis.clamp(min, max));
        self
    }

    pub fn with_error_close_millis(mut self, millis: u64) -> Self {
        let (min, max) = ERROR_CLOSE_DELAY_RANGE;
        self.error_close_delay = Some(Duration::from_millis(millis.clamp(min, max)));
        self
    }

    pub fn with_deep_link_fallback_millis(mut self, millis: u64) -> Self {
        let (min, max) = DEEP_LINK_FALLBACK_RANGE;
        self.deep_link_fallback = Duration::from_millis(millis.clamp(min, max));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayConfigError {
    #[error("invalid app origin: {0}")]
    AppOrigin(String),

    #[error("invalid deep link scheme: {0}")]
    DeepLinkScheme(String),
}

/// Everything the callback page needs to decide where a result goes.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    app_origin: Url,
    deep_link_scheme: Option<String>,
    pub channels: EnabledChannels,
    pub timings: RelayTimings,
}

impl RelayConfig {
    /// `app_origin` must be an http(s) URL; anything after the origin is
    /// dropped. `deep_link_scheme` is the bare scheme, e.g. `myapp`.
    pub fn new(
        app_origin: &str,
        deep_link_scheme: Option<&str>,
    ) -> Result<Self, RelayConfigError> {
        let parsed =
            Url::parse(app_origin).map_err(|e| RelayConfigError::AppOrigin(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host().is_none() {
            return Err(RelayConfigError::AppOrigin(format!(
                "`{}` is not an http(s) origin",
                app_origin
            )));
        }
        let app_origin = Url::parse(&parsed.origin().ascii_serialization())
            .map_err(|e| RelayConfigError::AppOrigin(e.to_string()))?;

        let deep_link_scheme = match deep_link_scheme.map(str::trim) {
            None | Some("") => None,
            Some(scheme) => {
                let scheme = scheme.trim_end_matches("://").to_ascii_lowercase();
                let probe = Url::parse(&format!("{}://oauth/callback", scheme)).map_err(|e| {
                    RelayConfigError::DeepLinkScheme(format!("`{}`: {}", scheme, e))
                })?;
                if probe.scheme() != scheme || RESERVED_SCHEMES.contains(&probe.scheme()) {
                    return Err(RelayConfigError::DeepLinkScheme(format!(
                        "`{}` is not a custom URI scheme",
                        scheme
                    )));
                }
                Some(scheme)
            }
        };

        Ok(Self {
            app_origin,
            deep_link_scheme,
            channels: EnabledChannels::default(),
            timings: RelayTimings::default(),
        })
    }

    pub fn with_channels(mut self, channels: EnabledChannels) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_timings(mut self, timings: RelayTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Origin the opener message is addressed to, e.g. `https://app.example.com`.
    pub fn target_origin(&self) -> String {
        self.app_origin.origin().ascii_serialization()
    }

    /// Landing URL of the web app, query string not yet attached.
    pub fn web_redirect_base(&self) -> Url {
        self.app_origin.clone()
    }

    /// `<scheme>://oauth/callback`, when a native app scheme is configured.
    pub fn deep_link_base(&self) -> Option<Url> {
        self.deep_link_scheme
            .as_ref()
            .and_then(|scheme| Url::parse(&format!("{}://oauth/callback", scheme)).ok())
    }
}
