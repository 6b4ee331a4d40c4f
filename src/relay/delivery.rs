use std::time::Duration;

use serde::{Serialize, Serializer};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::models::{CallbackResult, DeliveryChannel, Disposition, RelayMessage};
use crate::relay::channel::{Navigator, OpenerChannel};
use crate::relay::config::RelayConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Init,
    AttemptOpenerRelay,
    AttemptDeepLink,
    AttemptWebRedirect,
    AwaitManualCopy,
    TerminalSuccess,
    TerminalError,
    /// The page was navigated away; nothing after this runs.
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Message posted to the opener.
    Relayed,
    /// Page handed over to a deep link or the web app.
    Navigated(DeliveryChannel),
    /// Nothing could carry the result; it is shown for copying.
    ManualDisplay,
    /// Malformed callback, nothing to relay.
    NotRelayable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub outcome: DeliveryOutcome,
    pub trail: Vec<DeliveryState>,
}

/// Precomputed route for one callback: the payload, every URL it may be sent
/// to, and the ordered channels to try. The callback page embeds this as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryPlan {
    pub disposition: Disposition,
    pub channels: Vec<DeliveryChannel>,
    pub message: Option<RelayMessage>,
    pub target_origin: String,
    pub deep_link: Option<Url>,
    pub web_redirect: Option<Url>,
    #[serde(rename = "deep_link_fallback_ms", serialize_with = "serialize_millis")]
    pub deep_link_fallback: Duration,
}

impl DeliveryPlan {
    pub fn build(result: &CallbackResult, disposition: Disposition, config: &RelayConfig) -> Self {
        let message = RelayMessage::for_result(result, disposition);

        let (deep_link, web_redirect) = match &message {
            Some(message) => (
                config
                    .channels
                    .deep_link
                    .then(|| config.deep_link_base())
                    .flatten()
                    .map(|base| deep_link_url(base, message)),
                config
                    .channels
                    .web_redirect
                    .then(|| web_redirect_url(config.web_redirect_base(), message)),
            ),
            None => (None, None),
        };

        let mut channels = Vec::new();
        if message.is_some() {
            if config.channels.opener {
                channels.push(DeliveryChannel::OpenerWindow);
            }
            if deep_link.is_some() {
                channels.push(DeliveryChannel::NativeDeepLink);
            }
            if web_redirect.is_some() {
                channels.push(DeliveryChannel::WebAppRedirect);
            }
            channels.push(DeliveryChannel::ManualDisplay);
        }

        Self {
            disposition,
            channels,
            message,
            target_origin: config.target_origin(),
            deep_link,
            web_redirect,
            deep_link_fallback: config.timings.deep_link_fallback,
        }
    }
}

/// `<scheme>://oauth/callback?code=..&state=..` or `?error=..&error_description=..`
fn deep_link_url(mut base: Url, message: &RelayMessage) -> Url {
    {
        let mut pairs = base.query_pairs_mut();
        if message.success {
            append(&mut pairs, "code", &message.code);
            append(&mut pairs, "state", &message.state);
        } else {
            append(&mut pairs, "error", &message.error);
            append(&mut pairs, "error_description", &message.error_description);
        }
    }
    base
}

/// `<app-origin>/?oauth_code=..&oauth_state=..` or `?oauth_error=..`
fn web_redirect_url(mut base: Url, message: &RelayMessage) -> Url {
    {
        let mut pairs = base.query_pairs_mut();
        if message.success {
            append(&mut pairs, "oauth_code", &message.code);
            append(&mut pairs, "oauth_state", &message.state);
        } else {
            append(&mut pairs, "oauth_error", &message.error);
            append(&mut pairs, "oauth_error_description", &message.error_description);
        }
    }
    base
}

fn append(
    pairs: &mut url::form_urlencoded::Serializer<'_, url::UrlQuery<'_>>,
    key: &str,
    value: &Option<String>,
) {
    if let Some(value) = value {
        pairs.append_pair(key, value);
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Walks the plan's channels in order until one takes the result.
///
/// Opener relay is the only step with feedback. A deep link is fired blind
/// and followed by a fixed wait; if the page is still around afterwards (the
/// `cancel` token was not tripped by an unload), the web redirect runs.
pub async fn deliver<O, N>(
    plan: &DeliveryPlan,
    opener: Option<&O>,
    navigator: &mut N,
    cancel: &CancellationToken,
) -> DeliveryReport
where
    O: OpenerChannel + ?Sized,
    N: Navigator + ?Sized,
{
    let mut trail = vec![DeliveryState::Init];

    let Some(message) = plan.message.as_ref() else {
        enter(&mut trail, DeliveryState::TerminalError);
        return DeliveryReport {
            outcome: DeliveryOutcome::NotRelayable,
            trail,
        };
    };

    for channel in &plan.channels {
        match channel {
            DeliveryChannel::OpenerWindow => {
                enter(&mut trail, DeliveryState::AttemptOpenerRelay);
                match opener {
                    Some(opener) if opener.try_send(message, &plan.target_origin) => {
                        info!(success = message.success, "relayed callback to opener window");
                        enter(&mut trail, DeliveryState::TerminalSuccess);
                        return DeliveryReport {
                            outcome: DeliveryOutcome::Relayed,
                            trail,
                        };
                    }
                    Some(_) => debug!("opener refused the message, falling back"),
                    None => debug!("no opener window, falling back"),
                }
            }
            DeliveryChannel::NativeDeepLink => {
                let Some(url) = plan.deep_link.as_ref() else {
                    continue;
                };
                enter(&mut trail, DeliveryState::AttemptDeepLink);
                info!(scheme = url.scheme(), "opening native app deep link");
                navigator.navigate(url);

                tokio::select! {
                    _ = cancel.cancelled() => {
                        enter(&mut trail, DeliveryState::Terminal);
                        return DeliveryReport {
                            outcome: DeliveryOutcome::Navigated(DeliveryChannel::NativeDeepLink),
                            trail,
                        };
                    }
                    _ = tokio::time::sleep(plan.deep_link_fallback) => {
                        debug!(
                            waited_ms = plan.deep_link_fallback.as_millis() as u64,
                            "still on callback page after deep link"
                        );
                    }
                }
            }
            DeliveryChannel::WebAppRedirect => {
                let Some(url) = plan.web_redirect.as_ref() else {
                    continue;
                };
                enter(&mut trail, DeliveryState::AttemptWebRedirect);
                info!(origin = %plan.target_origin, "redirecting to web app");
                navigator.navigate(url);
                enter(&mut trail, DeliveryState::Terminal);
                return DeliveryReport {
                    outcome: DeliveryOutcome::Navigated(DeliveryChannel::WebAppRedirect),
                    trail,
                };
            }
            DeliveryChannel::ManualDisplay => break,
        }
    }

    enter(&mut trail, DeliveryState::AwaitManualCopy);
    DeliveryReport {
        outcome: DeliveryOutcome::ManualDisplay,
        trail,
    }
}

fn enter(trail: &mut Vec<DeliveryState>, state: DeliveryState) {
    debug!(?state, "delivery state");
    trail.push(state);
}
