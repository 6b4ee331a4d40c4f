//! The popup side of an OAuth authorization-code handoff.
//!
//! A provider redirects the popup to the callback page with either
//! `code`/`state` or `error`. The handshake parses that, classifies it, and
//! hands the result on through the first channel that works: a message to
//! the opener window, a native deep link, a redirect to the web app, or a
//! manual copy display. Nothing is stored; the result lives as long as the
//! page does.

pub mod channel;
pub mod classify;
pub mod config;
pub mod delivery;
pub mod lifecycle;
pub mod params;

pub use channel::{Navigator, OpenerChannel, PopupWindow};
pub use classify::classify;
pub use config::{EnabledChannels, RelayConfig, RelayConfigError, RelayTimings, UnknownChannel};
pub use delivery::{DeliveryOutcome, DeliveryPlan, DeliveryReport, DeliveryState, deliver};
pub use lifecycle::{LifecycleController, LifecycleEnd, StatusMessage, StatusTone, status_for};
pub use params::extract;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::models::{CallbackResult, Disposition};

/// A callback that has been parsed, classified and routed, but not yet run.
#[derive(Debug, Clone)]
pub struct PreparedCallback {
    pub result: CallbackResult,
    pub disposition: Disposition,
    pub plan: DeliveryPlan,
}

impl PreparedCallback {
    pub fn status(&self, outcome: DeliveryOutcome) -> StatusMessage {
        status_for(&self.result, self.disposition, outcome)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeReport {
    pub disposition: Disposition,
    pub delivery: DeliveryReport,
    pub lifecycle: LifecycleEnd,
}

#[derive(Debug, Clone)]
pub struct Handshake {
    config: RelayConfig,
}

impl Handshake {
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn prepare(&self, query: &str) -> PreparedCallback {
        let result = extract(query);
        let disposition = classify(&result);
        let plan = DeliveryPlan::build(&result, disposition, &self.config);

        match disposition {
            Disposition::Success => info!(
                code_prefix = %code_prefix(result.code.as_deref()),
                "authorization code received"
            ),
            Disposition::ProviderError => warn!(
                error = result.error.as_deref().unwrap_or_default(),
                error_description = result.error_description.as_deref().unwrap_or_default(),
                "provider returned an error"
            ),
            Disposition::MalformedCallback => warn!("callback without code/state or error"),
        }

        PreparedCallback {
            result,
            disposition,
            plan,
        }
    }

    /// Runs one page load end to end: delivery cascade, then lifecycle.
    /// `cancel` stands for the page going away (unload, manual close).
    pub async fn run<O, N, W>(
        &self,
        query: &str,
        opener: Option<&O>,
        navigator: &mut N,
        window: &mut W,
        cancel: &CancellationToken,
    ) -> HandshakeReport
    where
        O: OpenerChannel + ?Sized,
        N: Navigator + ?Sized,
        W: PopupWindow + ?Sized,
    {
        let prepared = self.prepare(query);
        window.show_status(&StatusMessage::pending());

        let delivery = deliver(&prepared.plan, opener, navigator, cancel).await;
        let status = prepared.status(delivery.outcome);

        let lifecycle = LifecycleController::new(self.config.timings)
            .settle(&status, delivery.outcome, window, cancel)
            .await;

        HandshakeReport {
            disposition: prepared.disposition,
            delivery,
            lifecycle,
        }
    }
}

/// First few characters of an authorization code, enough to correlate logs.
pub fn code_prefix(code: Option<&str>) -> String {
    let code = code.unwrap_or_default();
    let prefix: String = code.chars().take(6).collect();
    if prefix.len() < code.len() {
        format!("{}…", prefix)
    } else {
        prefix
    }
}
