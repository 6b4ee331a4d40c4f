use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::models::{CallbackResult, Disposition};
use crate::relay::channel::PopupWindow;
use crate::relay::config::RelayTimings;
use crate::relay::delivery::DeliveryOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTone {
    Pending,
    Success,
    Error,
}

impl StatusTone {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusTone::Pending => "pending",
            StatusTone::Success => "success",
            StatusTone::Error => "error",
        }
    }
}

/// What the popup shows the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub tone: StatusTone,
    pub title: String,
    pub detail: Option<String>,
    /// Name/value pairs offered for manual copy.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub copy_values: Vec<(String, String)>,
}

impl StatusMessage {
    fn new(tone: StatusTone, title: &str, detail: Option<String>) -> Self {
        Self {
            tone,
            title: title.to_string(),
            detail,
            copy_values: Vec::new(),
        }
    }

    pub fn pending() -> Self {
        Self::new(StatusTone::Pending, "Completing sign-in…", None)
    }
}

/// Provider errors are shown verbatim: `access_denied: User declined`.
pub fn provider_error_text(result: &CallbackResult) -> String {
    let error = result.error.as_deref().unwrap_or_default();
    match result.error_description.as_deref().filter(|d| !d.is_empty()) {
        Some(description) => format!("{}: {}", error, description),
        None => error.to_string(),
    }
}

pub fn status_for(
    result: &CallbackResult,
    disposition: Disposition,
    outcome: DeliveryOutcome,
) -> StatusMessage {
    match (disposition, outcome) {
        (Disposition::MalformedCallback, _) | (_, DeliveryOutcome::NotRelayable) => {
            StatusMessage::new(
                StatusTone::Error,
                "Invalid request",
                Some(
                    "This page was opened without a complete sign-in response. \
                     Please start the sign-in again from the application."
                        .to_string(),
                ),
            )
        }
        (Disposition::ProviderError, _) => StatusMessage::new(
            StatusTone::Error,
            "Sign-in failed",
            Some(provider_error_text(result)),
        ),
        (Disposition::Success, DeliveryOutcome::Relayed) => StatusMessage::new(
            StatusTone::Success,
            "Sign-in complete",
            Some("This window will close automatically.".to_string()),
        ),
        (Disposition::Success, DeliveryOutcome::Navigated(_)) => StatusMessage::new(
            StatusTone::Pending,
            "Returning to the application…",
            None,
        ),
        (Disposition::Success, DeliveryOutcome::ManualDisplay) => {
            let mut status = StatusMessage::new(
                StatusTone::Success,
                "Authorization received",
                Some(
                    "Copy these values into the application to finish signing in.".to_string(),
                ),
            );
            status.copy_values = [("code", &result.code), ("state", &result.state)]
                .into_iter()
                .filter_map(|(name, value)| value.clone().map(|v| (name.to_string(), v)))
                .collect();
            status
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEnd {
    Closed,
    /// The platform would not close the window; a manual hint is shown.
    CloseRefused,
    /// Waiting for the user to close the window.
    LeftOpen,
    /// The page navigated away, nothing to close.
    Replaced,
    /// The close timer was cancelled before firing.
    Cancelled,
}

/// Owns the popup's visible lifetime once delivery has settled.
#[derive(Debug, Clone)]
pub struct LifecycleController {
    timings: RelayTimings,
}

impl LifecycleController {
    pub fn new(timings: RelayTimings) -> Self {
        Self { timings }
    }

    pub async fn settle<W>(
        &self,
        status: &StatusMessage,
        outcome: DeliveryOutcome,
        window: &mut W,
        cancel: &CancellationToken,
    ) -> LifecycleEnd
    where
        W: PopupWindow + ?Sized,
    {
        match outcome {
            DeliveryOutcome::Navigated(_) => LifecycleEnd::Replaced,
            DeliveryOutcome::Relayed => {
                window.show_status(status);
                self.close_after(self.timings.relay_close_delay, window, cancel)
                    .await
            }
            DeliveryOutcome::NotRelayable => {
                window.show_status(status);
                window.offer_close();
                match self.timings.error_close_delay {
                    Some(delay) => self.close_after(delay, window, cancel).await,
                    None => LifecycleEnd::LeftOpen,
                }
            }
            DeliveryOutcome::ManualDisplay => {
                window.show_status(status);
                window.offer_close();
                LifecycleEnd::LeftOpen
            }
        }
    }

    async fn close_after<W>(
        &self,
        delay: Duration,
        window: &mut W,
        cancel: &CancellationToken,
    ) -> LifecycleEnd
    where
        W: PopupWindow + ?Sized,
    {
        tokio::select! {
            _ = cancel.cancelled() => LifecycleEnd::Cancelled,
            _ = tokio::time::sleep(delay) => {
                if window.close() {
                    info!("popup closed");
                    LifecycleEnd::Closed
                } else {
                    // Windows the user opened by hand cannot be closed by script.
                    warn!("popup close refused by platform");
                    window.offer_close();
                    LifecycleEnd::CloseRefused
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeliveryChannel;
    use crate::relay::params::extract;
    use tokio::time::Instant;

    #[derive(Default)]
    struct FakeWindow {
        closable: bool,
        shown: Vec<StatusMessage>,
        close_offered: bool,
        closed_at: Option<Instant>,
    }

    impl PopupWindow for FakeWindow {
        fn show_status(&mut self, status: &StatusMessage) {
            self.shown.push(status.clone());
        }

        fn offer_close(&mut self) {
            self.close_offered = true;
        }

        fn close(&mut self) -> bool {
            if self.closable {
                self.closed_at = Some(Instant::now());
            }
            self.closable
        }
    }

    #[test]
    fn test_provider_error_shown_verbatim() {
        let result = extract("error=access_denied&error_description=User%20declined");
        let status = status_for(
            &result,
            Disposition::ProviderError,
            DeliveryOutcome::Relayed,
        );
        assert_eq!(status.tone, StatusTone::Error);
        assert_eq!(status.detail.as_deref(), Some("access_denied: User declined"));

        let result = extract("error=server_error");
        assert_eq!(provider_error_text(&result), "server_error");
    }

    #[test]
    fn test_manual_display_offers_values() {
        let result = extract("code=abc123&state=xyz789");
        let status = status_for(
            &result,
            Disposition::Success,
            DeliveryOutcome::ManualDisplay,
        );
        assert_eq!(
            status.copy_values,
            vec![
                ("code".to_string(), "abc123".to_string()),
                ("state".to_string(), "xyz789".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_relay_closes_after_delay() {
        let controller = LifecycleController::new(RelayTimings::default());
        let mut window = FakeWindow {
            closable: true,
            ..Default::default()
        };
        let started = Instant::now();

        let end = controller
            .settle(
                &StatusMessage::pending(),
                DeliveryOutcome::Relayed,
                &mut window,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(end, LifecycleEnd::Closed);
        let waited = window.closed_at.unwrap() - started;
        assert!(waited >= Duration::from_millis(2000));
        assert!(waited <= Duration::from_millis(3000));
        assert_eq!(window.shown.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_close_shows_hint() {
        let controller = LifecycleController::new(RelayTimings::default());
        let mut window = FakeWindow::default();

        let end = controller
            .settle(
                &StatusMessage::pending(),
                DeliveryOutcome::Relayed,
                &mut window,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(end, LifecycleEnd::CloseRefused);
        assert!(window.close_offered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_skips_close() {
        let controller = LifecycleController::new(RelayTimings::default());
        let mut window = FakeWindow {
            closable: true,
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let end = controller
            .settle(
                &StatusMessage::pending(),
                DeliveryOutcome::Relayed,
                &mut window,
                &cancel,
            )
            .await;

        assert_eq!(end, LifecycleEnd::Cancelled);
        assert!(window.closed_at.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_stays_open_without_error_delay() {
        let controller = LifecycleController::new(RelayTimings::default());
        let mut window = FakeWindow {
            closable: true,
            ..Default::default()
        };

        let end = controller
            .settle(
                &StatusMessage::pending(),
                DeliveryOutcome::NotRelayable,
                &mut window,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(end, LifecycleEnd::LeftOpen);
        assert!(window.close_offered);
        assert!(window.closed_at.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_auto_close_when_configured() {
        let controller =
            LifecycleController::new(RelayTimings::default().with_error_close_millis(4000));
        let mut window = FakeWindow {
            closable: true,
            ..Default::default()
        };
        let started = Instant::now();

        let end = controller
            .settle(
                &StatusMessage::pending(),
                DeliveryOutcome::NotRelayable,
                &mut window,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(end, LifecycleEnd::Closed);
        assert!(window.closed_at.unwrap() - started >= Duration::from_millis(4000));
    }

    #[tokio::test]
    async fn test_navigation_needs_no_close() {
        let controller = LifecycleController::new(RelayTimings::default());
        let mut window = FakeWindow::default();

        let end = controller
            .settle(
                &StatusMessage::pending(),
                DeliveryOutcome::Navigated(DeliveryChannel::WebAppRedirect),
                &mut window,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(end, LifecycleEnd::Replaced);
        assert!(window.shown.is_empty());
    }
}
