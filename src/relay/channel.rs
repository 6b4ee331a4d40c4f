//! Capabilities the handshake needs from the page it runs in. Injected so the
//! cascade never reaches for browser globals.

use url::Url;

use crate::models::RelayMessage;
use crate::relay::lifecycle::StatusMessage;

/// Handle to the window that opened the popup.
pub trait OpenerChannel {
    /// Posts `message` to the opener, addressed to `target_origin`.
    ///
    /// Returns `false` when the opener is gone, closed, or refused the post.
    /// `true` only means the message was handed off; openers never acknowledge.
    fn try_send(&self, message: &RelayMessage, target_origin: &str) -> bool;
}

/// Replaces the current page's location. Gives no signal about whether the
/// target (a custom scheme in particular) was actually opened.
pub trait Navigator {
    fn navigate(&mut self, url: &Url);
}

/// The popup itself, as far as its visible lifetime goes.
pub trait PopupWindow {
    fn show_status(&mut self, status: &StatusMessage);

    /// Shows a manual "close" control or hint.
    fn offer_close(&mut self);

    /// Returns `false` if the platform refused, which browsers do for windows
    /// not opened by script.
    fn close(&mut self) -> bool;
}
