use crate::handlers::page::{escape_html, render_page, script_json};
use crate::models::{AppState, DeliveryChannel};
use crate::relay::{DeliveryOutcome, DeliveryPlan, PreparedCallback, RelayTimings, StatusMessage};
use axum::{
    extract::{RawQuery, State},
    response::{Html, IntoResponse},
};
use serde::Serialize;
use tracing::error;

/// Runs the cascade in the browser. Mirrors `relay::deliver` and
/// `LifecycleController::settle`; every value it needs comes from the plan.
const CALLBACK_SCRIPT: &str = r#"
(function () {
    var page = JSON.parse(document.getElementById('relay-plan').textContent);
    var plan = page.plan;

    function show(status) {
        var root = document.getElementById('status');
        root.className = 'container tone-' + status.tone;
        document.getElementById('status-title').textContent = status.title;
        document.getElementById('status-detail').textContent = status.detail || '';
        var list = document.getElementById('copy-values');
        list.innerHTML = '';
        (status.copy_values || []).forEach(function (pair) {
            var dt = document.createElement('dt');
            dt.textContent = pair[0];
            var dd = document.createElement('dd');
            dd.textContent = pair[1];
            list.appendChild(dt);
            list.appendChild(dd);
        });
        list.hidden = list.children.length === 0;
    }

    function offerClose() {
        document.getElementById('close-button').hidden = false;
        document.getElementById('close-hint').hidden = false;
    }

    function closeAfter(ms) {
        setTimeout(function () {
            window.close();
            // Still here: the browser refused to close a window it did not open.
            setTimeout(offerClose, 200);
        }, ms);
    }

    document.getElementById('close-button').addEventListener('click', function () {
        window.close();
    });

    if (!plan.message) {
        offerClose();
        if (page.error_close_delay_ms) {
            closeAfter(page.error_close_delay_ms);
        }
        return;
    }

    function openerHandle() {
        try {
            return window.opener && !window.opener.closed ? window.opener : null;
        } catch (e) {
            return null;
        }
    }

    var steps = plan.channels.slice();

    function next() {
        var channel = steps.shift();
        if (channel === 'opener_window') {
            var opener = openerHandle();
            if (opener) {
                try {
                    opener.postMessage(plan.message, plan.target_origin);
                    show(page.statuses.relayed);
                    closeAfter(page.relay_close_delay_ms);
                    return;
                } catch (e) {}
            }
            return next();
        }
        if (channel === 'native_deep_link' && plan.deep_link) {
            show(page.statuses.navigating);
            window.location.href = plan.deep_link;
            setTimeout(next, plan.deep_link_fallback_ms);
            return;
        }
        if (channel === 'web_app_redirect' && plan.web_redirect) {
            show(page.statuses.navigating);
            window.location.href = plan.web_redirect;
            return;
        }
        show(page.statuses.manual);
        offerClose();
    }

    next();
})();
"#;

/// Everything the page script reads.
#[derive(Debug, Serialize)]
struct CallbackPage<'a> {
    plan: &'a DeliveryPlan,
    statuses: PageStatuses,
    relay_close_delay_ms: u64,
    error_close_delay_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
struct PageStatuses {
    relayed: StatusMessage,
    navigating: StatusMessage,
    manual: StatusMessage,
}

pub async fn callback_handler(
    State(app_state): State<AppState>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let prepared = app_state
        .handshake
        .prepare(query.as_deref().unwrap_or_default());

    match render_callback_page(&app_state, &prepared) {
        Ok(page) => page,
        Err(e) => {
            error!("Failed to serialize delivery plan: {:?}", e);
            render_page(
                "Sign-in error",
                &status_markup(&prepared.status(DeliveryOutcome::NotRelayable), true),
                None,
            )
        }
    }
}

fn render_callback_page(
    app_state: &AppState,
    prepared: &PreparedCallback,
) -> Result<Html<String>, serde_json::Error> {
    let page = callback_page(prepared, app_state.config.relay.timings);

    let initial = if prepared.disposition.is_relayable() {
        StatusMessage::pending()
    } else {
        prepared.status(DeliveryOutcome::NotRelayable)
    };

    let body = format!(
        r#"{status}
    <script id="relay-plan" type="application/json">{plan}</script>"#,
        status = status_markup(&initial, false),
        plan = script_json(&page)?,
    );

    Ok(render_page("Signing in…", &body, Some(CALLBACK_SCRIPT)))
}

fn callback_page(prepared: &PreparedCallback, timings: RelayTimings) -> CallbackPage<'_> {
    CallbackPage {
        plan: &prepared.plan,
        statuses: PageStatuses {
            relayed: prepared.status(DeliveryOutcome::Relayed),
            navigating: prepared.status(DeliveryOutcome::Navigated(
                DeliveryChannel::NativeDeepLink,
            )),
            manual: prepared.status(DeliveryOutcome::ManualDisplay),
        },
        relay_close_delay_ms: timings.relay_close_delay.as_millis() as u64,
        error_close_delay_ms: timings.error_close_delay.map(|d| d.as_millis() as u64),
    }
}

/// Server-rendered status block. The page script updates it in place.
fn status_markup(status: &StatusMessage, close_visible: bool) -> String {
    let tone = status.tone.as_str();
    let hidden = if close_visible { "" } else { " hidden" };

    format!(
        r#"<div id="status" class="container tone-{tone}">
        <h1 id="status-title">{title}</h1>
        <p id="status-detail" class="detail">{detail}</p>
        <dl id="copy-values" hidden></dl>
        <button id="close-button" type="button"{hidden}>Close window</button>
        <p id="close-hint" class="hint"{hidden}>You can close this window now.</p>
    </div>"#,
        title = escape_html(&status.title),
        detail = escape_html(status.detail.as_deref().unwrap_or_default()),
    )
}
