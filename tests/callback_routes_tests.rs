//! Router-level tests for the popup callback page, the authorize redirect and
//! the code exchange guard rails.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use oauth_popup_relay::models::{AppConfig, AppState};
use oauth_popup_relay::relay::params::parse_query;
use oauth_popup_relay::server::create_app;
use serde_json::Value;
use tower::ServiceExt;

fn test_app(extra: &[(&str, &str)]) -> Router {
    let mut env: Vec<(String, String)> = [
        ("OAUTH_CLIENT_ID", "client-id"),
        ("OAUTH_CLIENT_SECRET", "client-secret"),
        ("OAUTH_REDIRECT_URL", "https://app.example.com/oauth/callback"),
        ("OAUTH_AUTHORIZE_URL", "https://auth.marketplace.example/oauth2/authorize"),
        ("OAUTH_TOKEN_URL", "https://api.marketplace.example/oauth2/token"),
        ("APP_ORIGIN", "https://app.example.com"),
        ("APP_DEEP_LINK_SCHEME", "sellerapp"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    env.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));

    let config = AppConfig::from_lookup(|key| {
        env.iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
    .expect("test config should load");

    create_app(AppState::new(config))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

/// Pulls the embedded JSON the page script runs from.
fn embedded_page(html: &str) -> Value {
    let marker = r#"<script id="relay-plan" type="application/json">"#;
    let start = html.find(marker).expect("plan script present") + marker.len();
    let end = start + html[start..].find("</script>").unwrap();
    serde_json::from_str(&html[start..end]).unwrap()
}

#[tokio::test]
async fn test_callback_page_success() {
    let app = test_app(&[]);
    let (status, html) = get(&app, "/oauth/callback?code=abc123&state=xyz789").await;

    assert_eq!(status, StatusCode::OK);
    let page = embedded_page(&html);
    let plan = &page["plan"];

    assert_eq!(plan["disposition"], "success");
    assert_eq!(
        plan["message"],
        serde_json::json!({
            "source": "oauth_callback",
            "success": true,
            "code": "abc123",
            "state": "xyz789",
        })
    );
    assert_eq!(plan["target_origin"], "https://app.example.com");
    assert_eq!(
        plan["channels"],
        serde_json::json!([
            "opener_window",
            "native_deep_link",
            "web_app_redirect",
            "manual_display"
        ])
    );
    assert_eq!(
        plan["deep_link"],
        "sellerapp://oauth/callback?code=abc123&state=xyz789"
    );
    assert_eq!(
        plan["web_redirect"],
        "https://app.example.com/?oauth_code=abc123&oauth_state=xyz789"
    );
    assert_eq!(plan["deep_link_fallback_ms"], 2000);

    let close_delay = page["relay_close_delay_ms"].as_u64().unwrap();
    assert!((2000..=3000).contains(&close_delay));
    assert!(page["error_close_delay_ms"].is_null());
    assert_eq!(page["statuses"]["relayed"]["title"], "Sign-in complete");
}

#[tokio::test]
async fn test_callback_page_provider_error() {
    let app = test_app(&[]);
    let (status, html) = get(
        &app,
        "/oauth/callback?error=access_denied&error_description=User%20declined",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let page = embedded_page(&html);

    assert_eq!(page["plan"]["disposition"], "provider_error");
    assert_eq!(
        page["plan"]["message"],
        serde_json::json!({
            "source": "oauth_callback",
            "success": false,
            "error": "access_denied",
            "error_description": "User declined",
        })
    );
    assert_eq!(
        page["statuses"]["relayed"]["detail"],
        "access_denied: User declined"
    );
}

#[tokio::test]
async fn test_callback_page_malformed() {
    let app = test_app(&[]);
    let (status, html) = get(&app, "/oauth/callback").await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Invalid request"));

    let page = embedded_page(&html);
    assert_eq!(page["plan"]["disposition"], "malformed_callback");
    assert!(page["plan"]["message"].is_null());
    assert_eq!(page["plan"]["channels"], serde_json::json!([]));
    assert!(page["error_close_delay_ms"].is_null());
}

#[tokio::test]
async fn test_callback_page_escapes_provider_text() {
    let app = test_app(&[]);
    let (_, html) = get(
        &app,
        "/oauth/callback?error=%3C%2Fscript%3E%3Cscript%3Ealert(1)%3C%2Fscript%3E",
    )
    .await;

    assert!(!html.contains("<script>alert(1)"));
    let page = embedded_page(&html);
    assert_eq!(
        page["plan"]["message"]["error"],
        "</script><script>alert(1)</script>"
    );
}

#[tokio::test]
async fn test_callback_page_honours_channel_config() {
    let app = test_app(&[("RELAY_CHANNELS", "opener"), ("ERROR_CLOSE_DELAY_MS", "4000")]);

    let (_, html) = get(&app, "/oauth/callback?code=abc123&state=xyz789").await;
    let page = embedded_page(&html);
    assert_eq!(
        page["plan"]["channels"],
        serde_json::json!(["opener_window", "manual_display"])
    );
    assert!(page["plan"]["deep_link"].is_null());
    assert_eq!(
        page["statuses"]["manual"]["copy_values"],
        serde_json::json!([["code", "abc123"], ["state", "xyz789"]])
    );

    let (_, html) = get(&app, "/oauth/callback?state=xyz789").await;
    assert_eq!(embedded_page(&html)["error_close_delay_ms"], 4000);
}

#[tokio::test]
async fn test_authorize_redirects_to_provider() {
    let app = test_app(&[]);
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/oauth/authorize")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(response.headers().contains_key(header::SET_COOKIE));

    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("https://auth.marketplace.example/oauth2/authorize?"));
    let params = parse_query(location.split_once('?').unwrap().1);
    assert_eq!(params["client_id"], "client-id");
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["code_challenge_method"], "S256");
    assert!(!params["state"].is_empty());
}

#[tokio::test]
async fn test_exchange_without_pending_sign_in() {
    let app = test_app(&[]);
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/oauth/exchange")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"code":"abc123","state":"xyz789"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "missing_session");
}

#[tokio::test]
async fn test_exchange_rejects_wrong_state_once() {
    let app = test_app(&[]);
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/oauth/authorize")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let exchange = |state: &str| {
        Request::builder()
            .method("POST")
            .uri("/oauth/exchange")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, cookie.clone())
            .body(Body::from(format!(
                r#"{{"code":"abc123","state":"{}"}}"#,
                state
            )))
            .unwrap()
    };

    let response = app.clone().oneshot(exchange("forged")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "state_mismatch");

    // The pending sign-in was consumed by the failed attempt.
    let response = app.clone().oneshot(exchange("forged")).await.unwrap();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "missing_session");
}

#[tokio::test]
async fn test_landing_shows_relayed_provider_error() {
    let app = test_app(&[]);
    let (status, html) = get(
        &app,
        "/?oauth_error=access_denied&oauth_error_description=User+declined",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Sign-in failed"));
    assert!(html.contains("access_denied: User declined"));
}

#[tokio::test]
async fn test_landing_without_params_serves_sign_in() {
    let app = test_app(&[]);
    let (status, html) = get(&app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(r#"id="sign-in""#));
    assert!(html.contains(r#""source":"oauth_callback""#));
    assert!(html.contains(r#""popup_origin":"https://app.example.com""#));
}

#[tokio::test]
async fn test_landing_with_code_but_no_session() {
    let app = test_app(&[]);
    let (status, html) = get(&app, "/?oauth_code=abc123&oauth_state=xyz789").await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Sign-in failed"));
    assert!(html.contains("no pending sign-in found in session"));
}
