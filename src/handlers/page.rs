use axum::response::Html;
use serde::Serialize;

const STYLE: &str = r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #f5f6f8;
            color: #1f2933;
            display: flex;
            align-items: center;
            justify-content: center;
            min-height: 100vh;
            margin: 0;
            padding: 20px;
            box-sizing: border-box;
        }
        .container { text-align: center; max-width: 420px; }
        .tone-success h1 { color: #1a7f37; }
        .tone-error h1 { color: #b42318; }
        .detail { color: #52606d; }
        dl { text-align: left; background: #fff; padding: 12px 16px; border-radius: 8px; }
        dd { font-family: monospace; word-break: break-all; margin: 0 0 8px; user-select: all; }
        button { padding: 8px 16px; border-radius: 6px; border: 1px solid #cbd2d9; background: #fff; }
        .hint { font-size: 14px; color: #7b8794; }
"#;

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// JSON safe to place inside a `<script>` element.
pub fn script_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(serde_json::to_string(value)?
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}

/// Wraps `body` (already escaped) in the shared page shell.
pub fn render_page(title: &str, body: &str, script: Option<&str>) -> Html<String> {
    let script = script
        .map(|s| format!("<script>{}</script>", s))
        .unwrap_or_default();

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <style>{STYLE}</style>
</head>
<body>
{body}
{script}
</body>
</html>"#,
        title = escape_html(title),
    ))
}
