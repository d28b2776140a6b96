//! Response rendering for form submissions.
//!
//! The browser form gets a small page that alerts the notice and returns to the
//! form. API clients that accept JSON get the outcome as-is.

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::ACCEPT, request::Parts, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};

use crate::mail::MailOutcome;

/// Notice shown after a successful send.
pub const SUCCESS_NOTICE: &str = "Email sent successfully!";

/// How the outcome is presented to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoticeFormat {
    /// Alert-and-redirect page for the browser form.
    #[default]
    Html,
    /// `{ "ok": .., "message": .. }`
    Json,
}

impl NoticeFormat {
    /// Pick the format from the `Accept` header.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let wants_json = headers
            .get_all(ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.contains("application/json"));
        if wants_json {
            NoticeFormat::Json
        } else {
            NoticeFormat::Html
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for NoticeFormat
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Render an outcome with the given status.
pub fn render_outcome(outcome: &MailOutcome, status: StatusCode, format: NoticeFormat) -> Response {
    match format {
        NoticeFormat::Json => (status, Json(outcome.clone())).into_response(),
        NoticeFormat::Html => (status, Html(notice_page(outcome))).into_response(),
    }
}

/// Build the alert-and-redirect page.
pub fn notice_page(outcome: &MailOutcome) -> String {
    let notice = if outcome.ok {
        SUCCESS_NOTICE.to_string()
    } else {
        format!("Error: {}", outcome.message.as_deref().unwrap_or("Unknown error"))
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Contact form</title></head>
<body>
<noscript><p>{}</p><p><a href="/">Back to the form</a></p></noscript>
<script>
  alert("{}");
  window.location.href = "/";
</script>
</body>
</html>
"#,
        escape_html(&notice),
        escape_js_string(&notice)
    )
}

/// Escape text for a double-quoted JavaScript string inside an HTML `<script>`.
pub fn escape_js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // Keep `</script>` and HTML entities out of the script block.
            '<' | '>' | '&' | '\u{2028}' | '\u{2029}' => {
                out.push_str(&format!("\\u{:04x}", c as u32))
            }
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Escape text for HTML element content.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
