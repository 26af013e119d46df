//! The outermost stage: turns every failure into a rendered 500.
//!
//! # Responsibilities
//! - Catch `Err` results and panics from the rest of the chain
//! - Pick a rendering from the request's `Accept` header
//! - Log and count every caught failure
//!
//! # Formats
//! ```text
//! application/json                        → JSON document
//! application/xml, text/xml               → XML document
//! text/plain, text/css, text/javascript   → plain text
//! anything else / no header               → HTML page
//! ```
//!
//! Cause chains (and request headers on the HTML page) are only included
//! when `app.debug` is enabled.

use std::any::Any;
use std::fmt::{self, Write as _};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use futures_util::FutureExt;
use minijinja::{context, Environment};
use serde_json::json;

use super::Next;
use crate::error::DispatchError;
use crate::observability::metrics;

/// Rendering chosen for an error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFormat {
    Json,
    Xml,
    Plain,
    Html,
}

impl ErrorFormat {
    /// First recognized media type in `accept` wins; parameters are ignored.
    pub fn negotiate(accept: Option<&str>) -> Self {
        let Some(accept) = accept else {
            return ErrorFormat::Html;
        };

        accept
            .split(',')
            .filter_map(|item| {
                let media = item.split(';').next().unwrap_or_default().trim();
                match media.to_ascii_lowercase().as_str() {
                    "application/json" => Some(ErrorFormat::Json),
                    "application/xml" | "text/xml" => Some(ErrorFormat::Xml),
                    "text/plain" | "text/css" | "text/javascript" => Some(ErrorFormat::Plain),
                    _ => None,
                }
            })
            .next()
            .unwrap_or(ErrorFormat::Html)
    }

    fn content_type(self) -> &'static str {
        match self {
            ErrorFormat::Json => "application/json",
            ErrorFormat::Xml => "application/xml; charset=utf-8",
            ErrorFormat::Plain => "text/plain; charset=utf-8",
            ErrorFormat::Html => "text/html; charset=utf-8",
        }
    }
}

const ERROR_PAGE_NAME: &str = "error.html";

const ERROR_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{{ kind }}</title>
<style>body{font-family:sans-serif;margin:2em}h1{color:#b00}table{border-collapse:collapse}td{border:1px solid #ccc;padding:.2em .5em}</style>
</head>
<body>
<h1>{{ kind }}</h1>
<p class="message">{{ message }}</p>
<p class="request"><code>{{ method }} {{ path }}</code></p>
{%- if causes %}
<h2>Caused by</h2>
<ol class="causes">
{%- for cause in causes %}
<li>{{ cause }}</li>
{%- endfor %}
</ol>
{%- endif %}
{%- if headers %}
<h2>Request headers</h2>
<table class="headers">
{%- for name, value in headers %}
<tr><td>{{ name }}</td><td>{{ value }}</td></tr>
{%- endfor %}
</table>
{%- endif %}
</body>
</html>
"#;

/// What the boundary remembers about the request it is guarding.
struct RequestSummary {
    method: String,
    path: String,
    headers: HeaderMap,
}

/// Catches failures from everything inside it.
#[derive(Clone)]
pub struct ErrorBoundary {
    debug: bool,
    pages: Arc<Environment<'static>>,
}

impl ErrorBoundary {
    pub fn new(debug: bool) -> Self {
        let mut pages = Environment::new();
        pages.set_formatter(|out, _state, value| {
            let text = match value.as_str() {
                Some(text) => escape(text),
                None => escape(&value.to_string()),
            };
            out.write_str(&text)
                .map_err(|_| minijinja::Error::new(minijinja::ErrorKind::WriteFailure, "error page write failed"))
        });
        if let Err(e) = pages.add_template(ERROR_PAGE_NAME, ERROR_PAGE) {
            tracing::error!(error = %e, "Error page template is invalid, HTML errors fall back to plain text");
        }
        Self {
            debug,
            pages: Arc::new(pages),
        }
    }

    /// Run `next`, converting any error or panic into a 500 response.
    pub async fn wrap(&self, request: Request<Body>, next: Next<'_>) -> Response {
        let format = ErrorFormat::negotiate(request.headers().get(ACCEPT).and_then(|v| v.to_str().ok()));
        let summary = RequestSummary {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            headers: if self.debug {
                request.headers().clone()
            } else {
                HeaderMap::new()
            },
        };

        let error = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
            Ok(Ok(response)) => return response,
            Ok(Err(error)) => error,
            Err(payload) => DispatchError::Panic {
                message: panic_message(payload.as_ref()),
            },
        };

        tracing::error!(
            kind = error.kind(),
            error = %error,
            method = %summary.method,
            path = %summary.path,
            "Request failed"
        );
        metrics::record_failure(error.kind());

        self.render(&error, format, &summary)
    }

    fn render(&self, error: &DispatchError, format: ErrorFormat, summary: &RequestSummary) -> Response {
        let causes = if self.debug { error.causes() } else { Vec::new() };
        let (format, body) = match format {
            ErrorFormat::Json => (format, render_json(error, &causes)),
            ErrorFormat::Xml => (format, render_xml(error, &causes)),
            ErrorFormat::Plain => (format, render_plain(error, &causes)),
            ErrorFormat::Html => match render_html(&self.pages, error, &causes, summary) {
                Ok(page) => (format, page),
                Err(e) => {
                    tracing::warn!(error = %e, "Error page rendering failed");
                    (ErrorFormat::Plain, render_plain(error, &causes))
                }
            },
        };

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(format.content_type()));
        response
    }
}

impl fmt::Debug for ErrorBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorBoundary")
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn render_json(error: &DispatchError, causes: &[String]) -> String {
    let mut document = json!({
        "error": {
            "type": error.kind(),
            "message": error.to_string(),
            "status": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        }
    });
    if !causes.is_empty() {
        document["error"]["causes"] = json!(causes);
    }
    document.to_string()
}

fn render_xml(error: &DispatchError, causes: &[String]) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<error>");
    let _ = write!(
        out,
        "<type>{}</type><message>{}</message><status>500</status>",
        escape(error.kind()),
        escape(&error.to_string())
    );
    if !causes.is_empty() {
        out.push_str("<causes>");
        for cause in causes {
            let _ = write!(out, "<cause>{}</cause>", escape(cause));
        }
        out.push_str("</causes>");
    }
    out.push_str("</error>\n");
    out
}

fn render_plain(error: &DispatchError, causes: &[String]) -> String {
    let mut out = format!("500 Internal Server Error\n{}: {}\n", error.kind(), error);
    for cause in causes {
        let _ = writeln!(out, "  caused by: {cause}");
    }
    out
}

fn render_html(
    pages: &Environment<'static>,
    error: &DispatchError,
    causes: &[String],
    summary: &RequestSummary,
) -> Result<String, minijinja::Error> {
    let headers: Vec<(String, String)> = summary
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    pages.get_template(ERROR_PAGE_NAME)?.render(context! {
        kind => error.kind(),
        message => error.to_string(),
        method => summary.method,
        path => summary.path,
        causes => causes,
        headers => headers,
    })
}

/// Escape text for HTML and XML element content and attribute values.
fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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
