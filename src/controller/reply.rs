//! Response construction helpers for controller actions.
//!
//! Every reply carries permissive CORS headers and the preload `Link`
//! headers accumulated on the action context. A positive cache duration adds
//! `Expires` and `Cache-Control: public, max-age=<n>, proxy-revalidate`.

use axum::body::Body;
use axum::http::header::{
    HeaderMap, HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CACHE_CONTROL, CONTENT_TYPE, EXPIRES, LINK, LOCATION,
};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;
use serde_json::Value;

use crate::services::{TemplateError, Templates};

const HTML: &str = "text/html";
const JSON: &str = "application/json; charset=UTF-8";
const JSON_CACHE_SECS: u64 = 30;

/// Builder for a controller response.
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    cache_secs: Option<u64>,
    content_type: Option<String>,
    preload: Vec<String>,
}

impl Reply {
    pub(crate) fn new(preload: Vec<String>) -> Self {
        Self {
            status: StatusCode::OK,
            cache_secs: None,
            content_type: None,
            preload,
        }
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Cache duration in seconds. `0` disables cache headers.
    pub fn cache_for(mut self, secs: u64) -> Self {
        self.cache_secs = Some(secs);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Raw HTML body. Not cached unless `cache_for` is set.
    pub fn html(self, body: impl Into<String>) -> Response {
        self.finish(HTML, 0, body.into())
    }

    /// JSON body. Numeric strings are emitted as numbers; cached for 30s
    /// unless `cache_for` says otherwise.
    pub fn json<T: Serialize + ?Sized>(self, data: &T) -> Result<Response, serde_json::Error> {
        let value = coerce_numeric(serde_json::to_value(data)?);
        let body = serde_json::to_string(&value)?;
        Ok(self.finish(JSON, JSON_CACHE_SECS, body))
    }

    /// Render a template. Not cached unless `cache_for` is set.
    pub fn render<S: Serialize>(
        self,
        templates: &Templates,
        name: &str,
        data: S,
    ) -> Result<Response, TemplateError> {
        let body = templates.render(name, data)?;
        Ok(self.finish(HTML, 0, body))
    }

    /// `302 Found` pointing at `url`.
    pub fn redirect(self, url: &str) -> Response {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::FOUND;
        let headers = response.headers_mut();
        set_header(headers, LOCATION, url);
        apply_common_headers(headers, self.cache_secs.unwrap_or(0), &self.preload);
        response
    }

    fn finish(self, default_content_type: &str, default_cache: u64, body: String) -> Response {
        let mut response = Response::new(Body::from(body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        let content_type = self.content_type.as_deref().unwrap_or(default_content_type);
        set_header(headers, CONTENT_TYPE, content_type);
        apply_common_headers(headers, self.cache_secs.unwrap_or(default_cache), &self.preload);
        response
    }
}

fn apply_common_headers(headers: &mut HeaderMap, cache_secs: u64, preload: &[String]) {
    headers.append(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.append(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("*"));

    if cache_secs > 0 {
        if let Some(expires) = expires_after(cache_secs) {
            set_header(headers, EXPIRES, &expires);
        }
        set_header(
            headers,
            CACHE_CONTROL,
            &format!("public, max-age={cache_secs}, proxy-revalidate"),
        );
    }

    for url in preload {
        match HeaderValue::from_str(&format!("<{url}>; rel=preload;")) {
            Ok(value) => {
                headers.append(LINK, value);
            }
            Err(_) => tracing::warn!(url = %url, "Skipping preload with invalid characters"),
        }
    }
}

fn set_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!(header = %name, "Dropping header with invalid value"),
    }
}

/// HTTP date `secs` seconds from now.
fn expires_after(secs: u64) -> Option<String> {
    let delta = chrono::TimeDelta::try_seconds(i64::try_from(secs).ok()?)?;
    let at = chrono::Utc::now().checked_add_signed(delta)?;
    Some(at.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}

/// Turn numeric strings into JSON numbers, recursively.
fn coerce_numeric(value: Value) -> Value {
    match value {
        Value::String(s) => numeric(&s).unwrap_or(Value::String(s)),
        Value::Array(items) => Value::Array(items.into_iter().map(coerce_numeric).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, coerce_numeric(value)))
                .collect(),
        ),
        other => other,
    }
}

fn numeric(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(Value::from(int));
    }
    // rejects "inf", "NaN" and friends, which f64::from_str would accept
    if !trimmed
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
    {
        return None;
    }
    let float = trimmed.parse::<f64>().ok()?;
    serde_json::Number::from_f64(float).map(Value::Number)
}
