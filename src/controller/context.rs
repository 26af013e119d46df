//! Per-request data handed to a controller action.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → parts (method, uri, headers, extensions)
//!     → query string          → params
//!     → urlencoded/JSON body  → post params
//!     → multipart body        → post params + files
//!     → matched route         → args (captures + defaults)
//! ```
//!
//! Every body kind is buffered through the same `max_body_bytes` bound
//! before it is parsed.
//!
//! The `_METHOD` override field is removed from the post params and files
//! before the action sees them.

use std::collections::HashMap;

use axum::body::{to_bytes, Body, Bytes};
use axum::extract::{FromRequest, Multipart};
use axum::http::header::{HeaderMap, CONTENT_TYPE, HOST};
use axum::http::request::Parts;
use axum::http::{Method, Request, Uri};
use axum::response::Response;
use serde_json::Value;

use super::reply::Reply;
use crate::error::DispatchError;
use crate::routing::PathParams;
use crate::services::SessionToken;

const METHOD_OVERRIDE_FIELD: &str = "_METHOD";

/// A file received through a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

enum BodyKind {
    UrlEncoded,
    Json,
    Multipart,
    Ignored,
}

impl BodyKind {
    fn of(headers: &HeaderMap) -> Self {
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if content_type.starts_with("application/x-www-form-urlencoded") {
            BodyKind::UrlEncoded
        } else if content_type.starts_with("multipart/form-data") {
            BodyKind::Multipart
        } else if content_type.starts_with("application/json") {
            BodyKind::Json
        } else {
            BodyKind::Ignored
        }
    }
}

/// Request data, route arguments and response helpers for one action call.
#[derive(Debug)]
pub struct ActionContext {
    parts: Parts,
    query: HashMap<String, String>,
    form: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
    args: PathParams,
    preload: Vec<String>,
}

impl ActionContext {
    /// Consume a request and the arguments of the route it matched.
    pub async fn from_request(
        request: Request<Body>,
        args: PathParams,
        max_body_bytes: usize,
    ) -> Result<Self, DispatchError> {
        let (parts, body) = request.into_parts();
        let query = parts
            .uri
            .query()
            .map(|q| parse_urlencoded(q.as_bytes()))
            .unwrap_or_default();

        let mut form = HashMap::new();
        let mut files = HashMap::new();

        match BodyKind::of(&parts.headers) {
            BodyKind::UrlEncoded => {
                let bytes = to_bytes(body, max_body_bytes)
                    .await
                    .map_err(DispatchError::body)?;
                form = parse_urlencoded(&bytes);
            }
            BodyKind::Json => {
                let bytes = to_bytes(body, max_body_bytes)
                    .await
                    .map_err(DispatchError::body)?;
                form = parse_json_object(&bytes)?;
            }
            BodyKind::Multipart => {
                let bytes = to_bytes(body, max_body_bytes)
                    .await
                    .map_err(DispatchError::body)?;
                let request = Request::from_parts(parts.clone(), Body::from(bytes));
                let mut multipart = Multipart::from_request(request, &())
                    .await
                    .map_err(DispatchError::body)?;
                while let Some(field) = multipart.next_field().await.map_err(DispatchError::body)? {
                    let name = field.name().unwrap_or_default().to_string();
                    let file_name = field.file_name().map(str::to_string);
                    let content_type = field.content_type().map(str::to_string);
                    let data = field.bytes().await.map_err(DispatchError::body)?;

                    if file_name.is_some() {
                        files.insert(
                            name,
                            UploadedFile {
                                file_name,
                                content_type,
                                data,
                            },
                        );
                    } else {
                        form.insert(name, String::from_utf8_lossy(&data).into_owned());
                    }
                }
            }
            BodyKind::Ignored => {}
        }

        form.remove(METHOD_OVERRIDE_FIELD);
        files.remove(METHOD_OVERRIDE_FIELD);

        Ok(Self {
            parts,
            query,
            form,
            files,
            args,
            preload: Vec::new(),
        })
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Route argument: a path capture or a declared default.
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(String::as_str)
    }

    pub fn args(&self) -> &PathParams {
        &self.args
    }

    /// Query-string parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.query
    }

    /// Form or JSON body field.
    pub fn post_param(&self, name: &str) -> Option<&str> {
        self.form.get(name).map(String::as_str)
    }

    pub fn post_params(&self) -> &HashMap<String, String> {
        &self.form
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }

    pub fn files(&self) -> &HashMap<String, UploadedFile> {
        &self.files
    }

    /// Header value, if present and valid UTF-8.
    pub fn header(&self, name: impl axum::http::header::AsHeaderName) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Token assigned by the session cookie middleware, if it ran.
    pub fn session_token(&self) -> Option<&SessionToken> {
        self.parts.extensions.get::<SessionToken>()
    }

    /// Queue a `Link: <url>; rel=preload;` header on the reply.
    pub fn preload(&mut self, url: impl Into<String>) -> &mut Self {
        self.preload.push(url.into());
        self
    }

    /// Scheme and host the client used, e.g. `http://example.com:8080`.
    pub fn full_host(&self) -> String {
        let scheme = self
            .parts
            .uri
            .scheme_str()
            .or_else(|| self.header("x-forwarded-proto"))
            .unwrap_or("http");
        let host = self
            .header(HOST)
            .or_else(|| self.parts.uri.authority().map(|a| a.as_str()))
            .unwrap_or("localhost");
        format!("{scheme}://{host}")
    }

    /// Absolute URL of the current path, without the query string.
    pub fn full_path(&self) -> String {
        format!("{}{}", self.full_host(), self.path())
    }

    /// Start a response carrying the queued preloads.
    pub fn reply(&self) -> Reply {
        Reply::new(self.preload.clone())
    }

    /// `302 Found` to `url`.
    pub fn redirect(&self, url: &str) -> Response {
        self.reply().redirect(url)
    }
}

fn parse_urlencoded(raw: &[u8]) -> HashMap<String, String> {
    form_urlencoded::parse(raw).into_owned().collect()
}

/// Top-level scalar fields of a JSON object body.
fn parse_json_object(raw: &[u8]) -> Result<HashMap<String, String>, DispatchError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(HashMap::new());
    }
    let value: Value = serde_json::from_slice(raw).map_err(DispatchError::body)?;
    let Value::Object(map) = value else {
        return Err(DispatchError::body("JSON body must be an object"));
    };

    Ok(map
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, text)
        })
        .collect())
}
