//! Session cookie middleware.
//!
//! Reads the client token from the configured cookie, or mints a new one,
//! and stores it in the request extensions for `ActionContext::session_token`.
//! New tokens are returned with `Set-Cookie`.
//!
//! Cookies are parsed and encoded with `biscotti`. A malformed `Cookie`
//! header is skipped with a warning rather than failing the request.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};
use axum::http::Request;
use axum::response::Response;
use biscotti::{Processor, ProcessorConfig, RequestCookies, ResponseCookie, ResponseCookies, SameSite};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::{DispatchResult, Middleware, Next};
use crate::config::SessionConfig;
use crate::container::{Injectable, ResolveError, Resolver};
use crate::services::SessionToken;

pub struct SessionCookie {
    cookie_name: String,
    processor: Processor,
}

impl SessionCookie {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            processor: ProcessorConfig::default().into(),
        }
    }

    fn read_token(&self, headers: &HeaderMap) -> Option<SessionToken> {
        let mut cookies = RequestCookies::new();
        for header in headers.get_all(COOKIE) {
            let Ok(header) = header.to_str() else {
                tracing::warn!("Cookie header is not valid UTF-8, ignoring it");
                continue;
            };
            if let Err(e) = cookies.extend_from_header(header, &self.processor) {
                tracing::warn!(error = %e, "A request cookie is invalid, ignoring it");
            }
        }
        let cookie = cookies.get(&self.cookie_name)?;
        SessionToken::parse(cookie.value())
    }

    fn issue(&self, response: &mut Response, token: &SessionToken) {
        let mut cookies = ResponseCookies::new();
        cookies.insert(
            ResponseCookie::new(self.cookie_name.clone(), token.to_string())
                .set_path("/")
                .set_http_only(true)
                .set_same_site(SameSite::Lax),
        );
        for value in cookies.header_values(&self.processor) {
            match HeaderValue::from_str(&value) {
                Ok(value) => {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                Err(_) => tracing::warn!(cookie = %self.cookie_name, "Invalid session cookie name"),
            }
        }
    }
}

impl std::fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCookie")
            .field("cookie_name", &self.cookie_name)
            .finish_non_exhaustive()
    }
}

impl Injectable for SessionCookie {
    fn inject(resolver: &mut Resolver<'_>) -> Result<Self, ResolveError> {
        let config: Arc<SessionConfig> = resolver.resolve()?;
        Ok(Self::new(config.cookie_name.clone()))
    }
}

impl Middleware for SessionCookie {
    fn name(&self) -> &'static str {
        "session-cookie"
    }

    fn handle<'a>(&'a self, mut request: Request<Body>, next: Next<'a>) -> BoxFuture<'a, DispatchResult> {
        async move {
            let (token, issued) = match self.read_token(request.headers()) {
                Some(token) => (token, false),
                None => (SessionToken::generate(), true),
            };
            request.extensions_mut().insert(token.clone());

            let mut response = next.run(request).await?;

            if issued {
                self.issue(&mut response, &token);
            }
            Ok(response)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{Endpoint, ErrorBoundary, MiddlewareChain};

    /// Echoes the token it was handed.
    struct Echo;

    impl Endpoint for Echo {
        fn call(&self, request: Request<Body>) -> BoxFuture<'_, DispatchResult> {
            async move {
                let token = request
                    .extensions()
                    .get::<SessionToken>()
                    .map(|t| t.to_string())
                    .unwrap_or_default();
                Ok(Response::new(Body::from(token)))
            }
            .boxed()
        }
    }

    async fn body(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn chain() -> MiddlewareChain {
        MiddlewareChain::new(ErrorBoundary::new(false)).with(Arc::new(SessionCookie::new("SESSIONID")))
    }

    #[tokio::test]
    async fn test_new_client_gets_cookie() {
        let response = chain().dispatch(Request::new(Body::empty()), &Echo).await;
        let cookie = response.headers()[SET_COOKIE].to_str().unwrap().to_string();
        let token = body(response).await;

        assert_eq!(token.len(), 32);
        let mut attributes = cookie.split(';').map(str::trim);
        assert_eq!(attributes.next(), Some(format!("SESSIONID={token}").as_str()));
        let attributes: Vec<&str> = attributes.collect();
        assert!(attributes.contains(&"Path=/"));
        assert!(attributes.contains(&"HttpOnly"));
        assert!(attributes.contains(&"SameSite=Lax"));
    }

    #[tokio::test]
    async fn test_known_client_keeps_token() {
        let token = SessionToken::generate();
        let request = Request::builder()
            .header(COOKIE, format!("theme=dark; SESSIONID={token}"))
            .body(Body::empty())
            .unwrap();
        let response = chain().dispatch(request, &Echo).await;

        assert!(response.headers().get(SET_COOKIE).is_none());
        assert_eq!(body(response).await, token.to_string());
    }

    #[tokio::test]
    async fn test_forged_token_is_replaced() {
        let request = Request::builder()
            .header(COOKIE, "SESSIONID=../../etc/passwd")
            .body(Body::empty())
            .unwrap();
        let response = chain().dispatch(request, &Echo).await;
        assert!(response.headers().get(SET_COOKIE).is_some());
    }

    #[tokio::test]
    async fn test_malformed_cookie_header_mints_new_token() {
        let request = Request::builder()
            .header(COOKIE, "SESSIONID")
            .body(Body::empty())
            .unwrap();
        let response = chain().dispatch(request, &Echo).await;

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_some());
        assert_eq!(body(response).await.len(), 32);
    }

    #[tokio::test]
    async fn test_cookies_across_headers_are_parsed() {
        let token = SessionToken::generate();
        let request = Request::builder()
            .header(COOKIE, "theme=dark")
            .header(COOKIE, format!("lang=en;  SESSIONID={token}"))
            .body(Body::empty())
            .unwrap();
        let response = chain().dispatch(request, &Echo).await;

        assert!(response.headers().get(SET_COOKIE).is_none());
        assert_eq!(body(response).await, token.to_string());
    }
}
