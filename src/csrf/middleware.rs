// src/csrf/middleware.rs
use crate::config::CsrfConfig;
use crate::csrf::exemptions::CsrfExemptions;
use crate::csrf::token::{cookie_value, request_token, tokens_match};
use crate::metrics::MetricsCollector;
use crate::server::HttpError;
use futures::future::BoxFuture;
use hyper::{Body, Method, Request, Response};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Wraps a service with double-submit cookie verification.
#[derive(Clone)]
pub struct CsrfLayer {
    exemptions: Arc<CsrfExemptions>,
    cookie_name: Arc<str>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl CsrfLayer {
    pub fn new(exemptions: CsrfExemptions, cookie_name: impl Into<String>) -> Self {
        Self {
            exemptions: Arc::new(exemptions),
            cookie_name: Arc::from(cookie_name.into()),
            metrics: None,
        }
    }

    pub fn from_config(config: &CsrfConfig) -> Self {
        Self::new(
            CsrfExemptions::new(config.except.iter().cloned()),
            config.cookie_name.clone(),
        )
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl<S> Layer<S> for CsrfLayer {
    type Service = VerifyCsrfToken<S>;

    fn layer(&self, inner: S) -> Self::Service {
        VerifyCsrfToken {
            inner,
            exemptions: self.exemptions.clone(),
            cookie_name: self.cookie_name.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

#[derive(Clone)]
pub struct VerifyCsrfToken<S> {
    inner: S,
    exemptions: Arc<CsrfExemptions>,
    cookie_name: Arc<str>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl<S> VerifyCsrfToken<S> {
    fn is_reading(method: &Method) -> bool {
        matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
    }

    fn passes(&self, req: &Request<Body>) -> bool {
        if Self::is_reading(req.method()) {
            return true;
        }

        let path = req.uri().path();
        if self.exemptions.is_exempt(path) {
            debug!("CSRF check skipped for exempt path {}", path);
            return true;
        }

        let headers = req.headers();
        match (cookie_value(headers, &self.cookie_name), request_token(headers)) {
            (Some(expected), Some(given)) => tokens_match(expected, given),
            _ => false,
        }
    }
}

impl<S> Service<Request<Body>> for VerifyCsrfToken<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        if self.passes(&req) {
            return Box::pin(self.inner.call(req));
        }

        warn!(
            method = %req.method(),
            path = %req.uri().path(),
            "CSRF token mismatch"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_csrf_rejection();
        }

        let response: Response<Body> = HttpError::TokenMismatch.into();
        Box::pin(futures::future::ready(Ok(response)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::COOKIE;
    use hyper::StatusCode;
    use std::convert::Infallible;
    use tower::ServiceExt;

    #[derive(Clone)]
    struct Handled;

    impl Service<Request<Body>> for Handled {
        type Response = Response<Body>;
        type Error = Infallible;
        type Future = futures::future::Ready<Result<Response<Body>, Infallible>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: Request<Body>) -> Self::Future {
            futures::future::ready(Ok(Response::new(Body::from("handled"))))
        }
    }

    fn protected() -> VerifyCsrfToken<Handled> {
        CsrfLayer::new(
            CsrfExemptions::new(["sanctum/csrf-cookie", "api/webhooks/*"]),
            "XSRF-TOKEN",
        )
        .layer(Handled)
    }

    fn post(path: &str) -> hyper::http::request::Builder {
        Request::builder().method(Method::POST).uri(path)
    }

    #[tokio::test]
    async fn test_reading_methods_pass() {
        for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
            let req = Request::builder()
                .method(method)
                .uri("/orders")
                .body(Body::empty())
                .unwrap();
            let res = protected().oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_exempt_path_needs_no_token() {
        let req = post("/api/webhooks/stripe").body(Body::empty()).unwrap();
        let res = protected().oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let body = hyper::body::to_bytes(res.into_body()).await.unwrap();
        assert_eq!(&body[..], b"handled");
    }

    #[tokio::test]
    async fn test_missing_token_rejected() {
        let req = post("/orders").body(Body::empty()).unwrap();
        let res = protected().oneshot(req).await.unwrap();
        assert_eq!(res.status().as_u16(), 419);
    }

    #[tokio::test]
    async fn test_matching_token_accepted() {
        let req = post("/orders")
            .header(COOKIE, "XSRF-TOKEN=abc123")
            .header("X-XSRF-TOKEN", "abc123")
            .body(Body::empty())
            .unwrap();
        let res = protected().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_mismatched_token_rejected() {
        let req = post("/orders")
            .header(COOKIE, "XSRF-TOKEN=abc123")
            .header("X-CSRF-TOKEN", "zzz999")
            .body(Body::empty())
            .unwrap();
        let res = protected().oneshot(req).await.unwrap();
        assert_eq!(res.status().as_u16(), 419);
    }
}
