// src/server/handler.rs
use hyper::header::{HeaderValue, SET_COOKIE};
use hyper::{Body, Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::Config;
use crate::csrf::{generate_token, CookieSettings};
use crate::health::HealthChecker;
use crate::metrics::{MetricsCollector, Timer};
use crate::server::response::{empty_response, json_response, no_store, HttpError};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Everything the routes need, shared across connections.
pub struct AppState {
    pub checker: HealthChecker,
    pub health_path: String,
    pub cookie: CookieSettings,
    pub metrics: Option<Arc<MetricsCollector>>,
}

impl AppState {
    pub fn new(checker: HealthChecker, config: &Config) -> Self {
        Self {
            checker,
            health_path: config.health.path.clone(),
            cookie: CookieSettings::from_config(&config.csrf),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

#[derive(Clone)]
pub struct RequestHandler {
    state: Arc<AppState>,
}

impl RequestHandler {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let timer = Timer::new();
        let method = req.method().clone();
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let path = req.uri().path().to_owned();

        let span = tracing::info_span!("request", %request_id, method = %method, path = %path);

        let mut response = self.route(&method, &path).instrument(span.clone()).await;

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        let elapsed = timer.elapsed();
        if let Some(metrics) = &self.state.metrics {
            metrics.record_request(method.as_str(), response.status().as_u16(), elapsed);
        }
        span.in_scope(|| tracing::debug!(status = %response.status(), "served in {:?}", elapsed));

        response
    }

    async fn route(&self, method: &Method, path: &str) -> Response<Body> {
        if path == self.state.health_path {
            return match *method {
                Method::GET => self.health(false).await,
                Method::HEAD => self.health(true).await,
                _ => HttpError::MethodNotAllowed(vec![Method::GET, Method::HEAD]).into(),
            };
        }

        if path == self.state.cookie.route {
            return match *method {
                Method::GET => self.csrf_cookie(),
                _ => HttpError::MethodNotAllowed(vec![Method::GET]).into(),
            };
        }

        HttpError::NotFound.into()
    }

    async fn health(&self, head: bool) -> Response<Body> {
        let (report, code) = self.state.checker.check().await;

        let response = if head {
            empty_response(code)
        } else {
            json_response(code, &report)
        };
        no_store(response)
    }

    fn csrf_cookie(&self) -> Response<Body> {
        let token = generate_token();
        let mut response = empty_response(StatusCode::NO_CONTENT);

        match HeaderValue::from_str(&self.state.cookie.set_cookie(&token)) {
            Ok(value) => {
                response.headers_mut().insert(SET_COOKIE, value);
            }
            Err(e) => tracing::error!(%e, "invalid CSRF cookie header"),
        }
        no_store(response)
    }
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move { Ok(handler.handle(req).await) })
    }
}
