// src/server/response.rs
use hyper::header::{HeaderValue, ALLOW, CACHE_CONTROL, CONTENT_TYPE};
use hyper::{Body, Method, Response, StatusCode};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Not Found")]
    NotFound,

    #[error("Method Not Allowed")]
    MethodNotAllowed(Vec<Method>),

    #[error("CSRF token mismatch.")]
    TokenMismatch,

    #[error("Failed to encode response: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::NotFound => StatusCode::NOT_FOUND,
            HttpError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            // 419 "Page Expired", what browsers' CSRF handling expects
            HttpError::TokenMismatch => {
                StatusCode::from_u16(419).unwrap_or(StatusCode::FORBIDDEN)
            }
            HttpError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl From<HttpError> for Response<Body> {
    fn from(err: HttpError) -> Self {
        let status = err.status();

        let mut response = match &err {
            HttpError::Serialization(e) => {
                tracing::error!(%e, "response encoding failed");
                let mut response = Response::new(Body::from("Internal Server Error"));
                *response.status_mut() = status;
                response
            }
            _ => json_response(
                status,
                &ErrorBody {
                    message: err.to_string(),
                },
            ),
        };

        if let HttpError::MethodNotAllowed(allowed) = &err {
            let allow = allowed
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(ALLOW, value);
            }
        }

        response
    }
}

/// Serialize `value` as the JSON body of a fresh response.
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Body> {
    match serde_json::to_vec(value) {
        Ok(bytes) => {
            let mut response = Response::new(Body::from(bytes));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(e) => HttpError::Serialization(e).into(),
    }
}

pub fn empty_response(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

pub fn no_store(mut response: Response<Body>) -> Response<Body> {
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_mismatch_response() {
        let response: Response<Body> = HttpError::TokenMismatch.into();
        assert_eq!(response.status().as_u16(), 419);

        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], br#"{"message":"CSRF token mismatch."}"#);
    }

    #[test]
    fn test_method_not_allowed_sets_allow() {
        let response: Response<Body> =
            HttpError::MethodNotAllowed(vec![Method::GET, Method::HEAD]).into();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET, HEAD");
    }
}
