//! Request guard: bearer auth, JSON content-type gate, static headers, request log.

use crate::error::AppError;
use crate::extractors::BearerToken;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header::CONTENT_TYPE, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;

pub async fn guard(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    // Static headers only go on requests that passed the auth and content-type gates.
    let checked = check(&state, token.as_deref(), &method, request.headers());
    let response = match checked {
        Ok(()) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            for (name, value) in state.response_headers.iter() {
                headers.insert(name.clone(), value.clone());
            }
            response
        }
        Err(e) => e.into_response(),
    };

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

fn check(state: &AppState, token: Option<&str>, method: &Method, headers: &HeaderMap) -> Result<(), AppError> {
    if let Some(auth) = &state.schema.auth {
        if token != Some(auth.token.as_str()) {
            return Err(AppError::Unauthorized);
        }
    }
    if requires_json(method) && !is_json(headers) {
        return Err(AppError::UnsupportedMediaType);
    }
    Ok(())
}

fn requires_json(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn json_content_types() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        assert!(is_json(&headers));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(!is_json(&headers));
    }

    #[test]
    fn only_body_methods_gated() {
        assert!(requires_json(&Method::POST));
        assert!(requires_json(&Method::PATCH));
        assert!(!requires_json(&Method::GET));
        assert!(!requires_json(&Method::DELETE));
    }
}
