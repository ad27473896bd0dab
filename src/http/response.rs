//! HTTP response building module
//!
//! Turns loaded assets and pipeline errors into responses. Error bodies are
//! always `{"error": ...}` JSON and never carry paths or stack traces.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::cache::CachePolicy;
use super::mime;
use crate::asset::{AssetError, AssetKind, LoadedAsset};
use crate::config::HttpConfig;

/// Methods advertised on 405 responses
pub const ALLOWED_METHODS: &str = "GET";

/// Build 200 response for a loaded asset
///
/// Every successful read carries the same cache policy, JSON included.
pub fn build_asset_response(
    loaded: &LoadedAsset,
    http_config: &HttpConfig,
    cache_policy: CachePolicy,
) -> Response<Full<Bytes>> {
    let content_type = match loaded.kind {
        AssetKind::Json => mime::JSON_CONTENT_TYPE,
        AssetKind::Binary => mime::get_content_type(loaded.asset.extension.as_deref()),
    };

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type)
        .header("Content-Length", loaded.body.len())
        .header("Cache-Control", cache_policy.to_header_value())
        .header("X-Content-Type-Options", "nosniff")
        .header("Server", &http_config.server_name);

    if http_config.enable_cors {
        builder = builder.header("Access-Control-Allow-Origin", "*");
    }

    builder
        .body(Full::new(loaded.body.clone()))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            internal_error_fallback()
        })
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// Build JSON error response for a pipeline error
///
/// `details` is only added when `expose_error_details` is enabled.
pub fn build_error_response(err: &AssetError, http_config: &HttpConfig) -> Response<Full<Bytes>> {
    let message = err.public_message();
    let body = ErrorBody {
        error: &message,
        details: http_config.expose_error_details.then(|| err.to_string()),
    };

    let response = build_json_response(err.status(), &body, http_config);
    if matches!(err, AssetError::MethodNotAllowed { .. }) {
        let (mut parts, body) = response.into_parts();
        parts
            .headers
            .insert("Allow", hyper::header::HeaderValue::from_static(ALLOWED_METHODS));
        return Response::from_parts(parts, body);
    }
    response
}

/// Build JSON response
pub fn build_json_response<T: Serialize>(
    status: StatusCode,
    body: &T,
    http_config: &HttpConfig,
) -> Response<Full<Bytes>> {
    let json = match serde_json::to_vec(body) {
        Ok(j) => j,
        Err(e) => {
            crate::logger::log_error(&format!("Failed to serialize response: {e}"));
            return internal_error_fallback();
        }
    };

    let mut builder = Response::builder()
        .status(status)
        .header("Content-Type", mime::JSON_CONTENT_TYPE)
        .header("Content-Length", json.len())
        .header("Server", &http_config.server_name);

    if http_config.enable_cors {
        builder = builder.header("Access-Control-Allow-Origin", "*");
    }

    builder.body(Full::new(Bytes::from(json))).unwrap_or_else(|e| {
        log_build_error(status.as_str(), &e);
        internal_error_fallback()
    })
}

/// Build plain-text health probe response
pub fn build_health_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .header("Cache-Control", CachePolicy::NoStore.to_header_value())
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::from_static(body.as_bytes())))
        })
}

/// Built without the fallible builder, so it cannot fail itself
fn internal_error_fallback() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(
        br#"{"error":"Internal server error"}"#,
    )));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static(mime::JSON_CONTENT_TYPE),
    );
    response
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
