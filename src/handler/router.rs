//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method gate, endpoint matching,
//! token gate, path extraction, and dispatch into the asset pipeline.

use crate::asset::{self, AssetError};
use crate::config::{AppState, Endpoint, EndpointHandler};
use crate::handler::lookup;
use crate::http::{self, query};
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::HeaderMap;
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub authorization: Option<&'a str>,
    pub peer_addr: SocketAddr,
}

/// Main entry point for HTTP request handling
///
/// Never fails: every pipeline error becomes a JSON error response here.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    // GET only: the body is never read
    let (parts, _) = req.into_parts();
    let method = &parts.method;

    let ctx = RequestContext {
        path: parts.uri.path(),
        query: parts.uri.query(),
        authorization: header_str(&parts.headers, "authorization"),
        peer_addr,
    };

    let result = if *method == Method::GET {
        route_request(&ctx, &state).await
    } else {
        Err(AssetError::MethodNotAllowed {
            method: method.to_string(),
        })
    };

    let response = result.unwrap_or_else(|err| {
        report_error(&ctx, &err);
        http::build_error_response(&err, &state.config.http)
    });

    if state.access_log() {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            method.to_string(),
            ctx.path.to_string(),
        )
        .with_query(ctx.query)
        .with_headers(
            header_str(&parts.headers, "referer"),
            header_str(&parts.headers, "user-agent"),
        );
        entry.http_version = version_label(parts.version).to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        entry.content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route request based on path and configuration
async fn route_request(
    ctx: &RequestContext<'_>,
    state: &Arc<AppState>,
) -> Result<Response<Full<Bytes>>, AssetError> {
    let routes = &state.config.routes;

    // 0. Health check endpoints (highest priority, always fast)
    if routes.health.enabled {
        if ctx.path == routes.health.liveness_path {
            return Ok(http::build_health_response(StatusCode::OK, "ok"));
        }
        if ctx.path == routes.health.readiness_path {
            return Ok(readiness(state).await);
        }
    }

    // 1. Configured endpoints
    let Some((prefix, endpoint)) = match_endpoint(state, ctx.path) else {
        return Ok(http::build_json_response(
            StatusCode::NOT_FOUND,
            &serde_json::json!({ "error": "Not found" }),
            &state.config.http,
        ));
    };

    // 2. Token gate runs before anything looks at the requested path
    if endpoint.require_token {
        check_token(ctx.authorization, state.config.auth.secret_token.as_deref())?;
    }

    // 3. Dispatch
    match &endpoint.handler {
        EndpointHandler::CatchAll { param } => {
            let remainder = query::path_remainder(ctx.path, prefix)
                .ok_or_else(|| AssetError::bad_request("Invalid file path"))?;
            let raw = if remainder.is_empty() {
                query::query_param(ctx.query, param).unwrap_or_default()
            } else {
                remainder
            };
            serve_asset(ctx, state, &raw).await
        }
        EndpointHandler::Query { param } => {
            let raw = query::query_param(ctx.query, param).unwrap_or_default();
            serve_asset(ctx, state, &raw).await
        }
        EndpointHandler::Lookup {
            param,
            dir,
            link_prefix,
        } => {
            let name = query::query_param(ctx.query, param).unwrap_or_default();
            lookup::handle_lookup(ctx, state, dir, link_prefix, &name).await
        }
    }
}

/// Run the asset pipeline for one untrusted path
async fn serve_asset(
    ctx: &RequestContext<'_>,
    state: &Arc<AppState>,
    raw: &str,
) -> Result<Response<Full<Bytes>>, AssetError> {
    if raw.is_empty() {
        return Err(AssetError::bad_request("No file path provided"));
    }

    let loaded = asset::load(&state.asset_root, raw, state.config.assets.max_file_size)
        .await
        .inspect_err(|err| {
            if matches!(err, AssetError::AccessDenied) {
                logger::log_access_denied(&ctx.peer_addr, raw);
            }
        })?;

    logger::log_debug(&format!(
        "Serving {} ({} bytes)",
        loaded.asset.path.display(),
        loaded.size
    ));

    Ok(http::build_asset_response(
        &loaded,
        &state.config.http,
        state.cache_policy,
    ))
}

/// Exact match first, then the longest prefix ending on a segment boundary
///
/// Prefixes compare ASCII case-insensitively: the config loader lowercases
/// table keys, so `/api/getImage` is stored as `/api/getimage`.
pub fn match_endpoint<'s>(state: &'s AppState, path: &str) -> Option<(&'s str, &'s Endpoint)> {
    let endpoints = &state.config.routes.endpoints;

    if let Some((prefix, endpoint)) = endpoints
        .iter()
        .find(|(prefix, _)| prefix.eq_ignore_ascii_case(path))
    {
        return Some((prefix.as_str(), endpoint));
    }

    endpoints
        .iter()
        .filter(|(prefix, _)| query::matches_prefix(path, prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(prefix, endpoint)| (prefix.as_str(), endpoint))
}

/// Compare the `Authorization` header against the configured secret
///
/// With no secret configured, a gated endpoint refuses everyone.
pub fn check_token(provided: Option<&str>, secret: Option<&str>) -> Result<(), AssetError> {
    match (provided, secret) {
        (Some(token), Some(secret)) if constant_time_eq(token.as_bytes(), secret.as_bytes()) => {
            Ok(())
        }
        _ => Err(AssetError::Forbidden),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

async fn readiness(state: &AppState) -> Response<Full<Bytes>> {
    let root_ready = tokio::fs::metadata(state.asset_root.path())
        .await
        .is_ok_and(|m| m.is_dir());
    if root_ready {
        http::build_health_response(StatusCode::OK, "ok")
    } else {
        logger::log_warning("Readiness check failed: asset root is not a directory");
        http::build_health_response(StatusCode::SERVICE_UNAVAILABLE, "asset root unavailable")
    }
}

fn report_error(ctx: &RequestContext<'_>, err: &AssetError) {
    if err.is_internal() {
        logger::log_error(&format!(
            "{} from {}: {err}",
            logger::sanitize_field(ctx.path),
            ctx.peer_addr
        ));
    } else if matches!(err, AssetError::Forbidden) {
        logger::log_warning(&format!(
            "Token check failed for {} from {}",
            logger::sanitize_field(ctx.path),
            ctx.peer_addr
        ));
    }
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn version_label(version: hyper::Version) -> &'static str {
    if version == hyper::Version::HTTP_10 {
        "1.0"
    } else if version == hyper::Version::HTTP_2 {
        "2"
    } else {
        "1.1"
    }
}
