//! Asset lookup endpoint
//!
//! Answers with the URL a client should fetch an asset from, after checking
//! that the file exists under the endpoint's directory. Never returns bytes.

use crate::asset::{reader, AssetError};
use crate::config::AppState;
use crate::handler::router::RequestContext;
use crate::http;
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

#[derive(Serialize)]
struct LookupBody {
    url: String,
}

/// Resolve `name` under `<root>/<dir>` and reply with `<link_prefix>/<name>`
pub async fn handle_lookup(
    ctx: &RequestContext<'_>,
    state: &AppState,
    dir: &str,
    link_prefix: &str,
    name: &str,
) -> Result<Response<Full<Bytes>>, AssetError> {
    if name.is_empty() {
        return Err(AssetError::bad_request("No file path provided"));
    }

    let base = state.asset_root.subdir(dir)?;
    let resolved = base.resolve(name).inspect_err(|err| {
        if matches!(err, AssetError::AccessDenied) {
            logger::log_access_denied(&ctx.peer_addr, name);
        }
    })?;

    match reader::inspect(&base, &resolved).await {
        Ok(_) => {
            let body = LookupBody {
                url: link_url(link_prefix, name),
            };
            Ok(http::build_json_response(
                StatusCode::OK,
                &body,
                &state.config.http,
            ))
        }
        Err(AssetError::NotFound) => Ok(http::build_json_response(
            StatusCode::NOT_FOUND,
            &serde_json::json!({ "error": "Image not found" }),
            &state.config.http,
        )),
        Err(err) => Err(err),
    }
}

/// `<link_prefix>/<name>` with every segment of `name` percent-encoded
fn link_url(link_prefix: &str, name: &str) -> String {
    let encoded: Vec<_> = name
        .trim_start_matches('/')
        .split('/')
        .map(urlencoding::encode)
        .collect();
    format!("{}/{}", link_prefix.trim_end_matches('/'), encoded.join("/"))
}
