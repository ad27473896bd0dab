//! Asset reader
//!
//! Loads a sanitized path into memory. Directories are never served, symlinks
//! are followed only while they stay inside the root, and JSON is validated
//! before it can reach a client.

use std::io;

use hyper::body::Bytes;
use serde::de::IgnoredAny;
use tokio::fs;

use super::error::AssetError;
use super::sanitize::{is_within, AssetRoot, ResolvedAsset};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// How the body was read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// BOM-stripped, parse-checked UTF-8 JSON text
    Json,
    Binary,
}

/// A file read into memory, ready for the response composer
#[derive(Debug, Clone)]
pub struct LoadedAsset {
    pub asset: ResolvedAsset,
    pub kind: AssetKind,
    /// Size on disk; for JSON this may exceed `body.len()` by the BOM
    pub size: u64,
    pub body: Bytes,
}

/// Check that `asset` names a regular file inside `root`, without reading it
pub async fn inspect(root: &AssetRoot, asset: &ResolvedAsset) -> Result<u64, AssetError> {
    let metadata = match fs::metadata(&asset.path).await {
        Ok(m) => m,
        Err(e) if is_missing(&e) => return Err(AssetError::NotFound),
        Err(e) => return Err(AssetError::Io(e)),
    };

    if !metadata.is_file() {
        return Err(AssetError::NotFound);
    }

    // Lexical checks already passed; this catches symlinks pointing out of the root
    let canonical_root = fs::canonicalize(root.path()).await?;
    let canonical = fs::canonicalize(&asset.path).await?;
    if !is_within(&canonical_root, &canonical) {
        return Err(AssetError::AccessDenied);
    }

    Ok(metadata.len())
}

/// Read a sanitized asset
pub async fn read_asset(
    root: &AssetRoot,
    asset: ResolvedAsset,
    max_file_size: u64,
) -> Result<LoadedAsset, AssetError> {
    let size = inspect(root, &asset).await?;
    if size > max_file_size {
        return Err(AssetError::TooLarge {
            size,
            limit: max_file_size,
        });
    }

    let raw = match fs::read(&asset.path).await {
        Ok(data) => data,
        Err(e) if is_missing(&e) => return Err(AssetError::NotFound),
        Err(e) => return Err(AssetError::Io(e)),
    };

    if asset.is_json() {
        let text = decode_json(raw)?;
        return Ok(LoadedAsset {
            asset,
            kind: AssetKind::Json,
            size,
            body: Bytes::from(text),
        });
    }

    Ok(LoadedAsset {
        asset,
        kind: AssetKind::Binary,
        size,
        body: Bytes::from(raw),
    })
}

/// Strip a leading BOM, require UTF-8, and require the text to parse as JSON
pub fn decode_json(mut raw: Vec<u8>) -> Result<String, AssetError> {
    if raw.starts_with(UTF8_BOM) {
        raw.drain(..UTF8_BOM.len());
    }

    let text = String::from_utf8(raw).map_err(|e| AssetError::InvalidContent {
        reason: e.to_string(),
    })?;

    serde_json::from_str::<IgnoredAny>(&text).map_err(|e| AssetError::InvalidContent {
        reason: e.to_string(),
    })?;

    Ok(text)
}

fn is_missing(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}
