//! Asset client error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// No file is mapped to this logical asset name
    #[error("No mapping found for asset: {0}")]
    UnknownAsset(String),

    /// The server answered with a non-2xx status
    #[error("Failed to fetch protected asset: {0}")]
    Status(u16),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid asset map: {0}")]
    AssetMap(#[from] serde_json::Error),
}
