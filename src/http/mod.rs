//! HTTP protocol layer module
//!
//! Content types, cache policy and response builders, decoupled from routing.

pub mod cache;
pub mod mime;
pub mod query;
pub mod response;

// Re-export commonly used types
pub use cache::CachePolicy;
pub use response::{
    build_asset_response, build_error_response, build_health_response, build_json_response,
};
