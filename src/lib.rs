//! Protected asset server
//!
//! Serves files from one configured directory over HTTP, rejecting any request
//! path that would resolve outside it.

pub mod asset;
pub mod client;
pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
