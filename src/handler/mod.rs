//! Request handler module
//!
//! Responsible for request routing dispatch: asset endpoints, the lookup
//! endpoint, and health probes.

pub mod lookup;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
