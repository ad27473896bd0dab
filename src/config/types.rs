// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub assets: AssetsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Minimum level written: error, warn, info or debug
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
    /// Adds a `details` field to error bodies. Development only.
    #[serde(default)]
    pub expose_error_details: bool,
}

/// Protected asset directory configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AssetsConfig {
    /// Asset root; relative paths are resolved against the working directory
    pub root: String,
    /// Largest file served, in bytes
    pub max_file_size: u64,
    /// `max-age` of the private `Cache-Control` header on successful reads
    pub cache_max_age: u32,
}

/// Shared-secret gate for endpoints with `require_token`
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub secret_token: Option<String>,
}

/// Routes configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RoutesConfig {
    /// Health check configuration
    #[serde(default)]
    pub health: HealthConfig,
    /// Endpoint prefix -> handler
    #[serde(default = "default_endpoints")]
    pub endpoints: HashMap<String, Endpoint>,
}

/// Health check configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HealthConfig {
    /// Enable health check endpoints
    #[serde(default = "default_health_enabled")]
    pub enabled: bool,
    /// Liveness probe path (default: /healthz)
    #[serde(default = "default_healthz_path")]
    pub liveness_path: String,
    /// Readiness probe path (default: /readyz)
    #[serde(default = "default_readyz_path")]
    pub readiness_path: String,
}

#[allow(clippy::missing_const_for_fn)]
fn default_health_enabled() -> bool {
    true
}

#[allow(clippy::missing_const_for_fn)]
fn default_healthz_path() -> String {
    "/healthz".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_readyz_path() -> String {
    "/readyz".to_string()
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: default_health_enabled(),
            liveness_path: default_healthz_path(),
            readiness_path: default_readyz_path(),
        }
    }
}

/// A configured endpoint: how to find the asset path, and whether the
/// `Authorization` gate applies
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Endpoint {
    #[serde(flatten)]
    pub handler: EndpointHandler,
    #[serde(default)]
    pub require_token: bool,
}

/// Endpoint handler types
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndpointHandler {
    /// Asset path is the URL remainder after the prefix, falling back to `param`
    CatchAll {
        #[serde(default = "default_path_param")]
        param: String,
    },
    /// Asset path is a query parameter
    Query {
        #[serde(default = "default_path_param")]
        param: String,
    },
    /// Answers with a serve URL for a file under `dir`, never the bytes
    Lookup {
        param: String,
        dir: String,
        link_prefix: String,
    },
}

#[allow(clippy::missing_const_for_fn)]
fn default_path_param() -> String {
    "path".to_string()
}

fn default_endpoints() -> HashMap<String, Endpoint> {
    let open = |handler| Endpoint {
        handler,
        require_token: false,
    };

    HashMap::from([
        (
            "/api/protected-assets".to_string(),
            open(EndpointHandler::CatchAll {
                param: default_path_param(),
            }),
        ),
        (
            "/api/protected-asset".to_string(),
            open(EndpointHandler::Query {
                param: default_path_param(),
            }),
        ),
        (
            "/api/pa".to_string(),
            open(EndpointHandler::Query {
                param: default_path_param(),
            }),
        ),
        (
            "/api/asset".to_string(),
            open(EndpointHandler::Query {
                param: "file".to_string(),
            }),
        ),
        (
            "/api/get-image".to_string(),
            Endpoint {
                handler: EndpointHandler::Lookup {
                    param: "image".to_string(),
                    dir: "images".to_string(),
                    link_prefix: "/api/protected-assets/images".to_string(),
                },
                require_token: true,
            },
        ),
    ])
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            health: HealthConfig::default(),
            endpoints: default_endpoints(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints() {
        let routes = RoutesConfig::default();
        assert_eq!(routes.endpoints.len(), 5);
        assert_eq!(
            routes.endpoints["/api/asset"].handler,
            EndpointHandler::Query {
                param: "file".to_string()
            }
        );
        let gated: Vec<&String> = routes
            .endpoints
            .iter()
            .filter(|(_, e)| e.require_token)
            .map(|(prefix, _)| prefix)
            .collect();
        assert_eq!(gated, ["/api/get-image"]);
    }

    #[test]
    fn test_endpoint_from_toml() {
        let toml_str = r#"
            [endpoints."/api/getImage"]
            type = "lookup"
            param = "image"
            dir = "images"
            link_prefix = "/api/protected-assets/images"
            require_token = true

            [endpoints."/files"]
            type = "catch_all"
        "#;
        let routes: RoutesConfig = toml::from_str(toml_str).unwrap();

        let lookup = &routes.endpoints["/api/getImage"];
        assert!(lookup.require_token);
        assert_eq!(
            lookup.handler,
            EndpointHandler::Lookup {
                param: "image".to_string(),
                dir: "images".to_string(),
                link_prefix: "/api/protected-assets/images".to_string(),
            }
        );

        let files = &routes.endpoints["/files"];
        assert!(!files.require_token);
        assert_eq!(
            files.handler,
            EndpointHandler::CatchAll {
                param: "path".to_string()
            }
        );
        assert!(routes.health.enabled);
    }
}
