// Configuration module entry point
// Loads layered configuration and builds the shared request state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{
    AssetsConfig, AuthConfig, Config, Endpoint, EndpointHandler, HealthConfig, HttpConfig,
    LoggingConfig, PerformanceConfig, RoutesConfig, ServerConfig,
};

/// Environment variable consulted when `auth.secret_token` is not configured
pub const SECRET_TOKEN_ENV: &str = "SECRET_TOKEN";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        Self::load_with_env(config_path, std::env::vars().collect())
    }

    /// Load with an explicit environment instead of the process one
    ///
    /// `ASSETS_*` overrides and the `SECRET_TOKEN` fallback read only `env`.
    pub fn load_with_env(
        config_path: &str,
        env: config::Map<String, String>,
    ) -> Result<Self, config::ConfigError> {
        let secret_token_env = env.get(SECRET_TOKEN_ENV).cloned();

        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("ASSETS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(env)),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "protected-assets")?
            .set_default("http.enable_cors", false)?
            .set_default("http.expose_error_details", false)?
            .set_default("assets.root", "protected-assets")?
            .set_default("assets.max_file_size", 10_485_760)? // 10MB
            .set_default("assets.cache_max_age", 3600)?
            .build()?;

        let mut config: Self = settings.try_deserialize()?;
        if config.auth.secret_token.is_none() {
            config.auth.secret_token = secret_token_env.filter(|t| !t.is_empty());
        }
        Ok(config)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        let mut printable = self.clone();
        if printable.auth.secret_token.is_some() {
            printable.auth.secret_token = Some("<redacted>".to_string());
        }
        toml::to_string_pretty(&printable)
    }
}
