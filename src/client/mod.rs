//! Asset client
//!
//! Fetches files from a running asset server through its query endpoint.
//! Binary fetches are cached per path for the lifetime of the client; JSON
//! fetches always go to the server.

mod error;

pub use error::ClientError;

use hyper::body::Bytes;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Directory for images and any unrecognised extension
pub const CABLES_ASSETS_DIR: &str = "cables/assets/";
/// Directory for scripts and shaders
pub const CABLES_OPS_DIR: &str = "cables/js/";
/// Placeholder image shown before the animation loads
pub const STATIC_IMAGE_PATH: &str = "images/canvas-static.png";
/// Animation configuration
pub const CABLES_CONFIG_PATH: &str = "cables/BaumIntro.json";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Logical names shipped with the client when no map is supplied
pub fn default_asset_map() -> HashMap<String, String> {
    HashMap::from([
        ("baum-intro-image".to_string(), "_DSF2140_Kopie_2.png".to_string()),
        ("cable-detail-1".to_string(), "cable_001.jpg".to_string()),
        ("cable-detail-2".to_string(), "cable_002.jpg".to_string()),
    ])
}

/// Parse a `{"logical-name": "file.ext"}` JSON object
pub fn parse_asset_map(json: &str) -> Result<HashMap<String, String>, ClientError> {
    Ok(serde_json::from_str(json)?)
}

/// Client for one asset server query endpoint
pub struct AssetClient {
    /// Full endpoint URL, e.g. `http://127.0.0.1:3000/api/protected-asset`
    endpoint: String,
    http: reqwest::Client,
    token: Option<String>,
    asset_map: HashMap<String, String>,
    cache: Mutex<HashMap<String, Bytes>>,
}

impl AssetClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("protected-assets/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            endpoint: endpoint.into(),
            http,
            token: None,
            asset_map: default_asset_map(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Send `Authorization: <token>` with every request
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_asset_map(mut self, asset_map: HashMap<String, String>) -> Self {
        self.asset_map = asset_map;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// URL that serves `path`, with the path percent-encoded
    pub fn asset_url(&self, path: &str) -> String {
        format!("{}?path={}", self.endpoint, urlencoding::encode(path))
    }

    /// Relative asset path for a logical name, directory chosen by extension
    pub fn mapped_asset_path(&self, logical_name: &str) -> Result<String, ClientError> {
        let filename = self
            .asset_map
            .get(logical_name)
            .ok_or_else(|| ClientError::UnknownAsset(logical_name.to_string()))?;

        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        let base = match extension.as_str() {
            "js" | "glsl" => CABLES_OPS_DIR,
            _ => CABLES_ASSETS_DIR,
        };
        Ok(format!("{base}{filename}"))
    }

    pub fn mapped_asset_url(&self, logical_name: &str) -> Result<String, ClientError> {
        Ok(self.asset_url(&self.mapped_asset_path(logical_name)?))
    }

    /// Fetch raw bytes, serving repeats from the cache
    pub async fn fetch_asset(&self, path: &str) -> Result<Bytes, ClientError> {
        let cached = self.lock_cache().get(path).cloned();
        if let Some(body) = cached {
            return Ok(body);
        }

        let body = self.get(path).await?.bytes().await?;
        self.lock_cache().insert(path.to_string(), body.clone());
        Ok(body)
    }

    pub async fn fetch_mapped_asset(&self, logical_name: &str) -> Result<Bytes, ClientError> {
        let path = self.mapped_asset_path(logical_name)?;
        self.fetch_asset(&path).await
    }

    /// Fetch and parse a JSON asset; never cached
    pub async fn fetch_json(&self, path: &str) -> Result<serde_json::Value, ClientError> {
        Ok(self.get(path).await?.json().await?)
    }

    pub async fn fetch_static_image(&self) -> Result<Bytes, ClientError> {
        self.fetch_asset(STATIC_IMAGE_PATH).await
    }

    pub async fn fetch_cables_config(&self) -> Result<serde_json::Value, ClientError> {
        self.fetch_json(CABLES_CONFIG_PATH).await
    }

    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    pub fn cache_len(&self) -> usize {
        self.lock_cache().len()
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, ClientError> {
        let mut request = self.http.get(self.asset_url(path));
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        Ok(response)
    }

    fn lock_cache(&self) -> MutexGuard<'_, HashMap<String, Bytes>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppState, Config};
    use crate::server::{create_listener, start_server_loop};
    use std::sync::Arc;
    use tokio::sync::Notify;

    #[test]
    fn test_asset_url_encodes_path() {
        let client = AssetClient::new("http://localhost:3000/api/protected-asset").unwrap();
        assert_eq!(
            client.asset_url("cables/BaumIntro.json"),
            "http://localhost:3000/api/protected-asset?path=cables%2FBaumIntro.json"
        );
        assert_eq!(
            client.asset_url("a b&c.png"),
            "http://localhost:3000/api/protected-asset?path=a%20b%26c.png"
        );
    }

    #[test]
    fn test_mapped_asset_path() {
        let map = HashMap::from([
            ("hero".to_string(), "Hero.JPG".to_string()),
            ("ops".to_string(), "Ops.min.js".to_string()),
            ("shader".to_string(), "fade.glsl".to_string()),
            ("model".to_string(), "mesh.obj".to_string()),
        ]);
        let client = AssetClient::new("http://localhost/api/pa")
            .unwrap()
            .with_asset_map(map);

        assert_eq!(client.mapped_asset_path("hero").unwrap(), "cables/assets/Hero.JPG");
        assert_eq!(client.mapped_asset_path("ops").unwrap(), "cables/js/Ops.min.js");
        assert_eq!(client.mapped_asset_path("shader").unwrap(), "cables/js/fade.glsl");
        assert_eq!(client.mapped_asset_path("model").unwrap(), "cables/assets/mesh.obj");
        assert!(matches!(
            client.mapped_asset_path("nope"),
            Err(ClientError::UnknownAsset(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_default_and_parsed_maps() {
        let client = AssetClient::new("http://localhost/api/pa").unwrap();
        assert_eq!(
            client.mapped_asset_path("baum-intro-image").unwrap(),
            "cables/assets/_DSF2140_Kopie_2.png"
        );

        let parsed = parse_asset_map(r#"{"intro":"intro.webp"}"#).unwrap();
        assert_eq!(parsed["intro"], "intro.webp");
        assert!(parse_asset_map("not json").is_err());
    }

    async fn spawn_server(root: &std::path::Path) -> (String, Arc<Notify>) {
        let mut config = Config::load_from("does-not-exist/config").unwrap();
        config.assets.root = root.to_string_lossy().into_owned();
        config.logging.access_log = false;
        let state = Arc::new(AppState::new(&config).unwrap());

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        tokio::spawn(start_server_loop(listener, state, Arc::clone(&shutdown)));
        (format!("http://{addr}/api/protected-asset"), shutdown)
    }

    #[tokio::test]
    async fn test_fetch_asset_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("images")).unwrap();
        std::fs::write(dir.path().join("images/canvas-static.png"), b"png-v1").unwrap();
        let (endpoint, shutdown) = spawn_server(dir.path()).await;
        let client = AssetClient::new(endpoint).unwrap();

        assert_eq!(&client.fetch_static_image().await.unwrap()[..], b"png-v1");
        assert_eq!(client.cache_len(), 1);

        // A changed file is not seen until the cache is cleared
        std::fs::write(dir.path().join("images/canvas-static.png"), b"png-v2").unwrap();
        assert_eq!(&client.fetch_asset(STATIC_IMAGE_PATH).await.unwrap()[..], b"png-v1");

        client.clear_cache();
        assert_eq!(client.cache_len(), 0);
        assert_eq!(&client.fetch_asset(STATIC_IMAGE_PATH).await.unwrap()[..], b"png-v2");

        shutdown.notify_one();
    }

    #[tokio::test]
    async fn test_fetch_json_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("cables")).unwrap();
        let config_path = dir.path().join("cables/BaumIntro.json");
        std::fs::write(&config_path, br#"{"version":1}"#).unwrap();
        let (endpoint, shutdown) = spawn_server(dir.path()).await;
        let client = AssetClient::new(endpoint).unwrap();

        assert_eq!(client.fetch_cables_config().await.unwrap()["version"], 1);
        std::fs::write(&config_path, br#"{"version":2}"#).unwrap();
        assert_eq!(client.fetch_cables_config().await.unwrap()["version"], 2);
        assert_eq!(client.cache_len(), 0);

        shutdown.notify_one();
    }

    #[tokio::test]
    async fn test_error_status_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let (endpoint, shutdown) = spawn_server(dir.path()).await;
        let client = AssetClient::new(endpoint).unwrap();

        assert!(matches!(
            client.fetch_asset("missing.png").await,
            Err(ClientError::Status(404))
        ));
        assert!(matches!(
            client.fetch_asset("../../etc/passwd").await,
            Err(ClientError::Status(403))
        ));
        assert_eq!(client.cache_len(), 0);

        shutdown.notify_one();
    }
}
