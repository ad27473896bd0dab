// Application state module
// Read-only state shared by every request

use std::io;

use super::types::Config;
use crate::asset::AssetRoot;
use crate::http::cache::CachePolicy;

/// Application state
///
/// Built once at startup; requests only ever read from it.
pub struct AppState {
    pub config: Config,
    /// Trust boundary for every asset request
    pub asset_root: AssetRoot,
    pub cache_policy: CachePolicy,
}

impl AppState {
    pub fn new(config: &Config) -> io::Result<Self> {
        let asset_root = AssetRoot::new(&config.assets.root)?;

        Ok(Self {
            config: config.clone(),
            asset_root,
            cache_policy: CachePolicy::Private(config.assets.cache_max_age),
        })
    }

    /// Whether access logging is enabled
    pub const fn access_log(&self) -> bool {
        self.config.logging.access_log
    }
}
