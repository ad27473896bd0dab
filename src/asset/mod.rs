//! Protected asset resolver
//!
//! The linear pipeline shared by every asset endpoint:
//! sanitize the request path, check the file, read it.
//! Response composition lives in [`crate::http`].

mod error;
pub mod reader;
pub mod sanitize;

pub use error::AssetError;
pub use reader::{read_asset, AssetKind, LoadedAsset};
pub use sanitize::{AssetRoot, ResolvedAsset};

/// Sanitize `raw` against `root` and read the file it names
///
/// A path that escapes the root is rejected before any filesystem access.
pub async fn load(
    root: &AssetRoot,
    raw: &str,
    max_file_size: u64,
) -> Result<LoadedAsset, AssetError> {
    let resolved = root.resolve(raw)?;
    read_asset(root, resolved, max_file_size).await
}
