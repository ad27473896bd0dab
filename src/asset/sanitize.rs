//! Path sanitizer
//!
//! Resolves an untrusted relative path against the asset root without touching
//! the filesystem. Normalization is purely lexical; the containment check is a
//! strict prefix comparison on the normalized string form.

use std::io;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use super::error::AssetError;

/// Absolute, normalized directory below which every served file must live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRoot {
    path: PathBuf,
}

impl AssetRoot {
    /// Build the root from a configured path
    ///
    /// Relative paths are resolved against the current working directory.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref();
        let absolute = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()?.join(root)
        };
        Ok(Self {
            path: normalize(&absolute),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A root confined to a subdirectory of this one
    ///
    /// The subdirectory itself goes through the sanitizer, so it cannot escape.
    pub fn subdir(&self, relative: &str) -> Result<Self, AssetError> {
        let resolved = self.resolve(relative)?;
        Ok(Self {
            path: resolved.path,
        })
    }

    /// Validate `raw` and join it onto the root
    pub fn resolve(&self, raw: &str) -> Result<ResolvedAsset, AssetError> {
        if raw.contains('\0') {
            return Err(AssetError::bad_request("Invalid file path"));
        }

        // Backslashes count as separators so Windows-style traversal is caught too
        let unified = raw.replace('\\', "/");
        let stripped = unified.trim_start_matches('/');

        let joined = self.path.join(stripped);
        let normalized = normalize(&joined);

        if !is_within(&self.path, &normalized) {
            return Err(AssetError::AccessDenied);
        }

        Ok(ResolvedAsset::new(normalized))
    }

    /// Strict descendant-or-equal check, see [`is_within`]
    pub fn contains(&self, candidate: &Path) -> bool {
        is_within(&self.path, candidate)
    }
}

/// A request path that passed the sanitizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub path: PathBuf,
    /// Lowercase extension with its leading dot, e.g. `.png`
    pub extension: Option<String>,
}

impl ResolvedAsset {
    fn new(path: PathBuf) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()));
        Self { path, extension }
    }

    pub fn is_json(&self) -> bool {
        self.extension.as_deref() == Some(".json")
    }
}

/// Resolve `.` and `..` lexically
///
/// `..` at the filesystem root stays at the root, matching POSIX semantics.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(segment) => out.push(segment),
        }
    }
    out
}

/// True when `candidate` equals `root` or starts with `root` plus a separator
///
/// A plain `starts_with` on strings would let `/assets-evil` pass for `/assets`.
pub fn is_within(root: &Path, candidate: &Path) -> bool {
    let root = root.to_string_lossy();
    let candidate = candidate.to_string_lossy();

    if candidate == root {
        return true;
    }

    let root = root.trim_end_matches(MAIN_SEPARATOR);
    candidate
        .strip_prefix(root)
        .is_some_and(|rest| rest.starts_with(MAIN_SEPARATOR))
}
