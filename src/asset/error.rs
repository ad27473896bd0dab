//! Asset pipeline error types

use hyper::StatusCode;
use thiserror::Error;

/// Everything that can stop an asset request short of a 200
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Bad request: {reason}")]
    BadRequest { reason: String },

    /// Token gate refused the request
    #[error("Forbidden")]
    Forbidden,

    /// Resolved path escapes the asset root
    #[error("Access denied")]
    AccessDenied,

    #[error("Asset not found")]
    NotFound,

    #[error("Method not allowed: {method}")]
    MethodNotAllowed { method: String },

    #[error("Invalid JSON content: {reason}")]
    InvalidContent { reason: String },

    #[error("Asset is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssetError {
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest {
            reason: reason.into(),
        }
    }

    /// HTTP status this error maps to
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Forbidden | Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::InvalidContent { .. } | Self::TooLarge { .. } | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to send to any client
    ///
    /// Never contains filesystem paths or the attempted request path.
    pub fn public_message(&self) -> String {
        match self {
            Self::BadRequest { reason } => reason.clone(),
            Self::Forbidden => "Forbidden".to_string(),
            Self::AccessDenied => "Access denied".to_string(),
            Self::NotFound => "Asset not found".to_string(),
            Self::MethodNotAllowed { .. } => "Method not allowed".to_string(),
            Self::InvalidContent { .. } => "Invalid JSON file".to_string(),
            Self::TooLarge { .. } | Self::Io(_) => "Internal server error".to_string(),
        }
    }

    /// Whether the failure is the server's fault rather than the client's
    pub fn is_internal(&self) -> bool {
        self.status().is_server_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AssetError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AssetError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AssetError::AccessDenied.status(), StatusCode::FORBIDDEN);
        assert_eq!(AssetError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AssetError::MethodNotAllowed {
                method: "POST".to_string()
            }
            .status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            AssetError::InvalidContent {
                reason: "eof".to_string()
            }
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AssetError::TooLarge { size: 2, limit: 1 }.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let io_err = AssetError::from(io::Error::new(io::ErrorKind::Other, "disk"));
        assert_eq!(io_err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(io_err.is_internal());
        assert!(!AssetError::NotFound.is_internal());
    }

    #[test]
    fn test_public_message_hides_io_detail() {
        let err = AssetError::from(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "/srv/protected-assets/secret.png",
        ));
        assert_eq!(err.public_message(), "Internal server error");
        assert!(err.to_string().contains("secret.png"));
    }
}
