//! MIME type detection module
//!
//! Returns the corresponding Content-Type based on file extension.

/// Served for unknown extensions and files without one
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// `Content-Type` of a validated JSON body
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Get MIME Content-Type based on file extension
///
/// The leading dot is optional and the lookup ignores case.
///
/// # Examples
/// ```
/// use protected_assets::http::mime::get_content_type;
/// assert_eq!(get_content_type(Some(".png")), "image/png");
/// assert_eq!(get_content_type(Some("GLSL")), "text/plain");
/// assert_eq!(get_content_type(None), "application/octet-stream");
/// ```
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    let Some(ext) = extension else {
        return FALLBACK_CONTENT_TYPE;
    };
    let ext = ext.strip_prefix('.').unwrap_or(ext).to_ascii_lowercase();

    match ext.as_str() {
        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",

        // Scene configs and ops
        "json" => "application/json",
        "js" => "application/javascript",
        "glsl" => "text/plain",
        "obj" => "application/octet-stream",

        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",

        // Default
        _ => FALLBACK_CONTENT_TYPE,
    }
}
