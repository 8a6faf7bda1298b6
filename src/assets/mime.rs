//! MIME type detection.
//!
//! Returns the Content-Type for a filename based on its extension.

/// Extensions the edge treats as images (fetchable, listable, uploadable).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "avif"];

/// Lowercased extension of the last path segment, if any.
pub fn extension_of(filename: &str) -> Option<String> {
    let name = filename.rsplit('/').next().unwrap_or(filename);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Whether the filename carries a whitelisted image extension.
pub fn is_image_file(filename: &str) -> bool {
    extension_of(filename).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Content-Type for a filename, `application/octet-stream` when unknown.
///
/// # Examples
/// ```
/// use image_edge::assets::content_type;
/// assert_eq!(content_type("cat.JPG"), "image/jpeg");
/// assert_eq!(content_type("notes.xyz"), "application/octet-stream");
/// ```
pub fn content_type(filename: &str) -> &'static str {
    match extension_of(filename).as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("txt") => "text/plain; charset=utf-8",
        Some("json") => "application/json",

        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",

        _ => "application/octet-stream",
    }
}

/// Preferred extension for an image MIME type.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/bmp" => Some("bmp"),
        "image/avif" => Some("avif"),
        _ => None,
    }
}
