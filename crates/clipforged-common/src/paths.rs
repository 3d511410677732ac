//! Path utilities for classifying files by extension.
//!
//! The upload allow-list and the "recognized media extension" test used when
//! naming outputs both live here so the store and the namer agree.

use std::path::Path;

/// Video container extensions accepted for upload.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm", "wmv"];

/// Audio extensions accepted for upload.
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "aac", "m4a", "flac"];

/// Still-image extensions accepted for upload.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Concat-demuxer list files.
const LIST_EXTENSIONS: &[&str] = &["txt"];

/// Lower-cased extension of a file name, if it has one.
///
/// # Examples
///
/// ```
/// use clipforged_common::paths::extension_of;
///
/// assert_eq!(extension_of("Clip.MKV").as_deref(), Some("mkv"));
/// assert_eq!(extension_of("noext"), None);
/// ```
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Check if an extension names a media container the engine reads and writes.
///
/// ```
/// use clipforged_common::paths::is_media_extension;
///
/// assert!(is_media_extension("mov"));
/// assert!(is_media_extension("FLAC"));
/// assert!(!is_media_extension("txt"));
/// ```
pub fn is_media_extension(ext: &str) -> bool {
    let ext = ext.to_ascii_lowercase();
    VIDEO_EXTENSIONS.contains(&ext.as_str()) || AUDIO_EXTENSIONS.contains(&ext.as_str())
}

/// Check if an extension names a still image.
pub fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

/// Check if a client-declared file name may be uploaded.
///
/// ```
/// use clipforged_common::paths::is_allowed_upload;
///
/// assert!(is_allowed_upload("cover.JPG"));
/// assert!(is_allowed_upload("list.txt"));
/// assert!(!is_allowed_upload("payload.sh"));
/// assert!(!is_allowed_upload("README"));
/// ```
pub fn is_allowed_upload(name: &str) -> bool {
    match extension_of(name) {
        Some(ext) => {
            is_media_extension(&ext)
                || is_image_extension(&ext)
                || LIST_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Reduce a caller-supplied name to a bare file name.
///
/// Returns `None` for anything that could address a location other than a
/// plain entry of the target directory: separators, `.`/`..`, hidden names,
/// NUL bytes and empty strings. Accepted names are returned unchanged.
///
/// ```
/// use clipforged_common::paths::sanitize_filename;
///
/// assert_eq!(sanitize_filename("result.mp4"), Some("result.mp4"));
/// assert_eq!(sanitize_filename("../result.mp4"), None);
/// assert_eq!(sanitize_filename("a/b.mp4"), None);
/// assert_eq!(sanitize_filename(".bashrc"), None);
/// ```
pub fn sanitize_filename(name: &str) -> Option<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed != name
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
    {
        return None;
    }
    Some(name)
}
