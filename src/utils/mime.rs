use std::path::{Path, PathBuf};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Extension fallback for formats without a recognisable signature (SVG),
/// or when the leading bytes are inconclusive
const EXTENSION_TYPES: &[(&[&str], &str)] = &[
    (&["png"], "image/png"),
    (&["jpg", "jpeg"], "image/jpeg"),
    (&["gif"], "image/gif"),
    (&["webp"], "image/webp"),
    (&["svg"], "image/svg+xml"),
    (&["bmp"], "image/bmp"),
    (&["avif"], "image/avif"),
    (&["mp4", "m4v"], "video/mp4"),
    (&["webm"], "video/webm"),
    (&["mov"], "video/quicktime"),
    (&["mkv"], "video/x-matroska"),
    (&["avi"], "video/x-msvideo"),
    (&["ogv"], "video/ogg"),
    (&["txt", "md"], "text/plain"),
    (&["json"], "application/json"),
    (&["pdf"], "application/pdf"),
];

/// Turn a path pasted or dropped into a terminal back into a filesystem path.
///
/// Removes one pair of surrounding quotes, drops the backslash in front of
/// escaped punctuation (`\ `, `\(`, `\'`, ...) and expands a leading `~`.
pub fn normalize_input_path(raw: &str) -> PathBuf {
    let raw = raw.trim();
    let unquoted = ['\'', '"']
        .iter()
        .find_map(|quote| raw.strip_prefix(*quote)?.strip_suffix(*quote))
        .unwrap_or(raw);

    let mut unescaped = String::with_capacity(unquoted.len());
    let mut chars = unquoted.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if !next.is_alphanumeric() {
                    unescaped.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        unescaped.push(c);
    }

    if let Some(rest) = unescaped.strip_prefix('~') {
        if rest.is_empty() || rest.starts_with('/') {
            if let Some(dirs) = directories::BaseDirs::new() {
                return dirs.home_dir().join(rest.trim_start_matches('/'));
            }
        }
    }

    PathBuf::from(unescaped)
}

/// MIME type recognised from a file's leading bytes
pub fn mime_type_for_bytes(head: &[u8]) -> Option<&'static str> {
    infer::get(head).map(|kind| kind.mime_type())
}

/// MIME type implied by the file extension, case-insensitively
pub fn mime_type_for_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    EXTENSION_TYPES
        .iter()
        .find(|(extensions, _)| extensions.contains(&ext.as_str()))
        .map(|(_, mime)| *mime)
}

/// Content first, then extension, then `application/octet-stream`.
///
/// A renamed PDF is still a PDF; a screenshot saved without an extension is
/// still a PNG.
pub fn sniff_mime(path: &Path, head: &[u8]) -> &'static str {
    mime_type_for_bytes(head)
        .or_else(|| mime_type_for_extension(path))
        .unwrap_or(FALLBACK_MIME)
}
