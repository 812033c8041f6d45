//! Extension-based MIME fallback for generic binary downloads.
//!
//! Servers often report `application/octet-stream` for files that have a
//! perfectly recognisable extension. When that happens the extension is
//! looked up in a small static table so MIME-based rules still apply.

use once_cell::sync::Lazy;
use regex::Regex;

/// The generic binary-stream MIME type that triggers the fallback.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Extension to MIME mappings, checked in order.
pub const EXT_MIME_MAPPINGS: &[(&str, &str)] = &[
    ("mp3", "audio/mpeg"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("exe", "application/exe"),
    ("avi", "video/x-msvideo"),
    ("torrent", "application/x-bittorrent"),
];

/// Last `.ext` in a filename, followed by a query/fragment delimiter or the end.
static EXTENSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.([0-9a-z]+)(?:[?#]|$)").expect("extension pattern is valid")
});

/// Extract the trailing extension of a filename.
///
/// # Example
/// ```
/// use dlrule::mime::extension_of;
///
/// assert_eq!(extension_of("report.PDF"), Some("PDF"));
/// assert_eq!(extension_of("file.zip?token=1"), Some("zip"));
/// assert_eq!(extension_of("README"), None);
/// ```
pub fn extension_of(filename: &str) -> Option<&str> {
    // The first match that reaches a delimiter or the end wins, which is the
    // extension right before any `?`/`#` or the final one.
    EXTENSION_PATTERN
        .captures(filename)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Look up the MIME type for an extension (case-insensitive).
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    EXT_MIME_MAPPINGS
        .iter()
        .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        .map(|(_, mime)| *mime)
}

/// Resolve the effective MIME type of a download.
///
/// Only `application/octet-stream` is ever replaced; any other reported
/// type, and octet-streams with unknown extensions, are returned unchanged.
pub fn sniff_mime(reported: &str, filename: &str) -> String {
    if reported != OCTET_STREAM {
        return reported.to_string();
    }

    match extension_of(filename).and_then(mime_for_extension) {
        Some(mime) => {
            log::debug!("Octet-stream {:?} mapped to {}", filename, mime);
            mime.to_string()
        }
        None => reported.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("song.mp3"), Some("mp3"));
        assert_eq!(extension_of("archive.tar.gz"), Some("gz"));
        assert_eq!(extension_of("movie.AVI"), Some("AVI"));
        assert_eq!(extension_of("setup.exe#frag"), Some("exe"));
        assert_eq!(extension_of("noext"), None);
        assert_eq!(extension_of("trailing."), None);
        assert_eq!(extension_of(""), None);
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for_extension("pdf"), Some("application/pdf"));
        assert_eq!(mime_for_extension("JPG"), Some("image/jpeg"));
        assert_eq!(mime_for_extension("torrent"), Some("application/x-bittorrent"));
        assert_eq!(mime_for_extension("jpeg"), None);
    }

    #[test]
    fn test_sniff_only_octet_stream() {
        assert_eq!(sniff_mime(OCTET_STREAM, "a.png"), "image/png");
        assert_eq!(sniff_mime("text/plain", "a.png"), "text/plain");
        assert_eq!(sniff_mime(OCTET_STREAM, "a.bin"), OCTET_STREAM);
        assert_eq!(sniff_mime(OCTET_STREAM, "Paper.PDF"), "application/pdf");
    }
}
