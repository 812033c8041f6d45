//! Field extraction from raw download items.
//!
//! Turns the host's download item into a [`FieldRecord`]: URLs are
//! percent-decoded, the filename is decoded and NFC-normalized, and generic
//! octet-stream MIME types are corrected from the filename extension.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};
use crate::field::Field;
use crate::mime::sniff_mime;

/// Characters `decode_uri` keeps escaped because they carry URI structure.
const URI_RESERVED: &[u8] = b";/?:@&=+$,#";

/// Raw download item as reported by the host platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadItem {
    /// Reported MIME type
    #[serde(default)]
    pub mime: String,
    /// Referrer URL (URI-encoded)
    #[serde(default)]
    pub referrer: String,
    /// Original download URL (URI-encoded)
    #[serde(default)]
    pub url: String,
    /// URL after redirects (URI-encoded)
    #[serde(default)]
    pub final_url: String,
    /// Filename suggested by the platform
    #[serde(default)]
    pub filename: String,
    /// Download start time
    pub start_time: StartTime,
}

/// Download start time as delivered by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StartTime {
    /// Milliseconds since the Unix epoch
    EpochMillis(i64),
    /// ISO-8601 timestamp (RFC 3339, naive date-time, or date only)
    Iso(String),
}

impl StartTime {
    /// Resolve to a timestamp with offset.
    ///
    /// Timestamps without an offset, and epoch values, are taken as UTC.
    pub fn resolve(&self) -> Result<DateTime<FixedOffset>> {
        match self {
            StartTime::EpochMillis(ms) => Utc
                .timestamp_millis_opt(*ms)
                .single()
                .map(|dt| dt.fixed_offset())
                .ok_or_else(|| Error::InvalidStartTime(ms.to_string())),
            StartTime::Iso(s) => parse_iso(s),
        }
    }
}

impl From<DateTime<FixedOffset>> for StartTime {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        StartTime::Iso(dt.to_rfc3339())
    }
}

fn parse_iso(s: &str) -> Result<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
        })
        .map_err(|_| Error::InvalidStartTime(s.to_string()))?;
    Ok(naive.and_utc().fixed_offset())
}

/// Matchable field values for one download event.
///
/// Constructed once per download and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRecord {
    values: [Option<String>; 6],
    start_time: DateTime<FixedOffset>,
}

impl FieldRecord {
    /// Build a record directly from already-extracted values.
    ///
    /// An empty `tab_url` is stored as absent.
    pub fn new(
        mime: impl Into<String>,
        tab_url: Option<String>,
        referrer: impl Into<String>,
        url: impl Into<String>,
        final_url: impl Into<String>,
        filename: impl Into<String>,
        start_time: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            values: [
                Some(mime.into()),
                tab_url.filter(|u| !u.is_empty()),
                Some(referrer.into()),
                Some(url.into()),
                Some(final_url.into()),
                Some(filename.into()),
            ],
            start_time,
        }
    }

    /// Get the value of a field. Only `tabUrl` can be absent.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.values[field.index()].as_deref()
    }

    /// Download start time used for `${date}` placeholders.
    pub fn start_time(&self) -> DateTime<FixedOffset> {
        self.start_time
    }
}

/// Extract the matchable fields of a download.
///
/// Fails only if the start time cannot be parsed; decoding problems in
/// URLs and filenames fall back to the raw strings.
pub fn extract_fields(item: &DownloadItem, tab_url: Option<&str>) -> Result<FieldRecord> {
    let filename = normalize_filename(&item.filename);
    Ok(FieldRecord::new(
        sniff_mime(&item.mime, &item.filename),
        tab_url.map(str::to_string),
        decode_uri(&item.referrer),
        decode_uri(&item.url),
        decode_uri(&item.final_url),
        filename,
        item.start_time.resolve()?,
    ))
}

/// Decode a percent-encoded URI, keeping escapes of reserved characters.
///
/// Malformed escapes and invalid UTF-8 sequences leave the whole input
/// untouched.
///
/// # Example
/// ```
/// use dlrule::extract::decode_uri;
///
/// assert_eq!(decode_uri("https://e.com/caf%C3%A9"), "https://e.com/café");
/// assert_eq!(decode_uri("https://e.com/a%2Fb"), "https://e.com/a%2Fb");
/// assert_eq!(decode_uri("https://e.com/%E0%A4%A"), "https://e.com/%E0%A4%A");
/// ```
pub fn decode_uri(s: &str) -> String {
    percent_decode_strict(s, URI_RESERVED).unwrap_or_else(|| s.to_string())
}

/// Decode every percent escape of a URI component.
///
/// Returns `None` on malformed escapes or invalid UTF-8.
pub fn decode_uri_component(s: &str) -> Option<String> {
    percent_decode_strict(s, &[])
}

/// Decode and NFC-normalize a download filename.
///
/// Names containing a `%XX` escape are percent-decoded first, keeping the
/// original on failure. Composition makes NFD names (as produced by some
/// file systems) match rules written with precomposed characters.
pub fn normalize_filename(filename: &str) -> String {
    if filename.is_empty() {
        return String::new();
    }

    let decoded = if has_percent_escape(filename) {
        decode_uri_component(filename).unwrap_or_else(|| filename.to_string())
    } else {
        filename.to_string()
    };

    decoded.nfc().collect()
}

fn has_percent_escape(s: &str) -> bool {
    s.as_bytes()
        .windows(3)
        .any(|w| w[0] == b'%' && w[1].is_ascii_hexdigit() && w[2].is_ascii_hexdigit())
}

fn hex_byte(bytes: &[u8], pos: usize) -> Option<u8> {
    if bytes.get(pos) != Some(&b'%') {
        return None;
    }
    let hi = (*bytes.get(pos + 1)? as char).to_digit(16)?;
    let lo = (*bytes.get(pos + 2)? as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}

/// Strict percent decoding: every `%` must start a valid escape and every
/// escaped multi-byte sequence must be well-formed UTF-8.
fn percent_decode_strict(s: &str, keep_escaped: &[u8]) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'%' {
            // Copy the run of unescaped text verbatim.
            let next = s[pos..].find('%').map_or(s.len(), |i| pos + i);
            out.push_str(&s[pos..next]);
            pos = next;
            continue;
        }

        let lead = hex_byte(bytes, pos)?;
        if lead < 0x80 {
            if keep_escaped.contains(&lead) {
                out.push_str(&s[pos..pos + 3]);
            } else {
                out.push(lead as char);
            }
            pos += 3;
            continue;
        }

        let width = match lead.leading_ones() {
            2 => 2,
            3 => 3,
            4 => 4,
            _ => return None,
        };
        let mut buf = [0u8; 4];
        buf[0] = lead;
        for (i, slot) in buf.iter_mut().enumerate().take(width).skip(1) {
            let b = hex_byte(bytes, pos + i * 3)?;
            if b & 0xC0 != 0x80 {
                return None;
            }
            *slot = b;
        }
        out.push_str(std::str::from_utf8(&buf[..width]).ok()?);
        pos += width * 3;
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mime::OCTET_STREAM;

    fn item(mime: &str, filename: &str) -> DownloadItem {
        DownloadItem {
            mime: mime.to_string(),
            referrer: "https://example.com/page".to_string(),
            url: "https://cdn.example.com/files/a%20b.bin".to_string(),
            final_url: "https://cdn2.example.com/files/a%20b.bin".to_string(),
            filename: filename.to_string(),
            start_time: StartTime::Iso("2024-03-05T00:00:00".to_string()),
        }
    }

    #[test]
    fn test_decode_uri_keeps_reserved() {
        assert_eq!(decode_uri("a%20b"), "a b");
        assert_eq!(decode_uri("q%3Fx%26y"), "q%3Fx%26y");
        assert_eq!(decode_uri("%e4%b8%ad"), "中");
        assert_eq!(decode_uri("100%"), "100%");
        assert_eq!(decode_uri("%zz%20"), "%zz%20");
        // Lone continuation byte is rejected
        assert_eq!(decode_uri("x%80y"), "x%80y");
    }

    #[test]
    fn test_decode_uri_component() {
        assert_eq!(decode_uri_component("a%2Fb%3F").as_deref(), Some("a/b?"));
        assert_eq!(decode_uri_component("%C3"), None);
        assert_eq!(decode_uri_component("plain").as_deref(), Some("plain"));
    }

    #[test]
    fn test_normalize_filename_nfc() {
        let nfd = "cafe\u{0301}.txt";
        assert_eq!(normalize_filename(nfd), "caf\u{00e9}.txt");
        assert_eq!(normalize_filename(""), "");
    }

    #[test]
    fn test_normalize_filename_percent() {
        assert_eq!(normalize_filename("my%20file.pdf"), "my file.pdf");
        assert_eq!(normalize_filename("50%.txt"), "50%.txt");
        assert_eq!(normalize_filename("bad%E0%A4.txt"), "bad%E0%A4.txt");
        // Decoded NFD is composed as well
        assert_eq!(normalize_filename("e%CC%81.txt"), "\u{00e9}.txt");
    }

    #[test]
    fn test_extract_fields() {
        let record = extract_fields(&item("text/plain", "a b.bin"), Some("https://tab.example.com/")).unwrap();
        assert_eq!(record.get(Field::Mime), Some("text/plain"));
        assert_eq!(record.get(Field::Url), Some("https://cdn.example.com/files/a b.bin"));
        assert_eq!(record.get(Field::FinalUrl), Some("https://cdn2.example.com/files/a b.bin"));
        assert_eq!(record.get(Field::TabUrl), Some("https://tab.example.com/"));
        assert_eq!(record.get(Field::Filename), Some("a b.bin"));
    }

    #[test]
    fn test_extract_fields_mime_fallback() {
        let record = extract_fields(&item(OCTET_STREAM, "song.MP3"), None).unwrap();
        assert_eq!(record.get(Field::Mime), Some("audio/mpeg"));
        assert_eq!(record.get(Field::TabUrl), None);
    }

    #[test]
    fn test_empty_tab_url_is_absent() {
        let record = extract_fields(&item("text/plain", "x"), Some("")).unwrap();
        assert_eq!(record.get(Field::TabUrl), None);
    }

    #[test]
    fn test_start_time_formats() {
        let iso = StartTime::Iso("2024-03-05T10:20:30.123Z".to_string()).resolve().unwrap();
        assert_eq!(iso.to_rfc3339(), "2024-03-05T10:20:30.123+00:00");

        let naive = StartTime::Iso("2024-03-05T00:00:00".to_string()).resolve().unwrap();
        assert_eq!(naive.format("%Y-%m-%d %H:%M").to_string(), "2024-03-05 00:00");

        let date = StartTime::Iso("2024-03-05".to_string()).resolve().unwrap();
        assert_eq!(date.format("%Y-%m-%d").to_string(), "2024-03-05");

        let epoch = StartTime::EpochMillis(1_709_596_800_000).resolve().unwrap();
        assert_eq!(epoch.format("%Y-%m-%d").to_string(), "2024-03-05");

        assert!(StartTime::Iso("yesterday".to_string()).resolve().is_err());
    }

    #[test]
    fn test_download_item_json() {
        let json = r#"{
            "mime": "image/png",
            "referrer": "",
            "url": "https://e.com/x.png",
            "finalUrl": "https://e.com/x.png",
            "filename": "x.png",
            "startTime": "2024-03-05T00:00:00Z"
        }"#;
        let item: DownloadItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.final_url, "https://e.com/x.png");
        assert!(matches!(item.start_time, StartTime::Iso(_)));

        let json = r#"{"filename": "x", "startTime": 0}"#;
        let item: DownloadItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.start_time, StartTime::EpochMillis(0));
    }
}
