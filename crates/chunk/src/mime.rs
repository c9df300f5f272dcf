//! MIME type classification and streaming sub-format candidates.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Broad rendering category of an object, derived from its MIME type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Svg,
    Audio,
    Video,
    Html,
    Text,
    Binary,
}
impl MediaKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Svg => "svg",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Html => "html",
            Self::Text => "text",
            Self::Binary => "binary",
        }
    }

    /// Audio and video can be fed progressively into a playback sink.
    #[must_use]
    pub fn is_streamable(&self) -> bool {
        matches!(self, Self::Audio | Self::Video)
    }
}
impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Trimmed, lower-cased MIME type; `None` if empty.
#[must_use]
pub fn normalize_mime(mime: Option<&str>) -> Option<String> {
    let normalized = mime?.trim().to_ascii_lowercase();
    (!normalized.is_empty()).then_some(normalized)
}

#[must_use]
pub fn media_kind(mime: Option<&str>) -> MediaKind {
    let Some(mime) = normalize_mime(mime) else {
        return MediaKind::Binary;
    };
    match mime.as_str() {
        "image/svg+xml" => MediaKind::Svg,
        m if m.starts_with("image/") => MediaKind::Image,
        m if m.starts_with("audio/") => MediaKind::Audio,
        m if m.starts_with("video/") => MediaKind::Video,
        "text/html" | "application/xhtml+xml" | "application/pdf" => MediaKind::Html,
        m if m.starts_with("text/") => MediaKind::Text,
        "application/json" | "application/xml" | "application/javascript" => MediaKind::Text,
        _ => MediaKind::Binary,
    }
}

#[must_use]
pub fn is_streamable(mime: Option<&str>) -> bool {
    media_kind(mime).is_streamable()
}

/// Guess a MIME type from the first four bytes of content.
#[must_use]
pub fn sniff(bytes: &[u8]) -> Option<&'static str> {
    let head = bytes.get(..4)?;
    match head {
        [0x1a, 0x45, 0xdf, 0xa3] => Some("audio/webm"),
        b"RIFF" => Some("audio/wav"),
        [0x89, b'P', b'N', b'G'] => Some("image/png"),
        [0xff, 0xd8, 0xff, _] => Some("image/jpeg"),
        b"GIF8" => Some("image/gif"),
        b"%PDF" => Some("application/pdf"),
        _ => None,
    }
}

/// Resolve the effective MIME type of content.
///
/// The declared type wins unless it is missing or generic
/// (`application/json`, `application/octet-stream`), in which case sniffed
/// magic bytes take precedence.
#[must_use]
pub fn resolve_mime(declared: Option<&str>, bytes: &[u8]) -> Option<String> {
    let normalized = normalize_mime(declared);
    if bytes.is_empty() {
        return normalized;
    }
    match normalized.as_deref() {
        None | Some("application/json") | Some("application/octet-stream") => {
            sniff(bytes).map(str::to_string).or(normalized)
        },
        _ => normalized,
    }
}

/// Ordered list of sub-formats to try when opening a playback sink.
///
/// Exact match first, then the parameter-stripped base type, then quoting
/// variants of any declared codecs. WebM containers without declared codecs
/// get the common codec pairings appended; `video/webm` also tries the
/// audio-only pairing because audio-only WebM files are often labelled as
/// video.
#[must_use]
pub fn stream_mime_candidates(mime: Option<&str>) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    let mut push = |candidate: String| {
        if !candidate.is_empty() && !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    };
    let Some(trimmed) = normalize_mime(mime) else {
        return Vec::new();
    };
    push(trimmed.clone());
    let base = trimmed.split(';').next().unwrap_or_default().trim().to_string();
    push(base.clone());

    let codecs = trimmed
        .find("codecs=")
        .map(|at| trimmed[at + "codecs=".len()..].split(';').next().unwrap_or_default().trim().trim_matches('"'));
    match codecs {
        Some(codecs) if !codecs.is_empty() && !base.is_empty() => {
            push(format!("{base}; codecs={codecs}"));
            push(format!("{base}; codecs=\"{codecs}\""));
        },
        Some(_) => {},
        None => {
            let pairings: &[&str] = match base.as_str() {
                "audio/webm" => &["audio/webm|opus"],
                "video/webm" => &["video/webm|vp9,opus", "video/webm|vp8,opus", "video/webm|vp9", "video/webm|vp8", "audio/webm|opus"],
                _ => &[],
            };
            for pairing in pairings {
                let (container, codecs) = pairing.split_once('|').unwrap_or((pairing, ""));
                push(format!("{container}; codecs={codecs}"));
                push(format!("{container}; codecs=\"{codecs}\""));
            }
        },
    }

    let unquoted = trimmed.replace('"', "");
    push(unquoted.split_whitespace().collect::<Vec<_>>().join(" "));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, MediaKind::Binary)]
    #[case(Some("  IMAGE/PNG "), MediaKind::Image)]
    #[case(Some("image/svg+xml"), MediaKind::Svg)]
    #[case(Some("audio/mpeg"), MediaKind::Audio)]
    #[case(Some("video/webm; codecs=vp9"), MediaKind::Video)]
    #[case(Some("application/pdf"), MediaKind::Html)]
    #[case(Some("text/plain"), MediaKind::Text)]
    #[case(Some("application/json"), MediaKind::Text)]
    #[case(Some("application/zip"), MediaKind::Binary)]
    fn test_media_kind(#[case] mime: Option<&str>, #[case] expected: MediaKind) {
        assert_eq!(media_kind(mime), expected);
    }

    #[rstest]
    #[case(&[0x89, b'P', b'N', b'G', 0x0d], Some("image/png"))]
    #[case(&[0xff, 0xd8, 0xff, 0xe0], Some("image/jpeg"))]
    #[case(b"RIFF....", Some("audio/wav"))]
    #[case(b"%PDF-1.7", Some("application/pdf"))]
    #[case(&[0x1a, 0x45, 0xdf, 0xa3], Some("audio/webm"))]
    #[case(b"abc", None)]
    #[case(b"plain", None)]
    fn test_sniff(#[case] bytes: &[u8], #[case] expected: Option<&str>) {
        assert_eq!(sniff(bytes), expected);
    }

    #[test]
    fn resolve_prefers_declared_specific_type() {
        assert_eq!(resolve_mime(Some("image/gif"), b"\x89PNG...").as_deref(), Some("image/gif"));
        assert_eq!(resolve_mime(Some("application/octet-stream"), b"\x89PNG...").as_deref(), Some("image/png"));
        assert_eq!(resolve_mime(None, b"GIF89a").as_deref(), Some("image/gif"));
        assert_eq!(resolve_mime(None, b"").as_deref(), None);
    }

    #[test]
    fn candidates_for_plain_audio() {
        assert_eq!(stream_mime_candidates(Some("audio/mpeg")), vec!["audio/mpeg".to_string()]);
        assert!(stream_mime_candidates(None).is_empty());
    }

    #[test]
    fn candidates_strip_parameters_and_requote() {
        let candidates = stream_mime_candidates(Some("video/mp4; codecs=\"avc1.42E01E\""));
        assert_eq!(candidates[0], "video/mp4; codecs=\"avc1.42e01e\"");
        assert_eq!(candidates[1], "video/mp4");
        assert!(candidates.contains(&"video/mp4; codecs=avc1.42e01e".to_string()));
    }

    #[test]
    fn candidates_for_bare_video_webm_include_audio_fallback() {
        let candidates = stream_mime_candidates(Some("video/webm"));
        assert_eq!(candidates[0], "video/webm");
        assert_eq!(candidates[1], "video/webm; codecs=vp9,opus");
        assert!(candidates.contains(&"audio/webm; codecs=\"opus\"".to_string()));
        // No duplicates.
        let mut deduped = candidates.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), candidates.len());
    }
}
