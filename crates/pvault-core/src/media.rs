//! Media references
//!
//! Records point at generated media either by URL or by embedding the file
//! inline as a base64 `data:` URL. Embedded media makes records large, which
//! is why the store treats every record as a potentially multi-megabyte value.

use std::path::Path;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::store::human_bytes;

/// A local file encoded as a data URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedMedia {
    pub data_url: String,
    pub mime_type: &'static str,
    pub is_video: bool,
}

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("svg", "image/svg+xml"),
];

const VIDEO_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("mov", "video/quicktime"),
    ("mkv", "video/x-matroska"),
];

/// MIME type for a file extension, if it is a supported image or video
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.to_ascii_lowercase();
    IMAGE_TYPES
        .iter()
        .chain(VIDEO_TYPES)
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// Read a local image or video and encode it as a data URL
pub fn embed_file(path: &Path) -> Result<EmbeddedMedia> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    let Some(mime_type) = mime_for_extension(ext) else {
        bail!(
            "Unsupported media type for {:?}. Use an image (png, jpg, gif, webp, bmp, svg) or video (mp4, webm, mov, mkv).",
            path
        );
    };

    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read media file {:?}", path))?;

    Ok(EmbeddedMedia {
        data_url: format!("data:{};base64,{}", mime_type, STANDARD.encode(&bytes)),
        mime_type,
        is_video: mime_type.starts_with("video/"),
    })
}

/// File extension for a supported MIME type
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    IMAGE_TYPES
        .iter()
        .chain(VIDEO_TYPES)
        .find(|(_, m)| m.eq_ignore_ascii_case(mime))
        .map(|(ext, _)| *ext)
}

/// Decode a base64 `data:` URL into its MIME type and bytes
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>)> {
    let Some(rest) = url.strip_prefix("data:") else {
        bail!("Not a data URL");
    };
    let Some((header, payload)) = rest.split_once(',') else {
        bail!("Malformed data URL: missing payload");
    };
    let Some(mime) = header.strip_suffix(";base64") else {
        bail!("Only base64 data URLs are supported");
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .context("Malformed data URL: invalid base64")?;
    Ok((mime.to_string(), bytes))
}

/// Whether a media reference points at a video
pub fn looks_like_video(url: &str) -> bool {
    if let Some(rest) = url.strip_prefix("data:") {
        return rest.starts_with("video/");
    }

    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit_once('.')
        .map(|(_, ext)| {
            VIDEO_TYPES
                .iter()
                .any(|(e, _)| e.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Short label for display; data URLs are summarized, never printed whole
pub fn describe_media(url: &str) -> String {
    let Some(rest) = url.strip_prefix("data:") else {
        return url.to_string();
    };

    let (header, payload) = rest.split_once(',').unwrap_or((rest, ""));
    let mime = header.split(';').next().unwrap_or("unknown");
    let decoded_len = if header.ends_with(";base64") {
        (payload.len() as u64 / 4) * 3
    } else {
        payload.len() as u64
    };

    format!("[embedded {}, {}]", mime, human_bytes(decoded_len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for_extension("PNG"), Some("image/png"));
        assert_eq!(mime_for_extension("jpeg"), Some("image/jpeg"));
        assert_eq!(mime_for_extension("mov"), Some("video/quicktime"));
        assert_eq!(mime_for_extension("txt"), None);
    }

    #[test]
    fn test_embed_image() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.png");
        std::fs::write(&path, b"hello").unwrap();

        let media = embed_file(&path).unwrap();
        assert_eq!(media.data_url, "data:image/png;base64,aGVsbG8=");
        assert_eq!(media.mime_type, "image/png");
        assert!(!media.is_video);
    }

    #[test]
    fn test_embed_video() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("clip.MP4");
        std::fs::write(&path, [0u8, 1, 2]).unwrap();

        let media = embed_file(&path).unwrap();
        assert!(media.data_url.starts_with("data:video/mp4;base64,"));
        assert!(media.is_video);
    }

    #[test]
    fn test_embed_rejects_unknown_type() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        std::fs::write(&path, b"text").unwrap();

        assert!(embed_file(&path).is_err());
    }

    #[test]
    fn test_embed_missing_file() {
        assert!(embed_file(Path::new("/definitely/not/here.png")).is_err());
    }

    #[test]
    fn test_decode_data_url() {
        let (mime, bytes) = decode_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, b"hello");
        assert_eq!(extension_for_mime(&mime), Some("png"));

        assert!(decode_data_url("https://cdn.example.com/a.png").is_err());
        assert!(decode_data_url("data:text/plain,hello").is_err());
        assert!(decode_data_url("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn test_looks_like_video() {
        assert!(looks_like_video("data:video/webm;base64,AAAA"));
        assert!(!looks_like_video("data:image/png;base64,AAAA"));
        assert!(looks_like_video("https://cdn.example.com/clip.mp4?sig=abc"));
        assert!(looks_like_video("https://cdn.example.com/clip.MOV"));
        assert!(!looks_like_video("https://cdn.example.com/still.png"));
        assert!(!looks_like_video("https://cdn.example.com/no-extension"));
    }

    #[test]
    fn test_describe_media() {
        assert_eq!(
            describe_media("https://cdn.example.com/a.png"),
            "https://cdn.example.com/a.png"
        );
        assert_eq!(
            describe_media("data:image/png;base64,aGVsbG8h"),
            "[embedded image/png, 6 B]"
        );
    }
}
