//! Pipeline input media.
//!
//! Pipelines consume media straight from the client upload, independent of
//! which items have been persisted as [`Media`](crate::models::Media) rows.

use serde::{Deserialize, Serialize};

use crate::models::MediaKind;

/// One media item handed to the vision stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum MediaBlob {
    /// Raw bytes uploaded by the client.
    Inline { data: Vec<u8>, mime_type: String },
    /// External reference such as a video link.
    Reference {
        uri: String,
        mime_type: Option<String>,
    },
}

impl MediaBlob {
    pub fn inline(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        MediaBlob::Inline {
            data,
            mime_type: mime_type.into(),
        }
    }

    pub fn reference(uri: impl Into<String>, mime_type: Option<String>) -> Self {
        MediaBlob::Reference {
            uri: uri.into(),
            mime_type,
        }
    }

    pub fn mime_type(&self) -> Option<&str> {
        match self {
            MediaBlob::Inline { mime_type, .. } => Some(mime_type),
            MediaBlob::Reference { mime_type, .. } => mime_type.as_deref(),
        }
    }

    /// Size in bytes for inline data, zero for references.
    pub fn byte_len(&self) -> usize {
        match self {
            MediaBlob::Inline { data, .. } => data.len(),
            MediaBlob::Reference { .. } => 0,
        }
    }

    /// Persisted kind this item would be saved as.
    pub fn kind(&self) -> MediaKind {
        match self {
            MediaBlob::Inline { mime_type, .. } => media_kind_for_mime(mime_type),
            MediaBlob::Reference { uri, mime_type } => {
                if is_youtube_uri(uri) {
                    MediaKind::Youtube
                } else {
                    mime_type
                        .as_deref()
                        .map(media_kind_for_mime)
                        .unwrap_or(MediaKind::Video)
                }
            }
        }
    }
}

/// Detect a MIME type from magic bytes.
pub fn detect_mime_type(data: &[u8]) -> Option<&'static str> {
    infer::get(data).map(|kind| kind.mime_type())
}

/// `video/*` is video, everything else is treated as an image.
pub fn media_kind_for_mime(mime_type: &str) -> MediaKind {
    if mime_type.to_ascii_lowercase().starts_with("video/") {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}

fn is_youtube_uri(uri: &str) -> bool {
    let lower = uri.to_ascii_lowercase();
    lower.contains("youtube.com/") || lower.contains("youtu.be/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn test_detect_mime_type_png() {
        assert_eq!(detect_mime_type(PNG_HEADER), Some("image/png"));
    }

    #[test]
    fn test_detect_mime_type_jpeg() {
        assert_eq!(detect_mime_type(JPEG_HEADER), Some("image/jpeg"));
    }

    #[test]
    fn test_detect_mime_type_unknown() {
        assert_eq!(detect_mime_type(b"plain text"), None);
    }

    #[test]
    fn test_media_kind_for_mime() {
        assert_eq!(media_kind_for_mime("video/mp4"), MediaKind::Video);
        assert_eq!(media_kind_for_mime("VIDEO/webm"), MediaKind::Video);
        assert_eq!(media_kind_for_mime("image/png"), MediaKind::Image);
        assert_eq!(media_kind_for_mime("application/dicom"), MediaKind::Image);
    }

    #[test]
    fn test_blob_kind() {
        assert_eq!(
            MediaBlob::inline(vec![1, 2], "video/mp4").kind(),
            MediaKind::Video
        );
        assert_eq!(
            MediaBlob::reference("https://www.youtube.com/watch?v=x", None).kind(),
            MediaKind::Youtube
        );
        assert_eq!(
            MediaBlob::reference("gs://bucket/xray.png", Some("image/png".into())).kind(),
            MediaKind::Image
        );
    }

    #[test]
    fn test_blob_accessors() {
        let blob = MediaBlob::inline(vec![0; 16], "image/png");
        assert_eq!(blob.mime_type(), Some("image/png"));
        assert_eq!(blob.byte_len(), 16);

        let blob = MediaBlob::reference("https://youtu.be/abc", None);
        assert_eq!(blob.mime_type(), None);
        assert_eq!(blob.byte_len(), 0);
    }
}
