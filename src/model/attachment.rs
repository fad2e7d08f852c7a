//! Attachment metadata.
//!
//! The file itself is NOT opened or decoded here. Only its existence, kind and
//! size are reported so clients can decide whether to fetch it.

use std::path::Path;

/// Broad media category used by clients to pick a presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Video,
    Audio,
    File,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "svg"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm", "3gp"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "aac", "flac", "opus"];

impl AttachmentKind {
    /// Classify an attachment by the extension of its name (case-insensitive).
    pub fn from_name(name: &str) -> Self {
        let ext = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let ext = ext.as_str();
        if IMAGE_EXTENSIONS.contains(&ext) {
            Self::Image
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            Self::Video
        } else if AUDIO_EXTENSIONS.contains(&ext) {
            Self::Audio
        } else {
            Self::File
        }
    }

    /// MIME type to announce when serving a file with the given name.
    pub fn content_type(name: &str) -> &'static str {
        let ext = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "bmp" => "image/bmp",
            "webp" => "image/webp",
            "svg" => "image/svg+xml",
            "mp4" => "video/mp4",
            "avi" => "video/x-msvideo",
            "mov" => "video/quicktime",
            "mkv" => "video/x-matroska",
            "webm" => "video/webm",
            "3gp" => "video/3gpp",
            "mp3" => "audio/mpeg",
            "wav" => "audio/wav",
            "ogg" | "opus" => "audio/ogg",
            "m4a" => "audio/mp4",
            "aac" => "audio/aac",
            "flac" => "audio/flac",
            "pdf" => "application/pdf",
            "txt" => "text/plain; charset=utf-8",
            "vcf" => "text/vcard",
            _ => "application/octet-stream",
        }
    }
}

/// Resolved metadata for one attachment reference.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AttachmentInfo {
    /// Name as written in the export.
    pub name: String,

    /// Media category derived from the extension.
    #[serde(rename = "type")]
    pub kind: AttachmentKind,

    /// Whether the file was found in the attachment directory.
    pub exists: bool,

    /// Human-readable size, or a short reason when the file is unavailable.
    pub size: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(AttachmentKind::from_name("foto.JPG"), AttachmentKind::Image);
        assert_eq!(AttachmentKind::from_name("clip.3gp"), AttachmentKind::Video);
        assert_eq!(AttachmentKind::from_name("nota.opus"), AttachmentKind::Audio);
        assert_eq!(AttachmentKind::from_name("doc.pdf"), AttachmentKind::File);
        assert_eq!(AttachmentKind::from_name("noext"), AttachmentKind::File);
    }

    #[test]
    fn test_serializes_kind_as_type() {
        let info = AttachmentInfo {
            name: "a.png".into(),
            kind: AttachmentKind::Image,
            exists: false,
            size: "File not found".into(),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["exists"], false);
    }

    #[test]
    fn test_content_type() {
        assert_eq!(AttachmentKind::content_type("x.jpeg"), "image/jpeg");
        assert_eq!(
            AttachmentKind::content_type("x.bin"),
            "application/octet-stream"
        );
    }
}
