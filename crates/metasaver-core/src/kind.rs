// File: crates/metasaver-core/src/kind.rs

use crate::MetaSaverError;
use std::fmt;
use std::path::{Path, PathBuf};

/// Suffixes treated as still images.
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".heic"];
/// Suffixes treated as videos.
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mov", ".m4v", ".mkv"];

/// The two kinds of media the pipeline knows how to clean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Extension of the cleaned output. Images always become JPEG, videos MP4.
    pub fn output_extension(self) -> &'static str {
        match self {
            MediaKind::Image => "jpg",
            MediaKind::Video => "mp4",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Determines the media kind from the file name alone.
///
/// Matching is a case-insensitive suffix test, so `photo.JPG` is an image.
/// The file is never touched; checking that it exists is the caller's job.
pub fn classify(path: impl AsRef<Path>) -> Result<MediaKind, MetaSaverError> {
    let path = path.as_ref();
    let lower = path.to_string_lossy().to_lowercase();
    if lower.is_empty() {
        return Err(MetaSaverError::UnsupportedKind("empty path".to_string()));
    }

    if IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return Ok(MediaKind::Image);
    }
    if VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return Ok(MediaKind::Video);
    }

    Err(MetaSaverError::UnsupportedKind(path.display().to_string()))
}

/// Bytes of file header needed by [`sniff_extension`].
pub const SNIFF_LEN: usize = 16;

/// Guesses a supported extension from the first bytes of a file.
///
/// Used for references that carry no name of their own. Returns `None` for
/// anything that is not a JPEG, PNG, HEIC, ISO-BMFF video or Matroska file.
pub fn sniff_extension(head: &[u8]) -> Option<&'static str> {
    const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];
    const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

    if head.starts_with(&[0xFF, 0xD8]) {
        return Some("jpg");
    }
    if head.starts_with(&PNG_SIGNATURE) {
        return Some("png");
    }
    if head.starts_with(&EBML_MAGIC) {
        return Some("mkv");
    }
    if head.len() >= 12 && &head[4..8] == b"ftyp" {
        return match &head[8..12] {
            b"heic" | b"heix" | b"heim" | b"heis" | b"mif1" | b"msf1" => Some("heic"),
            b"qt  " => Some("mov"),
            b"M4V " => Some("m4v"),
            _ => Some("mp4"),
        };
    }
    None
}

/// A source file together with the kind it was classified as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    path: PathBuf,
    kind: MediaKind,
}

impl MediaAsset {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, MetaSaverError> {
        let path = path.into();
        let kind = classify(&path)?;
        Ok(Self { path, kind })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }
}
