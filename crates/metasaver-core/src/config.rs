// File: crates/metasaver-core/src/config.rs

use std::path::{Path, PathBuf};

/// How many trailing characters of the transcoder log end up in an error.
pub const DEFAULT_LOG_TAIL_CHARS: usize = 500;

/// Name of the app-private folder that receives cleaned files.
pub const OUTPUT_FOLDER: &str = "metasaver";

/// Name of the user-visible folder that receives saved copies.
pub const SAVE_FOLDER: &str = "MetaSaver";

/// Knobs for the strip pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripConfig {
    /// Where `clean_<millis>.<ext>` files are written. Created on demand.
    pub output_dir: PathBuf,
    pub log_tail_chars: usize,
    /// JPEG `-q:v` value, 1 (best) to 31.
    pub jpeg_quality: u8,
    pub video_codec: String,
    pub video_preset: String,
    pub video_crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// Treat a zero-length output as a failure.
    pub require_nonempty_output: bool,
}

impl StripConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            log_tail_chars: DEFAULT_LOG_TAIL_CHARS,
            jpeg_quality: 2,
            video_codec: "libx264".to_string(),
            video_preset: "veryfast".to_string(),
            video_crf: 23,
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            require_nonempty_output: false,
        }
    }
}

/// Well-known storage locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dirs {
    pub cache: PathBuf,
    pub documents: PathBuf,
    pub pictures: PathBuf,
}

impl Dirs {
    pub fn new(
        cache: impl Into<PathBuf>,
        documents: impl Into<PathBuf>,
        pictures: impl Into<PathBuf>,
    ) -> Self {
        Self {
            cache: cache.into(),
            documents: documents.into(),
            pictures: pictures.into(),
        }
    }

    /// Resolves the platform directories, falling back to the temp dir
    /// wherever the platform has no answer.
    pub fn from_platform() -> Self {
        let fallback = std::env::temp_dir();
        let cache = dirs::cache_dir()
            .map(|dir| dir.join(OUTPUT_FOLDER))
            .unwrap_or_else(|| fallback.join(OUTPUT_FOLDER));
        let documents = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| fallback.clone());
        let pictures = dirs::picture_dir()
            .or_else(dirs::home_dir)
            .unwrap_or(fallback);
        Self {
            cache,
            documents,
            pictures,
        }
    }

    /// `<documents>/metasaver`
    pub fn output_dir(&self) -> PathBuf {
        self.documents.join(OUTPUT_FOLDER)
    }

    /// `<pictures>/MetaSaver`
    pub fn save_dir(&self) -> PathBuf {
        self.pictures.join(SAVE_FOLDER)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache
    }
}
