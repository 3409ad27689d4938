// File: crates/metasaver-core/src/strategy.rs

use crate::command::TranscodeCommand;
use crate::config::StripConfig;
use crate::kind::MediaKind;
use std::fmt;
use std::path::Path;

/// Keeps both dimensions even; some encoders reject odd sizes with 4:2:0 chroma.
const EVEN_DIMENSIONS_FILTER: &str = "scale=trunc(iw/2)*2:trunc(ih/2)*2";

/// Tags cleared explicitly on top of `-map_metadata -1`.
const TIMESTAMP_TAGS: &[&str] = &["creation_time", "date"];

/// A way of producing a metadata-free copy of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Decode the image and write a fresh JPEG.
    ReencodeImage,
    /// Remux audio and video untouched, dropping container metadata.
    StreamCopyVideo,
    /// Full H.264/AAC re-encode, used when the remux fails.
    ReencodeVideoFallback,
}

impl Strategy {
    /// The first strategy to try for a kind.
    pub fn first_for(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => Strategy::ReencodeImage,
            MediaKind::Video => Strategy::StreamCopyVideo,
        }
    }

    /// What to try next when this strategy fails, if anything.
    pub fn fallback(self) -> Option<Self> {
        match self {
            Strategy::StreamCopyVideo => Some(Strategy::ReencodeVideoFallback),
            Strategy::ReencodeImage | Strategy::ReencodeVideoFallback => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::ReencodeImage => "reencode-image",
            Strategy::StreamCopyVideo => "stream-copy-video",
            Strategy::ReencodeVideoFallback => "reencode-video-fallback",
        }
    }

    /// The full directive set for running this strategy on `input`.
    pub fn command(self, input: &Path, output: &Path, config: &StripConfig) -> TranscodeCommand {
        let builder = TranscodeCommand::builder()
            .overwrite()
            .input(input)
            .drop_global_metadata();

        match self {
            Strategy::ReencodeImage => {
                let mut builder = builder;
                for tag in TIMESTAMP_TAGS {
                    builder = builder.clear_tag(tag);
                }
                // A still image is a single-frame video stream to the transcoder.
                for tag in TIMESTAMP_TAGS {
                    builder = builder.clear_first_video_stream_tag(tag);
                }
                builder
                    .video_filter(EVEN_DIMENSIONS_FILTER)
                    .pair("-frames:v", "1")
                    .pair("-q:v", config.jpeg_quality.to_string())
                    .output(output)
            }
            Strategy::StreamCopyVideo => builder.pair("-c", "copy").output(output),
            Strategy::ReencodeVideoFallback => builder
                .pair("-c:v", config.video_codec.clone())
                .pair("-preset", config.video_preset.clone())
                .pair("-crf", config.video_crf.to_string())
                .pair("-c:a", config.audio_codec.clone())
                .pair("-b:a", config.audio_bitrate.clone())
                .output(output),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress through the strategies for one strip job.
///
/// `Attempting(fast)` moves to `Succeeded` or, on failure, to
/// `Attempting(fallback)` when one exists and `Failed` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Attempting(Strategy),
    Succeeded(Strategy),
    Failed(Strategy),
}

impl AttemptState {
    pub fn start(kind: MediaKind) -> Self {
        AttemptState::Attempting(Strategy::first_for(kind))
    }

    /// Feeds the outcome of the current attempt. Terminal states stay put.
    pub fn advance(self, succeeded: bool) -> Self {
        match self {
            AttemptState::Attempting(strategy) if succeeded => AttemptState::Succeeded(strategy),
            AttemptState::Attempting(strategy) => match strategy.fallback() {
                Some(next) => AttemptState::Attempting(next),
                None => AttemptState::Failed(strategy),
            },
            terminal => terminal,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, AttemptState::Attempting(_))
    }
}
