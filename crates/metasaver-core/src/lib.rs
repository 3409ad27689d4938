// crates/metasaver-core/src/lib.rs

pub mod acquire;
pub mod command;
pub mod config;
pub mod gateway;
pub mod inspect;
pub mod kind;
pub mod pipeline;
pub mod screen;
pub mod strategy;
pub mod transcoder;

#[cfg(test)]
pub(crate) mod testing;

use std::path::PathBuf;
use thiserror::Error;

pub use acquire::{MediaPicker, Source, acquire};
pub use command::{CommandBuilder, Directive, TranscodeCommand};
pub use config::{Dirs, StripConfig};
pub use gateway::{DownloadResult, FileGateway, LocalFs};
pub use inspect::{MetadataEntry, inspect_bytes, inspect_file};
pub use kind::{MediaAsset, MediaKind, classify};
pub use pipeline::{Clock, StripJob, StripOutcome, StripPipeline, StripResult, SystemClock};
pub use screen::{AdmissionGate, Notice, ScreenController, ScreenState};
pub use strategy::{AttemptState, Strategy};
pub use transcoder::{FfmpegTranscoder, ReturnCode, Session, Transcoder};

/// A universal error type for everything between picking a file and saving its clean copy.
#[derive(Error, Debug)]
pub enum MetaSaverError {
    #[error("Input file does not exist: {}", .0.display())]
    InputMissing(PathBuf),

    #[error("Unsupported file type: {0}. Only common image/video formats are supported.")]
    UnsupportedKind(String),

    #[error("Transcoder failed to strip metadata ({kind}) during {phase}:\n{log_tail}")]
    StripFailed {
        kind: MediaKind,
        phase: Strategy,
        log_tail: String,
    },

    #[error("Output file not created: {}", .0.display())]
    OutputMissing(PathBuf),

    #[error("Output file is empty: {}", .0.display())]
    EmptyOutput(PathBuf),

    #[error("Could not copy {url} (HTTP status {status})")]
    Download { url: String, status: u16 },

    #[error("File parsing failed: {0}")]
    ParsingError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
