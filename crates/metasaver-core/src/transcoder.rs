// File: crates/metasaver-core/src/transcoder.rs

use crate::command::TranscodeCommand;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::debug;

/// Exit code of one transcoder run. `None` means the process never produced
/// one (it could not be started, or was killed by a signal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnCode(Option<i32>);

impl ReturnCode {
    pub const SUCCESS: ReturnCode = ReturnCode(Some(0));
    pub const NOT_STARTED: ReturnCode = ReturnCode(None);

    pub fn new(code: i32) -> Self {
        ReturnCode(Some(code))
    }

    pub fn value(self) -> Option<i32> {
        self.0
    }

    pub fn is_success(self) -> bool {
        self.0 == Some(0)
    }
}

impl From<ExitStatus> for ReturnCode {
    fn from(status: ExitStatus) -> Self {
        ReturnCode(status.code())
    }
}

/// The finished run of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    return_code: ReturnCode,
    logs: String,
}

impl Session {
    pub fn new(return_code: ReturnCode, logs: impl Into<String>) -> Self {
        Self {
            return_code,
            logs: logs.into(),
        }
    }

    pub fn return_code(&self) -> ReturnCode {
        self.return_code
    }

    pub fn all_logs(&self) -> &str {
        &self.logs
    }

    /// The last `max_chars` characters of the log.
    pub fn log_tail(&self, max_chars: usize) -> &str {
        tail_chars(&self.logs, max_chars)
    }
}

fn tail_chars(text: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return "";
    }
    match text.char_indices().rev().nth(max_chars - 1) {
        Some((start, _)) => &text[start..],
        None => text,
    }
}

/// The media processor the pipeline hands its commands to.
///
/// Execution never errors: anything that goes wrong is reported through a
/// non-success [`ReturnCode`] and the session log.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn execute(&self, command: &TranscodeCommand) -> Session;
}

/// Runs the `ffmpeg` binary directly, without a shell in between.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn execute(&self, command: &TranscodeCommand) -> Session {
        debug!(program = %self.program.display(), args = %command.to_command_line(), "running transcoder");

        let output = Command::new(&self.program)
            .args(command.to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(output) => {
                let mut logs = String::from_utf8_lossy(&output.stdout).into_owned();
                logs.push_str(&String::from_utf8_lossy(&output.stderr));
                Session::new(output.status.into(), logs)
            }
            Err(e) => Session::new(
                ReturnCode::NOT_STARTED,
                format!("Failed to execute {}: {e}", self.program.display()),
            ),
        }
    }
}
