// File: crates/metasaver-core/src/pipeline.rs

//! The metadata-strip pipeline.
//!
//! One call classifies the input, picks a strategy, runs it through the
//! [`Transcoder`], falls back once for videos, and checks that the promised
//! output really landed on disk.

use crate::command::TranscodeCommand;
use crate::config::StripConfig;
use crate::gateway::FileGateway;
use crate::kind::{MediaAsset, MediaKind};
use crate::strategy::{AttemptState, Strategy};
use crate::transcoder::Transcoder;
use crate::MetaSaverError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Source of the millisecond timestamps used in output names.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A single transformation attempt: which strategy, and the exact command.
#[derive(Debug, Clone)]
pub struct StripJob {
    pub asset: MediaAsset,
    pub output_path: PathBuf,
    pub strategy: Strategy,
    pub command: TranscodeCommand,
}

impl StripJob {
    pub fn new(
        asset: &MediaAsset,
        output_path: &Path,
        strategy: Strategy,
        config: &StripConfig,
    ) -> Self {
        let command = strategy.command(asset.path(), output_path, config);
        Self {
            asset: asset.clone(),
            output_path: output_path.to_path_buf(),
            strategy,
            command,
        }
    }
}

/// A verified, metadata-free output. The caller now owns the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripOutcome {
    pub output_path: PathBuf,
    pub kind: MediaKind,
    /// The strategy that produced the file.
    pub strategy: Strategy,
}

pub type StripResult = Result<StripOutcome, MetaSaverError>;

/// `clean_<millis>.<ext>`
pub fn output_file_name(kind: MediaKind, millis: i64) -> String {
    format!("clean_{millis}.{}", kind.output_extension())
}

pub struct StripPipeline {
    gateway: Arc<dyn FileGateway>,
    transcoder: Arc<dyn Transcoder>,
    clock: Arc<dyn Clock>,
    config: StripConfig,
}

impl StripPipeline {
    pub fn new(
        gateway: Arc<dyn FileGateway>,
        transcoder: Arc<dyn Transcoder>,
        config: StripConfig,
    ) -> Self {
        Self {
            gateway,
            transcoder,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &StripConfig {
        &self.config
    }

    /// Produces a metadata-free copy of `input` under the output directory.
    #[instrument(skip_all, fields(input = %input.display()))]
    pub async fn strip_metadata(&self, input: &Path) -> StripResult {
        if !self.gateway.exists(input).await {
            return Err(MetaSaverError::InputMissing(input.to_path_buf()));
        }
        let asset = MediaAsset::new(input)?;

        self.gateway.mkdir(&self.config.output_dir).await?;
        let output_path = self.config.output_dir.join(output_file_name(
            asset.kind(),
            self.clock.now_millis(),
        ));

        let mut state = AttemptState::start(asset.kind());
        let mut log_tail = String::new();
        let strategy = loop {
            match state {
                AttemptState::Attempting(strategy) => {
                    let job = StripJob::new(&asset, &output_path, strategy, &self.config);
                    info!(strategy = %job.strategy, output = %job.output_path.display(), "submitting strip job");

                    let session = self.transcoder.execute(&job.command).await;
                    let succeeded = session.return_code().is_success();
                    if !succeeded {
                        log_tail = session.log_tail(self.config.log_tail_chars).to_string();
                        warn!(
                            strategy = %strategy,
                            code = ?session.return_code().value(),
                            "transcoder run failed"
                        );
                    }
                    state = state.advance(succeeded);
                }
                AttemptState::Succeeded(strategy) => break strategy,
                AttemptState::Failed(phase) => {
                    return Err(MetaSaverError::StripFailed {
                        kind: asset.kind(),
                        phase,
                        log_tail,
                    });
                }
            }
        };

        // The transcoder's word is not enough.
        if !self.gateway.exists(&output_path).await {
            return Err(MetaSaverError::OutputMissing(output_path));
        }
        if self.config.require_nonempty_output && self.gateway.file_size(&output_path).await? == 0 {
            return Err(MetaSaverError::EmptyOutput(output_path));
        }

        info!(strategy = %strategy, output = %output_path.display(), "metadata stripped");
        Ok(StripOutcome {
            output_path,
            kind: asset.kind(),
            strategy,
        })
    }
}
