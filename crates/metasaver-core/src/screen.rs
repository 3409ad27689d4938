// File: crates/metasaver-core/src/screen.rs

//! The capture → preview → confirm → save flow, without any widgets.

use crate::acquire::{MediaPicker, Source, acquire};
use crate::config::Dirs;
use crate::gateway::FileGateway;
use crate::pipeline::{Clock, StripPipeline, SystemClock};
use crate::MetaSaverError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, instrument, warn};

/// Single-slot admission for long-running work.
///
/// A second caller is turned away while the slot is taken; nothing queues.
#[derive(Debug, Default)]
pub struct AdmissionGate {
    busy: AtomicBool,
}

impl AdmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the slot. Returns `false` if it was already taken.
    pub fn try_acquire(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Takes the slot for as long as the returned permit lives.
    fn enter(&self) -> Option<Permit<'_>> {
        self.try_acquire().then_some(Permit { gate: self })
    }
}

struct Permit<'a> {
    gate: &'a AdmissionGate,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenState {
    /// Live camera, waiting for a capture or a gallery pick.
    Capturing,
    Previewing { media: PathBuf },
    /// The save prompt is showing.
    ConfirmingSave { media: PathBuf },
    Saving { media: PathBuf },
}

/// What the user should be told after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Busy, or the action makes no sense in the current state.
    Ignored,
    Cancelled,
    Preview(PathBuf),
    ConfirmSave(PathBuf),
    Discarded,
    Saved(PathBuf),
    Error(String),
}

/// `metasaver_<millis>.<ext>`
pub fn saved_file_name(millis: i64, ext: &str) -> String {
    format!("metasaver_{millis}.{ext}")
}

pub struct ScreenController {
    state: Mutex<ScreenState>,
    gate: AdmissionGate,
    pipeline: StripPipeline,
    picker: Arc<dyn MediaPicker>,
    gateway: Arc<dyn FileGateway>,
    cache_dir: PathBuf,
    save_dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl ScreenController {
    pub fn new(
        pipeline: StripPipeline,
        picker: Arc<dyn MediaPicker>,
        gateway: Arc<dyn FileGateway>,
        dirs: Dirs,
    ) -> Self {
        Self {
            state: Mutex::new(ScreenState::Capturing),
            gate: AdmissionGate::new(),
            pipeline,
            picker,
            gateway,
            cache_dir: dirs.cache_dir().to_path_buf(),
            save_dir: dirs.save_dir(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Saves into `save_dir` instead of `<pictures>/MetaSaver`.
    pub fn with_save_dir(mut self, save_dir: impl Into<PathBuf>) -> Self {
        self.save_dir = save_dir.into();
        self
    }

    pub fn state(&self) -> ScreenState {
        self.lock_state().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    fn lock_state(&self) -> MutexGuard<'_, ScreenState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, state: ScreenState) {
        *self.lock_state() = state;
    }

    pub async fn take_photo(&self) -> Notice {
        self.acquire_into_preview(Source::Camera).await
    }

    pub async fn pick_from_gallery(&self) -> Notice {
        self.acquire_into_preview(Source::Gallery).await
    }

    #[instrument(skip(self))]
    async fn acquire_into_preview(&self, source: Source) -> Notice {
        if self.state() != ScreenState::Capturing {
            return Notice::Ignored;
        }
        let Some(_permit) = self.gate.enter() else {
            return Notice::Ignored;
        };

        match acquire(
            self.picker.as_ref(),
            self.gateway.as_ref(),
            &self.cache_dir,
            source,
        )
        .await
        {
            Ok(Some(media)) => {
                self.set_state(ScreenState::Previewing {
                    media: media.clone(),
                });
                Notice::Preview(media)
            }
            Ok(None) => Notice::Cancelled,
            Err(e) => {
                warn!(error = %e, "acquisition failed");
                Notice::Error(e.to_string())
            }
        }
    }

    /// Drops the pending media and goes back to the camera.
    pub fn discard(&self) -> Notice {
        let mut state = self.lock_state();
        match &*state {
            ScreenState::Previewing { .. } | ScreenState::ConfirmingSave { .. } => {
                *state = ScreenState::Capturing;
                Notice::Discarded
            }
            _ => Notice::Ignored,
        }
    }

    /// Asks for confirmation before saving.
    pub fn request_save(&self) -> Notice {
        let mut state = self.lock_state();
        match &*state {
            ScreenState::Previewing { media } => {
                let media = media.clone();
                *state = ScreenState::ConfirmingSave {
                    media: media.clone(),
                };
                Notice::ConfirmSave(media)
            }
            _ => Notice::Ignored,
        }
    }

    pub fn cancel_save(&self) -> Notice {
        let mut state = self.lock_state();
        match &*state {
            ScreenState::ConfirmingSave { media } => {
                let media = media.clone();
                *state = ScreenState::Previewing {
                    media: media.clone(),
                };
                Notice::Preview(media)
            }
            _ => Notice::Ignored,
        }
    }

    /// Strips the pending media and saves the clean copy to the pictures folder.
    #[instrument(skip(self))]
    pub async fn confirm_save(&self) -> Notice {
        let Some(_permit) = self.gate.enter() else {
            return Notice::Ignored;
        };
        let media = {
            let mut state = self.lock_state();
            let ScreenState::ConfirmingSave { media } = &*state else {
                return Notice::Ignored;
            };
            let media = media.clone();
            *state = ScreenState::Saving {
                media: media.clone(),
            };
            media
        };

        match self.strip_and_save(&media).await {
            Ok(dest) => {
                info!(dest = %dest.display(), "clean copy saved");
                self.set_state(ScreenState::Capturing);
                Notice::Saved(dest)
            }
            Err(e) => {
                warn!(error = %e, "save failed");
                self.set_state(ScreenState::Previewing { media });
                Notice::Error(e.to_string())
            }
        }
    }

    async fn strip_and_save(&self, media: &Path) -> Result<PathBuf, MetaSaverError> {
        let outcome = self.pipeline.strip_metadata(media).await?;

        self.gateway.mkdir(&self.save_dir).await?;
        let dest = self.save_dir.join(saved_file_name(
            self.clock.now_millis(),
            outcome.kind.output_extension(),
        ));
        self.gateway.copy_file(&outcome.output_path, &dest).await?;
        Ok(dest)
    }
}
