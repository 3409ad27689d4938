// In-memory stand-ins for the filesystem and the transcoder.

use crate::command::TranscodeCommand;
use crate::gateway::{DownloadResult, FileGateway};
use crate::pipeline::Clock;
use crate::transcoder::{ReturnCode, Session, Transcoder};
use crate::MetaSaverError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Default)]
pub struct FakeFs {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    dirs: Mutex<HashSet<PathBuf>>,
    downloads: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    pub mkdir_calls: Mutex<Vec<PathBuf>>,
    pub copies: Mutex<Vec<(PathBuf, PathBuf)>>,
}

impl FakeFs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, path: impl Into<PathBuf>, contents: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), contents.to_vec());
    }

    pub fn read(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn serve(&self, url: &str, status: u16, body: &[u8]) {
        self.downloads
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body.to_vec()));
    }
}

#[async_trait]
impl FileGateway for FakeFs {
    async fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path) || self.dirs.lock().unwrap().contains(path)
    }

    async fn file_size(&self, path: &Path) -> Result<u64, MetaSaverError> {
        self.read(path)
            .map(|bytes| bytes.len() as u64)
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound).into())
    }

    async fn mkdir(&self, path: &Path) -> Result<(), MetaSaverError> {
        self.mkdir_calls.lock().unwrap().push(path.to_path_buf());
        self.dirs.lock().unwrap().insert(path.to_path_buf());
        Ok(())
    }

    async fn copy_file(&self, src: &Path, dst: &Path) -> Result<(), MetaSaverError> {
        let contents = self
            .read(src)
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
        self.copies
            .lock()
            .unwrap()
            .push((src.to_path_buf(), dst.to_path_buf()));
        self.put(dst, &contents);
        Ok(())
    }

    async fn move_file(&self, src: &Path, dst: &Path) -> Result<(), MetaSaverError> {
        let contents = self
            .files
            .lock()
            .unwrap()
            .remove(src)
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
        self.put(dst, &contents);
        Ok(())
    }

    async fn read_head(&self, path: &Path, len: usize) -> Result<Vec<u8>, MetaSaverError> {
        let mut contents = self
            .read(path)
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
        contents.truncate(len);
        Ok(contents)
    }

    async fn download_file(
        &self,
        from_url: &str,
        to_file: &Path,
    ) -> Result<DownloadResult, MetaSaverError> {
        let (status_code, body) = self
            .downloads
            .lock()
            .unwrap()
            .get(from_url)
            .cloned()
            .unwrap_or((404, Vec::new()));
        if status_code < 400 {
            self.put(to_file, &body);
        }
        Ok(DownloadResult { status_code })
    }
}

/// What a scripted transcoder run does.
#[derive(Debug, Clone)]
pub struct Run {
    pub code: i32,
    pub logs: String,
    /// Bytes written to the output path, if any.
    pub writes: Option<Vec<u8>>,
}

impl Run {
    pub fn ok() -> Self {
        Run {
            code: 0,
            logs: "frame=1 fps=0.0 q=2.0 Lsize=N/A".to_string(),
            writes: Some(b"clean".to_vec()),
        }
    }

    pub fn fail(logs: &str) -> Self {
        Run {
            code: 1,
            logs: logs.to_string(),
            writes: None,
        }
    }

    /// Claims success but leaves no file behind.
    pub fn phantom() -> Self {
        Run {
            code: 0,
            logs: String::new(),
            writes: None,
        }
    }
}

/// Plays back scripted runs in order and records every command it receives.
pub struct FakeTranscoder {
    fs: Arc<FakeFs>,
    script: Mutex<VecDeque<Run>>,
    pub commands: Mutex<Vec<TranscodeCommand>>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl FakeTranscoder {
    pub fn new(fs: Arc<FakeFs>, script: Vec<Run>) -> Arc<Self> {
        Arc::new(Self {
            fs,
            script: Mutex::new(script.into()),
            commands: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    /// Signals `started` when a run begins, then waits for `release`.
    pub fn paused(
        fs: Arc<FakeFs>,
        script: Vec<Run>,
        started: Arc<Notify>,
        release: Arc<Notify>,
    ) -> Arc<Self> {
        Arc::new(Self {
            fs,
            script: Mutex::new(script.into()),
            commands: Mutex::new(Vec::new()),
            gate: Some((started, release)),
        })
    }

    pub fn calls(&self) -> usize {
        self.commands.lock().unwrap().len()
    }

    pub fn command(&self, index: usize) -> TranscodeCommand {
        self.commands.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn execute(&self, command: &TranscodeCommand) -> Session {
        self.commands.lock().unwrap().push(command.clone());
        if let Some((started, release)) = &self.gate {
            started.notify_one();
            release.notified().await;
        }

        let run = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Run::fail("no scripted run left"));
        if let (Some(bytes), Some(output)) = (&run.writes, command.output_path()) {
            self.fs.put(output, bytes);
        }
        Session::new(ReturnCode::new(run.code), run.logs)
    }
}

/// Starts at `start` and moves forward one millisecond per reading.
pub struct StepClock(AtomicI64);

impl StepClock {
    pub fn new(start: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(start)))
    }
}

impl Clock for StepClock {
    fn now_millis(&self) -> i64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}
