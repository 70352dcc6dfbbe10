use std::collections::HashMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use lazy_static::lazy_static;
use log::{debug, info, warn, Logger};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::config::StopConfig;
use crate::devices::{parse_device_list, SoundDevice};
use crate::errors::RecorderError;
use crate::recording::{Recording, RecordingId, RecordingSnapshot};

/// Error code recorded on a recording whose capture process could not be
/// launched at all.
pub const LAUNCH_FAILURE_CODE: i32 = 127;

/// Error code recorded when a process exits without an exit code (killed by
/// a signal, including our own forced kill).
pub const KILLED_CODE: i32 = -1;

lazy_static! {
    static ref FFMPEG_CAPTURE_ARGS: Vec<OsString> = vec![
        OsString::from("-y"),
        OsString::from("-f"),
        OsString::from("alsa"),
        OsString::from("-i"),
    ];
}

/// The commands the orchestrator runs. Implementations build a fresh
/// [`Command`] per call; the orchestrator owns spawning and reaping.
pub trait CaptureBackend: Send + Sync {
    /// Command whose standard output is the raw device catalog.
    fn list_devices_command(&self) -> Command;

    /// Command that captures from `device` into `output` until `q` is
    /// written to its standard input, exiting 0 on a clean stop.
    fn capture_command(&self, device: &str, output: &Path) -> Command;
}

/// Captures through ffmpeg's ALSA input and enumerates devices with
/// `arecord -L`.
pub struct AlsaBackend {
    arecord: PathBuf,
    ffmpeg: PathBuf,
}

impl AlsaBackend {
    pub fn new(arecord: PathBuf, ffmpeg: PathBuf) -> Self {
        AlsaBackend { arecord, ffmpeg }
    }
}

impl CaptureBackend for AlsaBackend {
    fn list_devices_command(&self) -> Command {
        let mut command = Command::new(&self.arecord);
        command.arg("-L");
        command
    }

    fn capture_command(&self, device: &str, output: &Path) -> Command {
        let mut command = Command::new(&self.ffmpeg);
        command
            .args(FFMPEG_CAPTURE_ARGS.iter())
            .arg(device)
            .arg("-ac")
            .arg("2")
            .arg(output);
        command
    }
}

/// The outcome of asking the orchestrator to stop a recording.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StopOutcome {
    /// The process exited cleanly; the recording is now `Stopped`.
    Stopped,
    /// The process exited abnormally; the recording is now `Error`.
    Failed { code: i32 },
    /// No live capture process was bound to that id.
    NotBound,
}

type Entity = Arc<Mutex<Recording>>;

/// Binds recordings to live capture processes.
///
/// The orchestrator is the single authority over the id → process binding
/// table and the only component that transitions a recording's state while a
/// process is live. Recordings themselves never hold process handles, so the
/// durable history stays decoupled from the process table.
pub struct SoundSystem {
    logger: Arc<Logger>,
    backend: Box<dyn CaptureBackend>,
    stop: StopConfig,
    recordings: Mutex<HashMap<RecordingId, Entity>>,
    processes: Mutex<HashMap<RecordingId, Child>>,
}

impl SoundSystem {
    pub fn new(logger: Arc<Logger>, backend: Box<dyn CaptureBackend>, stop: StopConfig) -> Self {
        SoundSystem {
            logger,
            backend,
            stop,
            recordings: Mutex::new(HashMap::new()),
            processes: Mutex::new(HashMap::new()),
        }
    }

    /// Enumerates capture devices. Best-effort: a failing backend yields an
    /// empty list and a warning rather than an error.
    pub async fn list_devices(&self) -> Vec<SoundDevice> {
        let mut command = self.backend.list_devices_command();
        command.stdin(Stdio::null());

        match command.output().await {
            Ok(output) => {
                if !output.status.success() {
                    warn!(self.logger, "Device enumeration exited abnormally"; "status" => %output.status);
                }

                parse_device_list(&String::from_utf8_lossy(&output.stdout))
            }
            Err(e) => {
                warn!(self.logger, "Failed to run device enumeration"; "error" => %e);
                Vec::new()
            }
        }
    }

    /// Launches a capture process for `recording` and binds it to the
    /// recording's id.
    ///
    /// At most one live process may be bound per id; a second start for the
    /// same id fails with [`RecorderError::AlreadyBound`]. If the process
    /// cannot be launched, the recording transitions to `Error` instead of
    /// the io error propagating; the caller observes the failure through the
    /// returned snapshot.
    pub async fn start_recording(
        &self,
        recording: Recording,
    ) -> Result<RecordingSnapshot, RecorderError> {
        let id = recording.id().clone();
        let device_name = recording.device_name().to_owned();
        let output_path = recording.output_path().to_owned();

        let entity = Arc::new(Mutex::new(recording));

        {
            let mut recordings = self.recordings.lock().await;
            if recordings.contains_key(&id) {
                return Err(RecorderError::AlreadyBound { id });
            }
            recordings.insert(id.clone(), entity.clone());
        }

        let mut command = self.backend.capture_command(&device_name, &output_path);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // Exclusive access to the entity for the whole transition.
        let mut entity_guard = entity.lock().await;

        match command.spawn() {
            Ok(child) => {
                self.processes.lock().await.insert(id.clone(), child);
                entity_guard.mark_started()?;
                info!(self.logger, "Capture process started"; "id" => id.as_str(), "device" => &device_name);
            }
            Err(e) => {
                warn!(self.logger, "Failed to launch capture process"; "id" => id.as_str(), "device" => &device_name, "error" => %e);
                entity_guard.mark_error(LAUNCH_FAILURE_CODE)?;
            }
        }

        Ok(entity_guard.snapshot())
    }

    /// Stops the capture process bound to `id`, if any.
    ///
    /// The binding is removed in all cases. The process is first asked to
    /// quit; if it has not exited within the configured graceful timeout it
    /// is killed. A clean exit marks the recording `Stopped`, anything else
    /// marks it `Error` with the exit code.
    pub async fn stop_recording(&self, id: &RecordingId) -> Result<StopOutcome, RecorderError> {
        let child = { self.processes.lock().await.remove(id) };

        let mut child = match child {
            Some(child) => child,
            None => {
                debug!(self.logger, "Stop requested for unbound recording"; "id" => id.as_str());
                return Ok(StopOutcome::NotBound);
            }
        };

        let entity = { self.recordings.lock().await.get(id).cloned() };

        // The wait below happens outside any table lock, so a slow stop
        // cannot stall operations on other recordings.
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(b"q").await {
                debug!(self.logger, "Could not signal capture process; it may have exited"; "id" => id.as_str(), "error" => %e);
            }
            // Dropping stdin closes the pipe, which backends also treat as a
            // stop request.
        }

        let status = match timeout(self.stop.graceful_timeout, child.wait()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(self.logger, "Capture process ignored stop request, killing"; "id" => id.as_str());
                child.kill().await?;
                timeout(self.stop.kill_timeout, child.wait())
                    .await
                    .map_err(|_| {
                        io::Error::new(
                            io::ErrorKind::TimedOut,
                            "capture process survived forced kill",
                        )
                    })??
            }
        };

        let outcome = if status.success() {
            if let Some(entity) = &entity {
                entity.lock().await.mark_stopped()?;
            }
            StopOutcome::Stopped
        } else {
            let code = status.code().unwrap_or(KILLED_CODE);
            if let Some(entity) = &entity {
                entity.lock().await.mark_error(code)?;
            }
            StopOutcome::Failed { code }
        };

        info!(self.logger, "Capture process reaped"; "id" => id.as_str(), "outcome" => ?outcome);

        Ok(outcome)
    }

    /// Snapshots of every recording tracked by this orchestrator instance,
    /// in no particular order.
    pub async fn get_recordings(&self) -> Vec<RecordingSnapshot> {
        let entities: Vec<Entity> = self.recordings.lock().await.values().cloned().collect();

        let mut snapshots = Vec::with_capacity(entities.len());
        for entity in entities {
            snapshots.push(entity.lock().await.snapshot());
        }

        snapshots
    }

    /// The snapshot for a single tracked recording, if any.
    pub async fn get_recording(&self, id: &RecordingId) -> Option<RecordingSnapshot> {
        let entity = { self.recordings.lock().await.get(id).cloned() };

        match entity {
            Some(entity) => Some(entity.lock().await.snapshot()),
            None => None,
        }
    }
}
