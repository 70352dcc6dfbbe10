use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::errors::RecorderError;

/// Name of the metadata file inside each recording's directory.
pub const METADATA_FILE_NAME: &str = "recording.json";

/// Opaque identifier for one capture session: 128 random bits, hex-encoded.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RecordingId(String);

impl RecordingId {
    /// Generates a fresh random ID.
    pub fn generate() -> Self {
        RecordingId(Uuid::new_v4().to_simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordingId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordingId {
    fn from(s: String) -> Self {
        RecordingId(s)
    }
}

/// The lifecycle state of a capture session.
///
/// `New` is the only initial state. `Stopped` and `Error` are terminal: no
/// transition out of either is permitted.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    New,
    Recording,
    Stopped,
    Error,
}

impl RecordState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RecordState::Stopped | RecordState::Error)
    }
}

/// The canonical durable form of a recording, as written to its metadata
/// file. Timestamps are unix seconds.
///
/// Older metadata files may lack `last_modification` (defaulted to
/// `created_at` on load) or `error_code` (defaulted to absent).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecordingSnapshot {
    pub id: RecordingId,
    pub device_name: String,
    #[serde(default)]
    pub created_at: f64,
    #[serde(default)]
    pub last_modification: Option<f64>,
    pub state: RecordState,
    #[serde(default)]
    pub error_code: Option<i32>,
}

/// One capture session's durable state record.
///
/// The entity owns its derived on-disk paths and its state, never a process
/// handle; what is currently running is the orchestrator's concern.
#[derive(Clone, Debug)]
pub struct Recording {
    id: RecordingId,
    device_name: String,
    state: RecordState,
    error_code: Option<i32>,
    created_at: OffsetDateTime,
    last_modification: OffsetDateTime,
    base_dir: PathBuf,
    output_path: PathBuf,
    metadata_path: PathBuf,
}

impl Recording {
    /// Creates a fresh recording in the `New` state and reserves its
    /// directory under `root`.
    ///
    /// Fails with [`RecorderError::PathConflict`] if the output file already
    /// exists, without touching the filesystem further.
    pub fn create(root: impl AsRef<Path>, device_name: impl Into<String>) -> Result<Self, RecorderError> {
        Self::create_with_id(root, device_name, RecordingId::generate())
    }

    pub(crate) fn create_with_id(
        root: impl AsRef<Path>,
        device_name: impl Into<String>,
        id: RecordingId,
    ) -> Result<Self, RecorderError> {
        let (base_dir, output_path, metadata_path) = derive_paths(root.as_ref(), &id);

        fs::create_dir_all(&base_dir)?;

        if output_path.exists() {
            return Err(RecorderError::PathConflict { path: output_path });
        }

        let now = OffsetDateTime::now_utc();

        Ok(Recording {
            id,
            device_name: device_name.into(),
            state: RecordState::New,
            error_code: None,
            created_at: now,
            last_modification: now,
            base_dir,
            output_path,
            metadata_path,
        })
    }

    /// Reconstructs a recording from its persisted snapshot. No filesystem
    /// side effects; the result is an inert, read-only view of history.
    pub fn from_snapshot(root: impl AsRef<Path>, snapshot: RecordingSnapshot) -> Self {
        let (base_dir, output_path, metadata_path) = derive_paths(root.as_ref(), &snapshot.id);

        let created_at = from_unix_seconds(snapshot.created_at);
        let last_modification = snapshot
            .last_modification
            .map(from_unix_seconds)
            .unwrap_or(created_at);

        Recording {
            id: snapshot.id,
            device_name: snapshot.device_name,
            state: snapshot.state,
            error_code: snapshot.error_code,
            created_at,
            last_modification,
            base_dir,
            output_path,
            metadata_path,
        }
    }

    pub fn id(&self) -> &RecordingId {
        &self.id
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    pub fn error_code(&self) -> Option<i32> {
        self.error_code
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    pub fn snapshot(&self) -> RecordingSnapshot {
        RecordingSnapshot {
            id: self.id.clone(),
            device_name: self.device_name.clone(),
            created_at: to_unix_seconds(self.created_at),
            last_modification: Some(to_unix_seconds(self.last_modification)),
            state: self.state,
            error_code: self.error_code,
        }
    }

    /// `New` → `Recording`, once the orchestrator has a process handle.
    pub fn mark_started(&mut self) -> Result<(), RecorderError> {
        self.transition(RecordState::Recording, None)
    }

    /// `Recording` → `Stopped`, after a clean process exit.
    pub fn mark_stopped(&mut self) -> Result<(), RecorderError> {
        self.transition(RecordState::Stopped, None)
    }

    /// `New` or `Recording` → `Error`, after an abnormal exit or a failed
    /// launch.
    pub fn mark_error(&mut self, code: i32) -> Result<(), RecorderError> {
        self.transition(RecordState::Error, Some(code))
    }

    fn transition(&mut self, to: RecordState, error_code: Option<i32>) -> Result<(), RecorderError> {
        use RecordState::*;

        let allowed = matches!(
            (self.state, to),
            (New, Recording) | (Recording, Stopped) | (Recording, Error) | (New, Error)
        );

        if !allowed {
            return Err(RecorderError::InvalidTransition {
                from: self.state,
                to,
            });
        }

        self.state = to;
        self.error_code = error_code;

        let now = OffsetDateTime::now_utc();
        self.last_modification = if now > self.created_at {
            now
        } else {
            self.created_at
        };

        self.persist()
    }

    /// Writes the snapshot to the metadata path. The write goes through a
    /// temporary file and a rename so readers never see a partial file.
    fn persist(&self) -> Result<(), RecorderError> {
        let contents = serde_json::to_vec(&self.snapshot())?;

        let mut file = tempfile::NamedTempFile::new_in(&self.base_dir)?;
        file.write_all(&contents)?;
        file.persist(&self.metadata_path)
            .map_err(|e| RecorderError::Io { source: e.error })?;

        Ok(())
    }
}

fn derive_paths(root: &Path, id: &RecordingId) -> (PathBuf, PathBuf, PathBuf) {
    let base_dir = root.join(id.as_str());
    let output_path = base_dir.join(format!("{}.wav", id));
    let metadata_path = base_dir.join(METADATA_FILE_NAME);

    (base_dir, output_path, metadata_path)
}

fn to_unix_seconds(t: OffsetDateTime) -> f64 {
    t.unix_timestamp_nanos() as f64 / 1e9
}

fn from_unix_seconds(seconds: f64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos((seconds * 1e9) as i128)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}
