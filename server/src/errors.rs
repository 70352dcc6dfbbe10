use std::path::PathBuf;

use thiserror::Error;
use warp::reject;

use crate::recording::{RecordState, RecordingId};

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The output file for a newly constructed recording already exists.
    #[error("output file already exists: {}", path.display())]
    PathConflict { path: PathBuf },

    /// A live capture process is already bound to this recording ID.
    #[error("recording {id} is already bound to a capture process")]
    AlreadyBound { id: RecordingId },

    /// A stop was requested for an ID with no live capture process. Not a
    /// fault at the orchestrator boundary, but surfaced distinctly.
    #[error("no capture process bound to recording {id}")]
    NotBound { id: RecordingId },

    /// A state transition that the recording lifecycle does not permit.
    #[error("invalid recording state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: RecordState, to: RecordState },

    /// Represents a filesystem or subprocess I/O error.
    #[error("I/O error")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Represents persisted metadata that could not be serialized or parsed.
    #[error("malformed recording metadata")]
    MalformedMetadata {
        #[from]
        source: serde_json::Error,
    },
}

impl reject::Reject for RecorderError {}
