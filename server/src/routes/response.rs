use serde::Serialize;

use crate::devices::SoundDevice;
use crate::recording::RecordingSnapshot;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    Calls {
        calls: Vec<String>,
    },
    Devices {
        devices: Vec<SoundDevice>,
    },
    Healthz {
        revision: Option<&'a str>,
        timestamp: Option<&'a str>,
        version: &'a str,
    },
    History {
        history: Vec<RecordingSnapshot>,
    },
    Recordings {
        recordings: Vec<RecordingSnapshot>,
    },
    Stop {
        id: String,
        status: &'a str,
        error_code: Option<i32>,
    },
}
