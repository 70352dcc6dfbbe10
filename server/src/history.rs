use std::fs;
use std::path::Path;

use log::{warn, Logger};

use crate::recording::{Recording, RecordingSnapshot, METADATA_FILE_NAME};

/// Reconstructs past recordings from the metadata persisted under `root`.
///
/// Read-only: the returned entities are inert snapshots with no process
/// bindings. A subdirectory without a readable, well-formed metadata file is
/// skipped with a warning; one corrupt record never hides the rest of the
/// history.
pub fn load_history(logger: &Logger, root: &Path) -> Vec<Recording> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(logger, "Failed to read recordings root"; "path" => %root.display(), "error" => %e);
            return Vec::new();
        }
    };

    let mut recordings = Vec::new();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(logger, "Failed to read recordings root entry"; "error" => %e);
                continue;
            }
        };

        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let metadata_path = path.join(METADATA_FILE_NAME);
        let contents = match fs::read(&metadata_path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(logger, "Skipping recording directory without readable metadata"; "path" => %path.display(), "error" => %e);
                continue;
            }
        };

        match serde_json::from_slice::<RecordingSnapshot>(&contents) {
            Ok(snapshot) => recordings.push(Recording::from_snapshot(root, snapshot)),
            Err(e) => {
                warn!(logger, "Skipping malformed recording metadata"; "path" => %metadata_path.display(), "error" => %e);
            }
        }
    }

    recordings
}
