use serde::{Deserialize, Serialize};

/// A single entry from the capture backend's device catalog.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SoundDevice {
    /// The backend-specific device identifier.
    pub name: String,

    /// The first descriptive line, if any.
    pub description: String,

    /// The remaining descriptive lines, in order.
    pub details: Vec<String>,
}

/// Parses the newline-delimited output of a device-enumeration command such
/// as `arecord -L`.
///
/// A line with no leading whitespace starts a new device named by that line;
/// every following indented line is appended, trimmed, to that device. The
/// first collected line becomes the description, the rest the details. Blank
/// lines are skipped and do not terminate the current device.
pub fn parse_device_list(raw: &str) -> Vec<SoundDevice> {
    let mut devices = Vec::new();
    let mut current: Option<(String, Vec<String>)> = None;

    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with(char::is_whitespace) {
            // Indented lines before the first device name have nothing to
            // attach to and are dropped.
            if let Some((_, lines)) = current.as_mut() {
                lines.push(line.trim().to_owned());
            }
        } else {
            if let Some(block) = current.take() {
                devices.push(finish_device(block));
            }
            current = Some((line.trim().to_owned(), Vec::new()));
        }
    }

    if let Some(block) = current.take() {
        devices.push(finish_device(block));
    }

    devices
}

fn finish_device((name, mut lines): (String, Vec<String>)) -> SoundDevice {
    let description = if lines.is_empty() {
        String::new()
    } else {
        lines.remove(0)
    };

    SoundDevice {
        name,
        description,
        details: lines,
    }
}
