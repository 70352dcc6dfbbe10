use std::path::Path;
use std::sync::Arc;

use tokio::process::Command;

use recorder::config::StopConfig;
use recorder::history::load_history;
use recorder::recording::{RecordState, Recording};
use recorder::sound_system::{CaptureBackend, SoundSystem, StopOutcome};

/// Stands in for arecord/ffmpeg: enumeration prints a fixed catalog and
/// capture writes a marker to the output file, then runs until stdin closes.
struct ShellBackend {
    exit_code: i32,
}

impl CaptureBackend for ShellBackend {
    fn list_devices_command(&self) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(
            "printf 'hw:CARD=CODEC,DEV=0\\n    USB Audio CODEC, USB Audio\\n    Direct hardware device without any conversions\\n'",
        );
        command
    }

    fn capture_command(&self, _device: &str, output: &Path) -> Command {
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(format!(
                "printf RIFF > \"$OUTPUT\"; cat > /dev/null; exit {}",
                self.exit_code
            ))
            .env("OUTPUT", output);
        command
    }
}

#[tokio::test]
async fn capture_lifecycle_survives_a_restart() {
    let root = tempfile::tempdir().expect("create temporary directory");
    let logger = Arc::new(log::discard_logger());
    let system = SoundSystem::new(
        logger.clone(),
        Box::new(ShellBackend { exit_code: 0 }),
        StopConfig::default(),
    );

    let devices = system.list_devices().await;
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, "hw:CARD=CODEC,DEV=0");
    assert_eq!(devices[0].description, "USB Audio CODEC, USB Audio");

    let recording =
        Recording::create(root.path(), &devices[0].name).expect("create recording");
    let id = recording.id().clone();
    let output_path = recording.output_path().to_owned();

    let snapshot = system
        .start_recording(recording)
        .await
        .expect("start recording");
    assert_eq!(snapshot.state, RecordState::Recording);

    let outcome = system.stop_recording(&id).await.expect("stop recording");
    assert_eq!(outcome, StopOutcome::Stopped);
    assert!(output_path.exists(), "capture output was written");

    // A fresh process reconstructs the same history from disk alone.
    let history = load_history(&logger, root.path());
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id(), &id);
    assert_eq!(history[0].state(), RecordState::Stopped);
    assert_eq!(history[0].error_code(), None);
    assert_eq!(history[0].device_name(), "hw:CARD=CODEC,DEV=0");
}

#[tokio::test]
async fn abnormal_exit_is_visible_in_history() {
    let root = tempfile::tempdir().expect("create temporary directory");
    let logger = Arc::new(log::discard_logger());
    let system = SoundSystem::new(
        logger.clone(),
        Box::new(ShellBackend { exit_code: 2 }),
        StopConfig::default(),
    );

    let recording = Recording::create(root.path(), "default").expect("create recording");
    let id = recording.id().clone();

    system
        .start_recording(recording)
        .await
        .expect("start recording");

    let outcome = system.stop_recording(&id).await.expect("stop recording");
    assert_eq!(outcome, StopOutcome::Failed { code: 2 });

    let history = load_history(&logger, root.path());
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].state(), RecordState::Error);
    assert_eq!(history[0].error_code(), Some(2));
}
