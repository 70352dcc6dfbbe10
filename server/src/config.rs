use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Returns the value of the named environment variable if it exists or panics.
pub fn get_variable(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("must define {} environment variable", name))
}

/// Returns the value of the named environment variable or the given default.
pub fn get_variable_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_owned())
}

pub fn get_arecord(env: Option<String>) -> Option<PathBuf> {
    use which::which;

    which("arecord").ok().or_else(move || env.map(PathBuf::from))
}

pub fn get_ffmpeg(env: Option<String>) -> Option<PathBuf> {
    use which::which;

    which("ffmpeg").ok().or_else(move || env.map(PathBuf::from))
}

/// Bounds on stopping a capture process.
///
/// A stop request first asks the process to quit and waits up to
/// `graceful_timeout`. If the process is still running after that, it is
/// killed, with a further wait of `kill_timeout` for the kill to take effect.
#[derive(Clone, Copy, Debug)]
pub struct StopConfig {
    pub graceful_timeout: Duration,
    pub kill_timeout: Duration,
}

pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_KILL_TIMEOUT_SECS: u64 = 5;

impl Default for StopConfig {
    fn default() -> Self {
        StopConfig {
            graceful_timeout: Duration::from_secs(DEFAULT_STOP_TIMEOUT_SECS),
            kill_timeout: Duration::from_secs(DEFAULT_KILL_TIMEOUT_SECS),
        }
    }
}

impl StopConfig {
    /// Reads `RECORDER_STOP_TIMEOUT_SECS` and `RECORDER_KILL_TIMEOUT_SECS`,
    /// falling back to the documented defaults.
    pub fn from_env() -> Self {
        let graceful: u64 = get_variable_or(
            "RECORDER_STOP_TIMEOUT_SECS",
            &DEFAULT_STOP_TIMEOUT_SECS.to_string(),
        )
        .parse()
        .expect("parse RECORDER_STOP_TIMEOUT_SECS as u64");
        let kill: u64 = get_variable_or(
            "RECORDER_KILL_TIMEOUT_SECS",
            &DEFAULT_KILL_TIMEOUT_SECS.to_string(),
        )
        .parse()
        .expect("parse RECORDER_KILL_TIMEOUT_SECS as u64");

        StopConfig {
            graceful_timeout: Duration::from_secs(graceful),
            kill_timeout: Duration::from_secs(kill),
        }
    }
}
