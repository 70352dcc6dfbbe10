use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use log::Logger;

use crate::sound_system::SoundSystem;

/// Shared state handed to every route.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub sound_system: Arc<SoundSystem>,
    pub recordings_root: PathBuf,
    pub calls: Arc<RwLock<Vec<String>>>,
}

impl Environment {
    pub fn new(
        logger: Arc<Logger>,
        sound_system: Arc<SoundSystem>,
        recordings_root: PathBuf,
    ) -> Self {
        Self {
            logger,
            sound_system,
            recordings_root,
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Appends to the in-memory call log.
    pub fn record_call(&self, route: &str) {
        if let Ok(mut calls) = self.calls.write() {
            calls.push(route.to_owned());
        }
    }
}
