pub mod config;
pub mod devices;
pub mod environment;
pub mod errors;
pub mod history;
pub mod recording;
pub mod routes;
pub mod sound_system;
